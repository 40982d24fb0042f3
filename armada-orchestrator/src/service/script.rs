//! Script catalog
//!
//! Named scripts jobs draw from. The content hash is recomputed on every
//! update; jobs record the hash current at creation time, so an agent can
//! detect a stale cached copy.

use std::sync::Arc;

use thiserror::Error;

use armada_core::domain::script::Script;

use crate::store::{Store, StoreError};

pub type Result<T> = std::result::Result<T, ScriptError>;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script {0} already exists")]
    ScriptExists(String),

    #[error("script {0} not found")]
    ScriptNotFound(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// CRUD over the script catalog
pub struct ScriptCatalog {
    store: Arc<dyn Store>,
}

impl ScriptCatalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn create(&self, name: &str, content: &str) -> Result<Script> {
        if self.store.get_script(name).await?.is_some() {
            return Err(ScriptError::ScriptExists(name.to_string()));
        }

        let script = Script::new(name, content);
        self.store.insert_script(script.clone()).await?;

        tracing::info!(name, hash = %script.hash, "script created");
        Ok(script)
    }

    pub async fn get(&self, name: &str) -> Result<Script> {
        self.store
            .get_script(name)
            .await?
            .ok_or_else(|| ScriptError::ScriptNotFound(name.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<Script>> {
        Ok(self.store.list_scripts().await?)
    }

    pub async fn update_content(&self, name: &str, content: &str) -> Result<Script> {
        let mut script = self
            .store
            .get_script(name)
            .await?
            .ok_or_else(|| ScriptError::ScriptNotFound(name.to_string()))?;

        script.set_content(content);
        self.store.update_script(script.clone()).await?;

        tracing::info!(name, hash = %script.hash, "script content updated");
        Ok(script)
    }

    pub async fn delete(&self, name: &str) -> Result<()> {
        if !self.store.delete_script(name).await? {
            return Err(ScriptError::ScriptNotFound(name.to_string()));
        }

        tracing::info!(name, "script deleted");
        Ok(())
    }
}
