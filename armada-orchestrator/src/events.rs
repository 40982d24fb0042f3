//! Per-job event bus
//!
//! Live run updates are multiplexed per job: every subscriber to a job shares
//! one broadcast channel, created lazily on the first subscription and torn
//! down synchronously when the last subscriber goes away. Emitting to a job
//! nobody watches drops the event; there is no buffering and no replay, so a
//! subscriber only sees events from its subscription point forward.
//!
//! The registry is an owned value passed to publishers and subscribers, not
//! global state. Subscribe, unsubscribe and emit on the same job are
//! serialized by the registry lock, so a refcount decrement can never race a
//! concurrent subscribe into a duplicate channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast;
use uuid::Uuid;

use armada_core::dto::job::JobRunUpdated;

/// Events buffered per subscriber before a slow consumer starts lagging
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug)]
struct JobStream {
    sender: broadcast::Sender<JobRunUpdated>,
    subscribers: usize,
}

/// Publish/subscribe multiplexer for live run updates, keyed by job
#[derive(Debug, Default)]
pub struct JobEventBus {
    streams: Mutex<HashMap<Uuid, JobStream>>,
}

impl JobEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a subscriber to a job's event stream
    ///
    /// Lazily creates the channel on the first subscriber. The returned guard
    /// releases its slot on drop, whatever the exit path; when the last guard
    /// goes, the channel is closed and its entry removed.
    pub fn subscribe(self: &Arc<Self>, job_id: Uuid) -> JobSubscription {
        let mut streams = self.lock_streams();

        let stream = streams.entry(job_id).or_insert_with(|| {
            let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
            JobStream {
                sender,
                subscribers: 0,
            }
        });
        stream.subscribers += 1;
        let receiver = stream.sender.subscribe();

        tracing::debug!(%job_id, subscribers = stream.subscribers, "subscriber attached");

        JobSubscription {
            job_id,
            receiver,
            bus: Arc::clone(self),
        }
    }

    /// Publish a run update to a job's subscribers
    ///
    /// With no stream registered the event is silently dropped; emitting
    /// never creates a channel.
    pub fn emit(&self, job_id: Uuid, event: JobRunUpdated) {
        let streams = self.lock_streams();

        if let Some(stream) = streams.get(&job_id) {
            // Send only fails when every receiver is already gone; the stream
            // entry goes with the last guard, so this is a benign race.
            let _ = stream.sender.send(event);
        }
    }

    /// Number of live subscribers for a job
    pub fn subscriber_count(&self, job_id: Uuid) -> usize {
        self.lock_streams()
            .get(&job_id)
            .map(|s| s.subscribers)
            .unwrap_or(0)
    }

    fn lock_streams(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, JobStream>> {
        self.streams.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release(&self, job_id: Uuid) {
        let mut streams = self.lock_streams();

        if let Some(stream) = streams.get_mut(&job_id) {
            stream.subscribers = stream.subscribers.saturating_sub(1);
            if stream.subscribers == 0 {
                streams.remove(&job_id);
                tracing::debug!(%job_id, "last subscriber left, stream removed");
            }
        }
    }
}

/// A live, order-preserving sequence of run updates for one job
///
/// Dropping the subscription decrements the stream's refcount; the drop is
/// the unsubscribe, so disconnection on any path releases the slot.
#[derive(Debug)]
pub struct JobSubscription {
    job_id: Uuid,
    receiver: broadcast::Receiver<JobRunUpdated>,
    bus: Arc<JobEventBus>,
}

impl JobSubscription {
    pub fn job_id(&self) -> Uuid {
        self.job_id
    }

    /// Next event, in emission order from the subscription point forward
    ///
    /// Returns `None` once the stream is closed. A lagged consumer skips the
    /// overwritten events and keeps going.
    pub async fn next(&mut self) -> Option<JobRunUpdated> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "subscriber lagged, skipping events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Non-blocking variant of [`JobSubscription::next`]
    pub fn try_next(&mut self) -> Option<JobRunUpdated> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(job_id = %self.job_id, skipped, "subscriber lagged, skipping events");
                }
                Err(_) => return None,
            }
        }
    }
}

impl Drop for JobSubscription {
    fn drop(&mut self) {
        self.bus.release(self.job_id);
    }
}
