//! Fleet registry tests: deterministic address assignment, per-role pools
//! and exhaustion.

mod common;

use std::net::Ipv4Addr;
use std::sync::Arc;

use common::Harness;

use armada_core::domain::member::{FleetMember, Role};
use armada_core::overlay::{OverlayError, SubnetPlan};
use armada_orchestrator::service::fleet::{FleetError, FleetRegistry};
use armada_orchestrator::store::{MemoryStore, Store};

#[tokio::test]
async fn test_registration_assigns_sequential_offsets_per_role() {
    let h = Harness::new();

    assert_eq!(h.register_worker("w1").await, Ipv4Addr::new(10, 77, 0, 1));
    assert_eq!(h.register_worker("w2").await, Ipv4Addr::new(10, 77, 0, 2));

    let op = h.registry.register("op1", Role::Operator).await.unwrap();
    assert_eq!(op.overlay_addr, Some(Ipv4Addr::new(10, 77, 1, 1)));
}

#[tokio::test]
async fn test_duplicate_registration_rejected() {
    let h = Harness::new();
    h.register_worker("w1").await;

    let err = h.registry.register("w1", Role::Worker).await.unwrap_err();
    assert!(matches!(err, FleetError::MemberExists(_)));
}

#[tokio::test]
async fn test_exhausted_pool_surfaces_overlay_error() {
    let store = Arc::new(MemoryStore::new());
    let plan = SubnetPlan {
        pool_size: 2,
        ..SubnetPlan::default()
    };
    let registry = FleetRegistry::new(Arc::clone(&store) as Arc<dyn Store>, plan);

    registry.register("w1", Role::Worker).await.unwrap();
    registry.register("w2", Role::Worker).await.unwrap();

    let err = registry.register("w3", Role::Worker).await.unwrap_err();
    assert!(matches!(
        err,
        FleetError::Overlay(OverlayError::AddressSpaceExhausted { .. })
    ));
}

#[tokio::test]
async fn test_stray_address_holder_surfaces_collision() {
    let h = Harness::new();

    // An operator somehow holding a worker-pool address is invisible to the
    // worker allocator but still trips the store's uniqueness constraint.
    let mut squatter = FleetMember::new("squatter", Role::Operator);
    squatter.overlay_addr = Some(Ipv4Addr::new(10, 77, 0, 1));
    h.store.insert_member(squatter).await.unwrap();

    let err = h.registry.register("w1", Role::Worker).await.unwrap_err();
    assert!(matches!(err, FleetError::AddressCollision(name) if name == "w1"));
}

#[tokio::test]
async fn test_role_change_reallocates_from_new_pool() {
    let h = Harness::new();
    h.register_worker("w1").await;

    let member = h.registry.change_role("w1", Role::Admin).await.unwrap();
    assert_eq!(member.role, Role::Admin);
    assert_eq!(member.overlay_addr, Some(Ipv4Addr::new(10, 77, 2, 1)));

    // Changing to the current role keeps the address.
    let same = h.registry.change_role("w1", Role::Admin).await.unwrap();
    assert_eq!(same.overlay_addr, member.overlay_addr);
}

#[tokio::test]
async fn test_deactivated_member_keeps_its_address_reserved() {
    let h = Harness::new();
    let first = h.register_worker("w1").await;
    h.registry.deactivate("w1").await.unwrap();

    // The freed member is inactive, but its address is not reused.
    let second = h.register_worker("w2").await;
    assert_ne!(second, first);
    assert_eq!(second, Ipv4Addr::new(10, 77, 0, 2));

    let active = h.registry.list_active().await.unwrap();
    let names: Vec<_> = active.iter().map(|m| m.username.as_str()).collect();
    assert_eq!(names, ["w2"]);
}
