//! Heartbeat poller tests: independent per-member outcomes, gauge updates
//! and the monotonic poll counter.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::Harness;

use armada_core::domain::member::{FleetMember, Role};
use armada_orchestrator::service::heartbeat::HeartbeatPoller;
use armada_orchestrator::store::Store;

fn poller(h: &Harness) -> HeartbeatPoller {
    HeartbeatPoller::new(
        Arc::clone(&h.store) as Arc<dyn Store>,
        Arc::clone(&h.stats) as Arc<dyn armada_agent_client::StatsApi>,
        Duration::from_secs(30),
    )
}

#[tokio::test]
async fn test_one_bad_member_does_not_taint_the_cycle() {
    let h = Harness::new();
    let addr_a = h.register_worker("a").await;
    let addr_b = h.register_worker("b").await;
    let addr_c = h.register_worker("c").await;

    h.stats.set_gauges(addr_a, 12.5, 40.0, 61.0);
    h.stats.set_gauges(addr_c, 80.0, 55.0, 30.0);
    h.stats.mark_failing(addr_b);

    // Give "b" a previous successful cycle so we can see its gauges survive.
    let mut live_b = h.store.get_member("b").await.unwrap().unwrap().live;
    live_b.online = true;
    live_b.cpu = 33.0;
    live_b.poll_count = 7;
    h.store.update_live_status("b", live_b).await.unwrap();

    let cycle = poller(&h).poll_once().await.unwrap();
    assert_eq!(cycle.polled, 3);
    assert_eq!(cycle.online, 2);
    assert_eq!(cycle.offline, 1);

    let a = h.store.get_member("a").await.unwrap().unwrap().live;
    assert!(a.online);
    assert_eq!(a.cpu, 12.5);
    assert_eq!(a.poll_count, 1);
    assert!(a.last_reported_at.is_some());

    let c = h.store.get_member("c").await.unwrap().unwrap().live;
    assert!(c.online);
    assert_eq!(c.cpu, 80.0);

    // The failed member flips offline; everything else stays as it was.
    let b = h.store.get_member("b").await.unwrap().unwrap().live;
    assert!(!b.online);
    assert_eq!(b.cpu, 33.0);
    assert_eq!(b.poll_count, 7);
    assert!(b.last_reported_at.is_none());
}

#[tokio::test]
async fn test_poll_counter_is_monotonic_per_success() {
    let h = Harness::new();
    let addr = h.register_worker("a").await;
    h.stats.set_gauges(addr, 10.0, 10.0, 10.0);

    let p = poller(&h);
    p.poll_once().await.unwrap();
    p.poll_once().await.unwrap();

    let live = h.store.get_member("a").await.unwrap().unwrap().live;
    assert_eq!(live.poll_count, 2);

    // A failed cycle must not advance the counter.
    h.stats.mark_failing(addr);
    p.poll_once().await.unwrap();

    let live = h.store.get_member("a").await.unwrap().unwrap().live;
    assert_eq!(live.poll_count, 2);
    assert!(!live.online);
}

#[tokio::test]
async fn test_only_addressed_active_members_are_polled() {
    let h = Harness::new();
    let addr_a = h.register_worker("a").await;
    h.stats.set_gauges(addr_a, 10.0, 10.0, 10.0);

    // Enrolled without an address: never polled.
    h.store
        .insert_member(FleetMember::new("bare", Role::Worker))
        .await
        .unwrap();

    // Deactivated: never polled, even with an address.
    h.register_worker("retired").await;
    h.registry.deactivate("retired").await.unwrap();

    let cycle = poller(&h).poll_once().await.unwrap();
    assert_eq!(cycle.polled, 1);
    assert_eq!(cycle.online, 1);
}
