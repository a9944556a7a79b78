//! Unit tests for the UpdateBroadcaster tick: due reloads, focus suppression,
//! failure isolation and the periodic loop.

mod support;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tabrefresh::managers::tab_mirror::TabMirror;
use tabrefresh::managers::timer_registry::TimerRegistry;
use tabrefresh::services::clock::ManualClock;
use tabrefresh::services::state_store::{MemoryStateStore, StateStore};
use tabrefresh::services::tab_host::HostCommand;
use tabrefresh::services::update_broadcaster::UpdateBroadcaster;
use tabrefresh::types::state::PersistedState;
use tabrefresh::types::tab::TabInfo;
use tabrefresh::types::timer::Timer;
use tokio::sync::{mpsc::UnboundedReceiver, watch};

use support::{drain_reloads, UnreachableHost};

struct Harness {
    broadcaster: UpdateBroadcaster<TabMirror>,
    registry: Arc<TimerRegistry<TabMirror>>,
    mirror: Arc<TabMirror>,
    clock: ManualClock,
    store: Arc<MemoryStateStore>,
    commands: UnboundedReceiver<HostCommand>,
}

fn setup(cadence: Duration) -> Harness {
    let (mirror, commands) = TabMirror::new();
    let mirror = Arc::new(mirror);
    mirror.upsert_tab(TabInfo::new(7, "Seven", "https://seven.example"));
    mirror.upsert_tab(TabInfo::new(8, "Eight", "https://eight.example"));

    let clock = ManualClock::new(0);
    let store = Arc::new(MemoryStateStore::new());
    let registry = Arc::new(
        TimerRegistry::load(
            Arc::clone(&mirror),
            Box::new(Arc::clone(&store)),
            Arc::new(clock.clone()),
            false,
        )
        .unwrap(),
    );
    let broadcaster = UpdateBroadcaster::new(Arc::clone(&registry), cadence);

    Harness {
        broadcaster,
        registry,
        mirror,
        clock,
        store,
        commands,
    }
}

#[tokio::test]
async fn test_due_timer_is_reloaded_and_rearmed() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();

    h.clock.set(3000);
    let report = h.broadcaster.tick().await;
    assert!(report.refreshed.is_empty());
    assert_eq!(report.update.timers[&7].time_left_ms, 2000);

    h.clock.set(5100);
    let report = h.broadcaster.tick().await;
    assert_eq!(report.refreshed, vec![7]);
    assert_eq!(h.commands.recv().await, Some(HostCommand::Reload { tab_id: 7 }));

    let view = &report.update.timers[&7];
    assert_eq!(view.last_refresh_at, 5100);
    assert_eq!(view.time_left_ms, 5000);
    assert_eq!(view.next_refresh_at, 10_100);

    let stored = h.store.load().unwrap().unwrap();
    assert_eq!(stored.timers[&7].last_refresh_at, 5100);
}

#[tokio::test]
async fn test_running_views_keep_next_refresh_invariant() {
    let h = setup(Duration::from_secs(1));
    h.registry.start(7, 2).await.unwrap();
    h.registry.start(8, 3).await.unwrap();

    for now in (0..20_000).step_by(700) {
        h.clock.set(now);
        let report = h.broadcaster.tick().await;
        for view in report.update.timers.values() {
            assert_eq!(view.next_refresh_at, view.last_refresh_at + view.interval_ms);
            assert!(view.time_left_ms > 0 && view.time_left_ms <= view.interval_ms);
        }
    }
}

#[tokio::test]
async fn test_focused_tab_is_never_reloaded() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();
    h.mirror.set_focused(Some(7));

    for now in [5_000, 10_000, 60_000] {
        h.clock.set(now);
        let report = h.broadcaster.tick().await;
        assert!(report.refreshed.is_empty());
        let view = &report.update.timers[&7];
        assert!(view.in_focus);
        assert!(view.effectively_paused);
        assert!(!view.paused);
    }
    assert!(drain_reloads(&mut h.commands).is_empty());
    assert!(!h.registry.timer(7).unwrap().paused);
    assert_eq!(h.registry.timer(7).unwrap().last_refresh_at, 0);

    h.mirror.set_focused(None);
    let report = h.broadcaster.tick().await;
    assert_eq!(report.refreshed, vec![7]);
    assert_eq!(drain_reloads(&mut h.commands), vec![7]);
}

#[tokio::test]
async fn test_focus_moving_to_unmirrored_tab_releases_previous_tab() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();
    h.mirror.set_focused(Some(7));

    h.mirror.set_focused(Some(9));
    h.clock.set(5000);
    let report = h.broadcaster.tick().await;
    assert_eq!(report.focused, Some(9));
    assert!(!report.update.timers[&7].in_focus);
    assert_eq!(report.refreshed, vec![7]);
    assert_eq!(drain_reloads(&mut h.commands), vec![7]);
}

#[tokio::test]
async fn test_paused_timer_is_never_reloaded() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();
    h.clock.set(1000);
    h.registry.pause(7).await.unwrap();

    h.clock.set(120_000);
    let report = h.broadcaster.tick().await;
    assert!(report.refreshed.is_empty());
    assert_eq!(report.update.timers[&7].time_left_ms, 4000);
    assert!(drain_reloads(&mut h.commands).is_empty());
}

#[tokio::test]
async fn test_missed_ticks_cause_a_single_reload() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();

    h.clock.set(17_300);
    let report = h.broadcaster.tick().await;
    assert_eq!(report.refreshed, vec![7]);
    assert_eq!(drain_reloads(&mut h.commands), vec![7]);
    assert_eq!(h.registry.timer(7).unwrap().last_refresh_at, 17_300);

    let report = h.broadcaster.tick().await;
    assert!(report.refreshed.is_empty());
}

#[tokio::test]
async fn test_failed_reload_does_not_block_other_timers() {
    let mut h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();
    h.registry.start(8, 5).await.unwrap();
    h.mirror.remove_tab(7).unwrap();

    h.clock.set(6000);
    let report = h.broadcaster.tick().await;
    assert_eq!(report.failed, vec![7]);
    assert_eq!(report.refreshed, vec![8]);
    assert_eq!(drain_reloads(&mut h.commands), vec![8]);

    // The failing tab waits a full cycle rather than retrying every tick.
    assert_eq!(h.registry.timer(7).unwrap().last_refresh_at, 6000);
    h.clock.set(7000);
    let report = h.broadcaster.tick().await;
    assert!(report.failed.is_empty());
}

#[tokio::test]
async fn test_unreachable_host_still_ticks() {
    let mut timers = BTreeMap::new();
    timers.insert(7, Timer::new(&TabInfo::new(7, "Seven", "https://seven.example"), 5_000, 0));
    let clock = ManualClock::new(0);
    let registry = Arc::new(
        TimerRegistry::load(
            Arc::new(UnreachableHost),
            Box::new(MemoryStateStore::with_state(PersistedState {
                timers,
                skip_active_tab: false,
            })),
            Arc::new(clock.clone()),
            false,
        )
        .unwrap(),
    );
    let broadcaster = UpdateBroadcaster::new(Arc::clone(&registry), Duration::from_secs(1));

    clock.set(6000);
    let report = broadcaster.tick().await;
    assert_eq!(report.focused, None);
    assert_eq!(report.failed, vec![7]);
    assert!(report.update.timers.contains_key(&7));
    assert_eq!(registry.timer(7).unwrap().last_refresh_at, 6000);
}

#[tokio::test]
async fn test_tick_publishes_to_listeners() {
    let h = setup(Duration::from_secs(1));
    h.registry.start(7, 5).await.unwrap();
    let mut updates = h.registry.subscribe();

    h.clock.set(1000);
    h.broadcaster.tick().await;
    let update = updates.recv().await.unwrap();
    assert_eq!(update.generated_at, 1000);
    assert_eq!(update.timers[&7].time_left_ms, 4000);
}

#[tokio::test]
async fn test_run_loop_ticks_until_shutdown() {
    let mut h = setup(Duration::from_millis(20));
    h.registry.start(7, 5).await.unwrap();
    h.clock.set(5000);
    let mut updates = h.registry.subscribe();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = h.broadcaster.spawn(shutdown_rx);

    let update = tokio::time::timeout(Duration::from_secs(2), updates.recv())
        .await
        .expect("a tick should publish an update")
        .unwrap();
    assert!(update.timers.contains_key(&7));

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should stop after shutdown")
        .unwrap();
    assert_eq!(drain_reloads(&mut h.commands), vec![7]);
}
