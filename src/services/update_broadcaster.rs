//! Update Broadcaster for tabrefresh.
//!
//! On a fixed cadence: ask the host which tab has focus, reload every due
//! timer through the registry, then push a `timerUpdate` snapshot to whoever
//! is listening. Countdown fields are always recomputed from the stored
//! anchors, never decremented, so missed ticks cannot cause drift.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::managers::timer_registry::TimerRegistry;
use crate::services::tab_host::TabHost;
use crate::types::tab::TabId;
use crate::types::timer::{Timer, TimerUpdate, TimerView};

/// Default tick cadence.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_millis(1000);

const UPDATE_CHANNEL_CAPACITY: usize = 16;

/// Derive the broadcast view of one timer.
///
/// Focus is an overlay: it marks the timer effectively paused for this view
/// without touching the stored `paused` flag.
pub fn derive_view(timer: &Timer, now: i64, focused: Option<TabId>) -> TimerView {
    let in_focus = focused == Some(timer.tab_id);
    TimerView {
        tab_id: timer.tab_id,
        interval_ms: timer.interval_ms,
        last_refresh_at: timer.last_refresh_at,
        next_refresh_at: timer.next_refresh_at(),
        time_left_ms: timer.remaining_at(now),
        paused: timer.paused,
        in_focus,
        effectively_paused: timer.paused || in_focus,
        title: timer.title.clone(),
        fav_icon_url: timer.fav_icon_url.clone(),
        url: timer.url.clone(),
    }
}

pub fn derive_update(
    timers: &BTreeMap<TabId, Timer>,
    now: i64,
    focused: Option<TabId>,
) -> TimerUpdate {
    TimerUpdate {
        generated_at: now,
        timers: timers
            .iter()
            .map(|(tab_id, timer)| (*tab_id, derive_view(timer, now, focused)))
            .collect(),
    }
}

/// Fire-and-forget fan-out of snapshots to listeners that may come and go.
#[derive(Clone)]
pub struct UpdateChannel {
    tx: broadcast::Sender<TimerUpdate>,
}

impl Default for UpdateChannel {
    fn default() -> Self {
        let (tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self { tx }
    }
}

impl UpdateChannel {
    pub fn subscribe(&self) -> broadcast::Receiver<TimerUpdate> {
        self.tx.subscribe()
    }

    /// Deliver to current listeners. Having none is not an error.
    pub fn publish(&self, update: TimerUpdate) {
        if self.tx.send(update).is_err() {
            debug!(event = "broadcaster.publish.no_listeners");
        }
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Outcome of one tick.
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub focused: Option<TabId>,
    pub refreshed: Vec<TabId>,
    pub failed: Vec<TabId>,
    pub update: TimerUpdate,
}

/// Periodic driver for the registry's scheduled refreshes.
pub struct UpdateBroadcaster<H: TabHost> {
    registry: Arc<TimerRegistry<H>>,
    cadence: Duration,
}

impl<H: TabHost> UpdateBroadcaster<H> {
    pub fn new(registry: Arc<TimerRegistry<H>>, cadence: Duration) -> Self {
        Self { registry, cadence }
    }

    pub fn cadence(&self) -> Duration {
        self.cadence
    }

    /// One tick. A failing timer is logged and does not stop the others.
    pub async fn tick(&self) -> TickReport {
        let focused = match self.registry.host().focused_tab().await {
            Ok(focused) => focused,
            Err(e) => {
                warn!(event = "broadcaster.tick.focus_query_failed", error = %e);
                None
            }
        };

        let now = self.registry.now_ms();
        let mut report = TickReport {
            focused,
            ..TickReport::default()
        };

        for tab_id in self.registry.due_tabs(now, focused) {
            match self.registry.refresh_due(tab_id).await {
                Ok(true) => report.refreshed.push(tab_id),
                Ok(false) => {}
                Err(e) => {
                    warn!(event = "broadcaster.tick.refresh_failed", tab_id = tab_id, error = %e);
                    report.failed.push(tab_id);
                }
            }
        }

        report.update = self.registry.publish(focused);
        if !report.refreshed.is_empty() {
            debug!(
                event = "broadcaster.tick.completed",
                refreshed = report.refreshed.len(),
                failed = report.failed.len()
            );
        }
        report
    }

    /// Tick until `shutdown` flips to `true` or its sender is dropped.
    ///
    /// Each tick runs as its own task so a hung host call stalls that tick
    /// only, never the cadence.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let this = Arc::new(self);
        let mut interval = tokio::time::interval(this.cadence);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            event = "broadcaster.loop.started",
            cadence_ms = this.cadence.as_millis() as u64
        );

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let ticker = Arc::clone(&this);
                    tokio::spawn(async move {
                        ticker.tick().await;
                    });
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(event = "broadcaster.loop.stopped");
    }

    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
