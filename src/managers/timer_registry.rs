//! Timer Registry for tabrefresh.
//!
//! Owns the mapping from tab to refresh timer and is the only writer of the
//! persisted state record. Every mutation persists the full map before the
//! resulting snapshot is broadcast, and a failed write rolls the in-memory
//! change back so memory and disk never disagree.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::services::clock::Clock;
use crate::services::state_store::StateStore;
use crate::services::tab_host::TabHost;
use crate::services::update_broadcaster::{derive_update, UpdateChannel};
use crate::types::errors::{PersistenceError, RegistryError};
use crate::types::state::PersistedState;
use crate::types::tab::{TabId, TabInfo};
use crate::types::timer::{Timer, TimerUpdate};

/// Result of a refresh request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RefreshOutcome {
    Reloaded,
    /// The tab has focus and the skip-active-tab preference is on.
    SkippedActiveTab,
}

struct RegistryState {
    timers: BTreeMap<TabId, Timer>,
    skip_active_tab: bool,
    store: Box<dyn StateStore>,
}

impl RegistryState {
    fn persist(&self) -> Result<(), PersistenceError> {
        self.store.save(&PersistedState {
            timers: self.timers.clone(),
            skip_active_tab: self.skip_active_tab,
        })
    }
}

/// Per-tab refresh timers plus the skip-active-tab preference.
pub struct TimerRegistry<H: TabHost> {
    host: Arc<H>,
    clock: Arc<dyn Clock>,
    state: Mutex<RegistryState>,
    updates: UpdateChannel,
}

impl<H: TabHost> TimerRegistry<H> {
    /// Builds the registry from whatever the store holds.
    ///
    /// Running timers are re-anchored at "now": schedules that lapsed while the
    /// process was down are not honoured, so a restart never fires a burst of
    /// reloads. Paused timers keep their frozen remaining time.
    pub fn load(
        host: Arc<H>,
        store: Box<dyn StateStore>,
        clock: Arc<dyn Clock>,
        skip_active_tab_default: bool,
    ) -> Result<Self, RegistryError> {
        let now = clock.now_ms();
        let persisted = store.load()?;
        let restored = persisted.is_some();
        let PersistedState {
            timers: stored_timers,
            skip_active_tab,
        } = persisted.unwrap_or(PersistedState {
            timers: BTreeMap::new(),
            skip_active_tab: skip_active_tab_default,
        });

        let mut timers = BTreeMap::new();
        for (tab_id, mut timer) in stored_timers {
            if !Timer::fits_at(timer.interval_ms, now) {
                warn!(
                    event = "registry.load.timer_dropped",
                    tab_id = tab_id,
                    interval_ms = timer.interval_ms
                );
                continue;
            }
            timer.tab_id = tab_id;
            if timer.paused {
                timer.time_left_ms = timer.time_left_ms.clamp(0, timer.interval_ms);
            } else {
                timer.mark_refreshed(now);
            }
            timers.insert(tab_id, timer);
        }

        info!(
            event = "registry.load.completed",
            restored = restored,
            timer_count = timers.len(),
            skip_active_tab = skip_active_tab
        );

        Ok(Self {
            host,
            clock,
            state: Mutex::new(RegistryState {
                timers,
                skip_active_tab,
                store,
            }),
            updates: UpdateChannel::default(),
        })
    }

    fn state(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Apply `op` under the lock and persist if it reports a change.
    ///
    /// On a failed write the timer map and preference are restored to their
    /// values before `op` ran.
    fn commit<T>(
        &self,
        op: impl FnOnce(&mut RegistryState, i64) -> Result<(T, bool), RegistryError>,
    ) -> Result<(T, bool), RegistryError> {
        let mut state = self.state();
        let now = self.clock.now_ms();
        let timers_before = state.timers.clone();
        let skip_before = state.skip_active_tab;

        let (value, changed) = op(&mut state, now)?;
        if changed {
            if let Err(e) = state.persist() {
                error!(event = "registry.persist.failed", error = %e);
                state.timers = timers_before;
                state.skip_active_tab = skip_before;
                return Err(e.into());
            }
        }
        Ok((value, changed))
    }

    pub fn host(&self) -> &Arc<H> {
        &self.host
    }

    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TimerUpdate> {
        self.updates.subscribe()
    }

    /// Start (or restart) the timer for a tab, counting from now.
    pub async fn start(&self, tab_id: TabId, interval_seconds: i64) -> Result<(), RegistryError> {
        info!(
            event = "registry.timer.start_started",
            tab_id = tab_id,
            interval_seconds = interval_seconds
        );

        if interval_seconds < 1 {
            return Err(RegistryError::InvalidInterval {
                seconds: interval_seconds,
            });
        }
        let now = self.clock.now_ms();
        let interval_ms = interval_seconds
            .checked_mul(1000)
            .filter(|ms| Timer::fits_at(*ms, now))
            .ok_or(RegistryError::IntervalOutOfRange {
                seconds: interval_seconds,
            })?;

        let info = self.host.get_tab(tab_id).await.map_err(|e| {
            warn!(event = "registry.timer.start_lookup_failed", tab_id = tab_id, error = %e);
            RegistryError::HostLookup {
                tab_id,
                message: e.to_string(),
            }
        })?;

        let (replaced, _) = self.commit(|state, now| {
            let replaced = state
                .timers
                .insert(tab_id, Timer::new(&info, interval_ms, now))
                .is_some();
            Ok((replaced, true))
        })?;

        info!(
            event = "registry.timer.start_completed",
            tab_id = tab_id,
            interval_ms = interval_ms,
            replaced = replaced
        );
        self.broadcast().await;
        Ok(())
    }

    pub async fn stop(&self, tab_id: TabId) -> Result<(), RegistryError> {
        self.commit(|state, _| {
            state
                .timers
                .remove(&tab_id)
                .map(|_| ((), true))
                .ok_or(RegistryError::NotFound { tab_id })
        })?;

        info!(event = "registry.timer.stop_completed", tab_id = tab_id);
        self.broadcast().await;
        Ok(())
    }

    /// Freeze the countdown. Pausing a paused timer succeeds without changes.
    pub async fn pause(&self, tab_id: TabId) -> Result<Timer, RegistryError> {
        let (timer, changed) = self.commit(|state, now| {
            let timer = state
                .timers
                .get_mut(&tab_id)
                .ok_or(RegistryError::NotFound { tab_id })?;
            let changed = timer.pause(now);
            Ok((timer.clone(), changed))
        })?;

        if changed {
            info!(
                event = "registry.timer.pause_completed",
                tab_id = tab_id,
                time_left_ms = timer.time_left_ms
            );
            self.broadcast().await;
        } else {
            debug!(event = "registry.timer.pause_noop", tab_id = tab_id);
        }
        Ok(timer)
    }

    /// Continue the countdown from the frozen remaining time. Resuming a
    /// running timer succeeds without changes.
    pub async fn resume(&self, tab_id: TabId) -> Result<Timer, RegistryError> {
        let (timer, changed) = self.commit(|state, now| {
            let timer = state
                .timers
                .get_mut(&tab_id)
                .ok_or(RegistryError::NotFound { tab_id })?;
            let changed = timer.resume(now);
            Ok((timer.clone(), changed))
        })?;

        if changed {
            info!(
                event = "registry.timer.resume_completed",
                tab_id = tab_id,
                next_refresh_at = timer.next_refresh_at()
            );
            self.broadcast().await;
        } else {
            debug!(event = "registry.timer.resume_noop", tab_id = tab_id);
        }
        Ok(timer)
    }

    /// Flip between paused and running. Returns the new `paused` flag.
    pub async fn toggle_pause(&self, tab_id: TabId) -> Result<bool, RegistryError> {
        let (paused, _) = self.commit(|state, now| {
            let timer = state
                .timers
                .get_mut(&tab_id)
                .ok_or(RegistryError::NotFound { tab_id })?;
            if timer.paused {
                timer.resume(now);
            } else {
                timer.pause(now);
            }
            Ok((timer.paused, true))
        })?;

        info!(event = "registry.timer.toggle_completed", tab_id = tab_id, paused = paused);
        self.broadcast().await;
        Ok(paused)
    }

    /// Reload a tab now.
    ///
    /// With the skip-active-tab preference on, the focused tab is left alone.
    /// A running managed timer is re-anchored after a successful reload; tabs
    /// without a timer are simply reloaded.
    pub async fn refresh(&self, tab_id: TabId) -> Result<RefreshOutcome, RegistryError> {
        if self.skip_active_tab() {
            let focused = self.focused_or_none().await;
            if focused == Some(tab_id) {
                debug!(event = "registry.refresh.skipped_active_tab", tab_id = tab_id);
                return Ok(RefreshOutcome::SkippedActiveTab);
            }
        }

        self.host.reload_tab(tab_id).await.map_err(|e| {
            warn!(event = "registry.refresh.reload_failed", tab_id = tab_id, error = %e);
            e
        })?;

        let (_, changed) = self.commit(|state, now| match state.timers.get_mut(&tab_id) {
            Some(timer) if !timer.paused => {
                timer.mark_refreshed(now);
                Ok(((), true))
            }
            _ => Ok(((), false)),
        })?;

        info!(event = "registry.refresh.completed", tab_id = tab_id, rearmed = changed);
        if changed {
            self.broadcast().await;
        }
        Ok(RefreshOutcome::Reloaded)
    }

    /// Tabs whose timer is due at `now`, excluding the focused tab.
    pub fn due_tabs(&self, now: i64, focused: Option<TabId>) -> Vec<TabId> {
        self.state()
            .timers
            .values()
            .filter(|t| Some(t.tab_id) != focused && t.is_due_at(now))
            .map(|t| t.tab_id)
            .collect()
    }

    /// Scheduled refresh of a due timer.
    ///
    /// The anchor is reset before the reload is issued, so a failing or slow
    /// reload waits a full interval instead of being retried every tick, and
    /// overlapping ticks cannot reload the same tab twice. Returns `Ok(false)`
    /// when the timer was stopped, paused or re-armed in the meantime.
    pub async fn refresh_due(&self, tab_id: TabId) -> Result<bool, RegistryError> {
        let (due, _) = self.commit(|state, now| match state.timers.get_mut(&tab_id) {
            Some(timer) if timer.is_due_at(now) => {
                timer.mark_refreshed(now);
                Ok((true, true))
            }
            _ => Ok((false, false)),
        })?;
        if !due {
            return Ok(false);
        }

        self.host.reload_tab(tab_id).await?;
        debug!(event = "registry.tick.reload_completed", tab_id = tab_id);
        Ok(true)
    }

    /// Derived view of every timer at the current time. Read-only.
    pub async fn query(&self) -> TimerUpdate {
        let focused = self.focused_or_none().await;
        self.snapshot(focused)
    }

    /// Derived view with a known focus, without asking the host.
    pub fn snapshot(&self, focused: Option<TabId>) -> TimerUpdate {
        let state = self.state();
        derive_update(&state.timers, self.clock.now_ms(), focused)
    }

    /// Raw stored timers.
    pub fn timers(&self) -> BTreeMap<TabId, Timer> {
        self.state().timers.clone()
    }

    pub fn timer(&self, tab_id: TabId) -> Option<Timer> {
        self.state().timers.get(&tab_id).cloned()
    }

    pub fn skip_active_tab(&self) -> bool {
        self.state().skip_active_tab
    }

    pub fn set_skip_active_tab(&self, value: bool) -> Result<(), RegistryError> {
        self.commit(|state, _| {
            let changed = state.skip_active_tab != value;
            state.skip_active_tab = value;
            Ok(((), changed))
        })?;
        info!(event = "registry.prefs.skip_active_tab_set", value = value);
        Ok(())
    }

    /// Host reported the tab closed. Returns whether a timer was dropped.
    pub async fn on_tab_removed(&self, tab_id: TabId) -> Result<bool, RegistryError> {
        let (removed, _) = self.commit(|state, _| {
            let removed = state.timers.remove(&tab_id).is_some();
            Ok((removed, removed))
        })?;

        if removed {
            info!(event = "registry.timer.removed_with_tab", tab_id = tab_id);
            self.broadcast().await;
        }
        Ok(removed)
    }

    /// Host reported new tab metadata. Returns whether a managed timer changed.
    pub async fn on_tab_updated(&self, info: &TabInfo) -> Result<bool, RegistryError> {
        let (changed, _) = self.commit(|state, _| {
            let changed = state
                .timers
                .get_mut(&info.id)
                .map(|timer| timer.apply_tab_info(info))
                .unwrap_or(false);
            Ok((changed, changed))
        })?;

        if changed {
            debug!(event = "registry.timer.metadata_updated", tab_id = info.id);
            self.broadcast().await;
        }
        Ok(changed)
    }

    /// Write the current state out, e.g. at shutdown.
    pub fn flush(&self) -> Result<(), RegistryError> {
        let state = self.state();
        state.persist()?;
        info!(event = "registry.flush.completed", timer_count = state.timers.len());
        Ok(())
    }

    /// Publish a snapshot to listeners, asking the host for focus first.
    pub async fn broadcast(&self) {
        let focused = self.focused_or_none().await;
        self.publish(focused);
    }

    /// Publish a snapshot with a known focus.
    pub fn publish(&self, focused: Option<TabId>) -> TimerUpdate {
        let update = self.snapshot(focused);
        self.updates.publish(update.clone());
        update
    }

    async fn focused_or_none(&self) -> Option<TabId> {
        match self.host.focused_tab().await {
            Ok(focused) => focused,
            Err(e) => {
                warn!(event = "registry.focus.query_failed", error = %e);
                None
            }
        }
    }
}
