use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::tab::{TabId, TabInfo};

/// Scheduling record for one managed tab.
///
/// All scheduling is derived from the `last_refresh_at` anchor and `interval_ms`;
/// `time_left_ms` is only authoritative while `paused` is set, where it holds the
/// remaining time captured at pause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub tab_id: TabId,
    pub interval_ms: i64,
    pub last_refresh_at: i64,
    #[serde(default)]
    pub paused: bool,
    pub time_left_ms: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub fav_icon_url: Option<String>,
    #[serde(default)]
    pub url: String,
}

impl Timer {
    /// A running timer anchored at `now`.
    pub fn new(info: &TabInfo, interval_ms: i64, now: i64) -> Self {
        Self {
            tab_id: info.id,
            interval_ms,
            last_refresh_at: now,
            paused: false,
            time_left_ms: interval_ms,
            title: info.title.clone(),
            fav_icon_url: info.fav_icon_url.clone(),
            url: info.url.clone(),
        }
    }

    /// Saturates at `i64::MAX` rather than wrapping.
    pub fn next_refresh_at(&self) -> i64 {
        self.last_refresh_at.saturating_add(self.interval_ms)
    }

    pub fn elapsed_at(&self, now: i64) -> i64 {
        now.saturating_sub(self.last_refresh_at)
    }

    /// Whether a schedule anchored at `now` stays representable.
    pub fn fits_at(interval_ms: i64, now: i64) -> bool {
        interval_ms > 0 && now.checked_add(interval_ms).is_some()
    }

    pub fn is_due_at(&self, now: i64) -> bool {
        !self.paused && self.elapsed_at(now) >= self.interval_ms
    }

    /// Remaining time at `now`, frozen while paused and clamped to `[0, interval_ms]`.
    pub fn remaining_at(&self, now: i64) -> i64 {
        if self.paused {
            return self.time_left_ms;
        }
        self.next_refresh_at()
            .saturating_sub(now)
            .clamp(0, self.interval_ms)
    }

    /// Freeze the remaining time. Returns `false` if already paused.
    pub fn pause(&mut self, now: i64) -> bool {
        if self.paused {
            return false;
        }
        self.time_left_ms = self.remaining_at(now);
        self.paused = true;
        true
    }

    /// Re-anchor so the frozen remaining time is preserved exactly.
    /// Returns `false` if already running.
    pub fn resume(&mut self, now: i64) -> bool {
        if !self.paused {
            return false;
        }
        self.last_refresh_at = now.saturating_sub(self.interval_ms - self.time_left_ms);
        self.paused = false;
        true
    }

    pub fn mark_refreshed(&mut self, now: i64) {
        self.last_refresh_at = now;
        self.time_left_ms = self.interval_ms;
    }

    /// Mirror host-reported metadata. Returns `true` if anything changed.
    pub fn apply_tab_info(&mut self, info: &TabInfo) -> bool {
        let changed = self.title != info.title
            || self.fav_icon_url != info.fav_icon_url
            || self.url != info.url;
        self.title = info.title.clone();
        self.fav_icon_url = info.fav_icon_url.clone();
        self.url = info.url.clone();
        changed
    }
}

/// Derived, tick-scoped view of a timer as pushed to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    pub tab_id: TabId,
    pub interval_ms: i64,
    pub last_refresh_at: i64,
    pub next_refresh_at: i64,
    pub time_left_ms: i64,
    pub paused: bool,
    pub in_focus: bool,
    pub effectively_paused: bool,
    pub title: String,
    pub fav_icon_url: Option<String>,
    pub url: String,
}

/// Payload of the `timerUpdate` event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerUpdate {
    pub generated_at: i64,
    pub timers: BTreeMap<TabId, TimerView>,
}
