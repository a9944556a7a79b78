use serde::{Deserialize, Serialize};

/// Smallest tick cadence accepted; finer cadences only burn cycles since the
/// countdown is displayed in seconds.
pub const MIN_TICK_INTERVAL_MS: u64 = 100;

/// Refresher configuration, stored as JSON at the platform config path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefresherConfig {
    /// Broadcaster tick cadence in milliseconds.
    pub tick_interval_ms: u64,
    /// Skip-active-tab preference used when no persisted state exists yet.
    pub skip_active_tab_default: bool,
    /// State database location. `None` means `<data dir>/tabrefresh.db`.
    pub database_path: Option<String>,
    /// `tracing` filter directive; `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for RefresherConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            skip_active_tab_default: false,
            database_path: None,
            log_filter: "tabrefresh=info".to_string(),
        }
    }
}
