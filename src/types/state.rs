use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::tab::TabId;
use crate::types::timer::Timer;

/// The single durable record: every managed timer plus the skip-active-tab flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub timers: BTreeMap<TabId, Timer>,
    #[serde(default)]
    pub skip_active_tab: bool,
}
