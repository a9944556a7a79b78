use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::services::tab_host::{HostCommand, TabHost};
use crate::types::errors::HostError;
use crate::types::tab::{TabId, TabInfo};

#[derive(Default)]
struct MirrorState {
    tabs: HashMap<TabId, TabInfo>,
    focused_tab_id: Option<TabId>,
}

/// In-process mirror of the host browser's tabs.
///
/// The browser side reports tab metadata, closures and focus changes; reloads
/// are emitted as [`HostCommand`]s on a channel for the bridge to forward.
pub struct TabMirror {
    state: Mutex<MirrorState>,
    commands: mpsc::UnboundedSender<HostCommand>,
}

impl TabMirror {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<HostCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mirror = Self {
            state: Mutex::new(MirrorState::default()),
            commands: tx,
        };
        (mirror, rx)
    }

    fn state(&self) -> MutexGuard<'_, MirrorState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record or refresh a tab's metadata. Returns `true` if the tab was new.
    pub fn upsert_tab(&self, info: TabInfo) -> bool {
        self.state().tabs.insert(info.id, info).is_none()
    }

    /// Forget a closed tab. Focus held by the tab is cleared even when its
    /// metadata was never reported.
    pub fn remove_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        let mut state = self.state();
        if state.focused_tab_id == Some(tab_id) {
            state.focused_tab_id = None;
        }
        state
            .tabs
            .remove(&tab_id)
            .ok_or(HostError::TabNotFound { tab_id })
    }

    /// Record the host-reported focus, or clear it with `None`.
    ///
    /// Focus may land on a tab whose metadata has not arrived yet; the
    /// previous holder loses focus either way.
    pub fn set_focused(&self, tab_id: Option<TabId>) {
        let mut state = self.state();
        if let Some(id) = tab_id {
            if !state.tabs.contains_key(&id) {
                debug!(event = "host.mirror.focus_on_unknown_tab", tab_id = id);
            }
        }
        state.focused_tab_id = tab_id;
    }

    pub fn focused(&self) -> Option<TabId> {
        self.state().focused_tab_id
    }

    pub fn tab(&self, tab_id: TabId) -> Option<TabInfo> {
        self.state().tabs.get(&tab_id).cloned()
    }

    pub fn tab_count(&self) -> usize {
        self.state().tabs.len()
    }
}

impl TabHost for TabMirror {
    async fn get_tab(&self, tab_id: TabId) -> Result<TabInfo, HostError> {
        self.state()
            .tabs
            .get(&tab_id)
            .cloned()
            .ok_or(HostError::TabNotFound { tab_id })
    }

    async fn reload_tab(&self, tab_id: TabId) -> Result<(), HostError> {
        if !self.state().tabs.contains_key(&tab_id) {
            return Err(HostError::TabNotFound { tab_id });
        }
        if self.commands.send(HostCommand::Reload { tab_id }).is_err() {
            warn!(event = "host.mirror.reload_dropped", tab_id = tab_id);
            return Err(HostError::Unavailable {
                message: "host command channel closed".to_string(),
            });
        }
        debug!(event = "host.mirror.reload_sent", tab_id = tab_id);
        Ok(())
    }

    async fn focused_tab(&self) -> Result<Option<TabId>, HostError> {
        Ok(self.state().focused_tab_id)
    }
}
