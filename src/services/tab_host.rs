//! Host browser collaborator interface.
//!
//! The registry never creates or destroys tabs; it only looks them up,
//! reloads them and asks which one has focus.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::types::errors::HostError;
use crate::types::tab::{TabId, TabInfo};

/// Trait defining the host operations the timer registry consumes.
///
/// Futures are `Send` so registry operations can run on spawned tasks.
pub trait TabHost: Send + Sync + 'static {
    /// Metadata for a live tab. Fails with `TabNotFound` once the tab is gone.
    fn get_tab(&self, tab_id: TabId) -> impl Future<Output = Result<TabInfo, HostError>> + Send;

    fn reload_tab(&self, tab_id: TabId) -> impl Future<Output = Result<(), HostError>> + Send;

    /// The tab the user is currently looking at, if any.
    fn focused_tab(&self) -> impl Future<Output = Result<Option<TabId>, HostError>> + Send;
}

/// Instructions for the real browser, forwarded by the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum HostCommand {
    #[serde(rename_all = "camelCase")]
    Reload { tab_id: TabId },
}
