//! App Core for tabrefresh.
//!
//! Bundles the configuration, the mirrored host and the timer registry, and
//! owns their lifecycle: constructed at process start from persisted state,
//! flushed at shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use crate::managers::tab_mirror::TabMirror;
use crate::managers::timer_registry::TimerRegistry;
use crate::services::clock::{Clock, SystemClock};
use crate::services::config_engine::ConfigEngine;
use crate::services::state_store::{SqliteStateStore, StateStore};
use crate::services::tab_host::HostCommand;
use crate::services::update_broadcaster::UpdateBroadcaster;
use crate::types::config::RefresherConfig;
use crate::types::errors::RegistryError;

/// Central application struct holding the registry and its collaborators.
pub struct App {
    pub config: RefresherConfig,
    pub mirror: Arc<TabMirror>,
    pub registry: Arc<TimerRegistry<TabMirror>>,
    /// Reload instructions for the browser. Taken once by the bridge.
    pub host_commands: Option<mpsc::UnboundedReceiver<HostCommand>>,
}

impl App {
    /// Creates an App over an explicit store and clock.
    pub fn new(
        config: RefresherConfig,
        store: Box<dyn StateStore>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RegistryError> {
        let (mirror, host_commands) = TabMirror::new();
        let mirror = Arc::new(mirror);
        let registry = TimerRegistry::load(
            Arc::clone(&mirror),
            store,
            clock,
            config.skip_active_tab_default,
        )?;

        Ok(Self {
            config,
            mirror,
            registry: Arc::new(registry),
            host_commands: Some(host_commands),
        })
    }

    /// Creates an App backed by the SQLite state database the config points at.
    pub fn open(engine: &ConfigEngine) -> Result<Self, Box<dyn std::error::Error>> {
        use crate::services::config_engine::ConfigEngineTrait;

        let db_path = engine.database_path();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let store = SqliteStateStore::open(&db_path)?;
        info!(event = "app.open.database_opened", path = %db_path.display());

        let app = Self::new(
            engine.get_config().clone(),
            Box::new(store),
            Arc::new(SystemClock),
        )?;
        Ok(app)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.config.tick_interval_ms)
    }

    pub fn broadcaster(&self) -> UpdateBroadcaster<TabMirror> {
        UpdateBroadcaster::new(Arc::clone(&self.registry), self.tick_interval())
    }

    /// Shutdown sequence: flush the registry state.
    pub fn shutdown(&self) -> Result<(), RegistryError> {
        self.registry.flush()?;
        info!(event = "app.shutdown.completed");
        Ok(())
    }
}
