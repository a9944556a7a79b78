//! Durable storage for the timer registry's state record.
//!
//! The whole [`PersistedState`] is written on every mutation; there are no
//! partial updates.

use std::sync::Mutex;

use crate::database::Database;
use crate::services::clock::{Clock, SystemClock};
use crate::types::errors::PersistenceError;
use crate::types::state::PersistedState;

/// Key under which the state record is stored.
pub const STATE_KEY: &str = "refresher_state";

/// Trait defining the durable get/set of the state record.
pub trait StateStore: Send {
    /// Returns `None` when nothing has been persisted yet.
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError>;
    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError>;
}

/// State store backed by the SQLite `kv_store` table, JSON-encoded.
pub struct SqliteStateStore {
    db: Database,
}

impl SqliteStateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn open<P: AsRef<std::path::Path>>(path: P) -> Result<Self, PersistenceError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl StateStore for SqliteStateStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        match self.db.get_value(STATE_KEY)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(state)?;
        self.db.set_value(STATE_KEY, &raw, SystemClock.now_ms())?;
        Ok(())
    }
}

/// Ephemeral store for runs that should leave nothing on disk.
#[derive(Default)]
pub struct MemoryStateStore {
    state: Mutex<Option<PersistedState>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        Ok(self.state.lock().unwrap_or_else(|e| e.into_inner()).clone())
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = Some(state.clone());
        Ok(())
    }
}

impl<T: StateStore + Sync> StateStore for std::sync::Arc<T> {
    fn load(&self) -> Result<Option<PersistedState>, PersistenceError> {
        (**self).load()
    }

    fn save(&self, state: &PersistedState) -> Result<(), PersistenceError> {
        (**self).save(state)
    }
}
