use crate::types::tab::TabId;

// === HostError ===

/// Failures reported by the host browser collaborator.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Tab not found: {tab_id}")]
    TabNotFound { tab_id: TabId },

    #[error("Host unavailable: {message}")]
    Unavailable { message: String },
}

// === PersistenceError ===

/// Errors related to reading or writing the durable state record.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("State database error: {0}")]
    Database(String),

    #[error("State serialization error: {0}")]
    Serialization(String),

    #[error("State storage unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(e: rusqlite::Error) -> Self {
        PersistenceError::Database(e.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(e: serde_json::Error) -> Self {
        PersistenceError::Serialization(e.to_string())
    }
}

// === RegistryError ===

/// Errors returned by timer registry operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Timer not found: {tab_id}")]
    NotFound { tab_id: TabId },

    #[error("Tab lookup failed for {tab_id}: {message}")]
    HostLookup { tab_id: TabId, message: String },

    #[error("Invalid refresh interval: {seconds}s (must be at least 1s)")]
    InvalidInterval { seconds: i64 },

    #[error("Refresh interval out of range: {seconds}s")]
    IntervalOutOfRange { seconds: i64 },

    #[error("Host operation failed: {source}")]
    Host {
        #[from]
        source: HostError,
    },

    #[error("Persistence failed: {source}")]
    Persistence {
        #[from]
        source: PersistenceError,
    },
}

// === ConfigError ===

/// Errors related to loading or saving the refresher configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error: {0}")]
    Io(String),

    #[error("Config serialization error: {0}")]
    Serialization(String),

    #[error("Invalid config value for '{key}': {message}")]
    InvalidValue { key: String, message: String },
}
