use std::error::Error;

use tabrefresh::types::errors::*;

// === HostError Tests ===

#[test]
fn host_error_display_variants() {
    assert_eq!(HostError::TabNotFound { tab_id: 7 }.to_string(), "Tab not found: 7");
    assert_eq!(
        HostError::Unavailable { message: "bridge gone".to_string() }.to_string(),
        "Host unavailable: bridge gone"
    );
}

// === PersistenceError Tests ===

#[test]
fn persistence_error_display_variants() {
    assert_eq!(
        PersistenceError::Database("locked".to_string()).to_string(),
        "State database error: locked"
    );
    assert_eq!(
        PersistenceError::Serialization("eof".to_string()).to_string(),
        "State serialization error: eof"
    );
    assert_eq!(
        PersistenceError::Unavailable("disk full".to_string()).to_string(),
        "State storage unavailable: disk full"
    );
}

#[test]
fn persistence_error_from_serde_json() {
    let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
    let err: PersistenceError = json_err.into();
    assert!(matches!(err, PersistenceError::Serialization(_)));
}

// === RegistryError Tests ===

#[test]
fn registry_error_display_variants() {
    assert_eq!(RegistryError::NotFound { tab_id: 3 }.to_string(), "Timer not found: 3");
    assert_eq!(
        RegistryError::HostLookup { tab_id: 3, message: "Tab not found: 3".to_string() }.to_string(),
        "Tab lookup failed for 3: Tab not found: 3"
    );
    assert_eq!(
        RegistryError::InvalidInterval { seconds: 0 }.to_string(),
        "Invalid refresh interval: 0s (must be at least 1s)"
    );
    assert_eq!(
        RegistryError::IntervalOutOfRange { seconds: 9_223_372_036_854_775 }.to_string(),
        "Refresh interval out of range: 9223372036854775s"
    );
}

#[test]
fn registry_error_wraps_host_and_persistence_sources() {
    let err: RegistryError = HostError::TabNotFound { tab_id: 9 }.into();
    assert_eq!(err.to_string(), "Host operation failed: Tab not found: 9");
    assert!(err.source().is_some());

    let err: RegistryError = PersistenceError::Database("io".to_string()).into();
    assert!(matches!(err, RegistryError::Persistence { .. }));
    assert!(err.source().is_some());
}

// === ConfigError Tests ===

#[test]
fn config_error_display_variants() {
    assert_eq!(ConfigError::Io("denied".to_string()).to_string(), "Config I/O error: denied");
    assert_eq!(
        ConfigError::InvalidValue { key: "tick_interval_ms".to_string(), message: "too small".to_string() }
            .to_string(),
        "Invalid config value for 'tick_interval_ms': too small"
    );
}
