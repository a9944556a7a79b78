//! Unit tests for the ConfigEngine public API.

use std::fs;

use rstest::rstest;
use tabrefresh::services::config_engine::{ConfigEngine, ConfigEngineTrait};
use tabrefresh::types::config::RefresherConfig;
use tabrefresh::types::errors::ConfigError;
use tempfile::TempDir;

fn engine_in_temp(dir: &TempDir) -> ConfigEngine {
    let path = dir.path().join("config.json").to_string_lossy().to_string();
    ConfigEngine::new(Some(path))
}

#[test]
fn test_load_defaults_when_no_config_file_exists() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);

    let config = engine.load().unwrap();
    assert_eq!(config, RefresherConfig::default());
    assert_eq!(config.tick_interval_ms, 1000);
    assert!(!config.skip_active_tab_default);
}

#[test]
fn test_set_value_persists_changes() {
    let dir = TempDir::new().unwrap();
    {
        let mut engine = engine_in_temp(&dir);
        engine.load().unwrap();
        engine.set_value("skip_active_tab_default", serde_json::json!(true)).unwrap();
        engine.set_value("tick_interval_ms", serde_json::json!(500)).unwrap();
    }

    let mut engine = engine_in_temp(&dir);
    let loaded = engine.load().unwrap();
    assert!(loaded.skip_active_tab_default);
    assert_eq!(loaded.tick_interval_ms, 500);
}

#[test]
fn test_partial_file_fills_defaults() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), r#"{"tick_interval_ms": 250}"#).unwrap();

    let mut engine = engine_in_temp(&dir);
    let loaded = engine.load().unwrap();
    assert_eq!(loaded.tick_interval_ms, 250);
    assert_eq!(loaded.log_filter, "tabrefresh=info");
}

#[test]
fn test_unknown_key_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    let result = engine.set_value("no_such_key", serde_json::json!(1));
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[rstest]
#[case(serde_json::json!(10))]
#[case(serde_json::json!(99))]
#[case(serde_json::json!("fast"))]
#[case(serde_json::json!(-5))]
fn test_invalid_tick_interval_is_rejected(#[case] value: serde_json::Value) {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();

    assert!(engine.set_value("tick_interval_ms", value).is_err());
    assert_eq!(engine.get_config().tick_interval_ms, 1000);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), "{ invalid json }").unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(ConfigError::Serialization(_))));
}

#[test]
fn test_out_of_range_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("config.json"), r#"{"tick_interval_ms": 5}"#).unwrap();

    let mut engine = engine_in_temp(&dir);
    assert!(matches!(engine.load(), Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn test_reset_restores_defaults() {
    let dir = TempDir::new().unwrap();
    let mut engine = engine_in_temp(&dir);
    engine.load().unwrap();
    engine.set_value("tick_interval_ms", serde_json::json!(2000)).unwrap();

    engine.reset().unwrap();
    assert_eq!(*engine.get_config(), RefresherConfig::default());

    let mut reloaded = engine_in_temp(&dir);
    assert_eq!(reloaded.load().unwrap(), RefresherConfig::default());
}
