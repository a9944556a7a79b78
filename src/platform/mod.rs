// Tabrefresh platform paths
// Where the config file and the state database live on each OS.

use std::path::PathBuf;

#[cfg(target_os = "linux")]
mod linux;
#[cfg(target_os = "linux")]
use linux as os;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
use macos as os;

#[cfg(target_os = "windows")]
mod windows;
#[cfg(target_os = "windows")]
use windows as os;

/// Environment variable overriding the data directory (state database).
pub const DATA_DIR_ENV: &str = "TABREFRESH_DATA_DIR";

/// File name of the state database inside the data directory.
pub const DATABASE_FILE: &str = "tabrefresh.db";

/// Directory holding `config.json`.
///
/// Linux follows XDG (`$XDG_CONFIG_HOME/tabrefresh`), macOS uses
/// `~/Library/Application Support/Tabrefresh`, Windows `%APPDATA%\Tabrefresh`.
pub fn get_config_dir() -> PathBuf {
    os::get_config_dir()
}

/// Directory holding the state database. `TABREFRESH_DATA_DIR` wins when set
/// to a non-blank value.
pub fn get_data_dir() -> PathBuf {
    match std::env::var(DATA_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => os::get_data_dir(),
    }
}

/// Default location of the state database.
pub fn default_database_path() -> PathBuf {
    get_data_dir().join(DATABASE_FILE)
}
