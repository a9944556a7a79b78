// Tabrefresh platform paths for Linux
// Config: ~/.config/tabrefresh
// Data:   ~/.local/share/tabrefresh

use std::env;
use std::path::PathBuf;

fn home_dir() -> PathBuf {
    PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from("/tmp")))
}

/// Uses `$XDG_CONFIG_HOME/tabrefresh` if set, otherwise `~/.config/tabrefresh`.
pub fn get_config_dir() -> PathBuf {
    match env::var("XDG_CONFIG_HOME") {
        Ok(xdg) => PathBuf::from(xdg).join("tabrefresh"),
        Err(_) => home_dir().join(".config").join("tabrefresh"),
    }
}

/// Uses `$XDG_DATA_HOME/tabrefresh` if set, otherwise `~/.local/share/tabrefresh`.
pub fn get_data_dir() -> PathBuf {
    match env::var("XDG_DATA_HOME") {
        Ok(xdg) => PathBuf::from(xdg).join("tabrefresh"),
        Err(_) => home_dir().join(".local").join("share").join("tabrefresh"),
    }
}
