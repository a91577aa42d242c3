//! Locations of the settings file and debug logs

use std::env;
use std::path::{Path, PathBuf};

/// Returns the folder holding `config/` and `debug/`.
///
/// A packaged build keeps its `config/` folder next to the executable; anything
/// else (cargo run, tests) works out of the current directory.
pub fn get_data_dir() -> PathBuf {
    if let Some(dir) = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        if dir.join("config").is_dir() {
            return dir;
        }
    }

    env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// `<base>/config/settings.json`
pub fn settings_file(base: &Path) -> PathBuf {
    base.join("config").join("settings.json")
}

/// `<base>/debug/log`
pub fn log_dir(base: &Path) -> PathBuf {
    base.join("debug").join("log")
}
