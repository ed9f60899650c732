use dirs::home_dir;
use std::{
    env, fs, io,
    path::{Path, PathBuf},
};

const DEFAULT_DIR_NAME: &str = ".expense_core";
const CONFIG_DIR: &str = "config";
const CONFIG_FILE: &str = "config.json";
const STORE_FILE: &str = "store.json";
const HISTORY_FILE: &str = "history.txt";

/// Returns the application-specific data directory, defaulting to `~/.expense_core`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os("EXPENSE_CORE_HOME") {
        return PathBuf::from(custom);
    }
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DIR_NAME)
}

/// Directory holding the configuration file under `base`.
pub fn config_dir_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR)
}

pub fn config_file_in(base: &Path) -> PathBuf {
    config_dir_in(base).join(CONFIG_FILE)
}

/// Default location of the category and expense store.
pub fn store_file_in(base: &Path) -> PathBuf {
    base.join(STORE_FILE)
}

/// Line history of the interactive shell.
pub fn history_file_in(base: &Path) -> PathBuf {
    base.join(HISTORY_FILE)
}

pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)?;
    }
    Ok(())
}
