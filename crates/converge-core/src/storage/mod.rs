mod config;
pub mod database;

pub use config::{
    Config, NotificationsConfig, StatsConfig, TimerConfig, CHART_DAYS_RANGE, HISTORY_LIMIT_RANGE,
};
pub use database::Database;

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns the data directory, creating it if needed.
///
/// `CONVERGE_HOME` overrides the location outright. Otherwise this is
/// `~/.config/converge[-dev]/`, where `CONVERGE_ENV=dev` selects the
/// development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("CONVERGE_HOME") {
        Some(home) => PathBuf::from(home),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");
            let env = std::env::var("CONVERGE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("converge-dev")
            } else {
                base_dir.join("converge")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDirUnavailable(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
