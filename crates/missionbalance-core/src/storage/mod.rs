mod config;
pub mod store;

pub use config::{Config, LoggingConfig, PersistenceConfig, SamplerConfig, TimerConfig};
pub use store::{PersistedSnapshot, PersistedState, Persistence, Store};

use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Returns the data directory, creating it if needed.
///
/// `MISSIONBALANCE_DATA_DIR` wins when set. Otherwise
/// `~/.config/missionbalance[-dev]/`, with the `-dev` suffix selected by
/// `MISSIONBALANCE_ENV=dev`.
///
/// # Errors
/// Returns an error if no home directory can be found or the directory
/// cannot be created.
pub fn data_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os("MISSIONBALANCE_DATA_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir().ok_or(ConfigError::NoDataDir)?.join(".config");
            let env =
                std::env::var("MISSIONBALANCE_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("missionbalance-dev")
            } else {
                base_dir.join("missionbalance")
            }
        }
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
