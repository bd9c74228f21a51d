pub mod config_cmd;
pub mod memory;
pub mod refine;

use scrivener_config::{AppConfig, ConfigError};
use std::path::{Path, PathBuf};

/// The config file in use: `--config` if given, else the default location.
pub fn config_file(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

/// Load the config file with environment overrides applied.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig, ConfigError> {
    AppConfig::load_with_overrides(&config_file(explicit))
}
