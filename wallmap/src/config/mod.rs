//! Configuration: YAML map descriptions and the user settings file.

mod color;
mod map;
mod settings;

pub use color::{is_light, parse_color};
pub use map::{
    BasemapConfig, BoundsConfig, FontWeight, LabelConfig, LayerConfig, MapConfig, StyleConfig,
    Zoom, AUTO_OUTLINE, DEFAULT_HEIGHT, DEFAULT_WIDTH, DPI,
};
pub use settings::{
    default_cache_dir, expand_tilde, settings_directory, settings_file_path, BasemapSettings,
    LoggingSettings, PathSettings, Settings, SettingsError, DEFAULT_DATA_DIR, DEFAULT_LOG_FILE,
    DEFAULT_OUTPUT_DIR, DEFAULT_TIMEOUT_SECS,
};

use std::path::PathBuf;
use thiserror::Error;

/// Map configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML{}: {source}", in_path(.path))]
    Yaml {
        path: Option<PathBuf>,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid color '{0}'")]
    InvalidColor(String),

    #[error("Invalid configuration: {field} = '{value}' - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn in_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" in {}", p.display()))
        .unwrap_or_default()
}
