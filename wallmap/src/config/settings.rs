//! User settings file handling for `~/.wallmap/config.ini`.
//!
//! Every key is optional. A missing file yields the defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

/// Default data tree root.
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default directory for rendered maps.
pub const DEFAULT_OUTPUT_DIR: &str = "output";

/// Default log file.
pub const DEFAULT_LOG_FILE: &str = "logs/wallmap.log";

/// Default tile request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings file: {0}")]
    ReadError(#[from] ini::Error),

    #[error("Invalid setting: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct PathSettings {
    pub data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BasemapSettings {
    /// Tile request timeout in seconds.
    pub timeout: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub file: PathBuf,
}

/// Settings loaded from the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub paths: PathSettings,
    pub basemap: BasemapSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            paths: PathSettings {
                data_dir: PathBuf::from(DEFAULT_DATA_DIR),
                output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
                cache_dir: default_cache_dir(),
            },
            basemap: BasemapSettings {
                timeout: DEFAULT_TIMEOUT_SECS,
            },
            logging: LoggingSettings {
                file: PathBuf::from(DEFAULT_LOG_FILE),
            },
        }
    }
}

impl Settings {
    /// Loads from the default location.
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&settings_file_path())
    }

    /// Loads from `path`, returning defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(section) = ini.section(Some("paths")) {
            if let Some(v) = non_empty(section.get("data_dir")) {
                settings.paths.data_dir = expand_tilde(v);
            }
            if let Some(v) = non_empty(section.get("output_dir")) {
                settings.paths.output_dir = expand_tilde(v);
            }
            if let Some(v) = non_empty(section.get("cache_dir")) {
                settings.paths.cache_dir = expand_tilde(v);
            }
        }

        if let Some(section) = ini.section(Some("basemap")) {
            if let Some(v) = non_empty(section.get("timeout")) {
                settings.basemap.timeout = v
                    .parse()
                    .ok()
                    .filter(|t| *t > 0)
                    .ok_or_else(|| SettingsError::InvalidValue {
                        section: "basemap".to_string(),
                        key: "timeout".to_string(),
                        value: v.to_string(),
                        reason: "expected a positive number of seconds".to_string(),
                    })?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = non_empty(section.get("file")) {
                settings.logging.file = expand_tilde(v);
            }
        }

        Ok(settings)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.basemap.timeout)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.paths.data_dir.join("raw")
    }

    pub fn processed_dir(&self) -> PathBuf {
        self.paths.data_dir.join("processed")
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Expands a leading `~/` to the home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

/// Tile cache under the platform cache directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from(".cache"))
        .join("wallmap")
        .join("tiles")
}

/// The settings directory (`~/.wallmap`).
pub fn settings_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".wallmap")
}

/// The settings file (`~/.wallmap/config.ini`).
pub fn settings_file_path() -> PathBuf {
    settings_directory().join("config.ini")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_returns_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = Settings::load_from(&dir.path().join("nonexistent.ini")).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.paths.data_dir, PathBuf::from("data"));
        assert_eq!(settings.basemap.timeout, 30);
        assert!(settings.paths.cache_dir.ends_with("wallmap/tiles"));
        assert_eq!(settings.processed_dir(), PathBuf::from("data/processed"));
    }

    #[test]
    fn test_values_override_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[paths]\ndata_dir = /srv/geo\ncache_dir = /tmp/tiles\noutput_dir =\n\n[basemap]\ntimeout = 5\n\n[logging]\nfile = /var/log/wallmap.log\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.paths.data_dir, PathBuf::from("/srv/geo"));
        assert_eq!(settings.paths.cache_dir, PathBuf::from("/tmp/tiles"));
        assert_eq!(settings.paths.output_dir, PathBuf::from("output"));
        assert_eq!(settings.timeout(), Duration::from_secs(5));
        assert_eq!(settings.logging.file, PathBuf::from("/var/log/wallmap.log"));
    }

    #[test]
    fn test_invalid_timeout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[basemap]\ntimeout = soon\n").unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { ref key, .. } if key == "timeout"));
    }

    #[test]
    fn test_expand_tilde_leaves_plain_paths() {
        assert_eq!(expand_tilde("data"), PathBuf::from("data"));
        assert_eq!(expand_tilde("/abs"), PathBuf::from("/abs"));
    }
}
