//! CLI error handling with user-friendly messages.
//!
//! Every command returns [`CliError`]; `main` turns it into a message,
//! optional remediation hints and exit code 1.

use std::fmt;
use std::process;

use wallmap::cache::CacheError;
use wallmap::config::{settings_file_path, ConfigError, SettingsError};
use wallmap::prepare::PrepareError;
use wallmap::provider::ProviderError;
use wallmap::render::RenderError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Settings file could not be read
    Settings(SettingsError),
    /// Map configuration could not be loaded
    Config(ConfigError),
    /// Invalid combination of arguments
    Usage(String),
    /// Map generation failed
    Render(RenderError),
    /// A data preparation step failed
    Prepare(PrepareError),
    /// Tile cache inspection or cleanup failed
    Cache(CacheError),
    /// HTTP client could not be created
    Http(ProviderError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        match self {
            CliError::Prepare(PrepareError::MissingInput(_)) => {
                eprintln!();
                eprintln!("The source datasets are missing. Run `wallmap download` first.");
            }
            CliError::Prepare(PrepareError::Download { .. }) => {
                eprintln!();
                eprintln!("Natural Earth data is required. Check your connection and retry,");
                eprintln!("already downloaded files are skipped on the next run.");
            }
            CliError::Settings(_) => {
                eprintln!();
                eprintln!("Check the settings file at {}", settings_file_path().display());
            }
            CliError::Config(ConfigError::InvalidValue { field, .. }) if field == "basemap.source" => {
                eprintln!();
                eprintln!("Available basemap providers:");
                for provider in wallmap::provider::PROVIDERS {
                    eprintln!("  {}", provider.id);
                }
            }
            CliError::Render(RenderError::NoBounds) => {
                eprintln!();
                eprintln!("No layer could be loaded. Either fix the layer files or set");
                eprintln!("explicit `bounds` in the map configuration.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Settings(e) => write!(f, "Settings error: {}", e),
            CliError::Config(e) => write!(f, "Configuration error: {}", e),
            CliError::Usage(msg) => write!(f, "{}", msg),
            CliError::Render(e) => write!(f, "Failed to generate map: {}", e),
            CliError::Prepare(e) => write!(f, "Data preparation failed: {}", e),
            CliError::Cache(e) => write!(f, "Cache error: {}", e),
            CliError::Http(e) => write!(f, "Failed to create HTTP client: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Settings(e) => Some(e),
            CliError::Config(e) => Some(e),
            CliError::Render(e) => Some(e),
            CliError::Prepare(e) => Some(e),
            CliError::Cache(e) => Some(e),
            CliError::Http(e) => Some(e),
            CliError::LoggingInit(_) | CliError::Usage(_) => None,
        }
    }
}

impl From<SettingsError> for CliError {
    fn from(e: SettingsError) -> Self {
        CliError::Settings(e)
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e)
    }
}

impl From<RenderError> for CliError {
    fn from(e: RenderError) -> Self {
        CliError::Render(e)
    }
}

impl From<PrepareError> for CliError {
    fn from(e: PrepareError) -> Self {
        CliError::Prepare(e)
    }
}

impl From<CacheError> for CliError {
    fn from(e: CacheError) -> Self {
        CliError::Cache(e)
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Http(e)
    }
}
