//! CLI runner for common setup.
//!
//! Loads the settings file, initializes logging and hands out the shared
//! pieces (data tree, tile cache, HTTP client) the commands need.

use std::path::Path;

use tracing::{debug, info};
use wallmap::cache::TileCache;
use wallmap::config::Settings;
use wallmap::logging::{init_logging, LoggingGuard};
use wallmap::prepare::DataPaths;
use wallmap::provider::ReqwestClient;

use crate::error::CliError;

/// Runner that manages the CLI lifecycle.
pub struct CliRunner {
    /// Keeps logging active while the runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    settings: Settings,
}

impl CliRunner {
    /// Loads settings (from `settings_path` when given) and initializes logging.
    ///
    /// With `verbose`, debug events of wallmap are logged regardless of `RUST_LOG`.
    pub fn new(settings_path: Option<&Path>, verbose: bool) -> Result<Self, CliError> {
        let settings = match settings_path {
            Some(path) => Settings::load_from(path)?,
            None => Settings::load()?,
        };

        let logging_guard = init_logging(&settings.logging.file, verbose)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            settings,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn data_paths(&self) -> DataPaths {
        DataPaths::from_settings(&self.settings)
    }

    /// Tile cache at `override_dir`, falling back to the configured root.
    pub fn tile_cache(&self, override_dir: Option<&Path>) -> TileCache {
        let root = override_dir.unwrap_or(self.settings.paths.cache_dir.as_path());
        debug!(root = %root.display(), "Using tile cache");
        TileCache::new(root)
    }

    /// HTTP client with the configured request timeout.
    pub fn http_client(&self) -> Result<ReqwestClient, CliError> {
        Ok(ReqwestClient::with_timeout(self.settings.timeout())?)
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("Wallmap v{}", wallmap::VERSION);
        info!("Wallmap CLI: {} command", command);
        debug!(
            data_dir = %self.settings.paths.data_dir.display(),
            output_dir = %self.settings.paths.output_dir.display(),
            cache_dir = %self.settings.paths.cache_dir.display(),
            "Settings"
        );
    }
}
