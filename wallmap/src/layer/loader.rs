//! Layer loading for the renderer: format dispatch, filtering, reprojection.
//!
//! Failures here never abort a render. Each outcome is logged with the layer
//! name and path, and the caller simply treats a skipped layer as no data.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{read_layer, Crs, Filter, Layer, LayerError, LayerResult};

/// What to load: a named file plus an optional attribute filter.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSource {
    pub name: String,
    pub file: PathBuf,
    pub filter: Option<String>,
}

impl LayerSource {
    pub fn new(name: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            file: file.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Result of loading a single layer.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(Layer),
    /// The file extension has no reader (e.g. `.gpkg`).
    Unsupported(PathBuf),
    Failed(LayerError),
}

impl LoadOutcome {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadOutcome::Loaded(_))
    }

    pub fn into_layer(self) -> Option<Layer> {
        match self {
            LoadOutcome::Loaded(layer) => Some(layer),
            _ => None,
        }
    }
}

/// Loads layers relative to a data root and normalises them to one CRS.
#[derive(Debug, Clone)]
pub struct LayerLoader {
    data_root: PathBuf,
    target_crs: Crs,
}

impl LayerLoader {
    /// Creates a loader that reprojects everything to Web Mercator.
    pub fn new(data_root: impl Into<PathBuf>) -> Self {
        Self {
            data_root: data_root.into(),
            target_crs: Crs::WebMercator,
        }
    }

    pub fn with_target_crs(mut self, crs: Crs) -> Self {
        self.target_crs = crs;
        self
    }

    pub fn data_root(&self) -> &Path {
        &self.data_root
    }

    /// Absolute paths are used as-is, relative ones are joined to the data root.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_root.join(file)
        }
    }

    /// Loads one layer, logging and absorbing every failure.
    pub fn load(&self, source: &LayerSource) -> LoadOutcome {
        let path = self.resolve(&source.file);
        match self.try_load(source) {
            Ok(layer) => {
                info!(
                    layer = %source.name,
                    path = %path.display(),
                    features = layer.len(),
                    "Loaded layer"
                );
                LoadOutcome::Loaded(layer)
            }
            Err(LayerError::UnsupportedFormat(path)) => {
                warn!(
                    layer = %source.name,
                    path = %path.display(),
                    "Unsupported file format, skipping layer"
                );
                LoadOutcome::Unsupported(path)
            }
            Err(e) => {
                warn!(
                    layer = %source.name,
                    path = %path.display(),
                    error = %e,
                    "Failed to load layer, skipping"
                );
                LoadOutcome::Failed(e)
            }
        }
    }

    /// Loads one layer, returning the first error.
    pub fn try_load(&self, source: &LayerSource) -> LayerResult<Layer> {
        let filter = source.filter.as_deref().map(Filter::parse).transpose()?;
        let path = self.resolve(&source.file);

        let mut layer = read_layer(&path)?;

        if let Some(filter) = filter {
            let before = layer.len();
            layer = filter.apply(layer);
            debug!(
                layer = %source.name,
                filter = %filter,
                before,
                after = layer.len(),
                "Applied filter"
            );
        }

        layer.to_crs(&self.target_crs)
    }
}
