//! Vector layers: dynamic-attribute features, I/O and loading.
//!
//! A [`Layer`] is an ordered list of [`Feature`]s sharing one [`Crs`]. Layers
//! are read from GeoJSON or shapefiles, optionally filtered with a
//! [`Filter`] expression, and reprojected to Web Mercator for rendering.

mod filter;
mod io;
mod loader;
mod types;

pub use filter::{Filter, FilterError};
pub use io::{read_geojson, read_layer, read_shapefile, write_geojson};
pub use loader::{LayerLoader, LoadOutcome, LayerSource};
pub use types::{AttrValue, Attributes, Crs, Feature, Layer};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or transforming layers.
#[derive(Debug, Error)]
pub enum LayerError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed GeoJSON in {path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: Box<geojson::Error>,
    },

    #[error("Failed to read shapefile {path}: {source}")]
    Shapefile {
        path: PathBuf,
        #[source]
        source: shapefile::Error,
    },

    #[error("Unsupported geometry in {path}: {reason}")]
    Geometry { path: PathBuf, reason: String },

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Cannot reproject from {from} to {to}")]
    UnsupportedReprojection { from: String, to: String },

    #[error(transparent)]
    Filter(#[from] FilterError),
}

impl LayerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LayerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type LayerResult<T> = Result<T, LayerError>;
