//! Data preparation: downloading source datasets and deriving the
//! processed layers the map configs reference.
//!
//! Every step reads from `<data>/raw/` and writes GeoJSON into
//! `<data>/processed/`.

mod analysis;
mod communities;
mod download;
mod process;
mod provinces;

pub use analysis::{analyze_spain, BoundsAnalysis};
pub use communities::{
    create_communities, run_communities, split_mainland, CommunitiesSummary, COMMUNITIES_FILE,
    MAINLAND_COMMUNITIES_FILE,
};
pub use download::{
    catalog, extract_zip, run_download, write_boundary_placeholders, Dataset, DatasetSource,
    DownloadOptions, DownloadSummary, Downloader, HttpDownloader, ProgressCallback,
};
pub use process::{
    asturias_municipalities, gijon_districts, run_process, spain_regions, spanish_name,
    ProcessOptions, ProcessSummary,
};
pub use provinces::{mainland_provinces, run_provinces, ProvincesSummary, PROVINCES_FILE};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::config::Settings;
use crate::dissolve::DissolveError;
use crate::layer::{read_layer, Filter, Layer, LayerError};

/// Natural Earth admin-1 shapefile, extracted flat into `raw/`.
pub const ADMIN1_SHAPEFILE: &str = "ne_10m_admin_1_states_provinces.shp";

/// Natural Earth admin-0 shapefile.
pub const COUNTRIES_SHAPEFILE: &str = "ne_10m_admin_0_countries.shp";

#[derive(Debug, Error)]
pub enum PrepareError {
    #[error("Input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error(transparent)]
    Layer(#[from] LayerError),

    #[error(transparent)]
    Dissolve(#[from] DissolveError),

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    #[error("Failed to extract {}: {reason}", .path.display())]
    Archive { path: PathBuf, reason: String },
}

pub type PrepareResult<T> = Result<T, PrepareError>;

pub(crate) fn io_error(path: &Path, source: io::Error) -> PrepareError {
    PrepareError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// The data tree: `<root>`, `<root>/raw` and `<root>/processed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.paths.data_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw(&self) -> PathBuf {
        self.root.join("raw")
    }

    pub fn processed(&self) -> PathBuf {
        self.root.join("processed")
    }

    pub fn raw_file(&self, name: &str) -> PathBuf {
        self.raw().join(name)
    }

    pub fn processed_file(&self, name: &str) -> PathBuf {
        self.processed().join(name)
    }

    /// Creates `raw/` and `processed/` when missing.
    pub fn ensure(&self) -> PrepareResult<()> {
        for dir in [self.raw(), self.processed()] {
            fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
        }
        Ok(())
    }

    /// Creates the tree with a `.gitkeep` in every directory.
    pub fn bootstrap(&self) -> PrepareResult<()> {
        for dir in [self.root.clone(), self.raw(), self.processed()] {
            fs::create_dir_all(&dir).map_err(|e| io_error(&dir, e))?;
            let keep = dir.join(".gitkeep");
            if !keep.exists() {
                fs::write(&keep, b"").map_err(|e| io_error(&keep, e))?;
            }
        }
        debug!(root = %self.root.display(), "Data directories ready");
        Ok(())
    }
}

/// Reads a required input, mapping a missing file to [`PrepareError::MissingInput`].
pub(crate) fn read_input(path: &Path) -> PrepareResult<Layer> {
    if !path.exists() {
        return Err(PrepareError::MissingInput(path.to_path_buf()));
    }
    Ok(read_layer(path)?)
}

/// Keeps Spanish records of an admin-1 layer.
pub(crate) fn spanish(layer: Layer) -> PrepareResult<Layer> {
    let filter = Filter::parse("admin == 'Spain'").map_err(LayerError::from)?;
    Ok(filter.apply(layer))
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Small admin-1 style layers shared by the preparation tests.

    use geo::{Geometry, Rect};

    use crate::layer::{Crs, Feature, Layer};

    pub fn degrees(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Geometry<f64> {
        Geometry::Rect(Rect::new((min_lon, min_lat), (max_lon, max_lat)))
    }

    pub fn province(name: &str, region: &str, admin: &str, area: f64, geometry: Geometry<f64>) -> Feature {
        Feature::new(geometry)
            .with("name", name)
            .with("region", region)
            .with("admin", admin)
            .with("region_cod", format!("ES.{}", &region[..2.min(region.len())].to_uppercase()))
            .with("type_en", "Province")
            .with("area_sqkm", area)
    }

    /// Two Murcia-like provinces, a Canary province, a Ceuta city and a
    /// French department, in WGS84.
    pub fn admin1() -> Layer {
        Layer::from_features(
            Crs::Wgs84,
            [
                province("Murcia", "Murcia", "Spain", 100.0, degrees(-2.0, 37.5, -1.0, 38.5)),
                province("Cartagena", "Murcia", "Spain", 50.0, degrees(-1.0, 37.5, -0.5, 38.0)),
                province("Las Palmas", "Canary Islands", "Spain", 400.0, degrees(-16.0, 27.8, -15.3, 28.3)),
                province("Ceuta", "Ceuta", "Spain", 19.0, degrees(-5.4, 35.85, -5.28, 35.92)),
                province("Gironde", "Nouvelle-Aquitaine", "France", 900.0, degrees(-1.2, 44.2, 0.3, 45.5)),
            ],
        )
    }
}
