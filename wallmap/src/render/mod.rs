//! Map rendering: canvas, layer styling, labels and the generator that
//! sequences them.

mod canvas;
mod generator;
mod labels;
mod style;

pub use canvas::{points_to_pixels, Canvas, Viewport};
pub use generator::{canvas_bounds, MapGenerator, BOUNDS_PADDING, MIN_EXTENT_SIZE};
pub use labels::{collect_labels, resolve_outline_color, Label, LabelRenderer, LabelStyle};
pub use style::{draw_layer, ResolvedStyle};

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::basemap::BasemapReport;
use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("No bounds: the configuration has no bounds and no layer produced data")]
    NoBounds,

    #[error("Failed to create a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },

    #[error("Failed to save map to {path}: {source}")]
    Save {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to render labels: {0}")]
    Labels(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type RenderResult<T> = Result<T, RenderError>;

/// Stages of map generation, in the order they run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum GenerationStage {
    LoadingData,
    SettingUpCanvas,
    AddingBasemap,
    RenderingLayers,
    AddingLabels,
    SavingOutput,
    Done,
}

impl fmt::Display for GenerationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GenerationStage::LoadingData => "loading data",
            GenerationStage::SettingUpCanvas => "setting up canvas",
            GenerationStage::AddingBasemap => "adding basemap",
            GenerationStage::RenderingLayers => "rendering layers",
            GenerationStage::AddingLabels => "adding labels",
            GenerationStage::SavingOutput => "saving output",
            GenerationStage::Done => "done",
        };
        f.write_str(name)
    }
}

/// Outcome of the basemap stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BasemapStatus {
    NotConfigured,
    Drawn(BasemapReport),
    /// Skipped after an error; the message is what was logged.
    Failed(String),
}

/// Summary of one generated map.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationReport {
    pub output: PathBuf,
    pub width: u32,
    pub height: u32,
    pub layers_loaded: Vec<String>,
    pub layers_skipped: Vec<String>,
    pub layers_drawn: usize,
    pub labels_drawn: usize,
    pub basemap: BasemapStatus,
}
