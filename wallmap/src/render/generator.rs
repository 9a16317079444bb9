//! The map generator state machine.
//!
//! A generation run walks [`GenerationStage`] strictly in order. Only the
//! canvas setup and the final save can fail the run: layer, basemap and
//! label problems are logged and the affected part is left out.

use std::cell::Cell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::canvas::{Canvas, Viewport};
use super::labels::{collect_labels, LabelRenderer, LabelStyle};
use super::style::{draw_layer, ResolvedStyle};
use super::{BasemapStatus, GenerationReport, GenerationStage, RenderError, RenderResult};
use crate::basemap::{choose_zoom, Basemap};
use crate::bounds::Extent;
use crate::cache::TileCache;
use crate::config::{parse_color, BasemapConfig, MapConfig, DPI};
use crate::layer::{Layer, LayerLoader, LoadOutcome};
use crate::provider::{self, HttpClient};

/// Fraction of the data extent added on each axis when bounds are derived.
pub const BOUNDS_PADDING: f64 = 0.05;

/// Size, in meters, given to derived extents that have no area (a single point).
pub const MIN_EXTENT_SIZE: f64 = 1000.0;

/// Canvas bounds: explicit bounds verbatim, otherwise the union of all
/// non-empty layer extents padded by [`BOUNDS_PADDING`].
pub fn canvas_bounds<'a>(
    explicit: Option<Extent>,
    layers: impl IntoIterator<Item = &'a Layer>,
) -> Option<Extent> {
    if explicit.is_some() {
        return explicit;
    }
    let padded = Extent::union_all(layers.into_iter().filter_map(Layer::total_bounds))?
        .padded(BOUNDS_PADDING);
    if padded.is_valid() {
        Some(padded)
    } else {
        Some(padded.with_min_size(MIN_EXTENT_SIZE))
    }
}

/// Renders one [`MapConfig`] to a PNG file.
pub struct MapGenerator<C: HttpClient> {
    config: MapConfig,
    loader: LayerLoader,
    output: PathBuf,
    cache: TileCache,
    client: C,
    stage: Cell<GenerationStage>,
}

impl<C: HttpClient> MapGenerator<C> {
    /// Creates a generator reading data below `data_root` and writing the
    /// PNG to `output`. Basemap tiles go through `cache` and `client`.
    pub fn new(
        config: MapConfig,
        data_root: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
        cache: TileCache,
        client: C,
    ) -> Self {
        Self {
            config,
            loader: LayerLoader::new(data_root),
            output: output.into(),
            cache,
            client,
            stage: Cell::new(GenerationStage::LoadingData),
        }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// The stage the generator is in, or stopped at after an error.
    pub fn stage(&self) -> GenerationStage {
        self.stage.get()
    }

    fn enter(&self, stage: GenerationStage) {
        debug!(map = %self.config.name, from = %self.stage.get(), to = %stage, "Generation stage");
        self.stage.set(stage);
    }

    /// Runs every stage and writes the map.
    pub fn generate(&self) -> RenderResult<GenerationReport> {
        info!(map = %self.config.name, output = %self.output.display(), "Generating map");

        self.enter(GenerationStage::LoadingData);
        let (layers, skipped) = self.load_layers();

        self.enter(GenerationStage::SettingUpCanvas);
        let mut canvas = self.setup_canvas(&layers)?;

        self.enter(GenerationStage::AddingBasemap);
        let basemap = match &self.config.basemap {
            Some(basemap) => self.add_basemap(&mut canvas, basemap),
            None => BasemapStatus::NotConfigured,
        };

        self.enter(GenerationStage::RenderingLayers);
        let layers_drawn = self.render_layers(&mut canvas, &layers);
        if layers_drawn == 0 {
            warn!(map = %self.config.name, "No layers were drawn, the map only has background");
        }

        self.enter(GenerationStage::AddingLabels);
        let labels_drawn = self.add_labels(&mut canvas, &layers);

        self.enter(GenerationStage::SavingOutput);
        canvas.save_png(&self.output, DPI)?;
        info!(
            path = %self.output.display(),
            width = canvas.viewport().width(),
            height = canvas.viewport().height(),
            "Saved map"
        );

        self.enter(GenerationStage::Done);

        let mut layers_loaded: Vec<String> = layers.into_keys().collect();
        layers_loaded.sort_by_key(|name| self.config.layers.iter().position(|l| &l.name == name));

        Ok(GenerationReport {
            output: self.output.clone(),
            width: canvas.viewport().width(),
            height: canvas.viewport().height(),
            layers_loaded,
            layers_skipped: skipped,
            layers_drawn,
            labels_drawn,
            basemap,
        })
    }

    fn load_layers(&self) -> (HashMap<String, Layer>, Vec<String>) {
        let mut loaded = HashMap::new();
        let mut skipped = Vec::new();

        for layer in &self.config.layers {
            match self.loader.load(&layer.source()) {
                LoadOutcome::Loaded(data) => {
                    loaded.insert(layer.name.clone(), data);
                }
                LoadOutcome::Unsupported(_) | LoadOutcome::Failed(_) => {
                    skipped.push(layer.name.clone());
                }
            }
        }

        if loaded.is_empty() && !self.config.layers.is_empty() {
            warn!(map = %self.config.name, "No layers could be loaded");
        }
        (loaded, skipped)
    }

    fn setup_canvas(&self, layers: &HashMap<String, Layer>) -> RenderResult<Canvas> {
        let bounds =
            canvas_bounds(self.config.extent(), layers.values()).ok_or(RenderError::NoBounds)?;
        let viewport = Viewport::new(bounds, self.config.width(), self.config.height());
        debug!(
            bounds = %bounds,
            visible = %viewport.extent(),
            width = viewport.width(),
            height = viewport.height(),
            "Canvas set up"
        );
        Canvas::new(viewport, parse_color(&self.config.background_color)?)
    }

    fn add_basemap(&self, canvas: &mut Canvas, config: &BasemapConfig) -> BasemapStatus {
        let source = match provider::resolve(&config.source) {
            Ok(source) => source,
            Err(e) => {
                warn!(source = %config.source, error = %e, "Basemap unavailable, continuing without it");
                return BasemapStatus::Failed(e.to_string());
            }
        };

        let zoom = choose_zoom(config.zoom, canvas.viewport(), &source);
        let basemap = Basemap::new(&source, &self.cache, &self.client);
        match basemap.composite(canvas, zoom, config.alpha) {
            Ok(report) => BasemapStatus::Drawn(report),
            Err(e) => {
                warn!(source = %config.source, zoom, error = %e, "Failed to add basemap, continuing without it");
                BasemapStatus::Failed(e.to_string())
            }
        }
    }

    fn render_layers(
        &self,
        canvas: &mut Canvas,
        layers: &HashMap<String, Layer>,
    ) -> usize {
        let mut drawn = 0;
        for config in self.config.layers_by_zorder() {
            let Some(layer) = layers.get(&config.name).filter(|l| !l.is_empty()) else {
                continue;
            };
            let style = match ResolvedStyle::resolve(&config.style, DPI) {
                Ok(style) => style,
                Err(e) => {
                    warn!(layer = %config.name, error = %e, "Invalid layer style, skipping layer");
                    continue;
                }
            };
            let features = draw_layer(canvas, layer, &style);
            debug!(layer = %config.name, zorder = config.style.zorder, features, "Drew layer");
            if features > 0 {
                drawn += 1;
            }
        }
        drawn
    }

    fn add_labels(&self, canvas: &mut Canvas, layers: &HashMap<String, Layer>) -> usize {
        let mut renderer: Option<LabelRenderer> = None;
        let mut drawn = 0;

        for config in self.config.layers_by_zorder() {
            let (Some(label_config), Some(layer)) = (&config.labels, layers.get(&config.name)) else {
                continue;
            };
            if layer.is_empty() {
                continue;
            }

            let Some(labels) = collect_labels(layer, &label_config.field) else {
                warn!(
                    layer = %config.name,
                    field = %label_config.field,
                    "Label field not found in layer, skipping labels"
                );
                continue;
            };

            let drawn_labels = LabelStyle::resolve(label_config, DPI)
                .map_err(RenderError::from)
                .and_then(|style| {
                    renderer
                        .get_or_insert_with(LabelRenderer::new)
                        .draw(canvas, &labels, &style)
                });
            match drawn_labels {
                Ok(count) => {
                    debug!(layer = %config.name, labels = count, "Drew labels");
                    drawn += count;
                }
                Err(e) => {
                    warn!(layer = %config.name, error = %e, "Failed to draw labels, skipping layer labels");
                }
            }
        }
        drawn
    }
}
