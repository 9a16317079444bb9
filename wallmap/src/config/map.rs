//! YAML map configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use super::color::parse_color;
use super::{ConfigError, ConfigResult};
use crate::bounds::Extent;
use crate::layer::LayerSource;
use crate::provider;

/// Default canvas width in pixels.
pub const DEFAULT_WIDTH: u32 = 4000;

/// Default canvas height in pixels.
pub const DEFAULT_HEIGHT: u32 = 2250;

/// Output resolution written into PNG metadata.
pub const DPI: u32 = 300;

/// A complete map description.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MapConfig {
    /// Output base file name, without extension.
    pub name: String,
    #[serde(default)]
    pub output_width: Option<u32>,
    #[serde(default)]
    pub output_height: Option<u32>,
    #[serde(default = "default_background")]
    pub background_color: String,
    #[serde(default)]
    pub bounds: Option<BoundsConfig>,
    /// Layers in file order.
    #[serde(default, deserialize_with = "deserialize_layers")]
    pub layers: Vec<LayerConfig>,
    #[serde(default)]
    pub basemap: Option<BasemapConfig>,
}

/// Fixed map extent in Web Mercator meters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct BoundsConfig {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl From<BoundsConfig> for Extent {
    fn from(b: BoundsConfig) -> Self {
        Extent::new(b.west, b.south, b.east, b.north)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LayerConfig {
    /// Key of the layer in the `layers` mapping.
    #[serde(skip)]
    pub name: String,
    pub file: PathBuf,
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub labels: Option<LabelConfig>,
}

impl LayerConfig {
    pub fn source(&self) -> LayerSource {
        LayerSource {
            name: self.name.clone(),
            file: self.file.clone(),
            filter: self.filter.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    pub fill_color: String,
    pub stroke_color: String,
    /// Points.
    pub stroke_width: f32,
    pub opacity: f32,
    pub zorder: i32,
    /// Point marker diameter in points.
    pub marker_size: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            fill_color: "lightblue".to_string(),
            stroke_color: "black".to_string(),
            stroke_width: 1.0,
            opacity: 1.0,
            zorder: 1,
            marker_size: 6.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

impl FontWeight {
    pub fn css(&self) -> &'static str {
        match self {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        }
    }
}

/// Outline color sentinel that picks black or white from the font color.
pub const AUTO_OUTLINE: &str = "auto";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    pub field: String,
    /// Points.
    pub font_size: f32,
    pub font_color: String,
    pub font_weight: FontWeight,
    /// Points.
    pub outline_width: f32,
    pub outline_color: String,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            field: "name".to_string(),
            font_size: 12.0,
            font_color: "black".to_string(),
            font_weight: FontWeight::Normal,
            outline_width: 3.0,
            outline_color: AUTO_OUTLINE.to_string(),
        }
    }
}

/// Basemap zoom: a fixed level or picked from the canvas resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "RawZoom")]
pub enum Zoom {
    #[default]
    Auto,
    Level(u8),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawZoom {
    Level(u8),
    Keyword(String),
}

impl TryFrom<RawZoom> for Zoom {
    type Error = String;

    fn try_from(raw: RawZoom) -> Result<Self, Self::Error> {
        match raw {
            RawZoom::Level(level) => Ok(Zoom::Level(level)),
            RawZoom::Keyword(k) if k.eq_ignore_ascii_case("auto") => Ok(Zoom::Auto),
            RawZoom::Keyword(k) => Err(format!("invalid zoom '{}', expected a level or 'auto'", k)),
        }
    }
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zoom::Auto => f.write_str("auto"),
            Zoom::Level(z) => write!(f, "{}", z),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct BasemapConfig {
    /// Provider identifier (e.g. `CartoDB.Positron`) or a tile URL template.
    pub source: String,
    #[serde(default = "default_alpha")]
    pub alpha: f32,
    #[serde(default)]
    pub zoom: Zoom,
}

fn default_background() -> String {
    "white".to_string()
}

fn default_alpha() -> f32 {
    1.0
}

fn deserialize_layers<'de, D>(deserializer: D) -> Result<Vec<LayerConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    struct LayersVisitor;

    impl<'de> Visitor<'de> for LayersVisitor {
        type Value = Vec<LayerConfig>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of layer names to layer settings")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut layers = Vec::new();
            while let Some((name, mut layer)) = map.next_entry::<String, LayerConfig>()? {
                layer.name = name;
                layers.push(layer);
            }
            Ok(layers)
        }
    }

    deserializer.deserialize_map(LayersVisitor)
}

impl MapConfig {
    /// Reads and validates a YAML configuration file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml(&text).map_err(|e| match e {
            ConfigError::Yaml { source, .. } => ConfigError::Yaml {
                path: Some(path.to_path_buf()),
                source,
            },
            other => other,
        })?;
        debug!(path = %path.display(), layers = config.layers.len(), "Loaded map configuration");
        Ok(config)
    }

    /// Parses and validates YAML text.
    pub fn from_yaml(text: &str) -> ConfigResult<Self> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|source| ConfigError::Yaml { path: None, source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn width(&self) -> u32 {
        self.output_width.unwrap_or(DEFAULT_WIDTH)
    }

    pub fn height(&self) -> u32 {
        self.output_height.unwrap_or(DEFAULT_HEIGHT)
    }

    pub fn extent(&self) -> Option<Extent> {
        self.bounds.map(Extent::from)
    }

    /// Layers sorted by ascending z-order, ties kept in file order.
    pub fn layers_by_zorder(&self) -> Vec<&LayerConfig> {
        let mut layers: Vec<&LayerConfig> = self.layers.iter().collect();
        layers.sort_by_key(|l| l.style.zorder);
        layers
    }

    /// Checks values serde cannot: colors, ranges and bounds ordering.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(invalid("name", &self.name, "must not be empty"));
        }
        if self.width() == 0 || self.height() == 0 {
            return Err(invalid(
                "output_width/output_height",
                &format!("{}x{}", self.width(), self.height()),
                "must be positive",
            ));
        }
        parse_color(&self.background_color)?;

        if let Some(b) = &self.bounds {
            let values = [b.west, b.east, b.south, b.north];
            if values.iter().any(|v| !v.is_finite()) || b.west >= b.east || b.south >= b.north {
                return Err(invalid(
                    "bounds",
                    &format!("{:?}", values),
                    "need west < east and south < north",
                ));
            }
        }

        for layer in &self.layers {
            let field = |name: &str| format!("layers.{}.{}", layer.name, name);
            let style = &layer.style;
            parse_color(&style.fill_color)?;
            parse_color(&style.stroke_color)?;
            check_range(&field("style.opacity"), style.opacity, 0.0, 1.0)?;
            check_non_negative(&field("style.stroke_width"), style.stroke_width)?;
            check_non_negative(&field("style.marker_size"), style.marker_size)?;

            if let Some(labels) = &layer.labels {
                parse_color(&labels.font_color)?;
                if !labels.outline_color.eq_ignore_ascii_case(AUTO_OUTLINE) {
                    parse_color(&labels.outline_color)?;
                }
                if labels.font_size <= 0.0 {
                    return Err(invalid(
                        &field("labels.font_size"),
                        &labels.font_size.to_string(),
                        "must be positive",
                    ));
                }
                check_non_negative(&field("labels.outline_width"), labels.outline_width)?;
            }
        }

        if let Some(basemap) = &self.basemap {
            check_range("basemap.alpha", basemap.alpha, 0.0, 1.0)?;
            if !provider::is_known(&basemap.source) {
                return Err(invalid("basemap.source", &basemap.source, "unknown basemap provider"));
            }
        }

        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn check_range(field: &str, value: f32, min: f32, max: f32) -> ConfigResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(invalid(
            field,
            &value.to_string(),
            &format!("must be between {} and {}", min, max),
        ))
    }
}

fn check_non_negative(field: &str, value: f32) -> ConfigResult<()> {
    if value >= 0.0 {
        Ok(())
    } else {
        Err(invalid(field, &value.to_string(), "must not be negative"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPAIN: &str = r##"
name: spain_communities
output_width: 1920
output_height: 1080
background_color: "#f0f8ff"
bounds:
  west: -1100000
  east: 500000
  south: 4200000
  north: 5500000
layers:
  communities:
    file: processed/spain_autonomous_communities.geojson
    style:
      fill_color: "#e6f3e6"
      stroke_color: "#333333"
      stroke_width: 0.8
      zorder: 2
    labels:
      field: name
      font_size: 10
      font_weight: bold
      font_color: white
  coastline:
    file: raw/ne_10m_coastline.shp
    style:
      stroke_color: navy
  cities:
    file: raw/ne_10m_populated_places.shp
    filter: "ADM0NAME == 'Spain' and POP_MAX > 500000"
    style:
      fill_color: "#ff4444"
      zorder: 3
basemap:
  source: CartoDB.Positron
  alpha: 0.6
  zoom: 6
"##;

    #[test]
    fn test_parse_full_config_keeps_layer_order() {
        let config = MapConfig::from_yaml(SPAIN).unwrap();

        assert_eq!(config.name, "spain_communities");
        assert_eq!((config.width(), config.height()), (1920, 1080));
        let names: Vec<&str> = config.layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["communities", "coastline", "cities"]);
        assert_eq!(config.background_color, "#f0f8ff");

        let communities = &config.layers[0];
        assert_eq!(communities.style.fill_color, "#e6f3e6");
        assert_eq!(communities.style.zorder, 2);
        assert_eq!(communities.style.opacity, 1.0);
        let labels = communities.labels.as_ref().unwrap();
        assert_eq!(labels.font_weight, FontWeight::Bold);
        assert_eq!(labels.outline_color, AUTO_OUTLINE);
        assert_eq!(labels.outline_width, 3.0);

        assert_eq!(config.layers[1].style.fill_color, "lightblue");
        assert!(config.layers[2].filter.is_some());

        let basemap = config.basemap.as_ref().unwrap();
        assert_eq!(basemap.zoom, Zoom::Level(6));
        assert_eq!(basemap.alpha, 0.6);

        assert_eq!(
            config.extent(),
            Some(Extent::new(-1_100_000.0, 4_200_000.0, 500_000.0, 5_500_000.0))
        );
    }

    #[test]
    fn test_zorder_sort_is_stable() {
        let config = MapConfig::from_yaml(SPAIN).unwrap();
        let order: Vec<&str> = config
            .layers_by_zorder()
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(order, vec!["coastline", "communities", "cities"]);
    }

    #[test]
    fn test_minimal_config_defaults() {
        let config = MapConfig::from_yaml("name: empty\n").unwrap();
        assert_eq!(config.width(), DEFAULT_WIDTH);
        assert_eq!(config.height(), DEFAULT_HEIGHT);
        assert_eq!(config.background_color, "white");
        assert!(config.layers.is_empty());
        assert!(config.bounds.is_none());
        assert!(config.basemap.is_none());
    }

    #[test]
    fn test_auto_zoom_and_unknown_keys() {
        let config = MapConfig::from_yaml(
            "name: m\ntitle: ignored\nbasemap:\n  source: OpenStreetMap.Mapnik\n  zoom: auto\n",
        )
        .unwrap();
        assert_eq!(config.basemap.unwrap().zoom, Zoom::Auto);

        assert!(MapConfig::from_yaml("name: m\nbasemap:\n  source: x\n  zoom: close\n").is_err());
    }

    #[test]
    fn test_validation_errors() {
        let bad_color = "name: m\nlayers:\n  a:\n    file: a.geojson\n    style:\n      fill_color: blurple\n";
        assert!(matches!(
            MapConfig::from_yaml(bad_color),
            Err(ConfigError::InvalidColor(_))
        ));

        let bad_bounds = "name: m\nbounds: {west: 10, east: 0, south: 0, north: 10}\n";
        assert!(matches!(
            MapConfig::from_yaml(bad_bounds),
            Err(ConfigError::InvalidValue { .. })
        ));

        let bad_opacity = "name: m\nlayers:\n  a:\n    file: a.geojson\n    style: {opacity: 2}\n";
        assert!(MapConfig::from_yaml(bad_opacity).is_err());

        let bad_provider = "name: m\nbasemap:\n  source: Google.Satellite\n";
        match MapConfig::from_yaml(bad_provider) {
            Err(ConfigError::InvalidValue { field, .. }) => assert_eq!(field, "basemap.source"),
            other => panic!("unexpected result: {:?}", other),
        }
        let keyed = "name: m\nbasemap:\n  source: stadia.alidadesmooth\n";
        assert!(MapConfig::from_yaml(keyed).is_ok());

        assert!(matches!(
            MapConfig::from_yaml("layers: {}\n"),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_load_reports_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "name: [unclosed\n").unwrap();

        match MapConfig::load(&path) {
            Err(ConfigError::Yaml { path: Some(p), .. }) => assert_eq!(p, path),
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(matches!(
            MapConfig::load(&dir.path().join("absent.yaml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
