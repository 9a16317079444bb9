//! Core layer types: attribute values, features, layers and CRS tags.

use std::collections::BTreeMap;
use std::fmt;

use geo::{BoundingRect, Centroid, Geometry, MapCoords};

use super::{LayerError, LayerResult};
use crate::bounds::Extent;
use crate::coord::{from_web_mercator, to_web_mercator};

/// A scalar attribute value.
///
/// Attribute schemas vary per file, so values are dynamically typed.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum AttrValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

static NULL: AttrValue = AttrValue::Null;

impl AttrValue {
    pub fn is_null(&self) -> bool {
        matches!(self, AttrValue::Null)
    }

    /// Numeric view of the value. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Truthiness used by bare filter operands.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Null => false,
            AttrValue::Bool(b) => *b,
            AttrValue::Number(n) => *n != 0.0 && !n.is_nan(),
            AttrValue::Text(s) => !s.is_empty(),
        }
    }

    /// Converts a GeoJSON property value. Arrays and objects are kept as JSON text.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => AttrValue::Null,
            serde_json::Value::Bool(b) => AttrValue::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map(AttrValue::Number).unwrap_or_default(),
            serde_json::Value::String(s) => AttrValue::Text(s.clone()),
            other => AttrValue::Text(other.to_string()),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            AttrValue::Null => serde_json::Value::Null,
            AttrValue::Bool(b) => serde_json::Value::Bool(*b),
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                serde_json::Value::from(*n as i64)
            }
            AttrValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            AttrValue::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Null => Ok(()),
            AttrValue::Bool(b) => write!(f, "{}", b),
            AttrValue::Number(n) if n.fract() == 0.0 && n.abs() < 9.0e15 => {
                write!(f, "{}", *n as i64)
            }
            AttrValue::Number(n) => write!(f, "{}", n),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i64> for AttrValue {
    fn from(n: i64) -> Self {
        AttrValue::Number(n as f64)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

impl<T: Into<AttrValue>> From<Option<T>> for AttrValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

/// Attribute map of a single feature.
pub type Attributes = BTreeMap<String, AttrValue>;

/// Coordinate reference system of a layer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Crs {
    /// Geographic longitude/latitude (EPSG:4326).
    #[default]
    Wgs84,
    /// Web Mercator meters (EPSG:3857).
    WebMercator,
    /// Anything else, kept verbatim for error reporting.
    Other(String),
}

impl Crs {
    /// Parses an authority code such as `EPSG:4326` or an OGC URN.
    pub fn from_code(code: &str) -> Self {
        let upper = code.trim().to_uppercase();
        let tail = upper.rsplit(':').next().unwrap_or_default();
        match tail {
            "4326" | "CRS84" => Crs::Wgs84,
            "3857" | "900913" | "3785" => Crs::WebMercator,
            _ => Crs::Other(code.trim().to_string()),
        }
    }

    /// Detects the CRS from the WKT found in a shapefile `.prj` sidecar.
    pub fn from_wkt(wkt: &str) -> Self {
        let upper = wkt.to_uppercase();
        if upper.contains("PSEUDO-MERCATOR")
            || upper.contains("PSEUDO_MERCATOR")
            || upper.contains("WEB_MERCATOR")
            || upper.contains("\"EPSG\",\"3857\"")
        {
            Crs::WebMercator
        } else if !upper.contains("PROJCS") && upper.contains("GEOGCS") && upper.contains("WGS") {
            Crs::Wgs84
        } else {
            let name = wkt.split('"').nth(1).unwrap_or("unknown").to_string();
            Crs::Other(name)
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Crs::Wgs84 => "EPSG:4326",
            Crs::WebMercator => "EPSG:3857",
            Crs::Other(code) => code,
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A geometry with its attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    pub attributes: Attributes,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            attributes: Attributes::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Attribute value, or `Null` when the attribute is absent.
    pub fn get(&self, name: &str) -> &AttrValue {
        self.attributes.get(name).unwrap_or(&NULL)
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.attributes.insert(name.into(), value.into());
    }

    /// Geometric centroid, `None` for empty geometries.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        self.geometry.centroid().map(|p| (p.x(), p.y()))
    }

    /// Anchor used for labels: a point's own position, otherwise the centroid.
    pub fn label_anchor(&self) -> Option<(f64, f64)> {
        match &self.geometry {
            Geometry::Point(p) => Some((p.x(), p.y())),
            _ => self.centroid(),
        }
    }

    pub fn extent(&self) -> Option<Extent> {
        self.geometry.bounding_rect().map(Extent::from)
    }
}

/// An ordered collection of features sharing one CRS.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Layer {
    crs: Crs,
    columns: Vec<String>,
    features: Vec<Feature>,
}

impl Layer {
    pub fn new(crs: Crs) -> Self {
        Self {
            crs,
            columns: Vec::new(),
            features: Vec::new(),
        }
    }

    /// Builds a layer from features, deriving the column list in first-seen order.
    pub fn from_features(crs: Crs, features: impl IntoIterator<Item = Feature>) -> Self {
        let mut layer = Self::new(crs);
        for feature in features {
            layer.push(feature);
        }
        layer
    }

    /// Same CRS and columns, no features.
    pub fn empty_like(&self) -> Self {
        Self {
            crs: self.crs.clone(),
            columns: self.columns.clone(),
            features: Vec::new(),
        }
    }

    pub fn push(&mut self, feature: Feature) {
        for name in feature.attributes.keys() {
            if !self.columns.iter().any(|c| c == name) {
                self.columns.push(name.clone());
            }
        }
        self.features.push(feature);
    }

    /// Declares a column without adding data, keeping schema order stable.
    pub fn add_column(&mut self, name: impl Into<String>) {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name);
        }
    }

    pub fn crs(&self) -> &Crs {
        &self.crs
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    pub fn features_mut(&mut self) -> &mut [Feature] {
        &mut self.features
    }

    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Feature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keeps features matching `predicate`; the schema is unchanged.
    pub fn retain(mut self, predicate: impl FnMut(&Feature) -> bool) -> Self {
        self.features.retain(predicate);
        self
    }

    /// Sets `name` to `value` on every feature.
    pub fn set_all(&mut self, name: &str, value: impl Into<AttrValue>) {
        let value = value.into();
        self.add_column(name);
        for feature in &mut self.features {
            feature.set(name, value.clone());
        }
    }

    /// Keeps only the listed columns that exist, in the listed order.
    pub fn select_columns(mut self, names: &[&str]) -> Self {
        let columns: Vec<String> = names
            .iter()
            .filter(|n| self.has_column(n))
            .map(|n| n.to_string())
            .collect();
        for feature in &mut self.features {
            feature
                .attributes
                .retain(|k, _| columns.iter().any(|c| c == k));
        }
        self.columns = columns;
        self
    }

    /// Stable sort by the textual form of `column`; nulls sort last.
    pub fn sort_by_column(mut self, column: &str) -> Self {
        self.features.sort_by(|a, b| {
            let (a, b) = (a.get(column), b.get(column));
            match (a.is_null(), b.is_null()) {
                (true, true) => std::cmp::Ordering::Equal,
                (true, false) => std::cmp::Ordering::Greater,
                (false, true) => std::cmp::Ordering::Less,
                (false, false) => match (a.as_f64(), b.as_f64()) {
                    (Some(x), Some(y)) => x.total_cmp(&y),
                    _ => a.to_string().cmp(&b.to_string()),
                },
            }
        });
        self
    }

    /// Bounding box of all geometries, `None` when the layer has no coordinates.
    pub fn total_bounds(&self) -> Option<Extent> {
        Extent::union_all(self.features.iter().filter_map(Feature::extent))
    }

    /// Reprojects every geometry into `target`.
    pub fn to_crs(self, target: &Crs) -> LayerResult<Self> {
        if &self.crs == target {
            return Ok(self);
        }

        let project: fn(f64, f64) -> (f64, f64) = match (&self.crs, target) {
            (Crs::Wgs84, Crs::WebMercator) => to_web_mercator,
            (Crs::WebMercator, Crs::Wgs84) => from_web_mercator,
            (from, to) => {
                return Err(LayerError::UnsupportedReprojection {
                    from: from.code().to_string(),
                    to: to.code().to_string(),
                })
            }
        };

        let features = self
            .features
            .into_iter()
            .map(|f| Feature {
                geometry: f.geometry.map_coords(|c| {
                    let (x, y) = project(c.x, c.y);
                    geo::coord! { x: x, y: y }
                }),
                attributes: f.attributes,
            })
            .collect();

        Ok(Self {
            crs: target.clone(),
            columns: self.columns,
            features,
        })
    }
}

impl<'a> IntoIterator for &'a Layer {
    type Item = &'a Feature;
    type IntoIter = std::slice::Iter<'a, Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
