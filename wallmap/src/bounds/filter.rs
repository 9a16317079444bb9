//! Centroid-based rectangle classification.

use tracing::debug;

use super::Extent;
use crate::layer::{Feature, Layer};

/// Open rectangle used to split features by centroid.
///
/// All four edges are always present; unset edges default to the infinite
/// half-plane so that a west/south-only filter behaves the same at every
/// call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsFilter {
    pub west: f64,
    pub east: f64,
    pub south: f64,
    pub north: f64,
}

impl Default for BoundsFilter {
    fn default() -> Self {
        Self {
            west: f64::NEG_INFINITY,
            east: f64::INFINITY,
            south: f64::NEG_INFINITY,
            north: f64::INFINITY,
        }
    }
}

/// Result of [`BoundsFilter::partition`].
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    pub inside: Layer,
    pub outside: Layer,
}

impl BoundsFilter {
    /// An unbounded filter; every finite centroid is inside.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn west(mut self, west: f64) -> Self {
        self.west = west;
        self
    }

    pub fn east(mut self, east: f64) -> Self {
        self.east = east;
        self
    }

    pub fn south(mut self, south: f64) -> Self {
        self.south = south;
        self
    }

    pub fn north(mut self, north: f64) -> Self {
        self.north = north;
        self
    }

    /// Strict containment test; points on an edge are outside.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x > self.west && x < self.east && y > self.south && y < self.north
    }

    /// Whether a feature's centroid falls inside. Empty geometries are outside.
    pub fn classify(&self, feature: &Feature) -> bool {
        feature
            .centroid()
            .is_some_and(|(x, y)| self.contains(x, y))
    }

    /// Splits a layer into inside and outside halves, preserving order.
    pub fn partition(&self, layer: Layer) -> Partition {
        let mut inside = layer.empty_like();
        let mut outside = layer.empty_like();

        for feature in layer.into_features() {
            if self.classify(&feature) {
                inside.push(feature);
            } else {
                outside.push(feature);
            }
        }

        debug!(
            inside = inside.len(),
            outside = outside.len(),
            "Partitioned layer by bounds"
        );

        Partition { inside, outside }
    }
}

impl From<Extent> for BoundsFilter {
    fn from(extent: Extent) -> Self {
        Self {
            west: extent.min_x,
            east: extent.max_x,
            south: extent.min_y,
            north: extent.max_y,
        }
    }
}
