//! Bounds analysis used to pick config bounds for a region.

use std::fmt;

use super::Extent;
use crate::layer::Layer;

/// Padding applied to suggested bounds.
pub const SUGGESTED_PADDING: f64 = 0.05;

/// Padding applied to the mainland recommendation.
pub const RECOMMENDED_PADDING: f64 = 0.03;

/// Summary of a layer's extent.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundsReport {
    pub name: String,
    pub extent: Extent,
}

impl BoundsReport {
    /// Analyzes a layer; `None` when it has no coordinates.
    pub fn for_layer(name: impl Into<String>, layer: &Layer) -> Option<Self> {
        layer.total_bounds().map(|extent| Self {
            name: name.into(),
            extent,
        })
    }

    pub fn suggested(&self) -> Extent {
        self.extent.padded(SUGGESTED_PADDING)
    }

    /// Config-ready bounds with 3% padding, truncated to whole meters.
    pub fn recommended(&self) -> Extent {
        self.extent.padded(RECOMMENDED_PADDING).truncated()
    }

    /// YAML snippet for a map config's `bounds` section.
    pub fn config_snippet(extent: &Extent) -> String {
        format!(
            "bounds:\n  west: {:.0}\n  east: {:.0}\n  south: {:.0}\n  north: {:.0}",
            extent.min_x, extent.max_x, extent.min_y, extent.max_y
        )
    }
}

impl fmt::Display for BoundsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let e = &self.extent;
        let (cx, cy) = e.center();
        let s = self.suggested();

        writeln!(f, "=== {} ===", self.name)?;
        writeln!(f, "Bounds: {}", e)?;
        writeln!(f, "Width: {:.0}m, Height: {:.0}m", e.width(), e.height())?;
        writeln!(f, "Center: [{:.0}, {:.0}]", cx, cy)?;
        writeln!(f, "Aspect ratio: {:.2}", e.aspect_ratio())?;
        writeln!(f, "Suggested bounds (5% padding):")?;
        writeln!(f, "  west: {:.0}", s.min_x)?;
        writeln!(f, "  east: {:.0}", s.max_x)?;
        writeln!(f, "  south: {:.0}", s.min_y)?;
        write!(f, "  north: {:.0}", s.max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::{Crs, Feature};
    use geo::point;

    fn layer() -> Layer {
        Layer::from_features(
            Crs::WebMercator,
            [
                Feature::new(point!(x: 0.0, y: 0.0)),
                Feature::new(point!(x: 1000.0, y: 500.0)),
            ],
        )
    }

    #[test]
    fn test_report_for_layer() {
        let report = BoundsReport::for_layer("test", &layer()).unwrap();
        assert_eq!(report.extent, Extent::new(0.0, 0.0, 1000.0, 500.0));
        assert_eq!(report.suggested(), Extent::new(-50.0, -25.0, 1050.0, 525.0));
        assert_eq!(report.recommended(), Extent::new(-30.0, -15.0, 1030.0, 515.0));
    }

    #[test]
    fn test_report_empty_layer() {
        assert!(BoundsReport::for_layer("empty", &Layer::new(Crs::WebMercator)).is_none());
    }

    #[test]
    fn test_display_mentions_aspect() {
        let text = BoundsReport::for_layer("test", &layer()).unwrap().to_string();
        assert!(text.contains("=== test ==="));
        assert!(text.contains("Aspect ratio: 2.00"));
        assert!(text.contains("west: -50"));
    }

    #[test]
    fn test_config_snippet() {
        let snippet = BoundsReport::config_snippet(&Extent::new(-1.0, -2.0, 3.0, 4.0));
        assert_eq!(snippet, "bounds:\n  west: -1\n  east: 3\n  south: -2\n  north: 4");
    }
}
