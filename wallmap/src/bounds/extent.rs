//! Axis-aligned extents in a planar CRS.

use std::fmt;

/// Axis-aligned bounding box `(min_x, min_y, max_x, max_y)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Builds an extent from map-style `west/south/east/north` bounds.
    pub fn from_wsen(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self::new(west, south, east, north)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }

    /// Width over height; infinite for zero-height extents.
    pub fn aspect_ratio(&self) -> f64 {
        self.width() / self.height()
    }

    /// True when the extent spans a positive area.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.max_x.is_finite()
            && self.max_y.is_finite()
            && self.max_x > self.min_x
            && self.max_y > self.min_y
    }

    pub fn union(&self, other: &Extent) -> Extent {
        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Union of all extents, `None` for an empty iterator.
    pub fn union_all(extents: impl IntoIterator<Item = Extent>) -> Option<Extent> {
        extents.into_iter().reduce(|acc, e| acc.union(&e))
    }

    /// Expands each side by `fraction` of the extent's size on that axis.
    pub fn padded(&self, fraction: f64) -> Extent {
        let dx = self.width() * fraction;
        let dy = self.height() * fraction;
        Extent::new(
            self.min_x - dx,
            self.min_y - dy,
            self.max_x + dx,
            self.max_y + dy,
        )
    }

    /// Grows each axis narrower than `min_size` to `min_size` around the center.
    pub fn with_min_size(&self, min_size: f64) -> Extent {
        let (cx, cy) = self.center();
        let half_w = self.width().max(min_size) / 2.0;
        let half_h = self.height().max(min_size) / 2.0;
        Extent::new(cx - half_w, cy - half_h, cx + half_w, cy + half_h)
    }

    /// Grows the shorter axis around the center so that width/height equals `aspect`.
    pub fn fit_aspect(&self, aspect: f64) -> Extent {
        let (cx, cy) = self.center();
        let (mut w, mut h) = (self.width(), self.height());
        if w / h < aspect {
            w = h * aspect;
        } else {
            h = w / aspect;
        }
        Extent::new(cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    /// Truncates each bound towards zero, the form used for printed config values.
    pub fn truncated(&self) -> Extent {
        Extent::new(
            self.min_x.trunc(),
            self.min_y.trunc(),
            self.max_x.trunc(),
            self.max_y.trunc(),
        )
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        self.min_x < other.max_x
            && other.min_x < self.max_x
            && self.min_y < other.max_y
            && other.min_y < self.max_y
    }
}

impl From<geo::Rect<f64>> for Extent {
    fn from(rect: geo::Rect<f64>) -> Self {
        Extent::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:.0}, {:.0}, {:.0}, {:.0}]",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_and_padding() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 20.0, 20.0);

        let union = Extent::union_all([a, b]).unwrap();
        assert_eq!(union, Extent::new(0.0, 0.0, 20.0, 20.0));

        let padded = union.padded(0.05);
        assert_eq!(padded, Extent::new(-1.0, -1.0, 21.0, 21.0));
    }

    #[test]
    fn test_union_all_empty() {
        assert!(Extent::union_all(Vec::new()).is_none());
    }

    #[test]
    fn test_fit_aspect_widens_short_axis() {
        let e = Extent::new(0.0, 0.0, 10.0, 10.0);
        let wide = e.fit_aspect(2.0);
        assert_eq!(wide, Extent::new(-5.0, 0.0, 15.0, 10.0));

        let tall = e.fit_aspect(0.5);
        assert_eq!(tall, Extent::new(0.0, -5.0, 10.0, 15.0));
    }

    #[test]
    fn test_validity() {
        assert!(Extent::new(0.0, 0.0, 1.0, 1.0).is_valid());
        assert!(!Extent::new(0.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Extent::new(f64::NEG_INFINITY, 0.0, 1.0, 1.0).is_valid());
    }

    #[test]
    fn test_truncated() {
        let e = Extent::new(-1_234_567.8, 4_100_000.9, 499_999.5, 5_500_000.2);
        assert_eq!(
            e.truncated(),
            Extent::new(-1_234_567.0, 4_100_000.0, 499_999.0, 5_500_000.0)
        );
    }

    #[test]
    fn test_with_min_size() {
        let point = Extent::new(100.0, 200.0, 100.0, 200.0);
        assert_eq!(point.with_min_size(50.0), Extent::new(75.0, 175.0, 125.0, 225.0));

        let wide = Extent::new(0.0, 0.0, 1000.0, 0.0);
        assert_eq!(wide.with_min_size(50.0), Extent::new(0.0, -25.0, 1000.0, 25.0));
    }
}
