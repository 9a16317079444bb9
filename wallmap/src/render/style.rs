//! Geometry drawing with per-layer styles.

use geo::{Geometry, LineString, Point, Polygon};
use tiny_skia::{Color, FillRule, LineCap, LineJoin, Paint, PathBuilder, Stroke, Transform};

use super::canvas::{points_to_pixels, Canvas, Viewport};
use crate::config::{parse_color, ConfigResult, StyleConfig};
use crate::layer::Layer;

/// A style with colors parsed and sizes converted to pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStyle {
    pub fill: Color,
    pub stroke: Color,
    pub stroke_width: f32,
    pub marker_radius: f32,
}

impl ResolvedStyle {
    /// Resolves a style, folding `opacity` into both colors.
    pub fn resolve(style: &StyleConfig, dpi: u32) -> ConfigResult<Self> {
        let mut fill = parse_color(&style.fill_color)?;
        let mut stroke = parse_color(&style.stroke_color)?;
        fill.apply_opacity(style.opacity);
        stroke.apply_opacity(style.opacity);

        Ok(Self {
            fill,
            stroke,
            stroke_width: points_to_pixels(style.stroke_width, dpi),
            marker_radius: points_to_pixels(style.marker_size, dpi) / 2.0,
        })
    }

    fn paint(color: Color) -> Paint<'static> {
        let mut paint = Paint {
            anti_alias: true,
            ..Paint::default()
        };
        paint.set_color(color);
        paint
    }

    fn stroke(&self) -> Option<Stroke> {
        (self.stroke_width > 0.0 && self.stroke.alpha() > 0.0).then(|| Stroke {
            width: self.stroke_width,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        })
    }
}

/// Draws every feature of `layer`. Returns the number of features drawn.
pub fn draw_layer(canvas: &mut Canvas, layer: &Layer, style: &ResolvedStyle) -> usize {
    let viewport = *canvas.viewport();
    let mut drawn = 0;
    for feature in layer {
        if draw_geometry(canvas, &viewport, &feature.geometry, style) {
            drawn += 1;
        }
    }
    drawn
}

fn draw_geometry(
    canvas: &mut Canvas,
    viewport: &Viewport,
    geometry: &Geometry<f64>,
    style: &ResolvedStyle,
) -> bool {
    match geometry {
        Geometry::Polygon(p) => draw_polygons(canvas, viewport, std::slice::from_ref(p), style),
        Geometry::MultiPolygon(mp) => draw_polygons(canvas, viewport, &mp.0, style),
        Geometry::Rect(r) => draw_polygons(canvas, viewport, &[r.to_polygon()], style),
        Geometry::Triangle(t) => draw_polygons(canvas, viewport, &[t.to_polygon()], style),
        Geometry::LineString(ls) => draw_lines(canvas, viewport, std::slice::from_ref(ls), style),
        Geometry::MultiLineString(mls) => draw_lines(canvas, viewport, &mls.0, style),
        Geometry::Line(l) => draw_lines(canvas, viewport, &[LineString::from(*l)], style),
        Geometry::Point(p) => draw_points(canvas, viewport, std::slice::from_ref(p), style),
        Geometry::MultiPoint(mp) => draw_points(canvas, viewport, &mp.0, style),
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .fold(false, |any, g| draw_geometry(canvas, viewport, g, style) || any),
    }
}

fn add_ring(pb: &mut PathBuilder, viewport: &Viewport, ring: &LineString<f64>, close: bool) {
    let mut coords = ring.coords();
    let Some(first) = coords.next() else {
        return;
    };
    let (x, y) = viewport.to_pixel(first.x, first.y);
    pb.move_to(x, y);
    for c in coords {
        let (x, y) = viewport.to_pixel(c.x, c.y);
        pb.line_to(x, y);
    }
    if close {
        pb.close();
    }
}

fn draw_polygons(
    canvas: &mut Canvas,
    viewport: &Viewport,
    polygons: &[Polygon<f64>],
    style: &ResolvedStyle,
) -> bool {
    let mut pb = PathBuilder::new();
    for polygon in polygons {
        add_ring(&mut pb, viewport, polygon.exterior(), true);
        for interior in polygon.interiors() {
            add_ring(&mut pb, viewport, interior, true);
        }
    }
    let Some(path) = pb.finish() else {
        return false;
    };

    let pixmap = canvas.pixmap_mut();
    pixmap.fill_path(
        &path,
        &ResolvedStyle::paint(style.fill),
        FillRule::EvenOdd,
        Transform::identity(),
        None,
    );
    if let Some(stroke) = style.stroke() {
        pixmap.stroke_path(
            &path,
            &ResolvedStyle::paint(style.stroke),
            &stroke,
            Transform::identity(),
            None,
        );
    }
    true
}

fn draw_lines(
    canvas: &mut Canvas,
    viewport: &Viewport,
    lines: &[LineString<f64>],
    style: &ResolvedStyle,
) -> bool {
    let mut pb = PathBuilder::new();
    for line in lines {
        add_ring(&mut pb, viewport, line, false);
    }
    let (Some(path), Some(stroke)) = (pb.finish(), style.stroke()) else {
        return false;
    };
    canvas.pixmap_mut().stroke_path(
        &path,
        &ResolvedStyle::paint(style.stroke),
        &stroke,
        Transform::identity(),
        None,
    );
    true
}

fn draw_points(
    canvas: &mut Canvas,
    viewport: &Viewport,
    points: &[Point<f64>],
    style: &ResolvedStyle,
) -> bool {
    let mut pb = PathBuilder::new();
    for p in points {
        let (x, y) = viewport.to_pixel(p.x(), p.y());
        pb.push_circle(x, y, style.marker_radius.max(0.5));
    }
    let Some(path) = pb.finish() else {
        return false;
    };

    let pixmap = canvas.pixmap_mut();
    pixmap.fill_path(
        &path,
        &ResolvedStyle::paint(style.fill),
        FillRule::Winding,
        Transform::identity(),
        None,
    );
    if let Some(stroke) = style.stroke() {
        let thin = Stroke {
            width: stroke.width.min(style.marker_radius),
            ..stroke
        };
        pixmap.stroke_path(
            &path,
            &ResolvedStyle::paint(style.stroke),
            &thin,
            Transform::identity(),
            None,
        );
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bounds::Extent;
    use crate::layer::{Crs, Feature};
    use geo::{line_string, point, polygon, GeometryCollection};

    fn canvas() -> Canvas {
        let vp = Viewport::new(Extent::new(0.0, 0.0, 100.0, 100.0), 100, 100);
        Canvas::new(vp, Color::WHITE).unwrap()
    }

    fn red_fill() -> ResolvedStyle {
        ResolvedStyle::resolve(
            &StyleConfig {
                fill_color: "red".to_string(),
                stroke_color: "none".to_string(),
                ..StyleConfig::default()
            },
            72,
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_converts_units_and_opacity() {
        let style = ResolvedStyle::resolve(
            &StyleConfig {
                stroke_width: 1.5,
                opacity: 0.5,
                ..StyleConfig::default()
            },
            300,
        )
        .unwrap();
        assert_eq!(style.stroke_width, 6.25);
        assert_eq!(style.marker_radius, 12.5);
        assert_eq!(style.fill.alpha(), 0.5);
        assert_eq!(style.stroke.alpha(), 0.5);
    }

    #[test]
    fn test_polygon_is_filled() {
        let mut canvas = canvas();
        let layer = Layer::from_features(
            Crs::WebMercator,
            [Feature::new(polygon![
                (x: 10.0, y: 10.0),
                (x: 50.0, y: 10.0),
                (x: 50.0, y: 50.0),
                (x: 10.0, y: 50.0),
            ])],
        );

        assert_eq!(draw_layer(&mut canvas, &layer, &red_fill()), 1);

        // map y=30 is pixel row 70
        let inside = canvas.pixmap().pixel(30, 70).unwrap();
        let outside = canvas.pixmap().pixel(80, 20).unwrap();
        assert_eq!((inside.red(), inside.green()), (255, 0));
        assert_eq!((outside.red(), outside.green()), (255, 255));
    }

    #[test]
    fn test_points_and_lines() {
        let mut canvas = canvas();
        let layer = Layer::from_features(
            Crs::WebMercator,
            [
                Feature::new(point!(x: 20.0, y: 80.0)),
                Feature::new(line_string![(x: 0.0, y: 50.0), (x: 100.0, y: 50.0)]),
            ],
        );
        let style = ResolvedStyle {
            marker_radius: 4.0,
            stroke_width: 2.0,
            ..red_fill()
        };
        let style = ResolvedStyle {
            stroke: Color::BLACK,
            ..style
        };

        assert_eq!(draw_layer(&mut canvas, &layer, &style), 2);

        let marker = canvas.pixmap().pixel(20, 20).unwrap();
        assert_eq!(marker.green(), 0);
        let line = canvas.pixmap().pixel(60, 50).unwrap();
        assert_eq!((line.red(), line.green(), line.blue()), (0, 0, 0));
    }

    #[test]
    fn test_empty_geometry_draws_nothing() {
        let mut canvas = canvas();
        let layer = Layer::from_features(
            Crs::WebMercator,
            [Feature::new(Geometry::GeometryCollection(GeometryCollection(Vec::new())))],
        );
        assert_eq!(draw_layer(&mut canvas, &layer, &red_fill()), 0);
    }
}
