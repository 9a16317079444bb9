//! Text labels: anchor collection and outlined text drawing.
//!
//! Text goes through `usvg`/`resvg`: labels are written as SVG `<text>`
//! elements with `paint-order="stroke"` and rendered over the canvas in one
//! pass.

use std::fmt::Write as _;

use resvg::usvg;
use tiny_skia::{Color, Transform};
use tracing::debug;

use super::canvas::{points_to_pixels, Canvas};
use super::{RenderError, RenderResult};
use crate::config::{is_light, parse_color, ConfigResult, FontWeight, LabelConfig, AUTO_OUTLINE};
use crate::layer::Layer;

const FONT_FAMILY: &str = "DejaVu Sans, Liberation Sans, Arial, Helvetica, sans-serif";

/// One label in map coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub x: f64,
    pub y: f64,
}

/// Collects labels for every feature with a non-null `field` value.
///
/// Points are labelled at their position, other geometries at their
/// centroid. Returns `None` when the layer has no such column.
pub fn collect_labels(layer: &Layer, field: &str) -> Option<Vec<Label>> {
    if !layer.has_column(field) {
        return None;
    }
    let labels = layer
        .iter()
        .filter_map(|feature| {
            let value = feature.get(field);
            if value.is_null() {
                return None;
            }
            let (x, y) = feature.label_anchor()?;
            Some(Label {
                text: value.to_string(),
                x,
                y,
            })
        })
        .collect();
    Some(labels)
}

/// Resolves the `auto` outline: black behind light text, white otherwise.
pub fn resolve_outline_color(font_color: &str, outline_color: &str) -> ConfigResult<Color> {
    if outline_color.trim().eq_ignore_ascii_case(AUTO_OUTLINE) {
        let font = parse_color(font_color)?;
        Ok(if is_light(&font) {
            Color::BLACK
        } else {
            Color::WHITE
        })
    } else {
        parse_color(outline_color)
    }
}

/// Label appearance in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelStyle {
    pub font_size: f32,
    pub weight: FontWeight,
    pub fill: Color,
    pub outline: Color,
    pub outline_width: f32,
}

impl LabelStyle {
    pub fn resolve(config: &LabelConfig, dpi: u32) -> ConfigResult<Self> {
        Ok(Self {
            font_size: points_to_pixels(config.font_size, dpi),
            weight: config.font_weight,
            fill: parse_color(&config.font_color)?,
            outline: resolve_outline_color(&config.font_color, &config.outline_color)?,
            outline_width: points_to_pixels(config.outline_width, dpi),
        })
    }
}

/// Draws text with system fonts loaded once.
pub struct LabelRenderer {
    options: usvg::Options<'static>,
}

impl LabelRenderer {
    pub fn new() -> Self {
        let mut options = usvg::Options::default();
        options.fontdb_mut().load_system_fonts();
        debug!(faces = options.fontdb.len(), "Loaded system fonts");
        Self { options }
    }

    /// Draws `labels` centred on their anchors. Returns how many were drawn.
    pub fn draw(
        &self,
        canvas: &mut Canvas,
        labels: &[Label],
        style: &LabelStyle,
    ) -> RenderResult<usize> {
        if labels.is_empty() {
            return Ok(0);
        }

        let svg = label_svg(canvas, labels, style);
        let tree = usvg::Tree::from_str(&svg, &self.options)
            .map_err(|e| RenderError::Labels(e.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut canvas.pixmap_mut().as_mut());
        Ok(labels.len())
    }
}

impl Default for LabelRenderer {
    fn default() -> Self {
        Self::new()
    }
}

fn label_svg(canvas: &Canvas, labels: &[Label], style: &LabelStyle) -> String {
    let vp = canvas.viewport();
    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = vp.width(),
        h = vp.height()
    );
    let _ = write!(
        svg,
        r#"<g font-family="{}" font-size="{}" font-weight="{}" fill="{}" fill-opacity="{}" stroke="{}" stroke-opacity="{}" stroke-width="{}" stroke-linejoin="round" paint-order="stroke" text-anchor="middle" dominant-baseline="central">"#,
        FONT_FAMILY,
        style.font_size,
        style.weight.css(),
        hex(&style.fill),
        style.fill.alpha(),
        hex(&style.outline),
        style.outline.alpha(),
        style.outline_width,
    );
    for label in labels {
        let (x, y) = vp.to_pixel(label.x, label.y);
        let _ = write!(svg, r#"<text x="{}" y="{}">{}</text>"#, x, y, escape(&label.text));
    }
    svg.push_str("</g></svg>");
    svg
}

fn hex(color: &Color) -> String {
    let c = color.to_color_u8();
    format!("#{:02x}{:02x}{:02x}", c.red(), c.green(), c.blue())
}

/// Escapes markup and drops characters XML 1.0 cannot carry. Line breaks
/// and tabs become spaces.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\t' | '\n' | '\r' => out.push(' '),
            c if c < ' ' || c == '\u{FFFE}' || c == '\u{FFFF}' => {}
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
