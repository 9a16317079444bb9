//! Pixel canvas and the world-to-pixel mapping.

use std::io;
use std::path::Path;

use tiny_skia::{Color, FilterQuality, Pixmap, PixmapPaint, Transform};

use super::{RenderError, RenderResult};
use crate::bounds::Extent;
use crate::fsutil::write_atomic;

/// Converts typographic points to pixels at `dpi`.
pub fn points_to_pixels(points: f32, dpi: u32) -> f32 {
    points * dpi as f32 / 72.0
}

/// Maps Web Mercator coordinates onto a pixel grid with equal scale on
/// both axes.
///
/// The requested bounds are centred and the shorter axis is widened to the
/// canvas aspect ratio, so the visible extent always contains them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    extent: Extent,
    width: u32,
    height: u32,
}

impl Viewport {
    pub fn new(bounds: Extent, width: u32, height: u32) -> Self {
        let aspect = f64::from(width) / f64::from(height);
        Self {
            extent: bounds.fit_aspect(aspect),
            width,
            height,
        }
    }

    /// Visible extent after aspect fitting.
    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixels per map unit.
    pub fn scale(&self) -> f64 {
        f64::from(self.width) / self.extent.width()
    }

    pub fn meters_per_pixel(&self) -> f64 {
        self.extent.width() / f64::from(self.width)
    }

    pub fn to_pixel(&self, x: f64, y: f64) -> (f32, f32) {
        let scale = self.scale();
        (
            ((x - self.extent.min_x) * scale) as f32,
            ((self.extent.max_y - y) * scale) as f32,
        )
    }
}

/// A pixmap paired with its viewport.
pub struct Canvas {
    pixmap: Pixmap,
    viewport: Viewport,
}

impl Canvas {
    /// Allocates a canvas filled with `background`.
    pub fn new(viewport: Viewport, background: Color) -> RenderResult<Self> {
        let mut pixmap = Pixmap::new(viewport.width(), viewport.height()).ok_or(
            RenderError::Canvas {
                width: viewport.width(),
                height: viewport.height(),
            },
        )?;
        pixmap.fill(background);
        Ok(Self { pixmap, viewport })
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn pixmap_mut(&mut self) -> &mut Pixmap {
        &mut self.pixmap
    }

    /// Draws `image` stretched over the map-space `extent`.
    pub fn draw_image(&mut self, image: &Pixmap, extent: &Extent, opacity: f32) {
        let (left, top) = self.viewport.to_pixel(extent.min_x, extent.max_y);
        let (right, bottom) = self.viewport.to_pixel(extent.max_x, extent.min_y);
        let sx = (right - left) / image.width() as f32;
        let sy = (bottom - top) / image.height() as f32;

        let paint = PixmapPaint {
            opacity,
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            image.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, left, top),
            None,
        );
    }

    /// Encodes the canvas as PNG with a pHYs chunk for `dpi`.
    pub fn encode_png(&self, dpi: u32) -> io::Result<Vec<u8>> {
        let mut data = Vec::with_capacity(self.pixmap.data().len());
        for pixel in self.pixmap.pixels() {
            let c = pixel.demultiply();
            data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
        }

        let mut out = Vec::new();
        {
            let mut encoder = png::Encoder::new(&mut out, self.pixmap.width(), self.pixmap.height());
            encoder.set_color(png::ColorType::Rgba);
            encoder.set_depth(png::BitDepth::Eight);
            let ppm = (f64::from(dpi) / 0.0254).round() as u32;
            encoder.set_pixel_dims(Some(png::PixelDimensions {
                xppu: ppm,
                yppu: ppm,
                unit: png::Unit::Meter,
            }));
            let mut writer = encoder.write_header().map_err(io::Error::other)?;
            writer.write_image_data(&data).map_err(io::Error::other)?;
            writer.finish().map_err(io::Error::other)?;
        }
        Ok(out)
    }

    /// Writes the PNG next to `path` and renames it into place.
    pub fn save_png(&self, path: &Path, dpi: u32) -> RenderResult<()> {
        let save_err = |source| RenderError::Save {
            path: path.to_path_buf(),
            source,
        };
        let bytes = self.encode_png(dpi).map_err(save_err)?;
        write_atomic(path, &bytes).map_err(save_err)
    }
}
