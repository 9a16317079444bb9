//! Basemap compositing: pick a zoom, fetch tiles through the cache, stitch
//! them into one image and draw it under the map layers.

use image::{imageops, RgbaImage};
use thiserror::Error;
use tiny_skia::{ColorU8, Pixmap};
use tracing::{debug, info, warn};

use crate::bounds::Extent;
use crate::cache::{CacheError, TileCache};
use crate::config::Zoom;
use crate::coord::{tile_extent, tiles_covering, zoom_for_resolution, CoordError, TileCoord, TileRange, TILE_SIZE};
use crate::provider::{HttpClient, ProviderError, TileSource};
use crate::render::{Canvas, Viewport};

/// Upper bound on tiles fetched for one map.
pub const MAX_TILES: usize = 512;

#[derive(Debug, Error)]
pub enum BasemapError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Coord(#[from] CoordError),

    #[error("Failed to decode tile {zoom}/{col}/{row}: {reason}")]
    Decode {
        zoom: u8,
        col: u32,
        row: u32,
        reason: String,
    },

    #[error("Basemap needs {count} tiles at zoom {zoom}, limit is {max}")]
    TooManyTiles { count: usize, zoom: u8, max: usize },

    #[error("Failed to allocate a {width}x{height} basemap image")]
    Allocation { width: u32, height: u32 },
}

pub type BasemapResult<T> = Result<T, BasemapError>;

/// What a composited basemap consisted of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasemapReport {
    pub provider: String,
    pub zoom: u8,
    pub tiles: usize,
    pub cache_hits: usize,
}

/// Picks the zoom for a viewport: fixed levels are clamped to the provider
/// range, `auto` matches tile resolution to canvas resolution.
pub fn choose_zoom(zoom: Zoom, viewport: &Viewport, source: &TileSource) -> u8 {
    match zoom {
        Zoom::Level(level) => level.clamp(source.min_zoom(), source.max_zoom()),
        Zoom::Auto => zoom_for_resolution(
            viewport.meters_per_pixel(),
            source.min_zoom(),
            source.max_zoom(),
        ),
    }
}

/// Fetches and composites tiles from one source.
pub struct Basemap<'a, C: HttpClient> {
    source: &'a TileSource,
    cache: &'a TileCache,
    client: &'a C,
}

impl<'a, C: HttpClient> Basemap<'a, C> {
    pub fn new(source: &'a TileSource, cache: &'a TileCache, client: &'a C) -> Self {
        Self {
            source,
            cache,
            client,
        }
    }

    /// Returns the decoded tile and whether it came from the cache.
    ///
    /// Only tiles that decode are stored. A cached tile that no longer
    /// decodes is evicted and fetched again.
    pub fn tile_image(&self, tile: &TileCoord) -> BasemapResult<(RgbaImage, bool)> {
        let slug = self.source.slug();
        let ext = self.source.extension();

        if let Some(data) = self.cache.get(slug, tile, ext)? {
            match decode_tile(tile, &data) {
                Ok(image) => return Ok((image, true)),
                Err(e) => {
                    warn!(
                        zoom = tile.zoom,
                        col = tile.col,
                        row = tile.row,
                        error = %e,
                        "Evicting undecodable cached tile"
                    );
                    self.cache.remove(slug, tile, ext)?;
                }
            }
        }

        let data = self.source.fetch(self.client, tile)?;
        let image = decode_tile(tile, &data)?;
        self.cache.put(slug, tile, ext, &data)?;
        Ok((image, false))
    }

    /// Stitches every tile of `range` into one image.
    ///
    /// Returns the image, the map extent it covers and the number of cache hits.
    pub fn stitch(&self, range: &TileRange) -> BasemapResult<(RgbaImage, Extent, usize)> {
        if range.len() > MAX_TILES {
            return Err(BasemapError::TooManyTiles {
                count: range.len(),
                zoom: range.zoom,
                max: MAX_TILES,
            });
        }

        let mut mosaic = RgbaImage::new(range.cols() * TILE_SIZE, range.rows() * TILE_SIZE);
        let mut hits = 0;

        for tile in range.iter() {
            let (decoded, cached) = self.tile_image(&tile)?;
            hits += usize::from(cached);

            let x = (tile.col - range.min_col) * TILE_SIZE;
            let y = (tile.row - range.min_row) * TILE_SIZE;
            imageops::replace(&mut mosaic, &decoded, i64::from(x), i64::from(y));
        }

        let nw = tile_extent(&TileCoord {
            row: range.min_row,
            col: range.min_col,
            zoom: range.zoom,
        });
        let se = tile_extent(&TileCoord {
            row: range.max_row,
            col: range.max_col,
            zoom: range.zoom,
        });

        Ok((mosaic, nw.union(&se), hits))
    }

    /// Draws the basemap for the canvas viewport at `zoom` with `alpha`.
    pub fn composite(&self, canvas: &mut Canvas, zoom: u8, alpha: f32) -> BasemapResult<BasemapReport> {
        let range = tiles_covering(&canvas.viewport().extent(), zoom)?;
        debug!(
            provider = self.source.name(),
            zoom,
            tiles = range.len(),
            "Fetching basemap tiles"
        );

        let (mosaic, extent, cache_hits) = self.stitch(&range)?;
        let pixmap = to_pixmap(&mosaic)?;
        canvas.draw_image(&pixmap, &extent, alpha);

        info!(
            provider = self.source.name(),
            zoom,
            tiles = range.len(),
            cache_hits,
            "Basemap composited"
        );

        Ok(BasemapReport {
            provider: self.source.name().to_string(),
            zoom,
            tiles: range.len(),
            cache_hits,
        })
    }
}

/// Decodes a tile and scales it to `TILE_SIZE` when the server uses another size.
fn decode_tile(tile: &TileCoord, data: &[u8]) -> BasemapResult<RgbaImage> {
    let decoded = image::load_from_memory(data)
        .map_err(|e| BasemapError::Decode {
            zoom: tile.zoom,
            col: tile.col,
            row: tile.row,
            reason: e.to_string(),
        })?
        .to_rgba8();
    Ok(if decoded.dimensions() == (TILE_SIZE, TILE_SIZE) {
        decoded
    } else {
        imageops::resize(&decoded, TILE_SIZE, TILE_SIZE, imageops::FilterType::Triangle)
    })
}

/// Converts straight RGBA into tiny-skia's premultiplied pixmap.
fn to_pixmap(image: &RgbaImage) -> BasemapResult<Pixmap> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height).ok_or(BasemapError::Allocation { width, height })?;
    for (dst, src) in pixmap.pixels_mut().iter_mut().zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        *dst = ColorU8::from_rgba(r, g, b, a).premultiply();
    }
    Ok(pixmap)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;
    use image::{ImageFormat, Rgba};
    use std::io::Cursor;
    use tempfile::TempDir;
    use tiny_skia::Color;

    fn png_tile(color: [u8; 4]) -> Vec<u8> {
        let img = RgbaImage::from_pixel(TILE_SIZE, TILE_SIZE, Rgba(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    fn source() -> TileSource {
        TileSource::new("Test", "test", "https://tiles.test/{z}/{x}/{y}.png", 0, 19)
    }

    #[test]
    fn test_choose_zoom() {
        let src = source();
        // one 256 px tile spanning the world → zoom 0
        let world = Viewport::new(Extent::new(-20_037_508.34, -20_037_508.34, 20_037_508.34, 20_037_508.34), 256, 256);
        assert_eq!(choose_zoom(Zoom::Auto, &world, &src), 0);

        let spain = Viewport::new(Extent::new(-1_100_000.0, 4_200_000.0, 500_000.0, 5_500_000.0), 4000, 2250);
        let auto = choose_zoom(Zoom::Auto, &spain, &src);
        assert!((7..=9).contains(&auto), "zoom {}", auto);

        assert_eq!(choose_zoom(Zoom::Level(25), &spain, &src), 19);
        assert_eq!(choose_zoom(Zoom::Level(6), &spain, &src), 6);
    }

    #[test]
    fn test_tiles_are_cached() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let client = MockHttpClient::new(Ok(png_tile([0, 0, 255, 255])));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);
        let tile = TileCoord { row: 1, col: 2, zoom: 3 };

        let (_, cached) = basemap.tile_image(&tile).unwrap();
        assert!(!cached);
        let (_, cached) = basemap.tile_image(&tile).unwrap();
        assert!(cached);
        assert_eq!(client.calls(), 1);
        assert!(cache.tile_path("test", &tile, "png").exists());
    }

    #[test]
    fn test_composite_draws_tiles() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let client = MockHttpClient::new(Ok(png_tile([0, 0, 255, 255])));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        let vp = Viewport::new(Extent::new(-1_100_000.0, 4_200_000.0, 500_000.0, 5_500_000.0), 64, 36);
        let mut canvas = Canvas::new(vp, Color::WHITE).unwrap();

        let report = basemap.composite(&mut canvas, 4, 1.0).unwrap();

        assert_eq!(report.zoom, 4);
        assert_eq!(report.tiles, client.calls());
        assert_eq!(report.cache_hits, 0);
        let pixel = canvas.pixmap().pixel(32, 18).unwrap();
        assert_eq!((pixel.red(), pixel.blue()), (0, 255));
    }

    #[test]
    fn test_network_error_propagates() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let client = MockHttpClient::new(Err(ProviderError::Http("connection refused".into())));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        let vp = Viewport::new(Extent::new(0.0, 0.0, 1000.0, 1000.0), 10, 10);
        let mut canvas = Canvas::new(vp, Color::WHITE).unwrap();
        let err = basemap.composite(&mut canvas, 5, 1.0).unwrap_err();
        assert!(matches!(err, BasemapError::Provider(ProviderError::Http(_))));
    }

    #[test]
    fn test_undecodable_tile() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let client = MockHttpClient::new(Ok(b"<html>rate limited</html>".to_vec()));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        let range = TileRange { zoom: 1, min_col: 0, max_col: 0, min_row: 0, max_row: 0 };
        assert!(matches!(basemap.stitch(&range), Err(BasemapError::Decode { .. })));
        assert_eq!(cache.info().unwrap().files(), 0);

        let tile = TileCoord { row: 0, col: 0, zoom: 1 };
        assert!(!cache.tile_path("test", &tile, "png").exists());
    }

    #[test]
    fn test_corrupt_cached_tile_is_refetched() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let tile = TileCoord { row: 0, col: 1, zoom: 1 };
        cache.put("test", &tile, "png", b"<html>busy</html>").unwrap();

        let client = MockHttpClient::new(Ok(png_tile([0, 255, 0, 255])));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        let (image, cached) = basemap.tile_image(&tile).unwrap();
        assert!(!cached);
        assert_eq!(image.get_pixel(0, 0).0, [0, 255, 0, 255]);
        assert_eq!(client.calls(), 1);

        let (_, cached) = basemap.tile_image(&tile).unwrap();
        assert!(cached);
        assert_eq!(client.calls(), 1);
    }

    #[test]
    fn test_corrupt_cached_tile_with_failing_fetch() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let tile = TileCoord { row: 0, col: 0, zoom: 1 };
        cache.put("test", &tile, "png", b"not an image").unwrap();

        let client = MockHttpClient::new(Ok(b"<html>still busy</html>".to_vec()));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        assert!(matches!(basemap.tile_image(&tile), Err(BasemapError::Decode { .. })));
        assert!(!cache.tile_path("test", &tile, "png").exists());
    }

    #[test]
    fn test_too_many_tiles() {
        let dir = TempDir::new().unwrap();
        let cache = TileCache::new(dir.path());
        let client = MockHttpClient::new(Ok(Vec::new()));
        let src = source();
        let basemap = Basemap::new(&src, &cache, &client);

        let range = TileRange { zoom: 10, min_col: 0, max_col: 99, min_row: 0, max_row: 99 };
        assert!(matches!(basemap.stitch(&range), Err(BasemapError::TooManyTiles { .. })));
        assert_eq!(client.calls(), 0);
    }
}
