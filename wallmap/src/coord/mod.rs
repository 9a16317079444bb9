//! Coordinate conversion module
//!
//! Conversions between geographic coordinates (WGS84 longitude/latitude) and
//! Web Mercator meters, plus the slippy-map tile math used by the basemap.

mod types;

pub use types::{
    CoordError, TileCoord, TileRange, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
    ORIGIN_SHIFT, TILE_SIZE,
};

use std::f64::consts::PI;

use crate::bounds::Extent;

/// Projects WGS84 longitude/latitude to Web Mercator meters.
///
/// Latitudes beyond the Mercator limit are clamped to ±85.0511°, so polar
/// geometry collapses onto the map edge instead of producing infinities.
#[inline]
pub fn to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(MIN_LAT, MAX_LAT);
    let x = lon * ORIGIN_SHIFT / 180.0;
    let y = ((90.0 + lat) * PI / 360.0).tan().ln() / (PI / 180.0);
    (x, y * ORIGIN_SHIFT / 180.0)
}

/// Inverse of [`to_web_mercator`].
#[inline]
pub fn from_web_mercator(x: f64, y: f64) -> (f64, f64) {
    let lon = x * 180.0 / ORIGIN_SHIFT;
    let lat = (y * PI / ORIGIN_SHIFT).exp().atan() * 360.0 / PI - 90.0;
    (lon, lat)
}

/// Web Mercator meters covered by one tile edge at `zoom`.
#[inline]
pub fn tile_span(zoom: u8) -> f64 {
    2.0 * ORIGIN_SHIFT / f64::from(1u32 << zoom)
}

/// Returns the tile containing the Web Mercator point at `zoom`.
///
/// Points outside the projected world are clamped onto the edge tiles.
pub fn tile_for_mercator(x: f64, y: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if !x.is_finite() || !y.is_finite() {
        return Err(CoordError::NonFinite { x, y });
    }

    let n = 1u32 << zoom;
    let span = tile_span(zoom);
    let col = ((x + ORIGIN_SHIFT) / span).floor();
    let row = ((ORIGIN_SHIFT - y) / span).floor();
    let clamp = |v: f64| v.clamp(0.0, f64::from(n - 1)) as u32;

    Ok(TileCoord {
        row: clamp(row),
        col: clamp(col),
        zoom,
    })
}

/// Web Mercator extent covered by a tile.
pub fn tile_extent(tile: &TileCoord) -> Extent {
    let span = tile_span(tile.zoom);
    let min_x = -ORIGIN_SHIFT + f64::from(tile.col) * span;
    let max_y = ORIGIN_SHIFT - f64::from(tile.row) * span;
    Extent::new(min_x, max_y - span, min_x + span, max_y)
}

/// Tiles needed to cover `extent` at `zoom`.
pub fn tiles_covering(extent: &Extent, zoom: u8) -> Result<TileRange, CoordError> {
    let nw = tile_for_mercator(extent.min_x, extent.max_y, zoom)?;
    let se = tile_for_mercator(extent.max_x, extent.min_y, zoom)?;

    Ok(TileRange {
        zoom,
        min_col: nw.col,
        max_col: se.col,
        min_row: nw.row,
        max_row: se.row,
    })
}

/// Picks the zoom whose native tile resolution best matches `meters_per_pixel`.
///
/// The result is clamped to `[min_zoom, max_zoom]`.
pub fn zoom_for_resolution(meters_per_pixel: f64, min_zoom: u8, max_zoom: u8) -> u8 {
    if !meters_per_pixel.is_finite() || meters_per_pixel <= 0.0 {
        return min_zoom;
    }
    let world_px = 2.0 * ORIGIN_SHIFT / meters_per_pixel;
    let zoom = (world_px / f64::from(TILE_SIZE)).log2().round();
    zoom.clamp(f64::from(min_zoom), f64::from(max_zoom)) as u8
}

#[cfg(test)]
mod tests;
