//! Coordinate type definitions

use thiserror::Error;

/// Half the Web Mercator world width in meters (EPSG:3857 origin shift).
pub const ORIGIN_SHIFT: f64 = 20_037_508.342_789_244;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.051_128_78;
pub const MAX_LAT: f64 = 85.051_128_78;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels accepted for basemap tiles
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 22;

/// Edge length of a slippy-map tile in pixels.
pub const TILE_SIZE: u32 = 256;

/// Slippy-map tile coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level
    pub zoom: u8,
}

impl TileCoord {
    /// Number of tiles along one axis at this tile's zoom level.
    #[inline]
    pub fn tiles_per_axis(&self) -> u32 {
        1u32 << self.zoom
    }
}

/// Inclusive rectangle of tiles at a single zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub zoom: u8,
    pub min_col: u32,
    pub max_col: u32,
    pub min_row: u32,
    pub max_row: u32,
}

impl TileRange {
    /// Number of columns covered by the range.
    pub fn cols(&self) -> u32 {
        self.max_col - self.min_col + 1
    }

    /// Number of rows covered by the range.
    pub fn rows(&self) -> u32 {
        self.max_row - self.min_row + 1
    }

    /// Total number of tiles in the range.
    pub fn len(&self) -> usize {
        self.cols() as usize * self.rows() as usize
    }

    /// A range always contains at least one tile.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Iterates tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = TileCoord> + '_ {
        (self.min_row..=self.max_row).flat_map(move |row| {
            (self.min_col..=self.max_col).map(move |col| TileCoord {
                row,
                col,
                zoom: self.zoom,
            })
        })
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Zoom level is outside the supported range
    #[error("Invalid zoom level: {0} (must be between {MIN_ZOOM} and {MAX_ZOOM})")]
    InvalidZoom(u8),

    /// A coordinate was NaN or infinite
    #[error("Non-finite coordinate ({x}, {y})")]
    NonFinite { x: f64, y: f64 },
}
