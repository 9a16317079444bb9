//! Tests for coordinate conversion

use super::*;

fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() < tol, "{} != {} (tol {})", a, b, tol);
}

#[test]
fn test_origin_maps_to_zero() {
    let (x, y) = to_web_mercator(0.0, 0.0);
    assert_close(x, 0.0, 1e-6);
    assert_close(y, 0.0, 1e-6);
}

#[test]
fn test_madrid_projection() {
    // Madrid: 3.7038°W, 40.4168°N
    let (x, y) = to_web_mercator(-3.7038, 40.4168);
    assert_close(x, -412_305.0, 5.0);
    assert_close(y, 4_926_696.7, 1.0);
}

#[test]
fn test_roundtrip_projection() {
    for &(lon, lat) in &[(-5.66, 43.53), (2.17, 41.38), (-16.25, 28.46), (179.0, -60.0)] {
        let (x, y) = to_web_mercator(lon, lat);
        let (lon2, lat2) = from_web_mercator(x, y);
        assert_close(lon, lon2, 1e-9);
        assert_close(lat, lat2, 1e-9);
    }
}

#[test]
fn test_polar_latitude_is_clamped() {
    let (_, y) = to_web_mercator(0.0, 90.0);
    assert!(y.is_finite());
    assert_close(y, ORIGIN_SHIFT, 1.0);
}

#[test]
fn test_world_extent_is_square() {
    let (x, _) = to_web_mercator(180.0, 0.0);
    let (_, y) = to_web_mercator(0.0, MAX_LAT);
    assert_close(x, ORIGIN_SHIFT, 1e-6);
    assert_close(y, ORIGIN_SHIFT, 1.0);
}

#[test]
fn test_tile_for_mercator_zoom_one() {
    // At zoom 1: 2×2 tiles, the origin sits on the corner of tile (1, 1)
    let tile = tile_for_mercator(1.0, -1.0, 1).unwrap();
    assert_eq!(tile, TileCoord { row: 1, col: 1, zoom: 1 });

    let tile = tile_for_mercator(-1.0, 1.0, 1).unwrap();
    assert_eq!(tile, TileCoord { row: 0, col: 0, zoom: 1 });
}

#[test]
fn test_tile_for_mercator_clamps_outside_world() {
    let tile = tile_for_mercator(ORIGIN_SHIFT * 2.0, -ORIGIN_SHIFT * 2.0, 3).unwrap();
    assert_eq!(tile.col, 7);
    assert_eq!(tile.row, 7);
}

#[test]
fn test_invalid_zoom() {
    let result = tile_for_mercator(0.0, 0.0, MAX_ZOOM + 1);
    assert!(matches!(result, Err(CoordError::InvalidZoom(_))));
}

#[test]
fn test_non_finite_coordinate() {
    let result = tile_for_mercator(f64::NAN, 0.0, 3);
    assert!(matches!(result, Err(CoordError::NonFinite { .. })));
}

#[test]
fn test_tile_extent_matches_tile_lookup() {
    let tile = TileCoord { row: 5, col: 3, zoom: 4 };
    let extent = tile_extent(&tile);
    let (cx, cy) = extent.center();
    assert_eq!(tile_for_mercator(cx, cy, 4).unwrap(), tile);
    assert_close(extent.width(), tile_span(4), 1e-6);
    assert_close(extent.height(), tile_span(4), 1e-6);
}

#[test]
fn test_tiles_covering_spain() {
    let spain = Extent::new(-1_100_000.0, 4_200_000.0, 500_000.0, 5_500_000.0);
    let range = tiles_covering(&spain, 6).unwrap();
    assert!(range.min_col <= range.max_col);
    assert!(range.min_row <= range.max_row);
    assert_eq!(range.iter().count(), range.len());
    // Every tile in the range intersects the extent
    for tile in range.iter() {
        let e = tile_extent(&tile);
        assert!(e.max_x > spain.min_x && e.min_x < spain.max_x);
        assert!(e.max_y > spain.min_y && e.min_y < spain.max_y);
    }
}

#[test]
fn test_zoom_for_resolution() {
    // Zoom 0 tile: whole world in 256 px
    let world_mpp = 2.0 * ORIGIN_SHIFT / 256.0;
    assert_eq!(zoom_for_resolution(world_mpp, 0, 19), 0);
    assert_eq!(zoom_for_resolution(world_mpp / 1024.0, 0, 19), 10);
    assert_eq!(zoom_for_resolution(world_mpp / 1024.0, 0, 8), 8);
    assert_eq!(zoom_for_resolution(0.0, 2, 19), 2);
}
