//! Tests for coordinate conversion

use super::*;
use proptest::prelude::*;

#[test]
fn test_new_york_city_at_zoom_16() {
    // New York City: 40.7128°N, 74.0060°W
    let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
    assert_eq!(tile.x, 19295, "NYC longitude should map to x 19295 at zoom 16");
    assert_eq!(tile.y, 24640, "NYC latitude should map to y 24640 at zoom 16");
    assert_eq!(tile.zoom, 16);
}

#[test]
fn test_london_at_zoom_10() {
    let tile = to_tile_coords(51.5074, -0.1278, 10).unwrap();
    assert_eq!(tile.x, 511);
    assert_eq!(tile.y, 340);
}

#[test]
fn test_equator_prime_meridian() {
    // At zoom 1 the world is 2×2 tiles and 0,0 falls in the south-east one
    let tile = to_tile_coords(0.0, 0.0, 1).unwrap();
    assert_eq!((tile.x, tile.y), (1, 1));
}

#[test]
fn test_zoom_zero_is_single_tile() {
    for (lat, lon) in [(80.0, -179.0), (-80.0, 179.0), (0.0, 0.0)] {
        let tile = to_tile_coords(lat, lon, 0).unwrap();
        assert_eq!((tile.x, tile.y), (0, 0));
    }
}

#[test]
fn test_domain_edges_clamp_into_grid() {
    let north = to_tile_coords(MAX_LAT, 0.0, 10).unwrap();
    assert_eq!(north.y, 0);

    let south = to_tile_coords(MIN_LAT, 0.0, 10).unwrap();
    assert_eq!(south.y, 1023);

    let east = to_tile_coords(0.0, MAX_LON, 10).unwrap();
    assert_eq!(east.x, 1023);
}

#[test]
fn test_invalid_latitude_too_high() {
    let result = to_tile_coords(90.0, 0.0, 10);
    assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
}

#[test]
fn test_invalid_latitude_too_low() {
    let result = to_tile_coords(-85.1, 0.0, 10);
    assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
}

#[test]
fn test_invalid_longitude() {
    assert!(matches!(
        to_tile_coords(0.0, 181.0, 10),
        Err(CoordError::InvalidLongitude(_))
    ));
    assert!(matches!(
        to_tile_coords(0.0, -181.0, 10),
        Err(CoordError::InvalidLongitude(_))
    ));
}

#[test]
fn test_nan_is_rejected() {
    assert!(to_tile_coords(f64::NAN, 0.0, 3).is_err());
    assert!(to_tile_coords(0.0, f64::NAN, 3).is_err());
}

#[test]
fn test_invalid_zoom_too_high() {
    let result = to_tile_coords(0.0, 0.0, MAX_ZOOM + 1);
    assert!(matches!(result, Err(CoordError::InvalidZoom(_))));
}

#[test]
fn test_tile_new_rejects_out_of_grid() {
    assert!(TileCoord::new(1, 1, 1).is_ok());
    assert_eq!(
        TileCoord::new(1, 2, 0),
        Err(CoordError::OutOfGrid { zoom: 1, x: 2, y: 0 })
    );
}

#[test]
fn test_tile_to_lat_lon_origin() {
    let (lat, lon) = tile_to_lat_lon(&TileCoord { zoom: 3, x: 0, y: 0 });
    assert!((lat - MAX_LAT).abs() < 1e-6);
    assert!((lon - MIN_LON).abs() < 1e-9);
}

#[test]
fn test_quadkey() {
    assert_eq!(TileCoord { zoom: 0, x: 0, y: 0 }.quadkey(), "");
    assert_eq!(TileCoord { zoom: 1, x: 1, y: 1 }.quadkey(), "3");
    // Example from the Bing Maps tile system documentation
    assert_eq!(TileCoord { zoom: 3, x: 3, y: 5 }.quadkey(), "213");
}

#[test]
fn test_display() {
    assert_eq!(TileCoord { zoom: 7, x: 12, y: 40 }.to_string(), "7/12/40");
}

proptest! {
    /// Property: unproject(project(p)) lands within one tile of p.
    #[test]
    fn prop_roundtrip_within_one_tile(
        lat in -85.0f64..85.0f64,
        lon in -180.0f64..180.0f64,
        zoom in 0u8..=16u8,
    ) {
        let tile = to_tile_coords(lat, lon, zoom).unwrap();
        let (corner_lat, corner_lon) = tile_to_lat_lon(&tile);
        let (lat_span, lon_span) = tile_span_degrees(&tile);

        // The corner is the north-west one, so the point lies south-east of it
        prop_assert!(corner_lat >= lat - 1e-9);
        prop_assert!(corner_lat - lat <= lat_span + 1e-9);
        prop_assert!(corner_lon <= lon + 1e-9);
        prop_assert!(lon - corner_lon <= lon_span + 1e-9);
    }

    /// Property: projected indices always fall inside the zoom's grid.
    #[test]
    fn prop_indices_within_grid(
        lat in MIN_LAT..=MAX_LAT,
        lon in MIN_LON..=MAX_LON,
        zoom in 0u8..=MAX_ZOOM,
    ) {
        let tile = to_tile_coords(lat, lon, zoom).unwrap();
        prop_assert!(tile.x < tiles_per_axis(zoom));
        prop_assert!(tile.y < tiles_per_axis(zoom));
    }
}
