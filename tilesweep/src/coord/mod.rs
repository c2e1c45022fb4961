//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator slippy-map tile indices.

mod types;

#[cfg(test)]
mod tests;

pub use types::{
    tiles_per_axis, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 22)
///
/// # Returns
///
/// A `Result` containing the tile coordinates or an error if inputs are
/// outside the projection's domain.
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = tiles_per_axis(zoom) as f64;
    let max_index = tiles_per_axis(zoom) - 1;

    // lon = 180.0 and lat = MIN_LAT land exactly on the far edge; clamp them
    // into the last column/row.
    let x = (((lon + 180.0) / 360.0 * n).floor() as u32).min(max_index);

    // ln(tan φ + sec φ) == asinh(tan φ)
    let lat_rad = lat.to_radians();
    let y_f = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;
    let y = (y_f.floor().max(0.0) as u32).min(max_index);

    Ok(TileCoord { zoom, x, y })
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner, so a
/// round trip through [`to_tile_coords`] is only accurate to one tile.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = tiles_per_axis(tile.zoom) as f64;

    let lon = tile.x as f64 / n * 360.0 - 180.0;

    let y = tile.y as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad.to_degrees();

    (lat, lon)
}

/// Angular size of a tile as `(lat_span, lon_span)` in degrees.
///
/// Latitude span varies with row because of the Mercator stretch.
pub fn tile_span_degrees(tile: &TileCoord) -> (f64, f64) {
    let (north, west) = tile_to_lat_lon(tile);
    let n = tiles_per_axis(tile.zoom) as f64;
    let lat_rad = (PI * (1.0 - 2.0 * (tile.y as f64 + 1.0) / n)).sinh().atan();
    let south = lat_rad.to_degrees();
    let east = west + 360.0 / n;
    (north - south, east - west)
}
