//! Coordinate conversion between geographic WGS84 positions and slippy-map
//! tile space.
//!
//! Uses the standard Web Mercator tiling scheme: at zoom level `z` the world
//! is a `2^z` by `2^z` grid of square tiles, with x growing eastward from the
//! antimeridian and y growing southward from the north edge of the projection.
//! Alongside the forward and inverse index conversions this module provides
//! the per-pixel degree scales a renderer needs to position tiles on screen.

pub mod types;

pub use types::{
    CoordError, TileCoord, TileRect, TileRectIter, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Number of tiles along one axis of the grid at `zoom`.
#[inline]
pub fn tile_count(zoom: u8) -> u32 {
    debug_assert!(zoom <= MAX_ZOOM);
    1u32 << zoom
}

/// Converts longitude to an (unclamped) tile x index at `zoom`.
///
/// The result can land one step off the grid: longitude 180.0 maps to
/// `2^zoom`. Callers that need an on-grid index clamp, as [`tile_for`] does.
#[inline]
pub fn lon_to_tile_x(lon: f64, zoom: u8) -> i64 {
    let n = f64::from(tile_count(zoom));
    (n * (lon + 180.0) / 360.0).floor() as i64
}

/// Converts latitude to an (unclamped) tile y index at `zoom`.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> i64 {
    let n = f64::from(tile_count(zoom));
    let lat_rad = lat.to_radians();
    (n * (1.0 - lat_rad.tan().asinh() / PI) / 2.0).floor() as i64
}

/// Longitude of the western (left) edge of tile column `x` at `zoom`.
#[inline]
pub fn tile_x_to_lon(x: i64, zoom: u8) -> f64 {
    let n = f64::from(tile_count(zoom));
    x as f64 / n * 360.0 - 180.0
}

/// Latitude of the northern (top) edge of tile row `y` at `zoom`.
#[inline]
pub fn tile_y_to_lat(y: i64, zoom: u8) -> f64 {
    let n = f64::from(tile_count(zoom));
    let inner = PI * (1.0 - 2.0 * y as f64 / n);
    inner.sinh().atan().to_degrees()
}

/// Degrees of longitude covered by one screen pixel at `zoom`.
#[inline]
pub fn lon_per_pixel(zoom: u8, tile_size: u32) -> f64 {
    360.0 / f64::from(tile_count(zoom)) / f64::from(tile_size)
}

/// Degrees of latitude covered by one screen pixel at `zoom`, near `lat`.
///
/// Mercator stretches vertically toward the poles, so the latitude scale
/// shrinks by `cos(lat)` relative to the longitude scale.
#[inline]
pub fn lat_per_pixel(lat: f64, zoom: u8, tile_size: u32) -> f64 {
    lon_per_pixel(zoom, tile_size) * lat.to_radians().cos()
}

/// Converts a geographic position to the tile containing it.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 18)
///
/// # Returns
///
/// The tile coordinate containing the position, or an error if any input is
/// outside its valid range (NaN is rejected by the same range checks).
///
/// asinh(tan(85.05112878°)) sits a hair past π and longitude 180.0 maps to
/// the wrap column, so the raw index math can step one past the grid edge at
/// the extremes; the computed indices are clamped onto the grid. Out-of-range
/// inputs are never clamped, they are rejected.
pub fn tile_for(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if !(MIN_ZOOM..=MAX_ZOOM).contains(&zoom) {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let limit = i64::from(tile_count(zoom) - 1);
    let x = lon_to_tile_x(lon, zoom).clamp(0, limit) as u32;
    let y = lat_to_tile_y(lat, zoom).clamp(0, limit) as u32;

    Ok(TileCoord { x, y, zoom })
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Any valid position maps onto the grid.
        #[test]
        fn tile_always_on_grid(
            lat in MIN_LAT..=MAX_LAT,
            lon in MIN_LON..=MAX_LON,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            let coord = tile_for(lat, lon, zoom).unwrap();
            prop_assert!(coord.x < tile_count(zoom));
            prop_assert!(coord.y < tile_count(zoom));
        }

        /// Forward then inverse brackets the position within one tile.
        /// The inverse goes through sinh/atan, so allow ulp-level drift at
        /// tile edges.
        #[test]
        fn roundtrip_brackets_position(
            lat in -84.0..84.0f64,
            lon in -179.0..179.0f64,
            zoom in 1u8..=MAX_ZOOM,
        ) {
            const TOLERANCE: f64 = 1e-6;
            let coord = tile_for(lat, lon, zoom).unwrap();

            let west = tile_x_to_lon(i64::from(coord.x), zoom);
            let east = tile_x_to_lon(i64::from(coord.x) + 1, zoom);
            prop_assert!(west - TOLERANCE <= lon && lon < east + TOLERANCE);

            let north = tile_y_to_lat(i64::from(coord.y), zoom);
            let south = tile_y_to_lat(i64::from(coord.y) + 1, zoom);
            prop_assert!(south - TOLERANCE <= lat && lat <= north + TOLERANCE);
        }

        /// Tile x never decreases as longitude increases.
        #[test]
        fn x_monotonic_in_longitude(
            lon1 in MIN_LON..=MAX_LON,
            lon2 in MIN_LON..=MAX_LON,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            let (lo, hi) = if lon1 <= lon2 { (lon1, lon2) } else { (lon2, lon1) };
            let a = tile_for(0.0, lo, zoom).unwrap();
            let b = tile_for(0.0, hi, zoom).unwrap();
            prop_assert!(a.x <= b.x);
        }

        /// Tile y never decreases as latitude decreases (y grows southward).
        #[test]
        fn y_monotonic_in_latitude(
            lat1 in MIN_LAT..=MAX_LAT,
            lat2 in MIN_LAT..=MAX_LAT,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            let (hi, lo) = if lat1 >= lat2 { (lat1, lat2) } else { (lat2, lat1) };
            let a = tile_for(hi, 0.0, zoom).unwrap();
            let b = tile_for(lo, 0.0, zoom).unwrap();
            prop_assert!(a.y <= b.y);
        }

        /// Out-of-range latitude is always rejected, never clamped.
        #[test]
        fn out_of_range_latitude_rejected(
            lat in 85.06..90.0f64,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            prop_assert!(tile_for(lat, 0.0, zoom).is_err());
            prop_assert!(tile_for(-lat, 0.0, zoom).is_err());
        }

        /// The latitude scale never exceeds the longitude scale.
        #[test]
        fn lat_scale_bounded_by_lon_scale(
            lat in MIN_LAT..=MAX_LAT,
            zoom in MIN_ZOOM..=MAX_ZOOM,
        ) {
            let lon_pp = lon_per_pixel(zoom, 256);
            let lat_pp = lat_per_pixel(lat, zoom, 256);
            prop_assert!(lat_pp > 0.0);
            prop_assert!(lat_pp <= lon_pp);
        }
    }
}
