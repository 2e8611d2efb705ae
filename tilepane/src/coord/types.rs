//! Coordinate type definitions

use std::fmt;

/// Web Mercator valid latitude range
pub const MIN_LAT: f64 = -85.05112878;
pub const MAX_LAT: f64 = 85.05112878;

/// Valid longitude range
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Supported slippy-map zoom levels
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// Tile coordinates in the Web Mercator / slippy-map system.
///
/// Identifies one map tile; doubles as the cache key. The grid doubles in
/// both axes with each zoom level, so `x` and `y` run from `0` to
/// `2^zoom - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// X coordinate (east-west), 0 at the antimeridian
    pub x: u32,
    /// Y coordinate (north-south), 0 at north
    pub y: u32,
    /// Zoom level (0-18)
    pub zoom: u8,
}

impl TileCoord {
    /// Creates a tile coordinate.
    #[inline]
    pub fn new(x: u32, y: u32, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

/// Axis-aligned rectangle of tile indices at a single zoom level.
///
/// Bounds are inclusive on both ends. Produced by the viewport to describe
/// the set of tiles that must be resident, and consumed by the cache to
/// decide which entries are on-screen during eviction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub zoom: u8,
}

impl TileRect {
    /// Creates a rectangle from inclusive bounds.
    pub fn new(zoom: u8, min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        debug_assert!(min_x <= max_x && min_y <= max_y);
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            zoom,
        }
    }

    /// Creates a rectangle from possibly off-grid bounds, clamping each edge
    /// into `0..2^zoom`.
    ///
    /// Viewport math can place the top-left corner outside the grid (panning
    /// toward a pole or the antimeridian); the resident set is still the
    /// on-grid intersection.
    pub fn from_unclamped(zoom: u8, min_x: i64, min_y: i64, max_x: i64, max_y: i64) -> Self {
        let limit = (super::tile_count(zoom) - 1) as i64;
        let clamp = |v: i64| v.clamp(0, limit) as u32;
        Self {
            min_x: clamp(min_x),
            min_y: clamp(min_y),
            max_x: clamp(max_x),
            max_y: clamp(max_y),
            zoom,
        }
    }

    /// Whether `coord` lies inside this rectangle.
    ///
    /// A coordinate at a different zoom level is never inside: the rectangle
    /// describes one zoom's grid, and an equal (x, y) pair at another zoom
    /// names a different place on Earth.
    #[inline]
    pub fn contains(&self, coord: &TileCoord) -> bool {
        coord.zoom == self.zoom
            && (self.min_x..=self.max_x).contains(&coord.x)
            && (self.min_y..=self.max_y).contains(&coord.y)
    }

    /// Number of tile columns spanned.
    #[inline]
    pub fn columns(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    /// Number of tile rows spanned.
    #[inline]
    pub fn rows(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    /// Total tiles covered by the rectangle.
    #[inline]
    pub fn tile_count(&self) -> usize {
        self.columns() as usize * self.rows() as usize
    }

    /// Returns an iterator over every coordinate in the rectangle.
    ///
    /// Coordinates are yielded in row-major order (full top row first).
    pub fn iter(&self) -> TileRectIter {
        TileRectIter {
            rect: *self,
            current: 0,
        }
    }
}

/// Iterator over all tile coordinates in a [`TileRect`], row-major.
#[derive(Debug, Clone)]
pub struct TileRectIter {
    rect: TileRect,
    current: usize,
}

impl Iterator for TileRectIter {
    type Item = TileCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.rect.tile_count() {
            return None;
        }

        let cols = self.rect.columns() as usize;
        let x = self.rect.min_x + (self.current % cols) as u32;
        let y = self.rect.min_y + (self.current / cols) as u32;

        self.current += 1;

        Some(TileCoord {
            x,
            y,
            zoom: self.rect.zoom,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.rect.tile_count() - self.current;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileRectIter {
    fn len(&self) -> usize {
        self.rect.tile_count() - self.current
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-85.05112878 to 85.05112878)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180.0 to 180.0)
    InvalidLongitude(f64),
    /// Zoom level is outside valid range (0 to 18)
    InvalidZoom(u8),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
        }
    }
}

impl std::error::Error for CoordError {}
