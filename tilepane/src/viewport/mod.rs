//! Camera state and visible-region math.
//!
//! A [`Viewport`] is the camera over the map: a geographic center, a zoom
//! level, and a screen size in pixels. From those it derives the two things
//! the rest of the engine needs each frame: the rectangle of tile indices
//! that must be resident to cover the screen ([`Viewport::tile_rect`]) and
//! where each of those tiles lands in screen space
//! ([`Viewport::tile_screen_position`]).
//!
//! The viewport holds no tiles and talks to no cache. Hosts mutate it from
//! input events and feed its tile rectangle to the cache's ensure and trim
//! operations.

use crate::coord::{
    self, CoordError, TileCoord, TileRect, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON, MIN_ZOOM,
};

/// Edge length of a square map tile in pixels, as served by standard
/// slippy-map tile servers.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Camera over the Mercator tile grid.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    latitude: f64,
    longitude: f64,
    zoom: u8,
    width: u32,
    height: u32,
    tile_size: u32,
}

impl Viewport {
    /// Creates a viewport centered on the given position.
    ///
    /// # Arguments
    ///
    /// * `latitude` / `longitude` - Center of the view, in WGS84 degrees.
    /// * `zoom` - Tile zoom level, 0 to 18.
    /// * `width` / `height` - Screen size in pixels.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError`] when the center lies outside the projection's
    /// domain or the zoom level is out of range.
    pub fn new(
        latitude: f64,
        longitude: f64,
        zoom: u8,
        width: u32,
        height: u32,
    ) -> Result<Self, CoordError> {
        coord::tile_for(latitude, longitude, zoom)?;
        Ok(Self {
            latitude,
            longitude,
            zoom,
            width,
            height,
            tile_size: DEFAULT_TILE_SIZE,
        })
    }

    /// Replaces the tile edge length, for servers with non-standard tiles.
    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        debug_assert!(tile_size > 0);
        self.tile_size = tile_size;
        self
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn tile_size(&self) -> u32 {
        self.tile_size
    }

    /// Jumps the camera to a new center and zoom level in one step.
    ///
    /// # Errors
    ///
    /// Returns [`CoordError`] and leaves the viewport unchanged when the
    /// position is outside the projection's domain or the zoom level is
    /// out of range. No field changes unless the whole jump is valid.
    pub fn move_to(&mut self, latitude: f64, longitude: f64, zoom: u8) -> Result<(), CoordError> {
        coord::tile_for(latitude, longitude, zoom)?;
        self.latitude = latitude;
        self.longitude = longitude;
        self.zoom = zoom;
        Ok(())
    }

    /// Pans as though the map surface were dragged by `(dx, dy)` pixels.
    ///
    /// Dragging right (positive `dx`) reveals terrain to the west, dragging
    /// down (positive `dy`) reveals terrain to the north. The center clamps
    /// at the projection's edges rather than wrapping.
    pub fn pan_by_pixels(&mut self, dx: f64, dy: f64) {
        let (lon_pp, lat_pp) = self.degrees_per_pixel();
        self.longitude = (self.longitude - dx * lon_pp).clamp(MIN_LON, MAX_LON);
        self.latitude = (self.latitude + dy * lat_pp).clamp(MIN_LAT, MAX_LAT);
    }

    /// Steps one zoom level in. Returns whether the level changed.
    pub fn zoom_in(&mut self) -> bool {
        if self.zoom < MAX_ZOOM {
            self.zoom += 1;
            true
        } else {
            false
        }
    }

    /// Steps one zoom level out. Returns whether the level changed.
    pub fn zoom_out(&mut self) -> bool {
        if self.zoom > MIN_ZOOM {
            self.zoom -= 1;
            true
        } else {
            false
        }
    }

    /// Adopts a new screen size after a host window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    /// Degree extent of one screen pixel at the current center and zoom,
    /// as `(longitude, latitude)` per pixel.
    ///
    /// The latitude scale carries the Mercator cosine correction, so the
    /// two differ everywhere but the equator.
    pub fn degrees_per_pixel(&self) -> (f64, f64) {
        (
            coord::lon_per_pixel(self.zoom, self.tile_size),
            coord::lat_per_pixel(self.latitude, self.zoom, self.tile_size),
        )
    }

    /// Geographic position of the screen's top-left pixel, as
    /// `(latitude, longitude)`.
    pub fn top_left(&self) -> (f64, f64) {
        let (lon_pp, lat_pp) = self.degrees_per_pixel();
        let lat = self.latitude + (self.height / 2) as f64 * lat_pp;
        let lon = self.longitude - (self.width / 2) as f64 * lon_pp;
        (lat, lon)
    }

    /// The rectangle of tiles needed to cover the screen.
    ///
    /// Spans from the tile under the top-left pixel to one extra column and
    /// row past the screen's tile width, so a partially visible edge tile is
    /// always included. Clamped to the grid, so near the projection's edges
    /// the rectangle is smaller than the screen would suggest.
    pub fn tile_rect(&self) -> TileRect {
        let (tl_lat, tl_lon) = self.top_left();
        let min_x = coord::lon_to_tile_x(tl_lon, self.zoom);
        let min_y = coord::lat_to_tile_y(tl_lat, self.zoom);
        let columns = (self.width / self.tile_size) as i64 + 1;
        let rows = (self.height / self.tile_size) as i64 + 1;
        TileRect::from_unclamped(self.zoom, min_x, min_y, min_x + columns, min_y + rows)
    }

    /// Screen position of `tile`'s north-west corner, in pixels from the
    /// screen's top-left corner. Off-screen tiles yield negative or
    /// past-the-edge positions.
    pub fn tile_screen_position(&self, tile: &TileCoord) -> (f64, f64) {
        debug_assert!(tile.zoom == self.zoom);
        let (tl_lat, tl_lon) = self.top_left();
        let (lon_pp, lat_pp) = self.degrees_per_pixel();
        let tile_lon = coord::tile_x_to_lon(tile.x as i64, tile.zoom);
        let tile_lat = coord::tile_y_to_lat(tile.y as i64, tile.zoom);
        let x = (tile_lon - tl_lon) / lon_pp;
        let y = (tl_lat - tile_lat) / lat_pp;
        (x, y)
    }
}
