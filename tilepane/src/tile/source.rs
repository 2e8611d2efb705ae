//! Tile server endpoint configuration and URL construction.
//!
//! # URL Pattern
//!
//! `{base_url}/{zoom}/{x}/{y}.png`
//!
//! This is the standard slippy-map layout served by OpenStreetMap and most
//! XYZ tile servers. The base URL is normalized once at construction so the
//! generated URLs never contain a doubled slash, regardless of whether the
//! configured endpoint carries a trailing one.

use crate::coord::TileCoord;

/// An XYZ tile server endpoint.
///
/// Cheap to clone; holds only the normalized base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileSource {
    base_url: String,
}

impl TileSource {
    /// Creates a tile source for the given endpoint.
    ///
    /// Trailing slashes on `base_url` are stripped so that
    /// `https://tile.example/` and `https://tile.example` name the same
    /// endpoint.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// The normalized endpoint, without a trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the URL for one tile.
    pub fn tile_url(&self, coord: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}.png",
            self.base_url, coord.zoom, coord.x, coord.y
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_layout() {
        let source = TileSource::new("https://tile.example");
        let url = source.tile_url(&TileCoord::new(4, 2, 3));
        assert_eq!(url, "https://tile.example/3/4/2.png");
    }

    #[test]
    fn test_trailing_slash_normalized() {
        let source = TileSource::new("https://tile.example/");
        let url = source.tile_url(&TileCoord::new(4, 2, 3));
        assert_eq!(url, "https://tile.example/3/4/2.png");
    }

    #[test]
    fn test_base_url_accessor() {
        let source = TileSource::new("https://tile.openstreetmap.org/");
        assert_eq!(source.base_url(), "https://tile.openstreetmap.org");
    }

    #[test]
    fn test_grid_origin() {
        let source = TileSource::new("https://tile.example");
        let url = source.tile_url(&TileCoord::new(0, 0, 0));
        assert_eq!(url, "https://tile.example/0/0/0.png");
    }

    #[test]
    fn test_zoom_before_x_before_y() {
        let source = TileSource::new("http://localhost:8080/osm");
        let url = source.tile_url(&TileCoord::new(19295, 24640, 16));
        assert_eq!(url, "http://localhost:8080/osm/16/19295/24640.png");
    }
}
