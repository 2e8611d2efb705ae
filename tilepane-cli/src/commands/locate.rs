//! Resolve a geographic position to its slippy-map tile.
//!
//! Pure coordinate math: no network traffic, no engine. Useful for
//! scripting (`--json`) and for sanity-checking what the viewer will
//! request for a given camera position.

use clap::Args;
use serde_json::json;

use tilepane::app::DEFAULT_TILE_URL;
use tilepane::coord::{self, TileCoord};
use tilepane::tile::TileSource;
use tilepane::viewport::DEFAULT_TILE_SIZE;

use crate::error::CliError;

/// Arguments for the locate command.
#[derive(Debug, Args)]
pub struct LocateArgs {
    /// Latitude in degrees, positive north
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude in degrees, positive east
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level (0-18)
    #[arg(long, short, default_value_t = 13)]
    pub zoom: u8,

    /// Tile server base URL
    #[arg(long, default_value = DEFAULT_TILE_URL)]
    pub url: String,

    /// Emit machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Run the locate command.
pub fn run(args: LocateArgs) -> Result<(), CliError> {
    let source = TileSource::new(args.url);
    let report = TileReport::build(args.lat, args.lon, args.zoom, &source)?;

    if args.json {
        println!("{:#}", report.to_json());
    } else {
        report.print();
    }
    Ok(())
}

/// Everything there is to say about one position's tile.
#[derive(Debug)]
struct TileReport {
    latitude: f64,
    longitude: f64,
    coord: TileCoord,
    url: String,
    nw_latitude: f64,
    nw_longitude: f64,
    lon_per_pixel: f64,
    lat_per_pixel: f64,
}

impl TileReport {
    fn build(
        latitude: f64,
        longitude: f64,
        zoom: u8,
        source: &TileSource,
    ) -> Result<Self, CliError> {
        let coord = coord::tile_for(latitude, longitude, zoom)?;
        Ok(Self {
            latitude,
            longitude,
            url: source.tile_url(&coord),
            nw_latitude: coord::tile_y_to_lat(coord.y as i64, zoom),
            nw_longitude: coord::tile_x_to_lon(coord.x as i64, zoom),
            lon_per_pixel: coord::lon_per_pixel(zoom, DEFAULT_TILE_SIZE),
            lat_per_pixel: coord::lat_per_pixel(latitude, zoom, DEFAULT_TILE_SIZE),
            coord,
        })
    }

    fn to_json(&self) -> serde_json::Value {
        json!({
            "latitude": self.latitude,
            "longitude": self.longitude,
            "zoom": self.coord.zoom,
            "tile": { "x": self.coord.x, "y": self.coord.y },
            "url": self.url,
            "nw_corner": {
                "latitude": self.nw_latitude,
                "longitude": self.nw_longitude,
            },
            "degrees_per_pixel": {
                "longitude": self.lon_per_pixel,
                "latitude": self.lat_per_pixel,
            },
        })
    }

    fn print(&self) {
        println!(
            "Tile for {:.5}°, {:.5}° at zoom {}",
            self.latitude, self.longitude, self.coord.zoom
        );
        println!("  Tile index:     x={} y={}", self.coord.x, self.coord.y);
        println!("  Tile URL:       {}", self.url);
        println!(
            "  NW corner:      {:.5}°, {:.5}°",
            self.nw_latitude, self.nw_longitude
        );
        println!(
            "  Degrees per px: {:.8} lon, {:.8} lat",
            self.lon_per_pixel, self.lat_per_pixel
        );
    }
}
