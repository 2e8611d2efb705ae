//! Engine configuration.
//!
//! This module defines `EngineConfig`, which gathers everything needed to
//! bootstrap a [`MapEngine`](super::MapEngine): the tile source, the initial
//! camera, cache sizing, and fetch behavior.

use crate::viewport::DEFAULT_TILE_SIZE;

/// Default tile server base URL.
///
/// The public OpenStreetMap raster endpoint. Production deployments should
/// point at their own tile service; the OSM servers have a usage policy
/// that discourages bulk traffic.
pub const DEFAULT_TILE_URL: &str = "https://tile.openstreetmap.org";

/// Default per-request fetch timeout (in seconds).
///
/// A tile that takes longer than this is treated as a transport failure and
/// surfaces through the normal error path; 30 seconds is generous for a
/// single 256px image while still bounding how long a tile can sit in the
/// loading state.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Engine configuration combining all component configs.
///
/// This is the top-level configuration passed to `MapEngine::new()`.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Tile source configuration.
    pub source: SourceConfig,

    /// Initial camera configuration.
    pub viewport: ViewportConfig,

    /// Cache eviction configuration.
    pub cache: CacheConfig,

    /// Fetch configuration.
    pub fetch: FetchConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            viewport: ViewportConfig::default(),
            cache: CacheConfig::default(),
            fetch: FetchConfig::default(),
        }
    }
}

/// Tile source configuration.
#[derive(Clone, Debug)]
pub struct SourceConfig {
    /// Base URL of the slippy-map tile server.
    pub base_url: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_TILE_URL.to_string(),
        }
    }
}

/// Initial camera configuration.
#[derive(Clone, Debug)]
pub struct ViewportConfig {
    /// Center latitude in WGS84 degrees.
    pub latitude: f64,

    /// Center longitude in WGS84 degrees.
    pub longitude: f64,

    /// Tile zoom level, 0 to 18.
    pub zoom: u8,

    /// Screen width in pixels.
    pub width: u32,

    /// Screen height in pixels.
    pub height: u32,

    /// Tile edge length in pixels.
    pub tile_size: u32,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        // Vaasa, on the Finnish west coast.
        Self {
            latitude: 63.119671111,
            longitude: 21.712313611,
            zoom: 13,
            width: 800,
            height: 600,
            tile_size: DEFAULT_TILE_SIZE,
        }
    }
}

/// Cache eviction configuration.
#[derive(Clone, Debug, Default)]
pub struct CacheConfig {
    /// Off-screen tiles to retain on trim.
    ///
    /// `None` sizes the budget to the on-screen tile count on every
    /// refresh, bounding the resident set to roughly twice the viewport.
    pub keep_budget: Option<usize>,
}

/// Fetch configuration.
#[derive(Clone, Debug)]
pub struct FetchConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
        }
    }
}

impl EngineConfig {
    /// Set the tile server base URL.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.source.base_url = base_url.into();
        self
    }

    /// Set the initial camera center and zoom.
    pub fn with_center(mut self, latitude: f64, longitude: f64, zoom: u8) -> Self {
        self.viewport.latitude = latitude;
        self.viewport.longitude = longitude;
        self.viewport.zoom = zoom;
        self
    }

    /// Set the screen size in pixels.
    pub fn with_screen_size(mut self, width: u32, height: u32) -> Self {
        self.viewport.width = width;
        self.viewport.height = height;
        self
    }

    /// Set a fixed off-screen keep budget.
    pub fn with_keep_budget(mut self, keep_budget: usize) -> Self {
        self.cache.keep_budget = Some(keep_budget);
        self
    }

    /// Set the per-request fetch timeout.
    pub fn with_fetch_timeout_secs(mut self, secs: u64) -> Self {
        self.fetch.timeout_secs = secs;
        self
    }
}
