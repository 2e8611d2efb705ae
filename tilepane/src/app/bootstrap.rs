//! Engine bootstrap implementation.
//!
//! This module contains `MapEngine`, which wires the viewport, cache, and
//! fetch channel together and owns their shared lifecycle.

use std::sync::Arc;

use tokio::runtime::{Handle, Runtime};
use tracing::info;

use super::config::EngineConfig;
use super::error::EngineError;
use crate::cache::TileCache;
use crate::coord::{TileCoord, TileRect};
use crate::fetch::{FetchChannel, HttpClient, ReqwestClient};
use crate::render::RenderContext;
use crate::telemetry::{EngineMetrics, TelemetrySnapshot};
use crate::tile::{TileSource, TileStatus};
use crate::viewport::Viewport;

/// The assembled tile engine: camera, cache, and fetch pipeline.
///
/// Hosts drive it in a simple loop: mutate the camera through
/// [`viewport_mut`](Self::viewport_mut), call [`refresh`](Self::refresh) to
/// line the cache up with the new view, then draw whatever
/// [`lookup`](Self::lookup) reports as ready. Fetches complete in the
/// background and signal the render context when a redraw is worthwhile.
///
/// # Example
///
/// ```ignore
/// use tilepane::app::{EngineConfig, MapEngine};
///
/// let config = EngineConfig::default().with_screen_size(1024, 768);
/// let mut engine = MapEngine::new(config)?;
/// engine.set_render_context(context);
///
/// engine.viewport_mut().pan_by_pixels(12.0, 0.0);
/// for tile in engine.refresh().iter() {
///     if let Some(status) = engine.lookup(&tile) {
///         // draw Ready tiles at engine.viewport().tile_screen_position(&tile)
///     }
/// }
/// ```
pub struct MapEngine {
    viewport: Viewport,
    cache: TileCache,
    channel: Arc<FetchChannel>,
    metrics: Arc<EngineMetrics>,
    keep_budget: Option<usize>,

    /// Owned runtime (when created via `new()`).
    ///
    /// When the engine is created via `new()` from a synchronous host, it
    /// owns a Tokio runtime for its fetch workers. When created against an
    /// existing runtime this is `None` and the caller's runtime is used.
    runtime: Option<Runtime>,
}

impl MapEngine {
    /// Start the engine with its own fetch runtime.
    ///
    /// For synchronous hosts (native UI event loops, CLI tools). The
    /// runtime lives as long as the engine.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime or HTTP client cannot be created,
    /// or the configured camera is outside the projection's domain.
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let runtime =
            Runtime::new().map_err(|e| EngineError::RuntimeCreation(e.to_string()))?;
        let client = ReqwestClient::with_timeout(config.fetch.timeout_secs)?;
        let handle = runtime.handle().clone();
        Self::build(config, Arc::new(client), handle, Some(runtime))
    }

    /// Start the engine on an existing runtime.
    ///
    /// For async hosts that already run Tokio and want the fetch workers on
    /// their own runtime.
    pub fn with_runtime_handle(config: EngineConfig, handle: Handle) -> Result<Self, EngineError> {
        let client = ReqwestClient::with_timeout(config.fetch.timeout_secs)?;
        Self::build(config, Arc::new(client), handle, None)
    }

    /// Start the engine with a caller-supplied HTTP client.
    ///
    /// For embedders that need a custom transport (auth headers, proxies)
    /// and for test harnesses.
    pub fn with_http_client(
        config: EngineConfig,
        client: Arc<dyn HttpClient>,
        handle: Handle,
    ) -> Result<Self, EngineError> {
        Self::build(config, client, handle, None)
    }

    fn build(
        config: EngineConfig,
        client: Arc<dyn HttpClient>,
        handle: Handle,
        runtime: Option<Runtime>,
    ) -> Result<Self, EngineError> {
        let viewport = Viewport::new(
            config.viewport.latitude,
            config.viewport.longitude,
            config.viewport.zoom,
            config.viewport.width,
            config.viewport.height,
        )?
        .with_tile_size(config.viewport.tile_size);

        let source = TileSource::new(config.source.base_url.clone());
        let channel = Arc::new(FetchChannel::new(client, handle));
        let metrics = Arc::new(EngineMetrics::new());
        let cache = TileCache::new(source, Arc::clone(&channel), Arc::clone(&metrics));

        info!(
            base_url = %config.source.base_url,
            latitude = config.viewport.latitude,
            longitude = config.viewport.longitude,
            zoom = config.viewport.zoom,
            "Map engine started"
        );

        Ok(Self {
            viewport,
            cache,
            channel,
            metrics,
            keep_budget: config.cache.keep_budget,
            runtime,
        })
    }

    /// The current camera.
    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Mutable camera access for pan, zoom, and resize input.
    ///
    /// Call [`refresh`](Self::refresh) afterwards to line the cache up
    /// with the changed view.
    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    /// Brings the cache in line with the current camera.
    ///
    /// Trims tiles that fell off-screen, then ensures every tile the view
    /// needs is resident or loading. Returns the visible rectangle so the
    /// caller can iterate it for drawing. Never blocks on fetch or decode
    /// work.
    pub fn refresh(&self) -> TileRect {
        let rect = self.viewport.tile_rect();
        let keep = self.keep_budget.unwrap_or_else(|| rect.tile_count());
        self.cache.trim(&rect, keep);
        for coord in rect.iter() {
            self.cache.ensure(coord);
        }
        rect
    }

    /// Snapshots the state of one tile. See [`TileCache::lookup`].
    pub fn lookup(&self, coord: &TileCoord) -> Option<TileStatus> {
        self.cache.lookup(coord)
    }

    /// Installs the render context. See [`TileCache::set_render_context`].
    pub fn set_render_context(&self, context: Arc<dyn RenderContext>) {
        self.cache.set_render_context(context);
    }

    /// Reacts to the host losing its rendering surface. See
    /// [`TileCache::on_render_context_invalidated`].
    pub fn on_render_context_invalidated(&self) {
        self.cache.on_render_context_invalidated();
    }

    /// Current counters and gauges for status displays.
    pub fn telemetry_snapshot(&self) -> TelemetrySnapshot {
        self.metrics.snapshot().with_gauges(
            self.cache.resident(),
            self.cache.ready(),
            self.channel.in_flight(),
        )
    }

    /// Shuts the engine down, cancelling outstanding fetches.
    pub fn shutdown(self) {
        info!("Shutting down map engine");
        self.channel.cancel_all();
        if let Some(runtime) = self.runtime {
            runtime.shutdown_background();
        }
    }
}
