//! Resident tile set and its lifecycle management.
//!
//! [`TileCache`] owns every tile the engine knows about and is the only
//! place tile state changes. Its surface is four operations:
//!
//! - [`ensure`](TileCache::ensure) makes a tile resident: absent tiles are
//!   created and fetched, failed tiles are re-fetched, loading and ready
//!   tiles are left alone. Calling it repeatedly is free.
//! - [`lookup`](TileCache::lookup) snapshots a tile's state for drawing.
//! - [`trim`](TileCache::trim) evicts off-screen tiles beyond a budget,
//!   cancelling any fetch an evicted tile still had outstanding.
//! - [`on_render_context_invalidated`](TileCache::on_render_context_invalidated)
//!   drops every decoded payload when the host loses its rendering surface,
//!   while fetches in flight keep running.
//!
//! # Concurrency
//!
//! One mutex guards the coordinate-to-tile map; every state change happens
//! under it, and none of the operations above ever waits on network or
//! decode work while holding it. Fetch completions run on worker tasks and
//! re-validate the world before touching anything: the entry must still
//! exist, still be loading, and still be waiting on that exact request id,
//! otherwise the completion is discarded without inserting anything. A
//! context epoch guards the other side: a bitmap decoded against one render
//! context is never installed after the context has been swapped or lost.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace, warn};

use crate::coord::{TileCoord, TileRect};
use crate::fetch::{FetchChannel, FetchError, FetchHandle, RequestId};
use crate::render::{RenderContext, TileBitmap};
use crate::telemetry::EngineMetrics;
use crate::tile::{Tile, TileFault, TileSource, TileStatus};

/// Concurrent cache of map tiles, keyed by coordinate.
pub struct TileCache {
    inner: Arc<CacheInner>,
    source: TileSource,
    channel: Arc<FetchChannel>,
}

struct CacheInner {
    tiles: Mutex<HashMap<TileCoord, Tile>>,
    // Lock order: tiles before context, always.
    context: RwLock<ContextSlot>,
    metrics: Arc<EngineMetrics>,
}

/// The installed render context plus a generation counter.
///
/// The epoch moves on every install and every invalidation. Completions
/// record it before decoding and re-check it before installing, so a bitmap
/// decoded for a context that is no longer current gets discarded.
struct ContextSlot {
    context: Option<Arc<dyn RenderContext>>,
    epoch: u64,
}

impl TileCache {
    /// Creates an empty cache fetching from `source` via `channel`.
    pub fn new(
        source: TileSource,
        channel: Arc<FetchChannel>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            inner: Arc::new(CacheInner {
                tiles: Mutex::new(HashMap::new()),
                context: RwLock::new(ContextSlot {
                    context: None,
                    epoch: 0,
                }),
                metrics,
            }),
            source,
            channel,
        }
    }

    /// Makes `coord` resident, returning its status after the call.
    ///
    /// Absent: a tile is created in the loading state and its fetch issued.
    /// Failed: a fresh fetch is issued for the existing tile, which keeps
    /// its creation time. Loading or ready: nothing happens. Never blocks
    /// on network or decode work; callers wanting the decoded payload read
    /// it from the returned [`TileStatus`] or a later [`TileCache::lookup`].
    pub fn ensure(&self, coord: TileCoord) -> TileStatus {
        let mut tiles = self.inner.tiles.lock();
        match tiles.entry(coord) {
            Entry::Occupied(mut entry) => {
                if entry.get().is_error() {
                    let url = entry.get().url().to_string();
                    let request = self.spawn_fetch(coord, &url);
                    match entry.get_mut().retry(request) {
                        Ok(()) => {
                            self.inner.metrics.fetch_retried();
                            debug!(tile = %coord, "Re-issued fetch for failed tile");
                        }
                        Err(e) => {
                            warn!(error = %e, "Tile state changed unexpectedly during retry")
                        }
                    }
                }
                entry.get().status()
            }
            Entry::Vacant(entry) => {
                let url = self.source.tile_url(&coord);
                let request = self.spawn_fetch(coord, &url);
                let tile = entry.insert(Tile::loading(coord, url, request));
                self.inner.metrics.fetch_issued();
                trace!(tile = %coord, "Tile entered cache");
                tile.status()
            }
        }
    }

    /// Snapshots the state of `coord`, or `None` if it is not resident.
    ///
    /// Absence is an observation, not a request; nothing is created.
    pub fn lookup(&self, coord: &TileCoord) -> Option<TileStatus> {
        self.inner.tiles.lock().get(coord).map(Tile::status)
    }

    /// Evicts off-screen tiles, keeping at most `keep_budget` of them.
    ///
    /// Tiles inside `visible` are never evicted, whatever their state. The
    /// off-screen survivors are the most recently created ones; everything
    /// older leaves the cache, cancelling any outstanding fetch it owned.
    /// A tile at a different zoom level than `visible` is off-screen by
    /// definition.
    pub fn trim(&self, visible: &TileRect, keep_budget: usize) {
        let mut tiles = self.inner.tiles.lock();

        let mut off_screen: Vec<(TileCoord, Instant)> = tiles
            .iter()
            .filter(|(coord, _)| !visible.contains(coord))
            .map(|(coord, tile)| (*coord, tile.created_at()))
            .collect();

        if off_screen.len() <= keep_budget {
            return;
        }

        off_screen.sort_by(|a, b| b.1.cmp(&a.1));
        let mut evicted = 0u64;
        for (coord, _) in off_screen.drain(keep_budget..) {
            tiles.remove(&coord);
            evicted += 1;
        }
        drop(tiles);

        self.inner.metrics.tiles_evicted(evicted);
        debug!(evicted, kept = keep_budget, "Trimmed off-screen tiles");
    }

    /// Installs the render context that decodes and owns tile payloads.
    ///
    /// In-flight completions that decoded against the previous context
    /// detect the swap and fail their tile rather than install a payload
    /// the new context cannot draw. Hosts replacing a lost surface call
    /// [`TileCache::on_render_context_invalidated`] first so the payloads
    /// the old context owned are dropped too.
    pub fn set_render_context(&self, context: Arc<dyn RenderContext>) {
        let mut slot = self.inner.context.write();
        slot.context = Some(context);
        slot.epoch += 1;
    }

    /// Handles the host losing its rendering surface.
    ///
    /// Every decoded payload is dropped with its tile entry; those tiles
    /// simply stop being resident and come back through `ensure` once a new
    /// context exists. Loading tiles keep their fetch running, and their
    /// completions will fail with
    /// [`TileFault::NoRenderContext`] unless a new context is installed in
    /// time.
    pub fn on_render_context_invalidated(&self) {
        let mut tiles = self.inner.tiles.lock();
        {
            let mut slot = self.inner.context.write();
            slot.context = None;
            slot.epoch += 1;
        }

        let before = tiles.len();
        tiles.retain(|_, tile| !tile.is_ready());
        let dropped = (before - tiles.len()) as u64;
        drop(tiles);

        self.inner.metrics.payloads_invalidated(dropped);
        debug!(dropped, "Render context invalidated; decoded payloads dropped");
    }

    /// Number of resident tiles.
    pub fn resident(&self) -> usize {
        self.inner.tiles.lock().len()
    }

    /// Number of resident tiles holding a decoded payload.
    pub fn ready(&self) -> usize {
        self.inner
            .tiles
            .lock()
            .values()
            .filter(|tile| tile.is_ready())
            .count()
    }

    /// Issues the fetch for `coord` and wires its completion back into the
    /// cache. The callback holds a weak reference, so a dropped cache just
    /// makes late completions vanish.
    fn spawn_fetch(&self, coord: TileCoord, url: &str) -> FetchHandle {
        let inner = Arc::downgrade(&self.inner);
        self.channel.get(
            url,
            Box::new(move |request, result| {
                if let Some(inner) = inner.upgrade() {
                    inner.complete(coord, request, result);
                }
            }),
        )
    }
}

impl CacheInner {
    /// Applies one fetch completion. Runs on a worker task.
    fn complete(&self, coord: TileCoord, request: RequestId, result: Result<Bytes, FetchError>) {
        let body = match result {
            Err(err) => {
                self.fail(coord, request, TileFault::Fetch(err));
                return;
            }
            Ok(body) => body,
        };

        let (context, epoch) = {
            let slot = self.context.read();
            (slot.context.clone(), slot.epoch)
        };
        let Some(context) = context else {
            self.fail(coord, request, TileFault::NoRenderContext);
            return;
        };

        // Decode outside the tile lock; bitmaps can be large and decoders
        // slow.
        match context.decode_bitmap(&body) {
            Err(err) => self.fail(coord, request, TileFault::Decode(err)),
            Ok(bitmap) => self.install(coord, request, bitmap, epoch, context),
        }
    }

    /// Marks the tile failed, if this completion is still the one it is
    /// waiting for.
    fn fail(&self, coord: TileCoord, request: RequestId, fault: TileFault) {
        let mut tiles = self.tiles.lock();
        let Some(tile) = Self::current_entry(&mut tiles, coord, request) else {
            drop(tiles);
            self.discard_stale(coord, request);
            return;
        };

        match &fault {
            TileFault::Fetch(FetchError::Server { .. }) => self.metrics.server_error(),
            TileFault::Fetch(FetchError::Transport(_)) => self.metrics.transport_error(),
            TileFault::Decode(_) => self.metrics.decode_error(),
            TileFault::NoRenderContext => self.metrics.context_loss(),
        }
        debug!(tile = %coord, fault = %fault, "Tile failed");

        if let Err(e) = tile.mark_error(fault) {
            warn!(error = %e, "Error transition rejected");
        }
    }

    /// Installs a decoded bitmap, if this completion is still current and
    /// the context it decoded against still is too.
    fn install(
        &self,
        coord: TileCoord,
        request: RequestId,
        bitmap: TileBitmap,
        decoded_epoch: u64,
        context: Arc<dyn RenderContext>,
    ) {
        let mut tiles = self.tiles.lock();
        let Some(tile) = Self::current_entry(&mut tiles, coord, request) else {
            drop(tiles);
            self.discard_stale(coord, request);
            return;
        };

        // The context can be swapped or lost between decode and install; a
        // bitmap decoded for a dead context must not be stored.
        if self.context.read().epoch != decoded_epoch {
            self.metrics.context_loss();
            debug!(tile = %coord, "Render context changed during decode");
            if let Err(e) = tile.mark_error(TileFault::NoRenderContext) {
                warn!(error = %e, "Error transition rejected");
            }
            return;
        }

        if let Err(e) = tile.mark_ready(Arc::new(bitmap)) {
            warn!(error = %e, "Ready transition rejected");
            return;
        }
        self.metrics.tile_ready();
        drop(tiles);

        trace!(tile = %coord, "Tile ready");
        context.request_redraw();
    }

    /// The tile at `coord`, but only if it is still loading this request.
    /// Anything else means the completion is stale: the tile was evicted
    /// (and possibly re-created with a newer fetch) after this transfer had
    /// already passed its cancellation check.
    fn current_entry<'a>(
        tiles: &'a mut HashMap<TileCoord, Tile>,
        coord: TileCoord,
        request: RequestId,
    ) -> Option<&'a mut Tile> {
        tiles
            .get_mut(&coord)
            .filter(|tile| tile.loading_request() == Some(request))
    }

    fn discard_stale(&self, coord: TileCoord, request: RequestId) {
        self.metrics.stale_completion();
        trace!(tile = %coord, request = %request, "Discarded stale completion");
    }
}
