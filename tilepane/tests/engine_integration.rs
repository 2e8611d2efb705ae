//! Integration tests for the map engine.
//!
//! These tests drive [`MapEngine`] through its public API the way an
//! embedding application would:
//! - viewport refresh → fetch → decode → ready tiles
//! - panning and resizing reuse cached tiles and request only newly
//!   exposed ones
//! - trim eviction under an explicit keep budget
//! - server, transport, and decode failures surfacing as tile errors
//! - render context loss and invalidation
//!
//! The HTTP side is a scripted client implementing the public
//! [`HttpClient`] trait; every successful body is delivered in two chunks
//! so the transfers exercise partial-read reassembly.
//!
//! Run with: `cargo test --test engine_integration`

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::runtime::Handle;

use tilepane::app::{EngineConfig, MapEngine};
use tilepane::coord::TileCoord;
use tilepane::fetch::{BoxFuture, Bytes, FetchError, HttpClient, HttpResponse, TransportError};
use tilepane::render::{DecodeError, RenderContext, TileBitmap};
use tilepane::tile::{TileFault, TileStatus};

// ============================================================================
// Test Doubles
// ============================================================================

/// Body served for every successful tile request.
const TILE_BYTES: &[u8] = b"\x89PNG-tile-payload-for-testing";

/// One scripted HTTP exchange.
#[derive(Debug, Clone, Copy)]
enum Script {
    /// 200 with `TILE_BYTES`, delivered in two chunks.
    Ok,
    /// Response with the given status and no body.
    Status(u16),
    /// 200 that declares more bytes than it delivers.
    ShortBody { declared: u64 },
    /// Request that never completes.
    Hang,
}

/// HTTP client that replays scripted exchanges.
///
/// Per-URL scripts are consumed in order; URLs without a script fall back
/// to the default exchange.
struct ScriptedClient {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    default: Script,
    requests: Mutex<Vec<String>>,
}

impl ScriptedClient {
    fn new(default: Script) -> Arc<Self> {
        Arc::new(Self {
            scripts: Mutex::new(HashMap::new()),
            default,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Queue a scripted exchange for one URL.
    fn script(&self, url: &str, script: Script) {
        self.scripts
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(script);
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn requests_for(&self, url: &str) -> usize {
        self.requests.lock().unwrap().iter().filter(|u| *u == url).count()
    }
}

impl HttpClient for ScriptedClient {
    fn get(&self, url: &str) -> BoxFuture<'_, Result<Box<dyn HttpResponse>, TransportError>> {
        self.requests.lock().unwrap().push(url.to_string());
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(url)
            .and_then(|queue| queue.pop_front())
            .unwrap_or(self.default);

        Box::pin(async move {
            match script {
                Script::Hang => std::future::pending().await,
                Script::Ok => {
                    let mid = TILE_BYTES.len() / 2;
                    Ok(Box::new(ScriptedResponse {
                        status: 200,
                        content_length: Some(TILE_BYTES.len() as u64),
                        chunks: VecDeque::from(vec![
                            Bytes::from_static(&TILE_BYTES[..mid]),
                            Bytes::from_static(&TILE_BYTES[mid..]),
                        ]),
                    }) as Box<dyn HttpResponse>)
                }
                Script::Status(status) => Ok(Box::new(ScriptedResponse {
                    status,
                    content_length: Some(0),
                    chunks: VecDeque::new(),
                }) as Box<dyn HttpResponse>),
                Script::ShortBody { declared } => Ok(Box::new(ScriptedResponse {
                    status: 200,
                    content_length: Some(declared),
                    chunks: VecDeque::from(vec![Bytes::from_static(TILE_BYTES)]),
                }) as Box<dyn HttpResponse>),
            }
        })
    }
}

struct ScriptedResponse {
    status: u16,
    content_length: Option<u64>,
    chunks: VecDeque<Bytes>,
}

impl HttpResponse for ScriptedResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn chunk(&mut self) -> BoxFuture<'_, Result<Option<Bytes>, TransportError>> {
        let next = self.chunks.pop_front();
        Box::pin(async move { Ok(next) })
    }
}

/// Render context that accepts every body and counts repaint requests.
#[derive(Default)]
struct CountingContext {
    decodes: AtomicUsize,
    redraws: AtomicUsize,
}

impl RenderContext for CountingContext {
    fn decode_bitmap(&self, _encoded: &[u8]) -> Result<TileBitmap, DecodeError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        Ok(TileBitmap::new(1, 1, Bytes::from_static(&[0, 0, 0, 255])))
    }

    fn request_redraw(&self) {
        self.redraws.fetch_add(1, Ordering::SeqCst);
    }
}

/// Render context that rejects every body.
struct RejectingContext;

impl RenderContext for RejectingContext {
    fn decode_bitmap(&self, _encoded: &[u8]) -> Result<TileBitmap, DecodeError> {
        Err(DecodeError("not a tile".to_string()))
    }

    fn request_redraw(&self) {}
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Camera over Vaasa, Finland, with a 300x200 viewport at zoom 13.
///
/// Small enough that the visible rectangle is exactly 3x2 tiles.
fn vaasa_config() -> EngineConfig {
    EngineConfig::default()
        .with_base_url("https://tile.example")
        .with_center(63.119671111, 21.712313611, 13)
        .with_screen_size(300, 200)
}

/// The six tiles the Vaasa viewport covers.
const VAASA_TILES: &[(u32, u32)] = &[
    (4589, 2228),
    (4590, 2228),
    (4591, 2228),
    (4589, 2229),
    (4590, 2229),
    (4591, 2229),
];

fn tile_url(x: u32, y: u32) -> String {
    format!("https://tile.example/13/{}/{}.png", x, y)
}

fn engine_with(config: EngineConfig, client: Arc<ScriptedClient>) -> MapEngine {
    MapEngine::with_http_client(config, client, Handle::current()).expect("engine should start")
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..500 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("Condition not reached in time");
}

// ============================================================================
// Integration Tests
// ============================================================================

/// Test the complete happy path: refresh requests every visible tile,
/// bodies arrive in chunks, decode runs, and tiles become ready.
#[tokio::test]
async fn test_refresh_to_ready_tiles() {
    let client = ScriptedClient::new(Script::Ok);
    let engine = engine_with(vaasa_config(), client.clone());
    let context = Arc::new(CountingContext::default());
    engine.set_render_context(context.clone());

    let rect = engine.refresh();
    assert_eq!(rect.tile_count(), VAASA_TILES.len());

    wait_until(|| engine.telemetry_snapshot().ready_tiles == VAASA_TILES.len()).await;

    for (x, y) in VAASA_TILES {
        let status = engine
            .lookup(&TileCoord::new(*x, *y, 13))
            .expect("tile should be resident");
        assert!(status.is_ready(), "Tile ({}, {}) should be ready", x, y);
    }

    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.fetches_issued, VAASA_TILES.len() as u64);
    assert_eq!(snapshot.tiles_ready, VAASA_TILES.len() as u64);
    assert_eq!(context.decodes.load(Ordering::SeqCst), VAASA_TILES.len());
    assert!(
        context.redraws.load(Ordering::SeqCst) >= 1,
        "Ready tiles should have requested a repaint"
    );
}

/// Test that a refresh with nothing in flight and nothing evicted is a
/// no-op: no duplicate requests for resident tiles.
#[tokio::test]
async fn test_refresh_is_idempotent() {
    let client = ScriptedClient::new(Script::Ok);
    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == VAASA_TILES.len()).await;
    engine.refresh();
    engine.refresh();

    assert_eq!(
        client.request_count(),
        VAASA_TILES.len(),
        "Resident tiles should not be fetched again"
    );
}

/// Test that panning one tile west requests only the newly exposed
/// column and keeps the rest cached.
#[tokio::test]
async fn test_pan_requests_only_new_tiles() {
    let client = ScriptedClient::new(Script::Ok);
    let mut engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == VAASA_TILES.len()).await;

    // Drag right by exactly one tile width: the rectangle shifts one
    // column west, exposing (4588, 2228) and (4588, 2229).
    engine.viewport_mut().pan_by_pixels(256.0, 0.0);
    let rect = engine.refresh();

    assert_eq!(rect.min_x, 4588);
    assert_eq!(rect.max_x, 4590);
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 8).await;

    assert_eq!(
        client.request_count(),
        8,
        "Only the two newly exposed tiles should be fetched"
    );
    assert_eq!(client.requests_for(&tile_url(4588, 2228)), 1);
    assert_eq!(client.requests_for(&tile_url(4588, 2229)), 1);

    // The column that scrolled off-screen stays cached within the
    // default keep budget.
    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.resident_tiles, 8);
    assert_eq!(snapshot.tiles_evicted, 0);
}

/// Test that widening the window requests only the newly exposed
/// column and keeps everything already on screen.
#[tokio::test]
async fn test_resize_requests_only_new_tiles() {
    let client = ScriptedClient::new(Script::Ok);
    let mut engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == VAASA_TILES.len()).await;

    // Doubling the width floors the top-left into column 4588; the rows
    // are unchanged.
    engine.viewport_mut().resize(600, 200);
    let rect = engine.refresh();

    assert_eq!((rect.min_x, rect.max_x), (4588, 4591));
    assert_eq!((rect.min_y, rect.max_y), (2228, 2229));
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 8).await;

    assert_eq!(client.request_count(), 8);
    assert_eq!(client.requests_for(&tile_url(4588, 2228)), 1);
    assert_eq!(client.requests_for(&tile_url(4588, 2229)), 1);
    assert_eq!(engine.telemetry_snapshot().tiles_evicted, 0);
}

/// Test that a zero keep budget evicts everything that scrolls
/// off-screen, oldest tiles included, while on-screen tiles survive.
#[tokio::test]
async fn test_pan_with_zero_budget_evicts_hidden_column() {
    let client = ScriptedClient::new(Script::Ok);
    let mut engine = engine_with(vaasa_config().with_keep_budget(0), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == VAASA_TILES.len()).await;

    engine.viewport_mut().pan_by_pixels(256.0, 0.0);
    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 6).await;

    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.tiles_evicted, 2, "The hidden column should be evicted");
    assert_eq!(snapshot.resident_tiles, 6);
    assert!(engine.lookup(&TileCoord::new(4591, 2228, 13)).is_none());
    assert!(engine.lookup(&TileCoord::new(4591, 2229, 13)).is_none());

    // Panning back re-fetches the evicted column.
    engine.viewport_mut().pan_by_pixels(-256.0, 0.0);
    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 6).await;
    assert_eq!(client.requests_for(&tile_url(4591, 2228)), 2);
}

/// Test that a non-2xx response marks the tile failed with the server
/// status, and that the next refresh retries it.
#[tokio::test]
async fn test_server_error_then_retry_on_refresh() {
    let client = ScriptedClient::new(Script::Ok);
    let failing_url = tile_url(4590, 2228);
    client.script(&failing_url, Script::Status(503));

    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 5).await;
    wait_until(|| engine.telemetry_snapshot().server_errors == 1).await;

    let status = engine
        .lookup(&TileCoord::new(4590, 2228, 13))
        .expect("failed tile stays resident");
    match status {
        TileStatus::Error(fault) => {
            assert_eq!(*fault, TileFault::Fetch(FetchError::Server { status: 503 }));
        }
        other => panic!("Expected error status, got {:?}", other),
    }

    // The failed tile retries on the next refresh; the scripted queue is
    // exhausted so the default Ok exchange answers.
    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 6).await;

    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.fetches_retried, 1);
    assert_eq!(client.requests_for(&failing_url), 2);
}

/// Test that a body shorter than its declared Content-Length surfaces
/// as a transport failure on the tile.
#[tokio::test]
async fn test_short_body_is_a_transport_error() {
    let client = ScriptedClient::new(Script::Ok);
    let truncated_url = tile_url(4589, 2228);
    client.script(&truncated_url, Script::ShortBody { declared: 2048 });

    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().transport_errors == 1).await;

    let status = engine
        .lookup(&TileCoord::new(4589, 2228, 13))
        .expect("failed tile stays resident");
    match status {
        TileStatus::Error(fault) => {
            assert_eq!(
                *fault,
                TileFault::Fetch(FetchError::Transport(TransportError::LengthMismatch {
                    expected: 2048,
                    received: TILE_BYTES.len() as u64,
                }))
            );
        }
        other => panic!("Expected error status, got {:?}", other),
    }
}

/// Test that undecodable bodies mark tiles failed without poisoning the
/// engine: counters record decode errors and the tiles stay resident.
#[tokio::test]
async fn test_decode_failure_marks_tiles_failed() {
    let client = ScriptedClient::new(Script::Ok);
    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(RejectingContext));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().decode_errors == VAASA_TILES.len() as u64).await;

    for (x, y) in VAASA_TILES {
        let status = engine
            .lookup(&TileCoord::new(*x, *y, 13))
            .expect("tile should be resident");
        assert!(status.is_error(), "Tile ({}, {}) should be failed", x, y);
    }
    assert_eq!(engine.telemetry_snapshot().ready_tiles, 0);
}

/// Test that completions landing while no render context is installed
/// fail the tiles instead of storing bitmaps nobody can use.
#[tokio::test]
async fn test_completion_without_context_fails_tiles() {
    let client = ScriptedClient::new(Script::Ok);
    let engine = engine_with(vaasa_config(), client.clone());

    // No render context installed at all.
    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().context_losses == VAASA_TILES.len() as u64).await;

    let status = engine
        .lookup(&TileCoord::new(4590, 2229, 13))
        .expect("tile should be resident");
    match status {
        TileStatus::Error(fault) => assert_eq!(*fault, TileFault::NoRenderContext),
        other => panic!("Expected error status, got {:?}", other),
    }
}

/// Test that invalidating the render context drops decoded tiles but
/// keeps in-flight loads alive.
#[tokio::test]
async fn test_invalidation_drops_ready_keeps_loading() {
    let client = ScriptedClient::new(Script::Ok);
    let hanging_url = tile_url(4591, 2229);
    client.script(&hanging_url, Script::Hang);

    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().ready_tiles == 5).await;

    engine.on_render_context_invalidated();

    let snapshot = engine.telemetry_snapshot();
    assert_eq!(snapshot.payloads_invalidated, 5);
    assert_eq!(snapshot.resident_tiles, 1, "Only the loading tile survives");

    let status = engine
        .lookup(&TileCoord::new(4591, 2229, 13))
        .expect("loading tile should survive invalidation");
    assert!(status.is_loading());
    assert!(engine.lookup(&TileCoord::new(4589, 2228, 13)).is_none());
}

/// Test that shutdown with transfers still in flight returns promptly
/// and leaves nothing running.
#[tokio::test]
async fn test_shutdown_with_in_flight_transfers() {
    let client = ScriptedClient::new(Script::Hang);
    let engine = engine_with(vaasa_config(), client.clone());
    engine.set_render_context(Arc::new(CountingContext::default()));

    engine.refresh();
    wait_until(|| engine.telemetry_snapshot().in_flight_fetches == VAASA_TILES.len()).await;

    // Clean shutdown
    engine.shutdown();
    assert_eq!(client.request_count(), VAASA_TILES.len());
}
