//! Engine telemetry for observability and user feedback.
//!
//! Lock-free atomic counters record what the engine has done since start;
//! a point-in-time [`TelemetrySnapshot`] carries those numbers (plus the
//! live gauges the engine fills in) out to displays.
//!
//! ```text
//! Cache / Fetch ─────► EngineMetrics ─────► TelemetrySnapshot ─────► Views
//!                      (atomic counters)   (point-in-time copy)     (CLI, etc.)
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde::Serialize;

/// Counters recording engine activity.
///
/// All methods are cheap and callable from any thread; the cache and fetch
/// layers record events directly from worker tasks.
#[derive(Debug)]
pub struct EngineMetrics {
    started_at: Instant,
    fetches_issued: AtomicU64,
    fetches_retried: AtomicU64,
    tiles_ready: AtomicU64,
    server_errors: AtomicU64,
    transport_errors: AtomicU64,
    decode_errors: AtomicU64,
    context_losses: AtomicU64,
    tiles_evicted: AtomicU64,
    payloads_invalidated: AtomicU64,
    stale_completions: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            fetches_issued: AtomicU64::new(0),
            fetches_retried: AtomicU64::new(0),
            tiles_ready: AtomicU64::new(0),
            server_errors: AtomicU64::new(0),
            transport_errors: AtomicU64::new(0),
            decode_errors: AtomicU64::new(0),
            context_losses: AtomicU64::new(0),
            tiles_evicted: AtomicU64::new(0),
            payloads_invalidated: AtomicU64::new(0),
            stale_completions: AtomicU64::new(0),
        }
    }

    /// A fetch was issued for a tile entering the cache.
    pub fn fetch_issued(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
    }

    /// A fetch was re-issued for a tile that had failed.
    pub fn fetch_retried(&self) {
        self.fetches_retried.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile reached the ready state.
    pub fn tile_ready(&self) {
        self.tiles_ready.fetch_add(1, Ordering::Relaxed);
    }

    /// A tile server answered outside the 2xx range.
    pub fn server_error(&self) {
        self.server_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A transfer failed before a complete body arrived.
    pub fn transport_error(&self) {
        self.transport_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A complete body could not be decoded.
    pub fn decode_error(&self) {
        self.decode_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A completion arrived while no render context was installed.
    pub fn context_loss(&self) {
        self.context_losses.fetch_add(1, Ordering::Relaxed);
    }

    /// `count` tiles were evicted by a trim pass.
    pub fn tiles_evicted(&self, count: u64) {
        self.tiles_evicted.fetch_add(count, Ordering::Relaxed);
    }

    /// `count` decoded payloads were dropped by a context invalidation.
    pub fn payloads_invalidated(&self, count: u64) {
        self.payloads_invalidated.fetch_add(count, Ordering::Relaxed);
    }

    /// A completion arrived for a tile that no longer expects it.
    pub fn stale_completion(&self) {
        self.stale_completions.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies the current counter values.
    ///
    /// Gauges (resident tiles, in-flight fetches) are not known here; the
    /// engine fills them in with [`TelemetrySnapshot::with_gauges`].
    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            uptime_seconds: self.started_at.elapsed().as_secs(),
            fetches_issued: self.fetches_issued.load(Ordering::Relaxed),
            fetches_retried: self.fetches_retried.load(Ordering::Relaxed),
            tiles_ready: self.tiles_ready.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            transport_errors: self.transport_errors.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            context_losses: self.context_losses.load(Ordering::Relaxed),
            tiles_evicted: self.tiles_evicted.load(Ordering::Relaxed),
            payloads_invalidated: self.payloads_invalidated.load(Ordering::Relaxed),
            stale_completions: self.stale_completions.load(Ordering::Relaxed),
            resident_tiles: 0,
            ready_tiles: 0,
            in_flight_fetches: 0,
        }
    }
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the engine counters and gauges.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub uptime_seconds: u64,
    pub fetches_issued: u64,
    pub fetches_retried: u64,
    pub tiles_ready: u64,
    pub server_errors: u64,
    pub transport_errors: u64,
    pub decode_errors: u64,
    pub context_losses: u64,
    pub tiles_evicted: u64,
    pub payloads_invalidated: u64,
    pub stale_completions: u64,
    pub resident_tiles: usize,
    pub ready_tiles: usize,
    pub in_flight_fetches: usize,
}

impl TelemetrySnapshot {
    /// Fills in the live gauge values.
    pub fn with_gauges(mut self, resident: usize, ready: usize, in_flight: usize) -> Self {
        self.resident_tiles = resident;
        self.ready_tiles = ready;
        self.in_flight_fetches = in_flight;
        self
    }

    /// Total failed attempts of any kind.
    pub fn errors_total(&self) -> u64 {
        self.server_errors + self.transport_errors + self.decode_errors + self.context_losses
    }

    /// Fraction of issued fetches that ended in failure, 0.0 when idle.
    pub fn error_rate(&self) -> f64 {
        let issued = self.fetches_issued + self.fetches_retried;
        if issued == 0 {
            return 0.0;
        }
        self.errors_total() as f64 / issued as f64
    }

    /// Uptime formatted for display, e.g. `1h 02m 13s`.
    pub fn uptime_human(&self) -> String {
        let hours = self.uptime_seconds / 3600;
        let minutes = (self.uptime_seconds % 3600) / 60;
        let seconds = self.uptime_seconds % 60;
        if hours > 0 {
            format!("{}h {:02}m {:02}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {:02}s", minutes, seconds)
        } else {
            format!("{}s", seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let metrics = EngineMetrics::new();
        metrics.fetch_issued();
        metrics.fetch_issued();
        metrics.fetch_retried();
        metrics.tile_ready();
        metrics.server_error();
        metrics.tiles_evicted(7);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.fetches_issued, 2);
        assert_eq!(snapshot.fetches_retried, 1);
        assert_eq!(snapshot.tiles_ready, 1);
        assert_eq!(snapshot.server_errors, 1);
        assert_eq!(snapshot.tiles_evicted, 7);
        assert_eq!(snapshot.stale_completions, 0);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let metrics = EngineMetrics::new();
        metrics.tile_ready();
        let snapshot = metrics.snapshot();

        metrics.tile_ready();
        assert_eq!(snapshot.tiles_ready, 1);
        assert_eq!(metrics.snapshot().tiles_ready, 2);
    }

    #[test]
    fn test_with_gauges() {
        let snapshot = EngineMetrics::new().snapshot().with_gauges(20, 12, 8);
        assert_eq!(snapshot.resident_tiles, 20);
        assert_eq!(snapshot.ready_tiles, 12);
        assert_eq!(snapshot.in_flight_fetches, 8);
    }

    #[test]
    fn test_error_rate() {
        let metrics = EngineMetrics::new();
        assert_eq!(metrics.snapshot().error_rate(), 0.0);

        metrics.fetch_issued();
        metrics.fetch_issued();
        metrics.fetch_issued();
        metrics.fetch_issued();
        metrics.server_error();
        metrics.decode_error();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.errors_total(), 2);
        assert!((snapshot.error_rate() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_uptime_human_formats() {
        let mut snapshot = EngineMetrics::new().snapshot();

        snapshot.uptime_seconds = 42;
        assert_eq!(snapshot.uptime_human(), "42s");

        snapshot.uptime_seconds = 133;
        assert_eq!(snapshot.uptime_human(), "2m 13s");

        snapshot.uptime_seconds = 3733;
        assert_eq!(snapshot.uptime_human(), "1h 02m 13s");
    }

    #[test]
    fn test_snapshot_serializes() {
        let snapshot = EngineMetrics::new().snapshot().with_gauges(1, 1, 0);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"resident_tiles\":1"));
        assert!(json.contains("\"fetches_issued\":0"));
    }
}
