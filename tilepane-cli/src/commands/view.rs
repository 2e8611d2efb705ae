//! Interactive terminal map viewer.
//!
//! Runs a [`MapEngine`] against a full-screen dashboard: the current tile
//! rectangle renders as a status grid, arrow keys pan the camera, and
//! `+`/`-` change zoom. On terminals without a TTY the viewer falls back
//! to a headless loop that watches one rectangle and prints periodic
//! status lines until Ctrl+C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::Args;
use tracing::{debug, info};

use tilepane::app::{EngineConfig, MapEngine};
use tilepane::coord::TileRect;
use tilepane::logging;
use tilepane::render::SoftwareRenderContext;
use tilepane::tile::TileStatus;

use crate::error::CliError;
use crate::ui::{self, Dashboard, DashboardEvent};

/// Camera movement per arrow key press, in viewport pixels.
const PAN_STEP_PX: f64 = 64.0;

/// Arguments for the view command.
#[derive(Debug, Args)]
pub struct ViewArgs {
    /// Latitude of the starting camera position
    #[arg(long, allow_hyphen_values = true)]
    pub lat: Option<f64>,

    /// Longitude of the starting camera position
    #[arg(long, allow_hyphen_values = true)]
    pub lon: Option<f64>,

    /// Starting zoom level (0-18)
    #[arg(long, short)]
    pub zoom: Option<u8>,

    /// Tile server base URL
    #[arg(long)]
    pub url: Option<String>,

    /// Viewport width in pixels
    #[arg(long, default_value_t = 800)]
    pub width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 600)]
    pub height: u32,

    /// Off-screen tiles to keep cached (defaults to one screenful)
    #[arg(long)]
    pub keep: Option<usize>,
}

/// Run the view command.
pub fn run(args: ViewArgs) -> Result<(), CliError> {
    // File-only logging: stdout belongs to the dashboard.
    let _guard = logging::init_file_logging(logging::default_log_dir(), logging::default_log_file())
        .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!("tilepane v{}", tilepane::VERSION);

    let mut engine = MapEngine::new(build_config(&args))?;
    info!(
        lat = engine.viewport().latitude(),
        lon = engine.viewport().longitude(),
        zoom = engine.viewport().zoom(),
        "View session started"
    );
    let context = Arc::new(SoftwareRenderContext::new());
    engine.set_render_context(context.clone());
    engine.refresh();

    let result = if atty::is(atty::Stream::Stdout) {
        run_dashboard(&mut engine, context)
    } else {
        run_headless(&engine)
    };

    let snapshot = engine.telemetry_snapshot();
    info!(
        tiles_ready = snapshot.ready_tiles,
        errors = snapshot.errors_total(),
        "View session ended"
    );
    engine.shutdown();
    ui::print_session_summary(&snapshot);
    result
}

/// Fold CLI overrides into the engine defaults.
fn build_config(args: &ViewArgs) -> EngineConfig {
    let mut config = EngineConfig::default().with_screen_size(args.width, args.height);
    config = config.clone().with_center(
        args.lat.unwrap_or(config.viewport.latitude),
        args.lon.unwrap_or(config.viewport.longitude),
        args.zoom.unwrap_or(config.viewport.zoom),
    );
    if let Some(ref url) = args.url {
        config = config.with_base_url(url.clone());
    }
    if let Some(keep) = args.keep {
        config = config.with_keep_budget(keep);
    }
    config
}

/// Interactive dashboard loop.
fn run_dashboard(
    engine: &mut MapEngine,
    context: Arc<SoftwareRenderContext>,
) -> Result<(), CliError> {
    let mut dashboard = Dashboard::new().map_err(|e| CliError::Terminal(e.to_string()))?;
    let mut rect = engine.viewport().tile_rect();

    let tick_rate = Duration::from_millis(100);
    draw_frame(&mut dashboard, engine, &rect)?;
    let mut last_tick = Instant::now();

    loop {
        match dashboard
            .poll_event()
            .map_err(|e| CliError::Terminal(e.to_string()))?
        {
            Some(DashboardEvent::Quit) => break,
            Some(DashboardEvent::Pan(dx, dy)) => {
                // Arrow keys move the camera; pan_by_pixels speaks drag
                // deltas, so the signs flip.
                engine
                    .viewport_mut()
                    .pan_by_pixels(-(dx as f64) * PAN_STEP_PX, -(dy as f64) * PAN_STEP_PX);
                rect = engine.refresh();
            }
            Some(DashboardEvent::ZoomIn) => {
                if engine.viewport_mut().zoom_in() {
                    rect = engine.refresh();
                }
            }
            Some(DashboardEvent::ZoomOut) => {
                if engine.viewport_mut().zoom_out() {
                    rect = engine.refresh();
                }
            }
            Some(DashboardEvent::Refresh) => {
                rect = engine.refresh();
            }
            Some(DashboardEvent::Invalidate) => {
                // Simulates a lost render surface: decoded tiles are dropped,
                // a fresh context is installed, and the view redecodes.
                debug!("Render surface invalidated from the dashboard");
                engine.on_render_context_invalidated();
                engine.set_render_context(context.clone());
                rect = engine.refresh();
            }
            None => {}
        }

        if context.take_redraw() || last_tick.elapsed() >= tick_rate {
            draw_frame(&mut dashboard, engine, &rect)?;
            last_tick = Instant::now();
        }

        std::thread::sleep(Duration::from_millis(10));
    }

    Ok(())
}

fn draw_frame(dashboard: &mut Dashboard, engine: &MapEngine, rect: &TileRect) -> Result<(), CliError> {
    let statuses: Vec<Option<TileStatus>> = rect.iter().map(|c| engine.lookup(&c)).collect();
    let snapshot = engine.telemetry_snapshot();
    dashboard
        .draw(engine.viewport(), rect, &statuses, &snapshot)
        .map_err(|e| CliError::Terminal(e.to_string()))
}

/// Headless loop for non-interactive terminals.
///
/// Watches the starting rectangle and prints a status line every 30
/// seconds until the shutdown signal arrives.
fn run_headless(engine: &MapEngine) -> Result<(), CliError> {
    let viewport = engine.viewport();
    println!("tilepane v{} running headless (no TTY detected).", tilepane::VERSION);
    println!(
        "Watching {} tiles around {:.5}°, {:.5}° at zoom {}.",
        viewport.tile_rect().tile_count(),
        viewport.latitude(),
        viewport.longitude(),
        viewport.zoom(),
    );
    println!("Press Ctrl+C to stop.");
    println!();

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
    })
    .map_err(|e| CliError::Terminal(format!("Failed to install Ctrl+C handler: {}", e)))?;

    let mut last_telemetry = Instant::now();
    let telemetry_interval = Duration::from_secs(30);

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(Duration::from_millis(100));

        if last_telemetry.elapsed() >= telemetry_interval {
            ui::print_simple_status(&engine.telemetry_snapshot());
            last_telemetry = Instant::now();
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_args() -> ViewArgs {
        ViewArgs {
            lat: None,
            lon: None,
            zoom: None,
            url: None,
            width: 800,
            height: 600,
            keep: None,
        }
    }

    #[test]
    fn test_build_config_defaults() {
        let config = build_config(&bare_args());
        let defaults = EngineConfig::default();
        assert_eq!(config.viewport.latitude, defaults.viewport.latitude);
        assert_eq!(config.viewport.zoom, defaults.viewport.zoom);
        assert_eq!(config.source.base_url, defaults.source.base_url);
        assert_eq!(config.cache.keep_budget, None);
    }

    #[test]
    fn test_build_config_overrides() {
        let args = ViewArgs {
            lat: Some(51.477928),
            lon: Some(0.0),
            zoom: Some(10),
            url: Some("https://tile.example".to_string()),
            width: 1024,
            height: 768,
            keep: Some(12),
        };
        let config = build_config(&args);
        assert_eq!(config.viewport.latitude, 51.477928);
        assert_eq!(config.viewport.zoom, 10);
        assert_eq!(config.viewport.width, 1024);
        assert_eq!(config.source.base_url, "https://tile.example");
        assert_eq!(config.cache.keep_budget, Some(12));
    }
}
