//! Download map tiles to disk.
//!
//! Fetches one tile, or a square block of tiles around it, and stores
//! them in an OSM-style `{zoom}/{x}/{y}.png` layout under the output
//! directory. Downloads go through the same fetch channel the viewer
//! uses, so Content-Length validation and partial-read reassembly apply
//! here too.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use tilepane::app::{DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_TILE_URL};
use tilepane::coord::{self, TileCoord, TileRect};
use tilepane::fetch::{Bytes, FetchChannel, FetchError, ReqwestClient};
use tilepane::logging;
use tilepane::render::{RenderContext, SoftwareRenderContext};
use tilepane::tile::TileSource;

use crate::error::CliError;

/// Arguments for the fetch command.
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// Latitude of the tile to fetch
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude of the tile to fetch
    #[arg(long, allow_hyphen_values = true)]
    pub lon: f64,

    /// Zoom level (0-18)
    #[arg(long, short, default_value_t = 13)]
    pub zoom: u8,

    /// Also fetch tiles within this many rings around the target
    #[arg(long, default_value_t = 0)]
    pub radius: u32,

    /// Tile server base URL
    #[arg(long, default_value = DEFAULT_TILE_URL)]
    pub url: String,

    /// Directory to store tiles in
    #[arg(long, short, default_value = "tiles")]
    pub output: PathBuf,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Skip decoding downloaded tiles as a sanity check
    #[arg(long)]
    pub no_verify: bool,
}

/// Run the fetch command.
pub fn run(args: FetchArgs) -> Result<(), CliError> {
    // An interactive stdout belongs to the progress output; log there
    // only when output is piped.
    let _guard = if atty::is(atty::Stream::Stdout) {
        logging::init_file_logging(logging::default_log_dir(), logging::default_log_file())
    } else {
        logging::init_logging(logging::default_log_dir(), logging::default_log_file())
    }
    .map_err(|e| CliError::LoggingInit(e.to_string()))?;
    info!("tilepane v{}", tilepane::VERSION);

    let center = coord::tile_for(args.lat, args.lon, args.zoom)?;
    let block = tile_block(&center, args.radius);
    let source = TileSource::new(args.url);
    info!(
        tiles = block.tile_count(),
        zoom = args.zoom,
        url = source.base_url(),
        "Fetch session started"
    );

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::Runtime(format!("Failed to create Tokio runtime: {}", e)))?;
    let client = ReqwestClient::with_timeout(args.timeout).map_err(CliError::HttpClient)?;
    let channel = FetchChannel::new(Arc::new(client), runtime.handle().clone());

    let total = block.tile_count();
    let bar = progress_bar(total as u64);
    let (tx, rx) = mpsc::channel();

    // Handles cancel their request on drop; they must outlive the
    // collection loop below.
    let mut handles = Vec::with_capacity(total);
    for tile in block.iter() {
        let url = source.tile_url(&tile);
        let tx = tx.clone();
        let completed_url = url.clone();
        handles.push(channel.get(
            &url,
            Box::new(move |_, result| {
                let _ = tx.send((tile, completed_url, result));
            }),
        ));
    }
    drop(tx);

    let verifier = (!args.no_verify).then(SoftwareRenderContext::new);
    let mut failures = Vec::new();
    let mut last_stored = None;
    for _ in 0..total {
        let Ok((tile, url, result)) = rx.recv() else {
            return Err(CliError::Runtime(
                "Tile fetch workers stopped unexpectedly".to_string(),
            ));
        };
        bar.set_message(format!("{}/{}/{}", tile.zoom, tile.x, tile.y));
        match store_tile(&args.output, &tile, &url, result, verifier.as_ref()) {
            Ok(path) => last_stored = Some(path),
            Err(e) => {
                warn!(tile = %tile, error = %e, "Tile not stored");
                failures.push(e);
            }
        }
        bar.inc(1);
    }
    bar.finish_and_clear();
    info!(
        stored = total - failures.len(),
        failed = failures.len(),
        "Fetch session finished"
    );

    if let Some(first) = failures.into_iter().next() {
        return Err(first);
    }
    match (total, last_stored) {
        (1, Some(path)) => println!("Saved {}", path.display()),
        _ => println!("Stored {} tiles in {}", total, args.output.display()),
    }
    Ok(())
}

/// Square block of tiles covering `radius` rings around the center,
/// clamped to the world at the center's zoom.
fn tile_block(center: &TileCoord, radius: u32) -> TileRect {
    let r = radius as i64;
    TileRect::from_unclamped(
        center.zoom,
        center.x as i64 - r,
        center.y as i64 - r,
        center.x as i64 + r,
        center.y as i64 + r,
    )
}

/// Where a tile lands on disk: `{output}/{zoom}/{x}/{y}.png`.
fn tile_path(output: &Path, tile: &TileCoord) -> PathBuf {
    output
        .join(tile.zoom.to_string())
        .join(tile.x.to_string())
        .join(format!("{}.png", tile.y))
}

/// Validate and write one completed download.
fn store_tile(
    output: &Path,
    tile: &TileCoord,
    url: &str,
    result: Result<Bytes, FetchError>,
    verifier: Option<&SoftwareRenderContext>,
) -> Result<PathBuf, CliError> {
    let bytes = result.map_err(|error| CliError::Fetch {
        url: url.to_string(),
        error,
    })?;

    if let Some(context) = verifier {
        context.decode_bitmap(&bytes).map_err(|error| CliError::Decode {
            url: url.to_string(),
            error,
        })?;
    }

    let path = tile_path(output, tile);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| CliError::FileWrite {
            path: parent.display().to_string(),
            error,
        })?;
    }
    fs::write(&path, &bytes).map_err(|error| CliError::FileWrite {
        path: path.display().to_string(),
        error,
    })?;
    Ok(path)
}

fn progress_bar(total: u64) -> ProgressBar {
    let bar = ProgressBar::new(total);
    bar.set_style(
        ProgressStyle::with_template("{bar:30.cyan/blue} {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar
}
