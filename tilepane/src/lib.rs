//! Tilepane - slippy-map tile engine
//!
//! This library fetches, decodes, caches, and evicts square map tiles
//! addressed by the standard zoom/x/y scheme, to back a panning and zooming
//! map view. It owns the coordinate math, the tile state machine, and the
//! asynchronous fetch pipeline; windowing, GPU upload, and image codecs
//! stay on the host's side of the [`render`] seam.
//!
//! # High-Level API
//!
//! For most use cases, the [`app`] module provides an assembled engine:
//!
//! ```ignore
//! use tilepane::app::{EngineConfig, MapEngine};
//!
//! let config = EngineConfig::default().with_screen_size(1024, 768);
//! let mut engine = MapEngine::new(config)?;
//! engine.set_render_context(context);
//!
//! // Each frame: update the camera, refresh, draw what is ready.
//! engine.viewport_mut().pan_by_pixels(4.0, 0.0);
//! let visible = engine.refresh();
//! ```

pub mod app;
pub mod cache;
pub mod coord;
pub mod fetch;
pub mod logging;
pub mod render;
pub mod telemetry;
pub mod tile;
pub mod viewport;

/// Version of the tilepane library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
