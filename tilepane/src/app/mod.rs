//! Engine bootstrap and lifecycle management.
//!
//! This module provides the `MapEngine` type, which assembles the viewport,
//! tile cache, and fetch channel into one unit with a single startup and
//! shutdown path.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MapEngine                           │
//! │                                                              │
//! │  Viewport ── tile_rect() ──► TileCache ── get() ──► Fetch-   │
//! │  (camera)                    (resident   ◄─ done ── Channel  │
//! │      │                        tiles)                (tokio)  │
//! │      └── tile_screen_position()  │                           │
//! │                                  └──► RenderContext (host)   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The engine owns a Tokio runtime when started from a synchronous host,
//! or runs its fetch workers on a caller-provided runtime handle.

mod bootstrap;
mod config;
mod error;

pub use bootstrap::MapEngine;
pub use config::{
    CacheConfig, EngineConfig, FetchConfig, SourceConfig, ViewportConfig,
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_TILE_URL,
};
pub use error::EngineError;
