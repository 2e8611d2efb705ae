//! Tile entity and its lifecycle.
//!
//! A [`Tile`] comes into existence the moment its first fetch is issued and
//! keeps its coordinate, URL, and creation time unchanged for as long as it
//! stays resident. Only the state moves:
//!
//! ```text
//! Loading -> Ready          (fetch + decode succeeded)
//! Loading -> Error          (fetch, decode, or context failure)
//! Error   -> Loading        (retry; creation time is preserved)
//! ```
//!
//! Ready is terminal. A ready tile never re-enters loading; it leaves the
//! cache by eviction and comes back as a brand-new tile. Transitions applied
//! in the wrong state return [`StateError`]; the cache always inspects state
//! under its lock first, so hitting one indicates a caller bug.

pub mod source;

pub use source::TileSource;

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::coord::TileCoord;
use crate::fetch::{FetchError, FetchHandle, RequestId};
use crate::render::{DecodeError, TileBitmap};

/// Why a tile ended in the error state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TileFault {
    /// The fetch failed, server-reported or in transport.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A complete body arrived but could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// A complete body arrived while no render context was installed.
    #[error("No render context installed")]
    NoRenderContext,
}

/// Point-in-time view of a tile's state.
///
/// This is what lookups hand out: a snapshot that shares the payload but
/// holds no lock and pins no entry.
#[derive(Debug, Clone)]
pub enum TileStatus {
    /// Fetch outstanding.
    Loading,
    /// Decoded bitmap available for drawing.
    Ready(Arc<TileBitmap>),
    /// Last attempt failed; the next ensure issues a retry.
    Error(Arc<TileFault>),
}

impl TileStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, TileStatus::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, TileStatus::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, TileStatus::Error(_))
    }
}

/// Error returned when a lifecycle transition is applied in the wrong state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid tile state transition for {coord}: {from} -> {to}")]
pub struct StateError {
    pub coord: TileCoord,
    pub from: &'static str,
    pub to: &'static str,
}

#[derive(Debug)]
enum TileState {
    Loading { request: FetchHandle },
    Ready(Arc<TileBitmap>),
    Error(Arc<TileFault>),
}

impl TileState {
    fn name(&self) -> &'static str {
        match self {
            TileState::Loading { .. } => "loading",
            TileState::Ready(_) => "ready",
            TileState::Error(_) => "error",
        }
    }
}

/// One resident map tile.
#[derive(Debug)]
pub struct Tile {
    coord: TileCoord,
    url: String,
    created_at: Instant,
    state: TileState,
}

impl Tile {
    /// Creates a tile with its first fetch outstanding.
    ///
    /// The URL is computed once here and cached for the tile's lifetime.
    pub fn loading(coord: TileCoord, url: String, request: FetchHandle) -> Self {
        Self {
            coord,
            url,
            created_at: Instant::now(),
            state: TileState::Loading { request },
        }
    }

    pub fn coord(&self) -> TileCoord {
        self.coord
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// When this tile entered the cache. Retries do not refresh it.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, TileState::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self.state, TileState::Ready(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, TileState::Error(_))
    }

    /// Id of the outstanding fetch, while loading.
    pub fn loading_request(&self) -> Option<RequestId> {
        match &self.state {
            TileState::Loading { request } => Some(request.request_id()),
            _ => None,
        }
    }

    /// Snapshots the current state.
    pub fn status(&self) -> TileStatus {
        match &self.state {
            TileState::Loading { .. } => TileStatus::Loading,
            TileState::Ready(bitmap) => TileStatus::Ready(Arc::clone(bitmap)),
            TileState::Error(fault) => TileStatus::Error(Arc::clone(fault)),
        }
    }

    /// Loading -> Ready.
    pub fn mark_ready(&mut self, bitmap: Arc<TileBitmap>) -> Result<(), StateError> {
        match self.state {
            TileState::Loading { .. } => {
                self.state = TileState::Ready(bitmap);
                Ok(())
            }
            _ => Err(self.bad_transition("ready")),
        }
    }

    /// Loading -> Error.
    pub fn mark_error(&mut self, fault: TileFault) -> Result<(), StateError> {
        match self.state {
            TileState::Loading { .. } => {
                self.state = TileState::Error(Arc::new(fault));
                Ok(())
            }
            _ => Err(self.bad_transition("error")),
        }
    }

    /// Error -> Loading, with a fresh fetch outstanding.
    pub fn retry(&mut self, request: FetchHandle) -> Result<(), StateError> {
        match self.state {
            TileState::Error(_) => {
                self.state = TileState::Loading { request };
                Ok(())
            }
            _ => Err(self.bad_transition("loading")),
        }
    }

    fn bad_transition(&self, to: &'static str) -> StateError {
        StateError {
            coord: self.coord,
            from: self.state.name(),
            to,
        }
    }
}
