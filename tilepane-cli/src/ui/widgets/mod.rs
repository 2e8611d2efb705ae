//! Dashboard widgets for the TUI.

mod telemetry;
mod tile_grid;

pub use telemetry::TelemetryWidget;
pub use tile_grid::{legend, TileGridWidget};
