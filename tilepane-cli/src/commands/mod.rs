//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`locate`] - Resolve a position to its tile (no network)
//! - [`fetch`] - Download tiles to disk
//! - [`view`] - Interactive terminal map viewer

pub mod fetch;
pub mod locate;
pub mod view;
