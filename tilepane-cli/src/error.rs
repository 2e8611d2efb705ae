//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::process;

use tilepane::app::EngineError;
use tilepane::coord::CoordError;
use tilepane::fetch::{FetchError, TransportError};
use tilepane::render::DecodeError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Rejected latitude, longitude, or zoom input
    InvalidCoordinate(CoordError),
    /// Failed to start the map engine
    Engine(EngineError),
    /// Async runtime failure
    Runtime(String),
    /// Failed to build the HTTP client
    HttpClient(TransportError),
    /// A tile download failed
    Fetch { url: String, error: FetchError },
    /// A downloaded tile could not be decoded
    Decode { url: String, error: DecodeError },
    /// Failed to write an output file
    FileWrite { path: String, error: std::io::Error },
    /// Terminal UI failure
    Terminal(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Fetch {
                error: FetchError::Server { status: 403 | 429 },
                ..
            } => {
                eprintln!();
                eprintln!("The tile server refused the request. Public servers rate-limit");
                eprintln!("and some block bulk downloads outright. Check the server's usage");
                eprintln!("policy, or point --url at a server you are allowed to use.");
            }
            CliError::Fetch {
                error: FetchError::Transport(_),
                ..
            } => {
                eprintln!();
                eprintln!("Check your network connection and that the base URL is reachable.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::InvalidCoordinate(e) => write!(f, "{}", e),
            CliError::Engine(e) => write!(f, "Failed to start map engine: {}", e),
            CliError::Runtime(msg) => write!(f, "Runtime error: {}", msg),
            CliError::HttpClient(e) => write!(f, "Failed to initialize HTTP client: {}", e),
            CliError::Fetch { url, error } => write!(f, "Failed to fetch '{}': {}", url, error),
            CliError::Decode { url, error } => {
                write!(f, "Fetched '{}' but could not decode it: {}", url, error)
            }
            CliError::FileWrite { path, error } => {
                write!(f, "Failed to write file '{}': {}", path, error)
            }
            CliError::Terminal(msg) => write!(f, "Terminal error: {}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::InvalidCoordinate(e) => Some(e),
            CliError::Engine(e) => Some(e),
            CliError::HttpClient(e) => Some(e),
            CliError::Fetch { error, .. } => Some(error),
            CliError::Decode { error, .. } => Some(error),
            CliError::FileWrite { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<CoordError> for CliError {
    fn from(e: CoordError) -> Self {
        CliError::InvalidCoordinate(e)
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::Engine(e)
    }
}
