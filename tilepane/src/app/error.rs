//! Engine error types.

use std::fmt;

use crate::coord::CoordError;
use crate::fetch::TransportError;

/// Errors that can occur during engine lifecycle.
#[derive(Debug)]
pub enum EngineError {
    /// The configured camera position or zoom is outside the projection's
    /// domain.
    InvalidViewport(CoordError),

    /// Failed to initialize the HTTP client.
    HttpClient(TransportError),

    /// Failed to create the Tokio runtime.
    RuntimeCreation(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::InvalidViewport(e) => {
                write!(f, "Invalid viewport configuration: {}", e)
            }
            EngineError::HttpClient(e) => {
                write!(f, "Failed to initialize HTTP client: {}", e)
            }
            EngineError::RuntimeCreation(msg) => {
                write!(f, "Failed to create Tokio runtime: {}", msg)
            }
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::InvalidViewport(e) => Some(e),
            EngineError::HttpClient(e) => Some(e),
            EngineError::RuntimeCreation(_) => None,
        }
    }
}

impl From<CoordError> for EngineError {
    fn from(e: CoordError) -> Self {
        EngineError::InvalidViewport(e)
    }
}

impl From<TransportError> for EngineError {
    fn from(e: TransportError) -> Self {
        EngineError::HttpClient(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::RuntimeCreation("no threads".to_string());
        assert!(err.to_string().contains("Failed to create Tokio runtime"));
        assert!(err.to_string().contains("no threads"));
    }

    #[test]
    fn test_engine_error_from_coord_error() {
        let coord_err = CoordError::InvalidLatitude(95.0);
        let err: EngineError = coord_err.into();
        assert!(matches!(err, EngineError::InvalidViewport(_)));
        assert!(err.to_string().contains("Invalid viewport configuration"));
    }
}
