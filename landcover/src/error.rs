//! Error types for the landcover library.

use thiserror::Error;

/// Errors that can occur while resolving terrain for a location.
///
/// The type is `Clone` so that a failed legend fetch can be handed to every
/// caller waiting on the same in-flight request.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TerrainError {
    /// Coordinates or parameters are outside the accepted range.
    #[error("Invalid input: lat={lat}, lon={lon} ({reason})")]
    InvalidInput { lat: f64, lon: f64, reason: String },

    /// The location code does not follow the Open Location Code grammar.
    #[error("Invalid location code '{code}': {reason}")]
    InvalidCode { code: String, reason: String },

    /// The remote land-cover service failed, timed out or answered with an
    /// unexpected payload.
    #[error("Upstream error during {context}: {reason}")]
    Upstream { context: String, reason: String },

    /// A query geometry could not be encoded.
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// The resolver or HTTP client could not be configured.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl TerrainError {
    pub(crate) fn invalid_input(lat: f64, lon: f64, reason: impl Into<String>) -> Self {
        TerrainError::InvalidInput {
            lat,
            lon,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_code(code: &str, reason: impl Into<String>) -> Self {
        TerrainError::InvalidCode {
            code: code.to_string(),
            reason: reason.into(),
        }
    }

    #[cfg(feature = "remote")]
    pub(crate) fn upstream(context: impl Into<String>, reason: impl ToString) -> Self {
        TerrainError::Upstream {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error was caused by the caller rather than by the remote service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            TerrainError::InvalidInput { .. } | TerrainError::InvalidCode { .. }
        )
    }
}

/// Result type alias using [`TerrainError`].
pub type Result<T> = std::result::Result<T, TerrainError>;
