//! # AppError
//!
//! Centralized error handling for the InfoKing workspace.
//! Adapters map their library failures into these variants at the port boundary.

use thiserror::Error;

/// The primary error type for all ik-core ports.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Transient transport failure (backend unreachable, timeout). Retried by the user, never automatically.
    #[error("network failure: {0}")]
    Network(String),

    /// Invalid credentials or a provider rejecting the request.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// A mutating action was attempted without a signed-in user.
    #[error("authentication required")]
    AuthRequired,

    /// The generative model returned an error or an empty payload.
    #[error("generation failed: {0}")]
    Generation(String),

    /// The generative model answered, but not with the declared schema.
    #[error("malformed generated payload: {0}")]
    Parse(String),

    /// The action needs connectivity and the client is offline.
    #[error("offline: {0}")]
    Offline(String),

    /// A credential or backend location was not supplied.
    #[error("not configured: {0}")]
    NotConfigured(String),

    /// Input rejected before reaching a backend (e.g. missing upload image)
    #[error("validation error: {0}")]
    Validation(String),

    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Unexpected backend failure (corrupt payload, constraint violation, ...)
    #[error("internal store error: {0}")]
    Internal(String),
}

impl AppError {
    /// Parse failures are reported to callers exactly like generation failures.
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Self::Generation(_) | Self::Parse(_))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Offline(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Internal(format!("serialization: {e}"))
    }
}

/// A specialized Result type for InfoKing logic.
pub type Result<T> = std::result::Result<T, AppError>;
