//! Error types for the image arena service
//!
//! Fallible operations return `anyhow::Result`; the typed `ArenaError`
//! variants below are what callers downcast to when they need to tell a
//! rejected request apart from an internal failure.

use crate::types::ItemId;

/// Result type alias for convenience
pub type Result<T> = anyhow::Result<T>;

/// Custom error types for specific arena scenarios
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ArenaError {
    #[error("Item not found: {id}")]
    NotFound { id: ItemId },

    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("Not enough items for a matchup: {available} available, 2 required")]
    InsufficientData { available: usize },

    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("Configuration error: {message}")]
    ConfigurationError { message: String },
}

impl ArenaError {
    /// Shorthand for an `InvalidInput` error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            reason: reason.into(),
        }
    }

    /// Whether the error was caused by the caller rather than the service
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::InvalidInput { .. } | Self::InsufficientData { .. }
        )
    }

    /// Short machine-readable reason, used as a metrics label
    pub fn reason(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::InvalidInput { .. } => "invalid_input",
            Self::InsufficientData { .. } => "insufficient_data",
            Self::Storage { .. } => "storage",
            Self::ConfigurationError { .. } => "configuration",
        }
    }
}

impl From<rusqlite::Error> for ArenaError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage {
            message: value.to_string(),
        }
    }
}
