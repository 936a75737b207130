//! Error types shared across every memory tier.

use uuid::Uuid;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the memory engine.
///
/// Per the error handling design, most of these never cross a store's public
/// API for expected runtime conditions (persistence failures, decode
/// mismatches, provider timeouts) — they are logged and swallowed at the
/// point of occurrence. The variants below exist for the cases that *do*
/// surface: explicit lookups by id, and configuration validation at
/// construction.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("entity not found: {0}")]
    EntityNotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("no LLM provider configured")]
    ProviderUnavailable,

    #[error("LLM provider call timed out")]
    ProviderTimeout,
}

impl Error {
    /// Whether the condition that produced this error is one a caller could
    /// retry after backing off, as opposed to a permanent mismatch.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Storage(_) | Error::Io(_) | Error::ProviderTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_classification() {
        assert!(Error::Storage("disk full".into()).is_recoverable());
        assert!(Error::ProviderTimeout.is_recoverable());
        assert!(!Error::InvalidInput("bad".into()).is_recoverable());
        assert!(!Error::NotFound(Uuid::nil()).is_recoverable());
    }

    #[test]
    fn display_messages() {
        let e = Error::EntityNotFound("person:alice".into());
        assert_eq!(e.to_string(), "entity not found: person:alice");
    }
}
