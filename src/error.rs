//! Error types for dnsname-resolver.

use thiserror::Error;

/// Errors that can occur while building or driving the resolver index.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// IO error (reading a notification file, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Notification could not be decoded
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The watch source could not be constructed
    #[error("Watch source error: {0}")]
    Source(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// `start` was called more than once
    #[error("resolver already started")]
    AlreadyStarted,

    /// `start` was called after shutdown
    #[error("resolver has been shut down")]
    Stopped,

    /// `shutdown` was called more than once
    #[error("shutdown already in progress")]
    ShutdownInProgress,
}
