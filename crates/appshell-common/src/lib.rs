//! # AppShell Common
//!
//! Shared error types and logging configuration for the AppShell offline
//! worker runtime.
//!
//! ## Features
//!
//! - Unified error type with optional source chaining
//! - Logging configuration and setup on top of `tracing`

use thiserror::Error;

pub mod logging;

pub use logging::{init_logging, LogConfig, LogFormat};

/// Unified error type for AppShell crates.
#[derive(Error, Debug)]
pub enum AppShellError {
    /// Cache store errors.
    #[error("Cache error: {message}")]
    Cache {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Network-related errors.
    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Worker lifecycle errors (event dispatched in the wrong state).
    #[error("Lifecycle error: {0}")]
    Lifecycle(String),

    /// Configuration errors.
    #[error("Config error: {0}")]
    Config(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl AppShellError {
    /// Create a cache error.
    pub fn cache(message: impl Into<String>) -> Self {
        Self::Cache {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
            source: None,
        }
    }

    /// Create a network error with source.
    pub fn network_with_source<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::Network {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a lifecycle error.
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Get the error category for diagnostics.
    pub fn category(&self) -> &'static str {
        match self {
            AppShellError::Cache { .. } => "cache",
            AppShellError::Network { .. } => "network",
            AppShellError::Lifecycle(_) => "lifecycle",
            AppShellError::Config(_) => "config",
            AppShellError::InvalidArgument(_) => "invalid_argument",
        }
    }
}

/// Result type alias for AppShell operations.
pub type Result<T> = std::result::Result<T, AppShellError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(AppShellError::cache("test").category(), "cache");
        assert_eq!(AppShellError::network("test").category(), "network");
        assert_eq!(AppShellError::lifecycle("test").category(), "lifecycle");
        assert_eq!(AppShellError::config("test").category(), "config");
    }

    #[test]
    fn test_error_display() {
        let err = AppShellError::network("connection refused");
        assert_eq!(err.to_string(), "Network error: connection refused");

        let err = AppShellError::lifecycle("activate before install");
        assert_eq!(err.to_string(), "Lifecycle error: activate before install");
    }

    #[test]
    fn test_network_error_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = AppShellError::network_with_source("fetch failed", io);

        assert!(std::error::Error::source(&err).is_some());
    }
}
