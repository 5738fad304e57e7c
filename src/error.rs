//! Error types for Promptbench
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Promptbench operations
///
/// Covers configuration loading, model invocation, durable storage,
/// and request validation failures.
#[derive(Error, Debug)]
pub enum PromptbenchError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Model invocation errors (backend rejected, unreachable, malformed reply)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Caller supplied an unusable request (e.g. fewer than two models to compare)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// A flow required an entity that does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Durable store errors (open, read, write, clear)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Promptbench operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
