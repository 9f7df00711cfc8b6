//! Error types for qachat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for qachat operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, chat streaming, knowledge base management,
/// and local state persistence.
#[derive(Error, Debug)]
pub enum QaChatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Remote API errors (bad envelope code, server failures)
    #[error("API error: {0}")]
    Api(String),

    /// Requested resource does not exist on the server
    #[error("Not found: {0}")]
    NotFound(String),

    /// Chat stream errors (connection setup, transport failures)
    #[error("Stream error: {0}")]
    Stream(String),

    /// Session management errors (unknown ids, invalid switches)
    #[error("Session error: {0}")]
    Session(String),

    /// Knowledge base errors (guard rejections, missing bases)
    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    /// Local state storage errors (database operations)
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

/// Result type alias for qachat operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
