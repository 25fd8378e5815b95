// src/error.rs

//! Unified error handling for the job crawler.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Run input validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level failure (timeout, reset, refused) not raised by reqwest itself
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-retryable status on the final attempt
    #[error("Fetch of {url} failed with status {status}")]
    FetchStatus { url: String, status: u16 },

    /// Every attempt ended in a soft failure
    #[error("Fetch of {url} exhausted after {attempts} attempt(s): {reason}")]
    FetchExhausted {
        url: String,
        attempts: u32,
        reason: String,
    },

    /// Payload decoded but has an unusable shape
    #[error("Payload error: {0}")]
    Payload(String),
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a transport error.
    pub fn transport(message: impl fmt::Display) -> Self {
        Self::Transport(message.to_string())
    }

    /// Create a payload shape error.
    pub fn payload(message: impl Into<String>) -> Self {
        Self::Payload(message.into())
    }

    /// Whether this error must abort the whole run rather than just the current page.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::FetchStatus { .. } | Self::Json(_) | Self::Payload(_)
        )
    }

    /// Whether this error came from the network layer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Transport(_))
    }
}
