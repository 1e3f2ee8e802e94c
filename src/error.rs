use std::time::Duration;
use thiserror::Error;

/// Errors produced by the toolkit and its components.
#[derive(Error, Debug)]
pub enum ForgeError {
    /// Low-level HTTP transport failure (connection refused, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed at the serde level.
    #[error("JSON handling failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while reading templates.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A template could not be located or loaded.
    #[error("template '{name}': {message}")]
    Template { name: String, message: String },

    /// A template referenced variables the caller did not provide.
    #[error("template '{template}' is missing required variables: {}", .variables.join(", "))]
    MissingVariables {
        template: String,
        variables: Vec<String>,
    },

    /// HTTP error with status code, response body, and optional Retry-After hint.
    ///
    /// Returned by [`Backend`](crate::backend::Backend) implementations when
    /// the provider returns a non-success status code. The `retry_after` field
    /// is populated from the `Retry-After` response header when present.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 429, 500, 503).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The recovery parser could not reconstruct a structured value and the
    /// caller asked for one.
    #[error("recovery failed: {0}")]
    Recovery(String),

    /// Invalid configuration detected at build time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Catch-all for other errors.
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for ForgeError {
    fn from(err: anyhow::Error) -> Self {
        ForgeError::Other(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
