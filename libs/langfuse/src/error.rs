//! Adapter errors.

use thiserror::Error;

/// Errors from Langfuse API calls.
#[derive(Debug, Error)]
pub enum LangfuseError {
    /// Transport failure (connect, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with status >= 400. Carries the status line and the
    /// response body verbatim.
    #[error("API error: {status}: {body}")]
    Api { status: String, body: String },

    /// A success response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Credentials could not be encoded as a header value.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
}
