//! Error types for rate fetching and log decoding.
//!
//! Arithmetic and formatting never fail, so there is no conversion error.

use alloy::primitives::B256;
use thiserror::Error;

/// Failure to obtain live exchange rates. Callers recover with the defaults.
#[derive(Debug, Error)]
pub enum RateFetchError {
    /// No API key was configured.
    #[error("no price API key configured")]
    MissingApiKey,
    /// The HTTP client could not be built or the request could not be sent.
    #[error("performing request: {0}")]
    Request(#[from] reqwest::Error),
    /// The request did not finish before the deadline.
    #[error("price request timed out after {0:?}")]
    Timeout(std::time::Duration),
    /// The API answered with a non-success status.
    #[error("price API returned HTTP {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// The API's own `status.error_message`, or the raw body.
        message: String,
    },
    /// The body did not have the expected shape.
    #[error("decoding response: {0}")]
    Malformed(String),
}

/// ABI text that cannot be used to build an event table.
#[derive(Debug, Error)]
pub enum AbiParseError {
    /// Not JSON at all.
    #[error("ABI is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// JSON, but not an array of ABI items (or an artifact with an `abi` array).
    #[error("ABI does not describe a contract interface: {0}")]
    NotAnInterface(String),
    /// An event parameter has a type that cannot be resolved.
    #[error("event {event}: unsupported parameter type {ty}: {reason}")]
    UnsupportedType {
        /// Event name.
        event: String,
        /// Offending ABI type string.
        ty: String,
        /// Resolver message.
        reason: String,
    },
}

/// A log whose topic matched a known event but whose payload did not decode.
#[derive(Debug, Error)]
#[error("decoding {event} (topic {topic}) in log {log_index}: {reason}")]
pub struct LogDecodeError {
    /// Matched event name.
    pub event: String,
    /// Matching topic hash.
    pub topic: B256,
    /// Position of the log in the receipt.
    pub log_index: usize,
    /// Decoder message.
    pub reason: String,
}
