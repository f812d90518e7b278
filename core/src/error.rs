//! Error types for the request façade.
//!
//! # Design
//! Every transport failure, whatever its origin (connect refused, timeout,
//! I/O while streaming a body or reading the response), is folded into one
//! `Transport` variant that keeps the method and URL for context and the
//! underlying error as its source. Nothing here is retried.

use thiserror::Error;

use crate::http::HttpMethod;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned while building, dispatching, or reading a request.
#[derive(Debug, Error)]
pub enum RequestError {
    /// Caller-supplied input could not be turned into a request, e.g. an
    /// odd number of flat query arguments or a URL without a scheme.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// The underlying call failed before a response was fully read.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configured charset cannot encode a request body.
    #[error("unsupported charset: {0}")]
    Encoding(String),

    /// `execute` was called again after the only dispatch attempt failed.
    #[error("request previously failed: {0}")]
    PreviouslyFailed(String),

    /// A value could not be serialized into a JSON body.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized from JSON.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

pub type RequestResult<T> = Result<T, RequestError>;

/// A failed round-trip, wrapping the underlying cause.
#[derive(Debug, Error)]
#[error("request failed: {method} {url}: {source}")]
pub struct TransportError {
    pub method: HttpMethod,
    pub url: String,
    #[source]
    pub source: BoxError,
}

impl TransportError {
    pub fn new(method: HttpMethod, url: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            method,
            url: url.into(),
            source: source.into(),
        }
    }
}
