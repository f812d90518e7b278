//! Fluent request building over a pluggable HTTP transport.
//!
//! # Overview
//! `Client` hands out `Request` builders for GET/POST/PUT/DELETE. A request
//! collects headers, a media type, a body and timeouts, then resolves
//! exactly once through `Request::execute` into a cached `Response`
//! (status code, reason phrase, body text).
//!
//! # Design
//! - URL assembly lives in `query`: one `build` over ordered pairs plus a
//!   `QueryEncoding`, and `encode` for normalizing whole URLs.
//! - The network sits behind the `Transport` trait. `UreqTransport` is the
//!   default and keeps one keep-alive pool per client; tests swap in
//!   recording doubles.
//! - No retries. A transport failure surfaces once as
//!   `RequestError::Transport` and the request stays failed.

pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod media;
pub mod query;
pub mod request;
pub mod response;
pub mod transport;

pub use client::Client;
pub use config::{Timeouts, TransportConfig};
pub use error::{RequestError, RequestResult, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};
pub use media::MediaType;
pub use query::QueryEncoding;
pub use request::Request;
pub use response::Response;
pub use transport::{Transport, UreqTransport};
