//! Entry point for building requests against a shared transport.
//!
//! # Design
//! `Client` is an explicitly constructed handle: it owns an
//! `Arc<dyn Transport>` plus default timeouts, and clones share both. Each
//! factory call hands out an independent `Request` that copies the
//! defaults, so per-request tweaks never leak back into the client.
//!
//! Every method has three forms: a plain URL, a base URL plus a map-like
//! iterable of params, and a base URL plus a flat `key, value, ...` list.
//! With `QueryEncoding::Encoded` the base URL is normalized with
//! `query::encode` before the encoded params are appended.

use std::fmt::{self, Display};
use std::sync::Arc;

use crate::config::{Timeouts, TransportConfig};
use crate::error::RequestResult;
use crate::http::HttpMethod;
use crate::query::{self, QueryEncoding};
use crate::request::Request;
use crate::transport::{Transport, UreqTransport};

/// Cheaply clonable request factory.
#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn Transport>,
    timeouts: Timeouts,
}

impl Client {
    /// Client over a pooled `ureq` transport built from `config`.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            transport: Arc::new(UreqTransport::new(&config)),
            timeouts: config.timeouts,
        }
    }

    /// Client over any transport, with default timeouts.
    pub fn with_transport(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            timeouts: Timeouts::default(),
        }
    }

    /// Replace the timeouts copied into new requests.
    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn default_timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn request(&self, method: HttpMethod, url: &str) -> Request {
        Request::new(self.transport.clone(), method, url, self.timeouts)
    }

    /// Request to `base_url` with `params` appended in iteration order.
    pub fn request_with<I, K, V>(
        &self,
        method: HttpMethod,
        base_url: &str,
        params: I,
        encoding: QueryEncoding,
    ) -> RequestResult<Request>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        let url = assemble(base_url, &query::pairs_from_map(params), encoding)?;
        Ok(self.request(method, &url))
    }

    /// Request to `base_url` with a flat `key, value, ...` list appended.
    pub fn request_flat<S: AsRef<str>>(
        &self,
        method: HttpMethod,
        base_url: &str,
        encoding: QueryEncoding,
        params: &[S],
    ) -> RequestResult<Request> {
        let url = assemble(base_url, &query::pairs_from_flat(params)?, encoding)?;
        Ok(self.request(method, &url))
    }

    pub fn get(&self, url: &str) -> Request {
        self.request(HttpMethod::Get, url)
    }

    pub fn get_with<I, K, V>(
        &self,
        base_url: &str,
        params: I,
        encoding: QueryEncoding,
    ) -> RequestResult<Request>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        self.request_with(HttpMethod::Get, base_url, params, encoding)
    }

    pub fn get_flat<S: AsRef<str>>(
        &self,
        base_url: &str,
        encoding: QueryEncoding,
        params: &[S],
    ) -> RequestResult<Request> {
        self.request_flat(HttpMethod::Get, base_url, encoding, params)
    }

    pub fn post(&self, url: &str) -> Request {
        self.request(HttpMethod::Post, url)
    }

    pub fn post_with<I, K, V>(
        &self,
        base_url: &str,
        params: I,
        encoding: QueryEncoding,
    ) -> RequestResult<Request>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        self.request_with(HttpMethod::Post, base_url, params, encoding)
    }

    pub fn post_flat<S: AsRef<str>>(
        &self,
        base_url: &str,
        encoding: QueryEncoding,
        params: &[S],
    ) -> RequestResult<Request> {
        self.request_flat(HttpMethod::Post, base_url, encoding, params)
    }

    pub fn put(&self, url: &str) -> Request {
        self.request(HttpMethod::Put, url)
    }

    pub fn put_with<I, K, V>(
        &self,
        base_url: &str,
        params: I,
        encoding: QueryEncoding,
    ) -> RequestResult<Request>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        self.request_with(HttpMethod::Put, base_url, params, encoding)
    }

    pub fn put_flat<S: AsRef<str>>(
        &self,
        base_url: &str,
        encoding: QueryEncoding,
        params: &[S],
    ) -> RequestResult<Request> {
        self.request_flat(HttpMethod::Put, base_url, encoding, params)
    }

    pub fn delete(&self, url: &str) -> Request {
        self.request(HttpMethod::Delete, url)
    }

    pub fn delete_with<I, K, V>(
        &self,
        base_url: &str,
        params: I,
        encoding: QueryEncoding,
    ) -> RequestResult<Request>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Display,
        V: Display,
    {
        self.request_with(HttpMethod::Delete, base_url, params, encoding)
    }

    pub fn delete_flat<S: AsRef<str>>(
        &self,
        base_url: &str,
        encoding: QueryEncoding,
        params: &[S],
    ) -> RequestResult<Request> {
        self.request_flat(HttpMethod::Delete, base_url, encoding, params)
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(TransportConfig::default())
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("timeouts", &self.timeouts)
            .finish()
    }
}

fn assemble(
    base_url: &str,
    pairs: &[(String, String)],
    encoding: QueryEncoding,
) -> RequestResult<String> {
    match encoding {
        QueryEncoding::Raw => Ok(query::build(base_url, pairs, encoding)),
        QueryEncoding::Encoded => Ok(query::build(&query::encode(base_url)?, pairs, encoding)),
    }
}
