//! The boundary between the façade and the HTTP client doing the I/O.
//!
//! # Design
//! `Transport` is the only seam the façade talks through: one descriptor
//! in, one fully read response out. `UreqTransport` owns a single
//! `ureq::Agent`, so every clone shares the same keep-alive pool, and
//! applies each request's timeouts through request-scoped configuration
//! instead of mutating the agent.

use std::fs::File;
use std::sync::Arc;

use ureq::http::Response;
use ureq::typestate::{WithBody, WithoutBody};
use ureq::{Agent, Body, RequestBuilder, SendBody};

use crate::config::TransportConfig;
use crate::error::{BoxError, TransportError};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, RequestBody};

/// Executes one request and returns its response with the body read.
///
/// Implementations read the response body to the end and release it
/// before returning. Any failure along the way is a `TransportError`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).execute(request)
    }
}

/// Pooled transport backed by `ureq`.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: Agent,
    user_agent: String,
    max_body_size: u64,
}

impl UreqTransport {
    pub fn new(config: &TransportConfig) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .max_idle_connections(config.max_idle_connections)
            .max_idle_connections_per_host(config.max_idle_connections_per_host)
            .max_idle_age(config.keep_alive)
            .build()
            .new_agent();
        Self {
            agent,
            user_agent: config.user_agent.clone(),
            max_body_size: config.max_body_size,
        }
    }

    fn prepare<B>(&self, builder: RequestBuilder<B>, request: &HttpRequest) -> RequestBuilder<B> {
        let mut builder = builder.header("user-agent", self.user_agent.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let t = request.timeouts;
        builder
            .config()
            .timeout_connect(Some(t.connect))
            .timeout_send_request(Some(t.write))
            .timeout_send_body(Some(t.write))
            .timeout_recv_response(Some(t.read))
            .timeout_recv_body(Some(t.read))
            .build()
    }

    fn without_body(&self, request: &HttpRequest) -> RequestBuilder<WithoutBody> {
        let url = request.url.as_str();
        match request.method {
            HttpMethod::Delete => self.prepare(self.agent.delete(url), request),
            _ => self.prepare(self.agent.get(url), request),
        }
    }

    fn with_body(&self, request: &HttpRequest) -> RequestBuilder<WithBody> {
        let url = request.url.as_str();
        match request.method {
            HttpMethod::Post => self.prepare(self.agent.post(url), request),
            HttpMethod::Put => self.prepare(self.agent.put(url), request),
            // GET and DELETE only get here with a staged body.
            _ => self.without_body(request).force_send_body(),
        }
    }

    fn dispatch(&self, request: &HttpRequest) -> Result<Response<Body>, BoxError> {
        let response = match (request.method, &request.body) {
            (HttpMethod::Get | HttpMethod::Delete, None) => self.without_body(request).call()?,
            (HttpMethod::Post | HttpMethod::Put, None) => self.with_body(request).send_empty()?,
            (_, Some(RequestBody::Bytes(bytes))) => self.with_body(request).send(&bytes[..])?,
            (_, Some(RequestBody::File(path))) => {
                let mut file = File::open(path)?;
                self.with_body(request).send(SendBody::from_reader(&mut file))?
            }
        };
        Ok(response)
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&TransportConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut response = self
            .dispatch(request)
            .map_err(|e| TransportError::new(request.method, request.url.as_str(), e))?;

        let status = response.status();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(self.max_body_size)
            .read_to_vec()
            .map_err(|e| TransportError::new(request.method, request.url.as_str(), e))?;

        Ok(HttpResponse {
            status: status.as_u16(),
            message: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body,
        })
    }
}
