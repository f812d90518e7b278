//! HTTP transport types shared by the façade and the transport seam.
//!
//! # Design
//! These types describe a request and its raw response as plain data. The
//! façade builds one `HttpRequest` per dispatch and hands it to a
//! `Transport`, which returns an `HttpResponse` with the body already read
//! into memory. Keeping both sides as owned data makes transports easy to
//! swap for a recording double in tests.

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;

use crate::config::Timeouts;

pub const HTTP_OK: u16 = 200;
pub const HTTP_CREATED: u16 = 201;
pub const HTTP_NO_CONTENT: u16 = 204;
pub const HTTP_NOT_MODIFIED: u16 = 304;
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_INTERNAL_ERROR: u16 = 500;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound payload of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    /// Bytes already encoded with the request's charset.
    Bytes(Vec<u8>),
    /// A file streamed from disk at dispatch time.
    File(PathBuf),
}

impl RequestBody {
    /// Number of bytes this body will put on the wire.
    pub fn content_length(&self) -> io::Result<u64> {
        match self {
            RequestBody::Bytes(bytes) => Ok(bytes.len() as u64),
            RequestBody::File(path) => Ok(fs::metadata(path)?.len()),
        }
    }
}

/// A fully built request, handed to a `Transport` exactly once.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub timeouts: Timeouts,
}

impl HttpRequest {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// What a transport returns: status line, headers, and the whole body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub message: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

pub(crate) fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
