//! The cached result of a dispatched request.

use serde::de::DeserializeOwned;

use crate::error::{RequestError, RequestResult};
use crate::http::{
    find_header, HttpResponse, HTTP_BAD_REQUEST, HTTP_CREATED, HTTP_INTERNAL_ERROR,
    HTTP_NOT_FOUND, HTTP_NOT_MODIFIED, HTTP_NO_CONTENT, HTTP_OK,
};
use crate::media::decode_text;

/// Status code, reason phrase, headers and body text of one response.
///
/// Built once from the transport's `HttpResponse`; every accessor is a
/// plain read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    code: u16,
    message: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl Response {
    /// Decode the body with the response charset, UTF-8 if none.
    pub fn from_raw(raw: HttpResponse) -> Self {
        let body = decode_text(find_header(&raw.headers, "content-type"), &raw.body).into_owned();
        Self {
            code: raw.status,
            message: raw.message,
            headers: raw.headers,
            body,
        }
    }

    pub fn code(&self) -> u16 {
        self.code
    }

    /// Reason phrase, e.g. `OK` or `No Content`.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> RequestResult<T> {
        serde_json::from_str(&self.body).map_err(|e| RequestError::Deserialization(e.to_string()))
    }

    pub fn ok(&self) -> bool {
        self.code == HTTP_OK
    }

    pub fn created(&self) -> bool {
        self.code == HTTP_CREATED
    }

    pub fn no_content(&self) -> bool {
        self.code == HTTP_NO_CONTENT
    }

    pub fn not_modified(&self) -> bool {
        self.code == HTTP_NOT_MODIFIED
    }

    pub fn bad_request(&self) -> bool {
        self.code == HTTP_BAD_REQUEST
    }

    pub fn not_found(&self) -> bool {
        self.code == HTTP_NOT_FOUND
    }

    pub fn server_error(&self) -> bool {
        self.code == HTTP_INTERNAL_ERROR
    }
}
