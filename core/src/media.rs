//! `Content-Type` parsing and charset handling for request and response
//! bodies.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use crate::error::{RequestError, RequestResult};

/// Media type used when a request does not set one.
pub const DEFAULT_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// A `Content-Type` value split into its essence and charset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    raw: String,
    essence: String,
    charset: Option<String>,
}

impl MediaType {
    /// Permissive parse: anything before the first `;` is the essence, and
    /// a `charset=` parameter (quoted or not) is picked out of the rest.
    pub fn parse(value: &str) -> Self {
        let mut parts = value.split(';');
        let essence = parts
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        let charset = parts.find_map(|param| {
            let (name, val) = param.split_once('=')?;
            name.trim()
                .eq_ignore_ascii_case("charset")
                .then(|| val.trim().trim_matches('"').to_string())
                .filter(|cs| !cs.is_empty())
        });
        Self {
            raw: value.trim().to_string(),
            essence,
            charset,
        }
    }

    /// The value as given, used verbatim for the `Content-Type` header.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lowercased `type/subtype`.
    pub fn essence(&self) -> &str {
        &self.essence
    }

    pub fn charset(&self) -> Option<&str> {
        self.charset.as_deref()
    }

    /// Encoding named by the charset, UTF-8 when none is given.
    pub fn encoding(&self) -> RequestResult<&'static Encoding> {
        match self.charset.as_deref() {
            None => Ok(UTF_8),
            Some(label) => Encoding::for_label(label.as_bytes())
                .ok_or_else(|| RequestError::Encoding(label.to_string())),
        }
    }

    /// Encode `text` for the wire with this media type's charset.
    pub fn encode_text(&self, text: &str) -> RequestResult<Vec<u8>> {
        let encoding = self.encoding()?;
        let (bytes, _, unmappable) = encoding.encode(text);
        if unmappable {
            tracing::debug!(charset = encoding.name(), "body had characters outside the charset");
        }
        Ok(bytes.into_owned())
    }
}

impl Default for MediaType {
    fn default() -> Self {
        Self::parse(DEFAULT_CONTENT_TYPE)
    }
}

/// Decode a response body using the charset of `content_type`.
///
/// Falls back to lossy UTF-8 when no charset is declared or the label is
/// unknown.
pub fn decode_text<'a>(content_type: Option<&str>, body: &'a [u8]) -> Cow<'a, str> {
    let encoding = content_type
        .map(MediaType::parse)
        .and_then(|mt| mt.encoding().ok())
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text
}
