//! URL assembly and percent-encoding.
//!
//! # Design
//! `build` is the single entry point for appending query parameters: it
//! takes an ordered slice of pairs and a `QueryEncoding`. Callers holding a
//! map or a flat `key, value, key, value` list convert first with
//! `pairs_from_map` / `pairs_from_flat`, so ordering and pairing rules live
//! in one place.
//!
//! `encode` is separate and works on an already assembled URL. It escapes
//! what must be escaped in the path, query and fragment while leaving
//! existing `%XX` escapes alone, so running it twice is harmless.

use std::fmt::Display;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::error::{RequestError, RequestResult};

/// Bytes escaped in a path. Everything outside RFC 3986 `pchar` and `/`.
const PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// Query bytes: `?` is legal, `+` is escaped so it is not read as a space.
const QUERY: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'+')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

const FRAGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// How keys and values are written into the query string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryEncoding {
    /// Insert keys and values verbatim.
    #[default]
    Raw,
    /// Percent-encode keys and values over UTF-8; space becomes `%20`.
    Encoded,
}

/// Append `pairs` to `base_url` as a query string.
///
/// Starts the query with `?` when `base_url` has none, continues it with
/// `&` when it has one that does not already end in `?` or `&`. An empty
/// `pairs` returns `base_url` untouched.
pub fn build<K, V>(base_url: &str, pairs: &[(K, V)], encoding: QueryEncoding) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    if pairs.is_empty() {
        return base_url.to_string();
    }

    let mut url = String::with_capacity(base_url.len() + pairs.len() * 16);
    url.push_str(base_url);

    if !base_url.contains('?') {
        url.push('?');
    } else if !base_url.ends_with('?') && !base_url.ends_with('&') {
        url.push('&');
    }

    for (i, (key, value)) in pairs.iter().enumerate() {
        if i > 0 {
            url.push('&');
        }
        match encoding {
            QueryEncoding::Raw => {
                url.push_str(key.as_ref());
                url.push('=');
                url.push_str(value.as_ref());
            }
            QueryEncoding::Encoded => {
                url.push_str(&urlencoding::encode(key.as_ref()));
                url.push('=');
                url.push_str(&urlencoding::encode(value.as_ref()));
            }
        }
    }
    url
}

/// Ordered pairs from any map-like iterable, in its iteration order.
pub fn pairs_from_map<I, K, V>(params: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (K, V)>,
    K: Display,
    V: Display,
{
    params
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Ordered pairs from a flat `key, value, key, value, ...` list.
///
/// Order and duplicates are kept. An odd-length list is rejected rather
/// than silently dropping the dangling key.
pub fn pairs_from_flat<S: AsRef<str>>(flat: &[S]) -> RequestResult<Vec<(String, String)>> {
    if flat.len() % 2 != 0 {
        let dangling = flat.last().map_or("", |s| s.as_ref());
        return Err(RequestError::MalformedInput(format!(
            "query parameters must be key/value pairs, `{dangling}` has no value"
        )));
    }
    Ok(flat
        .chunks_exact(2)
        .map(|kv| (kv[0].as_ref().to_string(), kv[1].as_ref().to_string()))
        .collect())
}

/// Normalize an assembled URL into its percent-encoded ASCII form.
///
/// Scheme and authority are kept as written. Path, query and fragment have
/// unsafe bytes and non-ASCII characters escaped as UTF-8 `%XX`. A `%`
/// that already starts a valid escape is kept; any other `%` becomes
/// `%25`.
pub fn encode(url: &str) -> RequestResult<String> {
    let scheme_end = scheme_len(url)
        .ok_or_else(|| RequestError::MalformedInput(format!("`{url}` has no scheme")))?;

    let after_scheme = scheme_end + 3;
    let authority_end = url[after_scheme..]
        .find(['/', '?', '#'])
        .map_or(url.len(), |i| after_scheme + i);

    let (head, rest) = url.split_at(authority_end);
    let (rest, fragment) = match rest.split_once('#') {
        Some((before, fragment)) => (before, Some(fragment)),
        None => (rest, None),
    };
    let (path, query) = match rest.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (rest, None),
    };

    let mut out = String::with_capacity(url.len() + 16);
    out.push_str(head);
    out.push_str(&encode_component(path, PATH));
    if let Some(query) = query {
        out.push('?');
        out.push_str(&encode_component(query, QUERY));
    }
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(&encode_component(fragment, FRAGMENT));
    }

    tracing::trace!(input = url, encoded = %out, "normalized url");
    Ok(out)
}

/// Length of a leading `scheme` followed by `://`, per RFC 3986
/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." )`.
fn scheme_len(url: &str) -> Option<usize> {
    let end = url.find(':')?;
    let scheme = &url[..end];
    let valid = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    (valid && url[end..].starts_with("://")).then_some(end)
}

fn encode_component(input: &str, set: &'static AsciiSet) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(idx) = rest.find('%') {
        out.extend(utf8_percent_encode(&rest[..idx], set));
        let tail = &rest[idx..];
        if is_escape(tail.as_bytes()) {
            out.push_str(&tail[..3]);
            rest = &tail[3..];
        } else {
            out.push_str("%25");
            rest = &tail[1..];
        }
    }
    out.extend(utf8_percent_encode(rest, set));
    out
}

/// `%` followed by two hex digits.
fn is_escape(bytes: &[u8]) -> bool {
    bytes.len() >= 3 && bytes[1].is_ascii_hexdigit() && bytes[2].is_ascii_hexdigit()
}
