//! A single configurable request that resolves into one cached response.
//!
//! # Design
//! A `Request` starts out configured: method, URL, headers, media type,
//! staged body and timeouts can all still change. The first `execute`
//! builds the `HttpRequest` descriptor, hands it to the transport, and
//! stores the resulting `Response`. Later `execute` calls return that same
//! snapshot, so one `Request` makes at most one network call.
//!
//! A failed dispatch is remembered too. Calling `execute` again reports
//! `PreviouslyFailed` instead of dialing a second time or handing back
//! anything that looks like a response.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};
use ureq::http::{HeaderName, HeaderValue};

use crate::config::Timeouts;
use crate::error::{RequestError, RequestResult, TransportError};
use crate::http::{find_header, HttpMethod, HttpRequest, RequestBody};
use crate::media::MediaType;
use crate::response::Response;
use crate::transport::Transport;

/// The descriptor that went out together with what came back.
#[derive(Debug)]
struct Exchange {
    request: HttpRequest,
    response: Response,
}

/// The descriptor that went out and why the call failed.
#[derive(Debug)]
struct Failure {
    request: HttpRequest,
    cause: String,
}

#[derive(Debug)]
enum State {
    Configured,
    Sent(Box<Exchange>),
    Failed(Box<Failure>),
}

/// Body as staged by the caller. Text stays text until dispatch so it is
/// encoded with the media type the header will announce.
#[derive(Debug)]
enum Staged {
    Text(String),
    Body(RequestBody),
}

/// Builder-style request; resolve it with [`Request::execute`].
pub struct Request {
    transport: Arc<dyn Transport>,
    method: HttpMethod,
    url: String,
    headers: Vec<(String, String)>,
    media_type: MediaType,
    body: Option<Staged>,
    timeouts: Timeouts,
    state: State,
}

impl Request {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        method: HttpMethod,
        url: impl Into<String>,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            transport,
            method,
            url: url.into(),
            headers: Vec::new(),
            media_type: MediaType::default(),
            body: None,
            timeouts,
            state: State::Configured,
        }
    }

    /// Set the media type used for the `Content-Type` header and for
    /// encoding text bodies, whenever they were staged.
    pub fn content_type(mut self, value: &str) -> Self {
        self.media_type = MediaType::parse(value);
        self
    }

    /// Add a request header. Names and values are checked at dispatch.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn connect_timeout(mut self, millis: u64) -> Self {
        self.timeouts.connect = Duration::from_millis(millis);
        self
    }

    pub fn read_timeout(mut self, millis: u64) -> Self {
        self.timeouts.read = Duration::from_millis(millis);
        self
    }

    pub fn write_timeout(mut self, millis: u64) -> Self {
        self.timeouts.write = Duration::from_millis(millis);
        self
    }

    /// Stage `content` as the body. It is encoded at dispatch with the
    /// charset of the final media type (UTF-8 when none is named).
    /// Replaces any staged body.
    ///
    /// Fails with `Encoding` when the current media type names a charset
    /// that cannot be resolved.
    pub fn send(self, content: &str) -> RequestResult<Self> {
        self.media_type.encoding()?;
        Ok(self.stage(Staged::Text(content.to_string())))
    }

    /// Stage raw bytes as the body, sent as given.
    pub fn send_bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.stage(Staged::Body(RequestBody::Bytes(bytes.into())))
    }

    /// Stage a file; it is streamed when the request is dispatched.
    pub fn send_file(self, path: impl Into<PathBuf>) -> Self {
        self.stage(Staged::Body(RequestBody::File(path.into())))
    }

    /// Serialize `value` to JSON and stage it as the body.
    pub fn send_json<T: Serialize>(self, value: &T) -> RequestResult<Self> {
        let json =
            serde_json::to_string(value).map_err(|e| RequestError::Serialization(e.to_string()))?;
        self.send(&json)
    }

    fn stage(mut self, body: Staged) -> Self {
        if self.descriptor().is_some() {
            warn!(method = %self.method, url = %self.url, "body staged after dispatch is ignored");
        }
        self.body = Some(body);
        self
    }

    /// Dispatch the request on first call; return the cached response on
    /// every later call.
    ///
    /// Errors raised while building the descriptor (bad header, charset
    /// the media type cannot resolve) leave the request unsent. Once the
    /// transport has been called, the outcome is final.
    pub fn execute(&mut self) -> RequestResult<&Response> {
        match self.state {
            State::Sent(ref exchange) => Ok(&exchange.response),
            State::Failed(ref failure) => {
                Err(RequestError::PreviouslyFailed(failure.cause.clone()))
            }
            State::Configured => {
                self.dispatch()?;
                self.execute()
            }
        }
    }

    fn dispatch(&mut self) -> RequestResult<()> {
        let request = self.descriptor_for_dispatch()?;
        debug!(
            method = %request.method,
            url = %request.url,
            has_body = request.body.is_some(),
            "dispatching request"
        );
        match self.transport.execute(&request) {
            Ok(raw) => {
                let response = Response::from_raw(raw);
                debug!(
                    status = response.code(),
                    body_len = response.body().len(),
                    "response cached"
                );
                self.state = State::Sent(Box::new(Exchange { request, response }));
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "request failed");
                let cause = err.to_string();
                self.state = State::Failed(Box::new(Failure { request, cause }));
                Err(err.into())
            }
        }
    }

    /// Build the descriptor that goes to the transport.
    ///
    /// A POST with nothing staged still sends an empty body with the
    /// configured media type. PUT and DELETE without a staged body send
    /// none.
    fn descriptor_for_dispatch(&self) -> RequestResult<HttpRequest> {
        let body = match (&self.body, self.method) {
            (Some(Staged::Text(text)), _) => {
                Some(RequestBody::Bytes(self.media_type.encode_text(text)?))
            }
            (Some(Staged::Body(body)), _) => Some(body.clone()),
            (None, HttpMethod::Post) => Some(RequestBody::Bytes(self.media_type.encode_text("")?)),
            (None, _) => None,
        };

        let mut headers = self.headers.clone();
        if body.is_some() && find_header(&headers, "content-type").is_none() {
            headers.push(("content-type".to_string(), self.media_type.as_str().to_string()));
        }
        check_headers(&headers)?;

        Ok(HttpRequest {
            method: self.method,
            url: self.url.clone(),
            headers,
            body,
            timeouts: self.timeouts,
        })
    }

    /// The cached response, if the request has been dispatched.
    pub fn response(&self) -> Option<&Response> {
        match &self.state {
            State::Sent(exchange) => Some(&exchange.response),
            _ => None,
        }
    }

    pub fn is_sent(&self) -> bool {
        matches!(self.state, State::Sent(_))
    }

    /// Whether the outbound body is absent or zero-length.
    ///
    /// Looks at the dispatched descriptor once the transport has been
    /// called, successfully or not, otherwise at the staged body.
    pub fn is_body_empty(&self) -> RequestResult<bool> {
        let body = match (self.descriptor(), &self.body) {
            (Some(request), _) => request.body.as_ref(),
            (None, Some(Staged::Text(text))) => return Ok(text.is_empty()),
            (None, Some(Staged::Body(body))) => Some(body),
            (None, None) => None,
        };
        match body {
            None => Ok(true),
            Some(body) => {
                let len = body
                    .content_length()
                    .map_err(|e| TransportError::new(self.method, self.url.as_str(), e))?;
                Ok(len == 0)
            }
        }
    }

    /// The descriptor handed to the transport, whether or not the call
    /// succeeded.
    pub fn descriptor(&self) -> Option<&HttpRequest> {
        match &self.state {
            State::Sent(exchange) => Some(&exchange.request),
            State::Failed(failure) => Some(&failure.request),
            State::Configured => None,
        }
    }

    /// URL of the dispatched descriptor.
    pub fn url(&self) -> Option<&str> {
        self.descriptor().map(|r| r.url.as_str())
    }

    /// Method of the dispatched descriptor.
    pub fn method(&self) -> Option<HttpMethod> {
        self.descriptor().map(|r| r.method)
    }

    pub fn target_url(&self) -> &str {
        &self.url
    }

    pub fn target_method(&self) -> HttpMethod {
        self.method
    }

    pub fn timeouts(&self) -> Timeouts {
        self.timeouts
    }

    pub fn media_type(&self) -> &MediaType {
        &self.media_type
    }
}

fn check_headers(headers: &[(String, String)]) -> RequestResult<()> {
    for (name, value) in headers {
        HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| RequestError::MalformedInput(format!("invalid header name `{name}`")))?;
        HeaderValue::from_str(value).map_err(|_| {
            RequestError::MalformedInput(format!("invalid value for header `{name}`"))
        })?;
    }
    Ok(())
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("media_type", &self.media_type.as_str())
            .field("timeouts", &self.timeouts)
            .field("state", &self.state)
            .finish()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Records every descriptor and answers with a fixed status.
    struct Recorder {
        calls: AtomicUsize,
        seen: Mutex<Vec<HttpRequest>>,
        status: u16,
        fail: bool,
    }

    impl Recorder {
        fn answering(status: u16) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                status,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                status: 0,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last(&self) -> HttpRequest {
            self.seen.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl Transport for Recorder {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.clone());
            if self.fail {
                return Err(TransportError::new(
                    request.method,
                    request.url.as_str(),
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
                ));
            }
            Ok(HttpResponse {
                status: self.status,
                message: "OK".to_string(),
                headers: Vec::new(),
                body: b"done".to_vec(),
            })
        }
    }

    fn request(recorder: &Arc<Recorder>, method: HttpMethod) -> Request {
        Request::new(recorder.clone(), method, "http://localhost/items", Timeouts::default())
    }

    #[test]
    fn construction_does_not_dispatch() {
        let rec = Recorder::answering(200);
        let req = request(&rec, HttpMethod::Get).send("x").unwrap();
        assert_eq!(rec.calls(), 0);
        assert!(!req.is_sent());
        assert!(req.response().is_none());
        assert!(req.url().is_none());
        assert!(req.method().is_none());
    }

    #[test]
    fn execute_twice_dispatches_once() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Get);

        assert_eq!(req.execute().unwrap().code(), 200);
        assert_eq!(req.execute().unwrap().code(), 200);
        assert!(req.execute().unwrap().ok());
        assert_eq!(rec.calls(), 1);
        assert_eq!(req.response().unwrap().body(), "done");
    }

    #[test]
    fn post_without_body_sends_empty_body_with_media_type() {
        let rec = Recorder::answering(201);
        let mut req = request(&rec, HttpMethod::Post);
        assert!(req.execute().unwrap().created());

        let sent = rec.last();
        assert_eq!(sent.body, Some(RequestBody::Bytes(Vec::new())));
        assert_eq!(sent.header("content-type"), Some("application/json; charset=utf-8"));
        assert!(req.is_body_empty().unwrap());
    }

    #[test]
    fn put_and_delete_without_body_send_none() {
        for method in [HttpMethod::Put, HttpMethod::Delete, HttpMethod::Get] {
            let rec = Recorder::answering(200);
            let mut req = request(&rec, method);
            req.execute().unwrap();

            let sent = rec.last();
            assert_eq!(sent.method, method);
            assert!(sent.body.is_none(), "{method}");
            assert!(sent.header("content-type").is_none(), "{method}");
            assert!(req.is_body_empty().unwrap());
        }
    }

    #[test]
    fn send_overwrites_staged_body() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post)
            .send("first")
            .unwrap()
            .send("hello")
            .unwrap();
        assert!(!req.is_body_empty().unwrap());
        req.execute().unwrap();

        assert_eq!(rec.last().body, Some(RequestBody::Bytes(b"hello".to_vec())));
    }

    #[test]
    fn send_uses_configured_charset() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Put)
            .content_type("text/plain; charset=iso-8859-1")
            .send("\u{00DF}")
            .unwrap();
        req.execute().unwrap();

        let sent = rec.last();
        assert_eq!(sent.body, Some(RequestBody::Bytes(vec![0xDF])));
        assert_eq!(sent.header("content-type"), Some("text/plain; charset=iso-8859-1"));
    }

    #[test]
    fn send_with_unsupported_charset_fails_at_send() {
        let rec = Recorder::answering(200);
        let err = request(&rec, HttpMethod::Post)
            .content_type("text/plain; charset=klingon")
            .send("hello")
            .unwrap_err();
        assert!(matches!(err, RequestError::Encoding(_)));
        assert_eq!(rec.calls(), 0);
    }

    #[test]
    fn explicit_content_type_header_wins() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post)
            .header("Content-Type", "text/csv")
            .send("a,b")
            .unwrap();
        req.execute().unwrap();

        let sent = rec.last();
        let content_types: Vec<_> = sent
            .headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .collect();
        assert_eq!(content_types.len(), 1);
        assert_eq!(sent.header("content-type"), Some("text/csv"));
    }

    #[test]
    fn send_after_dispatch_does_not_change_response() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post).send("hello").unwrap();
        req.execute().unwrap();

        let mut req = req.send("ignored").unwrap();
        assert_eq!(req.execute().unwrap().body(), "done");
        assert_eq!(rec.calls(), 1);
        assert_eq!(rec.last().body, Some(RequestBody::Bytes(b"hello".to_vec())));
        assert!(!req.is_body_empty().unwrap());
    }

    #[test]
    fn transport_failure_is_reported_once_then_remembered() {
        let rec = Recorder::failing();
        let mut req = request(&rec, HttpMethod::Get);

        let first = req.execute().unwrap_err();
        assert!(matches!(first, RequestError::Transport(_)));
        let second = req.execute().unwrap_err();
        match second {
            RequestError::PreviouslyFailed(cause) => assert!(cause.contains("refused"), "{cause}"),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(rec.calls(), 1);
        assert!(req.response().is_none());
        assert!(!req.is_sent());
        assert_eq!(req.method(), Some(HttpMethod::Get));
    }

    #[test]
    fn failed_request_still_describes_what_went_out() {
        let rec = Recorder::failing();
        let mut req = request(&rec, HttpMethod::Post).send("hello").unwrap();
        assert!(!req.is_body_empty().unwrap());

        req.execute().unwrap_err();
        assert!(!req.is_body_empty().unwrap());
        assert_eq!(req.url(), Some("http://localhost/items"));
        assert_eq!(
            req.descriptor().unwrap().body,
            Some(RequestBody::Bytes(b"hello".to_vec()))
        );
    }

    #[test]
    fn content_type_after_send_encodes_with_final_charset() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post)
            .send("\u{00DF}")
            .unwrap()
            .content_type("text/plain; charset=iso-8859-1");
        req.execute().unwrap();

        let sent = rec.last();
        assert_eq!(sent.body, Some(RequestBody::Bytes(vec![0xDF])));
        assert_eq!(sent.header("content-type"), Some("text/plain; charset=iso-8859-1"));
    }

    #[test]
    fn unknown_charset_set_after_send_fails_before_dispatch() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post)
            .send("hello")
            .unwrap()
            .content_type("text/plain; charset=klingon");

        assert!(matches!(req.execute(), Err(RequestError::Encoding(_))));
        assert_eq!(rec.calls(), 0);
        assert!(req.descriptor().is_none());
    }

    #[test]
    fn send_bytes_are_sent_verbatim() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Put)
            .content_type("text/plain; charset=iso-8859-1")
            .send_bytes(vec![0xC3, 0x9F]);
        assert!(!req.is_body_empty().unwrap());
        req.execute().unwrap();

        let sent = rec.last();
        assert_eq!(sent.body, Some(RequestBody::Bytes(vec![0xC3, 0x9F])));
        assert_eq!(sent.header("content-type"), Some("text/plain; charset=iso-8859-1"));

        let req = request(&rec, HttpMethod::Put).send_bytes(Vec::new());
        assert!(req.is_body_empty().unwrap());
    }

    #[test]
    fn invalid_headers_are_malformed_input_and_never_dispatched() {
        let rec = Recorder::answering(200);
        let cases = [("bad header", "v"), ("X-Ok", "line\nbreak"), ("", "v")];
        for (name, value) in cases {
            let mut req = request(&rec, HttpMethod::Get).header(name, value);
            let err = req.execute().unwrap_err();
            assert!(matches!(err, RequestError::MalformedInput(_)), "{name:?}: {err:?}");
            assert!(req.descriptor().is_none());
        }

        let mut req = request(&rec, HttpMethod::Post).content_type("text/plain\r\nX-Injected: 1");
        assert!(matches!(req.execute(), Err(RequestError::MalformedInput(_))));
        assert_eq!(rec.calls(), 0);
    }

    #[test]
    fn descriptor_reflects_what_was_sent() {
        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Delete)
            .connect_timeout(100)
            .read_timeout(200)
            .write_timeout(300)
            .header("X-Trace", "abc");
        req.execute().unwrap();

        assert_eq!(req.url(), Some("http://localhost/items"));
        assert_eq!(req.method(), Some(HttpMethod::Delete));
        let sent = req.descriptor().unwrap();
        assert_eq!(sent.timeouts, Timeouts::from_millis(100, 200, 300));
        assert_eq!(sent.header("x-trace"), Some("abc"));
    }

    #[test]
    fn staged_file_length_decides_emptiness() {
        let rec = Recorder::answering(200);
        let empty = tempfile::NamedTempFile::new().unwrap();
        let req = request(&rec, HttpMethod::Post).send_file(empty.path());
        assert!(req.is_body_empty().unwrap());

        let mut full = tempfile::NamedTempFile::new().unwrap();
        full.write_all(b"hello").unwrap();
        let req = request(&rec, HttpMethod::Post).send_file(full.path());
        assert!(!req.is_body_empty().unwrap());

        let req = request(&rec, HttpMethod::Post).send_file("/definitely/not/here.txt");
        assert!(matches!(req.is_body_empty(), Err(RequestError::Transport(_))));
    }

    #[test]
    fn send_json_serializes_value() {
        #[derive(Serialize)]
        struct Item<'a> {
            name: &'a str,
            number: u32,
        }

        let rec = Recorder::answering(200);
        let mut req = request(&rec, HttpMethod::Post)
            .send_json(&Item { name: "user", number: 100 })
            .unwrap();
        req.execute().unwrap();

        assert_eq!(
            rec.last().body,
            Some(RequestBody::Bytes(br#"{"name":"user","number":100}"#.to_vec()))
        );
    }

    #[test]
    fn display_shows_method_and_url() {
        let rec = Recorder::answering(200);
        let req = request(&rec, HttpMethod::Put);
        assert_eq!(req.to_string(), "PUT http://localhost/items");
        assert!(format!("{req:?}").contains("Configured"));
    }
}
