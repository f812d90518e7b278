use std::{sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    routing::any,
    Json, Router,
};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

/// One request as the server saw it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    /// Percent-decoded request path.
    pub path: String,
    /// Query pairs in wire order, form-decoded.
    pub query: Vec<(String, String)>,
    pub content_type: Option<String>,
    pub body: String,
}

impl RecordedRequest {
    /// First query value for `name`.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub type Log = Arc<RwLock<Vec<RecordedRequest>>>;

pub fn new_log() -> Log {
    Arc::new(RwLock::new(Vec::new()))
}

pub fn app(log: Log) -> Router {
    Router::new()
        .route("/status/{code}", any(status))
        .route("/echo", any(echo))
        .route("/slow/{millis}", any(slow))
        .route("/__requests", axum::routing::get(list_requests))
        .fallback(accept)
        .with_state(log)
}

pub async fn run(listener: TcpListener, log: Log) -> Result<(), std::io::Error> {
    axum::serve(listener, app(log)).await
}

async fn record(
    log: &Log,
    method: Method,
    uri: &Uri,
    query: Vec<(String, String)>,
    headers: &HeaderMap,
    body: &Bytes,
) {
    let request = RecordedRequest {
        method: method.to_string(),
        path: percent_decode_str(uri.path()).decode_utf8_lossy().into_owned(),
        query,
        content_type: headers
            .get(axum::http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        body: String::from_utf8_lossy(body).into_owned(),
    };
    tracing::debug!(method = %request.method, path = %request.path, "recorded request");
    log.write().await.push(request);
}

/// Answers 200 with an empty body for any path not routed elsewhere.
async fn accept(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    record(&log, method, &uri, query, &headers, &body).await;
    StatusCode::OK
}

async fn status(
    State(log): State<Log>,
    Path(code): Path<u16>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    record(&log, method, &uri, query, &headers, &body).await;
    StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_REQUEST)
}

async fn echo(
    State(log): State<Log>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, HeaderMap, Bytes) {
    record(&log, method, &uri, query, &headers, &body).await;
    let mut out = HeaderMap::new();
    if let Some(ct) = headers.get(axum::http::header::CONTENT_TYPE) {
        out.insert(axum::http::header::CONTENT_TYPE, ct.clone());
    }
    (StatusCode::OK, out, body)
}

async fn slow(
    State(log): State<Log>,
    Path(millis): Path<u64>,
    method: Method,
    uri: Uri,
    Query(query): Query<Vec<(String, String)>>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    record(&log, method, &uri, query, &headers, &body).await;
    tokio::time::sleep(Duration::from_millis(millis)).await;
    StatusCode::OK
}

async fn list_requests(State(log): State<Log>) -> Json<Vec<RecordedRequest>> {
    Json(log.read().await.clone())
}
