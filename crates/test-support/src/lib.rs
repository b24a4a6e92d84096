//! Shared helpers for integration tests: a local echo API and port selection.

use anyhow::Context as _;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use axum::routing::{any, get};
use serde_json::{Map, Value, json};
use std::net::TcpListener;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Pick an unused TCP port on localhost.
///
/// Note: this does not reserve the port; it's still possible for another process to bind it
/// before you do.
///
/// # Errors
///
/// Returns an error if binding an ephemeral localhost port fails or if the bound socket's
/// local address cannot be read.
pub fn pick_unused_port() -> anyhow::Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0").context("bind ephemeral port")?;
    Ok(listener.local_addr()?.port())
}

/// A local HTTP server that reflects every request back as JSON.
///
/// Routes:
/// - `/status/{code}`: replies with `code` and `{"status": code}`
/// - `/slow/{ms}`: sleeps `ms` milliseconds, then echoes
/// - `/bytes/{n}`: `n` bytes of `application/octet-stream` (values `0xff` first, so not UTF-8)
/// - `/text`: `text/plain` body `hello`
/// - anything else: `{"method", "path", "rawQuery", "query", "headers", "body"}` where `query`
///   maps each key to its list of raw (still percent-encoded) values and `body` is the parsed
///   JSON request body (or `null`)
///
/// The server shuts down when dropped.
pub struct EchoServer {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl EchoServer {
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> anyhow::Result<Self> {
        let app = Router::new()
            .route("/status/{code}", any(status_handler))
            .route("/slow/{ms}", any(slow_handler))
            .route("/bytes/{n}", get(bytes_handler))
            .route("/text", get(|| async { ([(header::CONTENT_TYPE, "text/plain")], "hello") }))
            .fallback(echo_handler);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind echo server")?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let server = axum::serve(listener, app).with_graceful_shutdown(async move {
            let _ = shutdown_rx.await;
        });
        let handle = tokio::spawn(async move {
            let _ = server.await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// `http://127.0.0.1:<port>`, no trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stop accepting connections and wait for the server task.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for EchoServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

async fn echo_handler(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    axum::Json(echo(&method, &uri, &headers, &body))
}

async fn slow_handler(
    Path(ms): Path<u64>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    tokio::time::sleep(Duration::from_millis(ms)).await;
    axum::Json(echo(&method, &uri, &headers, &body))
}

async fn status_handler(Path(code): Path<u16>) -> impl IntoResponse {
    let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, axum::Json(json!({ "status": code })))
}

async fn bytes_handler(Path(n): Path<usize>) -> impl IntoResponse {
    let body: Vec<u8> = (0..n).map(|i| 0xff_u8.wrapping_sub((i % 256) as u8)).collect();
    ([(header::CONTENT_TYPE, "application/octet-stream")], body)
}

fn echo(method: &Method, uri: &Uri, headers: &HeaderMap, body: &[u8]) -> Value {
    let mut query: Map<String, Value> = Map::new();
    for pair in uri.query().unwrap_or("").split('&').filter(|p| !p.is_empty()) {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if let Value::Array(values) = query
            .entry(k.to_string())
            .or_insert_with(|| Value::Array(Vec::new()))
        {
            values.push(Value::String(v.to_string()));
        }
    }

    let headers: Map<String, Value> = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), json!(v.to_str().ok()?))))
        .collect();

    let body = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
    };

    json!({
        "method": method.as_str(),
        "path": uri.path(),
        "rawQuery": uri.query().unwrap_or(""),
        "query": query,
        "headers": headers,
        "body": body,
    })
}
