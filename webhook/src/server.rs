//! HTTP ingest for stream lifecycle webhooks.
//!
//! The server runs on its own OS thread with a current-thread tokio runtime, so
//! it works the same whether or not the application uses async itself.

use crate::error::{Error, ErrorKind};
use crate::handler::{WebhookHandler, WebhookRequest, WebhookResponse};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use events::{panic_message, HandlerResult};
use log::*;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::oneshot;

const THREAD_NAME: &str = "rtms-webhook";
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub host: String,
    pub port: u16,
    /// Exact request path that is served; always starts with `/`.
    pub path: String,
}

impl WebhookConfig {
    pub fn new(host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        let path = path.into();
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        WebhookConfig {
            host: host.into(),
            port,
            path,
        }
    }
}

impl Default for WebhookConfig {
    fn default() -> Self {
        WebhookConfig::new(
            "0.0.0.0",
            service::config::DEFAULT_WEBHOOK_PORT,
            service::config::DEFAULT_WEBHOOK_PATH,
        )
    }
}

impl From<&service::Config> for WebhookConfig {
    fn from(config: &service::Config) -> Self {
        WebhookConfig::new(
            config.webhook_host.clone(),
            config.webhook_port,
            config.webhook_path.clone(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    /// A new listener was bound.
    Bound(SocketAddr),
    /// The server was already running; only the handler changed.
    HandlerReplaced(SocketAddr),
}

impl StartOutcome {
    pub fn local_addr(&self) -> SocketAddr {
        match self {
            StartOutcome::Bound(addr) | StartOutcome::HandlerReplaced(addr) => *addr,
        }
    }
}

type HandlerSlot = Arc<RwLock<Option<WebhookHandler>>>;

#[derive(Clone)]
struct AppState {
    handler: HandlerSlot,
    path: Arc<str>,
}

impl AppState {
    fn handler(&self) -> Option<WebhookHandler> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Serialize)]
struct Ack {
    status: &'static str,
}

struct Running {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    done: mpsc::Receiver<()>,
    thread: JoinHandle<()>,
}

/// Accepts webhook POSTs and hands their JSON payloads to the application.
///
/// At most one listener per server. Starting again while running swaps the
/// handler in place; requests already in flight finish with the old one.
pub struct WebhookIngestServer {
    config: WebhookConfig,
    handler: HandlerSlot,
    running: Mutex<Option<Running>>,
}

impl WebhookIngestServer {
    pub fn new(config: WebhookConfig) -> Self {
        WebhookIngestServer {
            config,
            handler: Arc::new(RwLock::new(None)),
            running: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &WebhookConfig {
        &self.config
    }

    fn running(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_handler(&self, handler: Option<WebhookHandler>) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = handler;
    }

    pub fn is_running(&self) -> bool {
        self.running().is_some()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running().as_ref().map(|running| running.addr)
    }

    /// Install `handler` and start listening if not already.
    pub fn start(&self, handler: WebhookHandler) -> Result<StartOutcome, Error> {
        let mut running = self.running();
        if let Some(current) = running.as_ref() {
            self.set_handler(Some(handler));
            info!("Webhook server already running at {}; handler replaced", current.addr);
            return Ok(StartOutcome::HandlerReplaced(current.addr));
        }

        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port))
            .map_err(|e| Error::wrap(ErrorKind::Bind, e))?;
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::wrap(ErrorKind::Bind, e))?;
        let addr = listener
            .local_addr()
            .map_err(|e| Error::wrap(ErrorKind::Bind, e))?;

        self.set_handler(Some(handler));
        let router = router(AppState {
            handler: Arc::clone(&self.handler),
            path: Arc::from(self.config.path.as_str()),
        });

        let (shutdown, shutdown_rx) = oneshot::channel();
        let (ready_tx, ready) = mpsc::sync_channel(1);
        let (done_tx, done) = mpsc::channel();
        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime.block_on(serve(listener, router, shutdown_rx, ready_tx)),
                    Err(e) => {
                        let _ = ready_tx.send(Err(Error::wrap(ErrorKind::Runtime, e)));
                    }
                }
                let _ = done_tx.send(());
            })
            .map_err(|e| Error::wrap(ErrorKind::Spawn, e))?;

        match ready.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = thread.join();
                self.set_handler(None);
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                self.set_handler(None);
                return Err(Error {
                    source: Some("webhook thread exited during startup".into()),
                    error_kind: ErrorKind::Spawn,
                });
            }
        }

        info!(
            "Listening for webhook events at http://{addr}{}",
            self.config.path
        );
        *running = Some(Running {
            addr,
            shutdown,
            done,
            thread,
        });
        Ok(StartOutcome::Bound(addr))
    }

    /// Stop listening. Returns `false` if the server thread did not exit within
    /// the shutdown timeout.
    pub fn stop(&self) -> bool {
        let Some(running) = self.running().take() else {
            return true;
        };
        self.set_handler(None);
        let _ = running.shutdown.send(());

        match running.done.recv_timeout(SHUTDOWN_TIMEOUT) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if running.thread.join().is_err() {
                    warn!("Webhook thread panicked during shutdown");
                }
                info!("Webhook server at {} stopped", running.addr);
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Webhook server did not stop within {SHUTDOWN_TIMEOUT:?}");
                false
            }
        }
    }
}

impl Drop for WebhookIngestServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: oneshot::Receiver<()>,
    ready: mpsc::SyncSender<Result<(), Error>>,
) {
    let listener = match tokio::net::TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            let _ = ready.send(Err(Error::wrap(ErrorKind::Bind, e)));
            return;
        }
    };
    let _ = ready.send(Ok(()));

    let result = axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = shutdown.await;
        })
        .await;
    if let Err(e) = result {
        error!("Webhook server failed: {e}");
    }
}

fn router(state: AppState) -> Router {
    Router::new().fallback(ingest).with_state(state)
}

/// Every request lands here; only POSTs to the configured path are served.
async fn ingest(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    debug!("{method} {uri}");
    if method != Method::POST || uri.path() != &*state.path {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    }

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Invalid JSON received: {e}");
            return (StatusCode::BAD_REQUEST, "Invalid JSON received").into_response();
        }
    };
    info!(
        "Received event: {}",
        payload.get("event").and_then(Value::as_str).unwrap_or("unknown")
    );

    let Some(handler) = state.handler() else {
        return (StatusCode::NOT_FOUND, "Not Found").into_response();
    };
    let request = WebhookRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        headers: headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect::<HashMap<_, _>>(),
        body: body.to_vec(),
    };

    // Handlers are synchronous application code.
    match tokio::task::spawn_blocking(move || invoke(&handler, &payload, &request)).await {
        Ok((Ok(()), response)) => finish(response),
        Ok((Err(e), response)) => {
            error!("Webhook handler failed: {e}");
            if response.is_sent() {
                finish(response)
            } else {
                (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {e}")).into_response()
            }
        }
        Err(e) => {
            let message = if e.is_panic() {
                panic_message(e.into_panic().as_ref())
            } else {
                e.to_string()
            };
            error!("Webhook handler panicked: {message}");
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Error: {message}")).into_response()
        }
    }
}

fn invoke(
    handler: &WebhookHandler,
    payload: &Value,
    request: &WebhookRequest,
) -> (HandlerResult, WebhookResponse) {
    let mut response = WebhookResponse::default();
    let result = match handler {
        WebhookHandler::Simple(handler) => handler(payload),
        WebhookHandler::FullControl(handler) => handler(payload, request, &mut response),
    };
    (result, response)
}

fn finish(response: WebhookResponse) -> Response {
    if !response.is_sent() {
        return (StatusCode::OK, Json(Ack { status: "ok" })).into_response();
    }

    let status = StatusCode::from_u16(response.status()).unwrap_or_else(|_| {
        warn!("Handler set invalid status {}", response.status());
        StatusCode::INTERNAL_SERVER_ERROR
    });
    let mut http = (status, response.body().to_string()).into_response();
    for (name, value) in response.headers() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                http.headers_mut().insert(name, value);
            }
            _ => warn!("Skipping invalid response header {name}"),
        }
    }
    http
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn local_server(path: &str) -> WebhookIngestServer {
        WebhookIngestServer::new(WebhookConfig::new("127.0.0.1", 0, path))
    }

    fn url(addr: SocketAddr, path: &str) -> String {
        format!("http://{addr}{path}")
    }

    #[test]
    fn test_config_path_gets_leading_slash() {
        assert_eq!(WebhookConfig::new("h", 1, "hooks").path, "/hooks");
        assert_eq!(WebhookConfig::default().port, 8080);
        assert_eq!(WebhookConfig::default().path, "/");
    }

    #[tokio::test]
    async fn test_simple_handler_gets_payload_and_default_ack() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let inner = Arc::clone(&seen);
        let server = local_server("/webhook");
        let addr = server
            .start(WebhookHandler::simple(move |payload| {
                inner.lock().unwrap().push(payload.clone());
                Ok(())
            }))
            .unwrap()
            .local_addr();

        let response = reqwest::Client::new()
            .post(url(addr, "/webhook"))
            .json(&json!({"event": "meeting.rtms_started", "payload": {}}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()["content-type"].to_str().unwrap(),
            "application/json"
        );
        assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
        assert_eq!(seen.lock().unwrap()[0]["event"], "meeting.rtms_started");
        assert!(server.stop());
    }

    #[tokio::test]
    async fn test_wrong_path_or_method_is_not_found() {
        let server = local_server("/webhook");
        let addr = server
            .start(WebhookHandler::simple(|_| Ok(())))
            .unwrap()
            .local_addr();
        let client = reqwest::Client::new();

        let wrong_path = client
            .post(url(addr, "/other"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(wrong_path.status(), 404);
        assert_eq!(wrong_path.text().await.unwrap(), "Not Found");

        let wrong_method = client.get(url(addr, "/webhook")).send().await.unwrap();
        assert_eq!(wrong_method.status(), 404);
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let server = local_server("/");
        let addr = server
            .start(WebhookHandler::simple(|_| panic!("must not be called")))
            .unwrap()
            .local_addr();

        let response = reqwest::Client::new()
            .post(url(addr, "/"))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        assert_eq!(response.text().await.unwrap(), "Invalid JSON received");
    }

    #[tokio::test]
    async fn test_handler_error_and_panic_are_server_errors() {
        let server = local_server("/");
        let addr = server
            .start(WebhookHandler::simple(|_| Err("handler exploded".into())))
            .unwrap()
            .local_addr();
        let client = reqwest::Client::new();

        let response = client.post(url(addr, "/")).json(&json!({})).send().await.unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.text().await.unwrap(), "Error: handler exploded");

        server
            .start(WebhookHandler::simple(|_| panic!("handler panicked")))
            .unwrap();
        let response = client.post(url(addr, "/")).json(&json!({})).send().await.unwrap();
        assert_eq!(response.status(), 500);
        assert!(response.text().await.unwrap().contains("handler panicked"));
    }

    #[tokio::test]
    async fn test_full_control_handler_writes_response() {
        let server = local_server("/");
        let addr = server
            .start(WebhookHandler::full_control(|payload, request, response| {
                let echo = json!({
                    "event": payload["event"],
                    "trace": request.header("x-trace"),
                });
                response.set_status(202).set_header("x-handled", "yes");
                response.send_json(&echo);
                Ok(())
            }))
            .unwrap()
            .local_addr();

        let response = reqwest::Client::new()
            .post(url(addr, "/"))
            .header("X-Trace", "abc")
            .json(&json!({"event": "endpoint.url_validation"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), 202);
        assert_eq!(response.headers()["x-handled"], "yes");
        let body: Value = response.json().await.unwrap();
        assert_eq!(body, json!({"event": "endpoint.url_validation", "trace": "abc"}));
    }

    #[tokio::test]
    async fn test_full_control_without_send_gets_default_ack() {
        let server = local_server("/");
        let addr = server
            .start(WebhookHandler::full_control(|_, _, _| Ok(())))
            .unwrap()
            .local_addr();

        let response = reqwest::Client::new()
            .post(url(addr, "/"))
            .json(&json!({}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.text().await.unwrap(), r#"{"status":"ok"}"#);
    }

    #[test]
    fn test_restart_replaces_handler_and_stop_is_idempotent() {
        let server = local_server("/");
        let first = server.start(WebhookHandler::simple(|_| Ok(()))).unwrap();
        assert!(matches!(first, StartOutcome::Bound(_)));
        assert!(server.is_running());

        let second = server.start(WebhookHandler::simple(|_| Ok(()))).unwrap();
        assert_eq!(second, StartOutcome::HandlerReplaced(first.local_addr()));

        assert!(server.stop());
        assert!(!server.is_running());
        assert_eq!(server.local_addr(), None);
        assert!(server.stop());
    }

    #[test]
    fn test_bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = taken.local_addr().unwrap().port();
        let server = WebhookIngestServer::new(WebhookConfig::new("127.0.0.1", port, "/"));

        let err = server.start(WebhookHandler::simple(|_| Ok(()))).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::Bind);
        assert!(!server.is_running());
    }
}
