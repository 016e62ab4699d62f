//! Application-facing handler types for incoming webhooks.

use events::HandlerResult;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

type SimpleFn = dyn Fn(&Value) -> HandlerResult + Send + Sync;
type FullControlFn = dyn Fn(&Value, &WebhookRequest, &mut WebhookResponse) -> HandlerResult + Send + Sync;

/// How the application wants to see webhook requests.
///
/// The variant is chosen when the handler is built, never guessed from the
/// callback's shape.
#[derive(Clone)]
pub enum WebhookHandler {
    /// Gets the parsed payload; the server answers `200 {"status":"ok"}` once it returns.
    Simple(Arc<SimpleFn>),
    /// Gets the payload, the request and a response it is expected to send.
    /// If it returns without sending, the default acknowledgement is used.
    FullControl(Arc<FullControlFn>),
}

impl WebhookHandler {
    pub fn simple<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> HandlerResult + Send + Sync + 'static,
    {
        WebhookHandler::Simple(Arc::new(handler))
    }

    pub fn full_control<F>(handler: F) -> Self
    where
        F: Fn(&Value, &WebhookRequest, &mut WebhookResponse) -> HandlerResult + Send + Sync + 'static,
    {
        WebhookHandler::FullControl(Arc::new(handler))
    }
}

impl fmt::Debug for WebhookHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebhookHandler::Simple(_) => write!(f, "WebhookHandler::Simple"),
            WebhookHandler::FullControl(_) => write!(f, "WebhookHandler::FullControl"),
        }
    }
}

/// The incoming request as seen by a full-control handler.
#[derive(Debug, Clone)]
pub struct WebhookRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-case. Values that are not valid UTF-8 are skipped.
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl WebhookRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// A response a full-control handler fills in.
#[derive(Debug, Clone)]
pub struct WebhookResponse {
    status: u16,
    headers: Vec<(String, String)>,
    body: String,
    sent: bool,
}

impl Default for WebhookResponse {
    fn default() -> Self {
        WebhookResponse {
            status: 200,
            headers: Vec::new(),
            body: String::new(),
            sent: false,
        }
    }
}

impl WebhookResponse {
    pub fn set_status(&mut self, status: u16) -> &mut Self {
        self.status = status;
        self
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Finish the response. Later calls replace the body.
    pub fn send(&mut self, body: impl Into<String>) {
        self.body = body.into();
        self.sent = true;
    }

    pub fn send_json(&mut self, body: &Value) {
        self.set_header("content-type", "application/json");
        self.send(body.to_string());
    }

    pub fn is_sent(&self) -> bool {
        self.sent
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_response_builder() {
        let mut response = WebhookResponse::default();
        assert!(!response.is_sent());

        response.set_status(202).set_header("x-trace", "abc");
        response.send_json(&json!({"accepted": true}));

        assert!(response.is_sent());
        assert_eq!(response.status(), 202);
        assert_eq!(response.body(), r#"{"accepted":true}"#);
        assert!(response
            .headers()
            .iter()
            .any(|(name, value)| name == "content-type" && value == "application/json"));
    }

    #[test]
    fn test_request_header_lookup_is_case_insensitive() {
        let request = WebhookRequest {
            method: "POST".into(),
            path: "/".into(),
            headers: HashMap::from([("x-zm-signature".to_string(), "v0=abc".to_string())]),
            body: Vec::new(),
        };
        assert_eq!(request.header("X-ZM-Signature"), Some("v0=abc"));
        assert_eq!(request.header("missing"), None);
    }
}
