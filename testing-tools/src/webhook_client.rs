use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::{json, Value};

/// Posts notifications to a webhook ingest server.
pub struct WebhookClient {
    client: Client,
    url: String,
}

/// What came back from the server.
#[derive(Debug, Clone)]
pub struct WebhookReply {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl WebhookReply {
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).context("Response body is not JSON")
    }
}

impl WebhookClient {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn post_json(&self, body: &Value) -> Result<WebhookReply> {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", self.url))?;
        reply(response).await
    }

    pub async fn post_raw(&self, body: &str) -> Result<WebhookReply> {
        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .with_context(|| format!("Failed to POST to {}", self.url))?;
        reply(response).await
    }

    pub async fn get(&self) -> Result<WebhookReply> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("Failed to GET {}", self.url))?;
        reply(response).await
    }
}

async fn reply(response: reqwest::Response) -> Result<WebhookReply> {
    let status = response.status().as_u16();
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let body = response.text().await.context("Failed to read response body")?;
    Ok(WebhookReply {
        status,
        content_type,
        body,
    })
}

/// The notification sent when a media stream becomes available.
pub fn rtms_started_payload(meeting_uuid: &str, stream_id: &str, server_urls: &str) -> Value {
    json!({
        "event": "meeting.rtms_started",
        "payload": {
            "meeting_uuid": meeting_uuid,
            "rtms_stream_id": stream_id,
            "server_urls": server_urls,
        }
    })
}

pub fn rtms_stopped_payload(meeting_uuid: &str, stream_id: &str) -> Value {
    json!({
        "event": "meeting.rtms_stopped",
        "payload": {
            "meeting_uuid": meeting_uuid,
            "rtms_stream_id": stream_id,
        }
    })
}
