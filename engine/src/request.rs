use crate::error::{Error, ErrorKind, JoinField};
use crate::native::NativeJoin;
use log::*;
use meeting_auth::{sign, Credential, CredentialDefaults, SignatureFormat};
use secrecy::SecretString;
use serde_json::Value;
use std::time::Duration;

/// How long the engine may take to establish a join.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JoinTimeout {
    /// Let the engine use its own default.
    #[default]
    EngineDefault,
    Millis(u32),
}

impl JoinTimeout {
    /// Negative values select the engine default, as the native API does.
    pub fn from_millis(millis: i64) -> Self {
        match u32::try_from(millis) {
            Ok(millis) => JoinTimeout::Millis(millis),
            Err(_) if millis < 0 => JoinTimeout::EngineDefault,
            Err(_) => JoinTimeout::Millis(u32::MAX),
        }
    }

    pub fn to_native(&self) -> i32 {
        match self {
            JoinTimeout::EngineDefault => -1,
            JoinTimeout::Millis(millis) => i32::try_from(*millis).unwrap_or(i32::MAX),
        }
    }
}

/// Everything needed to join one media stream.
///
/// Built once and never mutated afterwards; the builder methods consume `self`.
/// Credentials left unset fall back to the client's configured defaults when
/// the request is prepared.
#[derive(Debug, Clone)]
pub struct JoinRequest {
    meeting_uuid: String,
    stream_id: String,
    server_urls: Vec<String>,
    signature: Option<String>,
    client_id: Option<String>,
    client_secret: Option<SecretString>,
    timeout: JoinTimeout,
    poll_interval: Option<Duration>,
}

impl JoinRequest {
    pub fn new<I, S>(meeting_uuid: impl Into<String>, stream_id: impl Into<String>, server_urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        JoinRequest {
            meeting_uuid: meeting_uuid.into(),
            stream_id: stream_id.into(),
            server_urls: server_urls.into_iter().map(Into::into).collect(),
            signature: None,
            client_id: None,
            client_secret: None,
            timeout: JoinTimeout::default(),
            poll_interval: None,
        }
    }

    /// Build a request from a stream-started webhook body.
    ///
    /// The stream fields are read from the nested `payload` object when present,
    /// otherwise from the top level. `server_urls` may be a comma-separated
    /// string or an array of strings.
    pub fn from_webhook_payload(body: &Value) -> Result<Self, Error> {
        let payload = body.get("payload").filter(|p| p.is_object()).unwrap_or(body);

        let meeting_uuid = string_field(payload, "meeting_uuid")
            .ok_or_else(|| Error::new(ErrorKind::InvalidJoinParams(JoinField::MeetingUuid)))?;
        let stream_id = string_field(payload, "rtms_stream_id")
            .ok_or_else(|| Error::new(ErrorKind::InvalidJoinParams(JoinField::StreamId)))?;

        let server_urls: Vec<String> = match payload.get("server_urls") {
            Some(Value::String(urls)) => urls
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect(),
            Some(Value::Array(urls)) => urls
                .iter()
                .filter_map(Value::as_str)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        };
        if server_urls.is_empty() {
            return Err(Error::new(ErrorKind::InvalidJoinParams(JoinField::ServerUrls)));
        }

        let mut request = JoinRequest::new(meeting_uuid, stream_id, server_urls);
        if let Some(signature) = string_field(payload, "signature") {
            request = request.with_signature(signature);
        }
        if let Some(millis) = payload.get("timeout").and_then(Value::as_i64) {
            request = request.with_timeout(JoinTimeout::from_millis(millis));
        }
        Ok(request)
    }

    /// Use a pre-computed signature instead of signing with the credential.
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    pub fn with_credential(mut self, client_id: impl Into<String>, client_secret: SecretString) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret);
        self
    }

    pub fn with_timeout(mut self, timeout: JoinTimeout) -> Self {
        self.timeout = timeout;
        self
    }

    /// Polling cadence for background mode. Ignored when the application pumps.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    pub fn meeting_uuid(&self) -> &str {
        &self.meeting_uuid
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn server_urls(&self) -> &[String] {
        &self.server_urls
    }

    pub fn timeout(&self) -> JoinTimeout {
        self.timeout
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        self.poll_interval
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turns a [`JoinRequest`] into a [`NativeJoin`]: validates the stream fields
/// and signs with the request's credential or the configured defaults.
///
/// Signing is pure, so this runs on whichever thread submits the join. That
/// way configuration errors reach the caller even when the join itself is
/// deferred to the owner thread.
#[derive(Debug, Clone, Default)]
pub struct JoinSigner {
    defaults: CredentialDefaults,
    format: SignatureFormat,
}

impl JoinSigner {
    pub fn new(defaults: CredentialDefaults, format: SignatureFormat) -> Self {
        JoinSigner { defaults, format }
    }

    pub fn format(&self) -> SignatureFormat {
        self.format
    }

    pub fn prepare(&self, request: &JoinRequest) -> Result<NativeJoin, Error> {
        if request.meeting_uuid.is_empty() {
            return Err(Error::new(ErrorKind::InvalidJoinParams(JoinField::MeetingUuid)));
        }
        if request.stream_id.is_empty() {
            return Err(Error::new(ErrorKind::InvalidJoinParams(JoinField::StreamId)));
        }
        if request.server_urls.iter().all(|url| url.is_empty()) {
            return Err(Error::new(ErrorKind::InvalidJoinParams(JoinField::ServerUrls)));
        }

        let signature = match request.signature.as_deref().filter(|s| !s.is_empty()) {
            Some(signature) => signature.to_string(),
            None => {
                let credential = Credential::resolve(
                    request.client_id.as_deref(),
                    request.client_secret.as_ref(),
                    &self.defaults,
                )?;
                sign(&credential, &request.meeting_uuid, &request.stream_id, self.format)?
            }
        };

        let server_urls = request
            .server_urls
            .iter()
            .filter(|url| !url.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",");
        trace!("Prepared join for {} via {}", request.meeting_uuid, server_urls);

        Ok(NativeJoin {
            meeting_uuid: request.meeting_uuid.clone(),
            stream_id: request.stream_id.clone(),
            signature,
            server_urls,
            timeout_ms: request.timeout.to_native(),
        })
    }
}
