use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use meeting_auth::{CredentialDefaults, SignatureFormat};
use secrecy::SecretString;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Program name handed to the parser; configuration never comes from argv.
const BIN_NAME: &str = "rtms";

pub const DEFAULT_WEBHOOK_PORT: u16 = 8080;
pub const DEFAULT_WEBHOOK_PATH: &str = "/";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

/// Output layout of the log sink.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// `component | timestamp | LEVEL | message` lines for a terminal.
    Progressive,
    /// One JSON object per line.
    Json,
}

/// Who drives the engine's event loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PollMode {
    /// The application calls `pump()` from the thread that created the client.
    External,
    /// A dedicated thread owns the engine and polls it on an interval.
    Background,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ConfigParseError(String);

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ConfigParseError {}

impl FromStr for LogFormat {
    type Err = ConfigParseError;
    fn from_str(format: &str) -> Result<LogFormat, Self::Err> {
        match format.to_lowercase().as_str() {
            "progressive" => Ok(LogFormat::Progressive),
            "json" => Ok(LogFormat::Json),
            other => Err(ConfigParseError(format!("unknown log format: {other}"))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LogFormat::Progressive => write!(f, "progressive"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for PollMode {
    type Err = ConfigParseError;
    fn from_str(mode: &str) -> Result<PollMode, Self::Err> {
        match mode.to_lowercase().as_str() {
            "external" => Ok(PollMode::External),
            "background" => Ok(PollMode::Background),
            other => Err(ConfigParseError(format!("unknown poll mode: {other}"))),
        }
    }
}

impl fmt::Display for PollMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PollMode::External => write!(f, "external"),
            PollMode::Background => write!(f, "background"),
        }
    }
}

#[derive(Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// The client identifier used to sign join requests.
    #[arg(long, env = "ZM_RTMS_CLIENT")]
    client_id: Option<String>,

    /// The client secret used to sign join requests.
    #[arg(long, env = "ZM_RTMS_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Path to a CA certificate bundle handed to the engine at initialization.
    #[arg(long, env = "ZM_RTMS_CA")]
    ca_path: Option<PathBuf>,

    /// The host interface the webhook server listens on
    #[arg(long, env = "ZM_RTMS_HOST", default_value = "0.0.0.0")]
    pub webhook_host: String,

    /// The TCP port the webhook server listens on
    #[arg(long, env = "ZM_RTMS_PORT", default_value_t = DEFAULT_WEBHOOK_PORT)]
    pub webhook_port: u16,

    /// The exact request path webhook notifications are posted to
    #[arg(long, env = "ZM_RTMS_PATH", default_value = DEFAULT_WEBHOOK_PATH)]
    pub webhook_path: String,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        long,
        env = "ZM_RTMS_LOG_LEVEL",
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new([
            "OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE",
            "off", "error", "warn", "info", "debug", "trace",
        ])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Log line layout: `progressive` or `json`
    #[arg(long, env = "ZM_RTMS_LOG_FORMAT", default_value_t = LogFormat::Progressive)]
    pub log_format: LogFormat,

    /// Turn all log output on or off
    #[arg(
        long,
        env = "ZM_RTMS_LOG_ENABLED",
        default_value_t = true,
        action = clap::ArgAction::Set,
        value_parser = clap::builder::BoolishValueParser::new(),
    )]
    pub log_enabled: bool,

    /// Milliseconds between engine polls when the request does not set its own interval
    #[arg(long, env = "ZM_RTMS_POLL_INTERVAL_MS", default_value_t = DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,

    /// Who drives the engine: `external` (application pumps) or `background` (owned thread)
    #[arg(long, env = "ZM_RTMS_POLL_MODE", default_value_t = PollMode::External)]
    pub poll_mode: PollMode,

    /// Field separator of the signed message: `comma` or `concatenated`
    #[arg(long, env = "ZM_RTMS_SIGNATURE_FORMAT", default_value_t = SignatureFormat::Comma)]
    pub signature_format: SignatureFormat,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("client_id", &self.client_id.is_some())
            .field("client_secret", &self.client_secret.as_ref().map(|_| "[REDACTED]"))
            .field("ca_path", &self.ca_path)
            .field("webhook_host", &self.webhook_host)
            .field("webhook_port", &self.webhook_port)
            .field("webhook_path", &self.webhook_path)
            .field("log_level_filter", &self.log_level_filter)
            .field("log_format", &self.log_format)
            .field("log_enabled", &self.log_enabled)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("poll_mode", &self.poll_mode)
            .field("signature_format", &self.signature_format)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Loads a `.env` file if present, then reads every setting from the environment.
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        Config::parse_from([BIN_NAME])
    }

    /// Like [`Config::new`] but reports invalid environment values instead of exiting.
    pub fn try_new() -> Result<Self, clap::Error> {
        dotenv().ok();
        Config::try_parse_from([BIN_NAME])
    }

    /// Parse from explicit `--flag value` pairs, ignoring nothing from the environment
    /// that the pairs override.
    pub fn from_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let args = std::iter::once(std::ffi::OsString::from(BIN_NAME))
            .chain(args.into_iter().map(Into::into));
        Config::try_parse_from(args)
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    pub fn with_ca_path(mut self, ca_path: impl Into<PathBuf>) -> Self {
        self.ca_path = Some(ca_path.into());
        self
    }

    pub fn with_webhook(mut self, host: impl Into<String>, port: u16, path: impl Into<String>) -> Self {
        self.webhook_host = host.into();
        self.webhook_port = port;
        self.webhook_path = path.into();
        self
    }

    pub fn with_poll_mode(mut self, poll_mode: PollMode) -> Self {
        self.poll_mode = poll_mode;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_signature_format(mut self, signature_format: SignatureFormat) -> Self {
        self.signature_format = signature_format;
        self
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    /// Returns the client secret wrapped so it cannot be printed by accident.
    pub fn client_secret(&self) -> Option<SecretString> {
        self.client_secret.clone().map(SecretString::new)
    }

    pub fn ca_path(&self) -> Option<&Path> {
        self.ca_path.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Credential fallbacks used when a join request carries no credential of its own.
    pub fn credential_defaults(&self) -> CredentialDefaults {
        CredentialDefaults::new(self.client_id.clone(), self.client_secret())
    }
}
