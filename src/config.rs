//! Process configuration.
//!
//! Command-line flags and environment variables are parsed once by clap into
//! [`CliArgs`], then validated into an immutable [`RelayConfig`] that is shared
//! with the server and the relay by `Arc`.

use std::{
    fmt,
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_UPSTREAM_URL: &str = "wss://api.assemblyai.com/v2/realtime/universal";
pub const DEFAULT_STATIC_DIR: &str = "templates";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing ASSEMBLYAI_API_KEY in environment")]
    MissingApiKey,

    #[error("ASSEMBLYAI_API_KEY is not a valid header value")]
    InvalidApiKey,

    #[error("Invalid upstream URL '{url}': {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },

    #[error("Unsupported upstream URL scheme '{0}', expected ws or wss")]
    UnsupportedUpstreamScheme(String),

    #[error("Invalid listen host '{0}'")]
    InvalidHost(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "realtime-relay",
    version,
    about = "Relay browser WebSocket sessions to the AssemblyAI realtime transcription API"
)]
pub struct CliArgs {
    /// API key sent as the Authorization header of every upstream handshake
    #[arg(long, env = "ASSEMBLYAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    #[arg(long, default_value = DEFAULT_HOST)]
    pub host: String,

    #[arg(long, env = "ASSEMBLYAI_WS_URL", default_value = DEFAULT_UPSTREAM_URL)]
    pub upstream_url: String,

    /// Directory served at the root path
    #[arg(long, default_value = DEFAULT_STATIC_DIR)]
    pub static_dir: PathBuf,

    #[arg(long)]
    pub disable_static: bool,

    /// Upstream handshake timeout in seconds. Unset means wait indefinitely.
    #[arg(long)]
    pub connect_timeout_secs: Option<u64>,

    #[arg(long, default_value = "info", value_parser = ["trace", "debug", "info", "warn", "error"])]
    pub log_level: String,

    #[arg(long)]
    pub log_json: bool,
}

/// Validated, immutable process configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayConfig {
    pub api_key: String,
    pub host: IpAddr,
    pub port: u16,
    pub upstream_url: Url,
    pub static_dir: Option<PathBuf>,
    pub connect_timeout: Option<Duration>,
    pub log_level: String,
    pub log_json: bool,
}

impl RelayConfig {
    /// Configuration with defaults for everything but the credential.
    pub fn new(api_key: impl Into<String>) -> ConfigResult<Self> {
        let api_key = validate_api_key(Some(api_key.into()))?;
        Ok(Self {
            api_key,
            host: parse_host(DEFAULT_HOST)?,
            port: DEFAULT_PORT,
            upstream_url: parse_upstream_url(DEFAULT_UPSTREAM_URL)?,
            static_dir: Some(PathBuf::from(DEFAULT_STATIC_DIR)),
            connect_timeout: None,
            log_level: "info".to_string(),
            log_json: false,
        })
    }

    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        Ok(Self {
            api_key: validate_api_key(args.api_key)?,
            host: parse_host(&args.host)?,
            port: args.port,
            upstream_url: parse_upstream_url(&args.upstream_url)?,
            static_dir: (!args.disable_static).then_some(args.static_dir),
            connect_timeout: args.connect_timeout_secs.map(Duration::from_secs),
            log_level: args.log_level,
            log_json: args.log_json,
        })
    }

    pub fn with_upstream_url(mut self, url: &str) -> ConfigResult<Self> {
        self.upstream_url = parse_upstream_url(url)?;
        Ok(self)
    }

    pub fn with_static_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.static_dir = dir;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl fmt::Debug for RelayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelayConfig")
            .field("api_key", &"<redacted>")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("upstream_url", &self.upstream_url.as_str())
            .field("static_dir", &self.static_dir)
            .field("connect_timeout", &self.connect_timeout)
            .field("log_level", &self.log_level)
            .field("log_json", &self.log_json)
            .finish()
    }
}

fn validate_api_key(key: Option<String>) -> ConfigResult<String> {
    let key = key
        .filter(|k| !k.trim().is_empty())
        .ok_or(ConfigError::MissingApiKey)?;
    if http::HeaderValue::from_str(&key).is_err() {
        return Err(ConfigError::InvalidApiKey);
    }
    Ok(key)
}

fn parse_host(host: &str) -> ConfigResult<IpAddr> {
    if host == "localhost" {
        return Ok(IpAddr::from([127, 0, 0, 1]));
    }
    host.parse()
        .map_err(|_| ConfigError::InvalidHost(host.to_string()))
}

fn parse_upstream_url(raw: &str) -> ConfigResult<Url> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUpstreamUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(ConfigError::UnsupportedUpstreamScheme(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        let mut argv = vec!["realtime-relay"];
        argv.extend_from_slice(args);
        CliArgs::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_defaults_match_original_behavior() {
        let config = RelayConfig::new("abc123").unwrap();

        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.port, 5001);
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:5001");
        assert_eq!(
            config.upstream_url.as_str(),
            "wss://api.assemblyai.com/v2/realtime/universal"
        );
        assert_eq!(config.static_dir, Some(PathBuf::from("templates")));
        assert_eq!(config.connect_timeout, None);
    }

    #[test]
    fn test_missing_api_key_is_rejected() {
        let mut args = parse(&[]);
        args.api_key = None;
        let err = RelayConfig::from_args(args).unwrap_err();
        assert_eq!(err, ConfigError::MissingApiKey);
        assert_eq!(err.to_string(), "Missing ASSEMBLYAI_API_KEY in environment");
    }

    #[test]
    fn test_blank_api_key_is_rejected() {
        let mut args = parse(&[]);
        args.api_key = Some("   ".to_string());
        assert_eq!(
            RelayConfig::from_args(args).unwrap_err(),
            ConfigError::MissingApiKey
        );
    }

    #[test]
    fn test_api_key_must_be_header_safe() {
        assert_eq!(
            RelayConfig::new("line\nbreak").unwrap_err(),
            ConfigError::InvalidApiKey
        );
    }

    #[test]
    fn test_upstream_scheme_must_be_websocket() {
        let config = RelayConfig::new("key").unwrap();
        assert_eq!(
            config
                .clone()
                .with_upstream_url("https://api.assemblyai.com")
                .unwrap_err(),
            ConfigError::UnsupportedUpstreamScheme("https".to_string())
        );
        assert!(matches!(
            config.with_upstream_url("not a url").unwrap_err(),
            ConfigError::InvalidUpstreamUrl { .. }
        ));
    }

    #[test]
    fn test_optional_flags() {
        let config = RelayConfig::from_args(parse(&[
            "--api-key",
            "k",
            "--port",
            "8080",
            "--host",
            "localhost",
            "--disable-static",
            "--connect-timeout-secs",
            "15",
            "--log-json",
        ]))
        .unwrap();

        assert_eq!(config.bind_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.static_dir, None);
        assert_eq!(config.connect_timeout, Some(Duration::from_secs(15)));
        assert!(config.log_json);
    }

    #[test]
    fn test_invalid_host_is_rejected() {
        let result = RelayConfig::from_args(parse(&["--api-key", "k", "--host", "not-an-ip"]));
        assert_eq!(
            result.unwrap_err(),
            ConfigError::InvalidHost("not-an-ip".to_string())
        );
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let config = RelayConfig::new("super-secret").unwrap();
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
