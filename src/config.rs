//! Relay configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). Unset or unparsable optional values
//! fall back to defaults; only `LISTEN_ADDR` is strict.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::RegistryPolicy;
use crate::domain::pairing_registry::MAX_TTL_SECS;

/// Default bound of each socket's outbound notice queue.
pub const DEFAULT_OUTBOUND_QUEUE_CAPACITY: usize = 256;

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable lines.
    Text,
    /// One JSON object per event.
    Json,
}

/// Top-level relay configuration.
///
/// Loaded once at startup via [`RelayConfig::from_env`].
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Public base URL of the HTTP API, used to build `httpUrl`.
    pub public_http_url: String,

    /// Public WebSocket URL handed to clients as `wsUrl`.
    pub public_ws_url: String,

    /// Route the WebSocket gateway is mounted on.
    pub ws_path: String,

    /// URI scheme of the QR payload.
    pub qr_scheme: String,

    /// Session lifetime and pruning policy.
    pub policy: RegistryPolicy,

    /// Seconds between sweeper passes.
    pub sweep_interval_secs: u64,

    /// Per-request timeout applied to HTTP routes.
    pub request_timeout_secs: u64,

    /// Notices a socket may have queued before further ones are refused.
    pub outbound_queue_capacity: usize,

    /// Tracing output format.
    pub log_format: LogFormat,
}

impl RelayConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let ws_path = normalize_path(
            &std::env::var("WS_PATH").unwrap_or_else(|_| "/ws".to_string()),
        );
        let port = listen_addr.port();
        let public_http_url = std::env::var("PUBLIC_HTTP_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| format!("http://localhost:{port}"));
        let public_ws_url = std::env::var("PUBLIC_WS_URL")
            .unwrap_or_else(|_| format!("ws://localhost:{port}{ws_path}"));
        let qr_scheme = std::env::var("QR_SCHEME").unwrap_or_else(|_| "agiworkforce".to_string());

        let defaults = RegistryPolicy::default();
        let policy = RegistryPolicy {
            min_ttl_secs: parse_env("MIN_TTL_SECS", defaults.min_ttl_secs),
            max_ttl_secs: parse_env("MAX_TTL_SECS", defaults.max_ttl_secs).min(MAX_TTL_SECS),
            default_ttl_secs: parse_env("DEFAULT_TTL_SECS", defaults.default_ttl_secs),
            abandoned_grace_secs: parse_env("ABANDONED_GRACE_SECS", defaults.abandoned_grace_secs),
            expired_retention_secs: parse_env(
                "EXPIRED_RETENTION_SECS",
                defaults.expired_retention_secs,
            ),
        };

        let sweep_interval_secs = parse_env("SWEEP_INTERVAL_SECS", 30_u64).max(1);
        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", 10_u64).max(1);
        let outbound_queue_capacity =
            parse_env("OUTBOUND_QUEUE_CAPACITY", DEFAULT_OUTBOUND_QUEUE_CAPACITY).max(1);
        let log_format = if parse_env_bool("LOG_JSON", false)
            || std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"))
        {
            LogFormat::Json
        } else {
            LogFormat::Text
        };

        Ok(Self {
            listen_addr,
            public_http_url,
            public_ws_url,
            ws_path,
            qr_scheme,
            policy,
            sweep_interval_secs,
            request_timeout_secs,
            outbound_queue_capacity,
            log_format,
        })
    }

    /// Configuration for a server bound to `listen_addr` with every other
    /// value at its default. Public URLs point at `listen_addr` itself.
    #[must_use]
    pub fn local(listen_addr: SocketAddr) -> Self {
        let ws_path = "/ws".to_string();
        Self {
            listen_addr,
            public_http_url: format!("http://{listen_addr}"),
            public_ws_url: format!("ws://{listen_addr}{ws_path}"),
            ws_path,
            qr_scheme: "agiworkforce".to_string(),
            policy: RegistryPolicy::default(),
            sweep_interval_secs: 30,
            request_timeout_secs: 10,
            outbound_queue_capacity: DEFAULT_OUTBOUND_QUEUE_CAPACITY,
            log_format: LogFormat::Text,
        }
    }

    /// Sweeper period.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// HTTP request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Ensures a route path starts with exactly one `/`.
fn normalize_path(raw: &str) -> String {
    format!("/{}", raw.trim().trim_start_matches('/'))
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().as_deref() {
        Some(v) if v.eq_ignore_ascii_case("true") || v == "1" => true,
        Some(v) if v.eq_ignore_ascii_case("false") || v == "0" => false,
        _ => default,
    }
}
