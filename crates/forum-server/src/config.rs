//! Server configuration, read from the environment at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use forum_api::sessions::{DEFAULT_SESSION_TTL, DEFAULT_SWEEP_INTERVAL};

const MAX_SESSION_TTL_HOURS: u64 = 365 * 24;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub db_path: PathBuf,
    pub session_ttl: Duration,
    pub sweep_interval: Duration,
    pub request_timeout: Duration,
    pub cookie_secure: bool,
}

impl Config {
    /// Loads from the process environment, plus `.env` outside of tests.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let host = lookup("FORUM_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port: u16 = parse(&lookup, "FORUM_PORT", 3000)?;
        let bind_address = format!("{}:{}", host, port)
            .parse::<SocketAddr>()
            .map_err(|e: std::net::AddrParseError| {
                ConfigError::InvalidValue("FORUM_HOST", e.to_string())
            })?;

        let db_path = lookup("FORUM_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("forum.db"));

        let ttl_hours: u64 = parse(
            &lookup,
            "FORUM_SESSION_TTL_HOURS",
            DEFAULT_SESSION_TTL.as_secs() / 3600,
        )?;
        if ttl_hours == 0 || ttl_hours > MAX_SESSION_TTL_HOURS {
            return Err(ConfigError::InvalidValue(
                "FORUM_SESSION_TTL_HOURS",
                format!("must be between 1 and {}", MAX_SESSION_TTL_HOURS),
            ));
        }

        let sweep_secs: u64 = parse(
            &lookup,
            "FORUM_SWEEP_INTERVAL_SECS",
            DEFAULT_SWEEP_INTERVAL.as_secs(),
        )?;
        if sweep_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FORUM_SWEEP_INTERVAL_SECS",
                "must be greater than zero".into(),
            ));
        }

        let timeout_secs: u64 = parse(
            &lookup,
            "FORUM_REQUEST_TIMEOUT_SECS",
            DEFAULT_REQUEST_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "FORUM_REQUEST_TIMEOUT_SECS",
                "must be greater than zero".into(),
            ));
        }

        let cookie_secure = parse(&lookup, "FORUM_COOKIE_SECURE", true)?;

        Ok(Self {
            bind_address,
            db_path,
            session_ttl: Duration::from_secs(ttl_hours * 60 * 60),
            sweep_interval: Duration::from_secs(sweep_secs),
            request_timeout: Duration::from_secs(timeout_secs),
            cookie_secure,
        })
    }
}

fn parse<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(key, format!("'{}': {}", raw, e))),
        None => Ok(default),
    }
}
