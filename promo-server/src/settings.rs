//! Server settings read from the environment.
//!
//! | Variable | Meaning |
//! |----------|---------|
//! | `BIND_ADDR` | Listen address (default `0.0.0.0:3000`) |
//! | `COOKIE_KEY` | Base64 cookie encryption key, at least 64 bytes; ephemeral when unset |
//! | `SECURE_COOKIES` | `true`/`1` to mark cookies `Secure` (default `true`) |
//! | `LOG_FORMAT` | `pretty`, `json` or `compact` |
//! | `RUST_LOG` | `EnvFilter` directives |

use std::net::SocketAddr;

use axum_extra::extract::cookie::Key;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use core_runtime::error::{Error, Result};
use core_runtime::logging::{LogFormat, LoggingConfig};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Shortest key `PrivateCookieJar` accepts.
const MIN_COOKIE_KEY_BYTES: usize = 64;

#[derive(Clone)]
pub struct ServerSettings {
    pub bind_addr: SocketAddr,
    pub cookie_key: Key,
    /// No `COOKIE_KEY` was configured; sessions will not survive a restart
    pub ephemeral_cookie_key: bool,
    pub secure_cookies: bool,
    pub logging: LoggingConfig,
}

impl ServerSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind_addr = lookup("BIND_ADDR")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr: SocketAddr = bind_addr
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("BIND_ADDR '{bind_addr}': {e}")))?;

        let (cookie_key, ephemeral_cookie_key) =
            match lookup("COOKIE_KEY").filter(|v| !v.trim().is_empty()) {
                Some(encoded) => (parse_cookie_key(&encoded)?, false),
                None => (Key::generate(), true),
            };

        let secure_cookies = match lookup("SECURE_COOKIES") {
            Some(v) => parse_flag(&v).ok_or_else(|| {
                Error::Config(format!("SECURE_COOKIES '{v}' is not a boolean"))
            })?,
            None => true,
        };

        let mut logging = LoggingConfig::default();
        if let Some(format) = lookup("LOG_FORMAT").filter(|v| !v.trim().is_empty()) {
            logging = logging.with_format(format.parse::<LogFormat>()?);
        }
        if let Some(filter) = lookup("RUST_LOG").filter(|v| !v.trim().is_empty()) {
            logging = logging.with_filter(filter);
        }

        Ok(Self {
            bind_addr,
            cookie_key,
            ephemeral_cookie_key,
            secure_cookies,
            logging,
        })
    }
}

fn parse_cookie_key(encoded: &str) -> Result<Key> {
    let bytes = STANDARD
        .decode(encoded.trim())
        .map_err(|e| Error::Config(format!("COOKIE_KEY is not valid base64: {e}")))?;
    if bytes.len() < MIN_COOKIE_KEY_BYTES {
        return Err(Error::Config(format!(
            "COOKIE_KEY is {} bytes, at least {} are required. \
             Remove the variable to use an ephemeral key.",
            bytes.len(),
            MIN_COOKIE_KEY_BYTES
        )));
    }
    Ok(Key::from(&bytes))
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
