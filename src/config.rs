//! Configuration types.
//!
//! Two layers live here: the listener settings read once at startup, and
//! the flat application `Settings` consulted per parameter when a form
//! definition does not provide a value.

use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::ConfigError;

/// Prefix for application-specific environment keys.
pub const ENV_PREFIX: &str = "FORMMAILER_";

/// Listener and filesystem settings for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root directory that request paths are mapped onto.
    pub forms_dir: PathBuf,
    /// When set, logs are also written to a daily rolling file here.
    pub log_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            forms_dir: PathBuf::from("./forms"),
            log_dir: None,
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = std::env::var("FORMMAILER_HOST").unwrap_or(defaults.host);

        let port = match std::env::var("FORMMAILER_PORT") {
            Ok(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "FORMMAILER_PORT".into(),
                message: format!("{raw:?} is not a valid port: {e}"),
            })?,
            Err(_) => defaults.port,
        };

        let forms_dir = std::env::var("FORMMAILER_FORMS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.forms_dir);

        let log_dir = std::env::var("FORMMAILER_LOG_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            host,
            port,
            forms_dir,
            log_dir,
        })
    }

    /// Socket address string for the listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Flat application configuration snapshot.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    /// Capture the current process environment.
    pub fn from_env() -> Self {
        Self::from_pairs(std::env::vars())
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up a parameter, first under the application prefix, then bare.
    /// Empty values are treated as absent.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        let key = env_key(name);
        self.non_empty(&format!("{ENV_PREFIX}{key}"))
            .or_else(|| self.non_empty(&key))
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }
}

/// Normalize a parameter name (`server.host`, `fromAddress`) into an
/// environment key (`SERVER_HOST`, `FROM_ADDRESS`).
pub fn env_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for ch in name.chars() {
        match ch {
            '.' | '-' | ' ' => {
                key.push('_');
                prev_lower = false;
            }
            c if c.is_ascii_uppercase() => {
                if prev_lower {
                    key.push('_');
                }
                key.push(c);
                prev_lower = false;
            }
            c => {
                key.push(c.to_ascii_uppercase());
                prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            }
        }
    }
    key
}
