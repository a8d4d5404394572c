use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoralogixError, Result};

pub const API_KEY_ENV: &str = "CORALOGIX_API_KEY";
pub const DOMAIN_ENV: &str = "CORALOGIX_DOMAIN";
pub const API_URL_ENV: &str = "CORALOGIX_API_URL";

const QUERY_PATH: &str = "/api/v1/dataprime/query";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Stdio,
    Http,
    Both,
}

impl Default for ServerMode {
    fn default() -> Self {
        ServerMode::Stdio
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub mode: ServerMode,
    pub http_addr: Option<String>,
    pub http_port: Option<u16>,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!(
            "{}:{}",
            self.http_addr.as_deref().unwrap_or("0.0.0.0"),
            self.http_port.unwrap_or(3000)
        )
    }
}

/// Process configuration. Only the transport lives here; credentials always come from the environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
}

impl Config {
    /// Loads a YAML or JSON file, chosen by extension (YAML otherwise).
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoralogixError::ConfigError(format!("cannot read {}: {e}", path.display()))
        })?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        if is_json {
            serde_json::from_str(&raw).map_err(|e| {
                CoralogixError::ConfigError(format!("invalid config {}: {e}", path.display()))
            })
        } else {
            serde_yaml::from_str(&raw).map_err(|e| {
                CoralogixError::ConfigError(format!("invalid config {}: {e}", path.display()))
            })
        }
    }
}

/// Credentials and endpoint for the Coralogix DataPrime API.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub api_key: String,
    pub domain: String,
    /// Replaces `https://ng-api-http.<domain>` when set.
    pub api_url: Option<String>,
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("api_key", &"<redacted>")
            .field("domain", &self.domain)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl ConnectionConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        match (non_empty(API_KEY_ENV), non_empty(DOMAIN_ENV)) {
            (Some(api_key), Some(domain)) => Ok(Self {
                api_key,
                domain,
                api_url: non_empty(API_URL_ENV),
            }),
            _ => Err(missing_connection_error()),
        }
    }

    pub fn query_url(&self) -> String {
        match &self.api_url {
            Some(base) => format!("{}{QUERY_PATH}", base.trim_end_matches('/')),
            None => format!("https://ng-api-http.{}{QUERY_PATH}", self.domain),
        }
    }
}

pub fn missing_connection_error() -> CoralogixError {
    CoralogixError::ConfigError(format!(
        "Missing required environment variables: {API_KEY_ENV} and {DOMAIN_ENV}"
    ))
}
