//! Process configuration read from the environment.

use core::str::FromStr;

use thiserror::Error;

use stockroom_observability::LogFormat;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3001;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_API_PREFIX: &str = "/api";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} must be {expected}, got '{value}'")]
    Invalid {
        var: &'static str,
        expected: &'static str,
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// Normalized mount point for the API routes: empty for the root,
    /// otherwise a leading slash and no trailing slash.
    pub api_prefix: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            database_url: None,
            database_max_connections: DEFAULT_MAX_CONNECTIONS,
            api_prefix: DEFAULT_API_PREFIX.to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build a config from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |var: &str| lookup(var).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let port = match get("PORT") {
            Some(raw) => parse_number::<u16>("PORT", "a port number", raw)?,
            None => defaults.port,
        };

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => {
                let n = parse_number::<u32>("DATABASE_MAX_CONNECTIONS", "a positive integer", raw.clone())?;
                if n == 0 {
                    return Err(invalid("DATABASE_MAX_CONNECTIONS", "a positive integer", raw));
                }
                n
            }
            None => defaults.database_max_connections,
        };

        let log_format = match get("LOG_FORMAT") {
            Some(raw) => LogFormat::from_str(&raw).map_err(|_| invalid("LOG_FORMAT", "json or pretty", raw))?,
            None => defaults.log_format,
        };

        Ok(Self {
            host: get("HOST").unwrap_or(defaults.host),
            port,
            database_url: get("DATABASE_URL"),
            database_max_connections,
            api_prefix: get("API_PREFIX")
                .map(|p| normalize_prefix(&p))
                .unwrap_or(defaults.api_prefix),
            log_format,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

fn parse_number<N: FromStr>(var: &'static str, expected: &'static str, raw: String) -> Result<N, ConfigError> {
    raw.parse::<N>().map_err(|_| invalid(var, expected, raw))
}

fn invalid(var: &'static str, expected: &'static str, value: String) -> ConfigError {
    ConfigError::Invalid { var, expected, value }
}
