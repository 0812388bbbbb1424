//! Broker connection configuration.
//!
//! Resolution precedence is: environment variable, then the value passed in
//! [`RelayOptions`], then an error for the fields that have no sane default
//! (host and port). This lets deployments override a checked-in config file
//! without editing it.

use std::env;
use std::time::Duration;

use crate::error::RelayError;

/// Environment variable names honored by [`RelayOptions::resolve`].
const ENV_HOST: &str = "REDIS_HOST";
const ENV_PORT: &str = "REDIS_PORT";
const ENV_USERNAME: &str = "REDIS_USERNAME";
const ENV_PASSWORD: &str = "REDIS_PASSWORD";
const ENV_TLS: &str = "REDIS_TLS";
const ENV_EXPIRATION: &str = "REDIS_EXPIRATION_TIME";

/// Default TTL applied to keyspace and list writes when none is configured.
const DEFAULT_EXPIRATION_SECS: u64 = 3600;

/// Caller-supplied configuration, typically loaded from a config file.
///
/// Every field is optional; [`RelayOptions::resolve`] merges in environment
/// overrides and validates the result.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: Option<bool>,
    /// TTL in seconds applied to all keyspace/list writes
    pub expiration_secs: Option<u64>,
}

/// Fully resolved broker configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls: bool,
    /// TTL applied to all keyspace/list writes
    pub expiration: Duration,
}

impl RelayOptions {
    /// Resolve against the process environment.
    pub fn resolve(self) -> Result<RelayConfig, RelayError> {
        self.resolve_with(|name| env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup (injectable for tests).
    pub fn resolve_with(
        self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<RelayConfig, RelayError> {
        let host = lookup(ENV_HOST)
            .or(self.host)
            .ok_or_else(|| RelayError::config("broker host is not configured"))?;

        let port = match lookup(ENV_PORT) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| RelayError::config(format!("{ENV_PORT} is not a valid port: {raw}")))?,
            None => self
                .port
                .ok_or_else(|| RelayError::config("broker port is not configured"))?,
        };

        let tls = match lookup(ENV_TLS) {
            Some(raw) => parse_bool(&raw),
            None => self.tls.unwrap_or(false),
        };

        let expiration_secs = match lookup(ENV_EXPIRATION) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                RelayError::config(format!("{ENV_EXPIRATION} is not a valid duration: {raw}"))
            })?,
            None => self.expiration_secs.unwrap_or(DEFAULT_EXPIRATION_SECS),
        };

        Ok(RelayConfig {
            host,
            port,
            username: lookup(ENV_USERNAME).or(self.username),
            password: lookup(ENV_PASSWORD).or(self.password),
            tls,
            expiration: Duration::from_secs(expiration_secs),
        })
    }
}

/// Environment booleans are accepted as "1" or "true" (case-insensitive).
fn parse_bool(raw: &str) -> bool {
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

impl RelayConfig {
    /// Connection URL for the broker client, with credentials inlined.
    pub fn url(&self) -> String {
        let scheme = if self.tls { "rediss" } else { "redis" };
        let auth = match (&self.username, &self.password) {
            (Some(user), Some(pass)) => format!("{user}:{pass}@"),
            (None, Some(pass)) => format!(":{pass}@"),
            (Some(user), None) => format!("{user}@"),
            (None, None) => String::new(),
        };
        format!("{scheme}://{auth}{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn passed_values_resolve_without_env() {
        let config = RelayOptions {
            host: Some("broker.local".to_string()),
            port: Some(6379),
            expiration_secs: Some(120),
            ..Default::default()
        }
        .resolve_with(no_env)
        .unwrap();

        assert_eq!(config.host, "broker.local");
        assert_eq!(config.port, 6379);
        assert!(!config.tls);
        assert_eq!(config.expiration, Duration::from_secs(120));
    }

    #[test]
    fn environment_takes_precedence_over_passed_config() {
        let config = RelayOptions {
            host: Some("from-file".to_string()),
            port: Some(1111),
            tls: Some(false),
            ..Default::default()
        }
        .resolve_with(|name| match name {
            ENV_HOST => Some("from-env".to_string()),
            ENV_PORT => Some("2222".to_string()),
            ENV_TLS => Some("true".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.host, "from-env");
        assert_eq!(config.port, 2222);
        assert!(config.tls);
    }

    #[test]
    fn missing_host_or_port_is_a_startup_error() {
        let err = RelayOptions::default().resolve_with(no_env).unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));

        let err = RelayOptions {
            host: Some("h".to_string()),
            ..Default::default()
        }
        .resolve_with(no_env)
        .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn tls_env_accepts_one_and_true() {
        for raw in ["1", "true", "TRUE"] {
            let config = RelayOptions {
                host: Some("h".to_string()),
                port: Some(1),
                ..Default::default()
            }
            .resolve_with(|name| (name == ENV_TLS).then(|| raw.to_string()))
            .unwrap();
            assert!(config.tls, "expected {raw:?} to enable tls");
        }
    }

    #[test]
    fn unparseable_port_env_is_a_config_error() {
        let err = RelayOptions {
            host: Some("h".to_string()),
            port: Some(6379),
            ..Default::default()
        }
        .resolve_with(|name| (name == ENV_PORT).then(|| "not-a-port".to_string()))
        .unwrap_err();
        assert!(matches!(err, RelayError::Config(_)));
    }

    #[test]
    fn url_inlines_credentials_and_scheme() {
        let config = RelayOptions {
            host: Some("h".to_string()),
            port: Some(7000),
            username: Some("u".to_string()),
            password: Some("p".to_string()),
            tls: Some(true),
            ..Default::default()
        }
        .resolve_with(no_env)
        .unwrap();

        assert_eq!(config.url(), "rediss://u:p@h:7000");
    }
}
