use std::env;
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub max_db_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bind_address: String,
    pub workers: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has an invalid value: {:?}", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    /// Reads configuration from the process environment (after `dotenv`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let storage = match lookup("STORAGE_BACKEND").as_deref() {
            None | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid { key: "STORAGE_BACKEND", value: other.to_string() })
            }
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|secret| !secret.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        Ok(Config {
            storage,
            database_url,
            max_db_connections: parse_in(&lookup, "DATABASE_MAX_CONNECTIONS", 10, 1..=1000)?,
            jwt_secret,
            token_ttl_hours: parse_in(&lookup, "TOKEN_TTL_HOURS", 168, TOKEN_TTL_RANGE)?,
            bind_address: lookup("BIND_ADDRESS").unwrap_or_else(|| "127.0.0.1:8080".to_string()),
            workers: parse_in(&lookup, "WORKERS", num_cpus::get(), 1..=1024)?,
        })
    }
}

/// One hour up to ten years.
const TOKEN_TTL_RANGE: RangeInclusive<i64> = 1..=87_600;

fn parse_in<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    range: RangeInclusive<T>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + PartialOrd,
{
    let value = match lookup(key) {
        None => return Ok(default),
        Some(value) => value,
    };
    match value.parse() {
        Ok(parsed) if range.contains(&parsed) => Ok(parsed),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/octofit"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.bind_address, "127.0.0.1:8080");
        assert_eq!(config.token_ttl_hours, 168);
        assert_eq!(config.max_db_connections, 10);
        assert!(config.workers >= 1);
    }

    #[test]
    fn postgres_needs_a_database_url() {
        let err = config_from(&[("JWT_SECRET", "s")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn memory_backend_runs_without_database() {
        let config = config_from(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "s")]).unwrap();
        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn empty_secret_is_rejected() {
        let err = config_from(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn bad_numbers_are_reported() {
        let err = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "s"),
            ("TOKEN_TTL_HOURS", "soon"),
        ])
        .unwrap_err();
        assert_eq!(err, ConfigError::Invalid { key: "TOKEN_TTL_HOURS", value: "soon".to_string() });
    }

    #[test]
    fn out_of_range_numbers_are_reported() {
        for (key, value) in [
            ("TOKEN_TTL_HOURS", "0"),
            ("TOKEN_TTL_HOURS", "-5"),
            ("TOKEN_TTL_HOURS", "9223372036854775807"),
            ("WORKERS", "0"),
            ("DATABASE_MAX_CONNECTIONS", "0"),
        ] {
            let err = config_from(&[("STORAGE_BACKEND", "memory"), ("JWT_SECRET", "s"), (key, value)])
                .unwrap_err();
            assert_eq!(err, ConfigError::Invalid { key, value: value.to_string() });
        }

        let config = config_from(&[
            ("STORAGE_BACKEND", "memory"),
            ("JWT_SECRET", "s"),
            ("TOKEN_TTL_HOURS", "87600"),
            ("WORKERS", "1"),
        ])
        .unwrap();
        assert_eq!(config.token_ttl_hours, 87_600);
        assert_eq!(config.workers, 1);
    }
}
