// src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_PORT: u16 = 3030;
const DEFAULT_SCHEMA: &str = "mcd_public";
const DEFAULT_POLLS_FILE: &str = "polls.json";
const DEFAULT_TX_EXPLORER_URL: &str = "https://ethtx.info";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value: {value}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Warehouse schema holding the `yays`, `votes`, `voting_power` and
    /// `votes_scheduler` tables.
    pub schema: String,
    pub polls_file: PathBuf,
    pub tx_explorer_url: String,
    pub max_connections: u32,
    /// How long a request waits for a warehouse connection before the
    /// warehouse is treated as down.
    pub acquire_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let port = parse_or("PORT", lookup("PORT"), DEFAULT_PORT)?;
        let max_connections = parse_or(
            "DB_MAX_CONNECTIONS",
            lookup("DB_MAX_CONNECTIONS"),
            DEFAULT_MAX_CONNECTIONS,
        )?;
        if max_connections == 0 {
            return Err(ConfigError::Invalid {
                key: "DB_MAX_CONNECTIONS",
                value: "0".into(),
            });
        }

        let acquire_timeout = parse_or(
            "DB_ACQUIRE_TIMEOUT_SECS",
            lookup("DB_ACQUIRE_TIMEOUT_SECS"),
            DEFAULT_ACQUIRE_TIMEOUT_SECS,
        )?;

        let schema = lookup("MCDGOV_DB").unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        // Interpolated into queries, so only plain identifiers are accepted.
        if !is_identifier(&schema) {
            return Err(ConfigError::Invalid {
                key: "MCDGOV_DB",
                value: schema,
            });
        }

        Ok(Self {
            database_url,
            port,
            schema,
            polls_file: lookup("POLLS_FILE")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_POLLS_FILE)),
            tx_explorer_url: lookup("TX_EXPLORER_URL")
                .unwrap_or_else(|| DEFAULT_TX_EXPLORER_URL.to_string()),
            max_connections,
            acquire_timeout: Duration::from_secs(acquire_timeout),
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    key: &'static str,
    value: Option<String>,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
