//! Client configuration, read from `ADMINPANEL_*` environment variables.

use std::path::PathBuf;

use chrono::Duration;
use thiserror::Error;

use crate::cache::PROFILE_TTL_MINUTES;
use crate::store::StoreOptions;

pub const ENV_API_URL: &str = "ADMINPANEL_API_URL";
pub const ENV_STORAGE_PATH: &str = "ADMINPANEL_STORAGE_PATH";
pub const ENV_CACHE_TTL_SECS: &str = "ADMINPANEL_CACHE_TTL_SECS";
pub const ENV_FETCH_RETRIES: &str = "ADMINPANEL_FETCH_RETRIES";

const DEFAULT_API_URL: &str = "http://localhost:4000/api";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },
    #[error("{key} must be greater than zero")]
    Zero { key: &'static str },
    #[error("could not resolve a data directory for the storage file; set ADMINPANEL_STORAGE_PATH")]
    NoDataDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub storage_path: PathBuf,
    pub cache_ttl: Duration,
    pub fetch_retries: u32,
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset or blank values fall
    /// back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let storage_path = match get(ENV_STORAGE_PATH) {
            Some(path) => PathBuf::from(path),
            None => default_storage_path()?,
        };

        let cache_ttl = match get(ENV_CACHE_TTL_SECS) {
            Some(raw) => {
                let secs = parse_number(ENV_CACHE_TTL_SECS, &raw)?;
                if secs == 0 {
                    return Err(ConfigError::Zero {
                        key: ENV_CACHE_TTL_SECS,
                    });
                }
                Duration::seconds(i64::from(secs))
            }
            None => Duration::minutes(PROFILE_TTL_MINUTES),
        };

        let fetch_retries = match get(ENV_FETCH_RETRIES) {
            Some(raw) => parse_number(ENV_FETCH_RETRIES, &raw)?,
            None => 1,
        };

        Ok(Self {
            api_url,
            storage_path,
            cache_ttl,
            fetch_retries,
        })
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            fetch_retries: self.fetch_retries,
            cache_ttl: self.cache_ttl,
        }
    }
}

fn parse_number(key: &'static str, raw: &str) -> Result<u32, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
        key,
        value: raw.to_string(),
    })
}

/// `{data_dir}/adminpanel/storage.json`.
#[cfg(not(target_arch = "wasm32"))]
fn default_storage_path() -> Result<PathBuf, ConfigError> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .ok_or(ConfigError::NoDataDir)?;

    Ok(base.join("adminpanel").join("storage.json"))
}

#[cfg(target_arch = "wasm32")]
fn default_storage_path() -> Result<PathBuf, ConfigError> {
    Err(ConfigError::NoDataDir)
}
