//! Service configuration
//!
//! Everything is read from environment variables. Parsing goes through a
//! lookup function so tests can supply a plain map.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Result};

use crate::catalog::assembler::DEFAULT_CONCURRENCY;
use crate::catalog::mirror::ASSET_URL_TTL;
use crate::catalog::service::{CATALOG_TTL, DEFAULT_CATALOG_KEY};
use crate::catalog::{CatalogSettings, ReadFailurePolicy};
use crate::cdn::{client::DEFAULT_API_URL as DEFAULT_CDN_URL, CdnCredentials};
use crate::drive::{client::DEFAULT_API_URL as DEFAULT_DRIVE_URL, DriveAuth};

/// Default listening port
const DEFAULT_PORT: u16 = 5000;

/// Default CDN collection for mirrored assets
const DEFAULT_CDN_FOLDER: &str = "sarees";

/// Default timeout for every outbound request
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Longest accepted cache TTL (one year)
const MAX_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Which key-value backend to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheBackend {
    /// Redis REST endpoint
    Upstash { url: String, token: String },
    /// In-process store (lost on restart)
    Memory,
}

/// Storage provider settings
#[derive(Debug, Clone)]
pub struct DriveSettings {
    pub api_url: String,
    pub auth: DriveAuth,
}

/// CDN settings
#[derive(Debug, Clone)]
pub struct CdnSettings {
    pub api_url: String,
    pub credentials: CdnCredentials,
    /// Collection every asset is uploaded into
    pub folder: String,
}

/// Full service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listening port
    pub port: u16,
    /// Timeout for every outbound request
    pub request_timeout: Duration,
    pub drive: DriveSettings,
    pub cdn: CdnSettings,
    pub cache: CacheBackend,
    /// Catalog cache and root folder settings
    pub catalog: CatalogSettings,
    /// Lifetime of cached asset URLs
    pub asset_url_ttl: Duration,
    /// Bound on concurrent remote calls during a rebuild
    pub concurrency: usize,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let auth = match (get("GOOGLE_ACCESS_TOKEN"), get("GOOGLE_API_KEY")) {
            (Some(token), _) => DriveAuth::Bearer(token),
            (None, Some(key)) => DriveAuth::ApiKey(key),
            (None, None) => {
                return Err(anyhow!(
                    "Missing Drive credentials: set GOOGLE_ACCESS_TOKEN or GOOGLE_API_KEY"
                ))
            }
        };

        let cache = match (get("UPSTASH_REDIS_REST_URL"), get("UPSTASH_REDIS_REST_TOKEN")) {
            (Some(url), Some(token)) => CacheBackend::Upstash { url, token },
            (None, None) => CacheBackend::Memory,
            _ => {
                return Err(anyhow!(
                    "UPSTASH_REDIS_REST_URL and UPSTASH_REDIS_REST_TOKEN must be set together"
                ))
            }
        };

        let catalog = CatalogSettings {
            root_folder_id: required(&get, "CATALOG_ROOT_FOLDER_ID")?,
            cache_key: get("CATALOG_CACHE_KEY").unwrap_or_else(|| DEFAULT_CATALOG_KEY.to_string()),
            ttl: ttl_or(&get, "CATALOG_TTL_SECS", CATALOG_TTL)?,
            read_policy: parse_or(&get, "CACHE_READ_FAILURE", ReadFailurePolicy::default())?,
        };

        let concurrency: usize = parse_or(&get, "CATALOG_CONCURRENCY", DEFAULT_CONCURRENCY)?;
        if concurrency == 0 {
            return Err(anyhow!("CATALOG_CONCURRENCY must be at least 1"));
        }

        Ok(Self {
            port: parse_or(&get, "PORT", DEFAULT_PORT)?,
            request_timeout: Duration::from_secs(parse_or(
                &get,
                "REQUEST_TIMEOUT_SECS",
                DEFAULT_REQUEST_TIMEOUT_SECS,
            )?),
            drive: DriveSettings {
                api_url: get("GOOGLE_DRIVE_API_URL").unwrap_or_else(|| DEFAULT_DRIVE_URL.to_string()),
                auth,
            },
            cdn: CdnSettings {
                api_url: get("CLOUDINARY_API_URL").unwrap_or_else(|| DEFAULT_CDN_URL.to_string()),
                credentials: CdnCredentials {
                    cloud_name: required(&get, "CLOUDINARY_CLOUD_NAME")?,
                    api_key: required(&get, "CLOUDINARY_API_KEY")?,
                    api_secret: required(&get, "CLOUDINARY_API_SECRET")?,
                },
                folder: get("CLOUDINARY_FOLDER").unwrap_or_else(|| DEFAULT_CDN_FOLDER.to_string()),
            },
            cache,
            catalog,
            asset_url_ttl: ttl_or(&get, "ASSET_URL_TTL_SECS", ASSET_URL_TTL)?,
            concurrency,
        })
    }
}

fn required<G>(get: &G, key: &str) -> Result<String>
where
    G: Fn(&str) -> Option<String>,
{
    get(key).ok_or_else(|| anyhow!("Missing required environment variable {}", key))
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T>
where
    G: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid value for {} ({:?}): {}", key, raw, e)),
        None => Ok(default),
    }
}

/// Parse a TTL in seconds, between one second and `MAX_TTL_SECS`
fn ttl_or<G>(get: &G, key: &str, default: Duration) -> Result<Duration>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: u64 = parse_or(get, key, default.as_secs())?;
    if secs == 0 || secs > MAX_TTL_SECS {
        return Err(anyhow!(
            "{} must be between 1 and {} seconds, got {}",
            key,
            MAX_TTL_SECS,
            secs
        ));
    }
    Ok(Duration::from_secs(secs))
}
