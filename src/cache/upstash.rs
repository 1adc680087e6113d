//! REST-backed Redis Store
//!
//! Implements `KvStore` over a Redis REST endpoint (Upstash-compatible):
//! each command is posted as a JSON array and answered with
//! `{"result": ...}` or `{"error": "..."}`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use super::{CacheError, KvStore};

/// Reply envelope for every REST command
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Redis REST client
#[derive(Clone)]
pub struct UpstashStore {
    /// HTTP client for making requests
    http_client: Client,
    /// REST endpoint URL
    url: String,
    /// Bearer token for the endpoint
    token: String,
}

impl UpstashStore {
    /// Create a new store client
    ///
    /// # Arguments
    /// * `url` - REST endpoint URL
    /// * `token` - REST bearer token
    /// * `timeout` - Per-request timeout
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Run a single command and return its `result`
    async fn command(&self, args: &[&str]) -> Result<Value, CacheError> {
        trace!(command = args.first().copied().unwrap_or(""), "Sending cache command");

        let response = self
            .http_client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&args)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(CacheError::Unauthorized);
        }

        let body = response.text().await?;
        let reply: CommandReply = serde_json::from_str(&body).map_err(|_| {
            CacheError::Backend(format!("HTTP {}: {}", status.as_u16(), body))
        })?;

        if let Some(error) = reply.error {
            return Err(CacheError::Backend(error));
        }
        if !status.is_success() {
            return Err(CacheError::Backend(format!("HTTP {}", status.as_u16())));
        }
        Ok(reply.result)
    }
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        match self.command(&["GET", key]).await? {
            Value::Null => {
                debug!(key = key, "Cache MISS");
                Ok(None)
            }
            Value::String(value) => {
                debug!(key = key, "Cache HIT");
                Ok(Some(value))
            }
            other => Err(CacheError::Decode(format!(
                "unexpected GET result: {}",
                other
            ))),
        }
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let ttl_secs = ttl.as_secs().max(1).to_string();
        self.command(&["SET", key, &value, "EX", &ttl_secs]).await?;
        debug!(key = key, ttl_secs = %ttl_secs, "Cache SET");
        Ok(())
    }
}
