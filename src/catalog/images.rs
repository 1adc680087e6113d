//! Image proxy
//!
//! Streams a remote file straight through to a client. The file's MIME type
//! is memoized under `image_meta:{file_id}` for an hour so repeat requests
//! skip the metadata call.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::errors::CatalogError;
use super::mirror::{AssetContent, ContentSource};
use super::policy::ReadFailurePolicy;
use crate::cache::{self, KvStore};

/// Lifetime of a cached MIME type
pub const IMAGE_META_TTL: Duration = Duration::from_secs(60 * 60);

/// Namespace for MIME type cache keys
const IMAGE_META_KEY_PREFIX: &str = "image_meta:";

/// Pass-through streaming of remote images
#[derive(Clone)]
pub struct ImageProxy {
    store: Arc<dyn KvStore>,
    source: Arc<dyn ContentSource>,
    read_policy: ReadFailurePolicy,
}

impl ImageProxy {
    pub fn new(store: Arc<dyn KvStore>, source: Arc<dyn ContentSource>) -> Self {
        Self {
            store,
            source,
            read_policy: ReadFailurePolicy::default(),
        }
    }

    /// Override the cache read failure policy
    pub fn with_read_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_policy = policy;
        self
    }

    /// Cache key for a file's MIME type
    pub fn cache_key(file_id: &str) -> String {
        format!("{}{}", IMAGE_META_KEY_PREFIX, file_id)
    }

    /// MIME type of `file_id`, from cache when present
    pub async fn mime_type(&self, file_id: &str) -> Result<String, CatalogError> {
        let key = Self::cache_key(file_id);

        if let Some(mime) = self
            .read_policy
            .read::<String>(self.store.as_ref(), &key)
            .await?
        {
            debug!(file_id = file_id, "Image meta cache HIT");
            return Ok(mime);
        }

        debug!(file_id = file_id, "Image meta cache MISS");
        let mime = self
            .source
            .mime_type(file_id)
            .await
            .map_err(CatalogError::Fetch)?;
        cache::set_json_logged(self.store.as_ref(), &key, &mime, IMAGE_META_TTL).await;
        Ok(mime)
    }

    /// Open `file_id` for streaming, labelled with its cached MIME type
    pub async fn open(&self, file_id: &str) -> Result<AssetContent, CatalogError> {
        let mime_type = self.mime_type(file_id).await?;
        let content = self
            .source
            .fetch(file_id)
            .await
            .map_err(CatalogError::Fetch)?;

        Ok(AssetContent {
            mime_type,
            stream: content.stream,
        })
    }
}
