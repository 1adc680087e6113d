//! Asset Mirror
//!
//! Resolves a remote file to a stable public CDN URL. The URL is memoized in
//! the cache under `image_url:{asset_id}` for 24 hours; on a miss the file is
//! streamed from the storage provider straight into the CDN upload, using the
//! asset id as the CDN public id so repeated uploads replace one object.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use tracing::{debug, info};

use super::errors::CatalogError;
use super::flight::SingleFlight;
use super::policy::ReadFailurePolicy;
use crate::cache::{self, KvStore};
use crate::cdn::CdnError;
use crate::drive::DriveError;

/// Lifetime of a cached asset URL
pub const ASSET_URL_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Namespace for asset URL cache keys
const ASSET_URL_KEY_PREFIX: &str = "image_url:";

/// Streamed file content
pub type ByteStream = BoxStream<'static, Result<Bytes, io::Error>>;

/// A file's content stream and MIME type
pub struct AssetContent {
    pub mime_type: String,
    pub stream: ByteStream,
}

impl std::fmt::Debug for AssetContent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssetContent")
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// Parameters of a single CDN upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Target collection (CDN folder)
    pub collection: String,
    /// Stable public identifier; re-uploads replace the same object
    pub public_id: String,
    /// Original file name
    pub file_name: String,
    /// MIME type of the content
    pub mime_type: String,
}

/// Provides file content and metadata from the storage provider
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Open the content of `file_id` as a stream
    async fn fetch(&self, file_id: &str) -> Result<AssetContent, DriveError>;

    /// MIME type of `file_id`
    async fn mime_type(&self, file_id: &str) -> Result<String, DriveError>;
}

/// Accepts streamed uploads and returns durable public URLs
#[async_trait]
pub trait AssetSink: Send + Sync {
    async fn upload(&self, request: &UploadRequest, stream: ByteStream) -> Result<String, CdnError>;
}

/// Cache-aside resolver from asset id to public URL
#[derive(Clone)]
pub struct AssetMirror {
    /// Asset URL cache
    store: Arc<dyn KvStore>,
    /// Where asset bytes come from
    source: Arc<dyn ContentSource>,
    /// Where asset bytes go
    sink: Arc<dyn AssetSink>,
    /// CDN collection for every upload
    collection: String,
    /// Lifetime of cached URLs
    ttl: Duration,
    /// How cache read failures are handled
    read_policy: ReadFailurePolicy,
    /// In-progress uploads by cache key
    flights: Arc<SingleFlight<String>>,
}

impl AssetMirror {
    /// Create a mirror with the default 24 hour URL lifetime
    pub fn new(
        store: Arc<dyn KvStore>,
        source: Arc<dyn ContentSource>,
        sink: Arc<dyn AssetSink>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            store,
            source,
            sink,
            collection: collection.into(),
            ttl: ASSET_URL_TTL,
            read_policy: ReadFailurePolicy::default(),
            flights: Arc::new(SingleFlight::new()),
        }
    }

    /// Override the URL lifetime
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the cache read failure policy
    pub fn with_read_policy(mut self, policy: ReadFailurePolicy) -> Self {
        self.read_policy = policy;
        self
    }

    /// Cache key for an asset's URL
    pub fn cache_key(asset_id: &str) -> String {
        format!("{}{}", ASSET_URL_KEY_PREFIX, asset_id)
    }

    /// Return the public URL for an asset, uploading it on first access
    ///
    /// A cached URL is returned without any upstream call. Concurrent misses
    /// for the same asset share one upload. Failures are not cached.
    pub async fn resolve_asset_url(
        &self,
        asset_id: &str,
        asset_name: &str,
    ) -> Result<String, CatalogError> {
        let key = Self::cache_key(asset_id);

        if let Some(raw) = self
            .read_policy
            .read_raw(self.store.as_ref(), &key)
            .await?
        {
            let url = decode_url(raw);
            debug!(asset_id = asset_id, "Asset URL cache HIT");
            return Ok(url);
        }

        debug!(asset_id = asset_id, name = asset_name, "Asset URL cache MISS");

        let this = self.clone();
        let asset_id = asset_id.to_string();
        let asset_name = asset_name.to_string();
        self.flights
            .run(&key, async move { this.mirror(asset_id, asset_name).await })
            .await
    }

    /// Stream the asset from the provider into the CDN and cache the URL
    async fn mirror(&self, asset_id: String, asset_name: String) -> Result<String, CatalogError> {
        info!(asset_id = %asset_id, name = %asset_name, "Mirroring asset to CDN");

        let content = self
            .source
            .fetch(&asset_id)
            .await
            .map_err(CatalogError::Fetch)?;

        let request = UploadRequest {
            collection: self.collection.clone(),
            public_id: asset_id.clone(),
            file_name: asset_name,
            mime_type: content.mime_type,
        };
        let url = self.sink.upload(&request, content.stream).await?;

        cache::set_json_logged(
            self.store.as_ref(),
            &Self::cache_key(&asset_id),
            &url,
            self.ttl,
        )
        .await;

        info!(asset_id = %asset_id, url = %url, "Asset mirrored");
        Ok(url)
    }
}

/// Cached URLs are JSON strings; bare URLs from older writers are kept as-is
fn decode_url(raw: String) -> String {
    serde_json::from_str::<String>(&raw).unwrap_or(raw)
}
