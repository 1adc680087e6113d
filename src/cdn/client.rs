//! CDN Upload Client
//!
//! Uploads image bytes to a Cloudinary-style image host with signed,
//! streamed multipart requests and returns the durable public URL.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use tracing::{debug, info};

use super::errors::CdnError;
use crate::catalog::mirror::{AssetSink, ByteStream, UploadRequest};

/// Default CDN API base URL
pub const DEFAULT_API_URL: &str = "https://api.cloudinary.com/v1_1";

/// Account credentials for signed uploads
#[derive(Clone)]
pub struct CdnCredentials {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl std::fmt::Debug for CdnCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CdnCredentials")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"***")
            .finish()
    }
}

/// Response from a successful upload
#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    #[serde(default)]
    public_id: Option<String>,
    #[serde(default)]
    bytes: Option<u64>,
}

/// Error envelope returned on rejected uploads
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// CDN client for signed uploads
#[derive(Clone)]
pub struct CloudinaryClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API base URL, without trailing slash
    api_url: String,
    /// Account credentials
    credentials: CdnCredentials,
}

impl CloudinaryClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_url` - CDN API base (e.g. DEFAULT_API_URL)
    /// * `credentials` - Account credentials
    /// * `timeout` - Per-request timeout
    pub fn new(api_url: &str, credentials: CdnCredentials, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            credentials,
        })
    }

    /// Upload endpoint for image resources
    fn upload_url(&self) -> String {
        format!("{}/{}/image/upload", self.api_url, self.credentials.cloud_name)
    }

    /// Upload a byte stream as an image
    ///
    /// The stream is forwarded as the multipart `file` part without being
    /// buffered. Uploading again with the same `public_id` replaces the
    /// existing object.
    ///
    /// # Returns
    /// The secure public URL of the uploaded object
    pub async fn upload_stream(
        &self,
        request: &UploadRequest,
        stream: ByteStream,
    ) -> Result<String, CdnError> {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
            .to_string();

        let signature = sign_params(
            &[
                ("folder", request.collection.as_str()),
                ("public_id", request.public_id.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.credentials.api_secret,
        );

        let file_part = Part::stream(Body::wrap_stream(stream))
            .file_name(request.file_name.clone())
            .mime_str(&request.mime_type)?;

        let form = Form::new()
            .text("folder", request.collection.clone())
            .text("public_id", request.public_id.clone())
            .text("timestamp", timestamp)
            .text("api_key", self.credentials.api_key.clone())
            .text("signature", signature)
            .part("file", file_part);

        info!(
            public_id = %request.public_id,
            folder = %request.collection,
            mime = %request.mime_type,
            "Uploading asset to CDN"
        );

        let response = self
            .http_client
            .post(self.upload_url())
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(CdnError::Rejected { status, message });
        }

        let uploaded: UploadResponse = response.json().await?;
        debug!(
            public_id = ?uploaded.public_id,
            bytes = ?uploaded.bytes,
            url = %uploaded.secure_url,
            "Asset uploaded to CDN"
        );
        Ok(uploaded.secure_url)
    }
}

/// Sign upload parameters
///
/// Parameters are sorted by name, joined as `name=value` pairs with `&`, the
/// API secret is appended and the result is hashed with SHA-1 (lowercase hex).
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted: Vec<&(&str, &str)> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha1::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl AssetSink for CloudinaryClient {
    async fn upload(&self, request: &UploadRequest, stream: ByteStream) -> Result<String, CdnError> {
        self.upload_stream(request, stream).await
    }
}
