//! Drive API Client
//!
//! Provides authenticated, read-only access to the remote file-storage
//! provider: folder listings, file metadata and streamed file content.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use tracing::{debug, info};

use super::errors::DriveError;
use super::types::{
    children_query, ChildKind, DriveFile, FileListResponse, FileMetadata, DEFAULT_MIME_TYPE,
};
use crate::catalog::lister::TreeLister;
use crate::catalog::mirror::{AssetContent, ContentSource};

/// Default provider API base URL
pub const DEFAULT_API_URL: &str = "https://www.googleapis.com/drive/v3";

/// Fields requested for every listing
const LIST_FIELDS: &str = "files(id,name,mimeType,trashed)";

/// Largest page the provider will return; continuation pages are not followed
const PAGE_SIZE: &str = "1000";

/// Credential attached to every request
#[derive(Clone)]
pub enum DriveAuth {
    /// OAuth access token sent as `Authorization: Bearer`
    Bearer(String),
    /// API key sent as the `key` query parameter (public folders only)
    ApiKey(String),
}

impl std::fmt::Debug for DriveAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DriveAuth::Bearer(_) => f.write_str("Bearer(***)"),
            DriveAuth::ApiKey(_) => f.write_str("ApiKey(***)"),
        }
    }
}

/// Drive API client for making authenticated requests
#[derive(Clone)]
pub struct DriveClient {
    /// HTTP client for making requests
    http_client: Client,
    /// API base URL, without trailing slash
    api_url: String,
    /// Credential for every request
    auth: DriveAuth,
}

impl DriveClient {
    /// Create a new client
    ///
    /// # Arguments
    /// * `api_url` - Provider API base (e.g. DEFAULT_API_URL)
    /// * `auth` - Credential to attach to requests
    /// * `timeout` - Per-request timeout
    pub fn new(api_url: &str, auth: DriveAuth, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http_client,
            api_url: api_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Attach the configured credential to a request
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth {
            DriveAuth::Bearer(token) => request.bearer_auth(token),
            DriveAuth::ApiKey(key) => request.query(&[("key", key)]),
        }
    }

    /// URL of a single file resource
    fn file_url(&self, file_id: &str) -> String {
        format!("{}/files/{}", self.api_url, urlencoding::encode(file_id))
    }

    /// List the immediate children of a folder
    ///
    /// # Arguments
    /// * `parent_id` - Folder identifier
    /// * `kind` - Folders only, or everything but folders
    ///
    /// # Returns
    /// Children in provider order, trashed entries excluded
    pub async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
    ) -> Result<Vec<DriveFile>, DriveError> {
        let url = format!("{}/files", self.api_url);
        let query = children_query(parent_id, kind);

        debug!(parent = parent_id, kind = ?kind, "Listing children from Drive");

        let response = self
            .authorize(self.http_client.get(&url))
            .query(&[
                ("q", query.as_str()),
                ("fields", LIST_FIELDS),
                ("pageSize", PAGE_SIZE),
            ])
            .send()
            .await?;
        let response = check_status(response).await?;

        let list: FileListResponse = response.json().await?;
        let files: Vec<DriveFile> = list
            .files
            .into_iter()
            .filter(|f| f.matches(kind))
            .collect();

        debug!(parent = parent_id, count = files.len(), "Listed children from Drive");
        Ok(files)
    }

    /// Look up a file's MIME type
    pub async fn mime_type(&self, file_id: &str) -> Result<String, DriveError> {
        debug!(file_id = file_id, "Fetching file metadata from Drive");

        let response = self
            .authorize(self.http_client.get(self.file_url(file_id)))
            .query(&[("fields", "mimeType,name")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let meta: FileMetadata = response.json().await?;
        debug!(file_id = file_id, name = ?meta.name, mime = ?meta.mime_type, "Fetched file metadata");
        Ok(meta
            .mime_type
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()))
    }

    /// Open a file's content as a byte stream
    ///
    /// The body is not buffered; bytes are pulled from the provider as the
    /// returned stream is polled.
    pub async fn download_stream(&self, file_id: &str) -> Result<AssetContent, DriveError> {
        let response = self
            .authorize(self.http_client.get(self.file_url(file_id)))
            .query(&[("alt", "media")])
            .send()
            .await?;
        let response = check_status(response).await?;

        let mime_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_MIME_TYPE)
            .to_string();

        info!(file_id = file_id, mime = %mime_type, "Streaming file from Drive");

        let stream = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
            .boxed();

        Ok(AssetContent { mime_type, stream })
    }
}

/// Turn a non-success response into a DriveError
async fn check_status(response: Response) -> Result<Response, DriveError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(DriveError::from_status(status, &body))
}

#[async_trait]
impl TreeLister for DriveClient {
    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
    ) -> Result<Vec<DriveFile>, DriveError> {
        DriveClient::list_children(self, parent_id, kind).await
    }
}

#[async_trait]
impl ContentSource for DriveClient {
    async fn fetch(&self, file_id: &str) -> Result<AssetContent, DriveError> {
        self.download_stream(file_id).await
    }

    async fn mime_type(&self, file_id: &str) -> Result<String, DriveError> {
        DriveClient::mime_type(self, file_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drive::types::FOLDER_MIME_TYPE as FOLDER_MIME;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> DriveClient {
        DriveClient::new(
            &server.uri(),
            DriveAuth::Bearer("token-1".to_string()),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_list_children_sends_query_and_filters_trashed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(header("authorization", "Bearer token-1"))
            .and(query_param(
                "q",
                "'root' in parents and mimeType='application/vnd.google-apps.folder' and trashed=false",
            ))
            .and(query_param("fields", LIST_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "files": [
                    {"id": "c1", "name": "Silk", "mimeType": FOLDER_MIME},
                    {"id": "c2", "name": "Old", "mimeType": FOLDER_MIME, "trashed": true},
                    {"id": "c3", "name": "Cotton", "mimeType": FOLDER_MIME}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let files = client_for(&server)
            .list_children("root", ChildKind::Folder)
            .await
            .unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Silk", "Cotton"]);
    }

    #[tokio::test]
    async fn test_list_children_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .respond_with(ResponseTemplate::new(404).set_body_string("File not found: missing"))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list_children("missing", ChildKind::NonFolder)
            .await
            .unwrap_err();
        assert!(matches!(err, DriveError::NotFound(body) if body.contains("missing")));
    }

    #[tokio::test]
    async fn test_api_key_auth_goes_in_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files"))
            .and(query_param("key", "k-123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"files": []})))
            .expect(1)
            .mount(&server)
            .await;

        let client = DriveClient::new(
            &server.uri(),
            DriveAuth::ApiKey("k-123".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        let files = client.list_children("root", ChildKind::Folder).await.unwrap();
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_download_stream_yields_body_and_mime() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/img1"))
            .and(query_param("alt", "media"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "image/png")
                    .set_body_bytes(vec![1u8, 2, 3, 4]),
            )
            .mount(&server)
            .await;

        let content = client_for(&server).download_stream("img1").await.unwrap();
        assert_eq!(content.mime_type, "image/png");

        let chunks: Vec<bytes::Bytes> = content.stream.try_collect().await.unwrap();
        let body: Vec<u8> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        assert_eq!(body, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_mime_type_defaults_when_missing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/files/img2"))
            .and(query_param("fields", "mimeType,name"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"name": "x"})))
            .mount(&server)
            .await;

        let mime = client_for(&server).mime_type("img2").await.unwrap();
        assert_eq!(mime, DEFAULT_MIME_TYPE);
    }

    #[tokio::test]
    async fn test_server_error_maps_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("backend down"))
            .mount(&server)
            .await;

        let err = client_for(&server).download_stream("img3").await.unwrap_err();
        assert!(matches!(err, DriveError::Server(503, _)));
    }
}
