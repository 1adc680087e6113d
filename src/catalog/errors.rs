//! Catalog error taxonomy

use crate::cache::CacheError;
use crate::cdn::CdnError;
use crate::drive::DriveError;

/// Failures that abort an asset resolution or a catalog rebuild
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    #[error("Folder listing failed: {0}")]
    Listing(DriveError),

    #[error("Content fetch failed: {0}")]
    Fetch(DriveError),

    #[error("Upload failed: {0}")]
    Upload(#[from] CdnError),

    #[error("Cache backend failed: {0}")]
    Cache(#[from] CacheError),

    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<tokio::task::JoinError> for CatalogError {
    fn from(err: tokio::task::JoinError) -> Self {
        CatalogError::Task(err.to_string())
    }
}
