//! Remote Tree Lister
//!
//! Seam over the storage provider's folder listing. One outbound call per
//! invocation; nothing is cached at this layer and failures are returned
//! unchanged.

use async_trait::async_trait;

use super::types::{AssetRef, FolderRef};
use crate::drive::{ChildKind, DriveError, DriveFile};

/// Lists the immediate children of a remote folder
#[async_trait]
pub trait TreeLister: Send + Sync {
    /// Children of `parent_id` matching `kind`, in provider order, trashed
    /// entries excluded
    async fn list_children(
        &self,
        parent_id: &str,
        kind: ChildKind,
    ) -> Result<Vec<DriveFile>, DriveError>;

    /// Child folders of `parent_id`
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<FolderRef>, DriveError> {
        let children = self.list_children(parent_id, ChildKind::Folder).await?;
        Ok(children.into_iter().map(FolderRef::from).collect())
    }

    /// Non-folder files of `parent_id`
    async fn list_assets(&self, parent_id: &str) -> Result<Vec<AssetRef>, DriveError> {
        let children = self.list_children(parent_id, ChildKind::NonFolder).await?;
        Ok(children.into_iter().map(AssetRef::from).collect())
    }
}
