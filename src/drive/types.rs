//! Drive API types
//!
//! Wire types for the storage provider's `files` endpoints and the query
//! builder used to list the children of a folder.

use serde::Deserialize;

/// MIME type the provider assigns to folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type used when the provider does not report one
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Which kind of children a listing should return
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildKind {
    /// Only folders
    Folder,
    /// Everything that is not a folder
    NonFolder,
}

/// A file or folder entry from a listing response
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    /// Opaque provider identifier
    pub id: String,
    /// Display name (including extension for files)
    pub name: String,
    /// MIME type (folders carry FOLDER_MIME_TYPE)
    #[serde(default)]
    pub mime_type: Option<String>,
    /// Soft-deleted flag
    #[serde(default)]
    pub trashed: bool,
}

impl DriveFile {
    /// Build a folder entry
    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            trashed: false,
        }
    }

    /// Build a non-folder entry
    pub fn file(id: impl Into<String>, name: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mime_type: Some(mime_type.into()),
            trashed: false,
        }
    }

    /// Check if this entry represents a folder
    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Whether this entry belongs in a listing of the given kind
    pub fn matches(&self, kind: ChildKind) -> bool {
        !self.trashed
            && match kind {
                ChildKind::Folder => self.is_folder(),
                ChildKind::NonFolder => !self.is_folder(),
            }
    }
}

/// Response from the `files.list` endpoint
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    /// Entries matching the query
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// Response from a metadata-only `files.get`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    pub name: Option<String>,
    pub mime_type: Option<String>,
}

/// Build the `q` parameter that lists the children of `parent_id`
pub fn children_query(parent_id: &str, kind: ChildKind) -> String {
    let op = match kind {
        ChildKind::Folder => "=",
        ChildKind::NonFolder => "!=",
    };
    format!(
        "'{}' in parents and mimeType{}'{}' and trashed=false",
        escape_query_literal(parent_id),
        op,
        FOLDER_MIME_TYPE
    )
}

/// Escape a value for use inside a single-quoted query literal
fn escape_query_literal(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}
