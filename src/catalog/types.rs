//! Catalog data model
//!
//! Transient references produced by the lister and the serialized catalog
//! document built from them.

use serde::{Deserialize, Serialize};

use crate::drive::{DriveFile, DEFAULT_MIME_TYPE};

/// Number of products shown in a subfolder preview
pub const PREVIEW_LEN: usize = 5;

/// Placeholder values; the remote tree carries no richer metadata
pub const DEFAULT_CATEGORY: &str = "Default";
pub const DEFAULT_RANGE: &str = "1-2k";
pub const DEFAULT_PRICE: &str = "₹1500";

/// A remote folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRef {
    pub id: String,
    pub name: String,
}

impl From<DriveFile> for FolderRef {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
        }
    }
}

/// A remote non-folder file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub id: String,
    pub name: String,
    pub mime_type: String,
}

impl From<DriveFile> for AssetRef {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file
                .mime_type
                .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string()),
        }
    }
}

/// A catalog product, one per asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub category: String,
    pub range: String,
    pub price: String,
    pub image: String,
}

impl Product {
    /// Build a product from an asset and its resolved public URL
    pub fn from_asset(asset: &AssetRef, image_url: String) -> Self {
        Self {
            id: asset.id.clone(),
            name: strip_extension(&asset.name).to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            range: DEFAULT_RANGE.to_string(),
            price: DEFAULT_PRICE.to_string(),
            image: image_url,
        }
    }
}

/// A subfolder with its products
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubfolderEntry {
    pub id: String,
    pub name: String,
    pub preview: Vec<Product>,
    pub all: Vec<Product>,
}

impl SubfolderEntry {
    pub fn new(folder: FolderRef, products: Vec<Product>) -> Self {
        let preview = products.iter().take(PREVIEW_LEN).cloned().collect();
        Self {
            id: folder.id,
            name: folder.name,
            preview,
            all: products,
        }
    }
}

/// A top-level category
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryEntry {
    pub id: String,
    pub name: String,
    pub subfolders: Vec<SubfolderEntry>,
}

impl CategoryEntry {
    pub fn new(folder: FolderRef, subfolders: Vec<SubfolderEntry>) -> Self {
        Self {
            id: folder.id,
            name: folder.name,
            subfolders,
        }
    }
}

/// The full catalog document, in listing order
pub type Catalog = Vec<CategoryEntry>;

/// Drop the last `.ext` from a file name
///
/// Only a non-empty final segment without a path separator counts as an
/// extension, so `"trailing."` and `"no-extension"` come back unchanged.
pub fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() && !name[dot + 1..].contains('/') => &name[..dot],
        _ => name,
    }
}
