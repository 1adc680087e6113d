//! Catalog Assembler
//!
//! Walks root -> category folders -> subfolders -> files and shapes the
//! result into a `Catalog`. Sibling subtrees are resolved with ordered,
//! bounded fan-out; a semaphore caps the number of remote calls in flight
//! across the whole walk. With a limit of 1 every call is issued strictly in
//! tree order. The first failure anywhere aborts the build.

use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt, TryStreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info};

use super::errors::CatalogError;
use super::lister::TreeLister;
use super::mirror::AssetMirror;
use super::types::{AssetRef, Catalog, CategoryEntry, FolderRef, Product, SubfolderEntry};

/// Default bound on concurrent remote calls during a build
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Builds the catalog from the remote tree
pub struct CatalogAssembler {
    /// Folder listing provider
    lister: Arc<dyn TreeLister>,
    /// Asset URL resolver
    mirror: AssetMirror,
    /// Fan-out width and remote call bound
    concurrency: usize,
}

impl CatalogAssembler {
    pub fn new(lister: Arc<dyn TreeLister>, mirror: AssetMirror) -> Self {
        Self::with_concurrency(lister, mirror, DEFAULT_CONCURRENCY)
    }

    /// Create an assembler allowing `concurrency` remote calls at once
    pub fn with_concurrency(
        lister: Arc<dyn TreeLister>,
        mirror: AssetMirror,
        concurrency: usize,
    ) -> Self {
        Self {
            lister,
            mirror,
            concurrency: concurrency.max(1),
        }
    }

    /// Build the full catalog under `root_id`
    ///
    /// Categories, subfolders and products keep listing order. Nothing is
    /// returned unless every listing and every asset resolution succeeded.
    pub async fn build_catalog(&self, root_id: &str) -> Result<Catalog, CatalogError> {
        let started = Instant::now();
        let build = Build {
            lister: self.lister.as_ref(),
            mirror: &self.mirror,
            permits: Semaphore::new(self.concurrency),
            width: self.concurrency,
        };

        let categories = build.list_folders(root_id).await?;
        let catalog: Catalog = stream::iter(categories)
            .map(|category| build.category(category))
            .buffered(build.width)
            .try_collect()
            .await?;

        let subfolders: usize = catalog.iter().map(|c| c.subfolders.len()).sum();
        let products: usize = catalog
            .iter()
            .flat_map(|c| c.subfolders.iter())
            .map(|s| s.all.len())
            .sum();
        info!(
            categories = catalog.len(),
            subfolders = subfolders,
            products = products,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Catalog assembled"
        );
        Ok(catalog)
    }
}

/// State shared by one build
struct Build<'a> {
    lister: &'a dyn TreeLister,
    mirror: &'a AssetMirror,
    /// Held only for the duration of a single remote call
    permits: Semaphore,
    width: usize,
}

impl Build<'_> {
    async fn list_folders(&self, parent_id: &str) -> Result<Vec<FolderRef>, CatalogError> {
        let _permit = self.permits.acquire().await.map_err(closed)?;
        self.lister
            .list_folders(parent_id)
            .await
            .map_err(CatalogError::Listing)
    }

    async fn list_assets(&self, parent_id: &str) -> Result<Vec<AssetRef>, CatalogError> {
        let _permit = self.permits.acquire().await.map_err(closed)?;
        self.lister
            .list_assets(parent_id)
            .await
            .map_err(CatalogError::Listing)
    }

    async fn category(&self, folder: FolderRef) -> Result<CategoryEntry, CatalogError> {
        let subfolders: Vec<SubfolderEntry> = stream::iter(self.list_folders(&folder.id).await?)
            .map(|sub| self.subfolder(sub))
            .buffered(self.width)
            .try_collect()
            .await?;

        debug!(category = %folder.name, subfolders = subfolders.len(), "Category assembled");
        Ok(CategoryEntry::new(folder, subfolders))
    }

    async fn subfolder(&self, folder: FolderRef) -> Result<SubfolderEntry, CatalogError> {
        let products: Vec<Product> = stream::iter(self.list_assets(&folder.id).await?)
            .map(|asset| self.product(asset))
            .buffered(self.width)
            .try_collect()
            .await?;

        debug!(subfolder = %folder.name, products = products.len(), "Subfolder assembled");
        Ok(SubfolderEntry::new(folder, products))
    }

    async fn product(&self, asset: AssetRef) -> Result<Product, CatalogError> {
        let _permit = self.permits.acquire().await.map_err(closed)?;
        let url = self.mirror.resolve_asset_url(&asset.id, &asset.name).await?;
        Ok(Product::from_asset(&asset, url))
    }
}

fn closed(err: tokio::sync::AcquireError) -> CatalogError {
    CatalogError::Task(err.to_string())
}
