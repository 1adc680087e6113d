//! Cache-Aside Orchestrator
//!
//! Serves the catalog from a single cache entry and rebuilds it on a miss.
//! Concurrent misses share one rebuild; the rebuilt catalog is written once,
//! after the whole tree has been assembled, so the cache never holds a
//! partial catalog.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::assembler::CatalogAssembler;
use super::errors::CatalogError;
use super::flight::SingleFlight;
use super::policy::ReadFailurePolicy;
use super::types::Catalog;
use crate::cache::{self, KvStore};

/// Default catalog cache key
pub const DEFAULT_CATALOG_KEY: &str = "saree_catalog";

/// Lifetime of the cached catalog
pub const CATALOG_TTL: Duration = Duration::from_secs(10 * 60);

/// Catalog service settings
#[derive(Debug, Clone)]
pub struct CatalogSettings {
    /// Root folder of the remote tree
    pub root_folder_id: String,
    /// Cache key of the assembled catalog
    pub cache_key: String,
    /// Lifetime of the cached catalog
    pub ttl: Duration,
    /// How cache read failures are handled
    pub read_policy: ReadFailurePolicy,
}

impl CatalogSettings {
    pub fn new(root_folder_id: impl Into<String>) -> Self {
        Self {
            root_folder_id: root_folder_id.into(),
            cache_key: DEFAULT_CATALOG_KEY.to_string(),
            ttl: CATALOG_TTL,
            read_policy: ReadFailurePolicy::default(),
        }
    }
}

/// Cache-aside front for the catalog assembler
#[derive(Clone)]
pub struct CatalogService {
    /// Catalog cache
    store: Arc<dyn KvStore>,
    /// Rebuilds the catalog on a miss
    assembler: Arc<CatalogAssembler>,
    settings: Arc<CatalogSettings>,
    /// In-progress rebuilds by cache key
    flights: Arc<SingleFlight<Arc<Catalog>>>,
}

impl CatalogService {
    pub fn new(
        store: Arc<dyn KvStore>,
        assembler: Arc<CatalogAssembler>,
        settings: CatalogSettings,
    ) -> Self {
        Self {
            store,
            assembler,
            settings: Arc::new(settings),
            flights: Arc::new(SingleFlight::new()),
        }
    }

    /// Return the catalog, from cache when present
    ///
    /// On a miss the catalog is rebuilt from scratch, cached for the
    /// configured TTL and returned. A failed rebuild writes nothing.
    pub async fn get_catalog(&self) -> Result<Arc<Catalog>, CatalogError> {
        let key = self.settings.cache_key.as_str();

        if let Some(catalog) = self
            .settings
            .read_policy
            .read::<Catalog>(self.store.as_ref(), key)
            .await?
        {
            debug!(key = key, categories = catalog.len(), "Catalog cache HIT");
            return Ok(Arc::new(catalog));
        }

        info!(key = key, "Catalog cache MISS, rebuilding from remote tree");

        let this = self.clone();
        self.flights
            .run(key, async move { this.rebuild().await })
            .await
    }

    /// Assemble the catalog and store it
    async fn rebuild(&self) -> Result<Arc<Catalog>, CatalogError> {
        let catalog = match self
            .assembler
            .build_catalog(&self.settings.root_folder_id)
            .await
        {
            Ok(catalog) => catalog,
            Err(e) => {
                warn!(error = %e, "Catalog rebuild failed, cache left untouched");
                return Err(e);
            }
        };

        cache::set_json_logged(
            self.store.as_ref(),
            &self.settings.cache_key,
            &catalog,
            self.settings.ttl,
        )
        .await;

        info!(
            key = %self.settings.cache_key,
            ttl_secs = self.settings.ttl.as_secs(),
            "Catalog cached"
        );
        Ok(Arc::new(catalog))
    }
}
