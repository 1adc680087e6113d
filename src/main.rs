//! Catalog Mirror - product catalog service
//!
//! Wires the storage provider, CDN and cache clients into the catalog core
//! and serves it over HTTP until Ctrl+C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use catalog_mirror::cache::{KvStore, MemoryStore, UpstashStore};
use catalog_mirror::catalog::{AssetMirror, CatalogAssembler, CatalogService, ImageProxy};
use catalog_mirror::cdn::CloudinaryClient;
use catalog_mirror::config::{CacheBackend, Config};
use catalog_mirror::drive::DriveClient;
use catalog_mirror::server::{self, AppState};

/// How often the in-process store logs its hit rate
const METRICS_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let drive = Arc::new(DriveClient::new(
        &config.drive.api_url,
        config.drive.auth.clone(),
        config.request_timeout,
    )?);
    let cdn = Arc::new(CloudinaryClient::new(
        &config.cdn.api_url,
        config.cdn.credentials.clone(),
        config.request_timeout,
    )?);

    let store: Arc<dyn KvStore> = match &config.cache {
        CacheBackend::Upstash { url, token } => {
            info!(url = %url, "Using Redis REST cache");
            Arc::new(UpstashStore::new(url, token, config.request_timeout)?)
        }
        CacheBackend::Memory => {
            warn!("No cache endpoint configured, using in-process store");
            let memory = Arc::new(MemoryStore::new());
            let metrics = Arc::clone(&memory);
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(METRICS_INTERVAL);
                loop {
                    interval.tick().await;
                    metrics.log_metrics();
                }
            });
            memory
        }
    };

    let mirror = AssetMirror::new(store.clone(), drive.clone(), cdn, config.cdn.folder.clone())
        .with_ttl(config.asset_url_ttl)
        .with_read_policy(config.catalog.read_policy);
    let assembler = Arc::new(CatalogAssembler::with_concurrency(
        drive.clone(),
        mirror,
        config.concurrency,
    ));
    let images = ImageProxy::new(store.clone(), drive).with_read_policy(config.catalog.read_policy);
    let catalog = CatalogService::new(store, assembler, config.catalog.clone());

    info!(
        root = %config.catalog.root_folder_id,
        concurrency = config.concurrency,
        "Catalog service configured"
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let (local_addr, handle) = server::serve(addr, AppState { catalog, images }, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        info!("Received shutdown signal, stopping server...");
    })
    .await?;

    info!(addr = %local_addr, "Backend running on http://{}", local_addr);

    handle.await.context("HTTP server task failed")?;

    info!("Shutdown complete.");
    Ok(())
}
