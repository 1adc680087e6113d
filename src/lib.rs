//! Catalog Mirror
//!
//! Serves a product catalog assembled from a two-level folder tree on a
//! remote storage provider, with every image mirrored to a CDN and both the
//! per-image URLs and the assembled catalog kept in a TTL cache.

pub mod cache;
pub mod catalog;
pub mod cdn;
pub mod config;
pub mod drive;
pub mod server;
