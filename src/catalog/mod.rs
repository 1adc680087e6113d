//! Catalog core
//!
//! Cache-aside aggregation of the remote folder tree into the product
//! catalog: listing seam, asset mirror, assembler and the caching front.

pub mod assembler;
pub mod errors;
pub mod flight;
pub mod images;
pub mod lister;
pub mod mirror;
pub mod policy;
pub mod service;
pub mod types;

pub use assembler::CatalogAssembler;
pub use errors::CatalogError;
pub use flight::SingleFlight;
pub use images::ImageProxy;
pub use lister::TreeLister;
pub use mirror::{AssetContent, AssetMirror, AssetSink, ByteStream, ContentSource, UploadRequest};
pub use policy::ReadFailurePolicy;
pub use service::{CatalogService, CatalogSettings};
pub use types::*;
