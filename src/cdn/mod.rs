//! CDN image host client

pub mod client;
pub mod errors;

pub use client::{CdnCredentials, CloudinaryClient};
pub use errors::CdnError;
