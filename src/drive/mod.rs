//! Remote file-storage provider client

pub mod client;
pub mod errors;
pub mod types;

pub use client::{DriveAuth, DriveClient};
pub use errors::DriveError;
pub use types::*;
