//! Cache backend error types

/// Key-value cache error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum CacheError {
    #[error("Cache backend rejected credentials")]
    Unauthorized,

    #[error("Cache backend error: {0}")]
    Backend(String),

    #[error("Cache network error: {0}")]
    Network(String),

    #[error("Cache value could not be decoded: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CacheError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            CacheError::Decode(err.to_string())
        } else {
            CacheError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Decode(err.to_string())
    }
}
