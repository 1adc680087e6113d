//! CDN API Error Types

/// CDN upload error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum CdnError {
    #[error("Upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Source stream failed during upload: {0}")]
    Stream(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for CdnError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CdnError::Timeout
        } else if err.is_body() {
            CdnError::Stream(err.to_string())
        } else if err.is_decode() {
            CdnError::Decode(err.to_string())
        } else {
            CdnError::Network(err.to_string())
        }
    }
}
