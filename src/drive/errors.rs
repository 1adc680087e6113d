//! Drive API Error Types
//!
//! Structured error handling for the remote file-storage provider.
//! Maps HTTP status codes to specific error variants so callers can log and
//! surface them without string matching.

/// Drive API error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum DriveError {
    #[error("Unauthorized: credentials rejected")]
    Unauthorized,

    #[error("Rate limited by the storage provider")]
    RateLimited,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    #[error("Request timeout")]
    Timeout,

    #[error("Request error: {0}")]
    Request(String),

    #[error("Malformed response: {0}")]
    Decode(String),
}

impl DriveError {
    /// Create a DriveError from an HTTP status code and response body
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 => DriveError::Unauthorized,
            403 => DriveError::Forbidden(body.to_string()),
            404 => DriveError::NotFound(body.to_string()),
            408 => DriveError::Timeout,
            429 => DriveError::RateLimited,
            500..=599 => DriveError::Server(status, body.to_string()),
            _ => DriveError::Request(format!("HTTP {}: {}", status, body)),
        }
    }
}

impl From<reqwest::Error> for DriveError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DriveError::Timeout
        } else if err.is_decode() {
            DriveError::Decode(err.to_string())
        } else if err.is_connect() || err.is_request() || err.is_body() {
            DriveError::Network(err.to_string())
        } else {
            DriveError::Request(err.to_string())
        }
    }
}
