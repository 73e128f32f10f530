// Error types for stationtap.
// Covers backend fetch errors, proxy substrate errors, cache I/O and analysis errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Backend request error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Reverse geocoding failed: {0}")]
    Geocode(String),

    #[error("Certificate authority error: {0}")]
    Certificate(String),

    #[error("Proxy error: {0}")]
    Proxy(#[from] hudsucker::Error),

    #[error("Locality directory not found: {0}")]
    LocalityNotFound(String),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
