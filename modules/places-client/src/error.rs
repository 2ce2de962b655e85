use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlacesError>;

#[derive(Debug, Error)]
pub enum PlacesError {
    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Catalog status {status}: {message}")]
    Status { status: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl PlacesError {
    /// Whether a failure is worth retrying with backoff.
    ///
    /// Timeouts, rate limiting, and server-side errors are transient.
    /// Bad-request class failures (invalid key, malformed request) are
    /// terminal and propagate on the first occurrence.
    pub fn is_retryable(&self) -> bool {
        match self {
            PlacesError::Timeout => true,
            PlacesError::Api { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503)
            }
            PlacesError::Status { status, .. } => {
                matches!(status.as_str(), "OVER_QUERY_LIMIT" | "UNKNOWN_ERROR")
            }
            PlacesError::Network(_) | PlacesError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for PlacesError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            PlacesError::Timeout
        } else if err.is_decode() {
            PlacesError::Parse(err.to_string())
        } else {
            PlacesError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for PlacesError {
    fn from(err: serde_json::Error) -> Self {
        PlacesError::Parse(err.to_string())
    }
}
