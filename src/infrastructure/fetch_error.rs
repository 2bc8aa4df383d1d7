//! Page fetch error taxonomy
//!
//! Every variant is a transient or permanent outbound failure; none of them is
//! allowed to abort a catalog request, callers log and skip the URL.

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FetchError {
    #[error("request to {url} failed: {message}")]
    Transport {
        url: String,
        message: String,
        timed_out: bool,
    },

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("throttled (HTTP 429) by {url}")]
    Throttled { url: String },

    #[error("empty response body from {url}")]
    EmptyBody { url: String },

    #[error("giving up on {url} after {attempts} attempts: {last}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last: Box<FetchError>,
    },

    #[error("HTTP client configuration error: {message}")]
    Config { message: String },
}

impl FetchError {
    /// Classify a non-success status code
    pub fn from_status(status: u16, url: &str) -> Self {
        if status == 429 {
            Self::Throttled { url: url.to_string() }
        } else {
            Self::Status {
                status,
                url: url.to_string(),
            }
        }
    }

    pub fn is_throttled(&self) -> bool {
        matches!(self, Self::Throttled { .. })
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Throttled { .. } => Some(429),
            Self::RetriesExhausted { last, .. } => last.status(),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. }
            | Self::Status { url, .. }
            | Self::Throttled { url }
            | Self::EmptyBody { url }
            | Self::RetriesExhausted { url, .. } => Some(url),
            Self::Config { .. } => None,
        }
    }
}

pub type FetchResult<T> = Result<T, FetchError>;
