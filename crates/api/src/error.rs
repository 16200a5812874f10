//! Error types for manifest retrieval.

use std::{fmt, time::Duration};

use reqwest::StatusCode;
use thiserror::Error;

/// Failure surfaced by [`crate::ManifestFetcher::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid manifest URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("manifest at {url} unreachable after {attempts} attempt(s): {cause}")]
    Unreachable { url: String, attempts: u32, cause: FailureCause },

    #[error("manifest at {url} is not a valid layer manifest: {source}")]
    InvalidManifest {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("fetch of {url} was cancelled")]
    Cancelled { url: String },
}

impl FetchError {
    /// URL the failed fetch targeted.
    pub fn url(&self) -> &str {
        match self {
            Self::InvalidUrl { url, .. }
            | Self::Unreachable { url, .. }
            | Self::InvalidManifest { url, .. }
            | Self::Cancelled { url } => url,
        }
    }

    /// HTTP status of the last response, when the fetch ended on one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Unreachable {
                cause: FailureCause::Status(status),
                ..
            } => Some(*status),
            _ => None,
        }
    }
}

/// Why the last attempt of a fetch failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The server answered with a non-success status.
    Status(StatusCode),
    /// The attempt did not complete within the configured timeout.
    TimedOut(Duration),
    /// Connection or protocol failure reported by the transport.
    Transport(String),
}

impl FailureCause {
    /// Whether another attempt could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Status(status) => status.is_server_error(),
            Self::TimedOut(_) | Self::Transport(_) => true,
        }
    }
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::TimedOut(timeout) => write!(f, "timed out after {}ms", timeout.as_millis()),
            Self::Transport(message) => write!(f, "network error: {message}"),
        }
    }
}
