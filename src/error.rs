// Error types for the backup pipeline.

use std::path::PathBuf;

/// Errors raised while listing, resolving or downloading environment states.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    /// The request never produced a response (connect, TLS, body read).
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The session cookie was refused.
    #[error("session rejected: HTTP {status} from {url}")]
    AuthRejected { status: u16, url: String },

    /// Any other non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// The body did not match the expected JSON shape.
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    /// The environment has no state versions at all.
    #[error("no state versions found for environment {environment}")]
    NoStateVersions { environment: String },

    /// The environment name cannot be used as a file name.
    #[error("environment name {0:?} is not a valid file name")]
    InvalidEnvironmentName(String),

    /// The configured base URL cannot carry path segments.
    #[error("invalid base URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// Filesystem error while writing an artifact.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl BackupError {
    /// True when the session cookie itself is the problem.
    pub fn is_auth_rejected(&self) -> bool {
        matches!(self, Self::AuthRejected { .. })
    }
}

/// Result type for backup operations.
pub type Result<T> = std::result::Result<T, BackupError>;
