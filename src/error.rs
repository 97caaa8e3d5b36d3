//! Error types for Easy Bookmarks.

use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by host calls and library operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The host platform reported a failure (bookmarks, storage, top sites).
    #[error("host API call failed: {0}")]
    Host(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An image probe did not yield a decodable image.
    #[error("image probe failed for {url}: {reason}")]
    Probe { url: String, reason: String },

    /// A favicon service request failed or returned an unusable body.
    #[error("favicon fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("unknown group: {0}")]
    UnknownGroup(String),

    #[error("unknown bookmark: {0}")]
    UnknownBookmark(String),

    /// A group needs two distinct bookmark ids.
    #[error("cannot group {0} with {1}")]
    InvalidGroupMembers(String, String),

    #[error("import failed: {0}")]
    Import(String),
}

impl Error {
    pub fn host(message: impl Into<String>) -> Self {
        Error::Host(message.into())
    }
}
