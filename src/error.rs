//! Error types for the IPTV player

/// Result type alias for player and storage operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while importing, storing or playing channels
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing key-value store cannot be reached
    #[error("Storage API not available")]
    Unavailable,

    /// No channel carries the requested id
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// Text that was expected to be a stream URL is not one
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),

    /// Another stored channel already plays this URL
    #[error("URL already used by channel {id}: {url}")]
    DuplicateUrl { url: String, id: String },

    /// Playlist download returned a non-200 status
    #[error("HTTP error: {0}")]
    HttpStatus(u16),

    /// Playlist download failed at the transport level
    #[error("Request failed: {0}")]
    Http(#[from] ureq::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// External player could not be driven
    #[error("Player error: {0}")]
    Player(String),

    /// A named storage operation failed
    #[error("Failed to {op}: {source}")]
    Operation {
        op: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap this error with the name of the operation that failed
    pub fn during(self, op: &'static str) -> Self {
        Error::Operation {
            op,
            source: Box::new(self),
        }
    }

    /// True when the root cause is a missing channel
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::ChannelNotFound(_) => true,
            Error::Operation { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// True when the root cause is an unreachable store
    pub fn is_unavailable(&self) -> bool {
        match self {
            Error::Unavailable => true,
            Error::Operation { source, .. } => source.is_unavailable(),
            _ => false,
        }
    }
}
