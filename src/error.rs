//! Error types for channel-harvester
//!
//! Every error below is caught as close to its cause as possible and turned into a
//! log entry. None of them stop the discovery scan or the message subscription:
//! - [`ConfigLoadError`] - catalog source missing or unreadable (empty catalog fallback)
//! - [`PatternCompileError`] - a single bad regex (entry skipped)
//! - [`JoinError`] - one channel could not be joined
//! - [`DirectoryError`] - one directory entry could not be read
//! - [`DownloadError`] - one attachment could not be materialized
//! - [`ExtractionError`] - one archive could not be extracted
//!
//! [`Error`] is the crate-level type returned by construction and lifecycle calls
//! (configuration, subscription, startup).

use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Result type alias for channel-harvester operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for channel-harvester
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Catalog or configuration document could not be loaded
    #[error(transparent)]
    ConfigLoad(#[from] ConfigLoadError),

    /// Channel join failed
    #[error(transparent)]
    Join(#[from] JoinError),

    /// Channel directory listing failed
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Attachment download failed
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// Archive extraction failed
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Subscribing to the message stream failed
    #[error("subscription error: {0}")]
    Subscription(String),

    /// `start()` was called on a component that is already running
    #[error("already started")]
    AlreadyStarted,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for an [`Error::Config`] tied to a specific key
    pub fn config(key: &str, message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}

/// Failure to load a declarative document (catalog source or harvester config)
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The source file does not exist
    #[error("source document not found: {path}")]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// The source file exists but could not be read
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid YAML or has the wrong shape
    #[error("failed to parse {path}: {reason}")]
    Parse {
        /// Path of the malformed document
        path: PathBuf,
        /// Parser message
        reason: String,
    },
}

/// A single catalog regex that failed to compile
#[derive(Debug, Error)]
#[error("invalid pattern '{pattern}': {source}")]
pub struct PatternCompileError {
    /// The pattern source as written in the catalog
    pub pattern: String,
    /// The compiler error
    #[source]
    pub source: regex::Error,
}

/// Failure reported by the messaging client for one join request
#[derive(Debug, Error)]
pub enum JoinError {
    /// The account is already a member of the channel
    #[error("already a participant of {target}")]
    AlreadyParticipant {
        /// Channel that was requested
        target: String,
    },

    /// The handle, link or entity does not resolve to a joinable channel
    #[error("invalid join target {target}: {reason}")]
    InvalidTarget {
        /// Channel that was requested
        target: String,
        /// Why the target was rejected
        reason: String,
    },

    /// The transport refused the request because of flood limits
    #[error("rate limited while joining {target}")]
    RateLimited {
        /// Channel that was requested
        target: String,
        /// How long the server asked us to wait, if it said
        retry_after: Option<Duration>,
    },

    /// Any other transport failure
    #[error("failed to join {target}: {reason}")]
    Transport {
        /// Channel that was requested
        target: String,
        /// Transport error message
        reason: String,
    },
}

/// A directory entry that could not be produced by the client
#[derive(Debug, Error)]
#[error("directory listing error: {0}")]
pub struct DirectoryError(pub String);

/// Attachment materialization failure
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The transport failed to deliver the media
    #[error("failed to download attachment from chat {chat_id}: {reason}")]
    Transport {
        /// Chat the message came from
        chat_id: i64,
        /// Transport error message
        reason: String,
    },

    /// Writing the media to disk failed
    #[error("failed to write attachment to {path}: {source}")]
    Io {
        /// Where the file was being written
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Archive extraction failure (always non-fatal to the pipeline)
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Password missing or incorrect for an encrypted archive
    #[error("wrong or missing password for archive {archive}")]
    WrongPassword {
        /// The encrypted archive that could not be opened
        archive: PathBuf,
    },

    /// The archive is damaged or not in the format its extension claims
    #[error("extraction failed for {archive}: {reason}")]
    Corrupt {
        /// The archive file that failed to extract
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },

    /// Filesystem error while reading the archive or writing entries
    #[error("I/O error extracting {archive}: {source}")]
    Io {
        /// The archive being extracted
        archive: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An entry would have been written outside the destination directory
    #[error("unsafe entry path in {archive}: {entry}")]
    UnsafePath {
        /// The archive containing the entry
        archive: PathBuf,
        /// The offending entry path
        entry: String,
    },

    /// The blocking extraction task panicked or was cancelled
    #[error("extraction task for {archive} failed: {reason}")]
    TaskFailed {
        /// The archive being extracted
        archive: PathBuf,
        /// Join error message
        reason: String,
    },
}

impl ExtractionError {
    /// Path of the archive this error refers to
    pub fn archive(&self) -> &Path {
        match self {
            Self::WrongPassword { archive }
            | Self::Corrupt { archive, .. }
            | Self::Io { archive, .. }
            | Self::UnsafePath { archive, .. }
            | Self::TaskFailed { archive, .. } => archive,
        }
    }

    /// Whether the failure is due to the password (as opposed to the archive itself)
    pub fn is_password_error(&self) -> bool {
        matches!(self, Self::WrongPassword { .. })
    }

    pub(crate) fn io(archive: &Path, source: std::io::Error) -> Self {
        Self::Io {
            archive: archive.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt(archive: &Path, reason: impl Into<String>) -> Self {
        Self::Corrupt {
            archive: archive.to_path_buf(),
            reason: reason.into(),
        }
    }
}
