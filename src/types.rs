//! Core types shared by discovery and ingestion

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of the chat a message was posted in
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ChatId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Read-only view of one channel directory entry
///
/// Produced by [`MessagingClient::directory`](crate::client::MessagingClient::directory)
/// and only kept while it is being evaluated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelCandidate {
    /// Transport-level channel id
    pub channel_id: i64,
    /// Public handle (may be empty for private channels)
    pub identifier: String,
    /// Channel title (may be empty)
    pub display_name: String,
    /// Broadcast channels are the only entries evaluated against patterns
    pub is_broadcast: bool,
}

impl ChannelCandidate {
    /// Text the catalog patterns are matched against: `"<identifier> <display name>"`
    pub fn match_text(&self) -> String {
        format!("{} {}", self.identifier, self.display_name)
    }
}

/// File attached to an inbound message, as announced by the transport
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original file name (None when the transport did not provide one)
    pub file_name: Option<String>,
    /// Size in bytes, if known
    pub size: Option<u64>,
    /// MIME type, if known
    pub mime_type: Option<String>,
}

/// Inbound message delivered by the subscription stream
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    /// Transport-level message id
    pub message_id: i64,
    /// Chat the message was posted in
    pub chat_id: ChatId,
    /// Free text (caption or body)
    pub text: Option<String>,
    /// Attached file, if any
    pub attachment: Option<Attachment>,
}

impl IncomingMessage {
    /// File name of the attachment, empty when there is no attachment or no name
    pub fn attachment_name(&self) -> &str {
        self.attachment
            .as_ref()
            .and_then(|a| a.file_name.as_deref())
            .unwrap_or("")
    }
}

/// Downloaded media returned by a [`MediaDownloader`](crate::client::MediaDownloader)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DownloadedMedia {
    /// Where the attachment was written
    pub disk_path: PathBuf,
}

/// An archive attachment after it has been materialized on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IncomingAttachment {
    /// Original file name
    pub file_name: String,
    /// Path of the downloaded file
    pub local_path: PathBuf,
    /// Message text the password is looked up in
    pub message_text: String,
    /// Chat the attachment came from
    pub source_channel_id: ChatId,
}

/// One extraction attempt: archive path plus the password found in the message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractionRequest {
    /// Archive to extract
    pub file_path: PathBuf,
    /// Candidate password (None = extract without a credential)
    pub password: Option<String>,
}

impl ExtractionRequest {
    /// Create a request for the given archive
    pub fn new(file_path: impl Into<PathBuf>, password: Option<String>) -> Self {
        Self {
            file_path: file_path.into(),
            password,
        }
    }
}

/// Archive format selected by file-name suffix
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveKind {
    /// ZIP archive (.zip)
    Zip,
    /// RAR archive (.rar)
    Rar,
    /// 7-Zip archive (.7z)
    SevenZip,
    /// Anything else
    Unsupported,
}

impl ArchiveKind {
    /// Classify a file name by its lowercase suffix
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") {
            Self::Zip
        } else if lower.ends_with(".rar") {
            Self::Rar
        } else if lower.ends_with(".7z") {
            Self::SevenZip
        } else {
            Self::Unsupported
        }
    }

    /// Classify a path by its lowercase suffix
    pub fn from_path(path: &Path) -> Self {
        Self::from_name(&path.to_string_lossy())
    }

    /// Whether an extractor exists for this kind
    pub fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

impl fmt::Display for ArchiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Zip => "ZIP",
            Self::Rar => "RAR",
            Self::SevenZip => "7z",
            Self::Unsupported => "unsupported",
        };
        f.write_str(name)
    }
}
