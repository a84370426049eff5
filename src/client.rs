//! Collaborator traits for the messaging transport
//!
//! The session protocol itself lives outside this crate. Embedders implement
//! [`MessagingClient`] and [`MediaDownloader`] over their transport of choice, and
//! the discovery and ingestion components only ever talk to these traits.
//!
//! Callback-style transports can feed the subscription stream through
//! [`message_channel`]:
//!
//! ```no_run
//! use channel_harvester::client::message_channel;
//!
//! let (tx, stream) = message_channel(64);
//! // register `tx` with the transport's new-message callback,
//! // and return `stream` from `MessagingClient::subscribe_new_messages`
//! # drop((tx, stream));
//! ```

use crate::error::{DirectoryError, DownloadError, JoinError, Result};
use crate::types::{ChannelCandidate, DownloadedMedia, IncomingMessage};
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::fmt;
use std::path::Path;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// Lazy, finite channel directory listing
pub type DirectoryStream<'a> = BoxStream<'a, std::result::Result<ChannelCandidate, DirectoryError>>;

/// Unbounded sequence of inbound messages; ends when the transport closes it
pub type MessageStream = BoxStream<'static, IncomingMessage>;

/// What a join request refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinTarget<'a> {
    /// An identifier from the catalog's explicit list (handle or link, as written)
    Explicit(&'a str),
    /// A directory entry matched by a catalog pattern
    Discovered(&'a ChannelCandidate),
}

impl fmt::Display for JoinTarget<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Explicit(identifier) => f.write_str(identifier),
            Self::Discovered(candidate) => {
                if candidate.identifier.is_empty() {
                    write!(f, "{} ({})", candidate.display_name, candidate.channel_id)
                } else {
                    f.write_str(&candidate.identifier)
                }
            }
        }
    }
}

/// Long-lived messaging session
#[async_trait]
pub trait MessagingClient: Send + Sync {
    /// Join a channel
    ///
    /// Whether joining an already-joined channel is an error is up to the transport.
    async fn join_channel(&self, target: JoinTarget<'_>) -> std::result::Result<(), JoinError>;

    /// List channels visible to the session
    ///
    /// Each call starts a fresh listing. Items are fetched lazily as the stream is polled.
    fn directory(&self) -> DirectoryStream<'_>;

    /// Subscribe to new messages
    ///
    /// Dropping the returned stream unregisters the subscription.
    async fn subscribe_new_messages(&self) -> Result<MessageStream>;
}

/// Materializes message attachments on disk
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Download the attachment of `message` below `destination`
    ///
    /// `Ok(None)` means the transport had nothing to download; the message is skipped.
    async fn download(
        &self,
        message: &IncomingMessage,
        destination: &Path,
    ) -> std::result::Result<Option<DownloadedMedia>, DownloadError>;
}

/// Sending half of a [`message_channel`]
pub type MessageSender = mpsc::Sender<IncomingMessage>;

/// Bridge a callback-driven transport into a [`MessageStream`]
///
/// The stream ends once every sender has been dropped.
pub fn message_channel(buffer: usize) -> (MessageSender, MessageStream) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (tx, Box::pin(ReceiverStream::new(rx)))
}
