//! Per-message pipeline: attachment check → download → password → extraction

use crate::client::MediaDownloader;
use crate::error::ExtractionError;
use crate::extraction::{ArchiveCodecRouter, ArchiveExtractor, ExtractionOutcome};
use crate::password::PasswordExtractor;
use crate::types::{ExtractionRequest, IncomingAttachment, IncomingMessage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What happened to one inbound message
#[derive(Debug)]
pub enum MessageOutcome {
    /// No attachment, or the attachment is not an archive
    Ignored,
    /// The downloader returned nothing for the attachment
    NotDownloaded,
    /// The download failed
    DownloadFailed,
    /// The archive was extracted
    Extracted {
        /// Downloaded archive
        archive: PathBuf,
        /// Files written
        files: Vec<PathBuf>,
    },
    /// No codec handled the downloaded file
    Unsupported {
        /// Downloaded file
        archive: PathBuf,
    },
    /// The codec failed
    ExtractionFailed {
        /// The codec error
        error: ExtractionError,
    },
}

/// Runs the per-message pipeline
///
/// Holds no per-message state, so any number of messages may be processed at once.
pub struct MessageProcessor {
    media: Arc<dyn MediaDownloader>,
    extractor: Arc<dyn ArchiveExtractor>,
    passwords: PasswordExtractor,
    download_dir: PathBuf,
}

impl MessageProcessor {
    /// Create a processor downloading attachments below `download_dir`
    pub fn new(
        media: Arc<dyn MediaDownloader>,
        extractor: Arc<dyn ArchiveExtractor>,
        download_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            media,
            extractor,
            passwords: PasswordExtractor::new(),
            download_dir: download_dir.into(),
        }
    }

    /// Process one message; failures are logged and reported in the outcome
    pub async fn process(&self, message: &IncomingMessage) -> MessageOutcome {
        let file_name = message.attachment_name();
        if message.attachment.is_none() || !ArchiveCodecRouter::is_archive(file_name) {
            return MessageOutcome::Ignored;
        }

        debug!(
            chat_id = %message.chat_id,
            message_id = message.message_id,
            file_name,
            "archive attachment detected, downloading"
        );

        let media = match self.media.download(message, &self.download_dir).await {
            Ok(Some(media)) => media,
            Ok(None) => {
                debug!(
                    chat_id = %message.chat_id,
                    message_id = message.message_id,
                    "attachment yielded nothing to download"
                );
                return MessageOutcome::NotDownloaded;
            }
            Err(e) => {
                warn!(
                    chat_id = %message.chat_id,
                    message_id = message.message_id,
                    error = %e,
                    "failed to download attachment"
                );
                return MessageOutcome::DownloadFailed;
            }
        };

        let attachment = IncomingAttachment {
            file_name: file_name.to_string(),
            local_path: media.disk_path,
            message_text: message.text.clone().unwrap_or_default(),
            source_channel_id: message.chat_id,
        };

        let request = ExtractionRequest::new(
            attachment.local_path.clone(),
            self.passwords.extract(Some(&attachment.message_text)),
        );

        match self.extractor.extract(&request).await {
            Ok(ExtractionOutcome::Extracted { files, .. }) => {
                info!(
                    chat_id = %attachment.source_channel_id,
                    archive = ?attachment.local_path,
                    extracted_count = files.len(),
                    "extracted archive attachment"
                );
                MessageOutcome::Extracted {
                    archive: request.file_path,
                    files,
                }
            }
            Ok(ExtractionOutcome::Unsupported) => MessageOutcome::Unsupported {
                archive: request.file_path,
            },
            Err(e) => {
                error!(
                    chat_id = %attachment.source_channel_id,
                    archive = ?e.archive(),
                    error = %e,
                    "failed to extract archive attachment"
                );
                MessageOutcome::ExtractionFailed { error: e }
            }
        }
    }
}
