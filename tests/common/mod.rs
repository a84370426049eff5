//! Shared mocks and fixtures for end-to-end harvester tests

#![allow(dead_code)]

use async_trait::async_trait;
use channel_harvester::client::{DirectoryStream, MessageSender, MessageStream, message_channel};
use channel_harvester::{
    Attachment, ChannelCandidate, ChatId, DirectoryError, DownloadError, DownloadedMedia,
    IncomingMessage, JoinError, JoinTarget, MediaDownloader, MessagingClient,
};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Channel id used for every test message
pub const SOURCE_CHAT: i64 = -100_555;

/// In-memory messaging session
///
/// Records join requests in order and exposes the directory as a fixed list.
pub struct MockClient {
    directory: Vec<ChannelCandidate>,
    pub joins: Mutex<Vec<String>>,
    pub directory_reads: AtomicUsize,
    stream: Mutex<Option<MessageStream>>,
}

impl MockClient {
    pub fn new(directory: Vec<ChannelCandidate>) -> (Self, MessageSender) {
        let (tx, stream) = message_channel(32);
        let client = Self {
            directory,
            joins: Mutex::new(Vec::new()),
            directory_reads: AtomicUsize::new(0),
            stream: Mutex::new(Some(stream)),
        };
        (client, tx)
    }

    pub fn joined(&self) -> Vec<String> {
        self.joins.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessagingClient for MockClient {
    async fn join_channel(&self, target: JoinTarget<'_>) -> Result<(), JoinError> {
        self.joins.lock().unwrap().push(target.to_string());
        Ok(())
    }

    fn directory(&self) -> DirectoryStream<'_> {
        self.directory_reads.fetch_add(1, Ordering::SeqCst);
        let entries: Vec<Result<ChannelCandidate, DirectoryError>> =
            self.directory.iter().cloned().map(Ok).collect();
        Box::pin(futures::stream::iter(entries))
    }

    async fn subscribe_new_messages(&self) -> channel_harvester::Result<MessageStream> {
        self.stream.lock().unwrap().take().ok_or_else(|| {
            channel_harvester::Error::Subscription("already subscribed".to_string())
        })
    }
}

/// Downloader that writes pre-registered attachment bytes to disk
#[derive(Default)]
pub struct FixtureMedia {
    files: HashMap<String, Vec<u8>>,
    pub downloads: AtomicUsize,
}

impl FixtureMedia {
    pub fn with_file(mut self, name: &str, bytes: Vec<u8>) -> Self {
        self.files.insert(name.to_string(), bytes);
        self
    }
}

#[async_trait]
impl MediaDownloader for FixtureMedia {
    async fn download(
        &self,
        message: &IncomingMessage,
        destination: &Path,
    ) -> Result<Option<DownloadedMedia>, DownloadError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let name = message.attachment_name();
        let Some(bytes) = self.files.get(name) else {
            return Ok(None);
        };

        let dir = destination.join(message.chat_id.to_string());
        let path = dir.join(name);
        let io_err = |source| DownloadError::Io {
            path: path.clone(),
            source,
        };
        tokio::fs::create_dir_all(&dir).await.map_err(io_err)?;
        tokio::fs::write(&path, bytes).await.map_err(io_err)?;
        Ok(Some(DownloadedMedia { disk_path: path }))
    }
}

pub fn broadcast(id: i64, handle: &str, title: &str) -> ChannelCandidate {
    ChannelCandidate {
        channel_id: id,
        identifier: handle.to_string(),
        display_name: title.to_string(),
        is_broadcast: true,
    }
}

pub fn message(id: i64, file_name: &str, text: &str) -> IncomingMessage {
    IncomingMessage {
        message_id: id,
        chat_id: ChatId(SOURCE_CHAT),
        text: Some(text.to_string()),
        attachment: Some(Attachment {
            file_name: Some(file_name.to_string()),
            ..Default::default()
        }),
    }
}

/// Build a stored ZIP in memory, optionally ZipCrypto-encrypted
pub fn zip_bytes(entries: &[(&str, &[u8])], password: Option<&[u8]>) -> Vec<u8> {
    use zip::unstable::write::FileOptionsExt;

    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let mut options =
        zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Stored);
    if let Some(password) = password {
        options = options.with_deprecated_encryption(password);
    }
    for (name, content) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Poll until `path` exists, panicking after two seconds
pub async fn wait_for_file(path: &Path) -> PathBuf {
    for _ in 0..200 {
        if path.exists() {
            return path.to_path_buf();
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {}", path.display());
}
