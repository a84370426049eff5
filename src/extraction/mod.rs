//! Archive extraction with an optional password
//!
//! This module routes a downloaded file to the ZIP, RAR or 7z codec by its suffix and
//! unpacks it with the password found in the message (if any). Each archive is
//! unpacked into its own subdirectory named after the archive file.

mod rar;
mod sevenz;
mod shared;
mod zip;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

// Re-exports
pub use rar::RarCodec;
pub use sevenz::SevenZipCodec;
pub use zip::ZipCodec;

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::types::{ArchiveKind, ExtractionRequest};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

/// Format-specific extraction routine
///
/// Implementations are blocking; the router runs them on the blocking thread pool.
pub trait ArchiveCodec: Send + Sync {
    /// Human-readable format name for logging
    fn name(&self) -> &'static str;

    /// Unpack `archive` into `dest`, returning the files written
    ///
    /// `None` means no credential is supplied to the codec.
    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>, ExtractionError>;
}

/// Result of a successful [`ArchiveExtractor::extract`] call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionOutcome {
    /// The archive was unpacked
    Extracted {
        /// Directory the entries were written to
        destination: PathBuf,
        /// Files written
        files: Vec<PathBuf>,
    },
    /// No codec handles this suffix; nothing was done
    Unsupported,
}

/// Something that can act on an [`ExtractionRequest`]
///
/// [`ArchiveCodecRouter`] is the production implementation; the ingestion pipeline
/// only depends on this trait.
#[async_trait]
pub trait ArchiveExtractor: Send + Sync {
    /// Extract the requested archive
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, ExtractionError>;
}

/// Routes archives to the codec for their format
#[derive(Clone)]
pub struct ArchiveCodecRouter {
    zip: Arc<dyn ArchiveCodec>,
    rar: Arc<dyn ArchiveCodec>,
    sevenz: Arc<dyn ArchiveCodec>,
    output_dir: Option<PathBuf>,
}

impl std::fmt::Debug for ArchiveCodecRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCodecRouter")
            .field("zip", &self.zip.name())
            .field("rar", &self.rar.name())
            .field("sevenz", &self.sevenz.name())
            .field("output_dir", &self.output_dir)
            .finish()
    }
}

impl Default for ArchiveCodecRouter {
    fn default() -> Self {
        Self::new(&ExtractionConfig::default())
    }
}

impl ArchiveCodecRouter {
    /// Router using the built-in ZIP, RAR and 7z codecs
    pub fn new(config: &ExtractionConfig) -> Self {
        Self::with_codecs(
            Arc::new(ZipCodec),
            Arc::new(RarCodec),
            Arc::new(SevenZipCodec),
            config,
        )
    }

    /// Router using caller-supplied codecs
    pub fn with_codecs(
        zip: Arc<dyn ArchiveCodec>,
        rar: Arc<dyn ArchiveCodec>,
        sevenz: Arc<dyn ArchiveCodec>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            zip,
            rar,
            sevenz,
            output_dir: config.output_dir.clone(),
        }
    }

    /// Whether a file name has one of the supported archive suffixes (.zip, .rar, .7z)
    pub fn is_archive(file_name: &str) -> bool {
        ArchiveKind::from_name(file_name).is_supported()
    }

    /// Directory an archive is unpacked into
    ///
    /// `<output_dir or archive parent>/<stem>_<extension>`, so `report.zip` and
    /// `report.7z` never share a directory.
    pub fn destination_for(&self, archive: &Path) -> PathBuf {
        let root = match &self.output_dir {
            Some(dir) => dir.clone(),
            None => archive
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        };
        let stem = archive
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "archive".to_string());
        let name = match archive.extension() {
            Some(ext) => format!("{stem}_{}", ext.to_string_lossy().to_lowercase()),
            None => stem,
        };
        root.join(name)
    }

    fn codec_for(&self, kind: ArchiveKind) -> Option<&Arc<dyn ArchiveCodec>> {
        match kind {
            ArchiveKind::Zip => Some(&self.zip),
            ArchiveKind::Rar => Some(&self.rar),
            ArchiveKind::SevenZip => Some(&self.sevenz),
            ArchiveKind::Unsupported => None,
        }
    }
}

#[async_trait]
impl ArchiveExtractor for ArchiveCodecRouter {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let archive_path = request.file_path.as_path();
        let kind = ArchiveKind::from_path(archive_path);

        let Some(codec) = self.codec_for(kind) else {
            info!(?archive_path, "unsupported archive type, skipping");
            return Ok(ExtractionOutcome::Unsupported);
        };

        let destination = self.destination_for(archive_path);
        debug!(
            ?archive_path,
            ?destination,
            %kind,
            has_password = request.password.is_some(),
            "dispatching extraction to {} codec",
            codec.name()
        );

        // Codec work is blocking file I/O
        let codec = Arc::clone(codec);
        let archive_owned = archive_path.to_path_buf();
        let dest_owned = destination.clone();
        let password = request.password.clone();

        let result = spawn_blocking(move || {
            codec.extract(&archive_owned, &dest_owned, password.as_deref())
        })
        .await
        .map_err(|e| ExtractionError::TaskFailed {
            archive: archive_path.to_path_buf(),
            reason: e.to_string(),
        })
        .and_then(|inner| inner);

        match result {
            Ok(files) => {
                info!(
                    ?archive_path,
                    ?destination,
                    extracted_count = files.len(),
                    "{} extraction successful",
                    kind
                );
                Ok(ExtractionOutcome::Extracted { destination, files })
            }
            Err(e) => {
                warn!(?archive_path, error = %e, "{} extraction failed", kind);
                Err(e)
            }
        }
    }
}
