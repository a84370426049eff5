use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ArchiveCodec;
use super::shared::{ensure_destination, is_password_error, safe_entry_path};

/// RAR codec backed by the unrar library; a password is passed as text
#[derive(Debug, Clone, Copy, Default)]
pub struct RarCodec;

impl RarCodec {
    /// Convert an unrar error to our error type, checking for password errors
    fn convert_unrar_error(e: unrar::error::UnrarError, archive_path: &Path) -> ExtractionError {
        let err_str = e.to_string();
        if is_password_error(&err_str) {
            ExtractionError::WrongPassword {
                archive: archive_path.to_path_buf(),
            }
        } else {
            ExtractionError::corrupt(archive_path, err_str)
        }
    }
}

impl ArchiveCodec for RarCodec {
    fn name(&self) -> &'static str {
        "RAR"
    }

    fn extract(
        &self,
        archive_path: &Path,
        dest_path: &Path,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        debug!(
            ?archive_path,
            ?dest_path,
            has_password = password.is_some(),
            "attempting RAR extraction"
        );

        let archive = match password {
            Some(password) => unrar::Archive::with_password(archive_path, password.as_bytes()),
            None => unrar::Archive::new(archive_path),
        };

        let mut at_header = archive
            .open_for_processing()
            .map_err(|e| Self::convert_unrar_error(e, archive_path))?;

        ensure_destination(dest_path, archive_path)?;

        let mut extracted_files = Vec::new();
        loop {
            let at_file = match at_header.read_header() {
                Ok(Some(entry_processor)) => entry_processor,
                Ok(None) => break,
                Err(e) => return Err(Self::convert_unrar_error(e, archive_path)),
            };

            let header = at_file.entry();
            let is_directory = header.is_directory();

            let Some(relative) = safe_entry_path(&header.filename) else {
                warn!(?archive_path, entry = ?header.filename, "skipping entry with unsafe path");
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
                continue;
            };

            if is_directory {
                at_header = at_file
                    .skip()
                    .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
                continue;
            }

            let file_path = dest_path.join(&relative);
            if let Some(parent) = file_path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| ExtractionError::io(archive_path, e))?;
            }

            at_header = at_file
                .extract_to(&file_path)
                .map_err(|e| Self::convert_unrar_error(e, archive_path))?;
            extracted_files.push(file_path);
        }

        Ok(extracted_files)
    }
}
