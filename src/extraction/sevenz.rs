use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::ArchiveCodec;
use super::shared::{collect_files, ensure_destination, is_password_error, validate_extracted_paths};

/// 7z codec; the password applies uniformly to every entry
#[derive(Debug, Clone, Copy, Default)]
pub struct SevenZipCodec;

impl ArchiveCodec for SevenZipCodec {
    fn name(&self) -> &'static str {
        "7z"
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
            "attempting 7z extraction"
        );

        if !archive_path.is_file() {
            return Err(ExtractionError::io(
                archive_path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "archive not found"),
            ));
        }

        ensure_destination(dest_path, archive_path)?;

        let result = match password {
            Some(password) => sevenz_rust::decompress_file_with_password(
                archive_path,
                dest_path,
                sevenz_rust::Password::from(password),
            ),
            None => sevenz_rust::decompress_file(archive_path, dest_path),
        };

        if let Err(e) = result {
            let err_str = e.to_string();
            return Err(if is_password_error(&err_str) {
                ExtractionError::WrongPassword {
                    archive: archive_path.to_path_buf(),
                }
            } else {
                ExtractionError::corrupt(archive_path, format!("failed to extract 7z archive: {}", e))
            });
        }

        // The decoder writes entries itself, so containment is checked afterwards
        validate_extracted_paths(dest_path, archive_path)?;
        collect_files(dest_path, archive_path)
    }
}
