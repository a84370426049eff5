use crate::error::ExtractionError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::ArchiveCodec;
use super::shared::{ensure_destination, is_password_error};

/// ZIP codec; a password is passed to the decryptor as raw bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipCodec;

impl ZipCodec {
    /// Map a zip crate error, detecting password failures by message
    fn convert_zip_error(e: ::zip::result::ZipError, archive_path: &Path) -> ExtractionError {
        let err_str = e.to_string();
        if is_password_error(&err_str) {
            ExtractionError::WrongPassword {
                archive: archive_path.to_path_buf(),
            }
        } else {
            ExtractionError::corrupt(archive_path, format!("failed to read ZIP entry: {}", e))
        }
    }

    /// Open a ZIP entry by index, decrypting it when a password is supplied
    fn open_zip_entry<'a>(
        archive: &'a mut ::zip::ZipArchive<std::fs::File>,
        index: usize,
        password: Option<&str>,
        archive_path: &Path,
    ) -> Result<::zip::read::ZipFile<'a>, ExtractionError> {
        match password {
            None => archive
                .by_index(index)
                .map_err(|e| Self::convert_zip_error(e, archive_path)),
            Some(password) => archive
                .by_index_decrypt(index, password.as_bytes())
                .map_err(|e| Self::convert_zip_error(e, archive_path))?
                .map_err(|_| ExtractionError::WrongPassword {
                    archive: archive_path.to_path_buf(),
                }),
        }
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_zip_entry(
        mut file: ::zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>, ExtractionError> {
        let file_path = match file.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(?archive_path, entry = file.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if file.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| ExtractionError::io(archive_path, e))?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ExtractionError::io(archive_path, e))?;
        }

        let mut outfile =
            std::fs::File::create(&file_path).map_err(|e| ExtractionError::io(archive_path, e))?;

        std::io::copy(&mut file, &mut outfile).map_err(|e| {
            if is_password_error(&e.to_string()) {
                ExtractionError::WrongPassword {
                    archive: archive_path.to_path_buf(),
                }
            } else {
                ExtractionError::io(archive_path, e)
            }
        })?;

        Ok(Some(file_path))
    }
}

impl ArchiveCodec for ZipCodec {
    fn name(&self) -> &'static str {
        "ZIP"
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
            "attempting ZIP extraction"
        );

        let file =
            std::fs::File::open(archive_path).map_err(|e| ExtractionError::io(archive_path, e))?;

        let mut archive = ::zip::ZipArchive::new(file).map_err(|e| {
            ExtractionError::corrupt(archive_path, format!("failed to read ZIP archive: {}", e))
        })?;

        ensure_destination(dest_path, archive_path)?;

        let mut extracted_files = Vec::new();
        for i in 0..archive.len() {
            let file = Self::open_zip_entry(&mut archive, i, password, archive_path)?;
            if let Some(file_path) = Self::extract_zip_entry(file, dest_path, archive_path)? {
                extracted_files.push(file_path);
            }
        }

        Ok(extracted_files)
    }
}
