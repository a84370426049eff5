use crate::error::ExtractionError;
use std::path::{Component, Path, PathBuf};

/// Check if a codec error message indicates a password problem
pub(crate) fn is_password_error(error_msg: &str) -> bool {
    let lower = error_msg.to_lowercase();
    lower.contains("password") || lower.contains("encrypted") || lower.contains("erar_bad_password")
}

/// Create the destination directory (and parents) if missing
pub(crate) fn ensure_destination(dest_path: &Path, archive_path: &Path) -> Result<(), ExtractionError> {
    std::fs::create_dir_all(dest_path).map_err(|e| ExtractionError::io(archive_path, e))
}

/// Resolve an entry name to a path relative to the destination
///
/// Returns None for names that are absolute or contain `..` (e.g. "../etc/passwd"),
/// and for names with no normal components at all. `.` components are dropped.
pub(crate) fn safe_entry_path(entry: &Path) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in entry.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Validate that everything below `dest_path` resolves inside it
pub(crate) fn validate_extracted_paths(
    dest_path: &Path,
    archive_path: &Path,
) -> Result<(), ExtractionError> {
    let canonical_dest = dest_path
        .canonicalize()
        .map_err(|e| ExtractionError::io(archive_path, e))?;

    fn check_dir(
        dir: &Path,
        canonical_dest: &Path,
        archive_path: &Path,
    ) -> Result<(), ExtractionError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ExtractionError::io(archive_path, e))?;

        for entry in entries {
            let path = entry
                .map_err(|e| ExtractionError::io(archive_path, e))?
                .path();
            let canonical = path
                .canonicalize()
                .map_err(|e| ExtractionError::io(archive_path, e))?;

            if !canonical.starts_with(canonical_dest) {
                return Err(ExtractionError::UnsafePath {
                    archive: archive_path.to_path_buf(),
                    entry: canonical.display().to_string(),
                });
            }

            if path.is_dir() {
                check_dir(&path, canonical_dest, archive_path)?;
            }
        }
        Ok(())
    }

    check_dir(dest_path, &canonical_dest, archive_path)
}

/// Recursively collect all files (not directories) below `dir`
pub(crate) fn collect_files(dir: &Path, archive_path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
    fn visit_dir(
        dir: &Path,
        files: &mut Vec<PathBuf>,
        archive_path: &Path,
    ) -> Result<(), ExtractionError> {
        let entries = std::fs::read_dir(dir).map_err(|e| ExtractionError::io(archive_path, e))?;

        for entry in entries {
            let path = entry
                .map_err(|e| ExtractionError::io(archive_path, e))?
                .path();
            if path.is_dir() {
                visit_dir(&path, files, archive_path)?;
            } else {
                files.push(path);
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit_dir(dir, &mut files, archive_path)?;
    files.sort();
    Ok(files)
}
