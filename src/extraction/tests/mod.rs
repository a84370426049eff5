use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::extraction::shared::{is_password_error, safe_entry_path};
use crate::extraction::*;
use crate::types::ExtractionRequest;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Create a valid ZIP archive containing multiple files
fn create_zip_archive(archive_path: &Path, files: &[(&str, &[u8])]) {
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options =
        ::zip::write::FileOptions::default().compression_method(::zip::CompressionMethod::Stored);
    for (name, content) in files {
        writer.start_file(*name, options).unwrap();
        std::io::Write::write_all(&mut writer, content).unwrap();
    }
    writer.finish().unwrap();
}

/// Create a password-encrypted ZIP using the deprecated ZipCrypto method
/// (only encryption method supported for writing by zip 0.6)
fn create_encrypted_zip(archive_path: &Path, file_name: &str, content: &[u8], password: &[u8]) {
    use ::zip::unstable::write::FileOptionsExt;
    let file = std::fs::File::create(archive_path).unwrap();
    let mut writer = ::zip::ZipWriter::new(file);
    let options = ::zip::write::FileOptions::default()
        .compression_method(::zip::CompressionMethod::Stored)
        .with_deprecated_encryption(password);
    writer.start_file(file_name, options).unwrap();
    std::io::Write::write_all(&mut writer, content).unwrap();
    writer.finish().unwrap();
}

/// Codec that records its calls instead of touching the archive
#[derive(Default)]
struct RecordingCodec {
    calls: Mutex<Vec<(PathBuf, PathBuf, Option<String>)>>,
    fail: bool,
}

impl ArchiveCodec for RecordingCodec {
    fn name(&self) -> &'static str {
        "recording"
    }

    fn extract(
        &self,
        archive: &Path,
        dest: &Path,
        password: Option<&str>,
    ) -> Result<Vec<PathBuf>, ExtractionError> {
        self.calls.lock().unwrap().push((
            archive.to_path_buf(),
            dest.to_path_buf(),
            password.map(str::to_string),
        ));
        if self.fail {
            Err(ExtractionError::corrupt(archive, "scripted failure"))
        } else {
            Ok(vec![dest.join("entry.bin")])
        }
    }
}

fn recording_router() -> (
    ArchiveCodecRouter,
    Arc<RecordingCodec>,
    Arc<RecordingCodec>,
    Arc<RecordingCodec>,
) {
    let zip = Arc::new(RecordingCodec::default());
    let rar = Arc::new(RecordingCodec::default());
    let sevenz = Arc::new(RecordingCodec::default());
    let router = ArchiveCodecRouter::with_codecs(
        zip.clone(),
        rar.clone(),
        sevenz.clone(),
        &ExtractionConfig::default(),
    );
    (router, zip, rar, sevenz)
}

// ---------------------------------------------------------------------------
// Classification and routing
// ---------------------------------------------------------------------------

#[test]
fn is_archive_accepts_supported_suffixes_in_any_case() {
    for name in ["a.zip", "a.ZIP", "b.rar", "b.RaR", "c.7z", "c.7Z", "dir.v2/x.zip"] {
        assert!(ArchiveCodecRouter::is_archive(name), "{name}");
    }
}

#[test]
fn is_archive_rejects_everything_else() {
    for name in ["notes.txt", "report.zip.txt", "movie.r00", "tarball.tar.gz", "", "zip"] {
        assert!(!ArchiveCodecRouter::is_archive(name), "{name}");
    }
}

#[test]
fn destination_defaults_to_archive_parent_and_stem() {
    let router = ArchiveCodecRouter::default();
    assert_eq!(
        router.destination_for(Path::new("/downloads/42/report.zip")),
        PathBuf::from("/downloads/42/report_zip")
    );
}

#[test]
fn destination_honors_output_dir() {
    let router = ArchiveCodecRouter::new(&ExtractionConfig {
        output_dir: Some(PathBuf::from("/srv/extracted")),
    });
    assert_eq!(
        router.destination_for(Path::new("/downloads/leak.7z")),
        PathBuf::from("/srv/extracted/leak_7z")
    );
}

#[test]
fn archives_sharing_a_stem_get_separate_destinations() {
    let router = ArchiveCodecRouter::default();
    let zip_dest = router.destination_for(Path::new("/downloads/report.zip"));
    let sevenz_dest = router.destination_for(Path::new("/downloads/report.7z"));
    assert_ne!(zip_dest, sevenz_dest);
    assert_eq!(sevenz_dest, PathBuf::from("/downloads/report_7z"));
}

#[tokio::test]
async fn sevenz_file_list_excludes_sibling_archive_output() {
    let dir = TempDir::new().unwrap();
    let zip_archive = dir.path().join("report.zip");
    create_zip_archive(&zip_archive, &[("from_zip.txt", b"z".as_slice())]);

    let source = dir.path().join("src");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("from_7z.txt"), b"7").unwrap();
    let sevenz_archive = dir.path().join("report.7z");
    sevenz_rust::compress_to_path(&source, &sevenz_archive).unwrap();

    let router = ArchiveCodecRouter::default();
    router
        .extract(&ExtractionRequest::new(&zip_archive, None))
        .await
        .unwrap();
    let outcome = router
        .extract(&ExtractionRequest::new(&sevenz_archive, None))
        .await
        .unwrap();

    let ExtractionOutcome::Extracted { files, .. } = outcome else {
        panic!("expected extraction");
    };
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("from_7z.txt"));
}

#[tokio::test]
async fn router_dispatches_by_suffix_and_forwards_password() {
    let (router, zip, rar, sevenz) = recording_router();

    router
        .extract(&ExtractionRequest::new("/d/a.ZIP", Some("pw1".to_string())))
        .await
        .unwrap();
    router
        .extract(&ExtractionRequest::new("/d/b.rar", None))
        .await
        .unwrap();
    router
        .extract(&ExtractionRequest::new("/d/c.7z", Some("pw3".to_string())))
        .await
        .unwrap();

    let zip_calls = zip.calls.lock().unwrap();
    assert_eq!(zip_calls.len(), 1);
    assert_eq!(zip_calls[0].0, PathBuf::from("/d/a.ZIP"));
    assert_eq!(zip_calls[0].1, PathBuf::from("/d/a_zip"));
    assert_eq!(zip_calls[0].2.as_deref(), Some("pw1"));

    let rar_calls = rar.calls.lock().unwrap();
    assert_eq!(rar_calls.len(), 1);
    assert_eq!(rar_calls[0].2, None);

    let sevenz_calls = sevenz.calls.lock().unwrap();
    assert_eq!(sevenz_calls.len(), 1);
    assert_eq!(sevenz_calls[0].2.as_deref(), Some("pw3"));
}

#[tokio::test]
async fn router_treats_unknown_suffix_as_noop() {
    let (router, zip, rar, sevenz) = recording_router();

    let outcome = router
        .extract(&ExtractionRequest::new("/d/notes.txt", None))
        .await
        .unwrap();

    assert_eq!(outcome, ExtractionOutcome::Unsupported);
    assert!(zip.calls.lock().unwrap().is_empty());
    assert!(rar.calls.lock().unwrap().is_empty());
    assert!(sevenz.calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn router_reports_codec_failure() {
    let failing = Arc::new(RecordingCodec {
        fail: true,
        ..Default::default()
    });
    let router = ArchiveCodecRouter::with_codecs(
        failing.clone(),
        Arc::new(RarCodec),
        Arc::new(SevenZipCodec),
        &ExtractionConfig::default(),
    );

    let err = router
        .extract(&ExtractionRequest::new("/d/bad.zip", None))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Corrupt { .. }));
    assert_eq!(err.archive(), Path::new("/d/bad.zip"));
}

// ---------------------------------------------------------------------------
// ZIP codec
// ---------------------------------------------------------------------------

#[tokio::test]
async fn zip_extracts_plain_archive_next_to_itself() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("bundle.zip");
    create_zip_archive(
        &archive,
        &[("a.txt", b"alpha".as_slice()), ("nested/b.txt", b"beta".as_slice())],
    );

    let outcome = ArchiveCodecRouter::default()
        .extract(&ExtractionRequest::new(&archive, None))
        .await
        .unwrap();

    let ExtractionOutcome::Extracted { destination, files } = outcome else {
        panic!("expected extraction");
    };
    assert_eq!(destination, dir.path().join("bundle_zip"));
    assert_eq!(files.len(), 2);
    assert_eq!(
        std::fs::read(destination.join("nested/b.txt")).unwrap(),
        b"beta"
    );
}

#[tokio::test]
async fn zip_plain_archive_ignores_supplied_password() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("plain.zip");
    create_zip_archive(&archive, &[("a.txt", b"alpha".as_slice())]);

    let files = ZipCodec
        .extract(&archive, &dir.path().join("out"), Some("unused"))
        .unwrap();
    assert_eq!(files, vec![dir.path().join("out/a.txt")]);
}

#[test]
fn zip_encrypted_with_correct_password() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("secret.zip");
    create_encrypted_zip(&archive, "doc.txt", b"classified", b"abc123");

    let dest = dir.path().join("out");
    let files = ZipCodec.extract(&archive, &dest, Some("abc123")).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(std::fs::read(dest.join("doc.txt")).unwrap(), b"classified");
}

#[test]
fn zip_encrypted_with_wrong_password() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("secret.zip");
    create_encrypted_zip(&archive, "doc.txt", b"classified", b"abc123");

    let err = ZipCodec
        .extract(&archive, &dir.path().join("out"), Some("nope"))
        .unwrap_err();
    // ZipCrypto's one-byte header check lets roughly 1/256 wrong passwords through
    // to a checksum failure while reading
    assert!(
        matches!(
            err,
            ExtractionError::WrongPassword { .. } | ExtractionError::Io { .. }
        ),
        "got {err:?}"
    );
}

#[test]
fn zip_encrypted_without_password() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("secret.zip");
    create_encrypted_zip(&archive, "doc.txt", b"classified", b"abc123");

    let err = ZipCodec
        .extract(&archive, &dir.path().join("out"), None)
        .unwrap_err();
    assert!(err.is_password_error(), "got {err:?}");
}

#[tokio::test]
async fn zip_corrupt_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.zip");
    std::fs::write(&archive, b"this is not a zip file").unwrap();

    let err = ArchiveCodecRouter::default()
        .extract(&ExtractionRequest::new(&archive, Some("pw".to_string())))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Corrupt { .. }), "got {err:?}");
    assert_eq!(err.archive(), archive.as_path());
}

#[test]
fn zip_missing_archive_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = ZipCodec
        .extract(&dir.path().join("gone.zip"), &dir.path().join("out"), None)
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Io { .. }));
}

#[test]
fn zip_skips_entries_escaping_destination() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("evil.zip");
    create_zip_archive(
        &archive,
        &[("../escape.txt", b"x".as_slice()), ("ok.txt", b"y".as_slice())],
    );

    let dest = dir.path().join("out");
    let files = ZipCodec.extract(&archive, &dest, None).unwrap();
    assert_eq!(files, vec![dest.join("ok.txt")]);
    assert!(!dir.path().join("escape.txt").exists());
}

// ---------------------------------------------------------------------------
// 7z codec
// ---------------------------------------------------------------------------

#[tokio::test]
async fn sevenz_round_trip_through_router() {
    let dir = TempDir::new().unwrap();
    let source = dir.path().join("src");
    std::fs::create_dir_all(&source).unwrap();
    std::fs::write(source.join("one.txt"), b"1").unwrap();
    std::fs::write(source.join("two.txt"), b"2").unwrap();

    let archive = dir.path().join("pack.7z");
    sevenz_rust::compress_to_path(&source, &archive).unwrap();

    let outcome = ArchiveCodecRouter::default()
        .extract(&ExtractionRequest::new(&archive, None))
        .await
        .unwrap();

    let ExtractionOutcome::Extracted { files, .. } = outcome else {
        panic!("expected extraction");
    };
    assert_eq!(files.len(), 2);
}

#[test]
fn sevenz_corrupt_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.7z");
    std::fs::write(&archive, b"garbage bytes, not 7z").unwrap();

    let err = SevenZipCodec
        .extract(&archive, &dir.path().join("out"), Some("pw"))
        .unwrap_err();
    assert!(!matches!(err, ExtractionError::UnsafePath { .. }));
    assert_eq!(err.archive(), archive.as_path());
}

#[test]
fn sevenz_missing_archive_is_io_error() {
    let dir = TempDir::new().unwrap();
    let err = SevenZipCodec
        .extract(&dir.path().join("gone.7z"), &dir.path().join("out"), None)
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Io { .. }));
}

// ---------------------------------------------------------------------------
// RAR codec
// ---------------------------------------------------------------------------

#[test]
fn rar_corrupt_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let archive = dir.path().join("broken.rar");
    std::fs::write(&archive, b"Rar! but not really").unwrap();

    let err = RarCodec
        .extract(&archive, &dir.path().join("out"), None)
        .unwrap_err();
    assert_eq!(err.archive(), archive.as_path());
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

#[test]
fn password_error_detection() {
    assert!(is_password_error("Password required to decrypt file"));
    assert!(is_password_error("file is encrypted"));
    assert!(is_password_error("ERAR_BAD_PASSWORD"));
    assert!(!is_password_error("CRC error"));
}

#[test]
fn entries_escaping_destination_are_rejected() {
    assert_eq!(safe_entry_path(Path::new("../../etc/passwd")), None);
    assert_eq!(safe_entry_path(Path::new("docs/../../escape.txt")), None);
    assert_eq!(safe_entry_path(Path::new("/abs/file.txt")), None);
    assert_eq!(safe_entry_path(Path::new("..")), None);
    assert_eq!(safe_entry_path(Path::new(".")), None);
}

#[test]
fn relative_entries_are_kept() {
    assert_eq!(
        safe_entry_path(Path::new("dir/./file")),
        Some(PathBuf::from("dir/file"))
    );
    assert_eq!(
        safe_entry_path(Path::new("./nested/deep/file.bin")),
        Some(PathBuf::from("nested/deep/file.bin"))
    );
}
