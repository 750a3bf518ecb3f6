use std::io::{Cursor, Write};
use std::sync::Arc;

use parking_lot::Mutex;
use zip::write::FileOptions;

use lamah_import::{ArchiveExtractor, ArchiveSource, ExtractorConfig, ImportError, ProgressReporter, SheetFormat};

const GIB: u64 = 1024 * 1024 * 1024;

fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, FileOptions::default()).unwrap();
        } else {
            writer.start_file(*name, FileOptions::default()).unwrap();
            writer.write_all(data).unwrap();
        }
    }
    writer.finish().unwrap().into_inner()
}

fn recording_progress() -> (ProgressReporter, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let reporter = ProgressReporter::new(move |percent, _| sink.lock().push(percent));
    (reporter, seen)
}

/// A reader that panics if anyone tries to read it
struct UntouchableReader;

impl tokio::io::AsyncRead for UntouchableReader {
    fn poll_read(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
        _buf: &mut tokio::io::ReadBuf<'_>,
    ) -> std::task::Poll<std::io::Result<()>> {
        panic!("archive body must not be read");
    }
}

/// E1. Oversized archives are rejected before a single byte is read
#[tokio::test]
async fn test_oversized_archive_rejected_up_front() {
    let extractor = ArchiveExtractor::default();
    let err = extractor
        .extract(ArchiveSource::reader(UntouchableReader, 3 * GIB), &ProgressReporter::noop())
        .await
        .unwrap_err();

    assert!(matches!(err, ImportError::ArchiveTooLarge { size, limit } if size == 3 * GIB && limit == 2 * GIB));
    let message = err.to_string();
    assert!(message.contains("3.00 GiB"), "{}", message);
    assert!(message.contains("2 GiB"), "{}", message);
}

/// E2. Zero-byte archives are rejected
#[tokio::test]
async fn test_empty_archive_rejected() {
    let err = ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(Vec::new()), &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::EmptyArchive));
}

/// E3. Directories, resource forks and unknown files are skipped
#[tokio::test]
async fn test_entry_filtering() {
    let zip = create_test_zip(&[
        ("media/", b""),
        ("__MACOSX/media/._lion.jpg", b"fork"),
        ("media/._roar.mp3", b"fork"),
        ("notes.txt", b"hello"),
        ("questions.csv", b"text,answer\nQ,A\n"),
        ("media/lion.jpg", b"jpeg"),
        ("media/roar.mp3", b"mp3"),
    ]);

    let extracted = ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(zip), &ProgressReporter::noop())
        .await
        .unwrap();

    let spreadsheet = extracted.spreadsheet.unwrap();
    assert_eq!(spreadsheet.filename, "questions.csv");
    assert_eq!(spreadsheet.format, SheetFormat::Csv);

    let mut names: Vec<&String> = extracted.media.keys().collect();
    names.sort();
    assert_eq!(names, vec!["lion.jpg", "roar.mp3"]);
    assert_eq!(extracted.media["roar.mp3"].mime_type, "audio/mpeg");
    assert!(!extracted.streamed);
}

/// E4. The first spreadsheet in archive order wins
#[tokio::test]
async fn test_first_spreadsheet_wins() {
    let zip = create_test_zip(&[
        ("b/first.csv", b"text,answer\n1,1\n"),
        ("a/second.csv", b"text,answer\n2,2\n"),
    ]);
    let extracted = ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(zip), &ProgressReporter::noop())
        .await
        .unwrap();
    assert_eq!(extracted.spreadsheet.unwrap().filename, "first.csv");
}

/// E5. Media with the same base name in different folders: the later entry wins
#[tokio::test]
async fn test_duplicate_media_names_last_wins() {
    let zip = create_test_zip(&[("set1/lion.jpg", b"first"), ("set2/lion.jpg", b"second")]);
    let extracted = ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(zip), &ProgressReporter::noop())
        .await
        .unwrap();

    assert!(extracted.spreadsheet.is_none());
    assert_eq!(extracted.media.len(), 1);
    assert_eq!(&extracted.media["lion.jpg"].data[..], b"second");
}

/// E6. Streamed and buffered reads produce the same extraction
#[tokio::test]
async fn test_streamed_matches_buffered() {
    let zip = create_test_zip(&[
        ("questions.csv", b"text,answer,image\nWhat roars?,Lion,lion.jpg\n"),
        ("media/lion.jpg", &[7u8; 4096]),
        ("media/roar.mp3", &[9u8; 2048]),
    ]);
    let size = zip.len() as u64;

    let buffered = ArchiveExtractor::default()
        .extract(ArchiveSource::reader(Cursor::new(zip.clone()), size), &ProgressReporter::noop())
        .await
        .unwrap();

    let streaming = ArchiveExtractor::new(
        ExtractorConfig::default()
            .with_streaming_threshold(64)
            .with_chunk_size(100),
    );
    let (progress, seen) = recording_progress();
    let streamed = streaming
        .extract(ArchiveSource::reader(Cursor::new(zip), size), &progress)
        .await
        .unwrap();

    assert!(!buffered.streamed);
    assert!(streamed.streamed);
    assert_eq!(streamed.archive_bytes, size);
    assert_eq!(
        streamed.spreadsheet.as_ref().map(|s| s.data.clone()),
        buffered.spreadsheet.as_ref().map(|s| s.data.clone())
    );
    assert_eq!(streamed.media, buffered.media);

    // Byte-level read progress stays within 0-20 and never goes backwards
    let seen = seen.lock().clone();
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", seen);
    assert!(seen.iter().filter(|p| **p < 20).count() > 1, "{:?}", seen);
}

/// E7. Extraction progress ends at 50
#[tokio::test]
async fn test_progress_ends_at_fifty() {
    let zip = create_test_zip(&[("questions.csv", b"text,answer\nQ,A\n"), ("lion.jpg", b"jpeg")]);
    let (progress, seen) = recording_progress();
    ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(zip), &progress)
        .await
        .unwrap();

    let seen = seen.lock().clone();
    assert_eq!(seen.last(), Some(&50));
    assert!(seen.iter().all(|p| *p <= 50));
}

/// E8. Archives from disk are read like any other source
#[tokio::test]
async fn test_file_source() {
    let zip = create_test_zip(&[("questions.csv", b"text,answer\nQ,A\n")]);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("upload.zip");
    std::fs::write(&path, &zip).unwrap();

    let extracted = ArchiveExtractor::default()
        .extract(ArchiveSource::file(&path), &ProgressReporter::noop())
        .await
        .unwrap();
    assert_eq!(extracted.archive_bytes, zip.len() as u64);
    assert!(extracted.spreadsheet.is_some());
}

/// E9. Bytes that are not a ZIP fail the extraction
#[tokio::test]
async fn test_corrupt_archive_is_fatal() {
    let err = ArchiveExtractor::default()
        .extract(ArchiveSource::bytes(b"definitely not a zip".to_vec()), &ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Archive { .. }));
}
