use std::collections::HashMap;
use std::io::{Cursor, Write};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::CancellationToken;
use zip::write::FileOptions;

use lamah_blob::{
    AssetUploader, ControlPlane, Credential, MediaAsset, MediaRole, PresignRequest, PresignedUpload, ProxiedUpload,
    UploadConfig, UploadError, UploadResult,
};
use lamah_import::{
    ArchiveSource, BatchOrchestrator, ContentError, ContentStore, CreatedRecord, DropReason, ExtractorConfig, ImportConfig,
    ImportContext, ImportError, ImportSource, MemoryContentStore, NewQuestion, ProgressReporter, SpreadsheetBlob,
};

/// Control plane that stores everything except payloads starting with `fail`
#[derive(Default)]
struct FakeControlPlane {
    uploads: Mutex<Vec<(String, String)>>,
    deletes: Mutex<Vec<String>>,
}

impl FakeControlPlane {
    fn uploaded_folders(&self) -> Vec<String> {
        self.uploads.lock().iter().map(|(folder, _)| folder.clone()).collect()
    }

    fn uploaded_urls(&self) -> Vec<String> {
        self.uploads
            .lock()
            .iter()
            .map(|(folder, file_name)| format!("https://cdn.test/{}/{}", folder, file_name))
            .collect()
    }

    fn deleted_urls(&self) -> Vec<String> {
        self.deletes.lock().clone()
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn upload(&self, request: ProxiedUpload, _credential: &Credential) -> UploadResult<String> {
        if request.data.starts_with(b"fail") {
            return Err(UploadError::rejected(500, "storage unavailable"));
        }
        self.uploads
            .lock()
            .push((request.folder.clone(), request.file_name.clone()));
        Ok(format!("https://cdn.test/{}/{}", request.folder, request.file_name))
    }

    async fn presign(&self, request: PresignRequest, _credential: &Credential) -> UploadResult<PresignedUpload> {
        Ok(PresignedUpload {
            upload_url: format!("https://upload.test/{}", request.file_name),
            final_url: format!("https://cdn.test/{}/{}", request.folder, request.file_name),
        })
    }

    async fn put_presigned(&self, _upload_url: &str, _mime_type: &str, _data: Bytes) -> UploadResult<()> {
        Ok(())
    }

    async fn delete(&self, url: &str, _credential: &Credential) -> UploadResult<()> {
        self.deletes.lock().push(url.to_string());
        Ok(())
    }
}

/// Content store that reports `DUP` questions as duplicates and rejects `BAD`
#[derive(Default)]
struct PickyContentStore {
    inner: MemoryContentStore,
}

#[async_trait]
impl ContentStore for PickyContentStore {
    async fn create_question(&self, question: NewQuestion) -> Result<CreatedRecord, ContentError> {
        match question.text.as_str() {
            "DUP" => Err(ContentError::duplicate("question already exists")),
            "BAD" => Err(ContentError::rejected("validation failed")),
            _ => self.inner.create_question(question).await,
        }
    }
}

/// In-memory archive body that counts the bytes handed out
struct CountingReader {
    inner: Cursor<Vec<u8>>,
    read: Arc<AtomicUsize>,
}

impl AsyncRead for CountingReader {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.inner).poll_read(cx, buf);
        let added = buf.filled().len() - before;
        self.read.fetch_add(added, Ordering::SeqCst);
        polled
    }
}

fn counting_archive(data: Vec<u8>) -> (ImportSource, Arc<AtomicUsize>) {
    let read = Arc::new(AtomicUsize::new(0));
    let size = data.len() as u64;
    let reader = CountingReader {
        inner: Cursor::new(data),
        read: read.clone(),
    };
    (ImportSource::Archive(ArchiveSource::reader(reader, size)), read)
}

fn create_test_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

fn create_test_config() -> ImportConfig {
    ImportConfig::default().with_batch_pause(Duration::ZERO)
}

fn create_test_orchestrator<S: ContentStore + 'static>(
    control_plane: Arc<FakeControlPlane>,
    content: Arc<S>,
    config: ImportConfig,
) -> BatchOrchestrator {
    let uploader = AssetUploader::from_arc(control_plane, UploadConfig::default());
    BatchOrchestrator::from_arcs(Arc::new(uploader), content, config)
}

fn create_test_context() -> ImportContext {
    ImportContext::new("animals", Credential::bearer("token"))
}

fn archive(entries: &[(&str, &[u8])]) -> ImportSource {
    ImportSource::Archive(ArchiveSource::bytes(create_test_zip(entries)))
}

/// A1. Arabic headers, one image present: imported with an image URL
#[tokio::test]
async fn test_scenario_single_record_with_image() {
    let control_plane = Arc::new(FakeControlPlane::default());
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator = create_test_orchestrator(control_plane.clone(), content.clone(), create_test_config());

    let sheet = "السؤال,الإجابة,صورة السؤال\nما اسم هذا الحيوان؟,أسد,lion.jpg\n";
    let lion = vec![0xAB; 2 * 1024 * 1024];
    let report = orchestrator
        .run(
            archive(&[("questions.csv", sheet.as_bytes()), ("media/lion.jpg", &lion)]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert!(report.dropped.is_empty());
    assert!(report.media_issues.is_empty());
    assert!(report.is_clean());

    let questions = content.questions().await;
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].text, "ما اسم هذا الحيوان؟");
    assert_eq!(questions[0].answer, "أسد");
    assert_eq!(questions[0].category_id, "animals");
    assert!(questions[0].image_url.as_deref().is_some_and(|url| !url.is_empty()));
    assert_eq!(control_plane.uploaded_folders(), vec!["questions/images".to_string()]);
}

/// A2. Referenced media absent from the archive: text-only import plus a missing entry
#[tokio::test]
async fn test_scenario_missing_media() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let report = orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer,questionImage\nWhat roars?,Lion,lion.jpg\n")]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.media_issues.len(), 1);
    assert_eq!(report.media_issues[0].missing, vec!["lion.jpg".to_string()]);
    assert!(report.media_issues[0].failed.is_empty());
    assert_eq!(content.questions().await[0].image_url, None);
}

/// A3. A row without an answer is dropped with a reason
#[tokio::test]
async fn test_scenario_dropped_row() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let report = orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer\nWhat roars?,\n")]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 0);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].reason, DropReason::MissingAnswer);
    assert_eq!(report.dropped[0].row_number, 2);
    assert!(report.dropped[0].reason.to_string().contains("missing required field"));
    assert!(content.is_empty().await);
}

/// A4. Report entries follow spreadsheet order and one failed upload does not stop the next record
#[tokio::test]
async fn test_order_and_failure_isolation() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let sheet = "text,answer,questionImage\n\
                 Q0,A0,\n\
                 Q1,,\n\
                 Q2,A2,broken.jpg\n\
                 Q3,A3,nowhere.jpg\n\
                 ,A4,\n\
                 Q5,A5,ok.jpg\n";
    let report = orchestrator
        .run(
            archive(&[
                ("questions.csv", sheet.as_bytes()),
                ("broken.jpg", b"fail: truncated"),
                ("ok.jpg", b"not really a jpeg"),
            ]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.total_rows, 6);
    assert_eq!(report.imported, 4);

    let dropped: Vec<usize> = report.dropped.iter().map(|d| d.record_index).collect();
    assert_eq!(dropped, vec![1, 4]);
    assert_eq!(report.dropped[1].reason, DropReason::MissingText);

    let issues: Vec<usize> = report.media_issues.iter().map(|i| i.record_index).collect();
    assert_eq!(issues, vec![2, 3]);
    let failure = &report.media_issues[0].failed[0];
    assert_eq!(failure.role, MediaRole::QuestionImage);
    assert_eq!(failure.filename, "broken.jpg");
    assert!(failure.reason.contains("storage unavailable"), "{}", failure.reason);
    assert_eq!(report.media_issues[1].missing, vec!["nowhere.jpg".to_string()]);

    let texts: Vec<String> = content.questions().await.into_iter().map(|q| q.text).collect();
    assert_eq!(texts, vec!["Q0", "Q2", "Q3", "Q5"]);
    let questions = content.questions().await;
    assert_eq!(questions[1].image_url, None);
    assert!(questions[3].image_url.is_some());
}

/// A5. A missing and a failed role leave the other roles untouched
#[tokio::test]
async fn test_role_isolation() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let sheet = "text,answer,questionImage,answerAudio,answerImage,answerVideo\n\
                 Q,A,gone.jpg,roar.mp3,cub.png,hunt.mp4\n";
    let report = orchestrator
        .run(
            archive(&[
                ("questions.csv", sheet.as_bytes()),
                ("roar.mp3", b"fail"),
                ("cub.png", b"png-ish"),
                ("hunt.mp4", b"mp4-ish"),
            ]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    let issue = report.media_issue(0).unwrap();
    assert_eq!(issue.missing, vec!["gone.jpg".to_string()]);
    assert_eq!(issue.failed.len(), 1);
    assert_eq!(issue.failed[0].role, MediaRole::AnswerAudio);

    let question = &content.questions().await[0];
    assert_eq!(question.image_url, None);
    assert_eq!(question.answer_audio_url, None);
    assert!(question.answer_image_url.as_deref().is_some_and(|u| u.contains("questions/images")));
    assert!(question.answer_video_url.as_deref().is_some_and(|u| u.contains("questions/video")));
}

/// A6. Per-record progress after extraction is 50 + (i+1)/total * 50
#[tokio::test]
async fn test_record_progress() {
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        Arc::new(MemoryContentStore::new()),
        create_test_config(),
    );
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let progress = ProgressReporter::new(move |percent, _| sink.lock().push(percent));

    orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer\n1,1\n2,2\n3,3\n4,4\n")]),
            &create_test_context(),
            progress,
        )
        .await
        .unwrap();

    let seen = seen.lock().clone();
    assert_eq!(&seen[seen.len() - 5..], &[50, 62, 75, 87, 100]);
    assert!(seen.windows(2).all(|pair| pair[0] <= pair[1]), "{:?}", seen);
}

/// A7. Cancelling stops before the next record and keeps the partial report
#[tokio::test]
async fn test_cancel_keeps_partial_report() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        content.clone(),
        create_test_config().with_batch_size(3),
    );

    let mut sheet = String::from("text,answer\n");
    for i in 0..20 {
        sheet.push_str(&format!("Q{},A{}\n", i, i));
    }

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = ProgressReporter::new(move |_, message| {
        if message.starts_with("Imported 10 of") {
            trigger.cancel();
        }
    });

    let report = orchestrator
        .run_with_cancel(
            archive(&[("questions.csv", sheet.as_bytes())]),
            &create_test_context(),
            progress,
            cancel,
        )
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.imported, 10);
    assert_eq!(report.total_rows, 20);
    assert_eq!(content.len().await, 10);
    assert!(report.summary().ends_with("(cancelled)"));
}

/// A8. A cancel during a batch pause ends the run right away
#[tokio::test]
async fn test_cancel_interrupts_batch_pause() {
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        Arc::new(MemoryContentStore::new()),
        ImportConfig::default()
            .with_batch_size(2)
            .with_batch_pause(Duration::from_secs(3600)),
    );

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = ProgressReporter::new(move |_, message| {
        if message.starts_with("Imported 2 of") {
            let trigger = trigger.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                trigger.cancel();
            });
        }
    });

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run_with_cancel(
            archive(&[("questions.csv", b"text,answer\n1,1\n2,2\n3,3\n")]),
            &create_test_context(),
            progress,
            cancel,
        ),
    )
    .await
    .expect("pause should be interrupted")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.imported, 2);
}

/// A9. Duplicates are skipped, creation failures recorded, the rest imported
#[tokio::test]
async fn test_content_store_outcomes() {
    let content = Arc::new(PickyContentStore::default());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let report = orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer\nDUP,A\nBAD,A\nGOOD,A\n")]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert_eq!(report.created_ids.len(), 1);
    assert_eq!(report.skipped_duplicates.len(), 1);
    assert_eq!(report.skipped_duplicates[0].record_index, 0);
    assert_eq!(report.creation_failures.len(), 1);
    assert_eq!(report.creation_failures[0].record_index, 1);
    assert!(report.creation_failures[0].message.contains("validation failed"));
    assert_eq!(report.processed(), 3);
    assert!(!report.is_clean());
}

/// A10. A spreadsheet with separately supplied media skips extraction
#[tokio::test]
async fn test_spreadsheet_source() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let spreadsheet = SpreadsheetBlob::from_filename("upload.csv", &b"question,answer,audio\nHear this?,Lion,roar.mp3\n"[..])
        .unwrap();
    let mut media = HashMap::new();
    media.insert("roar.mp3".to_string(), MediaAsset::new("roar.mp3", b"ID3".to_vec()));

    let report = orchestrator
        .run(
            ImportSource::Spreadsheet { spreadsheet, media },
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    assert!(content.questions().await[0]
        .audio_url
        .as_deref()
        .is_some_and(|url| url.contains("questions/audio")));
}

/// A11. Archives without a spreadsheet fail the run
#[tokio::test]
async fn test_missing_spreadsheet_is_fatal() {
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        Arc::new(MemoryContentStore::new()),
        create_test_config(),
    );
    let err = orchestrator
        .run(archive(&[("lion.jpg", b"jpeg")]), &create_test_context(), ProgressReporter::noop())
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::MissingSpreadsheet));
}

/// A12. A header-only sheet yields an empty report at 100%
#[tokio::test]
async fn test_header_only_sheet() {
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        Arc::new(MemoryContentStore::new()),
        create_test_config(),
    );
    let last = Arc::new(Mutex::new(0u8));
    let sink = last.clone();
    let report = orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer\n")]),
            &create_test_context(),
            ProgressReporter::new(move |percent, _| *sink.lock() = percent),
        )
        .await
        .unwrap();

    assert_eq!(report.total_rows, 0);
    assert_eq!(report.imported, 0);
    assert_eq!(*last.lock(), 100);
}

/// A13. Concurrent uploads within a record keep roles and record order intact
#[tokio::test]
async fn test_concurrent_uploads_preserve_order() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        content.clone(),
        create_test_config().with_upload_concurrency(4).with_channel_capacity(2),
    );

    let mut sheet = String::from("text,answer,questionImage,questionAudio,answerImage\n");
    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    for i in 0..12 {
        sheet.push_str(&format!("Q{i},A{i},q{i}.jpg,q{i}.mp3,a{i}.png\n"));
        entries.push((format!("q{i}.jpg"), b"img".to_vec()));
        entries.push((format!("q{i}.mp3"), b"snd".to_vec()));
        entries.push((format!("a{i}.png"), b"img".to_vec()));
    }
    let mut zip_entries: Vec<(&str, &[u8])> = vec![("questions.csv", sheet.as_bytes())];
    zip_entries.extend(entries.iter().map(|(name, data)| (name.as_str(), data.as_slice())));

    let report = orchestrator
        .run(archive(&zip_entries), &create_test_context(), ProgressReporter::noop())
        .await
        .unwrap();

    assert_eq!(report.imported, 12);
    assert!(report.media_issues.is_empty());
    for (i, question) in content.questions().await.iter().enumerate() {
        assert_eq!(question.text, format!("Q{}", i));
        assert!(question.image_url.is_some());
        assert!(question.audio_url.is_some());
        assert!(question.answer_image_url.is_some());
    }
}

/// A14. An unparseable CSV row is reported as dropped instead of vanishing
#[tokio::test]
async fn test_malformed_csv_row_is_dropped() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let mut sheet = b"text,answer\nQ1,A1\nQ".to_vec();
    sheet.extend_from_slice(&[0xff, 0xfe]);
    sheet.extend_from_slice(b",A2\nQ3,A3\n");

    let report = orchestrator
        .run(
            archive(&[("questions.csv", &sheet)]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.total_rows, 3);
    assert_eq!(report.imported, 2);
    assert_eq!(report.dropped.len(), 1);
    assert_eq!(report.dropped[0].record_index, 1);
    assert_eq!(report.dropped[0].row_number, 3);
    assert_eq!(report.dropped[0].reason, DropReason::MissingTextAndAnswer);
    assert_eq!(report.processed(), 3);
}

/// A15. A token cancelled before the run starts leaves the archive unread
#[tokio::test]
async fn test_cancel_before_extraction() {
    let content = Arc::new(MemoryContentStore::new());
    let orchestrator =
        create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), create_test_config());

    let (source, read) = counting_archive(create_test_zip(&[("questions.csv", b"text,answer\nQ,A\n")]));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = orchestrator
        .run_with_cancel(source, &create_test_context(), ProgressReporter::noop(), cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.processed(), 0);
    assert_eq!(read.load(Ordering::SeqCst), 0);
    assert_eq!(content.len().await, 0);
}

/// A16. Cancelling while a large archive is spooled stops the read early
#[tokio::test]
async fn test_cancel_during_streamed_read() {
    let content = Arc::new(MemoryContentStore::new());
    let config = create_test_config().with_extractor(
        ExtractorConfig::default()
            .with_streaming_threshold(64)
            .with_chunk_size(100),
    );
    let orchestrator = create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), config);

    let zip = create_test_zip(&[("questions.csv", b"text,answer\nQ,A\n"), ("lion.jpg", &[7u8; 8192])]);
    let size = zip.len();
    let (source, read) = counting_archive(zip);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let progress = ProgressReporter::new(move |_, message| {
        if message.starts_with("Reading archive (") {
            trigger.cancel();
        }
    });

    let report = orchestrator
        .run_with_cancel(source, &create_test_context(), progress, cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.imported, 0);
    assert!(read.load(Ordering::SeqCst) < size);
    assert_eq!(content.len().await, 0);
}

/// A17. Extractor settings that contradict each other fail the run
#[tokio::test]
async fn test_inconsistent_extractor_config_is_rejected() {
    let config = create_test_config().with_extractor(
        ExtractorConfig::default()
            .with_max_archive_bytes(1024)
            .with_streaming_threshold(4096),
    );
    let orchestrator = create_test_orchestrator(
        Arc::new(FakeControlPlane::default()),
        Arc::new(MemoryContentStore::new()),
        config,
    );

    let err = orchestrator
        .run(
            archive(&[("questions.csv", b"text,answer\nQ,A\n")]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ImportError::Config { .. }));
}

/// A18. Zero sizes written straight into the config fields still complete the run
#[tokio::test]
async fn test_zero_config_fields_are_tolerated() {
    let content = Arc::new(MemoryContentStore::new());
    let mut config = create_test_config();
    config.batch_size = 0;
    config.upload_concurrency = 0;
    config.channel_capacity = 0;
    let orchestrator = create_test_orchestrator(Arc::new(FakeControlPlane::default()), content.clone(), config);

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        orchestrator.run(
            archive(&[
                ("questions.csv", b"text,answer,image\n1,1,lion.jpg\n2,2,\n3,3,\n"),
                ("lion.jpg", b"jpeg"),
            ]),
            &create_test_context(),
            ProgressReporter::noop(),
        ),
    )
    .await
    .expect("run should not stall")
    .unwrap();

    assert_eq!(report.imported, 3);
    assert!(content.questions().await[0].image_url.is_some());
}

/// A19. Media uploaded for a record that is never created gets deleted
#[tokio::test]
async fn test_uploads_removed_when_record_not_created() {
    let control_plane = Arc::new(FakeControlPlane::default());
    let orchestrator = create_test_orchestrator(
        control_plane.clone(),
        Arc::new(PickyContentStore::default()),
        create_test_config(),
    );

    let report = orchestrator
        .run(
            archive(&[
                ("questions.csv", b"text,answer,image\nDUP,A,dup.jpg\nBAD,A,bad.jpg\nGOOD,A,good.jpg\n"),
                ("dup.jpg", b"jpeg"),
                ("bad.jpg", b"jpeg"),
                ("good.jpg", b"jpeg"),
            ]),
            &create_test_context(),
            ProgressReporter::noop(),
        )
        .await
        .unwrap();

    assert_eq!(report.imported, 1);
    let uploaded = control_plane.uploaded_urls();
    assert_eq!(uploaded.len(), 3);
    assert_eq!(control_plane.deleted_urls(), uploaded[..2].to_vec());
}
