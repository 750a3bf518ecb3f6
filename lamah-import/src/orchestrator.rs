use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures::{stream, StreamExt};
use lamah_blob::{AssetUploader, Credential, MediaRole, RecordContext, UploadOutcome};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    aliases::HeaderIndex,
    archive::{ArchiveExtractor, ArchiveSource, MediaMap},
    config::{ImportConfig, MAX_UPLOAD_CONCURRENCY},
    content::{ContentStore, NewQuestion},
    progress::{record_percent, ProgressReporter},
    record::{DropReason, ImportRecord},
    report::{FailedMedia, ImportReport, MediaIssue},
    resolver::{MediaResolver, ResolvedMedia},
    sheet::{read_sheet, RawSheet, SpreadsheetBlob},
    ImportError, ImportResult,
};

/// What to import
pub enum ImportSource {
    /// A ZIP holding one spreadsheet plus media files
    Archive(ArchiveSource),
    /// A spreadsheet with media supplied separately by the caller
    Spreadsheet {
        spreadsheet: SpreadsheetBlob,
        media: MediaMap,
    },
}

/// Who runs the import and where the questions go
#[derive(Debug, Clone)]
pub struct ImportContext {
    pub category_id: String,
    pub credential: Credential,
}

impl ImportContext {
    pub fn new<S: Into<String>>(category_id: S, credential: Credential) -> Self {
        Self {
            category_id: category_id.into(),
            credential,
        }
    }

    fn record_context(&self, record_index: usize) -> RecordContext {
        RecordContext::new(self.credential.clone())
            .with_record_index(record_index)
            .with_category(self.category_id.clone())
    }
}

/// Producer output: a normalized row or the reason it was dropped
struct ParsedRow {
    index: usize,
    row_number: usize,
    outcome: Result<ImportRecord, DropReason>,
}

/// Resolver output, consumed by the sink
enum PlannedRecord {
    Dropped {
        index: usize,
        row_number: usize,
        reason: DropReason,
    },
    Ready {
        record: ImportRecord,
        media: Vec<(MediaRole, ResolvedMedia)>,
    },
}

impl PlannedRecord {
    fn index(&self) -> usize {
        match self {
            Self::Dropped { index, .. } => *index,
            Self::Ready { record, .. } => record.index,
        }
    }
}

/// Drives extraction, parsing, media resolution, upload and record creation
pub struct BatchOrchestrator {
    extractor: ArchiveExtractor,
    uploader: Arc<AssetUploader>,
    content: Arc<dyn ContentStore>,
    config: ImportConfig,
}

impl BatchOrchestrator {
    pub fn new<S: ContentStore + 'static>(uploader: AssetUploader, content: S, config: ImportConfig) -> Self {
        Self::from_arcs(Arc::new(uploader), Arc::new(content), config)
    }

    /// Share an uploader and content store with other components
    pub fn from_arcs(uploader: Arc<AssetUploader>, content: Arc<dyn ContentStore>, config: ImportConfig) -> Self {
        Self {
            extractor: ArchiveExtractor::new(config.extractor.clone()),
            uploader,
            content,
            config,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Run an import to completion
    pub async fn run(
        &self,
        source: ImportSource,
        ctx: &ImportContext,
        progress: ProgressReporter,
    ) -> ImportResult<ImportReport> {
        self.run_with_cancel(source, ctx, progress, CancellationToken::new()).await
    }

    /// Run an import that stops before the next record once `cancel` fires.
    /// A cancelled run still returns the report accumulated so far.
    #[instrument(skip_all, fields(category = %ctx.category_id))]
    pub async fn run_with_cancel(
        &self,
        source: ImportSource,
        ctx: &ImportContext,
        progress: ProgressReporter,
        cancel: CancellationToken,
    ) -> ImportResult<ImportReport> {
        let started = Instant::now();
        let (spreadsheet, media) = match self.load(source, &progress, &cancel).await {
            Ok(loaded) => loaded,
            Err(e) if e.is_cancelled() => {
                warn!("import cancelled before any record was read");
                let mut report = ImportReport::new(0);
                report.cancelled = true;
                report.elapsed_ms = started.elapsed().as_millis() as u64;
                return Ok(report);
            }
            Err(e) => return Err(e),
        };
        let sheet = tokio::task::spawn_blocking(move || read_sheet(&spreadsheet))
            .await
            .map_err(ImportError::task)??;

        let total = sheet.rows.len();
        let mut report = ImportReport::new(total);
        info!(total, media_files = media.len(), "starting import");

        if total == 0 {
            progress.report(100, "Spreadsheet has no data rows");
            report.elapsed_ms = started.elapsed().as_millis() as u64;
            return Ok(report);
        }

        let batch_size = self.config.batch_size.max(1);
        let (tx, rx) = mpsc::channel(self.config.channel_capacity.max(1));
        let producer = tokio::spawn(produce_records(sheet, tx));

        let media = Arc::new(media);
        let mut planned = ReceiverStream::new(rx).map(move |row| plan_record(row, &media));

        while let Some(item) = planned.next().await {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let index = item.index();
            self.process(item, ctx, &mut report).await;
            progress.report(
                record_percent(index, total),
                &format!("Imported {} of {} records", index + 1, total),
            );

            let done = index + 1;
            if done % batch_size == 0 && done < total && self.pause(&cancel).await {
                report.cancelled = true;
                break;
            }
        }
        drop(planned);

        if report.cancelled {
            producer.abort();
            warn!(processed = report.processed(), total, "import cancelled");
        } else {
            producer.await.map_err(ImportError::task)?;
        }

        report.elapsed_ms = started.elapsed().as_millis() as u64;
        info!(summary = %report.summary(), elapsed_ms = report.elapsed_ms, "import finished");
        Ok(report)
    }

    async fn load(
        &self,
        source: ImportSource,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ImportResult<(SpreadsheetBlob, MediaMap)> {
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }
        match source {
            ImportSource::Archive(archive) => {
                let extracted = self.extractor.extract_with_cancel(archive, progress, cancel).await?;
                let spreadsheet = extracted.spreadsheet.ok_or(ImportError::MissingSpreadsheet)?;
                Ok((spreadsheet, extracted.media))
            }
            ImportSource::Spreadsheet { spreadsheet, media } => {
                progress.report(50, "Spreadsheet received");
                Ok((spreadsheet, media))
            }
        }
    }

    /// Returns true when the run was cancelled during the pause
    async fn pause(&self, cancel: &CancellationToken) -> bool {
        debug!(pause_ms = self.config.batch_pause.as_millis() as u64, "batch complete, pausing");
        if self.config.batch_pause.is_zero() {
            return cancel.is_cancelled();
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = tokio::time::sleep(self.config.batch_pause) => false,
        }
    }

    async fn process(&self, item: PlannedRecord, ctx: &ImportContext, report: &mut ImportReport) {
        let (record, media) = match item {
            PlannedRecord::Dropped {
                index,
                row_number,
                reason,
            } => {
                info!(index, row_number, %reason, "dropping record");
                report.record_dropped(index, row_number, reason);
                return;
            }
            PlannedRecord::Ready { record, media } => (record, media),
        };

        let mut missing = Vec::new();
        let mut present = Vec::new();
        for (role, resolved) in media {
            match resolved {
                ResolvedMedia::Present(asset) => present.push((role, asset)),
                ResolvedMedia::Missing(filename) => {
                    debug!(index = record.index, %role, %filename, "referenced media not in archive");
                    missing.push(filename);
                }
            }
        }

        let uploader = self.uploader.as_ref();
        let record_ctx = ctx.record_context(record.index);
        let record_ctx = &record_ctx;
        let outcomes: Vec<(MediaRole, UploadOutcome)> = stream::iter(present)
            .map(move |(role, asset)| async move { (role, uploader.upload(&asset, role, record_ctx).await) })
            .buffered(self.config.upload_concurrency.clamp(1, MAX_UPLOAD_CONCURRENCY))
            .collect()
            .await;

        let mut urls = BTreeMap::new();
        let mut failed = Vec::new();
        for (role, outcome) in outcomes {
            match outcome {
                UploadOutcome::Uploaded { url } => {
                    urls.insert(role, url);
                }
                UploadOutcome::Missing { filename } => missing.push(filename),
                UploadOutcome::Failed { filename, reason } => failed.push(FailedMedia { role, filename, reason }),
            }
        }

        report.record_media_issue(MediaIssue {
            record_index: record.index,
            row_number: record.row_number,
            missing,
            failed,
        });

        let question = NewQuestion::from_record(&record, ctx.category_id.as_str(), &urls);
        match self.content.create_question(question).await {
            Ok(created) => {
                debug!(index = record.index, id = %created.id, "question created");
                report.record_created(created.id);
            }
            Err(e) if e.is_duplicate() => {
                info!(index = record.index, error = %e, "skipping duplicate question");
                report.record_duplicate(record.index, record.row_number, e.to_string());
                self.discard_uploads(&urls, ctx).await;
            }
            Err(e) => {
                warn!(index = record.index, error = %e, "failed to create question");
                report.record_creation_failure(record.index, record.row_number, e.to_string());
                self.discard_uploads(&urls, ctx).await;
            }
        }
    }

    /// Best-effort removal of media uploaded for a record that was never created
    async fn discard_uploads(&self, urls: &BTreeMap<MediaRole, String>, ctx: &ImportContext) {
        for url in urls.values() {
            self.uploader.delete(url, &ctx.credential).await;
        }
    }
}

/// Normalize rows in order and feed them to the sink
async fn produce_records(sheet: RawSheet, tx: mpsc::Sender<ParsedRow>) {
    let headers = HeaderIndex::new(&sheet.headers);
    for (index, row) in sheet.rows.iter().enumerate() {
        let parsed = ParsedRow {
            index,
            row_number: row.row_number,
            outcome: ImportRecord::from_row(index, row, &headers),
        };
        if tx.send(parsed).await.is_err() {
            debug!(index, "record consumer closed, stopping producer");
            break;
        }
    }
}

fn plan_record(row: ParsedRow, media: &MediaMap) -> PlannedRecord {
    match row.outcome {
        Err(reason) => PlannedRecord::Dropped {
            index: row.index,
            row_number: row.row_number,
            reason,
        },
        Ok(record) => {
            let media = MediaResolver::resolve(&record.media_refs, media)
                .into_iter()
                .map(|(role, resolved)| (role, resolved.into_owned()))
                .collect();
            PlannedRecord::Ready { record, media }
        }
    }
}
