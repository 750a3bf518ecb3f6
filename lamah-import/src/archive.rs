use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;

use bytes::Bytes;
use lamah_blob::{
    mime::{self, base_name},
    MediaAsset, MimeTable,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::{
    config::ExtractorConfig,
    progress::ProgressReporter,
    sheet::{SheetFormat, SpreadsheetBlob},
    ImportError, ImportResult,
};

/// Extracted media keyed by base filename
pub type MediaMap = HashMap<String, MediaAsset>;

/// Upper bound on the up-front allocation for one decompressed entry
const MAX_ENTRY_PREALLOC: u64 = 64 * 1024 * 1024;

const READ_START: u8 = 0;
const READ_END: u8 = 20;
const ENTRIES_END: u8 = 50;

/// Where the archive bytes come from. The size must be known before reading.
pub enum ArchiveSource {
    /// Already in memory; always read buffered
    Bytes(Bytes),
    /// A byte stream of a declared size
    Reader {
        reader: Box<dyn AsyncRead + Send + Unpin>,
        size: u64,
    },
    /// A file on disk; the size comes from its metadata
    File(PathBuf),
}

impl ArchiveSource {
    pub fn bytes<B: Into<Bytes>>(data: B) -> Self {
        Self::Bytes(data.into())
    }

    pub fn reader<R>(reader: R, size: u64) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        Self::Reader {
            reader: Box::new(reader),
            size,
        }
    }

    pub fn file<P: Into<PathBuf>>(path: P) -> Self {
        Self::File(path.into())
    }
}

impl std::fmt::Debug for ArchiveSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Self::Reader { size, .. } => f.debug_struct("Reader").field("size", size).finish_non_exhaustive(),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
        }
    }
}

/// Archive bytes after the read phase, tagged by how they were read
#[derive(Debug)]
pub enum ReadStrategy {
    /// Spooled chunk by chunk into an anonymous temporary file
    Streamed { spool: std::fs::File, bytes_read: u64 },
    /// Held in memory
    Buffered { data: Bytes },
}

impl ReadStrategy {
    pub fn is_streamed(&self) -> bool {
        matches!(self, Self::Streamed { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Streamed { .. } => "streamed",
            Self::Buffered { .. } => "buffered",
        }
    }

    /// Number of archive bytes read
    pub fn len(&self) -> u64 {
        match self {
            Self::Streamed { bytes_read, .. } => *bytes_read,
            Self::Buffered { data } => data.len() as u64,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn into_body(self) -> ArchiveBody {
        match self {
            Self::Streamed { spool, .. } => ArchiveBody::File(spool),
            Self::Buffered { data } => ArchiveBody::Memory(Cursor::new(data)),
        }
    }
}

/// Seekable view over either read strategy
enum ArchiveBody {
    File(std::fs::File),
    Memory(Cursor<Bytes>),
}

impl Read for ArchiveBody {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self {
            Self::File(file) => Read::read(file, buf),
            Self::Memory(cursor) => Read::read(cursor, buf),
        }
    }
}

impl Seek for ArchiveBody {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        match self {
            Self::File(file) => file.seek(pos),
            Self::Memory(cursor) => cursor.seek(pos),
        }
    }
}

/// Spool `reader` into `spool` in `chunk_size` chunks, reporting cumulative
/// bytes over 0-20%. Cancellation is checked before every chunk.
pub async fn read_streamed<R>(
    mut reader: R,
    spool: std::fs::File,
    size: u64,
    chunk_size: usize,
    limit: u64,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> ImportResult<ReadStrategy>
where
    R: AsyncRead + Unpin,
{
    let mut spool = tokio::fs::File::from_std(spool);
    let mut chunk = vec![0u8; chunk_size.max(1)];
    let mut bytes_read = 0u64;
    progress.report(READ_START, "Reading archive");

    loop {
        if cancel.is_cancelled() {
            debug!(bytes_read, "archive read cancelled");
            return Err(ImportError::Cancelled);
        }
        let filled = fill_chunk(&mut reader, &mut chunk).await?;
        if filled == 0 {
            break;
        }
        bytes_read += filled as u64;
        if bytes_read > limit {
            return Err(ImportError::too_large(bytes_read, limit));
        }
        spool.write_all(&chunk[..filled]).await?;
        progress.report_span(
            READ_START,
            READ_END,
            bytes_read,
            size,
            &format!("Reading archive ({} of {} bytes)", bytes_read, size),
        );
    }

    spool.flush().await?;
    let mut spool = spool.into_std().await;
    spool.seek(SeekFrom::Start(0))?;
    progress.report(READ_END, "Archive read");
    Ok(ReadStrategy::Streamed { spool, bytes_read })
}

/// Read the whole archive into memory, reporting the same 0-20% signal
pub async fn read_buffered<R>(
    reader: R,
    size: u64,
    limit: u64,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> ImportResult<ReadStrategy>
where
    R: AsyncRead + Unpin,
{
    if cancel.is_cancelled() {
        return Err(ImportError::Cancelled);
    }
    progress.report(READ_START, "Reading archive");
    let mut data = Vec::with_capacity(size.min(limit) as usize);
    let mut limited = reader.take(limit.saturating_add(1));
    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ImportError::Cancelled),
        read = limited.read_to_end(&mut data) => {
            read?;
        }
    }
    if data.len() as u64 > limit {
        return Err(ImportError::too_large(data.len() as u64, limit));
    }
    progress.report(READ_END, &format!("Reading archive ({} of {} bytes)", data.len(), size));
    Ok(ReadStrategy::Buffered {
        data: Bytes::from(data),
    })
}

async fn fill_chunk<R: AsyncRead + Unpin>(reader: &mut R, chunk: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < chunk.len() {
        let n = reader.read(&mut chunk[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

/// How an archive entry is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Directories and resource-fork metadata
    Skipped,
    Spreadsheet(SheetFormat),
    Media,
    /// Anything else; ignored
    Other,
}

impl EntryKind {
    /// Classify an entry by its path inside the archive
    pub fn classify(path: &str, is_dir: bool) -> Self {
        if is_dir || path.ends_with('/') {
            return Self::Skipped;
        }
        if path.starts_with("__MACOSX/") || path.contains("/__MACOSX/") {
            return Self::Skipped;
        }
        let base = base_name(path);
        if base.is_empty() || base.starts_with("._") {
            return Self::Skipped;
        }
        if let Some(format) = mime::extension(base).and_then(|ext| SheetFormat::from_extension(&ext)) {
            return Self::Spreadsheet(format);
        }
        if MimeTable::lookup(base).is_some() {
            return Self::Media;
        }
        Self::Other
    }
}

/// Result of extracting an archive
#[derive(Debug)]
pub struct ExtractedArchive {
    pub spreadsheet: Option<SpreadsheetBlob>,
    pub media: MediaMap,
    /// Whether the archive went through the spooling reader
    pub streamed: bool,
    pub archive_bytes: u64,
}

/// Turns an uploaded archive into a spreadsheet and a media map
#[derive(Debug, Clone, Default)]
pub struct ArchiveExtractor {
    config: ExtractorConfig,
}

impl ArchiveExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Reject empty and oversized archives before anything is read
    pub fn check_size(&self, size: u64) -> ImportResult<()> {
        if size == 0 {
            return Err(ImportError::EmptyArchive);
        }
        if size > self.config.max_archive_bytes {
            return Err(ImportError::too_large(size, self.config.max_archive_bytes));
        }
        Ok(())
    }

    /// Read and decompress an archive. Progress covers 0-50%.
    pub async fn extract(&self, source: ArchiveSource, progress: &ProgressReporter) -> ImportResult<ExtractedArchive> {
        self.extract_with_cancel(source, progress, &CancellationToken::new()).await
    }

    /// Like [`extract`](Self::extract), stopping with `ImportError::Cancelled`
    /// between chunks and between entries once `cancel` fires
    #[instrument(skip(self, progress, cancel))]
    pub async fn extract_with_cancel(
        &self,
        source: ArchiveSource,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ImportResult<ExtractedArchive> {
        self.config.validate()?;
        if cancel.is_cancelled() {
            return Err(ImportError::Cancelled);
        }

        let read = match source {
            ArchiveSource::Bytes(data) => {
                self.check_size(data.len() as u64)?;
                progress.report(READ_END, "Archive loaded");
                ReadStrategy::Buffered { data }
            }
            ArchiveSource::Reader { reader, size } => {
                self.check_size(size)?;
                self.read(reader, size, progress, cancel).await?
            }
            ArchiveSource::File(path) => {
                let size = tokio::fs::metadata(&path).await?.len();
                self.check_size(size)?;
                let file = tokio::fs::File::open(&path).await?;
                self.read(file, size, progress, cancel).await?
            }
        };

        let streamed = read.is_streamed();
        let archive_bytes = read.len();
        debug!(strategy = read.as_str(), archive_bytes, "archive read");

        let entry_progress = progress.clone();
        let entry_cancel = cancel.clone();
        let (spreadsheet, media) =
            tokio::task::spawn_blocking(move || extract_entries(read.into_body(), &entry_progress, &entry_cancel))
                .await
                .map_err(ImportError::task)??;

        info!(
            spreadsheet = spreadsheet.as_ref().map(|s| s.filename.as_str()),
            media_files = media.len(),
            streamed,
            "archive extracted"
        );

        Ok(ExtractedArchive {
            spreadsheet,
            media,
            streamed,
            archive_bytes,
        })
    }

    async fn read<R>(
        &self,
        reader: R,
        size: u64,
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> ImportResult<ReadStrategy>
    where
        R: AsyncRead + Unpin,
    {
        if size > self.config.streaming_threshold_bytes {
            match self.create_spool() {
                Ok(spool) => {
                    return read_streamed(
                        reader,
                        spool,
                        size,
                        self.config.chunk_size_bytes,
                        self.config.max_archive_bytes,
                        progress,
                        cancel,
                    )
                    .await;
                }
                Err(e) => warn!(error = %e, size, "cannot create archive spool, reading into memory"),
            }
        }
        read_buffered(reader, size, self.config.max_archive_bytes, progress, cancel).await
    }

    fn create_spool(&self) -> std::io::Result<std::fs::File> {
        match &self.config.spool_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
    }
}

/// Decompress entries one at a time. Blocking: run on the blocking pool.
fn extract_entries<R: Read + Seek>(
    body: R,
    progress: &ProgressReporter,
    cancel: &CancellationToken,
) -> ImportResult<(Option<SpreadsheetBlob>, MediaMap)> {
    let mut archive = zip::ZipArchive::new(body)?;
    let total = archive.len();
    let mut spreadsheet: Option<SpreadsheetBlob> = None;
    let mut media = MediaMap::new();

    for index in 0..total {
        if cancel.is_cancelled() {
            debug!(index, total, "archive extraction cancelled");
            return Err(ImportError::Cancelled);
        }
        let mut entry = archive.by_index(index)?;
        let path = entry.name().to_string();

        match EntryKind::classify(&path, entry.is_dir()) {
            EntryKind::Skipped => debug!(%path, "skipping archive entry"),
            EntryKind::Other => debug!(%path, "ignoring unsupported archive entry"),
            EntryKind::Spreadsheet(_) if spreadsheet.is_some() => {
                warn!(%path, "archive holds more than one spreadsheet, ignoring this one");
            }
            EntryKind::Spreadsheet(format) => {
                let data = read_entry(&mut entry)?;
                spreadsheet = Some(SpreadsheetBlob::new(base_name(&path), format, data));
            }
            EntryKind::Media => {
                let data = read_entry(&mut entry)?;
                let asset = MediaAsset::new(&path, data);
                if let Some(previous) = media.insert(asset.filename.clone(), asset) {
                    debug!(filename = %previous.filename, %path, "duplicate media name, keeping the later entry");
                }
            }
        }

        progress.report_span(
            READ_END,
            ENTRIES_END,
            index as u64 + 1,
            total as u64,
            &format!("Extracting files ({} of {})", index + 1, total),
        );
    }

    if total == 0 {
        progress.report(ENTRIES_END, "Archive has no entries");
    }
    Ok((spreadsheet, media))
}

fn read_entry(entry: &mut zip::read::ZipFile<'_>) -> ImportResult<Bytes> {
    let mut data = Vec::with_capacity(entry.size().min(MAX_ENTRY_PREALLOC) as usize);
    entry.read_to_end(&mut data)?;
    Ok(Bytes::from(data))
}
