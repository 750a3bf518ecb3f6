//! # lamah-import: bulk trivia import
//!
//! Turns a ZIP archive (one spreadsheet plus media files) into persisted
//! questions with uploaded media:
//!
//! 1. [`ArchiveExtractor`] validates the archive size and splits entries into
//!    the spreadsheet and a filename-keyed media map
//! 2. [`read_sheet`] and [`ImportRecord::from_row`] normalize rows, matching
//!    English and Arabic header aliases
//! 3. [`MediaResolver`] matches each record's references to extracted files
//! 4. [`BatchOrchestrator`] uploads media through a [`lamah_blob::AssetUploader`]
//!    and creates records through a [`ContentStore`], in spreadsheet order
//!
//! ```rust,no_run
//! use lamah_import::prelude::*;
//! use lamah_blob::prelude::*;
//!
//! # async fn run(uploader: AssetUploader) -> ImportResult<()> {
//! let orchestrator = BatchOrchestrator::new(uploader, MemoryContentStore::new(), ImportConfig::from_env());
//! let ctx = ImportContext::new("animals", Credential::bearer("token"));
//! let progress = ProgressReporter::new(|percent, message| println!("{:>3}% {}", percent, message));
//!
//! let archive = ArchiveSource::file("questions.zip");
//! let report = orchestrator.run(ImportSource::Archive(archive), &ctx, progress).await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```
//!
//! Only archive-level problems fail a run. Row, media and record failures
//! are collected in the [`ImportReport`].

mod aliases;
mod archive;
mod config;
mod content;
mod error;
mod orchestrator;
mod progress;
mod record;
mod report;
mod resolver;
mod sheet;

pub use aliases::{normalize_header, Field, FieldAliases, HeaderIndex};
pub use archive::{
    read_buffered, read_streamed, ArchiveExtractor, ArchiveSource, EntryKind, ExtractedArchive, MediaMap,
    ReadStrategy,
};
pub use config::{ExtractorConfig, ImportConfig, MAX_UPLOAD_CONCURRENCY};
pub use content::{ContentStore, CreatedRecord, MemoryContentStore, NewQuestion};
pub use error::{ContentError, ImportError, ImportResult};
pub use orchestrator::{BatchOrchestrator, ImportContext, ImportSource};
pub use progress::{record_percent, span_percent, ProgressReporter};
pub use record::{Difficulty, DropReason, ImportRecord, MediaRefs};
pub use report::{CreationFailure, DroppedRecord, FailedMedia, ImportReport, MediaIssue, SkippedRecord};
pub use resolver::{MediaResolver, Resolved, ResolvedMedia};
pub use sheet::{cell_to_string, read_sheet, RawRow, RawSheet, SheetFormat, SpreadsheetBlob};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ArchiveExtractor, ArchiveSource, BatchOrchestrator, ContentError, ContentStore, CreatedRecord,
        ExtractorConfig, ImportConfig, ImportContext, ImportError, ImportReport, ImportResult, ImportSource,
        MemoryContentStore, NewQuestion, ProgressReporter, SpreadsheetBlob,
    };
}
