use lamah_blob::MediaRole;
use serde::Serialize;

use crate::record::DropReason;

/// A row that was not imported because a required field was empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DroppedRecord {
    pub record_index: usize,
    pub row_number: usize,
    pub reason: DropReason,
}

/// A media reference that could not be uploaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedMedia {
    pub role: MediaRole,
    pub filename: String,
    pub reason: String,
}

/// Media problems of one record. Only present when something went wrong.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaIssue {
    pub record_index: usize,
    pub row_number: usize,
    /// Referenced filenames absent from the archive
    pub missing: Vec<String>,
    pub failed: Vec<FailedMedia>,
}

impl MediaIssue {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// A record the content store already held
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedRecord {
    pub record_index: usize,
    pub row_number: usize,
    pub message: String,
}

/// A record whose creation call failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationFailure {
    pub record_index: usize,
    pub row_number: usize,
    pub message: String,
}

/// Outcome of one import run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    /// Records created, media failures notwithstanding
    pub imported: usize,
    pub created_ids: Vec<String>,
    pub dropped: Vec<DroppedRecord>,
    pub media_issues: Vec<MediaIssue>,
    pub skipped_duplicates: Vec<SkippedRecord>,
    pub creation_failures: Vec<CreationFailure>,
    /// Data rows found in the spreadsheet
    pub total_rows: usize,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl ImportReport {
    pub(crate) fn new(total_rows: usize) -> Self {
        Self {
            total_rows,
            ..Self::default()
        }
    }

    pub(crate) fn record_created(&mut self, id: String) {
        self.imported += 1;
        self.created_ids.push(id);
    }

    pub(crate) fn record_dropped(&mut self, record_index: usize, row_number: usize, reason: DropReason) {
        self.dropped.push(DroppedRecord {
            record_index,
            row_number,
            reason,
        });
    }

    pub(crate) fn record_media_issue(&mut self, issue: MediaIssue) {
        if !issue.is_empty() {
            self.media_issues.push(issue);
        }
    }

    pub(crate) fn record_duplicate(&mut self, record_index: usize, row_number: usize, message: String) {
        self.skipped_duplicates.push(SkippedRecord {
            record_index,
            row_number,
            message,
        });
    }

    pub(crate) fn record_creation_failure(&mut self, record_index: usize, row_number: usize, message: String) {
        self.creation_failures.push(CreationFailure {
            record_index,
            row_number,
            message,
        });
    }

    /// Records that went through the sink, whatever the outcome
    pub fn processed(&self) -> usize {
        self.imported + self.dropped.len() + self.skipped_duplicates.len() + self.creation_failures.len()
    }

    /// Media issue entry for a record, if it had one
    pub fn media_issue(&self, record_index: usize) -> Option<&MediaIssue> {
        self.media_issues.iter().find(|issue| issue.record_index == record_index)
    }

    pub fn is_clean(&self) -> bool {
        !self.cancelled
            && self.dropped.is_empty()
            && self.media_issues.is_empty()
            && self.skipped_duplicates.is_empty()
            && self.creation_failures.is_empty()
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let mut summary = format!(
            "{} of {} imported, {} dropped, {} with media issues",
            self.imported,
            self.total_rows,
            self.dropped.len(),
            self.media_issues.len()
        );
        if !self.skipped_duplicates.is_empty() {
            summary.push_str(&format!(", {} duplicates skipped", self.skipped_duplicates.len()));
        }
        if !self.creation_failures.is_empty() {
            summary.push_str(&format!(", {} failed to save", self.creation_failures.len()));
        }
        if self.cancelled {
            summary.push_str(" (cancelled)");
        }
        summary
    }
}
