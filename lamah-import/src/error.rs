use thiserror::Error;

const GIB: f64 = 1024.0 * 1024.0 * 1024.0;

fn gib(bytes: &u64) -> f64 {
    *bytes as f64 / GIB
}

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// Errors that abort an import before any record is processed
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Archive is empty (0 bytes)")]
    EmptyArchive,

    #[error("Archive is {:.2} GiB ({} bytes), which exceeds the {} GiB limit", gib(.size), .size, gib(.limit))]
    ArchiveTooLarge { size: u64, limit: u64 },

    #[error("Failed to read archive: {source}")]
    Archive {
        #[from]
        source: zip::result::ZipError,
    },

    #[error("No spreadsheet (.xlsx, .xls, .xlsm, .ods or .csv) found in the archive")]
    MissingSpreadsheet,

    #[error("Failed to read spreadsheet '{filename}': {message}")]
    Spreadsheet { filename: String, message: String },

    #[error("Spreadsheet '{filename}' has no header row")]
    MissingHeader { filename: String },

    #[error("Invalid configuration: {message}")]
    Config { message: String },

    #[error("Import cancelled before the archive was fully read")]
    Cancelled,

    #[error("Import task failed: {message}")]
    Task { message: String },

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl ImportError {
    /// Create an archive size error
    pub fn too_large(size: u64, limit: u64) -> Self {
        Self::ArchiveTooLarge { size, limit }
    }

    /// Create a spreadsheet error from any displayable cause
    pub fn spreadsheet<F: Into<String>, E: std::fmt::Display>(filename: F, error: E) -> Self {
        Self::Spreadsheet {
            filename: filename.into(),
            message: error.to_string(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Create a task error, e.g. from a `JoinError`
    pub fn task<E: std::fmt::Display>(error: E) -> Self {
        Self::Task {
            message: error.to_string(),
        }
    }
}

/// Errors reported by the content-record collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    /// The collaborator already holds an equivalent record
    #[error("Duplicate record: {message}")]
    Duplicate { message: String },

    #[error("Record rejected: {message}")]
    Rejected { message: String },

    #[error("Content store unavailable: {message}")]
    Unavailable { message: String },
}

impl ContentError {
    pub fn duplicate<S: Into<String>>(message: S) -> Self {
        Self::Duplicate {
            message: message.into(),
        }
    }

    pub fn rejected<S: Into<String>>(message: S) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }

    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}
