//! Error types for coverage report processing

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::coverage::CoverageFormat;

/// Convenience alias used throughout the library
pub type Result<T> = std::result::Result<T, CoverageError>;

/// Every way a coverage check can fail.
///
/// All variants are fatal for the current check: no partial result is ever
/// returned alongside one of these.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// The report file does not exist.
    #[error("Fatal: Coverage report \"{}\" was not generated.", path.display())]
    ReportNotGenerated { path: PathBuf },

    /// The report exists but predates the test command.
    #[error(
        "Fatal: The coverage report file was not updated after the test command. \
         file_mod_time_ms: {modified_ms}, time_of_test_command: {test_started_ms}"
    )]
    ReportNotUpdated {
        path: PathBuf,
        modified_ms: i64,
        test_started_ms: i64,
    },

    /// The format tag is not one we know about.
    #[error("Unsupported coverage report type: {0}")]
    UnsupportedFormat(String),

    /// The format is known but has no parser.
    #[error("Parsing for {0} coverage reports is not implemented yet.")]
    NotImplemented(CoverageFormat),

    /// The report could not be parsed.
    #[error("Malformed coverage report {}: {detail}", path.display())]
    MalformedReport { path: PathBuf, detail: String },

    /// A matching JaCoCo row lacks a column we need.
    #[error("Missing expected column in CSV: '{column}' (package '{package}', class '{class}')")]
    MissingColumn {
        column: String,
        package: String,
        class: String,
    },

    /// The target source file could not be read.
    #[error("Error reading file {}: {source}", path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The report passed the freshness check but could not be opened.
    #[error("Error reading coverage report {}: {source}", path.display())]
    ReportRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CoverageError {
    /// Report missing or older than the test run.
    pub fn is_stale(&self) -> bool {
        matches!(
            self,
            CoverageError::ReportNotGenerated { .. } | CoverageError::ReportNotUpdated { .. }
        )
    }

    /// Report content could not be interpreted.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            CoverageError::MalformedReport { .. } | CoverageError::MissingColumn { .. }
        )
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, detail: impl Into<String>) -> Self {
        CoverageError::MalformedReport {
            path: path.into(),
            detail: detail.into(),
        }
    }
}
