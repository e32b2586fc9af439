//! Report freshness validation
//!
//! A coverage tool that fails silently leaves the previous run's report on
//! disk. Before any parsing, the report must exist and be newer than the
//! moment the test command was launched.

use chrono::{DateTime, Utc};
use std::fs;
use std::path::Path;
use std::time::SystemTime;

use crate::error::{CoverageError, Result};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert a filesystem timestamp to epoch milliseconds, rounded to the
/// nearest millisecond.
pub fn system_time_to_ms(time: SystemTime) -> i64 {
    let dt: DateTime<Utc> = time.into();
    (dt.timestamp_micros() + 500).div_euclid(1000)
}

/// Last-modified time of `path` in epoch milliseconds. A path that cannot be
/// stat'ed counts as a report that was never generated.
pub fn modified_ms(path: &Path) -> Result<i64> {
    let metadata = fs::metadata(path).map_err(|_| CoverageError::ReportNotGenerated {
        path: path.to_path_buf(),
    })?;
    let modified = metadata.modified().map_err(|source| CoverageError::ReportRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(system_time_to_ms(modified))
}

/// Verify that `path` exists and was modified strictly after
/// `time_of_test_command` (epoch milliseconds).
pub fn verify_report_update(path: &Path, time_of_test_command: i64) -> Result<()> {
    let file_mod_time_ms = modified_ms(path)?;
    if file_mod_time_ms <= time_of_test_command {
        return Err(CoverageError::ReportNotUpdated {
            path: path.to_path_buf(),
            modified_ms: file_mod_time_ms,
            test_started_ms: time_of_test_command,
        });
    }

    tracing::debug!(
        report = %path.display(),
        file_mod_time_ms,
        time_of_test_command,
        "coverage report is fresh"
    );
    Ok(())
}
