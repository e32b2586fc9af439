//! Coverage module
//!
//! Provides:
//! - Cobertura XML parsing
//! - JaCoCo CSV parsing (with Java identity extraction)
//! - Threshold validation and run-to-run comparison

mod cobertura;
mod jacoco;
mod java;
mod threshold;

pub use cobertura::*;
pub use jacoco::*;
pub use java::*;
pub use threshold::*;

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::{CoverageError, Result};

/// Coverage report formats understood by the processor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageFormat {
    Cobertura,
    Lcov,
    Jacoco,
}

impl CoverageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageFormat::Cobertura => "cobertura",
            CoverageFormat::Lcov => "lcov",
            CoverageFormat::Jacoco => "jacoco",
        }
    }
}

impl fmt::Display for CoverageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CoverageFormat {
    type Err = CoverageError;

    fn from_str(tag: &str) -> Result<Self> {
        match tag.trim().to_lowercase().as_str() {
            "cobertura" => Ok(CoverageFormat::Cobertura),
            "lcov" => Ok(CoverageFormat::Lcov),
            "jacoco" => Ok(CoverageFormat::Jacoco),
            _ => Err(CoverageError::UnsupportedFormat(tag.to_string())),
        }
    }
}

/// Aggregate line counts behind a coverage ratio
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineTotals {
    pub covered: u64,
    pub missed: u64,
}

impl LineTotals {
    /// Sum of both counters, or `None` when it does not fit in a `u64`.
    pub fn checked_total(&self) -> Option<u64> {
        self.covered.checked_add(self.missed)
    }

    /// Sum of both counters, saturating at `u64::MAX`.
    pub fn total(&self) -> u64 {
        self.covered.saturating_add(self.missed)
    }

    /// Covered fraction in [0, 1]; 0 when nothing was counted.
    pub fn ratio(&self) -> f64 {
        if self.covered == 0 && self.missed == 0 {
            return 0.0;
        }
        let covered = self.covered as f64;
        covered / (covered + self.missed as f64)
    }
}

/// Normalized coverage for one target source file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoverageResult {
    /// Lines executed at least once, in report order
    pub covered_lines: Vec<u32>,
    /// Lines never executed, in report order
    pub missed_lines: Vec<u32>,
    /// Covered fraction in [0, 1]
    pub coverage_ratio: f64,
    /// Every file name seen in the report before the scan stopped
    pub observed_file_names: BTreeSet<String>,
    /// Counts the ratio was computed from
    pub line_totals: LineTotals,
}

impl CoverageResult {
    /// Build a per-line result. Totals and ratio come from the line lists.
    pub fn from_lines(
        covered_lines: Vec<u32>,
        missed_lines: Vec<u32>,
        observed_file_names: BTreeSet<String>,
    ) -> Self {
        let line_totals = LineTotals {
            covered: covered_lines.len() as u64,
            missed: missed_lines.len() as u64,
        };
        Self {
            covered_lines,
            missed_lines,
            coverage_ratio: line_totals.ratio(),
            observed_file_names,
            line_totals,
        }
    }

    /// Build an aggregate-only result; no per-line detail is available.
    pub fn from_totals(line_totals: LineTotals) -> Self {
        Self {
            coverage_ratio: line_totals.ratio(),
            line_totals,
            ..Default::default()
        }
    }

    pub fn total_lines(&self) -> u64 {
        self.line_totals.total()
    }

    pub fn percentage(&self) -> f64 {
        self.coverage_ratio * 100.0
    }

    /// True when the result carries per-line detail.
    pub fn has_line_detail(&self) -> bool {
        !self.covered_lines.is_empty() || !self.missed_lines.is_empty()
    }
}

/// Parse a report in the given format for one target source file.
///
/// No freshness check is done here; see [`crate::ReportProcessor`].
pub fn parse_report(
    format: CoverageFormat,
    report_path: &Path,
    src_file_path: &Path,
) -> Result<CoverageResult> {
    tracing::debug!(
        %format,
        report = %report_path.display(),
        source = %src_file_path.display(),
        "parsing coverage report"
    );

    match format {
        CoverageFormat::Cobertura => parse_cobertura(report_path, src_file_path),
        CoverageFormat::Lcov => Err(CoverageError::NotImplemented(format)),
        CoverageFormat::Jacoco => parse_jacoco(report_path, src_file_path),
    }
}
