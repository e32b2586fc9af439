//! covnorm - coverage report normalization
//!
//! Reads a tool-specific coverage report and reduces it to the coverage of a
//! single target source file:
//! - Cobertura XML: per-line hits for the class whose filename ends with the
//!   target's base name
//! - JaCoCo CSV: aggregate line counters for the Java class declared in the
//!   target source
//! - LCOV: recognized, not implemented
//!
//! Every check first verifies that the report was rewritten after the test
//! command was launched.

pub mod coverage;
pub mod error;
pub mod freshness;
pub mod processor;

#[cfg(test)]
mod test_log;

pub use coverage::{
    compare_coverage, parse_report, validate_threshold, CoverageComparison, CoverageFormat,
    CoverageResult, JavaIdentity, LineTotals, ThresholdResult,
};
pub use error::{CoverageError, Result};
pub use processor::{ProcessorConfig, ReportProcessor};
