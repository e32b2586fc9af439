//! Report processor
//!
//! Runs one coverage check: freshness validation, then format dispatch.

use std::path::{Path, PathBuf};

use crate::coverage::{parse_report, CoverageFormat, CoverageResult};
use crate::error::Result;
use crate::freshness::verify_report_update;

/// What to parse and for which source file. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorConfig {
    report_path: PathBuf,
    src_file_path: PathBuf,
    format: CoverageFormat,
}

impl ProcessorConfig {
    pub fn new(
        report_path: impl Into<PathBuf>,
        src_file_path: impl Into<PathBuf>,
        format: CoverageFormat,
    ) -> Self {
        Self {
            report_path: report_path.into(),
            src_file_path: src_file_path.into(),
            format,
        }
    }

    /// Build from a textual format tag, failing on unknown tags.
    pub fn from_tag(
        report_path: impl Into<PathBuf>,
        src_file_path: impl Into<PathBuf>,
        format: &str,
    ) -> Result<Self> {
        Ok(Self::new(report_path, src_file_path, format.parse()?))
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn src_file_path(&self) -> &Path {
        &self.src_file_path
    }

    pub fn format(&self) -> CoverageFormat {
        self.format
    }
}

/// Turns one coverage report into a [`CoverageResult`] for one source file
#[derive(Debug, Clone)]
pub struct ReportProcessor {
    config: ProcessorConfig,
}

impl ReportProcessor {
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Check that the report was rewritten after `time_of_test_command`
    /// (epoch milliseconds), then parse it.
    pub fn process_coverage_report(&self, time_of_test_command: i64) -> Result<CoverageResult> {
        self.verify_report_update(time_of_test_command)?;
        let result = self.parse_coverage_report()?;

        tracing::info!(
            source = %self.config.src_file_path.display(),
            format = %self.config.format,
            ratio = result.coverage_ratio,
            covered = result.line_totals.covered,
            missed = result.line_totals.missed,
            "processed coverage report"
        );
        Ok(result)
    }

    pub fn verify_report_update(&self, time_of_test_command: i64) -> Result<()> {
        verify_report_update(&self.config.report_path, time_of_test_command)
    }

    /// Parse without the freshness check.
    pub fn parse_coverage_report(&self) -> Result<CoverageResult> {
        parse_report(
            self.config.format,
            &self.config.report_path,
            &self.config.src_file_path,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoverageError;
    use crate::freshness::{modified_ms, now_ms};
    use std::fs;
    use tempfile::tempdir;

    const COBERTURA: &str = r#"<?xml version="1.0" ?>
<coverage version="7.4.0" line-rate="0.6667">
    <packages>
        <package name="src" line-rate="0.6667">
            <classes>
                <class name="app.py" filename="src/app.py" line-rate="0.6667">
                    <lines>
                        <line number="1" hits="2"/>
                        <line number="2" hits="0"/>
                        <line number="3" hits="5"/>
                    </lines>
                </class>
            </classes>
        </package>
    </packages>
</coverage>
"#;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn just_before(path: &Path) -> i64 {
        modified_ms(path).unwrap() - 1
    }

    #[test]
    fn test_cobertura_scenario() {
        let dir = tempdir().unwrap();
        let report = write(dir.path(), "coverage.xml", COBERTURA);
        let processor = ReportProcessor::new(ProcessorConfig::new(
            &report,
            "project/src/app.py",
            CoverageFormat::Cobertura,
        ));

        let result = processor.process_coverage_report(just_before(&report)).unwrap();

        assert_eq!(result.covered_lines, vec![1, 3]);
        assert_eq!(result.missed_lines, vec![2]);
        assert!((result.coverage_ratio - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_cobertura_no_match_scenario() {
        let dir = tempdir().unwrap();
        let report = write(
            dir.path(),
            "coverage.xml",
            r#"<coverage><packages><package><classes><class filename="other.py"><lines><line number="1" hits="1"/></lines></class></classes></package></packages></coverage>"#,
        );
        let processor = ReportProcessor::new(ProcessorConfig::new(&report, "app.py", CoverageFormat::Cobertura));

        let result = processor.process_coverage_report(just_before(&report)).unwrap();

        assert!(result.covered_lines.is_empty());
        assert!(result.missed_lines.is_empty());
        assert_eq!(result.coverage_ratio, 0.0);
    }

    #[test]
    fn test_jacoco_scenario() {
        let dir = tempdir().unwrap();
        let source = write(dir.path(), "Foo.java", "package com.example;\n\npublic class Foo {\n}\n");
        let report = write(
            dir.path(),
            "jacoco.csv",
            "GROUP,PACKAGE,CLASS,LINE_MISSED,LINE_COVERED\ndemo,com.example,Foo,4,16\n",
        );
        let processor = ReportProcessor::new(ProcessorConfig::new(&report, &source, CoverageFormat::Jacoco));

        let result = processor.process_coverage_report(just_before(&report)).unwrap();
        assert!((result.coverage_ratio - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_jacoco_missing_column_scenario() {
        let dir = tempdir().unwrap();
        let source = write(dir.path(), "Foo.java", "package com.example;\npublic class Foo {}\n");
        let report = write(
            dir.path(),
            "jacoco.csv",
            "GROUP,PACKAGE,CLASS,LINE_MISSED\ndemo,com.example,Foo,4\n",
        );
        let processor = ReportProcessor::new(ProcessorConfig::new(&report, &source, CoverageFormat::Jacoco));

        let err = processor.process_coverage_report(just_before(&report)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_lcov_scenario() {
        let dir = tempdir().unwrap();
        let report = write(dir.path(), "lcov.info", "SF:src/lib.rs\nDA:1,1\nend_of_record\n");
        let processor = ReportProcessor::new(ProcessorConfig::from_tag(&report, "src/lib.rs", "lcov").unwrap());

        let err = processor.process_coverage_report(just_before(&report)).unwrap_err();
        assert!(matches!(err, CoverageError::NotImplemented(CoverageFormat::Lcov)));
    }

    #[test]
    fn test_unknown_tag() {
        let err = ProcessorConfig::from_tag("r.xml", "app.py", "clover").unwrap_err();
        assert!(matches!(err, CoverageError::UnsupportedFormat(ref tag) if tag == "clover"));
    }

    #[test]
    fn test_stale_report_is_not_parsed() {
        let dir = tempdir().unwrap();
        // Any parse attempt on this content would fail as malformed.
        let report = write(dir.path(), "coverage.xml", "<coverage><unclosed>");
        let processor = ReportProcessor::new(ProcessorConfig::new(&report, "app.py", CoverageFormat::Cobertura));

        let err = processor.process_coverage_report(now_ms() + 60_000).unwrap_err();
        assert!(matches!(err, CoverageError::ReportNotUpdated { .. }));

        // The same report is rejected as malformed once it counts as fresh.
        let err = processor.process_coverage_report(just_before(&report)).unwrap_err();
        assert!(err.is_malformed());
    }

    #[test]
    fn test_missing_report() {
        let dir = tempdir().unwrap();
        let processor = ReportProcessor::new(ProcessorConfig::new(
            dir.path().join("coverage.xml"),
            "app.py",
            CoverageFormat::Cobertura,
        ));

        let err = processor.process_coverage_report(0).unwrap_err();
        assert!(matches!(err, CoverageError::ReportNotGenerated { .. }));
    }

    #[test]
    fn test_processing_is_idempotent() {
        let dir = tempdir().unwrap();
        let report = write(dir.path(), "coverage.xml", COBERTURA);
        let processor = ReportProcessor::new(ProcessorConfig::new(&report, "app.py", CoverageFormat::Cobertura));
        let since = just_before(&report);

        let first = processor.process_coverage_report(since).unwrap();
        let second = processor.process_coverage_report(since).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_config_accessors() {
        let config = ProcessorConfig::new("r.csv", "Foo.java", CoverageFormat::Jacoco);
        assert_eq!(config.report_path(), Path::new("r.csv"));
        assert_eq!(config.src_file_path(), Path::new("Foo.java"));
        assert_eq!(config.format(), CoverageFormat::Jacoco);
    }
}
