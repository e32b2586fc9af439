//! JaCoCo CSV format parser
//!
//! The CSV summary carries one row per class with aggregate counters, so the
//! result has a ratio but no per-line detail.

use csv::{ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::{read_java_identity, CoverageResult, JavaIdentity, LineTotals};
use crate::error::{CoverageError, Result};

pub const PACKAGE_COLUMN: &str = "PACKAGE";
pub const CLASS_COLUMN: &str = "CLASS";
pub const LINE_MISSED_COLUMN: &str = "LINE_MISSED";
pub const LINE_COVERED_COLUMN: &str = "LINE_COVERED";

const INLINE_REPORT: &str = "<inline>";

/// Parse a JaCoCo CSV report for the class declared in `src_file_path`.
pub fn parse_jacoco(report_path: &Path, src_file_path: &Path) -> Result<CoverageResult> {
    let identity = read_java_identity(src_file_path)?;

    let file = File::open(report_path).map_err(|source| CoverageError::ReportRead {
        path: report_path.to_path_buf(),
        source,
    })?;
    let totals = lookup(file, &identity, report_path)?;

    tracing::debug!(
        package = %identity.package,
        class = %identity.class,
        missed = totals.missed,
        covered = totals.covered,
        "JaCoCo line counters"
    );

    Ok(CoverageResult::from_totals(totals))
}

/// Find the `LINE_MISSED`/`LINE_COVERED` counters of the first row whose
/// `PACKAGE` and `CLASS` equal `identity`. Both are zero when no row matches.
pub fn lookup_line_counts<R: Read>(reader: R, identity: &JavaIdentity) -> Result<LineTotals> {
    lookup(reader, identity, Path::new(INLINE_REPORT))
}

/// Header positions of the columns we read
struct Columns {
    package: Option<usize>,
    class: Option<usize>,
    missed: Option<usize>,
    covered: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Self {
        let find = |name: &str| headers.iter().position(|h| h == name);
        Self {
            package: find(PACKAGE_COLUMN),
            class: find(CLASS_COLUMN),
            missed: find(LINE_MISSED_COLUMN),
            covered: find(LINE_COVERED_COLUMN),
        }
    }
}

fn lookup<R: Read>(reader: R, identity: &JavaIdentity, report_path: &Path) -> Result<LineTotals> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| malformed(report_path, format!("invalid CSV header: {}", e)))?
        .clone();
    let columns = Columns::from_headers(&headers);

    for record in rdr.records() {
        let record = record.map_err(|e| malformed(report_path, format!("invalid CSV row: {}", e)))?;

        let package = field(&record, columns.package, PACKAGE_COLUMN, identity)?;
        let class = field(&record, columns.class, CLASS_COLUMN, identity)?;

        if package == Some(identity.package.as_str()) && class == Some(identity.class.as_str()) {
            let missed = counter(&record, columns.missed, LINE_MISSED_COLUMN, identity, report_path)?;
            let covered = counter(&record, columns.covered, LINE_COVERED_COLUMN, identity, report_path)?;
            let totals = LineTotals { covered, missed };
            if totals.checked_total().is_none() {
                return Err(malformed(
                    report_path,
                    format!(
                        "line counters for {}.{} overflow: {} missed + {} covered",
                        identity.package, identity.class, missed, covered
                    ),
                ));
            }
            return Ok(totals);
        }
    }

    Ok(LineTotals::default())
}

/// Value of a key column; a short row yields `None`, an absent header is fatal.
fn field<'r>(
    record: &'r StringRecord,
    index: Option<usize>,
    column: &str,
    identity: &JavaIdentity,
) -> Result<Option<&'r str>> {
    match index {
        Some(index) => Ok(record.get(index)),
        None => Err(missing_column(column, identity)),
    }
}

fn counter(
    record: &StringRecord,
    index: Option<usize>,
    column: &str,
    identity: &JavaIdentity,
    report_path: &Path,
) -> Result<u64> {
    let value = index
        .and_then(|index| record.get(index))
        .ok_or_else(|| missing_column(column, identity))?;

    value.trim().parse::<u64>().map_err(|_| {
        malformed(
            report_path,
            format!(
                "column {} for {}.{} is not a line count: '{}'",
                column, identity.package, identity.class, value
            ),
        )
    })
}

fn missing_column(column: &str, identity: &JavaIdentity) -> CoverageError {
    tracing::error!(
        column,
        package = %identity.package,
        class = %identity.class,
        "Missing expected column in CSV"
    );
    CoverageError::MissingColumn {
        column: column.to_string(),
        package: identity.package.clone(),
        class: identity.class.clone(),
    }
}

fn malformed(report_path: &Path, detail: String) -> CoverageError {
    tracing::error!(report = %report_path.display(), %detail, "malformed JaCoCo report");
    CoverageError::malformed(report_path, detail)
}
