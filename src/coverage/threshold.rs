//! Coverage threshold validation and run-to-run comparison

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;

use super::CoverageResult;

/// Result of threshold validation
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdResult {
    pub passed: bool,
    pub ratio: f64,
    pub threshold: Option<f64>,
    pub delta: Option<f64>,
}

impl ThresholdResult {
    pub fn print_summary(&self) {
        let Some(threshold) = self.threshold else {
            println!("  {} Line coverage: {:.1}%", "•".cyan(), self.ratio * 100.0);
            return;
        };

        let delta = (self.ratio - threshold) * 100.0;
        let status = if self.passed { "✓".green() } else { "✗".red() };
        let delta_str = if delta >= 0.0 {
            format!("+{:.1}%", delta).green()
        } else {
            format!("{:.1}%", delta).red()
        };

        println!(
            "  {} Line coverage: {:.1}% (threshold: {:.1}%, {})",
            status,
            self.ratio * 100.0,
            threshold * 100.0,
            delta_str
        );
    }
}

/// Validate a result against a desired ratio in [0, 1]. Passes when no
/// threshold is set.
pub fn validate_threshold(result: &CoverageResult, threshold: Option<f64>) -> ThresholdResult {
    let ratio = result.coverage_ratio;

    ThresholdResult {
        passed: threshold.map(|t| ratio >= t).unwrap_or(true),
        ratio,
        threshold,
        delta: threshold.map(|t| ratio - t),
    }
}

/// Compare coverage between two runs
pub fn compare_coverage(old: &CoverageResult, new: &CoverageResult) -> CoverageComparison {
    let delta = new.coverage_ratio - old.coverage_ratio;

    let previously_covered: BTreeSet<u32> = old.covered_lines.iter().copied().collect();
    let previously_missed: BTreeSet<u32> = old.missed_lines.iter().copied().collect();
    let newly_covered: Vec<u32> = new
        .covered_lines
        .iter()
        .copied()
        .filter(|line| previously_missed.contains(line) && !previously_covered.contains(line))
        .collect::<BTreeSet<u32>>()
        .into_iter()
        .collect();

    CoverageComparison {
        old_ratio: old.coverage_ratio,
        new_ratio: new.coverage_ratio,
        delta,
        newly_covered,
        improved: delta > 0.0,
        degraded: delta < 0.0,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageComparison {
    pub old_ratio: f64,
    pub new_ratio: f64,
    pub delta: f64,
    /// Lines missed in the old run and covered in the new one, ascending
    pub newly_covered: Vec<u32>,
    pub improved: bool,
    pub degraded: bool,
}

impl CoverageComparison {
    pub fn print_summary(&self) {
        println!("Coverage comparison:");

        let indicator = if self.improved {
            "↑".green()
        } else if self.degraded {
            "↓".red()
        } else {
            "→".dimmed()
        };

        let delta = self.delta * 100.0;
        let delta_str = if self.improved {
            format!("+{:.1}%", delta).green()
        } else if self.degraded {
            format!("{:.1}%", delta).red()
        } else {
            "0%".dimmed()
        };

        println!(
            "  {} Line: {:.1}% → {:.1}% ({})",
            indicator,
            self.old_ratio * 100.0,
            self.new_ratio * 100.0,
            delta_str
        );

        if !self.newly_covered.is_empty() {
            let lines: Vec<String> = self.newly_covered.iter().map(|l| l.to_string()).collect();
            println!("  {} {}", "newly covered:".dimmed(), lines.join(", "));
        }
    }
}
