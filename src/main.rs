mod config;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing_subscriber::EnvFilter;

use config::Config;
use covnorm::freshness::now_ms;
use covnorm::{
    compare_coverage, validate_threshold, CoverageComparison, CoverageResult, ProcessorConfig,
    ReportProcessor,
};

const CONFIG_FILE: &str = "covnorm.toml";
const LOG_ENV: &str = "COVNORM_LOG";

#[derive(Parser)]
#[command(name = "covnorm")]
#[command(about = "Normalize coverage reports into per-file line coverage")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file (default: covnorm.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct Target {
    /// Coverage report file
    #[arg(long)]
    report: Option<PathBuf>,

    /// Source file whose coverage is wanted
    #[arg(long)]
    source: Option<PathBuf>,

    /// Report format: cobertura, jacoco or lcov
    #[arg(long)]
    format: Option<String>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process an existing report written after the given time
    Process {
        #[command(flatten)]
        target: Target,

        /// Launch time of the test command, in milliseconds since the epoch
        #[arg(long)]
        since: i64,
    },

    /// Run a test command, then process the report it wrote
    Run {
        #[command(flatten)]
        target: Target,

        /// Fail when the coverage ratio is below this value (0..=1)
        #[arg(long)]
        threshold: Option<f64>,

        /// Compare against a result saved earlier with --json
        #[arg(long)]
        baseline: Option<PathBuf>,

        /// Test command to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },
}

fn main() {
    if let Err(e) = run() {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(|| PathBuf::from(CONFIG_FILE));
    let config = if cli.config.is_some() {
        Config::load(&config_path)
    } else {
        Config::load_or_default(&config_path)
    }
    .with_context(|| format!("Could not load {}", config_path.display()))?;

    match cli.command {
        Commands::Process { target, since } => cmd_process(&config, &target, since),
        Commands::Run {
            target,
            threshold,
            baseline,
            command,
        } => cmd_run(&config, &target, threshold, baseline.as_deref(), &command),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn processor_for(config: &Config, target: &Target) -> Result<ReportProcessor> {
    let report = target
        .report
        .clone()
        .or_else(|| config.report.path.clone())
        .context("No coverage report given. Use --report or set [report] path in covnorm.toml")?;
    let source = target
        .source
        .clone()
        .or_else(|| config.source.path.clone())
        .context("No source file given. Use --source or set [source] path in covnorm.toml")?;
    let format = target
        .format
        .clone()
        .or_else(|| config.report.format.clone())
        .context("No report format given. Use --format or set [report] format in covnorm.toml")?;

    Ok(ReportProcessor::new(ProcessorConfig::from_tag(report, source, &format)?))
}

fn cmd_process(config: &Config, target: &Target, since: i64) -> Result<()> {
    let processor = processor_for(config, target)?;
    let result = processor.process_coverage_report(since)?;
    print_result(&processor, &result, target.json)
}

fn cmd_run(
    config: &Config,
    target: &Target,
    threshold: Option<f64>,
    baseline: Option<&Path>,
    command: &[String],
) -> Result<()> {
    let processor = processor_for(config, target)?;
    let threshold = threshold.or(config.run.threshold);
    if let Some(t) = threshold {
        if !(0.0..=1.0).contains(&t) {
            anyhow::bail!("--threshold must be between 0 and 1, got {}", t);
        }
    }
    // Read before the test command runs, which may overwrite it.
    let baseline = baseline.map(load_baseline).transpose()?;

    let command_line = command.join(" ");
    if !target.json {
        println!("{} {}", "▶".cyan(), command_line.bold());
    }

    let started = now_ms();
    let status = shell(&command_line)
        .status()
        .with_context(|| format!("Failed to run test command: {}", command_line))?;

    if !status.success() {
        eprintln!(
            "{} Test command failed ({}); coverage not checked",
            "✗".red(),
            status
        );
        std::process::exit(status.code().unwrap_or(1));
    }

    let result = processor.process_coverage_report(started)?;
    let comparison = baseline.as_ref().map(|old| compare_coverage(old, &result));

    match &comparison {
        Some(comparison) if target.json => print_comparison_json(&result, comparison)?,
        _ => print_result(&processor, &result, target.json)?,
    }

    let outcome = validate_threshold(&result, threshold);
    if !target.json {
        if let Some(comparison) = &comparison {
            comparison.print_summary();
        }
        outcome.print_summary();
    }
    if !outcome.passed {
        std::process::exit(1);
    }

    Ok(())
}

fn load_baseline(path: &Path) -> Result<CoverageResult> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read baseline {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Baseline {} is not a covnorm JSON result", path.display()))
}

fn shell(command_line: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    } else {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        cmd
    }
}

fn print_result(processor: &ReportProcessor, result: &CoverageResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    let config = processor.config();
    println!(
        "\n{} {} {}",
        "📊".cyan(),
        config.src_file_path().display().to_string().bold(),
        format!("({})", config.format()).dimmed()
    );
    println!(
        "  {} {:.1}% ({}/{} lines)",
        "coverage:".dimmed(),
        result.percentage(),
        result.line_totals.covered,
        result.total_lines()
    );

    if result.has_line_detail() {
        println!("  {} {}", "covered:".dimmed(), join_lines(&result.covered_lines).green());
        println!("  {} {}", "missed:".dimmed(), join_lines(&result.missed_lines).red());
    }

    if result.total_lines() == 0 && !result.observed_file_names.is_empty() {
        println!("  {}", "No entry matched the source file. Files in report:".yellow());
        for name in &result.observed_file_names {
            println!("    {} {}", "•".dimmed(), name);
        }
    }

    Ok(())
}

fn print_comparison_json(result: &CoverageResult, comparison: &CoverageComparison) -> Result<()> {
    let output = serde_json::json!({
        "result": result,
        "comparison": comparison,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn join_lines(lines: &[u32]) -> String {
    if lines.is_empty() {
        return "-".to_string();
    }
    lines.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", ")
}
