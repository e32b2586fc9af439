use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use covnorm::CoverageFormat;

/// Contents of `covnorm.toml`. Every key is optional; command-line flags
/// take precedence.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub report: ReportSection,
    #[serde(default)]
    pub source: SourceSection,
    #[serde(default)]
    pub run: RunSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReportSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// One of `cobertura`, `jacoco`, `lcov`
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceSection {
    #[serde(default)]
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunSection {
    /// Desired coverage ratio in [0, 1]
    #[serde(default)]
    pub threshold: Option<f64>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load `path` if it exists; a missing file yields the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(ref tag) = self.report.format {
            tag.parse::<CoverageFormat>()
                .with_context(|| "Invalid [report] format")?;
        }

        if let Some(threshold) = self.run.threshold {
            if !(0.0..=1.0).contains(&threshold) {
                anyhow::bail!(
                    "[run] threshold must be between 0 and 1, got {}",
                    threshold
                );
            }
        }

        Ok(())
    }
}
