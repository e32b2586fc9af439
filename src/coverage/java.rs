//! Java package/class identity extraction
//!
//! JaCoCo CSV rows are keyed by package and class name rather than by file
//! path, so the identity of a target source file is read from its text.

use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::error::{CoverageError, Result};

/// Package and public class declared by a Java source file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JavaIdentity {
    /// Dotted package name; empty for the default package
    pub package: String,
    /// Name of the first `public class`; empty when none was found
    pub class: String,
}

fn package_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*package\s+([\w\.]+)\s*;.*$").expect("package pattern is valid")
    })
}

fn class_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*public\s+class\s+(\w+).*").expect("class pattern is valid"))
}

/// Scan Java source text for its package and public class declarations.
///
/// Each declaration is taken from its first matching line. Scanning stops as
/// soon as both have been found.
pub fn extract_java_identity(source: &str) -> JavaIdentity {
    let mut identity = JavaIdentity::default();

    for line in source.lines() {
        if identity.package.is_empty() {
            if let Some(caps) = package_pattern().captures(line) {
                identity.package = caps[1].to_string();
            }
        }

        if identity.class.is_empty() {
            if let Some(caps) = class_pattern().captures(line) {
                identity.class = caps[1].to_string();
            }
        }

        if !identity.package.is_empty() && !identity.class.is_empty() {
            break;
        }
    }

    identity
}

/// Read `src_file_path` and extract its identity.
pub fn read_java_identity(src_file_path: &Path) -> Result<JavaIdentity> {
    let source = fs::read_to_string(src_file_path).map_err(|source| {
        tracing::error!(
            path = %src_file_path.display(),
            error = %source,
            "Error reading source file"
        );
        CoverageError::SourceRead {
            path: src_file_path.to_path_buf(),
            source,
        }
    })?;

    let identity = extract_java_identity(&source);
    if identity.class.is_empty() {
        tracing::warn!(
            path = %src_file_path.display(),
            "no public class declaration found"
        );
    }

    Ok(identity)
}
