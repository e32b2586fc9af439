//! Cobertura XML format parser

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use super::CoverageResult;
use crate::error::{CoverageError, Result};

const INLINE_REPORT: &str = "<inline>";

/// Parse a Cobertura XML file for the class whose filename ends with the
/// base name of `src_file_path`.
pub fn parse_cobertura(report_path: &Path, src_file_path: &Path) -> Result<CoverageResult> {
    let content = fs::read_to_string(report_path).map_err(|source| {
        if source.kind() == io::ErrorKind::InvalidData {
            fail(report_path, format!("report is not valid UTF-8: {}", source))
        } else {
            CoverageError::ReportRead {
                path: report_path.to_path_buf(),
                source,
            }
        }
    })?;

    scan(&content, &target_file_name(src_file_path)).map_err(|detail| fail(report_path, detail))
}

/// Parse Cobertura XML content from a string
pub fn parse_cobertura_str(content: &str, src_file_path: &Path) -> Result<CoverageResult> {
    scan(content, &target_file_name(src_file_path))
        .map_err(|detail| fail(Path::new(INLINE_REPORT), detail))
}

/// Base file name used for suffix matching against `<class filename>`.
///
/// Both separators are honored so Windows-style paths match too.
pub fn target_file_name(src_file_path: &Path) -> String {
    let path = src_file_path.to_string_lossy();
    path.rsplit(['/', '\\']).next().unwrap_or_default().to_string()
}

fn fail(report_path: &Path, detail: String) -> CoverageError {
    tracing::error!(report = %report_path.display(), %detail, "malformed Cobertura report");
    CoverageError::malformed(report_path, detail)
}

/// Where the walk is relative to the target class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scan {
    Searching,
    /// Inside the matched class, opened at this element depth
    InTarget { depth: usize },
    /// Target processed; the rest of the document is only checked for
    /// well-formedness
    Done,
}

struct Walker<'a> {
    target: &'a str,
    state: Scan,
    depth: usize,
    seen_root: bool,
    lines_covered: Vec<u32>,
    lines_missed: Vec<u32>,
    file_names: BTreeSet<String>,
}

impl<'a> Walker<'a> {
    fn new(target: &'a str) -> Self {
        Self {
            target,
            state: Scan::Searching,
            depth: 0,
            seen_root: false,
            lines_covered: Vec::new(),
            lines_missed: Vec::new(),
            file_names: BTreeSet::new(),
        }
    }

    fn open(&mut self, e: &BytesStart<'_>, is_empty: bool, position: usize) -> std::result::Result<(), String> {
        if self.depth == 0 {
            if self.seen_root {
                return Err(format!("junk after document element at position {}", position));
            }
            self.seen_root = true;
        }

        if !is_empty {
            self.depth += 1;
        }

        match self.state {
            Scan::Searching if e.name().as_ref() == b"class" => {
                if let Some(filename) = attribute(e, b"filename")? {
                    if filename.is_empty() {
                        return Ok(());
                    }

                    let matched = filename.ends_with(self.target);
                    if matched {
                        tracing::debug!(target_file = self.target, class_file = %filename, "matched Cobertura class");
                        self.state = if is_empty {
                            Scan::Done
                        } else {
                            Scan::InTarget { depth: self.depth }
                        };
                    }
                    self.file_names.insert(filename);
                }
            }
            Scan::InTarget { .. } if e.name().as_ref() == b"line" => {
                let (number, hits) = line_attributes(e)?;
                if hits > 0 {
                    self.lines_covered.push(number);
                } else {
                    self.lines_missed.push(number);
                }
            }
            _ => {}
        }

        Ok(())
    }

    fn close(&mut self) {
        if let Scan::InTarget { depth } = self.state {
            if self.depth == depth {
                self.state = Scan::Done;
            }
        }
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(self) -> std::result::Result<CoverageResult, String> {
        if !self.seen_root {
            return Err("no element found".to_string());
        }
        if self.depth != 0 {
            return Err(format!(
                "unexpected end of document: {} unclosed element(s)",
                self.depth
            ));
        }

        Ok(CoverageResult::from_lines(
            self.lines_covered,
            self.lines_missed,
            self.file_names,
        ))
    }
}

fn scan(content: &str, target: &str) -> std::result::Result<CoverageResult, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut walker = Walker::new(target);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => walker.open(e, false, reader.buffer_position())?,
            Ok(Event::Empty(ref e)) => walker.open(e, true, reader.buffer_position())?,
            Ok(Event::End(_)) => walker.close(),
            Ok(Event::Text(ref t)) if walker.depth == 0 => {
                let text = t
                    .unescape()
                    .map_err(|e| format!("XML error at position {}: {}", reader.buffer_position(), e))?;
                if !text.trim().is_empty() {
                    return Err(format!(
                        "text outside of document element at position {}",
                        reader.buffer_position()
                    ));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(format!("XML error at position {}: {}", reader.buffer_position(), e))
            }
            _ => {}
        }
        buf.clear();
    }

    walker.finish()
}

fn attribute(e: &BytesStart<'_>, name: &[u8]) -> std::result::Result<Option<String>, String> {
    let element = String::from_utf8_lossy(e.name().as_ref()).to_string();
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| format!("invalid attribute on <{}>: {}", element, err))?;

    match attr {
        Some(attr) => {
            let value = attr
                .unescape_value()
                .map_err(|err| format!("invalid attribute value on <{}>: {}", element, err))?;
            Ok(Some(value.into_owned()))
        }
        None => Ok(None),
    }
}

/// `(number, hits)` of a `<line>`. Hits are signed; anything `<= 0` is a miss.
fn line_attributes(e: &BytesStart<'_>) -> std::result::Result<(u32, i64), String> {
    let number = attribute(e, b"number")?
        .ok_or_else(|| "<line> element without a 'number' attribute".to_string())?;
    let hits = attribute(e, b"hits")?
        .ok_or_else(|| format!("<line number=\"{}\"> element without a 'hits' attribute", number))?;

    let number = number
        .trim()
        .parse::<u32>()
        .map_err(|_| format!("invalid line number '{}'", number))?;
    let hits = hits
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("invalid hit count '{}' on line {}", hits, number))?;

    Ok((number, hits))
}
