//! Append-only report log: newline-delimited JSON behind a short `#` preamble.
//!
//! ```text
//! # proctop report log v1
//! # One JSON-encoded report per line, oldest first. Lines starting with '#' are comments.
//! # Replay with `proctop --load <file>` or proctop_core::persist::replay.
//! {"system":{...},"samples":[...]}
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::Report;

pub const FORMAT_VERSION: u32 = 1;
const MAGIC: &str = "# proctop report log v";

fn preamble() -> String {
    format!(
        "{MAGIC}{FORMAT_VERSION}\n\
         # One JSON-encoded report per line, oldest first. Lines starting with '#' are comments.\n\
         # Replay with `proctop --load <file>` or proctop_core::persist::replay.\n"
    )
}

fn write_err(path: &Path, source: std::io::Error) -> Error {
    Error::Write {
        target: path.display().to_string(),
        source,
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> Error {
    Error::InvalidFile {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Fails unless `first` is the preamble line of a log this build can read.
fn check_preamble(path: &Path, first: Option<&str>) -> Result<()> {
    let version = first
        .and_then(|l| l.trim_end().strip_prefix(MAGIC))
        .ok_or_else(|| invalid(path, "missing report log preamble"))?;
    if version.parse::<u32>().ok() != Some(FORMAT_VERSION) {
        return Err(invalid(path, format!("unsupported log version {version:?}")));
    }
    Ok(())
}

/// Append one report, writing the preamble first if the log is new or empty.
/// A non-empty file that is not a report log is refused and left untouched.
pub fn append(path: &Path, report: &Report) -> Result<()> {
    let fresh = fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    if !fresh {
        let f = File::open(path).map_err(|e| write_err(path, e))?;
        let mut first = String::new();
        BufReader::new(f)
            .read_line(&mut first)
            .map_err(|e| invalid(path, e.to_string()))?;
        check_preamble(path, Some(&first))?;
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| write_err(path, e))?;
    }
    let line = serde_json::to_string(report).map_err(|e| write_err(path, std::io::Error::other(e)))?;

    let mut buf = if fresh { preamble() } else { String::new() };
    buf.push_str(&line);
    buf.push('\n');

    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| write_err(path, e))?;
    f.write_all(buf.as_bytes()).map_err(|e| write_err(path, e))
}

/// Every report in the log, in append order. Any defect rejects the whole file.
pub fn replay(path: &Path) -> Result<Vec<Report>> {
    let text = fs::read_to_string(path).map_err(|e| invalid(path, e.to_string()))?;
    let mut lines = text.lines().enumerate();

    check_preamble(path, lines.next().map(|(_, first)| first))?;

    let mut reports = Vec::new();
    for (i, line) in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let r: Report = serde_json::from_str(line)
            .map_err(|e| invalid(path, format!("line {}: {e}", i + 1)))?;
        reports.push(r);
    }
    Ok(reports)
}

/// A structured log the controller has written to at least once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLog {
    path: PathBuf,
}

impl ReportLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, report: &Report) -> Result<()> {
        append(&self.path, report)
    }

    pub fn replay(&self) -> Result<Vec<Report>> {
        replay(&self.path)
    }
}
