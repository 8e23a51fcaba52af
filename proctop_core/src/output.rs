//! Where rendered text goes: the process's stdout or an append-only file.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::render::{render, RenderOptions};
use crate::types::Report;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputTarget {
    #[default]
    Stdout,
    File(PathBuf),
}

impl OutputTarget {
    fn describe(&self) -> String {
        match self {
            OutputTarget::Stdout => "stdout".into(),
            OutputTarget::File(p) => p.display().to_string(),
        }
    }
}

pub fn write_text(target: &OutputTarget, text: &str) -> Result<()> {
    let res = match target {
        OutputTarget::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(text.as_bytes()).and_then(|_| out.flush())
        }
        OutputTarget::File(path) => OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .and_then(|mut f| f.write_all(text.as_bytes())),
    };
    res.map_err(|source| Error::Write {
        target: target.describe(),
        source,
    })
}

/// Render each report in order and write them to `target` in one go.
pub fn print(reports: &[Report], target: &OutputTarget, opts: &RenderOptions) -> Result<()> {
    let text: String = reports.iter().map(|r| render(r, opts)).collect();
    write_text(target, &text)
}
