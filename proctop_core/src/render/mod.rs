//! Text rendering of reports. Returns strings; callers pick the destination.

pub mod header;
pub mod table;
pub mod util;

use serde::{Deserialize, Serialize};

use crate::rank::{rank, SortField};
use crate::types::Report;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RenderOptions {
    pub sort: Option<SortField>,
    pub human: bool,
    /// Maximum process rows after ranking; `None` shows all.
    pub length: Option<usize>,
}

pub fn render(report: &Report, opts: &RenderOptions) -> String {
    let ranked = rank(&report.samples, opts.sort);
    let shown = opts.length.unwrap_or(ranked.len()).min(ranked.len());

    let mut lines = Vec::with_capacity(shown + 11);
    lines.push(header::separator('='));
    lines.push(header::title_line(&report.system));
    lines.extend(header::summary_lines(&report.system, opts.human));
    lines.push(String::new());
    lines.push(table::header_row());
    lines.push(header::separator('-'));
    lines.extend(
        ranked[..shown]
            .iter()
            .map(|s| table::process_row(s, opts.human)),
    );
    lines.push(header::separator('='));
    lines.push(String::new());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
