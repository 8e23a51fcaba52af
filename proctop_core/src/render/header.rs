//! Report header: node/time line and the three load/memory summary lines.

use crate::render::table::TOTAL_WIDTH;
use crate::render::util::human;
use crate::types::SystemSnapshot;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn separator(ch: char) -> String {
    std::iter::repeat(ch).take(TOTAL_WIDTH).collect()
}

/// Node on the left, timestamp flush with the right edge of the table.
pub fn title_line(sys: &SystemSnapshot) -> String {
    let ts = sys.timestamp.format(TIME_FORMAT).to_string();
    let room = TOTAL_WIDTH.saturating_sub(sys.node.chars().count());
    format!("{}{ts:>room$}", sys.node)
}

pub fn summary_lines(sys: &SystemSnapshot, human_mem: bool) -> [String; 3] {
    let mem = |v: u64| if human_mem { human(v) } else { v.to_string() };
    let cpu = sys
        .cpu_load
        .map(|c| format!("{c:.1}"))
        .unwrap_or_else(|| "-".into());
    let m = &sys.memory;
    [
        summary_line(
            "Load:",
            ("cpu", cpu),
            "Memory:",
            ("total", mem(m.total)),
            ("binary", mem(m.binary)),
        ),
        summary_line(
            "",
            ("procs", sys.process_count.to_string()),
            "",
            ("processes", mem(m.processes)),
            ("code", mem(m.code)),
        ),
        summary_line(
            "",
            ("runq", sys.run_queue.to_string()),
            "",
            ("atom", mem(m.atom)),
            ("ets", mem(m.ets)),
        ),
    ]
}

fn summary_line(
    lead: &str,
    (ll, lv): (&str, String),
    mem_lead: &str,
    (ml, mv): (&str, String),
    (rl, rv): (&str, String),
) -> String {
    format!(
        " {lead:<7}{ll:<6}{lv:>10}{:12}{mem_lead:<9}{ml:<10}{mv:>10}{:4}{rl:<7}{rv:>10}",
        "", ""
    )
}
