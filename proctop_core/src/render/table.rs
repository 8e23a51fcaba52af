//! Fixed-width process table. Downstream tools parse rows by these widths.

use crate::render::util::{cell, human, strip_namespace, truncate, Align};
use crate::types::Sample;

pub const COLS: [usize; 8] = [
    15, // Pid
    35, // Name or Initial Func
    8,  // Percent
    13, // Reds
    9,  // Memory
    4,  // MsgQ
    10, // State
    30, // Current Function
];

pub const TOTAL_WIDTH: usize = {
    let mut sum = 0;
    let mut i = 0;
    while i < COLS.len() {
        sum += COLS[i];
        i += 1;
    }
    sum
};

const HEADERS: [&str; 8] = [
    "Pid",
    "Name or Initial Func",
    "Percent",
    "Reds",
    "Memory",
    "MsgQ",
    "State",
    "Current Function",
];

const ALIGN: [Align; 7] = [
    Align::Left,
    Align::Left,
    Align::Right,
    Align::Right,
    Align::Right,
    Align::Right,
    Align::Left,
];

fn line(cells: [String; 8]) -> String {
    let mut out = String::with_capacity(TOTAL_WIDTH);
    for (i, text) in cells.iter().enumerate().take(7) {
        out.push_str(&cell(text, COLS[i], ALIGN[i]));
    }
    out.push_str(truncate(&cells[7], COLS[7]));
    out
}

pub fn header_row() -> String {
    line(HEADERS.map(String::from))
}

pub fn process_row(s: &Sample, human_mem: bool) -> String {
    let m = &s.metrics;
    let memory = if human_mem { human(m.memory) } else { m.memory.to_string() };
    let fun = m
        .current_function
        .as_ref()
        .map(|f| strip_namespace(&f.to_string()).to_string())
        .unwrap_or_else(|| "-".into());
    line([
        m.pid.to_string(),
        strip_namespace(&m.display_name()).to_string(),
        format!("{:.2}", s.percent),
        s.reduction_delta.to_string(),
        memory,
        m.message_queue_len.to_string(),
        m.status.to_string(),
        fun,
    ])
}
