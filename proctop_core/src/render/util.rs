//! Small text helpers: human-readable sizes, truncation, cell fitting.

/// Byte count with a K/M/G suffix, e.g. `197.5K`. Below 1K the raw digits are kept.
pub fn human(b: u64) -> String {
    const K: f64 = 1024.0;
    let v = b as f64;
    if v < K { return b.to_string(); }
    let kb = v / K;
    if kb < K { return format!("{kb:.1}K"); }
    let mb = kb / K;
    if mb < K { return format!("{mb:.1}M"); }
    let gb = mb / K;
    format!("{gb:.1}G")
}

/// Cut `s` to at most `max` characters. Never wraps.
pub fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((i, _)) => &s[..i],
        None => s,
    }
}

/// Drop the `Elixir.` namespace that compiled module names carry.
pub fn strip_namespace(s: &str) -> &str {
    s.strip_prefix("Elixir.").unwrap_or(s)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// A table cell of exactly `width` characters: content in `width - 1`, then a space.
/// Text is truncated; numbers that do not fit become `*` fill.
pub fn cell(s: &str, width: usize, align: Align) -> String {
    let room = width.saturating_sub(1);
    let fitted = match align {
        Align::Left => truncate(s, room).to_string(),
        Align::Right if s.chars().count() > room => "*".repeat(room),
        Align::Right => s.to_string(),
    };
    match align {
        Align::Left => format!("{fitted:<room$} "),
        Align::Right => format!("{fitted:>room$} "),
    }
}
