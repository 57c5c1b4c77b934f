//! Number and year formatting shared by labels and tooltips.

/// Compact death-count label: `1.2M`, `3.4K` or the plain number.
pub fn format_number(value: f64) -> String {
    if value >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if value >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else {
        format!("{}", value.round() as i64)
    }
}

/// `1939 - 1945`, or just the year for single-year conflicts.
pub fn format_year_range(start: i32, end: i32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{} - {}", start, end)
    }
}
