//! Formatting helpers shared by tables and detail views.

use chrono::{DateTime, Local, Utc};

const DEFAULT_TRUNCATE: usize = 50;

/// Renders a timestamp in the local timezone.
pub fn format_date(at: &DateTime<Utc>) -> String {
    at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Cuts `value` to `max` characters, marking the cut with an ellipsis.
pub fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        let head: String = value.chars().take(max).collect();
        format!("{head}…")
    } else {
        value.to_string()
    }
}

pub fn truncate_default(value: &str) -> String {
    truncate(value, DEFAULT_TRUNCATE)
}

/// `"Not specified"` placeholder for empty optional text.
pub fn or_not_specified(value: &str) -> String {
    if value.trim().is_empty() {
        "Not specified".to_string()
    } else {
        value.to_string()
    }
}

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}
