use crate::events::model::Header;
use chrono::{DateTime, Utc};

/// Case-insensitive lookup of the first header with `name`
pub fn find_header<'a>(headers: &'a [Header], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Wrap `value` in single quotes for a POSIX shell.
///
/// `abc'def` becomes `'abc'\''def'`.
pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Convert a timestamp to an ISO 8601 string
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339()
}

/// Human-readable byte count for progress display
pub fn format_progress(progress: Option<(i64, i64)>) -> String {
    match progress {
        Some((received, total)) if received > 0 && received < total => {
            format!("{}/{}", received, total)
        }
        Some((received, total)) if received > 0 && received == total => total.to_string(),
        _ => "unknown".to_string(),
    }
}
