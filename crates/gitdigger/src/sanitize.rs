//! Helpers for sanitizing data before it enters logs and span attributes.
//!
//! Upload paths, remote response bodies and model output can be large or
//! contain data we do not want in traces.

use std::path::Path;

/// Upper bound for remote bodies echoed into errors and logs.
pub const MAX_LOGGED_BODY: usize = 200;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Truncates `text` to at most `max` bytes on a char boundary, marking the cut.
pub fn truncate_for_log(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &text[..end])
}
