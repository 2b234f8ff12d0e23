//! Parsing of loosely structured model output into organization names.
//!
//! Models are asked for a list literal but answer with prose, code fences
//! or single-quoted Python lists. Parsing is total: every input maps to a
//! (possibly empty) list.
//!
//! 1. The first `[...]` span is parsed as a JSON array; if that fails, it is
//!    parsed again with single quotes swapped for double quotes.
//! 2. If no span parses, every quoted identifier-like token is scraped.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static RE_BRACKETED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\[.*?\]").unwrap());
static RE_QUOTED_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([a-zA-Z0-9_-]+)['"]"#).unwrap());

/// Parses a model response into raw names, in order of appearance.
pub fn parse_org_list(response: &str) -> Vec<String> {
    match parse_bracketed(response) {
        Some(names) => names,
        None => scrape_quoted(response),
    }
}

fn parse_bracketed(response: &str) -> Option<Vec<String>> {
    let span = RE_BRACKETED.find(response)?.as_str();
    let values = serde_json::from_str::<Vec<Value>>(span)
        .or_else(|_| serde_json::from_str::<Vec<Value>>(&span.replace('\'', "\"")))
        .ok()?;

    Some(
        values
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect(),
    )
}

fn scrape_quoted(response: &str) -> Vec<String> {
    RE_QUOTED_TOKEN
        .captures_iter(response)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalizes raw names into GitHub handles.
///
/// Strips `github.com/` URL prefixes and anything after the handle, trims,
/// lowercases, drops empties and keeps the first occurrence of duplicates.
pub fn clean_names(raw: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    raw.into_iter()
        .map(|name| normalize(&name))
        .filter(|name| !name.is_empty())
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

fn normalize(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let handle = match lowered.find("github.com/") {
        Some(pos) => &lowered[pos + "github.com/".len()..],
        None => lowered.as_str(),
    };
    handle
        .trim_start_matches('@')
        .split('/')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
