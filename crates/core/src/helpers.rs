//! Helper functions for header matching and cell access.

use regex::Regex;
use std::sync::LazyLock;

// Canonical decimal integer literal: no leading zeros, no sign on zero
static INTEGER_LITERAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0|-?[1-9][0-9]*)$").unwrap());

/// Normalize a column name for fuzzy comparison.
///
/// Lowercases, trims surrounding whitespace, then drops every `_` and `-`.
pub fn normalize_column_name(name: &str) -> String {
    name.to_lowercase()
        .trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect()
}

/// Case, whitespace, underscore and hyphen insensitive equality.
pub fn equals_fuzzy(a: &str, b: &str) -> bool {
    normalize_column_name(a) == normalize_column_name(b)
}

/// Index of the first header cell fuzzily equal to `name`.
pub fn header_index_fuzzy<S: AsRef<str>>(header: &[S], name: &str) -> Option<usize> {
    header.iter().position(|cell| equals_fuzzy(cell.as_ref(), name))
}

/// Parse a capability value as an explicit column index.
///
/// Only canonical integer literals count; `"02"` or `"1.0"` are treated as
/// column names by the caller. Values outside `i64` are rejected as well.
pub fn parse_column_index(value: &str) -> Option<i64> {
    if INTEGER_LITERAL_RE.is_match(value) {
        value.parse().ok()
    } else {
        None
    }
}
