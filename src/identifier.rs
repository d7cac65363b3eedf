//! SQL-safe, unique column identifiers from raw header text.

use std::{
    collections::{HashMap, HashSet},
    sync::LazyLock,
};

use regex::Regex;

pub const MAX_IDENTIFIER_BYTES: usize = 255;
/// Stands in for the cut-off tail of a truncated identifier.
const TRUNCATION_MARKER: &str = "___";

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern compiles"));

/// Keywords that cannot appear as unquoted identifiers in the target warehouse.
pub const SQL_RESERVED_WORDS: &[&str] = &[
    "all", "alter", "and", "any", "as", "asc", "between", "by", "case", "cast", "check",
    "column", "connect", "constraint", "create", "cross", "current", "current_date",
    "current_time", "current_timestamp", "database", "delete", "desc", "distinct", "drop",
    "else", "end", "exists", "false", "following", "for", "from", "full", "grant", "group",
    "having", "in", "increment", "inner", "insert", "intersect", "into", "is", "join",
    "lateral", "left", "like", "localtime", "localtimestamp", "minus", "natural", "not",
    "null", "of", "on", "or", "order", "organization", "outer", "over", "partition",
    "preceding", "primary", "range", "references", "revoke", "right", "rlike", "row", "rows",
    "sample", "select", "set", "some", "start", "table", "tablesample", "then", "to",
    "trigger", "true", "union", "unique", "update", "using", "values", "view", "when",
    "whenever", "where", "with",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedHeaders {
    pub columns: Vec<String>,
    pub duplicates_fixed: usize,
}

pub fn is_reserved_word(candidate: &str) -> bool {
    let lowered = candidate.to_ascii_lowercase();
    SQL_RESERVED_WORDS.contains(&lowered.as_str())
}

/// Lowercases, joins whitespace runs with `_` and drops everything outside `[a-z0-9_]`.
fn clean_token(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    WHITESPACE_RUN
        .replace_all(&lowered, "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

/// Caps `base + suffix` at [`MAX_IDENTIFIER_BYTES`], keeping the suffix intact.
fn cap_length(base: &str, suffix: &str) -> String {
    if base.len() + suffix.len() <= MAX_IDENTIFIER_BYTES {
        return format!("{base}{suffix}");
    }
    let keep = MAX_IDENTIFIER_BYTES - TRUNCATION_MARKER.len() - suffix.len();
    format!("{}{TRUNCATION_MARKER}{suffix}", &base[..keep])
}

/// Applies the single-identifier rules; `position` is the 1-based column index
/// used when the header has no usable text.
pub fn normalize_identifier(raw: &str, position: usize) -> String {
    let mut ident = clean_token(raw);
    if ident.is_empty() || ident == "nan" {
        ident = format!("unnamed_col_{position}");
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("col_{ident}");
    }
    if is_reserved_word(&ident) {
        ident.push_str("_col");
    }
    cap_length(&ident, "")
}

/// Normalizes a whole header row and resolves duplicates left to right.
///
/// The second occurrence of `x` becomes `x_2`, the third `x_3`, skipping any
/// suffix already taken by another column. Every position yields exactly one
/// identifier and the output never contains duplicates.
pub fn normalize_headers<S: AsRef<str>>(raw_headers: &[S]) -> NormalizedHeaders {
    let mut taken: HashSet<String> = HashSet::with_capacity(raw_headers.len());
    let mut occurrences: HashMap<String, usize> = HashMap::new();
    let mut columns = Vec::with_capacity(raw_headers.len());
    let mut duplicates_fixed = 0usize;

    for (idx, raw) in raw_headers.iter().enumerate() {
        let base = normalize_identifier(raw.as_ref(), idx + 1);
        let count = occurrences.entry(base.clone()).or_insert(0);
        *count += 1;
        if !taken.contains(&base) {
            taken.insert(base.clone());
            columns.push(base);
            continue;
        }
        duplicates_fixed += 1;
        let mut n = (*count).max(2);
        let resolved = loop {
            let candidate = cap_length(&base, &format!("_{n}"));
            if !taken.contains(&candidate) {
                break candidate;
            }
            n += 1;
        };
        *count = n;
        taken.insert(resolved.clone());
        columns.push(resolved);
    }

    NormalizedHeaders {
        columns,
        duplicates_fixed,
    }
}

/// Identifier for a table (sheet or region) name, used for exported file names.
pub fn table_identifier(name: &str) -> String {
    let mut ident = clean_token(name);
    if ident.is_empty() || ident == "nan" {
        ident = "unnamed".to_string();
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident = format!("table_{ident}");
    }
    if is_reserved_word(&ident) {
        ident.push_str("_tbl");
    }
    cap_length(&ident, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_whitespace_and_punctuation() {
        assert_eq!(normalize_identifier("  Order   ID ", 1), "order_id");
        assert_eq!(normalize_identifier("Total ($)", 1), "total_");
        assert_eq!(normalize_identifier("Café Name", 1), "caf_name");
    }

    #[test]
    fn blank_and_nan_headers_are_named_by_position() {
        let result = normalize_headers(&["id", "", "NaN", "  "]);
        assert_eq!(
            result.columns,
            vec!["id", "unnamed_col_2", "unnamed_col_3", "unnamed_col_4"]
        );
    }

    #[test]
    fn leading_digit_and_reserved_words_are_escaped() {
        assert_eq!(normalize_identifier("2024 Sales", 1), "col_2024_sales");
        assert_eq!(normalize_identifier("Order", 1), "order_col");
        assert_eq!(normalize_identifier("GROUP", 1), "group_col");
        assert_eq!(normalize_identifier("grouping", 1), "grouping");
    }

    #[test]
    fn duplicates_receive_numeric_suffixes() {
        let result = normalize_headers(&["Name", "name", "NAME", "other"]);
        assert_eq!(result.columns, vec!["name", "name_2", "name_3", "other"]);
        assert_eq!(result.duplicates_fixed, 2);
    }

    #[test]
    fn suffixes_skip_names_already_present() {
        let result = normalize_headers(&["a", "a_2", "a", "a"]);
        assert_eq!(result.columns, vec!["a", "a_2", "a_3", "a_4"]);
        assert_eq!(result.duplicates_fixed, 2);
    }

    #[test]
    fn long_identifiers_are_capped_with_suffix_preserved() {
        let long = "x".repeat(400);
        let result = normalize_headers(&[long.as_str(), long.as_str()]);
        assert_eq!(result.columns[0].len(), MAX_IDENTIFIER_BYTES);
        assert!(result.columns[0].ends_with(TRUNCATION_MARKER));
        assert_eq!(result.columns[1].len(), MAX_IDENTIFIER_BYTES);
        assert!(result.columns[1].ends_with("_2"));
        assert_ne!(result.columns[0], result.columns[1]);
    }

    #[test]
    fn table_identifiers_follow_the_same_rules() {
        assert_eq!(table_identifier("Sales 2024__table01"), "sales_2024__table01");
        assert_eq!(table_identifier("2024"), "table_2024");
        assert_eq!(table_identifier("Select"), "select_tbl");
        assert_eq!(table_identifier("!!!"), "unnamed");
    }
}
