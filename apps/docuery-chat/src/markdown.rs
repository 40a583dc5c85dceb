//! Repair of assistant answers before they are rendered as markdown.
//!
//! The backend sometimes answers tabular questions with pipe-delimited
//! pseudo-rows separated by `||` instead of a markdown table:
//!
//! ```text
//! Results: | Metric | Value || Revenue | $10M || Growth | 12%
//! ```
//!
//! [`clean_assistant_markdown`] turns that into a two-column table. Anything
//! it cannot make sense of is returned with only line breaks normalized.

use once_cell::sync::Lazy;
use regex::Regex;

static BREAK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("valid <br> pattern"));

static LINE_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[\t ]*[•·]\s+").expect("valid bullet pattern"));

static CELL_BULLET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[•·]\s+").expect("valid cell bullet pattern"));

static TABLE_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n\s*\|\s*[-:]+\s*\|").expect("valid separator pattern"));

const ROW_DELIMITER: &str = "||";

/// Normalize line breaks and bullets, and rebuild pseudo-tables as markdown
/// tables.
pub fn clean_assistant_markdown(input: &str) -> String {
    let with_breaks = BREAK_TAG.replace_all(input, "\n");
    let normalized = LINE_BULLET.replace_all(&with_breaks, "").trim().to_string();

    let has_pseudo_table = normalized.contains(ROW_DELIMITER) && normalized.contains('|');
    if !has_pseudo_table || TABLE_SEPARATOR.is_match(&normalized) {
        return normalized;
    }

    let segments: Vec<&str> = normalized
        .split(ROW_DELIMITER)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.len() < 2 {
        return normalized;
    }

    // Prose before the first pipe of the first segment leads the table
    let (leading_text, first_row) = match segments[0].find('|') {
        Some(index) => (segments[0][..index].trim(), &segments[0][index..]),
        None => ("", segments[0]),
    };

    let rows: Vec<(String, String)> = std::iter::once(first_row)
        .chain(segments[1..].iter().copied())
        .filter_map(parse_row)
        .collect();
    if rows.len() < 2 {
        return normalized;
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    let (header_left, header_right) = &rows[0];
    lines.push(format!("| {} | {} |", header_left, header_right));
    lines.push("| --- | --- |".to_string());
    for (left, right) in &rows[1..] {
        lines.push(format!("| {} | {} |", left, right));
    }
    let table = lines.join("\n");

    if leading_text.is_empty() {
        table
    } else {
        format!("{}\n\n{}", leading_text, table)
    }
}

/// First column, then every remaining column joined back together.
fn parse_row(source: &str) -> Option<(String, String)> {
    let columns: Vec<String> = source
        .split('|')
        .map(|part| CELL_BULLET.replace(part.trim(), "").into_owned())
        .filter(|column| !column.is_empty())
        .collect();

    match columns.as_slice() {
        [first, rest @ ..] if !rest.is_empty() => Some((first.clone(), rest.join(" | "))),
        _ => None,
    }
}
