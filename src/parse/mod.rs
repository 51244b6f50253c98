pub mod scalar;
pub mod write;

use csv::ReaderBuilder;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{collections::HashMap, sync::Arc};
use tracing::{debug, warn};

use crate::error::{AcquisitionError, Result};
pub use scalar::Scalar;
pub use write::to_delimited;

/// Dialect knobs for the delimited-text reader.
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    pub delimiter: u8,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

/// One data row, positionally aligned with the header it was parsed under.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    header: Arc<[String]>,
    values: Vec<Scalar>,
}

impl Row {
    pub fn new(header: Arc<[String]>, mut values: Vec<Scalar>) -> Self {
        values.resize(header.len(), Scalar::Null);
        Self { header, values }
    }

    /// Value for `column`. With duplicate header names the last one wins.
    pub fn get(&self, column: &str) -> Option<&Scalar> {
        self.header
            .iter()
            .rposition(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    pub fn values(&self) -> &[Scalar] {
        &self.values
    }

    /// Value at a header position, as resolved by [`column_index`].
    pub fn at(&self, idx: usize) -> Option<&Scalar> {
        self.values.get(idx)
    }

    /// `(column, value)` pairs in header order, duplicates included.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.header.iter().map(String::as_str).zip(self.values.iter())
    }
}

/// Header position of every distinct column name; duplicates resolve to the
/// last position, matching [`Row::get`].
pub fn column_index(columns: &[String]) -> HashMap<&str, usize> {
    columns
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect()
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IssueKind {
    TooFewFields,
    TooManyFields,
}

/// A non-fatal problem with one line of input.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseIssue {
    pub line: u64,
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ParseResult {
    pub rows: Vec<Row>,
    pub columns: Vec<String>,
    pub issues: Vec<ParseIssue>,
}

impl ParseResult {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Parse delimited text into typed rows.
///
/// The first non-blank line is the header. Lines that are blank after
/// trimming are skipped without affecting alignment. Every field is typed
/// once via [`Scalar::infer`].
pub fn parse(text: &str, options: ParseOptions) -> Result<ParseResult> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    if let Some(line) = find_unterminated_quote(text, options.delimiter) {
        warn!(line, "unterminated quoted field");
        return Err(AcquisitionError::Parse {
            line,
            message: "quoted field is never closed".into(),
        });
    }

    let mut rdr = ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut header: Option<Arc<[String]>> = None;
    let mut result = ParseResult::default();

    for record in rdr.records() {
        let record = record.map_err(|e| AcquisitionError::Parse {
            line: e.position().map(|p| p.line()).unwrap_or(0),
            message: e.to_string(),
        })?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }

        let cols = match &header {
            Some(cols) => Arc::clone(cols),
            None => {
                let cols: Arc<[String]> = record.iter().map(str::to_string).collect();
                result.columns = cols.to_vec();
                header = Some(cols);
                continue;
            }
        };

        if record.len() < cols.len() {
            result.issues.push(ParseIssue {
                line,
                kind: IssueKind::TooFewFields,
                message: format!("expected {} fields, found {}", cols.len(), record.len()),
            });
        } else if record.len() > cols.len() {
            result.issues.push(ParseIssue {
                line,
                kind: IssueKind::TooManyFields,
                message: format!(
                    "expected {} fields, found {}; extras dropped",
                    cols.len(),
                    record.len()
                ),
            });
        }

        let values = record
            .iter()
            .take(cols.len())
            .map(Scalar::infer)
            .collect();
        result.rows.push(Row::new(cols, values));
    }

    debug!(
        rows = result.rows.len(),
        columns = result.columns.len(),
        issues = result.issues.len(),
        "parsed delimited text"
    );
    Ok(result)
}

/// Returns the line on which a quoted field opens without ever closing.
fn find_unterminated_quote(text: &str, delimiter: u8) -> Option<u64> {
    let delimiter = delimiter as char;
    let mut line = 1u64;
    let mut opened_at = 0u64;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => in_quotes = false,
                '\n' => line += 1,
                '\r' if chars.peek() != Some(&'\n') => line += 1,
                _ => {}
            }
            continue;
        }
        match c {
            '"' if at_field_start => {
                in_quotes = true;
                opened_at = line;
                at_field_start = false;
            }
            '\n' => {
                line += 1;
                at_field_start = true;
            }
            // a bare CR ends a record just like LF does
            '\r' if chars.peek() != Some(&'\n') => {
                line += 1;
                at_field_start = true;
            }
            '\r' => {}
            c if c == delimiter => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    in_quotes.then_some(opened_at)
}
