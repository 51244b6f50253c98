use anyhow::{Context, Result};
use csv::WriterBuilder;

use super::{ParseOptions, Row};

/// Serialize `rows` back to delimited text under the `columns` header.
///
/// - Numbers are written in their display form (`30`, not `30.0`)
/// - Null cells become empty fields
/// - Fields are quoted only when the dialect requires it
pub fn to_delimited(columns: &[String], rows: &[Row], options: ParseOptions) -> Result<String> {
    let mut wtr = WriterBuilder::new()
        .delimiter(options.delimiter)
        .from_writer(Vec::new());

    wtr.write_record(columns).context("writing header")?;
    for (idx, row) in rows.iter().enumerate() {
        wtr.write_record(row.values().iter().map(|v| v.to_string()))
            .with_context(|| format!("writing row {}", idx))?;
    }

    let bytes = wtr.into_inner().context("flushing delimited writer")?;
    String::from_utf8(bytes).context("delimited output is not UTF-8")
}
