use serde::Serialize;
use std::collections::HashSet;
use tracing::debug;

use crate::parse::{column_index, Row, Scalar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ColumnKind {
    Numeric,
    NonNumeric,
}

/// Return the columns that qualify as numeric for charting.
///
/// A column is numeric as soon as ANY row holds a number for it. Nulls and
/// text in other rows do not disqualify it, so a column mixing numbers and
/// free text is still numeric. Changing this to a stricter rule changes which
/// column the chart picks as its value series.
pub fn classify(rows: &[Row], columns: &[String]) -> HashSet<String> {
    let numeric: HashSet<String> = column_index(columns)
        .into_iter()
        .filter(|&(_, idx)| {
            rows.iter()
                .any(|row| row.at(idx).is_some_and(Scalar::is_number))
        })
        .map(|(name, _)| name.to_string())
        .collect();

    debug!(
        numeric = numeric.len(),
        total = columns.len(),
        "classified columns"
    );
    numeric
}

/// Kind of every column, in header order.
pub fn column_kinds(columns: &[String], numeric: &HashSet<String>) -> Vec<(String, ColumnKind)> {
    columns
        .iter()
        .map(|c| {
            let kind = if numeric.contains(c) {
                ColumnKind::Numeric
            } else {
                ColumnKind::NonNumeric
            };
            (c.clone(), kind)
        })
        .collect()
}

/// First numeric column in header order; the chart's value series.
pub fn value_column<'a>(columns: &'a [String], numeric: &HashSet<String>) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| numeric.contains(*c))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn table(columns: &[&str], rows: Vec<Vec<Scalar>>) -> (Vec<String>, Vec<Row>) {
        let columns: Vec<String> = columns.iter().map(|s| s.to_string()).collect();
        let header: Arc<[String]> = columns.clone().into();
        let rows = rows
            .into_iter()
            .map(|values| Row::new(Arc::clone(&header), values))
            .collect();
        (columns, rows)
    }

    #[test]
    fn test_any_numeric_with_null_and_text() {
        let (columns, rows) = table(
            &["age"],
            vec![
                vec![Scalar::Number(30.0)],
                vec![Scalar::Null],
                vec![Scalar::from("x")],
            ],
        );
        let numeric = classify(&rows, &columns);
        assert!(numeric.contains("age"));
    }

    #[test]
    fn test_all_empty_strings_not_numeric() {
        let (columns, rows) = table(
            &["blank", "n"],
            vec![
                vec![Scalar::from(""), Scalar::Number(1.0)],
                vec![Scalar::from(""), Scalar::Number(2.0)],
            ],
        );
        let numeric = classify(&rows, &columns);
        assert_eq!(numeric, HashSet::from(["n".to_string()]));
    }

    #[test]
    fn test_all_null_not_numeric() {
        let (columns, rows) = table(&["gone"], vec![vec![Scalar::Null], vec![Scalar::Null]]);
        assert!(classify(&rows, &columns).is_empty());
    }

    #[test]
    fn test_no_rows_no_numeric_columns() {
        let (columns, rows) = table(&["a", "b"], vec![]);
        assert!(classify(&rows, &columns).is_empty());
    }

    #[test]
    fn test_value_column_is_first_numeric_in_header_order() {
        let (columns, rows) = table(
            &["label", "z", "a"],
            vec![vec![Scalar::from("q"), Scalar::Number(1.0), Scalar::Number(2.0)]],
        );
        let numeric = classify(&rows, &columns);
        assert_eq!(value_column(&columns, &numeric), Some("z"));
        assert_eq!(
            column_kinds(&columns, &numeric),
            vec![
                ("label".to_string(), ColumnKind::NonNumeric),
                ("z".to_string(), ColumnKind::Numeric),
                ("a".to_string(), ColumnKind::Numeric),
            ]
        );
    }

    #[test]
    fn test_value_column_none_without_numeric() {
        let (columns, rows) = table(&["label"], vec![vec![Scalar::from("q")]]);
        let numeric = classify(&rows, &columns);
        assert_eq!(value_column(&columns, &numeric), None);
    }

    #[test]
    fn test_duplicate_header_uses_last_column() {
        let (columns, rows) = table(
            &["v", "v", "w"],
            vec![vec![Scalar::Number(1.0), Scalar::from("x"), Scalar::Number(2.0)]],
        );
        let numeric = classify(&rows, &columns);
        assert_eq!(numeric, HashSet::from(["w".to_string()]));
    }

    #[test]
    fn test_wide_table_scans_each_column_once() {
        let names: Vec<String> = (0..5000).map(|i| format!("c{i}")).collect();
        let header: Arc<[String]> = names.clone().into();
        let rows: Vec<Row> = (0..20)
            .map(|_| {
                let values = (0..names.len()).map(|_| Scalar::from("t")).collect();
                Row::new(Arc::clone(&header), values)
            })
            .collect();

        let started = Instant::now();
        let numeric = classify(&rows, &names);
        assert!(numeric.is_empty());
        assert!(
            started.elapsed() < Duration::from_secs(1),
            "classify took {:?}",
            started.elapsed()
        );
    }
}
