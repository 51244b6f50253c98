//! Pure projection from a ready dataset to what the page shows: a summary,
//! a preview table and a single bar chart.

use serde::Serialize;

use crate::acquire::Dataset;
use crate::parse::column_index;
use crate::resolve::SourceKind;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub row_count: usize,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub source_kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreviewTable {
    pub columns: Vec<String>,
    /// Cells as display strings; nulls are empty.
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub category: String,
    pub value: Option<f64>,
}

/// A bar chart: categories from the first column, values from the first
/// numeric column. Without a numeric column there is no value series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub category_column: Option<String>,
    pub value_column: Option<String>,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Presentation {
    pub summary: Summary,
    pub preview: PreviewTable,
    pub chart: ChartSpec,
}

pub fn present(dataset: &Dataset, preview_rows: usize, chart_rows: usize) -> Presentation {
    let summary = Summary {
        row_count: dataset.rows.len(),
        column_count: dataset.columns.len(),
        columns: dataset.columns.clone(),
        source_kind: dataset.source_kind,
    };

    let preview = PreviewTable {
        columns: dataset.columns.clone(),
        rows: dataset
            .rows
            .iter()
            .take(preview_rows)
            .map(|row| row.values().iter().map(|v| v.to_string()).collect())
            .collect(),
    };

    let category_column = dataset.columns.first().cloned();
    let value_column = dataset.value_column().map(str::to_string);
    let index = column_index(&dataset.columns);
    let value_idx = value_column.as_deref().and_then(|c| index.get(c).copied());
    let points = match category_column.as_deref().and_then(|c| index.get(c).copied()) {
        Some(category_idx) => dataset
            .rows
            .iter()
            .take(chart_rows)
            .map(|row| ChartPoint {
                category: row.at(category_idx).map(|v| v.to_string()).unwrap_or_default(),
                value: value_idx.and_then(|idx| row.at(idx)).and_then(|v| v.as_f64()),
            })
            .collect(),
        None => Vec::new(),
    };

    Presentation {
        summary,
        preview,
        chart: ChartSpec {
            category_column,
            value_column,
            points,
        },
    }
}
