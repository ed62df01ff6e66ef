//! The finalized report model consumed by exporters.
//!
//! A [`Report`] is built once from a fully drained accumulator and is
//! immutable afterwards. Exporters only ever see complete tables; partial
//! reports are never published.

use crate::bucket::Granularity;

/// One data row: fixed label columns followed by numeric cells and a total.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// Row identity (e.g., project, component, work type).
    pub labels: Vec<String>,

    /// Hours per data column, aligned with the table's `columns`.
    pub cells: Vec<f64>,

    /// Sum of all cells in this row.
    pub total: f64,
}

/// A spreadsheet-shaped table: label headers, data columns, rows, and a
/// synthetic TOTAL summary row.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    /// Table name used by exporters (e.g., "Team Overview").
    pub title: String,

    /// Headers for the leading label columns.
    pub label_headers: Vec<String>,

    /// Headers for the data columns.
    pub columns: Vec<String>,

    /// Data rows in stable sort order.
    pub rows: Vec<Row>,

    /// Column-wise totals across all rows.
    pub total_row: Row,
}

/// Formats hours for spreadsheet cells.
#[must_use]
pub fn format_hours(hours: f64) -> String {
    format!("{hours:.2}")
}

impl Table {
    /// Builds a table from rows, computing the per-row totals and the
    /// TOTAL summary row.
    #[must_use]
    pub fn build(
        title: impl Into<String>,
        label_headers: Vec<String>,
        columns: Vec<String>,
        rows: Vec<(Vec<String>, Vec<f64>)>,
    ) -> Self {
        let column_count = columns.len();
        let label_count = label_headers.len();

        let rows: Vec<Row> = rows
            .into_iter()
            .map(|(labels, cells)| {
                debug_assert_eq!(cells.len(), column_count);
                let total = cells.iter().sum();
                Row {
                    labels,
                    cells,
                    total,
                }
            })
            .collect();

        let mut total_cells = vec![0.0; column_count];
        for row in &rows {
            for (slot, cell) in total_cells.iter_mut().zip(&row.cells) {
                *slot += cell;
            }
        }
        let grand_total = total_cells.iter().sum();

        let mut total_labels = vec![String::new(); label_count];
        if let Some(first) = total_labels.first_mut() {
            *first = "TOTAL".to_string();
        }

        Self {
            title: title.into(),
            label_headers,
            columns,
            rows,
            total_row: Row {
                labels: total_labels,
                cells: total_cells,
                total: grand_total,
            },
        }
    }

    /// Grand total across every cell in the table.
    #[must_use]
    pub fn grand_total(&self) -> f64 {
        self.total_row.total
    }

    /// Flattens the table into spreadsheet rows: header, data rows, and
    /// the TOTAL row, with a trailing Total column.
    #[must_use]
    pub fn to_csv_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 2);

        let mut header: Vec<String> = self.label_headers.clone();
        header.extend(self.columns.iter().cloned());
        header.push("Total".to_string());
        out.push(header);

        for row in self.rows.iter().chain(std::iter::once(&self.total_row)) {
            let mut cells: Vec<String> = row.labels.clone();
            cells.extend(row.cells.iter().map(|&h| format_hours(h)));
            cells.push(format_hours(row.total));
            out.push(cells);
        }

        out
    }
}

/// Finalized report output: one overview table plus one breakdown table at
/// the requested granularity.
#[derive(Debug, Clone)]
pub struct Report {
    /// The report year.
    pub year: i32,

    /// Requested time-bucket resolution.
    pub granularity: Granularity,

    /// Rows = (project, component), columns = contributor display names.
    pub overview: Table,

    /// Rows = (project, component, work type), columns = time buckets.
    pub breakdown: Table,

    /// Entries whose date fell outside the report year and were skipped.
    pub skipped_out_of_year: usize,
}
