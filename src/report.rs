//! Text and JSON renderings of datasets, filter outcomes and impact reports

use crate::dataset::{Dataset, Value};
use crate::filter::{FilterDiagnostic, FilterOutcome, FilterSpec};
use crate::impact::ImpactReport;
use colored::Colorize;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, ContentArrangement, Table};
use serde_json::{Value as JsonValue, json};
use std::fmt::Write as _;
use std::path::Path;

/// Table with the house style: full UTF-8 borders, wrapped to the terminal
pub fn create_styled_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| Cell::new(h).fg(comfy_table::Color::Cyan)));
    // follow --color rather than comfy-table's own tty detection
    if colored::control::SHOULD_COLORIZE.should_colorize() {
        table.enforce_styling();
    } else {
        table.force_no_tty();
    }
    table
}

fn value_cell(value: &Value) -> Cell {
    let cell = Cell::new(value.to_string());
    match value {
        Value::Int(_) | Value::Float(_) => cell.set_alignment(CellAlignment::Right),
        _ => cell,
    }
}

/// First `limit` rows of `dataset` as a table
pub fn format_preview(dataset: &Dataset, limit: usize) -> String {
    let headers = dataset.column_names();
    let mut table = create_styled_table(&headers);
    for row in dataset.rows().take(limit) {
        table.add_row(row.into_iter().map(value_cell));
    }

    let mut out = format!("{table}\n");
    if dataset.row_count() > limit {
        let _ = writeln!(
            out,
            "... {} more rows",
            dataset.row_count() - limit
        );
    }
    out
}

/// Numbered filter list, one filter per line
pub fn format_filter_list(filters: &[FilterSpec]) -> String {
    let mut out = String::new();
    for (idx, spec) in filters.iter().enumerate() {
        let _ = writeln!(out, "{:>3}. [{}] {}", idx + 1, spec.kind(), spec);
    }
    out
}

/// Cells keyed by column name, one object per row
pub fn dataset_to_json(dataset: &Dataset) -> JsonValue {
    let names = dataset.column_names();
    let rows: Vec<JsonValue> = dataset
        .rows()
        .map(|row| {
            let object: serde_json::Map<String, JsonValue> = names
                .iter()
                .zip(row)
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        serde_json::to_value(value).unwrap_or(JsonValue::Null),
                    )
                })
                .collect();
            JsonValue::Object(object)
        })
        .collect();

    json!({
        "columns": names,
        "rows": rows,
    })
}

/// Everything `apply` reports about one run
#[derive(Debug)]
pub struct ApplySummary<'a> {
    pub source: &'a Path,
    pub sheet: Option<&'a str>,
    pub original_rows: usize,
    pub filters: &'a [FilterSpec],
    pub outcome: &'a FilterOutcome,
}

impl ApplySummary<'_> {
    pub fn headline(&self) -> String {
        format!(
            "Original: {} rows | Filtered: {} rows",
            self.original_rows,
            self.outcome.row_count()
        )
    }

    /// Summary, optional filter list and a preview of the filtered rows
    pub fn to_text(&self, preview_rows: usize, show_filters: bool) -> String {
        let mut out = String::new();
        let _ = write!(out, "{}", self.source.display());
        if let Some(sheet) = self.sheet {
            let _ = write!(out, " [{sheet}]");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", self.headline().bold());

        if show_filters {
            let _ = writeln!(out);
            if self.filters.is_empty() {
                let _ = writeln!(out, "No active filters");
            } else {
                let _ = writeln!(out, "{}", "Active filters:".bold());
                out.push_str(&format_filter_list(self.filters));
            }
        }

        if !self.outcome.inactive.is_empty() {
            let positions: Vec<String> = self
                .outcome
                .inactive
                .iter()
                .map(usize::to_string)
                .collect();
            let _ = writeln!(
                out,
                "{}",
                format!("Not configured yet: filter {}", positions.join(", ")).dimmed()
            );
        }

        let _ = writeln!(out);
        if self.outcome.dataset.row_count() == 0 {
            let _ = writeln!(out, "No rows match the active filters");
        } else {
            out.push_str(&format_preview(&self.outcome.dataset, preview_rows));
        }
        out
    }

    pub fn to_json(&self, preview_rows: usize) -> JsonValue {
        let preview = dataset_to_json(&self.outcome.dataset.head(preview_rows));
        json!({
            "source": self.source.display().to_string(),
            "sheet": self.sheet,
            "original_rows": self.original_rows,
            "filtered_rows": self.outcome.row_count(),
            "filters": self.filters,
            "diagnostics": self.outcome.diagnostics,
            "inactive": self.outcome.inactive,
            "columns": preview["columns"],
            "rows": preview["rows"],
        })
    }
}

fn format_bound(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v}")
    }
}

/// Column overview: type, nulls, distinct values and numeric bounds
pub fn format_info_text(dataset: &Dataset) -> String {
    let mut table = create_styled_table(&["Column", "Type", "Nulls", "Distinct", "Min", "Max"]);
    for column in dataset.columns() {
        let (min, max) = match column.numeric_bounds() {
            Some((lo, hi)) if column.dtype().is_numeric() => (format_bound(lo), format_bound(hi)),
            _ => (String::new(), String::new()),
        };
        table.add_row(vec![
            Cell::new(column.name()),
            Cell::new(column.dtype()),
            Cell::new(column.null_count()).set_alignment(CellAlignment::Right),
            Cell::new(column.distinct_values().len()).set_alignment(CellAlignment::Right),
            Cell::new(min).set_alignment(CellAlignment::Right),
            Cell::new(max).set_alignment(CellAlignment::Right),
        ]);
    }

    format!(
        "{} rows x {} columns\n{table}\n",
        dataset.row_count(),
        dataset.column_count()
    )
}

pub fn info_json(dataset: &Dataset) -> JsonValue {
    let columns: Vec<JsonValue> = dataset
        .columns()
        .iter()
        .map(|column| {
            let bounds = column
                .numeric_bounds()
                .filter(|_| column.dtype().is_numeric());
            json!({
                "column": column.name(),
                "type": column.dtype().name(),
                "nulls": column.null_count(),
                "distinct": column.distinct_values().len(),
                "min": bounds.map(|(lo, _)| lo),
                "max": bounds.map(|(_, hi)| hi),
            })
        })
        .collect();

    json!({
        "rows": dataset.row_count(),
        "columns": columns,
    })
}

pub fn format_impact_text(report: &ImpactReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Original: {} rows", report.original_rows);

    if report.rows.is_empty() {
        let _ = writeln!(out, "No saved filter sets to analyze");
    } else {
        let mut table = create_styled_table(&["Filter set", "Filters", "Rows", "Kept", "Skipped"]);
        for row in &report.rows {
            let kept = if report.original_rows == 0 {
                0.0
            } else {
                row.row_count as f64 * 100.0 / report.original_rows as f64
            };
            table.add_row(vec![
                Cell::new(&row.name),
                Cell::new(row.filter_count).set_alignment(CellAlignment::Right),
                Cell::new(row.row_count).set_alignment(CellAlignment::Right),
                Cell::new(format!("{kept:.1}%")).set_alignment(CellAlignment::Right),
                Cell::new(row.skipped_filters).set_alignment(CellAlignment::Right),
            ]);
        }
        let _ = writeln!(out, "{table}");
    }

    for name in &report.missing {
        let _ = writeln!(out, "{}", format!("Filter set '{name}' not found").yellow());
    }
    out
}

/// One colored warning per skipped filter, on stderr
pub fn print_diagnostics(diagnostics: &[FilterDiagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{} {}", "warning:".yellow().bold(), diagnostic);
    }
}
