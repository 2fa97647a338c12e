use super::coerce::{
    Literal, cell_equals, is_blank, literal_to_numeric, numeric_cell, prepare_literal,
};
use super::error::FilterError;
use super::spec::{
    ColumnComparisonFilter, ColumnRangeFilter, ColumnValueFilter, Condition, FilterKind,
    FilterSpec,
};
use crate::dataset::{Column, Dataset};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::fmt;

/// A filter that was skipped because it could not be evaluated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterDiagnostic {
    /// 1-based position in the filter list
    pub position: usize,
    pub kind: FilterKind,
    pub column: Option<String>,
    #[serde(serialize_with = "serialize_error")]
    pub error: FilterError,
}

fn serialize_error<S: serde::Serializer>(error: &FilterError, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&error.to_string())
}

impl fmt::Display for FilterDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(
                f,
                "Filter {} ({}): {}. Filter ignored.",
                self.position, column, self.error
            ),
            None => write!(f, "Filter {}: {}. Filter ignored.", self.position, self.error),
        }
    }
}

/// Result of running a filter list over a dataset
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    pub dataset: Dataset,
    /// Filters skipped because they could not be evaluated
    pub diagnostics: Vec<FilterDiagnostic>,
    /// 1-based positions of filters that are not fully configured yet
    pub inactive: Vec<usize>,
}

impl FilterOutcome {
    fn unchanged(dataset: Dataset) -> Self {
        Self {
            dataset,
            diagnostics: Vec::new(),
            inactive: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.dataset.row_count()
    }
}

enum Step {
    Applied(Vec<usize>),
    Inactive,
}

/// Apply `filters` to `dataset` in order, each one narrowing the rows that
/// survived the previous ones.
///
/// A filter that cannot be evaluated leaves the working rows untouched and is
/// reported in [`FilterOutcome::diagnostics`]; the remaining filters still run.
pub fn apply_filters(dataset: &Dataset, filters: &[FilterSpec]) -> FilterOutcome {
    if filters.is_empty() || dataset.is_empty() {
        return FilterOutcome::unchanged(dataset.clone());
    }

    let mut rows: Vec<usize> = (0..dataset.row_count()).collect();
    let mut diagnostics = Vec::new();
    let mut inactive = Vec::new();

    for (idx, spec) in filters.iter().enumerate() {
        let position = idx + 1;
        match apply_one(dataset, &rows, spec) {
            Ok(Step::Applied(kept)) => {
                log::debug!(
                    "filter {position} ({spec}) kept {} of {} rows",
                    kept.len(),
                    rows.len()
                );
                rows = kept;
            }
            Ok(Step::Inactive) => {
                log::debug!("filter {position} ({spec}) is not configured, skipping");
                inactive.push(position);
            }
            Err(error) => {
                log::debug!("filter {position} ({spec}) skipped: {error}");
                diagnostics.push(FilterDiagnostic {
                    position,
                    kind: spec.kind(),
                    column: spec.primary_column().map(str::to_string),
                    error,
                });
            }
        }
    }

    FilterOutcome {
        dataset: dataset.take(&rows),
        diagnostics,
        inactive,
    }
}

/// [`apply_filters`] for callers that may not have a dataset yet; an absent
/// dataset yields an empty one.
pub fn apply_optional(dataset: Option<&Dataset>, filters: &[FilterSpec]) -> FilterOutcome {
    match dataset {
        Some(dataset) => apply_filters(dataset, filters),
        None => FilterOutcome::unchanged(Dataset::empty()),
    }
}

fn apply_one(dataset: &Dataset, rows: &[usize], spec: &FilterSpec) -> Result<Step, FilterError> {
    match spec {
        FilterSpec::ColumnValue(filter) => apply_column_value(dataset, rows, filter),
        FilterSpec::ColumnRange(filter) => apply_column_range(dataset, rows, filter),
        FilterSpec::ColumnComparison(filter) => apply_column_comparison(dataset, rows, filter),
    }
}

fn lookup<'a>(dataset: &'a Dataset, name: &str) -> Result<&'a Column, FilterError> {
    dataset
        .column(name)
        .ok_or_else(|| FilterError::MissingColumn(name.to_string()))
}

fn non_empty(name: &Option<String>) -> Option<&str> {
    name.as_deref().filter(|n| !n.is_empty())
}

fn keep_rows(rows: &[usize], mut predicate: impl FnMut(usize) -> bool) -> Vec<usize> {
    rows.iter().copied().filter(|&row| predicate(row)).collect()
}

fn apply_column_value(
    dataset: &Dataset,
    rows: &[usize],
    filter: &ColumnValueFilter,
) -> Result<Step, FilterError> {
    let (Some(name), Some(condition), Some(value)) = (
        non_empty(&filter.column),
        filter.condition.as_ref(),
        filter.value.as_ref(),
    ) else {
        return Ok(Step::Inactive);
    };
    if is_blank(value) {
        return Ok(Step::Inactive);
    }

    let column = lookup(dataset, name)?;
    let dtype = column.dtype();

    if let Condition::Unrecognized(symbol) = condition {
        return Err(FilterError::UnrecognizedCondition(symbol.clone()));
    }
    if condition.is_ordering() && !dtype.is_numeric() {
        return Err(FilterError::OrderingOnNonNumeric {
            column: name.to_string(),
            condition: condition.to_string(),
            dtype: dtype.to_string(),
        });
    }

    let literal = prepare_literal(value, dtype, name)?;
    let kept = match condition {
        Condition::Eq => keep_rows(rows, |row| {
            column.value(row).is_some_and(|cell| cell_equals(cell, &literal))
        }),
        Condition::Ne => keep_rows(rows, |row| {
            column.value(row).is_some_and(|cell| !cell_equals(cell, &literal))
        }),
        ordering => {
            let Literal::Number(target) = literal else {
                return Err(FilterError::NonNumericLiteral {
                    column: name.to_string(),
                    value: value.to_string(),
                });
            };
            keep_rows(rows, |row| {
                column
                    .value(row)
                    .and_then(numeric_cell)
                    .and_then(|v| ordering.evaluate(&v, &target))
                    .unwrap_or(false)
            })
        }
    };

    Ok(Step::Applied(kept))
}

fn range_bounds(value: &JsonValue) -> Option<(&JsonValue, &JsonValue)> {
    match value.as_array()?.as_slice() {
        [min, max] => Some((min, max)),
        _ => None,
    }
}

fn apply_column_range(
    dataset: &Dataset,
    rows: &[usize],
    filter: &ColumnRangeFilter,
) -> Result<Step, FilterError> {
    let (Some(name), Some(value)) = (non_empty(&filter.column), filter.value.as_ref()) else {
        return Ok(Step::Inactive);
    };
    let Some((min, max)) = range_bounds(value) else {
        return Ok(Step::Inactive);
    };

    let column = lookup(dataset, name)?;
    let (Some(min), Some(max)) = (literal_to_numeric(min), literal_to_numeric(max)) else {
        return Err(FilterError::NonNumericBounds(value.to_string()));
    };

    Ok(Step::Applied(keep_rows(rows, |row| {
        column
            .value(row)
            .and_then(|cell| cell.to_numeric())
            .is_some_and(|v| min <= v && v <= max)
    })))
}

fn apply_column_comparison(
    dataset: &Dataset,
    rows: &[usize],
    filter: &ColumnComparisonFilter,
) -> Result<Step, FilterError> {
    let (Some(left_name), Some(right_name)) =
        (non_empty(&filter.column1), non_empty(&filter.column2))
    else {
        return Ok(Step::Inactive);
    };

    let left = lookup(dataset, left_name)?;
    let right = lookup(dataset, right_name)?;
    let Some(condition) = filter.condition.as_ref() else {
        return Ok(Step::Inactive);
    };

    // Rows where either side is not numeric are dropped; an unrecognized
    // condition keeps nothing.
    Ok(Step::Applied(keep_rows(rows, |row| {
        let lhs = left.value(row).and_then(|cell| cell.to_numeric());
        let rhs = right.value(row).and_then(|cell| cell.to_numeric());
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => condition.evaluate(&lhs, &rhs).unwrap_or(false),
            _ => false,
        }
    })))
}
