//! Interactive editing of a filter list against a loaded dataset
//!
//! [`FilterBuilder`] holds the operations behind the filter form: adding a
//! row, switching its kind, picking columns and operators. Every edit leaves
//! the list in a shape the engine accepts; a filter whose fields are not all
//! set yet is provisional and is skipped by the engine without a diagnostic.

use crate::dataset::Dataset;
use crate::filter::{
    ColumnComparisonFilter, ColumnRangeFilter, ColumnValueFilter, Condition, FilterKind,
    FilterSpec, number_json,
};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Width given to a range whose column holds a single distinct number
const DEGENERATE_RANGE_WIDTH: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuilderError {
    #[error("no filter at position {position} (the list has {len})")]
    IndexOutOfRange { position: usize, len: usize },
    #[error("column '{0}' does not exist")]
    UnknownColumn(String),
    #[error("column '{0}' is not numeric")]
    NotNumeric(String),
    #[error("condition '{condition}' cannot be used on non-numeric column '{column}'")]
    ConditionNotAllowed { condition: String, column: String },
    #[error("filter {position} is a {found} filter, not {expected}")]
    KindMismatch {
        position: usize,
        expected: FilterKind,
        found: FilterKind,
    },
    #[error("filter {0} has no column selected")]
    NoColumn(usize),
}

/// Edits `filters` in place, using `dataset` for column names and types
#[derive(Debug)]
pub struct FilterBuilder<'a> {
    dataset: &'a Dataset,
    filters: &'a mut Vec<FilterSpec>,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(dataset: &'a Dataset, filters: &'a mut Vec<FilterSpec>) -> Self {
        Self { dataset, filters }
    }

    pub fn filters(&self) -> &[FilterSpec] {
        self.filters
    }

    /// Append a provisional `column_value` filter on the first column and
    /// return its index.
    pub fn add(&mut self) -> usize {
        self.filters.push(self.default_spec(FilterKind::ColumnValue));
        self.filters.len() - 1
    }

    /// Append a fully formed filter, e.g. one parsed from a `--where` term.
    pub fn push(&mut self, spec: FilterSpec) -> usize {
        self.filters.push(spec);
        self.filters.len() - 1
    }

    pub fn remove(&mut self, index: usize) -> Result<FilterSpec, BuilderError> {
        self.check_index(index)?;
        Ok(self.filters.remove(index))
    }

    /// Replace filter `index` with a fresh filter of `kind`, seeded with
    /// default columns; all previous fields are discarded.
    pub fn change_kind(&mut self, index: usize, kind: FilterKind) -> Result<(), BuilderError> {
        self.check_index(index)?;
        if self.filters[index].kind() != kind {
            self.filters[index] = self.default_spec(kind);
        }
        Ok(())
    }

    pub fn set_column(&mut self, index: usize, column: &str) -> Result<(), BuilderError> {
        let dataset = self.dataset;
        let target = dataset
            .column(column)
            .ok_or_else(|| BuilderError::UnknownColumn(column.to_string()))?;
        let numeric = target.dtype().is_numeric();
        let full_range = self.full_range(column);

        match self.spec_mut(index)? {
            FilterSpec::ColumnValue(spec) => {
                if spec.column.as_deref() != Some(column) {
                    spec.value = None;
                }
                if !numeric && spec.condition.as_ref().is_some_and(Condition::is_ordering) {
                    spec.condition = Some(Condition::Eq);
                }
                spec.column = Some(column.to_string());
            }
            FilterSpec::ColumnRange(spec) => {
                if !numeric {
                    return Err(BuilderError::NotNumeric(column.to_string()));
                }
                spec.column = Some(column.to_string());
                spec.value = Some(full_range);
            }
            FilterSpec::ColumnComparison(spec) => spec.column1 = Some(column.to_string()),
        }
        Ok(())
    }

    /// Set both columns of a `column_comparison` filter.
    pub fn set_columns(
        &mut self,
        index: usize,
        column1: &str,
        column2: &str,
    ) -> Result<(), BuilderError> {
        for column in [column1, column2] {
            if self.dataset.column(column).is_none() {
                return Err(BuilderError::UnknownColumn(column.to_string()));
            }
        }

        let position = index + 1;
        match self.spec_mut(index)? {
            FilterSpec::ColumnComparison(spec) => {
                spec.column1 = Some(column1.to_string());
                spec.column2 = Some(column2.to_string());
                Ok(())
            }
            other => Err(BuilderError::KindMismatch {
                position,
                expected: FilterKind::ColumnComparison,
                found: other.kind(),
            }),
        }
    }

    pub fn set_condition(&mut self, index: usize, condition: Condition) -> Result<(), BuilderError> {
        let dataset = self.dataset;
        let position = index + 1;

        match self.spec_mut(index)? {
            FilterSpec::ColumnValue(spec) => {
                if condition.is_ordering() {
                    if let Some(column) = spec.column.as_deref() {
                        let numeric = dataset
                            .column(column)
                            .is_some_and(|c| c.dtype().is_numeric());
                        if !numeric {
                            return Err(BuilderError::ConditionNotAllowed {
                                condition: condition.to_string(),
                                column: column.to_string(),
                            });
                        }
                    }
                }
                spec.condition = Some(condition);
                Ok(())
            }
            FilterSpec::ColumnComparison(spec) => {
                spec.condition = Some(condition);
                Ok(())
            }
            other => Err(BuilderError::KindMismatch {
                position,
                expected: FilterKind::ColumnValue,
                found: other.kind(),
            }),
        }
    }

    /// Set the literal of a `column_value` filter; null clears it.
    pub fn set_value(&mut self, index: usize, value: JsonValue) -> Result<(), BuilderError> {
        let position = index + 1;
        match self.spec_mut(index)? {
            FilterSpec::ColumnValue(spec) => {
                spec.value = (!value.is_null()).then_some(value);
                Ok(())
            }
            other => Err(BuilderError::KindMismatch {
                position,
                expected: FilterKind::ColumnValue,
                found: other.kind(),
            }),
        }
    }

    /// Set the bounds of a `column_range` filter, clamped into the column's
    /// own bounds. An inverted range selects the whole column.
    pub fn set_range(&mut self, index: usize, min: f64, max: f64) -> Result<(), BuilderError> {
        let position = index + 1;
        let column = match self.filters.get(index) {
            Some(FilterSpec::ColumnRange(spec)) => {
                spec.column.clone().ok_or(BuilderError::NoColumn(position))?
            }
            Some(other) => {
                return Err(BuilderError::KindMismatch {
                    position,
                    expected: FilterKind::ColumnRange,
                    found: other.kind(),
                });
            }
            None => return Err(self.out_of_range(index)),
        };

        let (lo, hi) = self.range_bounds(&column);
        let (min, max) = if min > max || min.is_nan() || max.is_nan() {
            (lo, hi)
        } else {
            (min.clamp(lo, hi), max.clamp(lo, hi))
        };

        if let Some(FilterSpec::ColumnRange(spec)) = self.filters.get_mut(index) {
            spec.value = Some(JsonValue::Array(vec![number_json(min), number_json(max)]));
        }
        Ok(())
    }

    /// Operators offered for `column`: all six on numeric columns, equality
    /// otherwise.
    pub fn allowed_conditions(&self, column: &str) -> Vec<Condition> {
        let numeric = self
            .dataset
            .column(column)
            .is_some_and(|c| c.dtype().is_numeric());
        if numeric {
            Condition::ALL.to_vec()
        } else {
            Condition::EQUALITY.to_vec()
        }
    }

    /// Distinct values to pick from for a text-like column
    pub fn value_choices(&self, column: &str) -> Vec<String> {
        self.dataset
            .column(column)
            .map(|c| c.distinct_values())
            .unwrap_or_default()
    }

    /// Slider bounds for a numeric column; a single-valued column is widened
    /// so the range is never empty.
    pub fn range_bounds(&self, column: &str) -> (f64, f64) {
        match self.dataset.column(column).and_then(|c| c.numeric_bounds()) {
            Some((lo, hi)) if lo < hi => (lo, hi),
            Some((lo, _)) => (lo, lo + DEGENERATE_RANGE_WIDTH),
            None => (0.0, DEGENERATE_RANGE_WIDTH),
        }
    }

    fn full_range(&self, column: &str) -> JsonValue {
        let (lo, hi) = self.range_bounds(column);
        JsonValue::Array(vec![number_json(lo), number_json(hi)])
    }

    fn default_spec(&self, kind: FilterKind) -> FilterSpec {
        let names = self.dataset.column_names();
        let first = names.first().map(|c| c.to_string());

        match kind {
            FilterKind::ColumnValue => FilterSpec::ColumnValue(ColumnValueFilter {
                column: first,
                condition: Some(Condition::Eq),
                value: None,
            }),
            FilterKind::ColumnRange => {
                let column = self.dataset.numeric_columns().first().map(|c| c.to_string());
                let value = column.as_deref().map(|c| self.full_range(c));
                FilterSpec::ColumnRange(ColumnRangeFilter { column, value })
            }
            FilterKind::ColumnComparison => {
                let second = names.get(1).map(|c| c.to_string()).or_else(|| first.clone());
                FilterSpec::ColumnComparison(ColumnComparisonFilter {
                    column1: first,
                    column2: second,
                    condition: Some(Condition::Gt),
                })
            }
        }
    }

    fn spec_mut(&mut self, index: usize) -> Result<&mut FilterSpec, BuilderError> {
        let len = self.filters.len();
        self.filters
            .get_mut(index)
            .ok_or(BuilderError::IndexOutOfRange {
                position: index + 1,
                len,
            })
    }

    fn check_index(&self, index: usize) -> Result<(), BuilderError> {
        if index < self.filters.len() {
            Ok(())
        } else {
            Err(self.out_of_range(index))
        }
    }

    fn out_of_range(&self, index: usize) -> BuilderError {
        BuilderError::IndexOutOfRange {
            position: index + 1,
            len: self.filters.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use serde_json::json;

    fn sample() -> Dataset {
        Dataset::from_columns([
            (
                "label",
                vec![
                    Value::Text("b".into()),
                    Value::Text("a".into()),
                    Value::Text("b".into()),
                ],
            ),
            ("score", vec![Value::Int(5), Value::Int(15), Value::Int(25)]),
            ("away", vec![Value::Int(1), Value::Int(1), Value::Int(1)]),
        ])
        .unwrap()
    }

    #[test]
    fn test_add_seeds_first_column_with_equality() {
        let dataset = sample();
        let mut filters = Vec::new();
        let mut builder = FilterBuilder::new(&dataset, &mut filters);

        assert_eq!(builder.add(), 0);
        assert_eq!(
            builder.filters()[0],
            FilterSpec::ColumnValue(ColumnValueFilter {
                column: Some("label".into()),
                condition: Some(Condition::Eq),
                value: None,
            })
        );
    }

    #[test]
    fn test_change_kind_resets_fields() {
        let dataset = sample();
        let mut filters = vec![FilterSpec::column_value("label", Condition::Eq, "a")];
        let mut builder = FilterBuilder::new(&dataset, &mut filters);

        builder.change_kind(0, FilterKind::ColumnRange).unwrap();
        assert_eq!(builder.filters()[0], FilterSpec::column_range("score", 5.0, 25.0));

        builder.change_kind(0, FilterKind::ColumnComparison).unwrap();
        assert_eq!(
            builder.filters()[0],
            FilterSpec::column_comparison("label", Condition::Gt, "score")
        );
    }

    #[test]
    fn test_comparison_on_single_column_dataset_uses_it_twice() {
        let dataset = Dataset::from_columns([("x", vec![Value::Int(1)])]).unwrap();
        let mut filters = Vec::new();
        let mut builder = FilterBuilder::new(&dataset, &mut filters);
        builder.add();
        builder.change_kind(0, FilterKind::ColumnComparison).unwrap();
        assert_eq!(
            builder.filters()[0],
            FilterSpec::column_comparison("x", Condition::Gt, "x")
        );
    }

    #[test]
    fn test_ordering_rejected_on_text_column() {
        let dataset = sample();
        let mut filters = Vec::new();
        let mut builder = FilterBuilder::new(&dataset, &mut filters);
        builder.add();

        assert!(matches!(
            builder.set_condition(0, Condition::Gt),
            Err(BuilderError::ConditionNotAllowed { .. })
        ));
        assert_eq!(builder.allowed_conditions("label"), Condition::EQUALITY.to_vec());
        assert_eq!(builder.allowed_conditions("score").len(), 6);
    }

    #[test]
    fn test_switching_to_text_column_drops_ordering_condition() {
        let dataset = sample();
        let mut filters = vec![FilterSpec::column_value("score", Condition::Ge, 10)];
        let mut builder = FilterBuilder::new(&dataset, &mut filters);

        builder.set_column(0, "label").unwrap();
        assert_eq!(
            builder.filters()[0],
            FilterSpec::ColumnValue(ColumnValueFilter {
                column: Some("label".into()),
                condition: Some(Condition::Eq),
                value: None,
            })
        );
    }

    #[test]
    fn test_set_range_clamps_and_resets_inverted() {
        let dataset = sample();
        let mut filters = Vec::new();
        let mut builder = FilterBuilder::new(&dataset, &mut filters);
        builder.add();
        builder.change_kind(0, FilterKind::ColumnRange).unwrap();

        builder.set_range(0, 0.0, 18.0).unwrap();
        assert_eq!(builder.filters()[0], FilterSpec::column_range("score", 5.0, 18.0));

        builder.set_range(0, 20.0, 10.0).unwrap();
        assert_eq!(builder.filters()[0], FilterSpec::column_range("score", 5.0, 25.0));
    }

    #[test]
    fn test_degenerate_bounds_are_widened() {
        let dataset = sample();
        let mut filters = Vec::new();
        let builder = FilterBuilder::new(&dataset, &mut filters);
        assert_eq!(builder.range_bounds("away"), (1.0, 1.1));
        assert_eq!(builder.range_bounds("label"), (0.0, 0.1));
    }

    #[test]
    fn test_range_requires_numeric_column() {
        let dataset = sample();
        let mut filters = vec![FilterSpec::column_range("score", 5.0, 25.0)];
        let mut builder = FilterBuilder::new(&dataset, &mut filters);
        assert_eq!(
            builder.set_column(0, "label"),
            Err(BuilderError::NotNumeric("label".into()))
        );
    }

    #[test]
    fn test_value_edits() {
        let dataset = sample();
        let mut filters = Vec::new();
        let mut builder = FilterBuilder::new(&dataset, &mut filters);
        builder.add();

        assert_eq!(builder.value_choices("label"), vec!["a", "b"]);
        builder.set_value(0, json!("a")).unwrap();
        assert_eq!(
            builder.filters()[0],
            FilterSpec::column_value("label", Condition::Eq, "a")
        );
        builder.set_value(0, JsonValue::Null).unwrap();
        let FilterSpec::ColumnValue(spec) = &builder.filters()[0] else {
            panic!("expected column_value");
        };
        assert_eq!(spec.value, None);
    }

    #[test]
    fn test_index_and_kind_errors() {
        let dataset = sample();
        let mut filters = vec![FilterSpec::column_value("label", Condition::Eq, "a")];
        let mut builder = FilterBuilder::new(&dataset, &mut filters);

        assert!(matches!(
            builder.remove(3),
            Err(BuilderError::IndexOutOfRange { position: 4, len: 1 })
        ));
        assert!(matches!(
            builder.set_columns(0, "score", "away"),
            Err(BuilderError::KindMismatch { .. })
        ));
        assert!(matches!(
            builder.set_column(0, "ghost"),
            Err(BuilderError::UnknownColumn(_))
        ));
        builder.remove(0).unwrap();
        assert!(builder.filters().is_empty());
    }
}
