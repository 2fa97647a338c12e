use super::error::FilterError;
use crate::dataset::{DType, Value, parse_datetime, parse_numeric};
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;

/// A filter literal prepared against the type of its target column
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Literal {
    Number(f64),
    Text(String),
    Bool(bool),
    DateTime(NaiveDateTime),
}

/// True for the literals that mean "not configured yet": null and "".
pub(crate) fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        _ => false,
    }
}

/// Numeric view of a JSON literal: numbers and numeric-looking strings.
pub(crate) fn literal_to_numeric(value: &JsonValue) -> Option<f64> {
    match value {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Coerce a literal to the representation used when comparing it with cells
/// of a `dtype` column.
pub(crate) fn prepare_literal(
    value: &JsonValue,
    dtype: DType,
    column: &str,
) -> Result<Literal, FilterError> {
    let incompatible = || FilterError::IncompatibleLiteral {
        column: column.to_string(),
        value: value.to_string(),
        dtype: dtype.to_string(),
    };

    match dtype {
        DType::Numeric => literal_to_numeric(value).map(Literal::Number).ok_or_else(|| {
            FilterError::NonNumericLiteral {
                column: column.to_string(),
                value: value.to_string(),
            }
        }),
        DType::Boolean => match value {
            JsonValue::Bool(b) => Ok(Literal::Bool(*b)),
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            JsonValue::String(s) if s.trim().eq_ignore_ascii_case("false") => {
                Ok(Literal::Bool(false))
            }
            _ => Err(incompatible()),
        },
        DType::Temporal => match value {
            JsonValue::String(s) => parse_datetime(s)
                .map(Literal::DateTime)
                .ok_or_else(incompatible),
            _ => Err(incompatible()),
        },
        DType::Text => match value {
            JsonValue::String(s) => Ok(Literal::Text(s.clone())),
            JsonValue::Number(n) => n.as_f64().map(Literal::Number).ok_or_else(incompatible),
            JsonValue::Bool(b) => Ok(Literal::Bool(*b)),
            _ => Err(incompatible()),
        },
    }
}

/// Equality between a cell and a prepared literal.
///
/// Text literals compare against the cell's display form, so a value picked
/// from a column's distinct values matches whatever type the cell holds.
/// Number literals match text cells that parse to the same number.
pub(crate) fn cell_equals(cell: &Value, literal: &Literal) -> bool {
    match (cell, literal) {
        (Value::Null, _) => false,
        (Value::Int(v), Literal::Number(n)) => (*v as f64) == *n,
        (Value::Float(v), Literal::Number(n)) => v == n,
        (Value::Text(s), Literal::Number(n)) => parse_numeric(s) == Some(*n),
        (Value::Bool(v), Literal::Bool(b)) => v == b,
        (Value::DateTime(v), Literal::DateTime(d)) => v == d,
        (cell, Literal::Text(s)) => cell.to_string() == *s,
        _ => false,
    }
}

/// Numeric value of a cell in a numeric column
pub(crate) fn numeric_cell(cell: &Value) -> Option<f64> {
    match cell {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) if !v.is_nan() => Some(*v),
        _ => None,
    }
}
