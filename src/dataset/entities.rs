use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

/// A single cell of a dataset
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Best-effort numeric view of the cell.
    ///
    /// Integers, floats and numeric-looking text succeed; nulls, booleans,
    /// date-times and NaN do not.
    pub fn to_numeric(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) if !v.is_nan() => Some(*v),
            Value::Text(s) => parse_numeric(s),
            _ => None,
        }
    }

    /// Parse a raw text field into the most specific cell value.
    pub fn infer(field: &str) -> Value {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Value::Null;
        }

        if let Ok(v) = trimmed.parse::<i64>() {
            return Value::Int(v);
        }
        if let Ok(v) = trimmed.parse::<f64>() {
            if v.is_finite() {
                return Value::Float(v);
            }
        }
        if trimmed.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if trimmed.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
        if let Some(dt) = parse_datetime(trimmed) {
            return Value::DateTime(dt);
        }

        Value::Text(trimmed.to_string())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::DateTime(v) => {
                if v.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", v.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

/// Parse a string as a 64-bit float, rejecting NaN.
pub fn parse_numeric(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// Parse the ISO-like date/time layouts that spreadsheets and CSV exports produce.
pub fn parse_datetime(s: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let s = s.trim();
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt);
        }
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Inferred scalar type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    Numeric,
    Text,
    Boolean,
    Temporal,
}

impl DType {
    /// Infer the column type from its non-null cells.
    ///
    /// A column without any non-null cell is numeric, matching how an
    /// all-missing column reads back from a spreadsheet.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> DType {
        let mut inferred: Option<DType> = None;
        for value in values {
            let current = match value {
                Value::Null => continue,
                Value::Int(_) | Value::Float(_) => DType::Numeric,
                Value::Bool(_) => DType::Boolean,
                Value::DateTime(_) => DType::Temporal,
                Value::Text(_) => return DType::Text,
            };
            match inferred {
                None => inferred = Some(current),
                Some(previous) if previous != current => return DType::Text,
                Some(_) => {}
            }
        }
        inferred.unwrap_or(DType::Numeric)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, DType::Numeric)
    }

    pub fn name(&self) -> &'static str {
        match self {
            DType::Numeric => "numeric",
            DType::Text => "text",
            DType::Boolean => "boolean",
            DType::Temporal => "temporal",
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, typed column
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    dtype: DType,
    values: Vec<Value>,
}

impl Column {
    /// Build a column and infer its type from the values.
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        let dtype = DType::infer(&values);
        Self {
            name: name.into(),
            dtype,
            values,
        }
    }

    pub(crate) fn with_dtype(name: String, dtype: DType, values: Vec<Value>) -> Self {
        Self {
            name,
            dtype,
            values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dtype(&self) -> DType {
        self.dtype
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Sorted distinct display strings of the non-null cells
    pub fn distinct_values(&self) -> Vec<String> {
        self.values
            .iter()
            .filter(|v| !v.is_null())
            .map(|v| v.to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Minimum and maximum over the cells that coerce to numbers
    pub fn numeric_bounds(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter_map(Value::to_numeric)
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }
}
