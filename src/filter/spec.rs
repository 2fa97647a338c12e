use super::error::FilterError;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Relational operator of a filter
///
/// Symbols outside the six supported operators survive decoding as
/// [`Condition::Unrecognized`] so that saved sets round-trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Condition {
    Eq,
    Ne,
    Gt,
    Lt,
    Ge,
    Le,
    Unrecognized(String),
}

impl Condition {
    pub const ALL: [Condition; 6] = [
        Condition::Eq,
        Condition::Ne,
        Condition::Gt,
        Condition::Lt,
        Condition::Ge,
        Condition::Le,
    ];

    pub const EQUALITY: [Condition; 2] = [Condition::Eq, Condition::Ne];

    /// Parse one of the six supported symbols
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "==" => Some(Condition::Eq),
            "!=" => Some(Condition::Ne),
            ">" => Some(Condition::Gt),
            "<" => Some(Condition::Lt),
            ">=" => Some(Condition::Ge),
            "<=" => Some(Condition::Le),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &str {
        match self {
            Condition::Eq => "==",
            Condition::Ne => "!=",
            Condition::Gt => ">",
            Condition::Lt => "<",
            Condition::Ge => ">=",
            Condition::Le => "<=",
            Condition::Unrecognized(symbol) => symbol,
        }
    }

    /// `>`, `<`, `>=` and `<=`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Condition::Gt | Condition::Lt | Condition::Ge | Condition::Le
        )
    }

    /// Evaluate `lhs <condition> rhs`; `None` for an unrecognized symbol.
    pub fn evaluate<T: PartialOrd + ?Sized>(&self, lhs: &T, rhs: &T) -> Option<bool> {
        match self {
            Condition::Eq => Some(lhs == rhs),
            Condition::Ne => Some(lhs != rhs),
            Condition::Gt => Some(lhs > rhs),
            Condition::Lt => Some(lhs < rhs),
            Condition::Ge => Some(lhs >= rhs),
            Condition::Le => Some(lhs <= rhs),
            Condition::Unrecognized(_) => None,
        }
    }
}

impl From<String> for Condition {
    fn from(symbol: String) -> Self {
        Condition::from_symbol(symbol.trim()).unwrap_or(Condition::Unrecognized(symbol))
    }
}

impl From<Condition> for String {
    fn from(condition: Condition) -> Self {
        condition.symbol().to_string()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Keep rows where `row[column] <condition> value`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnValueFilter {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
    #[serde(default)]
    pub value: Option<JsonValue>,
}

/// Keep rows whose numeric value lies in `[min, max]`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnRangeFilter {
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub value: Option<JsonValue>,
}

/// Keep rows where `numeric(row[column1]) <condition> numeric(row[column2])`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnComparisonFilter {
    #[serde(default)]
    pub column1: Option<String>,
    #[serde(default)]
    pub column2: Option<String>,
    #[serde(default)]
    pub condition: Option<Condition>,
}

/// One declarative row filter, tagged by `type` on the wire
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterSpec {
    ColumnValue(ColumnValueFilter),
    ColumnRange(ColumnRangeFilter),
    ColumnComparison(ColumnComparisonFilter),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    ColumnValue,
    ColumnRange,
    ColumnComparison,
}

impl FilterKind {
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::ColumnValue => "column_value",
            FilterKind::ColumnRange => "column_range",
            FilterKind::ColumnComparison => "column_comparison",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FilterSpec {
    pub fn column_value(
        column: impl Into<String>,
        condition: Condition,
        value: impl Into<JsonValue>,
    ) -> Self {
        FilterSpec::ColumnValue(ColumnValueFilter {
            column: Some(column.into()),
            condition: Some(condition),
            value: Some(value.into()),
        })
    }

    pub fn column_range(column: impl Into<String>, min: f64, max: f64) -> Self {
        FilterSpec::ColumnRange(ColumnRangeFilter {
            column: Some(column.into()),
            value: Some(JsonValue::Array(vec![number_json(min), number_json(max)])),
        })
    }

    pub fn column_comparison(
        column1: impl Into<String>,
        condition: Condition,
        column2: impl Into<String>,
    ) -> Self {
        FilterSpec::ColumnComparison(ColumnComparisonFilter {
            column1: Some(column1.into()),
            column2: Some(column2.into()),
            condition: Some(condition),
        })
    }

    pub fn kind(&self) -> FilterKind {
        match self {
            FilterSpec::ColumnValue(_) => FilterKind::ColumnValue,
            FilterSpec::ColumnRange(_) => FilterKind::ColumnRange,
            FilterSpec::ColumnComparison(_) => FilterKind::ColumnComparison,
        }
    }

    /// The column a diagnostic should name
    pub fn primary_column(&self) -> Option<&str> {
        match self {
            FilterSpec::ColumnValue(f) => f.column.as_deref(),
            FilterSpec::ColumnRange(f) => f.column.as_deref(),
            FilterSpec::ColumnComparison(f) => f.column1.as_deref(),
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn or_placeholder(value: Option<&str>) -> &str {
            value.unwrap_or("?")
        }

        match self {
            FilterSpec::ColumnValue(spec) => write!(
                f,
                "{} {} {}",
                or_placeholder(spec.column.as_deref()),
                spec.condition.as_ref().map(Condition::symbol).unwrap_or("?"),
                spec.value
                    .as_ref()
                    .map(JsonValue::to_string)
                    .unwrap_or_else(|| "?".to_string())
            ),
            FilterSpec::ColumnRange(spec) => write!(
                f,
                "{} in {}",
                or_placeholder(spec.column.as_deref()),
                spec.value
                    .as_ref()
                    .map(JsonValue::to_string)
                    .unwrap_or_else(|| "?".to_string())
            ),
            FilterSpec::ColumnComparison(spec) => write!(
                f,
                "{} {} @{}",
                or_placeholder(spec.column1.as_deref()),
                spec.condition.as_ref().map(Condition::symbol).unwrap_or("?"),
                or_placeholder(spec.column2.as_deref())
            ),
        }
    }
}

/// JSON number for `v`, as an integer when it has no fractional part
pub fn number_json(v: f64) -> JsonValue {
    if v.fract() == 0.0 && v.abs() < i64::MAX as f64 {
        JsonValue::from(v as i64)
    } else {
        serde_json::Number::from_f64(v)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}

/// Decode a filter list, failing fast when it is not an array of
/// specification-shaped objects.
pub fn decode_filter_list(value: &JsonValue) -> Result<Vec<FilterSpec>, FilterError> {
    let entries = value.as_array().ok_or_else(|| {
        FilterError::ContractViolation(format!(
            "expected an array of filter specifications, found {}",
            json_type_name(value)
        ))
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            FilterSpec::deserialize(entry).map_err(|e| {
                FilterError::ContractViolation(format!("entry {}: {}", idx + 1, e))
            })
        })
        .collect()
}

/// Parse a filter list from JSON text; comments and trailing commas are accepted.
pub fn parse_filter_list(input: &str) -> Result<Vec<FilterSpec>, FilterError> {
    let value: JsonValue = json5::from_str(input)
        .map_err(|e| FilterError::ContractViolation(format!("invalid JSON: {e}")))?;
    decode_filter_list(&value)
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "a boolean",
        JsonValue::Number(_) => "a number",
        JsonValue::String(_) => "a string",
        JsonValue::Array(_) => "an array",
        JsonValue::Object(_) => "an object",
    }
}
