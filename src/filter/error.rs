use thiserror::Error;

/// Reasons a single filter cannot be evaluated, plus the one fatal
/// condition: a filter list that is not shaped like a filter list.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum FilterError {
    #[error("column '{0}' does not exist")]
    MissingColumn(String),

    #[error("value {value} is not compatible with numeric column '{column}'")]
    NonNumericLiteral { column: String, value: String },

    #[error("operator '{condition}' is not applicable to {dtype} column '{column}'")]
    OrderingOnNonNumeric {
        column: String,
        condition: String,
        dtype: String,
    },

    #[error("value {value} is not a valid {dtype} value for column '{column}'")]
    IncompatibleLiteral {
        column: String,
        value: String,
        dtype: String,
    },

    #[error("range bounds {0} are not numeric")]
    NonNumericBounds(String),

    #[error("unrecognized condition '{0}'")]
    UnrecognizedCondition(String),

    #[error("invalid filter list: {0}")]
    ContractViolation(String),
}

/// Errors that can occur when parsing `--where` terms
#[derive(Debug, Error, PartialEq)]
pub enum FilterParseError {
    #[error("No operator in '{0}'. Use column==value, column=min..max or column>@other")]
    MissingOperator(String),

    #[error("Empty column name in '{0}'")]
    EmptyColumn(String),

    #[error("Empty value for column '{0}'")]
    EmptyValue(String),

    #[error("Invalid range '{0}'. Expected min..max with numeric bounds")]
    InvalidRange(String),

    #[error("Invalid filter expression: {0}")]
    InvalidExpression(String),
}
