//! Row filters and the engine that applies them
//!
//! A filter list is an ordered sequence of [`FilterSpec`] values. The engine
//! applies them left to right, each one narrowing the rows kept by the
//! previous ones. A filter that cannot be evaluated (missing column, ordering
//! operator on a text column, literal that does not fit the column type) is
//! skipped and reported; the rest of the list still runs.
//!
//! # Filter kinds
//!
//! ```text
//! {"type": "column_value", "column": "label", "condition": "==", "value": "a"}
//! {"type": "column_range", "column": "score", "value": [10, 20]}
//! {"type": "column_comparison", "column1": "home", "column2": "away", "condition": ">"}
//! ```
//!
//! # `--where` syntax
//!
//! ```text
//! label==a                # column_value, text literal
//! score>10                # column_value, numeric literal
//! code=="007"             # quoted literals are always text
//! score=10..20            # column_range, inclusive
//! home>=@away             # column_comparison against another column
//! "Home Goals"!=0         # quote column names containing spaces
//! ```

mod coerce;
pub mod engine;
pub mod error;
pub mod parser;
pub mod spec;

pub use engine::{FilterDiagnostic, FilterOutcome, apply_filters, apply_optional};
pub use error::{FilterError, FilterParseError};
pub use parser::{WhereExpression, parse_where_terms};
pub use spec::{
    ColumnComparisonFilter, ColumnRangeFilter, ColumnValueFilter, Condition, FilterKind,
    FilterSpec, decode_filter_list, number_json, parse_filter_list,
};
