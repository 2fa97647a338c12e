use super::error::FilterParseError;
use super::spec::{Condition, FilterSpec, number_json};
use serde_json::Value as JsonValue;

/// A `--where` expression: whitespace-separated terms, each one filter
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereExpression {
    pub filters: Vec<FilterSpec>,
}

impl WhereExpression {
    /// Parse an expression; terms keep their order.
    pub fn parse(s: &str) -> Result<Self, FilterParseError> {
        let filters = split_preserving_quotes(s)?
            .into_iter()
            .map(parse_term)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(WhereExpression { filters })
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

/// Parse every term of several expressions into one ordered filter list.
pub fn parse_where_terms<S: AsRef<str>>(terms: &[S]) -> Result<Vec<FilterSpec>, FilterParseError> {
    let mut filters = Vec::new();
    for term in terms {
        filters.extend(WhereExpression::parse(term.as_ref())?.filters);
    }
    Ok(filters)
}

enum Operator {
    Condition(Condition),
    Range,
}

/// Find the first operator outside double quotes.
fn find_operator(term: &str) -> Option<(usize, usize, Operator)> {
    let bytes = term.as_bytes();
    let mut in_quotes = false;

    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b'=' | b'!' | b'>' | b'<' if !in_quotes => {
                let next = bytes.get(i + 1).copied();
                return match (b, next) {
                    (_, Some(b'=')) => {
                        let symbol = &term[i..i + 2];
                        Condition::from_symbol(symbol).map(|c| (i, 2, Operator::Condition(c)))
                    }
                    (b'>', _) => Some((i, 1, Operator::Condition(Condition::Gt))),
                    (b'<', _) => Some((i, 1, Operator::Condition(Condition::Lt))),
                    (b'=', _) => Some((i, 1, Operator::Range)),
                    _ => None,
                };
            }
            _ => {}
        }
    }

    None
}

fn unquote(s: &str) -> (&str, bool) {
    let trimmed = s.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        (&trimmed[1..trimmed.len() - 1], true)
    } else {
        (trimmed, false)
    }
}

/// Literal for an unquoted value: a number when it looks like one
fn literal_value(raw: &str, quoted: bool) -> JsonValue {
    if quoted {
        return JsonValue::String(raw.to_string());
    }
    if let Ok(v) = raw.parse::<i64>() {
        return JsonValue::from(v);
    }
    if let Ok(v) = raw.parse::<f64>() {
        if v.is_finite() {
            return number_json(v);
        }
    }
    match raw {
        "true" => JsonValue::Bool(true),
        "false" => JsonValue::Bool(false),
        _ => JsonValue::String(raw.to_string()),
    }
}

fn parse_term(term: &str) -> Result<FilterSpec, FilterParseError> {
    let (at, width, operator) =
        find_operator(term).ok_or_else(|| FilterParseError::MissingOperator(term.to_string()))?;

    let (column, _) = unquote(&term[..at]);
    if column.is_empty() {
        return Err(FilterParseError::EmptyColumn(term.to_string()));
    }
    let rest = &term[at + width..];

    match operator {
        Operator::Range => {
            let (min, max) = rest
                .split_once("..")
                .ok_or_else(|| FilterParseError::InvalidRange(rest.to_string()))?;
            let bound = |s: &str| {
                s.trim()
                    .parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .ok_or_else(|| FilterParseError::InvalidRange(rest.to_string()))
            };
            Ok(FilterSpec::column_range(column, bound(min)?, bound(max)?))
        }
        Operator::Condition(condition) => {
            if let Some(other) = rest.trim().strip_prefix('@') {
                let (other, _) = unquote(other);
                if other.is_empty() {
                    return Err(FilterParseError::EmptyColumn(term.to_string()));
                }
                return Ok(FilterSpec::column_comparison(column, condition, other));
            }

            let (raw, quoted) = unquote(rest);
            if raw.is_empty() && !quoted {
                return Err(FilterParseError::EmptyValue(column.to_string()));
            }
            Ok(FilterSpec::column_value(
                column,
                condition,
                literal_value(raw, quoted),
            ))
        }
    }
}

/// Split a string by whitespace while preserving quoted segments
fn split_preserving_quotes(s: &str) -> Result<Vec<&str>, FilterParseError> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ' ' | '\t' if !in_quotes => {
                if i > start {
                    let part = &s[start..i];
                    if !part.trim().is_empty() {
                        parts.push(part.trim());
                    }
                }
                start = i + 1;
            }
            _ => {}
        }
    }

    if in_quotes {
        return Err(FilterParseError::InvalidExpression(format!(
            "unterminated quote in: {s}"
        )));
    }

    // Add the last part
    if start < s.len() {
        let part = &s[start..];
        if !part.trim().is_empty() {
            parts.push(part.trim());
        }
    }

    Ok(parts)
}
