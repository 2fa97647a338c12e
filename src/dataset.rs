mod entities;
pub mod io;

pub use entities::{Column, DType, Value, parse_datetime, parse_numeric};
pub use io::{DataSource, LoadError, read_delimited_str, write_csv_string};

use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum DatasetError {
    #[error("column '{column}' has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
    #[error("duplicate column name '{0}'")]
    DuplicateColumn(String),
}

/// An in-memory table of named, typed columns sharing one row count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    row_count: usize,
}

impl Dataset {
    pub fn new(columns: Vec<Column>) -> Result<Self, DatasetError> {
        let row_count = columns.first().map(Column::len).unwrap_or(0);
        let mut seen = HashSet::new();

        for column in &columns {
            if !seen.insert(column.name()) {
                return Err(DatasetError::DuplicateColumn(column.name().to_string()));
            }
            if column.len() != row_count {
                return Err(DatasetError::LengthMismatch {
                    column: column.name().to_string(),
                    expected: row_count,
                    found: column.len(),
                });
            }
        }

        Ok(Self { columns, row_count })
    }

    /// Build a dataset from `(name, values)` pairs, inferring each column type.
    pub fn from_columns<S: Into<String>>(
        columns: impl IntoIterator<Item = (S, Vec<Value>)>,
    ) -> Result<Self, DatasetError> {
        Self::new(
            columns
                .into_iter()
                .map(|(name, values)| Column::new(name, values))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// True when there are no rows or no columns
    pub fn is_empty(&self) -> bool {
        self.row_count == 0 || self.columns.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(Column::name).collect()
    }

    pub fn numeric_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.dtype().is_numeric())
            .map(Column::name)
            .collect()
    }

    /// Cells of one row in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count {
            return None;
        }
        Some(
            self.columns
                .iter()
                .filter_map(|c| c.value(index))
                .collect(),
        )
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count).filter_map(|i| self.row(i))
    }

    /// Copy the given rows, in order, keeping every column's type.
    pub fn take(&self, rows: &[usize]) -> Dataset {
        let columns = self
            .columns
            .iter()
            .map(|column| {
                let values = rows
                    .iter()
                    .filter_map(|&row| column.value(row).cloned())
                    .collect();
                Column::with_dtype(column.name().to_string(), column.dtype(), values)
            })
            .collect();

        Dataset {
            columns,
            row_count: rows.iter().filter(|&&row| row < self.row_count).count(),
        }
    }

    /// First `n` rows
    pub fn head(&self, n: usize) -> Dataset {
        let rows: Vec<usize> = (0..self.row_count.min(n)).collect();
        self.take(&rows)
    }
}
