use super::{Column, Dataset, DatasetError, Value, parse_datetime};
use calamine::{Data, Range, Reader, Sheets, open_workbook_auto};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("unsupported file type '{0}' (expected csv, tsv, txt, xlsx, xlsm, xlsb, xls or ods)")]
    UnsupportedFormat(String),
    #[error("the workbook has several sheets; choose one of: {}", .available.join(", "))]
    SheetSelectionRequired { available: Vec<String> },
    #[error("sheet '{sheet}' not found; available sheets: {}", .available.join(", "))]
    SheetNotFound {
        sheet: String,
        available: Vec<String>,
    },
    #[error("the workbook contains no sheets")]
    EmptyWorkbook,
    #[error("the file has no header row")]
    MissingHeaders,
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Workbook(#[from] calamine::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error(transparent)]
    Dataset(#[from] DatasetError),
}

enum SourceKind {
    Delimited(u8),
    Workbook(Box<Sheets<BufReader<File>>>),
}

/// A file that can produce datasets: a delimited text file or a workbook
pub struct DataSource {
    path: PathBuf,
    kind: SourceKind,
    sheets: Vec<String>,
}

impl std::fmt::Debug for DataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSource")
            .field("path", &self.path)
            .field("sheets", &self.sheets)
            .finish()
    }
}

impl DataSource {
    /// Open a file, picking the reader from its extension.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref().to_path_buf();
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        let (kind, sheets) = match extension.as_str() {
            "csv" | "txt" => (SourceKind::Delimited(b','), Vec::new()),
            "tsv" => (SourceKind::Delimited(b'\t'), Vec::new()),
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => {
                let workbook = open_workbook_auto(&path)?;
                let sheets = workbook.sheet_names().to_vec();
                (SourceKind::Workbook(Box::new(workbook)), sheets)
            }
            other => return Err(LoadError::UnsupportedFormat(other.to_string())),
        };

        Ok(Self { path, kind, sheets })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sheet names of a workbook; empty for delimited text
    pub fn sheet_names(&self) -> &[String] {
        &self.sheets
    }

    pub fn is_workbook(&self) -> bool {
        matches!(self.kind, SourceKind::Workbook(_))
    }

    /// Resolve which sheet a load should read.
    ///
    /// A workbook with a single sheet needs no selection; one with several
    /// requires it.
    pub fn resolve_sheet(&self, sheet: Option<&str>) -> Result<Option<String>, LoadError> {
        match (&self.kind, sheet) {
            (SourceKind::Delimited(_), None) => Ok(None),
            (SourceKind::Delimited(_), Some(sheet)) => Err(LoadError::SheetNotFound {
                sheet: sheet.to_string(),
                available: Vec::new(),
            }),
            (SourceKind::Workbook(_), Some(sheet)) => {
                if self.sheets.iter().any(|s| s == sheet) {
                    Ok(Some(sheet.to_string()))
                } else {
                    Err(LoadError::SheetNotFound {
                        sheet: sheet.to_string(),
                        available: self.sheets.clone(),
                    })
                }
            }
            (SourceKind::Workbook(_), None) => match self.sheets.as_slice() {
                [] => Err(LoadError::EmptyWorkbook),
                [only] => Ok(Some(only.clone())),
                _ => Err(LoadError::SheetSelectionRequired {
                    available: self.sheets.clone(),
                }),
            },
        }
    }

    /// Read a dataset from the file, or from the selected sheet of a workbook.
    pub fn load(&mut self, sheet: Option<&str>) -> Result<Dataset, LoadError> {
        let resolved = self.resolve_sheet(sheet)?;

        let dataset = match (&mut self.kind, resolved) {
            (SourceKind::Delimited(delimiter), _) => {
                let reader = ReaderBuilder::new()
                    .delimiter(*delimiter)
                    .has_headers(false)
                    .flexible(true)
                    .from_path(&self.path)?;
                read_delimited(reader)?
            }
            (SourceKind::Workbook(workbook), Some(name)) => {
                let range = workbook.worksheet_range(&name)?;
                dataset_from_range(&range)?
            }
            (SourceKind::Workbook(_), None) => return Err(LoadError::EmptyWorkbook),
        };

        log::info!(
            "loaded {} rows x {} columns from {}",
            dataset.row_count(),
            dataset.column_count(),
            self.path.display()
        );
        Ok(dataset)
    }
}

/// Parse delimited text held in memory.
pub fn read_delimited_str(input: &str, delimiter: u8) -> Result<Dataset, LoadError> {
    let reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(input.as_bytes());
    read_delimited(reader)
}

fn read_delimited<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Dataset, LoadError> {
    let mut records = reader.records();
    let headers = match records.next() {
        Some(record) => record?,
        None => return Err(LoadError::MissingHeaders),
    };
    let names = header_names(headers.iter().map(str::to_string));

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for record in records {
        let record = record?;
        for (idx, values) in columns.iter_mut().enumerate() {
            values.push(record.get(idx).map(Value::infer).unwrap_or(Value::Null));
        }
    }

    Ok(Dataset::new(
        names
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )?)
}

fn dataset_from_range(range: &Range<Data>) -> Result<Dataset, LoadError> {
    let mut rows = range.rows();
    let headers = rows.next().ok_or(LoadError::MissingHeaders)?;
    let names = header_names(headers.iter().map(|cell| match cell {
        Data::Empty => String::new(),
        other => cell_to_value(other).to_string(),
    }));

    let mut columns: Vec<Vec<Value>> = vec![Vec::new(); names.len()];
    for row in rows {
        for (idx, values) in columns.iter_mut().enumerate() {
            values.push(row.get(idx).map(cell_to_value).unwrap_or(Value::Null));
        }
    }

    Ok(Dataset::new(
        names
            .into_iter()
            .zip(columns)
            .map(|(name, values)| Column::new(name, values))
            .collect(),
    )?)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty | Data::Error(_) => Value::Null,
        Data::Bool(v) => Value::Bool(*v),
        Data::Int(v) => Value::Int(*v),
        Data::Float(v) => Value::Float(*v),
        Data::String(v) => {
            if v.trim().is_empty() {
                Value::Null
            } else {
                Value::Text(v.clone())
            }
        }
        Data::DateTime(v) => v
            .as_datetime()
            .map(Value::DateTime)
            .unwrap_or(Value::Float(v.as_f64())),
        Data::DateTimeIso(v) => parse_datetime(v)
            .map(Value::DateTime)
            .unwrap_or_else(|| Value::Text(v.clone())),
        Data::DurationIso(v) => Value::Text(v.clone()),
    }
}

/// Name blank headers `Unnamed: <idx>` and suffix repeated names with `.N`.
///
/// A suffixed name that is itself taken gets suffixed again, so `x,x,x.1`
/// becomes `x`, `x.1`, `x.1.1`.
fn header_names(raw: impl Iterator<Item = String>) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::new();

    for (idx, name) in raw.enumerate() {
        let mut name = match name.trim() {
            "" => format!("Unnamed: {idx}"),
            trimmed => trimmed.to_string(),
        };
        let mut seen = counts.get(&name).copied().unwrap_or(0);
        while seen > 0 {
            counts.insert(name.clone(), seen + 1);
            name = format!("{name}.{seen}");
            seen = counts.get(&name).copied().unwrap_or(0);
        }
        counts.insert(name.clone(), seen + 1);
        names.push(name);
    }

    names
}

/// Render a dataset as CSV with a header row.
pub fn write_csv_string(dataset: &Dataset) -> Result<String, LoadError> {
    let mut writer = WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(dataset.column_names())?;

    for row in dataset.rows() {
        writer.write_record(row.iter().map(|value| value.to_string()))?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    Ok(String::from_utf8(bytes)?)
}
