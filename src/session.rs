use crate::builder::FilterBuilder;
use crate::dataset::{DataSource, Dataset, LoadError};
use crate::filter::{FilterOutcome, FilterSpec, apply_optional};
use crate::store::{FilterSetStore, StoreError};
use std::path::Path;

/// Everything one user works on: the open file, the selected sheet, the
/// loaded dataset and the active filter list
#[derive(Debug, Default)]
pub struct Session {
    source: Option<DataSource>,
    sheet: Option<String>,
    dataset: Option<Dataset>,
    filters: Vec<FilterSpec>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` and load `sheet` (or its only sheet).
    ///
    /// Opening a different file or sheet clears the filter list. When the
    /// file cannot be read the whole session is reset.
    pub fn open_file(
        &mut self,
        path: impl AsRef<Path>,
        sheet: Option<&str>,
    ) -> Result<&Dataset, LoadError> {
        let path = path.as_ref();
        let same_file = self.source_path().is_some_and(|current| current == path);

        let mut source = match DataSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                self.reset();
                return Err(e);
            }
        };

        let loaded = source
            .resolve_sheet(sheet)
            .and_then(|resolved| source.load(resolved.as_deref()).map(|d| (resolved, d)));

        match loaded {
            Ok((resolved, dataset)) => {
                if !same_file || self.sheet != resolved {
                    self.filters.clear();
                }
                self.source = Some(source);
                self.sheet = resolved;
                Ok(self.dataset.insert(dataset))
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    /// Switch to another sheet of the open workbook.
    pub fn select_sheet(&mut self, sheet: &str) -> Result<&Dataset, LoadError> {
        let Some(source) = self.source.as_mut() else {
            return Err(LoadError::SheetNotFound {
                sheet: sheet.to_string(),
                available: Vec::new(),
            });
        };

        match source.load(Some(sheet)) {
            Ok(dataset) => {
                if self.sheet.as_deref() != Some(sheet) {
                    self.filters.clear();
                }
                self.sheet = Some(sheet.to_string());
                Ok(self.dataset.insert(dataset))
            }
            Err(e) => {
                self.reset();
                Err(e)
            }
        }
    }

    pub fn source_path(&self) -> Option<&Path> {
        self.source.as_ref().map(DataSource::path)
    }

    pub fn sheet_names(&self) -> &[String] {
        self.source
            .as_ref()
            .map(DataSource::sheet_names)
            .unwrap_or_default()
    }

    pub fn sheet(&self) -> Option<&str> {
        self.sheet.as_deref()
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn filters(&self) -> &[FilterSpec] {
        &self.filters
    }

    pub fn set_filters(&mut self, filters: Vec<FilterSpec>) {
        self.filters = filters;
    }

    /// Editor over the filter list; `None` until a dataset is loaded.
    pub fn builder(&mut self) -> Option<FilterBuilder<'_>> {
        let dataset = self.dataset.as_ref()?;
        Some(FilterBuilder::new(dataset, &mut self.filters))
    }

    /// The loaded dataset narrowed by the active filters
    pub fn filtered(&self) -> FilterOutcome {
        apply_optional(self.dataset.as_ref(), &self.filters)
    }

    /// Replace the active filters with the saved set `name`.
    pub fn load_named_set(&mut self, store: &FilterSetStore, name: &str) -> Result<(), StoreError> {
        let filters = store
            .get(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        log::info!("loaded filter set '{}' ({} filters)", name, filters.len());
        self.filters = filters;
        Ok(())
    }

    pub fn save_named_set(&self, store: &FilterSetStore, name: &str) -> Result<(), StoreError> {
        store.save(name, &self.filters)
    }

    pub fn delete_named_set(&self, store: &FilterSetStore, name: &str) -> Result<(), StoreError> {
        store.delete(name)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
