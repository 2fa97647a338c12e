use crate::dataset::Dataset;
use crate::filter::apply_filters;
use crate::store::FilterSets;
use serde::Serialize;

/// How many rows one saved filter set keeps
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactRow {
    pub name: String,
    pub filter_count: usize,
    pub row_count: usize,
    /// Filters of the set that could not be evaluated on this dataset
    pub skipped_filters: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactReport {
    pub original_rows: usize,
    pub rows: Vec<ImpactRow>,
    /// Requested names with no saved set
    pub missing: Vec<String>,
}

/// Apply each requested set to the untouched dataset; no names means every
/// saved set.
pub fn analyze_impact<S: AsRef<str>>(
    dataset: &Dataset,
    sets: &FilterSets,
    names: &[S],
) -> ImpactReport {
    let requested: Vec<&str> = if names.is_empty() {
        sets.keys().map(String::as_str).collect()
    } else {
        names.iter().map(AsRef::as_ref).collect()
    };

    let mut rows = Vec::new();
    let mut missing = Vec::new();

    for name in requested {
        let Some(filters) = sets.get(name) else {
            missing.push(name.to_string());
            continue;
        };
        let outcome = apply_filters(dataset, filters);
        log::debug!("filter set '{}' keeps {} rows", name, outcome.row_count());
        rows.push(ImpactRow {
            name: name.to_string(),
            filter_count: filters.len(),
            row_count: outcome.row_count(),
            skipped_filters: outcome.diagnostics.len(),
        });
    }

    ImpactReport {
        original_rows: dataset.row_count(),
        rows,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Value;
    use crate::filter::{Condition, FilterSpec};

    #[test]
    fn test_each_set_sees_the_full_dataset() {
        let dataset = Dataset::from_columns([(
            "score",
            vec![Value::Int(5), Value::Int(15), Value::Int(25)],
        )])
        .unwrap();

        let mut sets = FilterSets::new();
        sets.insert(
            "high".to_string(),
            vec![FilterSpec::column_value("score", Condition::Gt, 10)],
        );
        sets.insert(
            "low".to_string(),
            vec![FilterSpec::column_value("score", Condition::Lt, 10)],
        );
        sets.insert(
            "broken".to_string(),
            vec![FilterSpec::column_value("ghost", Condition::Eq, 1)],
        );

        let report = analyze_impact(&dataset, &sets, &[] as &[&str]);
        let counts: Vec<_> = report
            .rows
            .iter()
            .map(|r| (r.name.as_str(), r.row_count, r.skipped_filters))
            .collect();
        assert_eq!(
            counts,
            vec![("broken", 3, 1), ("high", 2, 0), ("low", 1, 0)]
        );

        let report = analyze_impact(&dataset, &sets, &["low", "nope"]);
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.missing, vec!["nope".to_string()]);
        assert_eq!(report.original_rows, 3);
    }
}
