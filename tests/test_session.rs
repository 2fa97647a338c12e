use sheet_filter::filter::FilterKind;
use sheet_filter::{Condition, FilterSetStore, FilterSpec, LoadError, Session, StoreError};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).expect("write csv");
    path
}

const SCORES: &str = "score,label\n5,a\n15,b\n25,a\n";

#[test]
fn test_fresh_session_has_nothing_to_filter() {
    let mut session = Session::new();
    assert!(session.dataset().is_none());
    assert!(session.builder().is_none());
    assert_eq!(session.filtered().row_count(), 0);
}

#[test]
fn test_build_and_apply_filters() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");

    let mut builder = session.builder().expect("dataset loaded");
    let first = builder.add();
    builder.set_column(first, "label").expect("column");
    builder
        .set_value(first, serde_json::json!("a"))
        .expect("value");
    let second = builder.add();
    builder
        .change_kind(second, FilterKind::ColumnRange)
        .expect("kind");
    builder.set_range(second, 10.0, 30.0).expect("range");

    let outcome = session.filtered();
    assert_eq!(outcome.row_count(), 1);
    assert_eq!(
        session.filters()[1],
        FilterSpec::column_range("score", 10.0, 25.0)
    );
}

#[test]
fn test_reopening_same_file_keeps_filters_other_file_clears_them() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);
    let other = write_csv(dir.path(), "other.csv", "x\n1\n");

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");
    session.set_filters(vec![FilterSpec::column_value("score", Condition::Gt, 10)]);

    session.open_file(&path, None).expect("reopen");
    assert_eq!(session.filters().len(), 1);

    session.open_file(&other, None).expect("open other");
    assert!(session.filters().is_empty());
    assert_eq!(session.source_path(), Some(other.as_path()));
}

#[test]
fn test_failed_load_resets_the_session() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);
    let empty = write_csv(dir.path(), "empty.csv", "");

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");
    session.set_filters(vec![FilterSpec::column_value("score", Condition::Gt, 10)]);

    assert!(matches!(
        session.open_file(&empty, None),
        Err(LoadError::MissingHeaders)
    ));
    assert!(session.dataset().is_none());
    assert!(session.filters().is_empty());
    assert!(session.source_path().is_none());
}

#[test]
fn test_select_sheet_without_workbook_fails_and_resets() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");
    assert!(session.select_sheet("Sheet1").is_err());
    assert!(session.dataset().is_none());
}

#[test]
fn test_named_sets_through_the_session() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);
    let store = FilterSetStore::new(dir.path().join("named_filters.json"));

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");

    assert!(matches!(
        session.save_named_set(&store, "high"),
        Err(StoreError::EmptyFilterList)
    ));

    session.set_filters(vec![FilterSpec::column_value("score", Condition::Gt, 10)]);
    session.save_named_set(&store, "high").expect("save");

    session.set_filters(Vec::new());
    session.load_named_set(&store, "high").expect("load");
    assert_eq!(session.filtered().row_count(), 2);

    assert!(matches!(
        session.load_named_set(&store, "ghost"),
        Err(StoreError::NotFound(_))
    ));
    session.delete_named_set(&store, "high").expect("delete");
    assert!(store.names().is_empty());
}

#[test]
fn test_reset_clears_everything() {
    let dir = tempdir().expect("temp dir");
    let path = write_csv(dir.path(), "scores.csv", SCORES);

    let mut session = Session::new();
    session.open_file(&path, None).expect("open");
    session.set_filters(vec![FilterSpec::column_value("score", Condition::Gt, 10)]);
    session.reset();

    assert!(session.dataset().is_none());
    assert!(session.filters().is_empty());
    assert!(session.sheet().is_none());
}

#[test]
fn test_switching_sheets_clears_filters() {
    use rust_xlsxwriter::Workbook;

    let dir = tempdir().expect("temp dir");
    let path = dir.path().join("book.xlsx");
    let mut workbook = Workbook::new();
    for name in ["First", "Second"] {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(name).expect("sheet name");
        worksheet.write_string(0, 0, "score").expect("write");
        worksheet.write_number(1, 0, 1.0).expect("write");
    }
    workbook.save(&path).expect("save workbook");

    let mut session = Session::new();
    assert!(matches!(
        session.open_file(&path, None),
        Err(LoadError::SheetSelectionRequired { .. })
    ));
    assert!(session.dataset().is_none());

    session.open_file(&path, Some("First")).expect("open sheet");
    assert_eq!(session.sheet_names(), ["First", "Second"]);
    session.set_filters(vec![FilterSpec::column_value("score", Condition::Eq, 1)]);

    session.select_sheet("First").expect("same sheet");
    assert_eq!(session.filters().len(), 1);

    session.select_sheet("Second").expect("other sheet");
    assert_eq!(session.sheet(), Some("Second"));
    assert!(session.filters().is_empty());
}
