use serde_json::json;
use sheet_filter::dataset::read_delimited_str;
use sheet_filter::filter::{FilterError, decode_filter_list, parse_where_terms};
use sheet_filter::{Condition, Dataset, FilterSpec, Value, apply_filters};

fn scores() -> Dataset {
    Dataset::from_columns([
        ("score", vec![Value::Int(5), Value::Int(15), Value::Int(25)]),
        (
            "label",
            vec![
                Value::Text("a".into()),
                Value::Text("b".into()),
                Value::Text("a".into()),
            ],
        ),
    ])
    .expect("valid dataset")
}

fn column_texts(dataset: &Dataset, name: &str) -> Vec<String> {
    dataset
        .column(name)
        .expect("column exists")
        .values()
        .iter()
        .map(|v| v.to_string())
        .collect()
}

#[test]
fn test_label_and_score_keep_exactly_one_row() {
    let filters = vec![
        FilterSpec::column_value("label", Condition::Eq, "a"),
        FilterSpec::column_value("score", Condition::Gt, 10),
    ];
    let outcome = apply_filters(&scores(), &filters);

    assert_eq!(outcome.row_count(), 1);
    assert_eq!(
        outcome.dataset.row(0),
        Some(vec![&Value::Int(25), &Value::Text("a".into())])
    );
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_empty_filter_list_is_identity() {
    let dataset = scores();
    assert_eq!(apply_filters(&dataset, &[]).dataset, dataset);
}

#[test]
fn test_each_prefix_keeps_a_superset() {
    let dataset = read_delimited_str(
        "id,score,label,ratio\n1,5,a,0.1\n2,15,b,0.5\n3,25,a,0.9\n4,35,c,0.2\n5,,a,0.7\n",
        b',',
    )
    .expect("csv parses");
    let filters = vec![
        FilterSpec::column_value("label", Condition::Ne, "c"),
        FilterSpec::column_range("score", 0.0, 30.0),
        FilterSpec::column_comparison("ratio", Condition::Lt, "score"),
        FilterSpec::column_value("id", Condition::Ge, 2),
    ];

    let mut previous_ids = column_texts(&dataset, "id");
    for end in 1..=filters.len() {
        let outcome = apply_filters(&dataset, &filters[..end]);
        let ids = column_texts(&outcome.dataset, "id");
        assert!(ids.len() <= previous_ids.len());
        assert!(
            ids.iter().all(|id| previous_ids.contains(id)),
            "prefix {end} kept {ids:?}, not a subset of {previous_ids:?}"
        );
        previous_ids = ids;
    }
    assert_eq!(previous_ids, vec!["2", "3"]);
}

#[test]
fn test_value_filters_on_different_columns_commute() {
    let a = FilterSpec::column_value("label", Condition::Eq, "a");
    let b = FilterSpec::column_value("score", Condition::Le, 20);
    let dataset = scores();

    let ab = apply_filters(&dataset, &[a.clone(), b.clone()]);
    let ba = apply_filters(&dataset, &[b, a]);
    assert_eq!(ab.dataset, ba.dataset);
    assert_eq!(ab.row_count(), 1);
}

#[test]
fn test_range_bounds_are_inclusive() {
    let dataset = Dataset::from_columns([(
        "x",
        vec![
            Value::Float(9.999),
            Value::Int(10),
            Value::Float(15.0),
            Value::Int(20),
            Value::Float(20.001),
        ],
    )])
    .expect("valid dataset");

    let outcome = apply_filters(&dataset, &[FilterSpec::column_range("x", 10.0, 20.0)]);
    assert_eq!(column_texts(&outcome.dataset, "x"), vec!["10", "15", "20"]);
}

#[test]
fn test_range_excludes_rows_that_are_not_numbers() {
    let dataset = Dataset::from_columns([(
        "x",
        vec![
            Value::Text("12".into()),
            Value::Text("n/a".into()),
            Value::Null,
            Value::Text(" 14 ".into()),
        ],
    )])
    .expect("valid dataset");

    let outcome = apply_filters(&dataset, &[FilterSpec::column_range("x", 10.0, 20.0)]);
    assert_eq!(outcome.row_count(), 2);
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_comparison_skips_rows_with_text_on_one_side() {
    let dataset = Dataset::from_columns([
        (
            "home",
            vec![
                Value::Int(3),
                Value::Text("abc".into()),
                Value::Int(1),
                Value::Bool(true),
            ],
        ),
        (
            "away",
            vec![Value::Int(1), Value::Int(0), Value::Int(2), Value::Int(0)],
        ),
    ])
    .expect("valid dataset");

    let outcome = apply_filters(
        &dataset,
        &[FilterSpec::column_comparison("home", Condition::Gt, "away")],
    );
    assert_eq!(outcome.row_count(), 1);
    assert_eq!(outcome.dataset.row(0).expect("row")[0], &Value::Int(3));
    assert!(outcome.diagnostics.is_empty());
}

#[test]
fn test_broken_filter_in_the_middle_is_isolated() {
    let dataset = scores();
    let valid = FilterSpec::column_value("label", Condition::Eq, "a");
    let valid2 = FilterSpec::column_value("score", Condition::Gt, 10);

    let malformed = [
        FilterSpec::column_value("missing", Condition::Eq, 1),
        FilterSpec::column_value("label", Condition::Ge, "a"),
        FilterSpec::column_value("score", Condition::Eq, "high"),
        FilterSpec::column_comparison("score", Condition::Gt, "nope"),
    ];

    let expected = apply_filters(&dataset, &[valid.clone(), valid2.clone()]);
    for bad in malformed {
        let outcome = apply_filters(&dataset, &[valid.clone(), bad.clone(), valid2.clone()]);
        assert_eq!(outcome.dataset, expected.dataset, "filter {bad} leaked");
        assert_eq!(outcome.diagnostics.len(), 1);
        assert_eq!(outcome.diagnostics[0].position, 2);
    }
}

#[test]
fn test_diagnostic_names_position_and_column() {
    let outcome = apply_filters(
        &scores(),
        &[FilterSpec::column_value("label", Condition::Lt, "b")],
    );
    let diagnostic = &outcome.diagnostics[0];
    assert_eq!(diagnostic.column.as_deref(), Some("label"));
    assert!(matches!(
        diagnostic.error,
        FilterError::OrderingOnNonNumeric { .. }
    ));
    assert!(diagnostic.to_string().starts_with("Filter 1 (label):"));
}

#[test]
fn test_provisional_filters_from_saved_json() {
    let filters = decode_filter_list(&json!([
        {"type": "column_value", "column": "label", "condition": "==", "value": ""},
        {"type": "column_range", "column": "score", "value": [10]},
        {"type": "column_comparison", "column1": "score", "column2": "score"},
        {"type": "column_value", "column": "score", "condition": "<", "value": "20"}
    ]))
    .expect("valid filter list");

    let outcome = apply_filters(&scores(), &filters);
    assert_eq!(outcome.inactive, vec![1, 2, 3]);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(column_texts(&outcome.dataset, "score"), vec!["5", "15"]);
}

#[test]
fn test_filtering_does_not_touch_the_source() {
    let dataset = scores();
    let before = dataset.clone();
    let outcome = apply_filters(
        &dataset,
        &[FilterSpec::column_value("score", Condition::Eq, 5)],
    );
    assert_eq!(outcome.row_count(), 1);
    assert_eq!(dataset, before);
}

#[test]
fn test_number_literal_on_text_column_matches_numeric_cells() {
    let dataset = Dataset::from_columns([(
        "code",
        vec![
            Value::Text("7".into()),
            Value::Text("abc".into()),
            Value::Text("07".into()),
        ],
    )])
    .expect("valid dataset");

    let equal = apply_filters(
        &dataset,
        &[FilterSpec::column_value("code", Condition::Eq, 7)],
    );
    assert_eq!(column_texts(&equal.dataset, "code"), vec!["7", "07"]);
    assert!(equal.diagnostics.is_empty());

    let other = apply_filters(
        &dataset,
        &[FilterSpec::column_value("code", Condition::Ne, 7)],
    );
    assert_eq!(column_texts(&other.dataset, "code"), vec!["abc"]);
}

#[test]
fn test_where_term_number_matches_text_column() {
    let dataset = Dataset::from_columns([(
        "code",
        vec![Value::Text("7".into()), Value::Text("abc".into())],
    )])
    .expect("valid dataset");
    let filters = parse_where_terms(&["code==7".to_string()]).expect("term parses");

    let outcome = apply_filters(&dataset, &filters);
    assert_eq!(outcome.row_count(), 1);
    assert!(outcome.diagnostics.is_empty());
}
