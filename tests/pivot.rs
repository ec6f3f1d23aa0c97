mod common;

use common::labels;
use limnify::{
    ColumnSelector, Dataset, DatasetOptions, RawData, Value,
    pivot::{PivotSpec, pivot},
};

fn rows(raw: &[[&str; 3]]) -> Vec<Vec<String>> {
    raw.iter()
        .map(|row| row.iter().map(|s| s.to_string()).collect())
        .collect()
}

#[test]
fn long_rows_become_metric_columns_with_sums() {
    let headers = labels(&["day", "wiki", "views"]);
    let input = rows(&[
        ["2013-01-02", "en", "5"],
        ["2013-01-01", "de", "2"],
        ["2013-01-01", "en", "3"],
        ["2013-01-01", "en", "4"],
    ]);
    let pivoted = pivot(&headers, &input, &PivotSpec::default()).unwrap();
    assert_eq!(pivoted.date_key, "day");
    assert_eq!(pivoted.metrics, vec!["de", "en"]);

    let dataset = Dataset::new(
        "views",
        "Views",
        pivoted.data,
        DatasetOptions::default().with_date_key("day"),
    )
    .unwrap();
    let table = dataset.table();
    assert_eq!(table.column_names(), vec!["de", "en"]);
    assert_eq!(table.cell(0, "en"), Some(&Value::Integer(7)));
    assert_eq!(table.cell(0, "de"), Some(&Value::Integer(2)));
    assert_eq!(table.cell(1, "en"), Some(&Value::Integer(5)));
    assert_eq!(table.cell(1, "de"), None);
    assert_eq!(
        dataset.datafile_string().unwrap(),
        "day,de,en\n2013/01/01,2,7\n2013/01/02,,5\n"
    );
}

#[test]
fn equal_dates_written_differently_share_a_row() {
    let headers = labels(&["date", "wiki", "edits"]);
    let input = rows(&[["2013-01-01", "en", "3"], ["2013-1-1", "en", "4"]]);
    let spec = PivotSpec {
        date_format: Some("%Y-%m-%d".into()),
        ..PivotSpec::default()
    };
    let pivoted = pivot(&headers, &input, &spec).unwrap();
    let dataset = Dataset::new(
        "edits",
        "Edits",
        pivoted.data,
        DatasetOptions::default().with_date_key("date"),
    )
    .unwrap();
    assert_eq!(dataset.datafile_string().unwrap(), "date,en\n2013/01/01,7\n");
}

#[test]
fn unparseable_pivot_dates_fail() {
    let headers = labels(&["date", "metric", "value"]);
    let input = rows(&[["someday", "a", "1"]]);
    let err = pivot(&headers, &input, &PivotSpec::default()).unwrap_err();
    assert!(err.is_date_parse());
}

#[test]
fn selectors_accept_names_and_floats_widen_the_sum() {
    let headers = labels(&["value", "metric", "date"]);
    let input = rows(&[["1.5", "a", "2013-01-01"], ["2", "a", "2013-01-01"]]);
    let spec = PivotSpec {
        date: ColumnSelector::Name("date".into()),
        metric: ColumnSelector::Name("metric".into()),
        value: ColumnSelector::Index(0),
        date_format: None,
    };
    let pivoted = pivot(&headers, &input, &spec).unwrap();
    let RawData::Columns(columns) = pivoted.data else {
        panic!("pivot yields columns");
    };
    assert_eq!(columns["a"], vec![Some(Value::Float(3.5))]);
}

#[test]
fn blank_values_are_skipped() {
    let headers = labels(&["date", "metric", "value"]);
    let input = rows(&[["2013-01-01", "a", ""], ["2013-01-02", "a", "4"]]);
    let pivoted = pivot(&headers, &input, &PivotSpec::default()).unwrap();
    let RawData::Columns(columns) = pivoted.data else {
        panic!("pivot yields columns");
    };
    assert_eq!(columns["a"], vec![None, Some(Value::Integer(4))]);
}

#[test]
fn non_numeric_values_fail() {
    let headers = labels(&["date", "metric", "value"]);
    let input = rows(&[["2013-01-01", "a", "lots"]]);
    let err = pivot(&headers, &input, &PivotSpec::default()).unwrap_err();
    assert!(err.is_schema());
    assert!(err.to_string().contains("lots"));
}

#[test]
fn selectors_must_be_distinct_and_present() {
    let headers = labels(&["date", "metric", "value"]);
    let same = PivotSpec {
        value: ColumnSelector::Index(1),
        ..PivotSpec::default()
    };
    assert!(pivot(&headers, &[], &same).unwrap_err().is_schema());

    let missing = PivotSpec {
        metric: ColumnSelector::Name("wiki".into()),
        ..PivotSpec::default()
    };
    assert!(pivot(&headers, &[], &missing).unwrap_err().is_schema());
}
