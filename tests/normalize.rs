mod common;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use common::{columnar, date, labels, positional, xy_rows};
use limnify::{RawData, Value, normalize::normalize, table::CanonicalTable};
use proptest::prelude::*;

fn sample() -> Vec<(Value, i64, i64)> {
    vec![
        (date(2012, 10, 1), 7, 9),
        (date(2012, 9, 1), 1, 2),
        (date(2012, 9, 15), 4, 5),
    ]
}

#[test]
fn all_input_shapes_produce_the_same_table() {
    let rows = sample();
    let from_maps = normalize(RawData::Rows(xy_rows(&rows)), None, "date", None).unwrap();
    let from_positional = normalize(
        RawData::Positional(positional(&rows)),
        Some(&labels(&["date", "x", "y"])),
        "date",
        None,
    )
    .unwrap();
    let from_columns = normalize(RawData::Columns(columnar(&rows)), None, "date", None).unwrap();

    assert_eq!(from_maps, from_positional);
    assert_eq!(from_maps, from_columns);
    assert_eq!(from_maps.column_names(), vec!["x", "y"]);
    assert!(from_maps.is_sorted());
    assert_eq!(from_maps.cell(0, "x"), Some(&Value::Integer(1)));
}

#[test]
fn existing_table_is_revalidated_and_sorted() {
    let rows = sample();
    let table = normalize(RawData::Rows(xy_rows(&rows)), None, "date", None).unwrap();
    let again = normalize(RawData::from(table.clone()), None, "date", None).unwrap();
    assert_eq!(again, table);

    let relabelled = normalize(RawData::Table(table), None, "day", None).unwrap();
    assert_eq!(relabelled.date_key(), "day");
}

#[test]
fn positional_rows_without_labels_fail() {
    let err = normalize(RawData::Positional(positional(&sample())), None, "date", None)
        .unwrap_err();
    assert!(err.is_schema());
}

#[test]
fn missing_date_key_names_available_columns() {
    let err = normalize(RawData::Rows(xy_rows(&sample())), None, "day", None).unwrap_err();
    assert!(err.is_schema());
    let message = err.to_string();
    assert!(message.contains("'day'"), "{message}");
    assert!(message.contains("date, x, y"), "{message}");
}

#[test]
fn unparseable_date_reports_the_raw_value() {
    let rows = vec![BTreeMap::from([
        ("date".to_string(), Value::from("not a date")),
        ("x".to_string(), Value::Integer(1)),
    ])];
    let err = normalize(RawData::Rows(rows), None, "date", None).unwrap_err();
    assert!(err.is_date_parse());
    assert!(err.to_string().contains("not a date"));
}

#[test]
fn explicit_format_handles_hourly_dates() {
    let rows = vec![
        vec![Some(Value::from("2013-01-02_05")), Some(Value::Integer(3))],
        vec![Some(Value::from("2013-01-02_04")), Some(Value::Integer(2))],
    ];
    let table = normalize(
        RawData::Positional(rows),
        Some(&labels(&["hour", "hits"])),
        "hour",
        Some("%Y-%m-%d_%H"),
    )
    .unwrap();
    let expected = NaiveDate::from_ymd_opt(2013, 1, 2)
        .unwrap()
        .and_hms_opt(4, 0, 0)
        .unwrap();
    assert_eq!(table.index()[0], expected);
    assert_eq!(table.cell(0, "hits"), Some(&Value::Integer(2)));
}

#[test]
fn monthly_format_without_day_parses_to_first_of_month() {
    let rows = vec![
        vec![Some(Value::from("2012-10")), Some(Value::Integer(2))],
        vec![Some(Value::from("2012-09")), Some(Value::Integer(1))],
    ];
    let table = normalize(
        RawData::Positional(rows),
        Some(&labels(&["date", "x"])),
        "date",
        Some("%Y-%m"),
    )
    .unwrap();
    let first = NaiveDate::from_ymd_opt(2012, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    assert_eq!(table.index()[0], first);
    assert_eq!(table.cell(0, "x"), Some(&Value::Integer(1)));
}

#[test]
fn labels_select_and_order_named_columns() {
    let rows = xy_rows(&sample());
    let table = normalize(
        RawData::Rows(rows),
        Some(&labels(&["y", "date", "z"])),
        "date",
        None,
    )
    .unwrap();
    assert_eq!(table.column_names(), vec!["y", "z"]);
    assert_eq!(table.cell(0, "z"), None);
}

#[test]
fn unequal_column_lengths_fail() {
    let mut columns = columnar(&sample());
    columns.get_mut("x").unwrap().pop();
    let err = normalize(RawData::Columns(columns), None, "date", None).unwrap_err();
    assert!(err.is_schema());
}

#[test]
fn duplicate_labels_fail() {
    let err = normalize(
        RawData::Positional(positional(&sample())),
        Some(&labels(&["date", "x", "x"])),
        "date",
        None,
    )
    .unwrap_err();
    assert!(err.is_schema());
}

#[test]
fn ties_keep_input_order() {
    let rows = vec![
        (date(2012, 9, 2), 1, 0),
        (date(2012, 9, 1), 2, 0),
        (date(2012, 9, 2), 3, 0),
    ];
    let table = normalize(RawData::Rows(xy_rows(&rows)), None, "date", None).unwrap();
    let xs = table
        .column("x")
        .unwrap()
        .values
        .iter()
        .map(|v| v.clone().unwrap())
        .collect::<Vec<_>>();
    assert_eq!(
        xs,
        vec![Value::Integer(2), Value::Integer(1), Value::Integer(3)]
    );
}

proptest! {
    #[test]
    fn index_is_sorted_for_any_input_order(days in proptest::collection::vec(0i64..3650, 0..40)) {
        let base = NaiveDate::from_ymd_opt(2010, 1, 1).unwrap();
        let rows = days
            .iter()
            .enumerate()
            .map(|(i, offset)| {
                let day = base + chrono::Duration::days(*offset);
                (Value::Date(day), i as i64, 0)
            })
            .collect::<Vec<_>>();
        let table: CanonicalTable =
            normalize(RawData::Rows(xy_rows(&rows)), Some(&labels(&["date", "x", "y"])), "date", None)
                .unwrap();
        prop_assert_eq!(table.len(), days.len());
        prop_assert!(table.index().windows(2).all(|w| w[0] <= w[1]));
    }
}
