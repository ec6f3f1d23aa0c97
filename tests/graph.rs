mod common;

use std::collections::BTreeMap;

use common::{TestWorkspace, date};
use limnify::{
    ColumnRef, Dataset, DatasetOptions, Graph, GraphWarning, MetricRef, RawData, Value,
    color::{self, Color},
    table::Cell,
};

fn dataset(id: &str, columns: &[&str]) -> Dataset {
    let mut data: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    data.insert(
        "date".to_string(),
        vec![Some(date(2013, 1, 1)), Some(date(2013, 1, 2))],
    );
    for (offset, column) in columns.iter().enumerate() {
        data.insert(
            column.to_string(),
            vec![
                Some(Value::Integer(offset as i64)),
                Some(Value::Integer(offset as i64 + 10)),
            ],
        );
    }
    let labels = std::iter::once("date")
        .chain(columns.iter().copied())
        .collect::<Vec<_>>();
    Dataset::new(
        id,
        id.to_uppercase(),
        RawData::Columns(data),
        DatasetOptions::default().with_labels(labels),
    )
    .expect("dataset")
}

#[test]
fn default_references_cover_every_column_in_dataset_order() {
    let first = dataset("first", &["a", "b"]);
    let second = dataset("second", &["c", "d"]);
    let graph = Graph::new("combined", "Combined", &[&first, &second], None).unwrap();

    let metrics = graph.metrics();
    assert_eq!(metrics.len(), 4);
    let described = metrics
        .iter()
        .map(|m| (m.index, m.source_id.as_str(), m.label.as_str(), m.source_col))
        .collect::<Vec<_>>();
    assert_eq!(
        described,
        vec![
            (0, "first", "a", 1),
            (1, "first", "b", 2),
            (2, "second", "c", 1),
            (3, "second", "d", 2),
        ]
    );
    let colors = metrics.iter().map(|m| m.color).collect::<Vec<_>>();
    assert_eq!(colors, color::assign_colors(4));
    assert!(graph.warnings().is_empty());
    assert_eq!(graph.slug, "combined");
}

#[test]
fn unresolved_metric_is_skipped_with_warning() {
    let first = dataset("first", &["a", "b"]);
    let references = vec![
        MetricRef::label("first", "a"),
        MetricRef::label("first", "missing"),
        MetricRef::label("first", "b"),
        MetricRef::label("nowhere", "a"),
    ];
    let graph = Graph::new("partial", "Partial", &[&first], Some(&references)).unwrap();

    let indices = graph.metrics().iter().map(|m| m.index).collect::<Vec<_>>();
    assert_eq!(indices, vec![0, 1]);
    assert_eq!(graph.metrics()[1].label, "b");
    assert_eq!(
        graph.warnings(),
        &[
            GraphWarning::UnresolvedColumn {
                source_id: "first".to_string(),
                column: "missing".to_string(),
            },
            GraphWarning::UnknownSource {
                source_id: "nowhere".to_string(),
                column: "a".to_string(),
            },
        ]
    );
    // colors follow the resolved count
    let colors = graph.metrics().iter().map(|m| m.color).collect::<Vec<_>>();
    assert_eq!(colors, color::assign_colors(2));
}

#[test]
fn positional_and_explicit_date_references_resolve() {
    let first = dataset("first", &["a", "b"]);
    let references = vec![
        MetricRef::index("first", 2),
        MetricRef::label("first", "date"),
        MetricRef::index("first", 9),
    ];
    let graph = Graph::new("mixed", "Mixed", &[&first], Some(&references)).unwrap();
    let labels = graph
        .metrics()
        .iter()
        .map(|m| (m.label.as_str(), m.kind.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(labels, vec![("b", "int"), ("date", "date")]);
    assert_eq!(graph.warnings().len(), 1);
}

#[test]
fn palette_exhaustion_is_a_warning() {
    let columns = (0..12).map(|i| format!("m{i:02}")).collect::<Vec<_>>();
    let names = columns.iter().map(String::as_str).collect::<Vec<_>>();
    let wide = dataset("wide", &names);
    let graph = Graph::new("wide", "Wide", &[&wide], None).unwrap();

    assert_eq!(graph.metrics().len(), 12);
    assert_eq!(graph.metrics()[11].color, graph.metrics()[0].color);
    assert_eq!(
        graph.warnings(),
        &[GraphWarning::PaletteExhausted { metrics: 12 }]
    );
}

#[test]
fn eleven_metrics_reach_the_palette_limit() {
    let columns = (0..11).map(|i| format!("m{i:02}")).collect::<Vec<_>>();
    let names = columns.iter().map(String::as_str).collect::<Vec<_>>();
    let wide = dataset("eleven", &names);
    let graph = Graph::new("eleven", "Eleven", &[&wide], None).unwrap();

    assert_eq!(graph.metrics().len(), 11);
    assert_eq!(
        graph.warnings(),
        &[GraphWarning::PaletteExhausted { metrics: 11 }]
    );

    let ten = dataset("ten", &names[..10]);
    let graph = Graph::new("ten", "Ten", &[&ten], None).unwrap();
    assert!(graph.warnings().is_empty());
}

#[test]
fn add_metric_recolors_the_graph() {
    let first = dataset("first", &["a", "b", "c"]);
    let references = vec![MetricRef::label("first", "a")];
    let mut graph = Graph::new("grow", "Grow", &[&first], Some(&references)).unwrap();
    assert_eq!(graph.metrics()[0].color, Color::rgb(166, 206, 227));

    assert!(graph.add_metric(&first, ColumnRef::Label("c".into()), Some("Cee".into())));
    assert!(graph.add_metric(&first, ColumnRef::Index(2), None));
    assert!(!graph.add_metric(&first, ColumnRef::Label("zzz".into()), None));

    let metrics = graph.metrics();
    assert_eq!(metrics.len(), 3);
    assert_eq!(metrics[1].label, "Cee");
    assert_eq!(metrics[2].index, 2);
    let colors = metrics.iter().map(|m| m.color).collect::<Vec<_>>();
    assert_eq!(colors, color::assign_colors(3));
}

#[test]
fn graph_document_is_written_as_json() {
    let workspace = TestWorkspace::new();
    let first = dataset("first", &["a", "b"]);
    let graph = Graph::new("first_graph", "First", &[&first], None)
        .unwrap()
        .with_slug("first-slug");
    let path = graph.write(workspace.path()).unwrap();
    assert_eq!(path, workspace.path().join("graphs").join("first_graph.json"));

    let document = workspace.read_json("graphs/first_graph.json");
    assert_eq!(document["id"], "first_graph");
    assert_eq!(document["slug"], "first-slug");
    assert_eq!(document["name"], "First");
    assert_eq!(document["chartType"], "dygraphs");
    assert_eq!(document["width"], "auto");
    assert_eq!(document["minWidth"], 750);
    assert_eq!(document["height"], 500);
    assert_eq!(document["minHeight"], 500);
    assert_eq!(document["options"]["strokeWidth"], 2);
    assert_eq!(document["callout"]["enabled"], true);
    assert_eq!(document["callout"]["target"], "latest");
    assert_eq!(document["callout"]["steps"], serde_json::json!(["1y", "1M"]));
    let metric = &document["data"]["metrics"][0];
    assert_eq!(metric["index"], 0);
    assert_eq!(metric["label"], "a");
    assert_eq!(metric["type"], "int");
    assert_eq!(metric["source_id"], "first");
    assert_eq!(metric["source_col"], 1);
    assert_eq!(metric["color"], "rgb(166,206,227)");
    assert_eq!(metric["scale"], 1.0);
    assert_eq!(metric["visible"], true);
    assert_eq!(metric["disabled"], false);
    assert!(document.get("warnings").is_none());

    let reread: Graph = serde_json::from_value(document).unwrap();
    assert_eq!(reread.metrics(), graph.metrics());
}

#[test]
fn stale_labels_follow_the_live_table() {
    let mut first = dataset("first", &["a"]);
    first
        .table_mut()
        .add_column("late", vec![Some(Value::Integer(1)), None])
        .unwrap();
    let references = vec![MetricRef::label("first", "late")];
    let graph = Graph::new("late", "Late", &[&first], Some(&references)).unwrap();
    assert_eq!(graph.metrics().len(), 1);
    assert_eq!(graph.metrics()[0].source_col, 2);
}
