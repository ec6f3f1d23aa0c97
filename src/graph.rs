//! Graph composition: resolves metric references against datasets,
//! numbers them, colors them, and serializes the chart document.

use std::{
    fmt,
    io::Write,
    path::{Path, PathBuf},
    str::FromStr,
};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    color::{self, Color},
    dataset::Dataset,
    error::Result,
    io_utils,
    metadata::{self, ColumnType, DEFAULT_CHART_TYPE},
};

pub const DEFAULT_HEIGHT: u32 = 500;
pub const DEFAULT_MIN_WIDTH: u32 = 750;
pub const DEFAULT_MIN_HEIGHT: u32 = 500;
pub const DEFAULT_STROKE_WIDTH: u32 = 2;

/// A column within a dataset, by label or by position in its labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnRef {
    Label(String),
    Index(usize),
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnRef::Label(label) => f.write_str(label),
            ColumnRef::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRef {
    pub source_id: String,
    pub column: ColumnRef,
}

impl MetricRef {
    pub fn label(source_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            column: ColumnRef::Label(label.into()),
        }
    }

    pub fn index(source_id: impl Into<String>, index: usize) -> Self {
        Self {
            source_id: source_id.into(),
            column: ColumnRef::Index(index),
        }
    }
}

/// Parses `source:column`; an all-digit column is a position.
impl FromStr for MetricRef {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let (source_id, column) = value
            .split_once(':')
            .map(|(source, column)| (source.trim(), column.trim()))
            .filter(|(source, column)| !source.is_empty() && !column.is_empty())
            .ok_or_else(|| format!("metric '{value}' must look like SOURCE:COLUMN"))?;
        if column.chars().all(|c| c.is_ascii_digit()) {
            let index = column
                .parse()
                .map_err(|err| format!("invalid column index in '{value}': {err}"))?;
            Ok(MetricRef::index(source_id, index))
        } else {
            Ok(MetricRef::label(source_id, column))
        }
    }
}

/// Non-fatal conditions recorded while building a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphWarning {
    UnknownSource { source_id: String, column: String },
    UnresolvedColumn { source_id: String, column: String },
    PaletteExhausted { metrics: usize },
}

impl fmt::Display for GraphWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GraphWarning::UnknownSource { source_id, column } => write!(
                f,
                "skipped metric '{column}': no datasource named '{source_id}'"
            ),
            GraphWarning::UnresolvedColumn { source_id, column } => write!(
                f,
                "skipped metric: could not find column '{column}' in datasource '{source_id}'"
            ),
            GraphWarning::PaletteExhausted { metrics } => write!(
                f,
                "{metrics} metrics reach the {}-color palette limit; colors repeat",
                color::PALETTE_THRESHOLD
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub index: usize,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ColumnType,
    pub source_id: String,
    pub source_col: usize,
    pub color: Color,
    pub scale: f64,
    pub disabled: bool,
    pub visible: bool,
    pub format_axis: Option<String>,
    pub format_value: Option<String>,
    pub transforms: Vec<String>,
}

impl Metric {
    fn new(index: usize, source_id: &str, source_col: usize, label: String, kind: ColumnType) -> Self {
        Self {
            index,
            label,
            kind,
            source_id: source_id.to_string(),
            source_col,
            color: Color::rgb(0, 0, 0),
            scale: 1.0,
            disabled: false,
            visible: true,
            format_axis: None,
            format_value: None,
            transforms: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub stroke_width: u32,
    pub draw_points: bool,
    pub label_sort: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            stroke_width: DEFAULT_STROKE_WIDTH,
            draw_points: false,
            label_sort: true,
        }
    }
}

/// The headline figure: the latest value of one metric, compared with
/// its value one step back for each entry in `steps`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Callout {
    pub enabled: bool,
    pub metric_idx: usize,
    pub label: String,
    pub target: String,
    pub steps: Vec<String>,
}

impl Default for Callout {
    fn default() -> Self {
        Self {
            enabled: true,
            metric_idx: 0,
            label: String::new(),
            target: "latest".to_string(),
            steps: vec!["1y".to_string(), "1M".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GraphData {
    pub palette: Option<String>,
    pub metrics: Vec<Metric>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Graph {
    pub id: String,
    pub slug: String,
    pub name: String,
    pub short_name: String,
    pub desc: String,
    pub notes: String,
    pub chart_type: String,
    pub width: String,
    pub min_width: u32,
    pub height: u32,
    pub min_height: u32,
    pub options: ChartOptions,
    pub callout: Callout,
    pub data: GraphData,
    #[serde(skip)]
    warnings: Vec<GraphWarning>,
}

impl Graph {
    /// An empty graph with default chart settings; the slug is the id.
    pub fn empty(id: impl Into<String>, title: impl Into<String>) -> Result<Self> {
        let id = id.into();
        metadata::validate_id("graph", &id)?;
        Ok(Self {
            slug: id.clone(),
            id,
            name: title.into(),
            short_name: String::new(),
            desc: String::new(),
            notes: String::new(),
            chart_type: DEFAULT_CHART_TYPE.to_string(),
            width: "auto".to_string(),
            min_width: DEFAULT_MIN_WIDTH,
            height: DEFAULT_HEIGHT,
            min_height: DEFAULT_MIN_HEIGHT,
            options: ChartOptions::default(),
            callout: Callout::default(),
            data: GraphData::default(),
            warnings: Vec::new(),
        })
    }

    /// Builds a graph over `datasets`.
    ///
    /// Without `metric_ids` every non-date column of every dataset is
    /// plotted, in dataset order and then column order. References that
    /// cannot be resolved are skipped and recorded as warnings. Colors are
    /// assigned from the number of metrics that resolved.
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        datasets: &[&Dataset],
        metric_ids: Option<&[MetricRef]>,
    ) -> Result<Self> {
        let mut graph = Self::empty(id, title)?;
        let references = match metric_ids {
            Some(references) => references.to_vec(),
            None => datasets
                .iter()
                .flat_map(|dataset| {
                    dataset
                        .labels()
                        .into_iter()
                        .skip(1)
                        .map(move |label| MetricRef::label(dataset.id(), label))
                })
                .collect(),
        };
        for reference in &references {
            match datasets.iter().find(|d| d.id() == reference.source_id) {
                Some(dataset) => {
                    graph.push_metric(dataset, &reference.column, None);
                }
                None => graph.record(GraphWarning::UnknownSource {
                    source_id: reference.source_id.clone(),
                    column: reference.column.to_string(),
                }),
            }
        }
        graph.recolor();
        debug!(
            "Graph '{}' resolved {} of {} metric reference(s)",
            graph.id,
            graph.data.metrics.len(),
            references.len()
        );
        Ok(graph)
    }

    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    pub fn metrics(&self) -> &[Metric] {
        &self.data.metrics
    }

    pub fn warnings(&self) -> &[GraphWarning] {
        &self.warnings
    }

    /// Appends one metric and recolors the graph. Returns whether the
    /// column resolved.
    pub fn add_metric(&mut self, dataset: &Dataset, column: ColumnRef, label: Option<String>) -> bool {
        let added = self.push_metric(dataset, &column, label);
        if added {
            self.recolor();
        }
        added
    }

    fn push_metric(&mut self, dataset: &Dataset, column: &ColumnRef, label: Option<String>) -> bool {
        let labels = dataset.labels();
        let position = match column {
            ColumnRef::Label(name) => labels.iter().position(|l| l == name),
            ColumnRef::Index(idx) => Some(*idx).filter(|idx| *idx < labels.len()),
        };
        let Some(position) = position else {
            self.record(GraphWarning::UnresolvedColumn {
                source_id: dataset.id().to_string(),
                column: column.to_string(),
            });
            return false;
        };
        let metric = Metric::new(
            self.data.metrics.len(),
            dataset.id(),
            position,
            label.unwrap_or_else(|| labels[position].clone()),
            dataset.column_type(position),
        );
        self.data.metrics.push(metric);
        true
    }

    fn recolor(&mut self) {
        let colors = color::assign_colors(self.data.metrics.len());
        for (metric, color) in self.data.metrics.iter_mut().zip(colors) {
            metric.color = color;
        }
        self.warnings
            .retain(|w| !matches!(w, GraphWarning::PaletteExhausted { .. }));
        if color::exhausts_palette(self.data.metrics.len()) {
            self.warnings.push(GraphWarning::PaletteExhausted {
                metrics: self.data.metrics.len(),
            });
        }
    }

    fn record(&mut self, warning: GraphWarning) {
        warn!("graph '{}': {warning}", self.id);
        self.warnings.push(warning);
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn path(&self, root: &Path) -> PathBuf {
        root.join("graphs").join(format!("{}.json", self.id))
    }

    /// Writes `{root}/graphs/{id}.json`.
    pub fn write(&self, root: &Path) -> Result<PathBuf> {
        metadata::validate_id("graph", &self.id)?;
        let rendered = self.to_json_string()?;
        let path = self.path(root);
        io_utils::write_atomic(&path, |writer| writer.write_all(rendered.as_bytes()))?;
        info!(
            "Wrote graph '{}' with {} metric(s) to {:?}",
            self.id,
            self.data.metrics.len(),
            path
        );
        Ok(path)
    }
}
