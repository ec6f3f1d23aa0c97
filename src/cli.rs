use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::{
    data::DEFAULT_DATE_FORMAT,
    graph::MetricRef,
    metadata::{ColumnType, DescriptorFormat},
    normalize::ColumnSelector,
};

pub const BASEDIR_ENV: &str = "LIMNIFY_BASEDIR";

#[derive(Debug, Parser)]
#[command(author, version, about = "Turn tabular time series into Limn datasources, graphs and dashboards", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Convert a source table into a datafile and datasource descriptor
    Source(SourceArgs),
    /// Compose a graph from datasources already written under the base directory
    Graph(GraphArgs),
    /// Group graph ids into the named tabs of a dashboard
    Dashboard(DashboardArgs),
}

#[derive(Debug, Args)]
pub struct SourceArgs {
    /// Source table to convert (`-` reads stdin)
    pub input: PathBuf,
    /// Field delimiter (supports ',', 'tab', ';', '|'); defaults to tab unless the input ends in .csv
    #[arg(long, value_parser = parse_delimiter)]
    pub delimiter: Option<u8>,
    /// Character encoding of the input file (defaults to utf-8)
    #[arg(long = "input-encoding")]
    pub input_encoding: Option<String>,
    /// Comma-separated column names for input without a header row
    #[arg(long = "header", value_delimiter = ',', action = clap::ArgAction::Append)]
    pub header: Vec<String>,
    /// Date column, by name or zero-based index
    #[arg(long = "datecol", default_value = "0", value_parser = parse_selector)]
    pub datecol: ColumnSelector,
    /// Strptime-style format of the input dates (generic parsing when omitted)
    #[arg(long = "datefmt")]
    pub datefmt: Option<String>,
    /// Format used to write dates into the datafile and timespan
    #[arg(long = "output-datefmt", default_value = DEFAULT_DATE_FORMAT)]
    pub output_datefmt: String,
    /// Reshape long (date, metric, value) rows into one column per metric, summing duplicates
    #[arg(long)]
    pub pivot: bool,
    /// Metric-name column for --pivot, by name or zero-based index
    #[arg(long = "metriccol", default_value = "1", value_parser = parse_selector)]
    pub metriccol: ColumnSelector,
    /// Value column for --pivot, by name or zero-based index
    #[arg(long = "valcol", default_value = "2", value_parser = parse_selector)]
    pub valcol: ColumnSelector,
    /// Root directory receiving datafiles/, datasources/ and graphs/
    #[arg(long, env = BASEDIR_ENV, default_value = ".")]
    pub basedir: PathBuf,
    /// Datasource id (defaults to the snake-cased input file stem)
    #[arg(long)]
    pub id: Option<String>,
    /// Datasource display name (defaults to the input file stem)
    #[arg(long)]
    pub name: Option<String>,
    /// Comma-separated column types, date column first (e.g. `date,int,int`)
    #[arg(long, value_delimiter = ',', value_parser = parse_column_type)]
    pub types: Vec<ColumnType>,
    /// Descriptor encoding
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: DescriptorFormat,
    /// Also write a graph plotting every column of the datasource
    #[arg(long = "write-graph")]
    pub write_graph: bool,
    /// Print the normalized table to stderr before writing
    #[arg(long)]
    pub preview: bool,
    /// Number of rows shown by --preview
    #[arg(long = "preview-rows", default_value_t = 10)]
    pub preview_rows: usize,
}

#[derive(Debug, Args)]
pub struct GraphArgs {
    /// Graph id, used as the file stem under graphs/
    #[arg(long)]
    pub id: String,
    /// Graph title (defaults to the id)
    #[arg(long)]
    pub title: Option<String>,
    /// URL slug (defaults to the id)
    #[arg(long)]
    pub slug: Option<String>,
    /// Datasource ids to load from the base directory
    #[arg(long = "source", required = true, action = clap::ArgAction::Append)]
    pub sources: Vec<String>,
    /// Metrics of the form `SOURCE:COLUMN`, column by label or index (all columns when omitted)
    #[arg(long = "metric", action = clap::ArgAction::Append, value_parser = parse_metric)]
    pub metrics: Vec<MetricRef>,
    /// Format of the dates stored in the datafiles
    #[arg(long = "datefmt", default_value = DEFAULT_DATE_FORMAT)]
    pub datefmt: String,
    /// Preferred descriptor encoding to look up first
    #[arg(long, value_enum, default_value = "yaml")]
    pub format: DescriptorFormat,
    /// Root directory holding datafiles/, datasources/ and graphs/
    #[arg(long, env = BASEDIR_ENV, default_value = ".")]
    pub basedir: PathBuf,
}

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Dashboard id, used as the file stem under dashboards/
    #[arg(long)]
    pub id: String,
    /// Dashboard name (defaults to the id)
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, default_value = "")]
    pub headline: String,
    #[arg(long, default_value = "")]
    pub subhead: String,
    /// Tabs of the form `NAME=graph1,graph2`, in display order
    #[arg(long = "tab", action = clap::ArgAction::Append, value_parser = parse_tab)]
    pub tabs: Vec<TabArg>,
    /// Root directory receiving dashboards/
    #[arg(long, env = BASEDIR_ENV, default_value = ".")]
    pub basedir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabArg {
    pub name: String,
    pub graph_ids: Vec<String>,
}

pub fn parse_delimiter(value: &str) -> Result<u8, String> {
    match value {
        "tab" | "\t" | "\\t" => Ok(b'\t'),
        "comma" | "," => Ok(b','),
        "|" | "pipe" => Ok(b'|'),
        ";" | "semicolon" => Ok(b';'),
        other => {
            let mut chars = other.chars();
            let first = chars
                .next()
                .ok_or_else(|| "Delimiter cannot be empty".to_string())?;
            if chars.next().is_some() {
                return Err("Delimiter must be a single character".to_string());
            }
            if !first.is_ascii() {
                return Err("Delimiter must be ASCII".to_string());
            }
            Ok(first as u8)
        }
    }
}

fn parse_selector(value: &str) -> Result<ColumnSelector, String> {
    value.parse()
}

fn parse_column_type(value: &str) -> Result<ColumnType, String> {
    value.parse().map_err(|err: crate::error::Error| err.to_string())
}

fn parse_metric(value: &str) -> Result<MetricRef, String> {
    value.parse()
}

pub fn parse_tab(value: &str) -> Result<TabArg, String> {
    let (name, graphs) = value
        .split_once('=')
        .ok_or_else(|| format!("tab '{value}' must look like NAME=graph1,graph2"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("tab '{value}' has an empty name"));
    }
    let graph_ids = graphs
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    Ok(TabArg {
        name: name.to_string(),
        graph_ids,
    })
}
