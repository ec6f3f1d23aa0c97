pub mod cli;
pub mod color;
pub mod compose;
pub mod dashboard;
pub mod data;
pub mod dataset;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod io_utils;
pub mod metadata;
pub mod normalize;
pub mod pivot;
pub mod table;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

pub use crate::{
    dashboard::Dashboard,
    data::Value,
    dataset::{Dataset, DatasetOptions},
    error::Error,
    graph::{ColumnRef, Graph, GraphWarning, MetricRef},
    metadata::{ColumnType, Descriptor, DescriptorFormat},
    normalize::{ColumnSelector, RawData},
    table::CanonicalTable,
};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("limnify", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Source(args) => ingest::execute(&args),
        Commands::Graph(args) => compose::execute_graph(&args),
        Commands::Dashboard(args) => compose::execute_dashboard(&args),
    }
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
