//! The `source` command: reads a delimited table and writes it as a
//! Limn datasource.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use heck::ToSnakeCase;
use log::info;

use crate::{
    cli::SourceArgs,
    data::Value,
    dataset::{Dataset, DatasetOptions},
    io_utils,
    normalize::RawData,
    pivot::{self, PivotSpec},
};

const STDIN_STEM: &str = "stdin";

pub fn execute(args: &SourceArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    let has_headers = args.header.is_empty();
    info!(
        "Reading '{}' with delimiter '{}'",
        args.input.display(),
        crate::printable_delimiter(delimiter)
    );

    let mut reader = io_utils::open_csv_reader_from_path(&args.input, delimiter, has_headers)
        .with_context(|| format!("Opening {:?}", args.input))?;
    let headers = if has_headers {
        io_utils::reader_headers(&mut reader, &args.input, encoding)
            .with_context(|| format!("Reading headers from {:?}", args.input))?
    } else {
        args.header.clone()
    };
    let rows = io_utils::read_records(&mut reader, &args.input, encoding)
        .with_context(|| format!("Reading rows from {:?}", args.input))?;

    let (id, name) = identity(args)?;
    let mut options = DatasetOptions::default()
        .with_date_format(args.output_datefmt.clone())
        .with_descriptor_format(args.format);
    if let Some(format) = &args.datefmt {
        options = options.with_input_date_format(format.clone());
    }
    if !args.types.is_empty() {
        options = options.with_types(args.types.clone());
    }

    let data = if args.pivot {
        let spec = PivotSpec {
            date: args.datecol.clone(),
            metric: args.metriccol.clone(),
            value: args.valcol.clone(),
            date_format: args.datefmt.clone(),
        };
        let pivoted = pivot::pivot(&headers, &rows, &spec)
            .with_context(|| format!("Pivoting {:?}", args.input))?;
        info!(
            "Pivoted {} row(s) into {} metric column(s)",
            rows.len(),
            pivoted.metrics.len()
        );
        options = options.with_date_key(pivoted.date_key);
        pivoted.data
    } else {
        let date_key = args.datecol.resolve(&headers)?;
        let date_position = headers
            .iter()
            .position(|h| *h == date_key)
            .unwrap_or_default();
        options = options.with_date_key(date_key).with_labels(headers);
        RawData::Positional(typed_rows(rows, date_position))
    };

    let mut dataset = Dataset::new(id, name, data, options)
        .with_context(|| format!("Building datasource from {:?}", args.input))?;

    if args.preview {
        let preview = dataset
            .table()
            .preview(&args.output_datefmt, args.preview_rows)?;
        eprint!("{preview}");
    }

    let written = dataset
        .write(&args.basedir)
        .with_context(|| format!("Writing datasource '{}'", dataset.id()))?;
    info!(
        "Datasource '{}' written to {:?} and {:?}",
        dataset.id(),
        written.datafile,
        written.descriptor
    );

    if args.write_graph {
        let graph = dataset
            .graph(None)
            .with_context(|| format!("Building graph for '{}'", dataset.id()))?;
        graph
            .write(&args.basedir)
            .with_context(|| format!("Writing graph '{}'", graph.id))?;
    }
    Ok(())
}

/// Id and name from the flags, defaulting to the input file stem.
fn identity(args: &SourceArgs) -> Result<(String, String)> {
    let stem = if io_utils::is_dash(&args.input) {
        STDIN_STEM.to_string()
    } else {
        file_stem(&args.input)?
    };
    let name = args.name.clone().unwrap_or_else(|| stem.clone());
    let id = args.id.clone().unwrap_or_else(|| stem.to_snake_case());
    Ok((id, name))
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .ok_or_else(|| anyhow!("cannot derive a datasource id from {path:?}; pass --id"))
}

/// Coerces text fields into cells. The date column stays textual so the
/// date parser sees it verbatim.
fn typed_rows(rows: Vec<Vec<String>>, date_position: usize) -> Vec<Vec<Option<Value>>> {
    rows.into_iter()
        .map(|row| {
            row.into_iter()
                .enumerate()
                .map(|(position, raw)| {
                    if position == date_position {
                        (!raw.trim().is_empty()).then_some(Value::Text(raw))
                    } else {
                        Value::infer(&raw)
                    }
                })
                .collect()
        })
        .collect()
}
