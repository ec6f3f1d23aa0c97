//! Table Normalizer: converts any supported input shape into a
//! [`CanonicalTable`] indexed and sorted by its date column.

use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    fmt,
    str::FromStr,
};

use itertools::Itertools;
use log::debug;

use crate::{
    data::{self, Value},
    error::{Error, Result},
    table::{CanonicalTable, Cell, Column},
};

/// Tabular input accepted by [`normalize`].
#[derive(Debug, Clone)]
pub enum RawData {
    /// One mapping per row; a missing key is an absent cell.
    Rows(Vec<BTreeMap<String, Value>>),
    /// Positional rows; requires labels.
    Positional(Vec<Vec<Cell>>),
    /// Column name to the full sequence of its values.
    Columns(BTreeMap<String, Vec<Cell>>),
    /// An already-normalized table, re-validated and re-sorted.
    Table(CanonicalTable),
}

impl RawData {
    pub fn row_count(&self) -> usize {
        match self {
            RawData::Rows(rows) => rows.len(),
            RawData::Positional(rows) => rows.len(),
            RawData::Columns(columns) => columns.values().map(Vec::len).max().unwrap_or(0),
            RawData::Table(table) => table.len(),
        }
    }
}

impl From<CanonicalTable> for RawData {
    fn from(table: CanonicalTable) -> Self {
        RawData::Table(table)
    }
}

/// A column addressed either by name or by zero-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnSelector {
    Name(String),
    Index(usize),
}

impl ColumnSelector {
    /// Resolves the selector to a column name.
    pub fn resolve(&self, names: &[String]) -> Result<String> {
        match self {
            ColumnSelector::Name(name) if names.contains(name) => Ok(name.clone()),
            ColumnSelector::Index(idx) if *idx < names.len() => Ok(names[*idx].clone()),
            other => Err(Error::schema(format!(
                "column {other} not found; available columns: [{}]",
                names.join(", ")
            ))),
        }
    }
}

impl FromStr for ColumnSelector {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err("column selector cannot be empty".to_string());
        }
        if trimmed.chars().all(|c| c.is_ascii_digit()) {
            return trimmed
                .parse()
                .map(ColumnSelector::Index)
                .map_err(|err| format!("invalid column index '{trimmed}': {err}"));
        }
        Ok(ColumnSelector::Name(trimmed.to_string()))
    }
}

impl fmt::Display for ColumnSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnSelector::Name(name) => write!(f, "'{name}'"),
            ColumnSelector::Index(idx) => write!(f, "#{idx}"),
        }
    }
}

/// Normalizes `data` into a canonical table keyed by `date_key`.
///
/// `labels` names positional input and, for named input, fixes the column
/// order: keys not listed are dropped and listed keys missing from the
/// input become absent cells. `date_format` selects strptime-style
/// parsing; without it the generic parser is used.
pub fn normalize(
    data: RawData,
    labels: Option<&[String]>,
    date_key: &str,
    date_format: Option<&str>,
) -> Result<CanonicalTable> {
    if let Some(labels) = labels {
        ensure_unique(labels)?;
    }
    let (names, columns) = match data {
        RawData::Table(table) => return normalize_table(table, date_key),
        RawData::Rows(rows) => stage_rows(rows, labels),
        RawData::Positional(rows) => stage_positional(rows, labels)?,
        RawData::Columns(columns) => stage_columns(columns, labels)?,
    };

    let date_position = names.iter().position(|n| n == date_key).ok_or_else(|| {
        Error::schema(format!(
            "date key '{date_key}' must be one of the column labels: [{}]",
            names.join(", ")
        ))
    })?;

    let mut date_cells = Vec::new();
    let mut value_columns = Vec::with_capacity(names.len().saturating_sub(1));
    for (position, (name, values)) in names.into_iter().zip(columns).enumerate() {
        if position == date_position {
            date_cells = values;
        } else {
            value_columns.push(Column { name, values });
        }
    }

    let index = date_cells
        .iter()
        .map(|cell| data::parse_date_value(cell.as_ref(), date_format))
        .collect::<Result<Vec<_>>>()?;

    let mut table = CanonicalTable::from_parts(date_key.to_string(), index, value_columns)?;
    table.sort_by_date();
    debug!(
        "Normalized {} row(s) with columns [{}] indexed by '{}'",
        table.len(),
        table.column_names().join(", "),
        date_key
    );
    Ok(table)
}

fn normalize_table(table: CanonicalTable, date_key: &str) -> Result<CanonicalTable> {
    table.validate()?;
    let (previous_key, index, columns) = table.into_parts();
    if previous_key != date_key {
        debug!("Relabelling date index '{previous_key}' as '{date_key}'");
    }
    let mut table = CanonicalTable::from_parts(date_key.to_string(), index, columns)?;
    table.sort_by_date();
    Ok(table)
}

fn ensure_unique(labels: &[String]) -> Result<()> {
    let mut seen = HashSet::new();
    if let Some(duplicate) = labels.iter().find(|label| !seen.insert(label.as_str())) {
        return Err(Error::schema(format!("duplicate column label '{duplicate}'")));
    }
    Ok(())
}

fn stage_rows(
    rows: Vec<BTreeMap<String, Value>>,
    labels: Option<&[String]>,
) -> (Vec<String>, Vec<Vec<Cell>>) {
    let names = match labels {
        Some(labels) => labels.to_vec(),
        None => rows
            .iter()
            .flat_map(|row| row.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect(),
    };
    let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
    for mut row in rows {
        for (name, column) in names.iter().zip(columns.iter_mut()) {
            column.push(row.remove(name));
        }
    }
    (names, columns)
}

fn stage_positional(
    rows: Vec<Vec<Cell>>,
    labels: Option<&[String]>,
) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let names = labels.map(<[String]>::to_vec).ok_or_else(|| {
        Error::schema("positional rows carry no column names; column labels must be supplied")
    })?;
    let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
    for (row_idx, row) in rows.into_iter().enumerate() {
        if row.len() != names.len() {
            return Err(Error::schema(format!(
                "row {} has {} value(s) but {} label(s) were given",
                row_idx + 1,
                row.len(),
                names.len()
            )));
        }
        for (column, cell) in columns.iter_mut().zip(row) {
            column.push(cell);
        }
    }
    Ok((names, columns))
}

fn stage_columns(
    mut input: BTreeMap<String, Vec<Cell>>,
    labels: Option<&[String]>,
) -> Result<(Vec<String>, Vec<Vec<Cell>>)> {
    let lengths = input.values().map(Vec::len).unique().collect::<Vec<_>>();
    if lengths.len() > 1 {
        let described = input
            .iter()
            .map(|(name, values)| format!("{name}={}", values.len()))
            .join(", ");
        return Err(Error::schema(format!(
            "columns must have equal lengths, found {described}"
        )));
    }
    let row_count = lengths.first().copied().unwrap_or(0);
    let names = match labels {
        Some(labels) => labels.to_vec(),
        None => input.keys().cloned().collect(),
    };
    let columns = names
        .iter()
        .map(|name| {
            input
                .remove(name)
                .unwrap_or_else(|| vec![None; row_count])
        })
        .collect();
    Ok((names, columns))
}
