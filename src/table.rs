//! Canonical date-indexed table plus a plain-text preview renderer.
//!
//! The date column is never stored as a regular column: it lives only as
//! the index. Every column holds exactly one cell (or `None`) per index
//! position.

use std::borrow::Cow;
use std::fmt::Write as _;

use chrono::NaiveDateTime;

use crate::{
    data::{self, Value},
    error::{Error, Result},
};

pub type Cell = Option<Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalTable {
    date_key: String,
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl CanonicalTable {
    /// Creates an empty table with the given (unique) column names.
    pub fn new(date_key: impl Into<String>, column_names: &[String]) -> Result<Self> {
        let mut table = Self {
            date_key: date_key.into(),
            index: Vec::new(),
            columns: Vec::with_capacity(column_names.len()),
        };
        for name in column_names {
            table.add_column(name.clone(), Vec::new())?;
        }
        Ok(table)
    }

    pub(crate) fn from_parts(
        date_key: String,
        index: Vec<NaiveDateTime>,
        columns: Vec<Column>,
    ) -> Result<Self> {
        let table = Self {
            date_key,
            index,
            columns,
        };
        table.validate()?;
        Ok(table)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<NaiveDateTime>, Vec<Column>) {
        (self.date_key, self.index, self.columns)
    }

    pub fn date_key(&self) -> &str {
        &self.date_key
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&Value> {
        self.column(column)
            .and_then(|c| c.values.get(row))
            .and_then(|cell| cell.as_ref())
    }

    /// First and last index values, if any rows exist.
    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        match (self.index.first(), self.index.last()) {
            (Some(start), Some(end)) => Some((*start, *end)),
            _ => None,
        }
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<Cell>) -> Result<()> {
        let name = name.into();
        if name == self.date_key {
            return Err(Error::schema(format!(
                "column '{name}' collides with the date index"
            )));
        }
        if self.column(&name).is_some() {
            return Err(Error::schema(format!("duplicate column '{name}'")));
        }
        if values.len() != self.index.len() {
            return Err(Error::schema(format!(
                "column '{name}' has {} value(s) but the table has {} row(s)",
                values.len(),
                self.index.len()
            )));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let position = self.column_position(name)?;
        Some(self.columns.remove(position))
    }

    /// Appends one row; `cells` follows the current column order.
    pub fn push_row(&mut self, date: NaiveDateTime, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.columns.len() {
            return Err(Error::schema(format!(
                "row has {} cell(s) but the table has {} column(s)",
                cells.len(),
                self.columns.len()
            )));
        }
        self.index.push(date);
        for (column, cell) in self.columns.iter_mut().zip(cells) {
            column.values.push(cell);
        }
        Ok(())
    }

    pub fn row(&self, position: usize) -> Option<(NaiveDateTime, Vec<Option<&Value>>)> {
        let date = *self.index.get(position)?;
        let cells = self
            .columns
            .iter()
            .map(|c| c.values.get(position).and_then(|v| v.as_ref()))
            .collect();
        Some((date, cells))
    }

    pub fn is_sorted(&self) -> bool {
        self.index.windows(2).all(|pair| pair[0] <= pair[1])
    }

    /// Stable ascending sort by date; ties keep their insertion order.
    pub fn sort_by_date(&mut self) {
        if self.is_sorted() {
            return;
        }
        let mut order = (0..self.index.len()).collect::<Vec<_>>();
        order.sort_by_key(|&position| self.index[position]);
        self.index = order.iter().map(|&position| self.index[position]).collect();
        for column in &mut self.columns {
            let mut taken = std::mem::take(&mut column.values)
                .into_iter()
                .map(Some)
                .collect::<Vec<_>>();
            column.values = order
                .iter()
                .map(|&position| taken[position].take().flatten())
                .collect();
        }
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if column.name == self.date_key {
                return Err(Error::schema(format!(
                    "column '{}' collides with the date index",
                    column.name
                )));
            }
            if !seen.insert(column.name.as_str()) {
                return Err(Error::schema(format!("duplicate column '{}'", column.name)));
            }
            if column.values.len() != self.index.len() {
                return Err(Error::schema(format!(
                    "column '{}' has {} value(s) but the index has {}",
                    column.name,
                    column.values.len(),
                    self.index.len()
                )));
            }
        }
        Ok(())
    }

    /// Renders at most `limit` rows as an aligned text table.
    pub fn preview(&self, date_format: &str, limit: usize) -> Result<String> {
        let mut headers = Vec::with_capacity(self.columns.len() + 1);
        headers.push(self.date_key.clone());
        headers.extend(self.column_names());
        let mut rows = Vec::new();
        for position in 0..self.len().min(limit) {
            let mut row = Vec::with_capacity(headers.len());
            row.push(data::format_date(&self.index[position], date_format)?);
            for column in &self.columns {
                row.push(
                    column.values[position]
                        .as_ref()
                        .map(Value::as_display)
                        .unwrap_or_default(),
                );
            }
            rows.push(row);
        }
        Ok(render_table(&headers, &rows))
    }
}

pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let column_count = headers.len();
    let mut widths = headers
        .iter()
        .map(|h| h.chars().count())
        .collect::<Vec<_>>();

    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths
        .iter()
        .map(|w| "-".repeat((*w).max(1)))
        .collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(sanitized.chars().count());
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    while line.ends_with(' ') {
        line.pop();
    }
    line
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
