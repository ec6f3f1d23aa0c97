//! Long-to-wide reshaping of `(date, metric, value)` rows with sum
//! aggregation.

use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use chrono::NaiveDateTime;

use crate::{
    data::{self, Value},
    error::{Error, Result},
    normalize::{ColumnSelector, RawData},
    table::Cell,
};

/// Which input columns carry the date, the metric name and the value.
/// `date_format` is the strptime-style format of the date column; without
/// one the generic date parser is used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotSpec {
    pub date: ColumnSelector,
    pub metric: ColumnSelector,
    pub value: ColumnSelector,
    pub date_format: Option<String>,
}

impl Default for PivotSpec {
    fn default() -> Self {
        Self {
            date: ColumnSelector::Index(0),
            metric: ColumnSelector::Index(1),
            value: ColumnSelector::Index(2),
            date_format: None,
        }
    }
}

/// Wide-format output: one column per distinct metric name, sorted by name.
#[derive(Debug, Clone)]
pub struct Pivoted {
    pub date_key: String,
    pub metrics: Vec<String>,
    pub data: RawData,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Sum {
    Integer(i64),
    Float(f64),
}

impl Sum {
    fn parse(raw: &str) -> Option<Sum> {
        raw.parse::<i64>()
            .map(Sum::Integer)
            .ok()
            .or_else(|| raw.parse::<f64>().ok().filter(|v| v.is_finite()).map(Sum::Float))
    }

    fn add(self, other: Sum) -> Sum {
        match (self, other) {
            (Sum::Integer(a), Sum::Integer(b)) => a
                .checked_add(b)
                .map(Sum::Integer)
                .unwrap_or(Sum::Float(a as f64 + b as f64)),
            (a, b) => Sum::Float(a.as_f64() + b.as_f64()),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Sum::Integer(v) => v as f64,
            Sum::Float(v) => v,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Sum::Integer(v) => Value::Integer(v),
            Sum::Float(v) => Value::Float(v),
        }
    }
}

/// Pivots textual rows under `headers`.
///
/// Dates are parsed and grouped by the parsed instant in first-seen order,
/// so differently written spellings of one date share a row. Blank values
/// are skipped; any other value that is not a number fails the pivot.
pub fn pivot(headers: &[String], rows: &[Vec<String>], spec: &PivotSpec) -> Result<Pivoted> {
    let date_key = spec.date.resolve(headers)?;
    let metric_key = spec.metric.resolve(headers)?;
    let value_key = spec.value.resolve(headers)?;
    let position = |key: &str| headers.iter().position(|h| h == key).unwrap_or_default();
    let (date_idx, metric_idx, value_idx) = (
        position(&date_key),
        position(&metric_key),
        position(&value_key),
    );
    if date_idx == metric_idx || date_idx == value_idx || metric_idx == value_idx {
        return Err(Error::schema(format!(
            "pivot needs three distinct columns, got date '{date_key}', metric '{metric_key}', value '{value_key}'"
        )));
    }

    let mut dates: Vec<NaiveDateTime> = Vec::new();
    let mut date_slots: HashMap<NaiveDateTime, usize> = HashMap::new();
    let mut sums: BTreeMap<String, HashMap<usize, Sum>> = BTreeMap::new();

    for (row_idx, row) in rows.iter().enumerate() {
        let field = |idx: usize| {
            row.get(idx).map(|s| s.trim()).ok_or_else(|| {
                Error::schema(format!(
                    "row {} has {} field(s), expected {}",
                    row_idx + 1,
                    row.len(),
                    headers.len()
                ))
            })
        };
        let (date, metric, raw) = (field(date_idx)?, field(metric_idx)?, field(value_idx)?);
        if metric == date_key {
            return Err(Error::schema(format!(
                "metric name '{metric}' collides with the date column"
            )));
        }
        let instant = data::parse_date_value(
            Some(&Value::Text(date.to_string())),
            spec.date_format.as_deref(),
        )?;
        let slot = *date_slots.entry(instant).or_insert_with(|| {
            dates.push(instant);
            dates.len() - 1
        });
        let cells = sums.entry(metric.to_string()).or_default();
        if raw.is_empty() {
            warn!(
                "Skipping blank '{value_key}' for metric '{metric}' on '{date}' (row {})",
                row_idx + 1
            );
            continue;
        }
        let value = Sum::parse(raw).ok_or_else(|| {
            Error::schema(format!(
                "cannot sum non-numeric value '{raw}' in column '{value_key}' (row {})",
                row_idx + 1
            ))
        })?;
        cells
            .entry(slot)
            .and_modify(|sum| *sum = sum.add(value))
            .or_insert(value);
    }

    let metrics = sums.keys().cloned().collect::<Vec<_>>();
    let mut columns: BTreeMap<String, Vec<Cell>> = BTreeMap::new();
    columns.insert(
        date_key.clone(),
        dates.iter().map(|d| Some(Value::DateTime(*d))).collect(),
    );
    for (metric, cells) in sums {
        let values = (0..dates.len())
            .map(|slot| cells.get(&slot).map(|sum| sum.into_value()))
            .collect();
        columns.insert(metric, values);
    }
    debug!(
        "Pivoted {} row(s) into {} date(s) x {} metric(s)",
        rows.len(),
        dates.len(),
        metrics.len()
    );
    Ok(Pivoted {
        date_key,
        metrics,
        data: RawData::Columns(columns),
    })
}
