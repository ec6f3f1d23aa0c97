use std::fmt::{self, Write as _};

use chrono::{
    NaiveDate, NaiveDateTime, NaiveTime,
    format::{self, Item, Parsed, StrftimeItems},
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rendering format applied to the date index unless configured otherwise.
pub const DEFAULT_DATE_FORMAT: &str = "%Y/%m/%d";

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y%m%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%b %d %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

/// A single table cell. Absent cells are modelled as `Option::None`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Integer(i64),
    Float(f64),
    Text(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Coerces a raw text field into the narrowest scalar that holds it.
    pub fn infer(raw: &str) -> Option<Value> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Some(Value::Integer(int));
        }
        if let Ok(float) = trimmed.parse::<f64>()
            && float.is_finite()
        {
            return Some(Value::Float(float));
        }
        Some(Value::Text(raw.to_string()))
    }

    pub fn as_display(&self) -> String {
        match self {
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Text(s) => s.clone(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Text(s) => s.trim().parse().ok(),
            Value::Date(_) | Value::DateTime(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_display())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

/// Rejects strftime patterns chrono cannot render.
pub fn validate_date_format(fmt: &str) -> Result<()> {
    if fmt.is_empty() {
        return Err(Error::schema("date format cannot be empty"));
    }
    if StrftimeItems::new(fmt).any(|item| matches!(item, Item::Error)) {
        return Err(Error::schema(format!("invalid date format '{fmt}'")));
    }
    Ok(())
}

pub fn format_date(value: &NaiveDateTime, fmt: &str) -> Result<String> {
    let mut rendered = String::new();
    write!(rendered, "{}", value.format(fmt))
        .map_err(|_| Error::schema(format!("invalid date format '{fmt}'")))?;
    Ok(rendered)
}

/// Parses an index cell into a timestamp.
///
/// Date-typed cells pass through. Text and integer cells are parsed with
/// `format` when given, or with the generic parser otherwise.
pub fn parse_date_value(value: Option<&Value>, format: Option<&str>) -> Result<NaiveDateTime> {
    let raw = match value {
        Some(Value::Date(d)) => return Ok(d.and_time(NaiveTime::MIN)),
        Some(Value::DateTime(dt)) => return Ok(*dt),
        Some(Value::Text(s)) => s.trim().to_string(),
        Some(Value::Integer(i)) => i.to_string(),
        Some(other @ Value::Float(_)) => return Err(date_error(other.as_display(), format)),
        None => return Err(date_error(String::new(), format)),
    };
    let parsed = match format {
        Some(fmt) => parse_with_format(&raw, fmt),
        None => parse_generic(&raw),
    };
    parsed.ok_or_else(|| date_error(raw, format))
}

/// Best-effort parser used when no explicit format was configured.
pub fn parse_generic(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Strptime-style parsing that tolerates formats without minutes or time.
pub fn parse_with_format(raw: &str, fmt: &str) -> Option<NaiveDateTime> {
    let mut parsed = Parsed::new();
    format::parse(&mut parsed, raw.trim(), StrftimeItems::new(fmt)).ok()?;
    // hour-only formats such as `%Y-%m-%d_%H` leave the minute unset
    let _ = parsed.set_minute(0);
    if let Some(resolved) = resolve_parsed(&parsed) {
        return Some(resolved);
    }
    // as with strptime, a missing month or day means the first
    if parsed.month().is_none() {
        let _ = parsed.set_month(1);
    }
    if parsed.day().is_none() {
        let _ = parsed.set_day(1);
    }
    resolve_parsed(&parsed)
}

fn resolve_parsed(parsed: &Parsed) -> Option<NaiveDateTime> {
    if let Ok(datetime) = parsed.to_naive_datetime_with_offset(0) {
        return Some(datetime);
    }
    parsed
        .to_naive_date()
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

fn date_error(value: String, format: Option<&str>) -> Error {
    Error::DateParse {
        value,
        format: format.map(str::to_string),
    }
}
