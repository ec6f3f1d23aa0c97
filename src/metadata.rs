//! Dataset descriptor model and the Metadata Inferencer.
//!
//! A [`Descriptor`] is the YAML (or JSON) document Limn reads next to each
//! datafile. Derived fields (`format`, `url`, `columns`, `timespan`) are
//! overwritten on every [`infer`] run; display fields (`name`,
//! `shortName`, `chart`) are left as the caller set them.

use std::{
    fmt,
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
    str::FromStr,
    sync::OnceLock,
};

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    data,
    error::{Error, Result},
    io_utils,
    table::CanonicalTable,
};

/// Server-side prefix under which Limn serves datafiles.
pub const DATA_ROOT: &str = "/data";
pub const DATAFILE_FORMAT: &str = "csv";
pub const DEFAULT_STEP: &str = "1d";
pub const DEFAULT_CHART_TYPE: &str = "dygraphs";

/// The closed vocabulary of column type tags understood by Limn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Date,
    Int,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Date => "date",
            ColumnType::Int => "int",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" => Ok(ColumnType::Date),
            "int" => Ok(ColumnType::Int),
            other => Err(Error::schema(format!(
                "unknown column type '{other}' (expected 'date' or 'int')"
            ))),
        }
    }
}

/// On-disk encoding of the descriptor document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "lowercase")]
pub enum DescriptorFormat {
    #[default]
    Yaml,
    Json,
}

impl DescriptorFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DescriptorFormat::Yaml => "yaml",
            DescriptorFormat::Json => "json",
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Some(DescriptorFormat::Json),
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Some(DescriptorFormat::Yaml)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChartHint {
    pub chart_type: String,
}

impl Default for ChartHint {
    fn default() -> Self {
        Self {
            chart_type: DEFAULT_CHART_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Columns {
    pub labels: Vec<String>,
    pub types: Vec<ColumnType>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Timespan {
    pub end: Option<String>,
    pub start: Option<String>,
    pub step: String,
}

impl Default for Timespan {
    fn default() -> Self {
        Self {
            end: None,
            start: None,
            step: DEFAULT_STEP.to_string(),
        }
    }
}

// Fields are declared alphabetically so serialized keys come out sorted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub chart: ChartHint,
    pub columns: Columns,
    pub format: String,
    pub id: String,
    pub name: String,
    pub short_name: String,
    pub timespan: Timespan,
    pub url: String,
}

impl Descriptor {
    /// A fresh descriptor carrying only defaults and the given identity.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        Self {
            chart: ChartHint::default(),
            columns: Columns::default(),
            format: DATAFILE_FORMAT.to_string(),
            url: datafile_url(&id),
            short_name: name.clone(),
            name,
            id,
            timespan: Timespan::default(),
        }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render(&self, format: DescriptorFormat) -> Result<String> {
        match format {
            DescriptorFormat::Yaml => self.to_yaml_string(),
            DescriptorFormat::Json => self.to_json_string(),
        }
    }

    pub fn save(&self, path: &Path, format: DescriptorFormat) -> Result<()> {
        let rendered = self.render(format)?;
        io_utils::write_atomic(path, |writer| writer.write_all(rendered.as_bytes()))
    }

    /// Loads a descriptor, choosing the parser from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|err| Error::io(path, err))?;
        let reader = BufReader::new(file);
        match DescriptorFormat::from_path(path).unwrap_or_default() {
            DescriptorFormat::Yaml => Ok(serde_yaml::from_reader(reader)?),
            DescriptorFormat::Json => Ok(serde_json::from_reader(reader)?),
        }
    }
}

/// Settings that steer inference beyond what the table itself carries.
#[derive(Debug, Clone, Copy)]
pub struct InferSettings<'a> {
    pub types: Option<&'a [ColumnType]>,
    pub date_format: &'a str,
}

impl Default for InferSettings<'_> {
    fn default() -> Self {
        Self {
            types: None,
            date_format: data::DEFAULT_DATE_FORMAT,
        }
    }
}

/// Re-derives the data-dependent descriptor fields from `table`.
///
/// `base` supplies the identity and display fields; everything derived is
/// recomputed, so running this twice on an unchanged table yields an
/// identical descriptor.
pub fn infer(
    table: &CanonicalTable,
    base: &Descriptor,
    settings: InferSettings<'_>,
) -> Result<Descriptor> {
    table.validate()?;
    let mut labels = Vec::with_capacity(table.columns().len() + 1);
    labels.push(table.date_key().to_string());
    labels.extend(table.column_names());

    let types = match settings.types {
        Some(types) => {
            if types.len() != labels.len() {
                return Err(Error::schema(format!(
                    "{} column type(s) were given for {} label(s) [{}]",
                    types.len(),
                    labels.len(),
                    labels.join(", ")
                )));
            }
            if types.first() != Some(&ColumnType::Date) {
                return Err(Error::schema(format!(
                    "the type of date column '{}' must be 'date'",
                    table.date_key()
                )));
            }
            types.to_vec()
        }
        None => default_types(labels.len()),
    };

    let (start, end) = match table.date_range() {
        Some((first, last)) => (
            Some(data::format_date(&first, settings.date_format)?),
            Some(data::format_date(&last, settings.date_format)?),
        ),
        None => (None, None),
    };

    let mut descriptor = base.clone();
    descriptor.format = DATAFILE_FORMAT.to_string();
    descriptor.url = datafile_url(&descriptor.id);
    descriptor.columns = Columns { labels, types };
    descriptor.timespan.start = start;
    descriptor.timespan.end = end;
    Ok(descriptor)
}

/// `['date', 'int', 'int', ...]` for a table with `label_count` labels.
pub fn default_types(label_count: usize) -> Vec<ColumnType> {
    let mut types = Vec::with_capacity(label_count);
    if label_count > 0 {
        types.push(ColumnType::Date);
        types.resize(label_count, ColumnType::Int);
    }
    types
}

/// Ids become file stems, so they are restricted to a path-safe alphabet.
pub fn validate_id(kind: &str, id: &str) -> Result<()> {
    static ID_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-][A-Za-z0-9_.-]*$").expect("id pattern is valid")
    });
    if pattern.is_match(id) {
        Ok(())
    } else {
        Err(Error::schema(format!(
            "{kind} id '{id}' may only contain letters, digits, '_', '-' and '.' and must not start with '.'"
        )))
    }
}

pub fn datafile_url(id: &str) -> String {
    format!("{DATA_ROOT}/datafiles/{id}.{DATAFILE_FORMAT}")
}

pub fn datafile_path(root: &Path, id: &str) -> PathBuf {
    root.join("datafiles").join(format!("{id}.{DATAFILE_FORMAT}"))
}

pub fn descriptor_path(root: &Path, id: &str, format: DescriptorFormat) -> PathBuf {
    root.join("datasources")
        .join(format!("{id}.{}", format.extension()))
}
