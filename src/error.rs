//! Error taxonomy shared by the normalizer, inferencer and artifact writers.
//!
//! Schema and date failures abort the operation that raised them. Metric
//! resolution and palette exhaustion are not errors; see
//! [`crate::graph::GraphWarning`].

use std::{io, path::PathBuf};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Input shape cannot be reconciled with the required columns.
    #[error("schema error: {0}")]
    Schema(String),
    /// A date value could not be parsed.
    #[error("could not parse date value '{value}'{}", describe_format(.format))]
    DateParse {
        value: String,
        format: Option<String>,
    },
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error on {path:?}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    pub(crate) fn schema(message: impl Into<String>) -> Self {
        Error::Schema(message.into())
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Error::Csv {
            path: path.into(),
            source,
        }
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Error::Schema(_))
    }

    pub fn is_date_parse(&self) -> bool {
        matches!(self, Error::DateParse { .. })
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io { .. })
    }
}

fn describe_format(format: &Option<String>) -> String {
    match format {
        Some(fmt) => format!(" with format '{fmt}'"),
        None => String::new(),
    }
}
