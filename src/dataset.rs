//! A dataset couples one canonical table with its descriptor and writes
//! them as a datafile/datasource pair.
//!
//! Table mutations go through [`Dataset::table_mut`], which bumps a
//! revision counter. [`Dataset::refresh`] re-runs inference only when the
//! table changed since the last run; [`Dataset::write`] always re-infers.
//! A dataset is not synchronized: callers sharing one across threads must
//! serialize mutation and writing themselves.

use std::{
    io::Write,
    path::{Path, PathBuf},
};

use log::{debug, info};

use crate::{
    data::{self, Value},
    error::{Error, Result},
    graph::{Graph, MetricRef},
    io_utils,
    metadata::{self, ColumnType, Descriptor, DescriptorFormat, InferSettings},
    normalize::{self, RawData},
    table::CanonicalTable,
};

pub const DEFAULT_DATE_KEY: &str = "date";

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetOptions {
    /// Column names for positional input, or column selection for named input.
    pub labels: Option<Vec<String>>,
    /// Explicit type tags, date column first.
    pub types: Option<Vec<ColumnType>>,
    pub date_key: String,
    /// Strptime-style format used to parse the date column.
    pub input_date_format: Option<String>,
    /// Format used to render dates in the datafile and the timespan.
    pub date_format: String,
    pub descriptor_format: DescriptorFormat,
}

impl Default for DatasetOptions {
    fn default() -> Self {
        Self {
            labels: None,
            types: None,
            date_key: DEFAULT_DATE_KEY.to_string(),
            input_date_format: None,
            date_format: data::DEFAULT_DATE_FORMAT.to_string(),
            descriptor_format: DescriptorFormat::default(),
        }
    }
}

impl DatasetOptions {
    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.labels = Some(labels.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_types(mut self, types: Vec<ColumnType>) -> Self {
        self.types = Some(types);
        self
    }

    pub fn with_date_key(mut self, date_key: impl Into<String>) -> Self {
        self.date_key = date_key.into();
        self
    }

    pub fn with_input_date_format(mut self, format: impl Into<String>) -> Self {
        self.input_date_format = Some(format.into());
        self
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    pub fn with_descriptor_format(mut self, format: DescriptorFormat) -> Self {
        self.descriptor_format = format;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.date_key.trim().is_empty() {
            return Err(Error::schema("date key cannot be empty"));
        }
        data::validate_date_format(&self.date_format)?;
        if let Some(format) = &self.input_date_format {
            data::validate_date_format(format)?;
        }
        Ok(())
    }
}

/// Paths produced by [`Dataset::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenDataset {
    pub datafile: PathBuf,
    pub descriptor: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    table: CanonicalTable,
    descriptor: Descriptor,
    options: DatasetOptions,
    revision: u64,
    inferred_revision: u64,
}

impl Dataset {
    /// Normalizes `data` and infers its descriptor.
    ///
    /// Inference runs immediately so a graph can be composed before any
    /// file is written.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        data: RawData,
        options: DatasetOptions,
    ) -> Result<Self> {
        let id = id.into();
        metadata::validate_id("dataset", &id)?;
        options.validate()?;
        let table = normalize::normalize(
            data,
            options.labels.as_deref(),
            &options.date_key,
            options.input_date_format.as_deref(),
        )?;
        let mut dataset = Self {
            table,
            descriptor: Descriptor::new(id, name),
            options,
            revision: 0,
            inferred_revision: 0,
        };
        dataset.infer()?;
        Ok(dataset)
    }

    /// Reloads a dataset previously written under `root`.
    ///
    /// The descriptor is looked up with the configured extension first and
    /// the other supported extension second. Dates in the datafile are
    /// parsed with `options.input_date_format`, falling back to
    /// `options.date_format`.
    pub fn load(root: &Path, id: &str, options: DatasetOptions) -> Result<Self> {
        metadata::validate_id("dataset", id)?;
        let preferred = metadata::descriptor_path(root, id, options.descriptor_format);
        let descriptor_path = if preferred.exists() {
            preferred
        } else {
            let other = match options.descriptor_format {
                DescriptorFormat::Yaml => DescriptorFormat::Json,
                DescriptorFormat::Json => DescriptorFormat::Yaml,
            };
            metadata::descriptor_path(root, id, other)
        };
        let stored = Descriptor::load(&descriptor_path)?;

        let datafile = metadata::datafile_path(root, id);
        let mut reader = io_utils::open_csv_reader_from_path(
            &datafile,
            io_utils::DEFAULT_CSV_DELIMITER,
            true,
        )?;
        let encoding = encoding_rs::UTF_8;
        let headers = io_utils::reader_headers(&mut reader, &datafile, encoding)?;
        let rows = io_utils::read_records(&mut reader, &datafile, encoding)?
            .into_iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(position, raw)| {
                        if position == 0 {
                            (!raw.is_empty()).then(|| Value::Text(raw.clone()))
                        } else {
                            Value::infer(raw)
                        }
                    })
                    .collect()
            })
            .collect::<Vec<Vec<_>>>();

        let date_key = headers
            .first()
            .cloned()
            .ok_or_else(|| Error::schema(format!("datafile {datafile:?} has no header row")))?;
        let input_date_format = options
            .input_date_format
            .clone()
            .unwrap_or_else(|| options.date_format.clone());
        let types = Some(stored.columns.types.clone())
            .filter(|types| types.len() == headers.len() && !types.is_empty());
        let options = DatasetOptions {
            labels: Some(headers),
            types,
            date_key,
            input_date_format: Some(input_date_format),
            ..options
        };

        let mut dataset = Self::new(id, stored.name.clone(), RawData::Positional(rows), options)?;
        dataset.descriptor.short_name = stored.short_name;
        dataset.descriptor.chart = stored.chart;
        dataset.descriptor.timespan.step = stored.timespan.step;
        dataset.infer()?;
        Ok(dataset)
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    pub fn table(&self) -> &CanonicalTable {
        &self.table
    }

    /// Mutable table access; the descriptor is re-derived on the next
    /// [`refresh`](Self::refresh), [`infer`](Self::infer) or write.
    pub fn table_mut(&mut self) -> &mut CanonicalTable {
        self.revision += 1;
        &mut self.table
    }

    /// The descriptor as of the last inference run.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Mutable descriptor access for display fields. Derived fields are
    /// overwritten by the next inference run.
    pub fn descriptor_mut(&mut self) -> &mut Descriptor {
        &mut self.descriptor
    }

    /// Replaces the explicit type list; validated on the next inference.
    pub fn set_types(&mut self, types: Option<Vec<ColumnType>>) {
        self.options.types = types;
        self.revision += 1;
    }

    pub fn is_stale(&self) -> bool {
        self.revision != self.inferred_revision
    }

    /// Sorts the table and re-derives the descriptor from it.
    pub fn infer(&mut self) -> Result<&Descriptor> {
        metadata::validate_id("dataset", &self.descriptor.id)?;
        self.table.sort_by_date();
        let settings = InferSettings {
            types: self.options.types.as_deref(),
            date_format: &self.options.date_format,
        };
        self.descriptor = metadata::infer(&self.table, &self.descriptor, settings)?;
        self.inferred_revision = self.revision;
        debug!(
            "Inferred datasource '{}': labels [{}], timespan {:?}..{:?}",
            self.descriptor.id,
            self.descriptor.columns.labels.join(", "),
            self.descriptor.timespan.start,
            self.descriptor.timespan.end
        );
        Ok(&self.descriptor)
    }

    /// Re-infers only when the table changed since the last inference.
    pub fn refresh(&mut self) -> Result<&Descriptor> {
        if self.is_stale() {
            self.infer()
        } else {
            Ok(&self.descriptor)
        }
    }

    /// Current column labels, date column first, read from the live table.
    pub fn labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.table.columns().len() + 1);
        labels.push(self.table.date_key().to_string());
        labels.extend(self.table.column_names());
        labels
    }

    /// Type tag for the label at `position`, honouring explicit types.
    pub fn column_type(&self, position: usize) -> ColumnType {
        let explicit = self
            .options
            .types
            .as_ref()
            .filter(|types| types.len() == self.table.columns().len() + 1)
            .and_then(|types| types.get(position).copied());
        explicit.unwrap_or(if position == 0 {
            ColumnType::Date
        } else {
            ColumnType::Int
        })
    }

    /// Writes the datafile, then the descriptor, under `root`.
    ///
    /// The descriptor is only written once the datafile is in place.
    pub fn write(&mut self, root: &Path) -> Result<WrittenDataset> {
        self.infer()?;
        let datafile = metadata::datafile_path(root, self.id());
        let descriptor_path =
            metadata::descriptor_path(root, self.id(), self.options.descriptor_format);

        io_utils::write_atomic(&datafile, |writer| self.write_datafile(writer))?;
        info!(
            "Wrote {} row(s) across {} column(s) to {:?}",
            self.table.len(),
            self.table.columns().len(),
            datafile
        );

        self.descriptor
            .save(&descriptor_path, self.options.descriptor_format)?;
        info!("Wrote datasource '{}' to {:?}", self.id(), descriptor_path);
        Ok(WrittenDataset {
            datafile,
            descriptor: descriptor_path,
        })
    }

    /// Serializes the table as CSV: one header row, date column first.
    pub fn write_datafile(&self, writer: &mut dyn Write) -> std::io::Result<()> {
        let mut csv_writer = io_utils::open_csv_writer(writer);
        csv_writer.write_record(self.labels())?;
        for position in 0..self.table.len() {
            let Some((date, cells)) = self.table.row(position) else {
                break;
            };
            let mut record = Vec::with_capacity(cells.len() + 1);
            record.push(
                data::format_date(&date, &self.options.date_format)
                    .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidInput, err))?,
            );
            record.extend(
                cells
                    .into_iter()
                    .map(|cell| cell.map(Value::as_display).unwrap_or_default()),
            );
            csv_writer.write_record(&record)?;
        }
        csv_writer.flush()
    }

    /// Renders the datafile into memory.
    pub fn datafile_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_datafile(&mut buffer)
            .map_err(|err| Error::io(metadata::datafile_path(Path::new("."), self.id()), err))?;
        String::from_utf8(buffer).map_err(|err| Error::schema(err.to_string()))
    }

    /// Builds a graph over this dataset's columns, or over `columns` only.
    /// The graph takes the dataset's id and name.
    pub fn graph(&mut self, columns: Option<&[&str]>) -> Result<Graph> {
        self.refresh()?;
        let references = columns.map(|columns| {
            columns
                .iter()
                .map(|column| MetricRef::label(self.id(), *column))
                .collect::<Vec<_>>()
        });
        Graph::new(
            self.id().to_string(),
            self.name().to_string(),
            &[&*self],
            references.as_deref(),
        )
    }
}
