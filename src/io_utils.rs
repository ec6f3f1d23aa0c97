//! I/O utilities for CSV reading, writing, encoding, and delimiter resolution.
//!
//! All file I/O in limnify flows through this module. It provides:
//!
//! - **Delimiter resolution**: `.csv` selects comma, anything else defaults
//!   to tab, with manual override support.
//! - **Encoding**: input decoding via `encoding_rs`, defaulting to UTF-8.
//!   Artifacts are always written as UTF-8.
//! - **stdin**: the `-` path convention routes through standard input.
//! - **Atomic replacement**: artifacts are written to a sibling temporary
//!   file and renamed into place, so readers never observe a partial file.

use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::{Path, PathBuf},
};

use csv::QuoteStyle;
use encoding_rs::{Encoding, UTF_8};

use crate::error::{Error, Result};

pub const DEFAULT_CSV_DELIMITER: u8 = b',';
pub const DEFAULT_TSV_DELIMITER: u8 = b'\t';

pub fn is_dash(path: &Path) -> bool {
    path == Path::new("-")
}

pub fn resolve_encoding(label: Option<&str>) -> Result<&'static Encoding> {
    match label {
        Some(value) => Encoding::for_label(value.trim().as_bytes())
            .ok_or_else(|| Error::schema(format!("unknown encoding '{value}'"))),
        None => Ok(UTF_8),
    }
}

pub fn resolve_input_delimiter(path: &Path, provided: Option<u8>) -> u8 {
    provided.unwrap_or_else(|| match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("csv") => DEFAULT_CSV_DELIMITER,
        _ => DEFAULT_TSV_DELIMITER,
    })
}

pub fn open_csv_reader<R>(reader: R, delimiter: u8, has_headers: bool) -> csv::Reader<R>
where
    R: Read,
{
    let mut builder = csv::ReaderBuilder::new();
    builder
        .has_headers(has_headers)
        .delimiter(delimiter)
        .double_quote(true)
        .flexible(false);
    builder.from_reader(reader)
}

pub fn open_csv_reader_from_path(
    path: &Path,
    delimiter: u8,
    has_headers: bool,
) -> Result<csv::Reader<Box<dyn Read>>> {
    let reader: Box<dyn Read> = if is_dash(path) {
        Box::new(io::stdin().lock())
    } else {
        Box::new(BufReader::new(
            File::open(path).map_err(|err| Error::io(path, err))?,
        ))
    };
    Ok(open_csv_reader(reader, delimiter, has_headers))
}

/// Writer used for datafiles: comma separated, quoting only when required.
pub fn open_csv_writer<W>(writer: W) -> csv::Writer<W>
where
    W: Write,
{
    let mut builder = csv::WriterBuilder::new();
    builder
        .delimiter(DEFAULT_CSV_DELIMITER)
        .quote_style(QuoteStyle::Necessary)
        .double_quote(true);
    builder.from_writer(writer)
}

pub fn decode_bytes(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        Err(Error::schema(format!(
            "failed to decode text with encoding {}",
            encoding.name()
        )))
    } else {
        Ok(text.into_owned())
    }
}

pub fn decode_record(record: &csv::ByteRecord, encoding: &'static Encoding) -> Result<Vec<String>> {
    record
        .iter()
        .map(|field| decode_bytes(field, encoding))
        .collect()
}

pub fn reader_headers<R>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<String>>
where
    R: Read,
{
    let headers = reader
        .byte_headers()
        .map_err(|err| Error::csv(path, err))?
        .clone();
    decode_record(&headers, encoding)
}

/// Reads every record of `reader` as decoded text fields.
pub fn read_records<R>(
    reader: &mut csv::Reader<R>,
    path: &Path,
    encoding: &'static Encoding,
) -> Result<Vec<Vec<String>>>
where
    R: Read,
{
    let mut rows = Vec::new();
    for record in reader.byte_records() {
        let record = record.map_err(|err| Error::csv(path, err))?;
        rows.push(decode_record(&record, encoding)?);
    }
    Ok(rows)
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).map_err(|err| Error::io(path, err))
}

/// Writes `path` through a sibling temporary file that is renamed on success.
///
/// Missing parent directories are created. On failure the temporary file
/// is removed and any previous file at `path` is left untouched.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let temp_path = temporary_sibling(path);
    let outcome = File::create(&temp_path)
        .and_then(|file| {
            let mut writer = BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            writer.get_ref().sync_all()
        })
        .and_then(|_| fs::rename(&temp_path, path));
    outcome.map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        Error::io(path, err)
    })
}

fn temporary_sibling(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "artifact".to_string());
    path.with_file_name(format!(".{file_name}.tmp"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn delimiter_defaults_to_tab_unless_csv() {
        assert_eq!(resolve_input_delimiter(Path::new("hits.csv"), None), b',');
        assert_eq!(resolve_input_delimiter(Path::new("hits.tsv"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("-"), None), b'\t');
        assert_eq!(resolve_input_delimiter(Path::new("hits.csv"), Some(b';')), b';');
    }

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp_file() {
        let dir = tempdir().expect("temp dir");
        let target = dir.path().join("nested").join("out.txt");
        write_atomic(&target, |w| w.write_all(b"hello")).expect("write");
        assert_eq!(fs::read_to_string(&target).unwrap(), "hello");
        let leftovers = fs::read_dir(target.parent().unwrap())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn write_atomic_keeps_previous_contents_on_failure() {
        let dir = tempdir().expect("temp dir");
        let target = dir.path().join("out.txt");
        fs::write(&target, "old").unwrap();
        let err = write_atomic(&target, |_| Err(io::Error::other("boom"))).unwrap_err();
        assert!(err.is_io());
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(resolve_encoding(Some("utf-8")).is_ok());
        assert!(resolve_encoding(Some("klingon")).is_err());
    }
}
