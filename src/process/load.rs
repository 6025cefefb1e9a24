use arrow::record_batch::RecordBatch;
use csv::ReaderBuilder;
use encoding_rs::Encoding;
use std::{borrow::Cow, fs, path::Path};
use tracing::{debug, warn};

use crate::error::{Result, SampleError};
use crate::process::raw_table::RawTable;

/// How source files are decoded and split.
#[derive(Debug, Clone, Copy)]
pub struct ReadOptions {
    pub encoding: &'static Encoding,
    pub delimiter: u8,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::WINDOWS_1252,
            delimiter: b',',
        }
    }
}

/// Read `path` fully and parse it into a table of nullable Utf8 columns.
///
/// The first record is the header. Parsing is permissive: short rows are
/// padded with missing cells and long rows are truncated to the header width.
/// Bytes that are invalid in the configured encoding fail the whole file.
#[tracing::instrument(level = "debug", skip(path, opts), fields(path = %path.as_ref().display()))]
pub fn load_table<P: AsRef<Path>>(path: P, opts: &ReadOptions) -> Result<RecordBatch> {
    let path = path.as_ref();
    // raw bytes and decoded text are released before the Arrow columns are built
    let raw = {
        let bytes = fs::read(path).map_err(|e| SampleError::read(path, e))?;
        let text = decode(&bytes, opts.encoding).ok_or_else(|| {
            SampleError::read(
                path,
                format!("content is not valid {}", opts.encoding.name()),
            )
        })?;
        parse_delimited(&text, opts.delimiter).map_err(|e| SampleError::read(path, e))?
    };
    if raw.overflow_rows > 0 {
        warn!(
            file = %path.display(),
            rows = raw.overflow_rows,
            width = raw.width(),
            "rows wider than the header were truncated"
        );
    }
    debug!(rows = raw.rows.len(), columns = raw.width(), "parsed");

    raw.into_record_batch()
        .map_err(|e| SampleError::read(path, e))
}

fn decode<'a>(bytes: &'a [u8], encoding: &'static Encoding) -> Option<Cow<'a, str>> {
    let bytes = if encoding == encoding_rs::UTF_8 {
        bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes)
    } else {
        bytes
    };
    encoding.decode_without_bom_handling_and_without_replacement(bytes)
}

fn parse_delimited(text: &str, delimiter: u8) -> std::result::Result<RawTable, String> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let headers = rdr
        .headers()
        .map_err(|e| format!("bad header row: {}", e))?
        .clone();
    if headers.is_empty() {
        return Err("missing header row".to_string());
    }

    let mut table = RawTable::new(headers.iter().map(str::to_string));
    for (idx, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| format!("CSV parse error at record {}: {}", idx, e))?;
        table.push_fields(record.iter());
    }
    Ok(table)
}
