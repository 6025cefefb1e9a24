use encoding_rs::Encoding;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Result, SampleError};
use crate::process::load::ReadOptions;

pub const DEFAULT_SAMPLE_SIZE: usize = 8000;
pub const DEFAULT_SEED: u64 = 42;
pub const DEFAULT_NAME_FILTER: &str = "Personas";
pub const DEFAULT_EXTENSION: &str = "txt";
pub const DEFAULT_ENCODING: &str = "latin1";

/// Everything a sampling run needs. Loaded from YAML, then overridden by CLI flags.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directory scanned (non-recursively) for source files.
    pub source_root: PathBuf,
    /// Destination file. A `.parquet` extension selects Parquet output.
    pub output_path: PathBuf,
    /// Rows drawn from every file.
    pub sample_size: usize,
    pub random_seed: u64,
    /// Substring a basename must contain to be selected.
    pub name_filter: String,
    /// File extension, without the dot.
    pub extension: String,
    /// WHATWG label of the source encoding, e.g. `latin1`, `utf-8`.
    pub encoding: String,
    pub delimiter: char,
    pub output_delimiter: char,
    /// When set, the reset row index is written as a leading column with this name.
    pub index_column: Option<String>,
    /// When set, each row records its source basename in a column with this name.
    pub source_column: Option<String>,
    /// Treat any per-file failure as fatal instead of skipping the file.
    pub strict: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            source_root: PathBuf::new(),
            output_path: PathBuf::new(),
            sample_size: DEFAULT_SAMPLE_SIZE,
            random_seed: DEFAULT_SEED,
            name_filter: DEFAULT_NAME_FILTER.to_string(),
            extension: DEFAULT_EXTENSION.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
            delimiter: ',',
            output_delimiter: ',',
            index_column: None,
            source_column: None,
            strict: false,
        }
    }
}

impl Config {
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .map_err(|e| SampleError::Config(format!("reading {:?}: {}", path, e)))?;
        Self::from_yaml_str(&text)
            .map_err(|e| SampleError::Config(format!("parsing {:?}: {}", path, e)))
    }

    pub fn from_yaml_str(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    /// Check the fields that have no usable default.
    pub fn validate(&self) -> Result<()> {
        if self.source_root.as_os_str().is_empty() {
            return Err(SampleError::Config("source_root is required".into()));
        }
        if self.output_path.as_os_str().is_empty() {
            return Err(SampleError::Config("output_path is required".into()));
        }
        if self.sample_size == 0 {
            return Err(SampleError::Config("sample_size must be at least 1".into()));
        }
        if self.extension.is_empty() {
            return Err(SampleError::Config("extension must not be empty".into()));
        }
        if let (Some(idx), Some(src)) = (&self.index_column, &self.source_column) {
            if idx == src {
                return Err(SampleError::Config(format!(
                    "index_column and source_column are both {:?}",
                    idx
                )));
            }
        }
        self.read_options()?;
        self.output_delimiter_byte()?;
        Ok(())
    }

    pub fn resolve_encoding(&self) -> Result<&'static Encoding> {
        Encoding::for_label(self.encoding.trim().as_bytes())
            .ok_or_else(|| SampleError::Config(format!("unknown encoding {:?}", self.encoding)))
    }

    pub fn read_options(&self) -> Result<ReadOptions> {
        Ok(ReadOptions {
            encoding: self.resolve_encoding()?,
            delimiter: delimiter_byte(self.delimiter, "delimiter")?,
        })
    }

    pub fn output_delimiter_byte(&self) -> Result<u8> {
        delimiter_byte(self.output_delimiter, "output_delimiter")
    }
}

fn delimiter_byte(c: char, field: &str) -> Result<u8> {
    if c.is_ascii() && c != '"' && c != '\n' && c != '\r' {
        Ok(c as u8)
    } else {
        Err(SampleError::Config(format!(
            "{} must be a single ASCII character other than quote or newline, got {:?}",
            field, c
        )))
    }
}
