//! Error types for discovery, sampling and persistence

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the sampling pipeline.
///
/// `Read` and `InsufficientRows` are per-file: the pipeline records them and
/// moves on to the next file. Everything else aborts the run.
#[derive(Error, Debug)]
pub enum SampleError {
    /// The file could not be opened, decoded or parsed
    #[error("failed to read {path:?}: {reason}")]
    Read { path: PathBuf, reason: String },

    /// The file has fewer rows than the requested sample size
    #[error("{path:?} has {available} rows, fewer than the requested sample of {requested}")]
    InsufficientRows {
        path: PathBuf,
        available: usize,
        requested: usize,
    },

    /// The output could not be persisted
    #[error("failed to write {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Nothing survived sampling, so there is no table to concatenate
    #[error("no samples to combine: every matched file failed or none matched")]
    NoSamples,

    /// The source directory could not be scanned
    #[error("file discovery error: {0}")]
    Discovery(String),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Arrow kernel failure while sampling or combining
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

impl SampleError {
    pub(crate) fn read(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        SampleError::Read {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SampleError::Write {
            path: path.into(),
            source,
        }
    }

    /// True for failures that only disqualify a single source file.
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            SampleError::Read { .. } | SampleError::InsufficientRows { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SampleError>;
