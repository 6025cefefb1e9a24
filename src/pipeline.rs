//! The end-to-end run: discover, sample each file, combine, persist.

use std::path::PathBuf;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::discover::{find_source_files, SourceFile};
use crate::error::{Result, SampleError};
use crate::process::{
    combine::{combine_samples, CombineOptions},
    load::ReadOptions,
    sample::{load_and_sample, Sample},
};
use crate::write::{write_table, OutputFormat};

/// A source file that was skipped, and why.
#[derive(Debug)]
pub struct FileFailure {
    pub file: SourceFile,
    pub error: SampleError,
}

#[derive(Debug)]
pub struct RunSummary {
    pub matched: usize,
    /// `(basename, rows)` for every file that contributed.
    pub sampled: Vec<(String, usize)>,
    pub failures: Vec<FileFailure>,
    pub rows_written: usize,
    pub columns_written: usize,
    pub output: PathBuf,
}

/// Sample every file in order, collecting per-file failures instead of stopping.
///
/// Only errors that concern a single file are collected; anything else aborts.
pub fn sample_files(
    files: &[SourceFile],
    opts: &ReadOptions,
    amount: usize,
    seed: u64,
) -> Result<(Vec<Sample>, Vec<FileFailure>)> {
    let mut samples = Vec::with_capacity(files.len());
    let mut failures = Vec::new();
    for file in files {
        info!("processing {}", file.name);
        match load_and_sample(file, opts, amount, seed) {
            Ok(sample) => samples.push(sample),
            Err(e) if e.is_per_file() => {
                warn!(file = %file.name, "skipping: {}", e);
                failures.push(FileFailure {
                    file: file.clone(),
                    error: e,
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok((samples, failures))
}

pub fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let read_opts = config.read_options()?;

    let files = find_source_files(&config.source_root, &config.name_filter, &config.extension)?;
    if files.is_empty() {
        warn!(
            root = %config.source_root.display(),
            filter = %config.name_filter,
            "no source files matched"
        );
    }

    let (samples, mut failures) =
        sample_files(&files, &read_opts, config.sample_size, config.random_seed)?;
    if !failures.is_empty() {
        error!(
            "{} of {} files were skipped",
            failures.len(),
            files.len()
        );
        if config.strict {
            return Err(failures.remove(0).error);
        }
    }

    let combined = combine_samples(
        &samples,
        CombineOptions {
            index_column: config.index_column.as_deref(),
            source_column: config.source_column.as_deref(),
        },
    )?;
    drop(samples);

    let format = OutputFormat::for_path(&config.output_path, config.output_delimiter_byte()?);
    write_table(&combined, &config.output_path, format)?;

    Ok(RunSummary {
        matched: files.len(),
        sampled: combined.sources.clone(),
        failures,
        rows_written: combined.num_rows(),
        columns_written: combined.batch.num_columns(),
        output: config.output_path.clone(),
    })
}
