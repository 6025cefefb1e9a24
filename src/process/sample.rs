use arrow::{
    array::UInt64Array,
    compute::take_record_batch,
    record_batch::RecordBatch,
};
use rand::{rngs::StdRng, SeedableRng};
use std::path::PathBuf;
use tracing::info;

use crate::discover::SourceFile;
use crate::error::{Result, SampleError};
use crate::process::load::{load_table, ReadOptions};

/// Rows drawn from one source file.
#[derive(Debug, Clone)]
pub struct Sample {
    pub source: String,
    pub path: PathBuf,
    pub batch: RecordBatch,
}

impl Sample {
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }
}

/// Draw `amount` distinct indices from `0..row_count`, in the order the
/// generator seeded with `seed` produces them.
///
/// Returns `None` when `amount > row_count`.
pub fn sample_indices(row_count: usize, amount: usize, seed: u64) -> Option<Vec<usize>> {
    if amount > row_count {
        return None;
    }
    let mut rng = StdRng::seed_from_u64(seed);
    Some(rand::seq::index::sample(&mut rng, row_count, amount).into_vec())
}

/// Take a seeded, without-replacement sample of exactly `amount` rows.
pub fn sample_table(
    path: impl Into<PathBuf>,
    batch: &RecordBatch,
    amount: usize,
    seed: u64,
) -> Result<RecordBatch> {
    let available = batch.num_rows();
    let indices =
        sample_indices(available, amount, seed).ok_or_else(|| SampleError::InsufficientRows {
            path: path.into(),
            available,
            requested: amount,
        })?;
    let indices = UInt64Array::from_iter_values(indices.into_iter().map(|i| i as u64));
    Ok(take_record_batch(batch, &indices)?)
}

/// Load one source file and keep only its sample; the full table is dropped here.
#[tracing::instrument(level = "info", skip_all, fields(file = %file.name))]
pub fn load_and_sample(
    file: &SourceFile,
    opts: &ReadOptions,
    amount: usize,
    seed: u64,
) -> Result<Sample> {
    let full = load_table(&file.path, opts)?;
    let total_rows = full.num_rows();
    let batch = sample_table(&file.path, &full, amount, seed)?;
    drop(full);

    info!(
        total_rows,
        sampled = batch.num_rows(),
        columns = batch.num_columns(),
        "sampled"
    );
    Ok(Sample {
        source: file.name.clone(),
        path: file.path.clone(),
        batch,
    })
}
