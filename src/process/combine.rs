use arrow::{
    array::{new_null_array, ArrayRef, StringArray, UInt64Array},
    compute::concat_batches,
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
use std::{collections::HashSet, sync::Arc};
use tracing::{debug, info};

use crate::error::{Result, SampleError};
use crate::process::sample::Sample;

/// Extra columns added while combining.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombineOptions<'a> {
    /// Leading UInt64 column holding the reset row index `0..total`.
    pub index_column: Option<&'a str>,
    /// Trailing Utf8 column holding each row's source basename.
    pub source_column: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct CombinedTable {
    pub batch: RecordBatch,
    /// Contributing sources and how many rows each supplied, in row order.
    pub sources: Vec<(String, usize)>,
}

impl CombinedTable {
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.batch
            .schema()
            .fields()
            .iter()
            .map(|f| f.name().clone())
            .collect()
    }
}

/// Ordered union of column names, first-seen wins.
pub fn union_columns<'a>(samples: impl IntoIterator<Item = &'a Sample>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();
    for sample in samples {
        for field in sample.batch.schema().fields() {
            if seen.insert(field.name().clone()) {
                names.push(field.name().clone());
            }
        }
    }
    names
}

/// Stack `samples` row-wise in the given order.
///
/// Columns are the union across all samples; a sample lacking a column
/// contributes nulls for it. Values are carried over untouched.
#[tracing::instrument(level = "info", skip_all, fields(samples = samples.len()))]
pub fn combine_samples(samples: &[Sample], opts: CombineOptions<'_>) -> Result<CombinedTable> {
    if samples.is_empty() {
        return Err(SampleError::NoSamples);
    }

    let columns = union_columns(samples);
    for extra in [opts.index_column, opts.source_column].into_iter().flatten() {
        if columns.iter().any(|c| c == extra) {
            return Err(SampleError::Config(format!(
                "extra column {:?} clashes with a data column",
                extra
            )));
        }
    }

    let mut fields: Vec<Field> = columns
        .iter()
        .map(|name| Field::new(name, DataType::Utf8, true))
        .collect();
    if let Some(name) = opts.source_column {
        fields.push(Field::new(name, DataType::Utf8, false));
    }
    let schema: SchemaRef = Arc::new(Schema::new(fields));

    let mut aligned = Vec::with_capacity(samples.len());
    let mut sources = Vec::with_capacity(samples.len());
    for sample in samples {
        let rows = sample.num_rows();
        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.fields().len());
        let mut absent = Vec::new();
        for name in &columns {
            match sample.batch.column_by_name(name) {
                Some(col) => arrays.push(col.clone()),
                None => {
                    absent.push(name.as_str());
                    arrays.push(new_null_array(&DataType::Utf8, rows));
                }
            }
        }
        if !absent.is_empty() {
            debug!(file = %sample.source, ?absent, "filling absent columns with nulls");
        }
        if opts.source_column.is_some() {
            arrays.push(Arc::new(StringArray::from(vec![sample.source.as_str(); rows])));
        }
        aligned.push(RecordBatch::try_new(schema.clone(), arrays)?);
        sources.push((sample.source.clone(), rows));
    }

    let mut batch = concat_batches(&schema, &aligned)?;
    drop(aligned);

    if let Some(name) = opts.index_column {
        batch = prepend_index(batch, name)?;
    }

    info!(
        rows = batch.num_rows(),
        columns = batch.num_columns(),
        "combined samples"
    );
    Ok(CombinedTable { batch, sources })
}

fn prepend_index(batch: RecordBatch, name: &str) -> Result<RecordBatch> {
    let index: ArrayRef = Arc::new(UInt64Array::from_iter_values(
        0..batch.num_rows() as u64,
    ));
    let mut fields = vec![Arc::new(Field::new(name, DataType::UInt64, false))];
    fields.extend(batch.schema().fields().iter().cloned());
    let mut columns = vec![index];
    columns.extend(batch.columns().iter().cloned());
    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}
