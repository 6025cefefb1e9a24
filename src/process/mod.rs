//! Load, sample and combine delimited source tables.

pub mod combine;
pub mod load;
pub mod raw_table;
pub mod sample;

pub use combine::{combine_samples, CombineOptions, CombinedTable};
pub use load::{load_table, ReadOptions};
pub use raw_table::RawTable;
pub use sample::{load_and_sample, sample_indices, sample_table, Sample};
