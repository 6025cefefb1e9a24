pub mod config;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod write;

pub use config::Config;
pub use error::SampleError;
pub use pipeline::{run, RunSummary};
