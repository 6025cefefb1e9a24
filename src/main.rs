use anyhow::{Context, Result};
use clap::Parser;
use personas_sampler::{pipeline, Config};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

/// Draw a fixed-size seeded sample from every matching source file and
/// write the combined rows to one file.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// YAML file with any of the options below; flags take precedence.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory scanned for source files.
    #[arg(long)]
    source_root: Option<PathBuf>,

    /// Destination file (`.parquet` for Parquet, anything else for delimited text).
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Rows drawn from each file [default: 8000].
    #[arg(long)]
    sample_size: Option<usize>,

    /// Random seed [default: 42].
    #[arg(long)]
    seed: Option<u64>,

    /// Substring a file name must contain [default: Personas].
    #[arg(long)]
    name_filter: Option<String>,

    /// Source file extension [default: txt].
    #[arg(long)]
    extension: Option<String>,

    /// Source encoding label [default: latin1].
    #[arg(long)]
    encoding: Option<String>,

    /// Source field delimiter [default: ,].
    #[arg(long)]
    delimiter: Option<char>,

    /// Output field delimiter [default: ,].
    #[arg(long)]
    output_delimiter: Option<char>,

    /// Write the reset row index as a leading column with this name.
    #[arg(long)]
    index_column: Option<String>,

    /// Record each row's source file name in a column with this name.
    #[arg(long)]
    source_column: Option<String>,

    /// Fail the run if any file cannot be sampled.
    #[arg(long)]
    strict: bool,
}

impl Args {
    fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_yaml_file(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.source_root {
            cfg.source_root = v;
        }
        if let Some(v) = self.output {
            cfg.output_path = v;
        }
        if let Some(v) = self.sample_size {
            cfg.sample_size = v;
        }
        if let Some(v) = self.seed {
            cfg.random_seed = v;
        }
        if let Some(v) = self.name_filter {
            cfg.name_filter = v;
        }
        if let Some(v) = self.extension {
            cfg.extension = v;
        }
        if let Some(v) = self.encoding {
            cfg.encoding = v;
        }
        if let Some(v) = self.delimiter {
            cfg.delimiter = v;
        }
        if let Some(v) = self.output_delimiter {
            cfg.output_delimiter = v;
        }
        if self.index_column.is_some() {
            cfg.index_column = self.index_column;
        }
        if self.source_column.is_some() {
            cfg.source_column = self.source_column;
        }
        cfg.strict |= self.strict;
        Ok(cfg)
    }
}

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    // ─── 2) resolve configuration ────────────────────────────────────
    let config = Args::parse().into_config()?;
    info!(
        root = %config.source_root.display(),
        output = %config.output_path.display(),
        sample_size = config.sample_size,
        seed = config.random_seed,
        "startup"
    );

    // ─── 3) sample, combine, write ───────────────────────────────────
    let summary = pipeline::run(&config)
        .with_context(|| format!("sampling {}", config.source_root.display()))?;

    for f in &summary.failures {
        warn!(file = %f.file.name, "not included: {}", f.error);
    }
    info!(
        matched = summary.matched,
        sampled = summary.sampled.len(),
        skipped = summary.failures.len(),
        rows = summary.rows_written,
        columns = summary.columns_written,
        "wrote {}",
        summary.output.display()
    );
    Ok(())
}
