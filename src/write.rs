use arrow::csv::WriterBuilder;
use parquet::{
    arrow::ArrowWriter,
    basic::{Compression, ZstdLevel},
    file::properties::WriterProperties,
};
use std::{
    fs,
    io::{self, BufWriter, Write},
    path::Path,
};
use tempfile::{Builder, NamedTempFile};
use tracing::info;

use crate::error::{Result, SampleError};
use crate::process::combine::CombinedTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Delimited { delimiter: u8 },
    Parquet,
}

impl OutputFormat {
    /// `.parquet` selects Parquet; every other extension gets delimited text.
    pub fn for_path(path: &Path, delimiter: u8) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("parquet") => OutputFormat::Parquet,
            _ => OutputFormat::Delimited { delimiter },
        }
    }
}

/// Persist `table` at `path`.
///
/// Data goes to a temporary file next to `path` that is renamed into place
/// only after a successful flush, so a failure never leaves a truncated
/// output behind. An empty table is refused.
#[tracing::instrument(level = "info", skip(table, path), fields(path = %path.as_ref().display()))]
pub fn write_table<P: AsRef<Path>>(
    table: &CombinedTable,
    path: P,
    format: OutputFormat,
) -> Result<()> {
    let path = path.as_ref();
    if table.num_rows() == 0 {
        return Err(SampleError::NoSamples);
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).map_err(|e| SampleError::write(path, e))?;

    let mut tmp = temp_file_in(dir).map_err(|e| SampleError::write(path, e))?;
    let written = match format {
        OutputFormat::Delimited { delimiter } => {
            write_delimited(table, tmp.as_file_mut(), delimiter)
        }
        OutputFormat::Parquet => write_parquet(table, tmp.as_file_mut()),
    };
    written
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| SampleError::write(path, e))?;

    tmp.persist(path)
        .map_err(|e| SampleError::write(path, e.error))?;

    info!(
        rows = table.num_rows(),
        columns = table.batch.num_columns(),
        ?format,
        "wrote combined table"
    );
    Ok(())
}

/// The output keeps these permissions after `persist`: 0644 less umask on unix.
fn temp_file_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(fs::Permissions::from_mode(0o644));
    }
    builder.tempfile_in(dir)
}

fn write_delimited<W: Write>(table: &CombinedTable, out: W, delimiter: u8) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .with_header(true)
        .with_delimiter(delimiter)
        .build(BufWriter::new(out));
    writer.write(&table.batch).map_err(io::Error::other)?;
    writer.into_inner().flush()
}

fn write_parquet<W: Write + Send>(table: &CombinedTable, out: W) -> io::Result<()> {
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build();
    let mut writer = ArrowWriter::try_new(out, table.batch.schema(), Some(props))
        .map_err(io::Error::other)?;
    writer.write(&table.batch).map_err(io::Error::other)?;
    writer.close().map_err(io::Error::other)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{
        combine::{combine_samples, CombineOptions},
        load::{load_table, ReadOptions},
        raw_table::RawTable,
        sample::Sample,
    };
    use arrow::array::StringArray;
    use arrow::record_batch::RecordBatch;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn combined() -> CombinedTable {
        let mut a = RawTable::new(vec!["id".to_string(), "nombre".to_string()]);
        a.push_fields(["1", "Peña, José"]);
        a.push_fields(["2", "dice \"hola\""]);
        let mut b = RawTable::new(vec!["id".to_string(), "fex".to_string()]);
        b.push_fields(["3", "12.75"]);
        let samples = vec![
            Sample {
                source: "A.txt".into(),
                path: PathBuf::from("A.txt"),
                batch: a.into_record_batch().unwrap(),
            },
            Sample {
                source: "B.txt".into(),
                path: PathBuf::from("B.txt"),
                batch: b.into_record_batch().unwrap(),
            },
        ];
        combine_samples(&samples, CombineOptions::default()).unwrap()
    }

    fn cells(batch: &RecordBatch) -> Vec<Vec<Option<String>>> {
        batch
            .columns()
            .iter()
            .map(|c| {
                c.as_any()
                    .downcast_ref::<StringArray>()
                    .unwrap()
                    .iter()
                    .map(|v| v.map(str::to_string))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            OutputFormat::for_path(Path::new("out/muestra.PARQUET"), b','),
            OutputFormat::Parquet
        );
        assert_eq!(
            OutputFormat::for_path(Path::new("out/muestra.csv"), b';'),
            OutputFormat::Delimited { delimiter: b';' }
        );
        assert_eq!(
            OutputFormat::for_path(Path::new("muestra"), b','),
            OutputFormat::Delimited { delimiter: b',' }
        );
    }

    #[test]
    fn delimited_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join("muestra.csv");
        let table = combined();
        write_table(&table, &path, OutputFormat::Delimited { delimiter: b',' })?;

        let opts = ReadOptions {
            encoding: encoding_rs::UTF_8,
            delimiter: b',',
        };
        let back = load_table(&path, &opts)?;
        assert_eq!(back.num_rows(), table.num_rows());
        assert_eq!(
            back.schema().fields().iter().map(|f| f.name().clone()).collect::<Vec<_>>(),
            table.column_names()
        );
        assert_eq!(cells(&back), cells(&table.batch));

        let leftovers: Vec<_> = fs::read_dir(path.parent().unwrap())?
            .filter_map(|e| e.ok())
            .collect();
        assert_eq!(leftovers.len(), 1, "temporary file left behind");
        Ok(())
    }

    #[test]
    fn parquet_round_trip() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("muestra.parquet");
        let table = combined();
        write_table(&table, &path, OutputFormat::for_path(&path, b','))?;

        let reader = ParquetRecordBatchReaderBuilder::try_new(fs::File::open(&path)?)?.build()?;
        let batches = reader.collect::<std::result::Result<Vec<_>, _>>()?;
        let back = arrow::compute::concat_batches(&batches[0].schema(), &batches)?;
        assert_eq!(back.num_rows(), 3);
        assert_eq!(cells(&back), cells(&table.batch));
        Ok(())
    }

    #[test]
    fn empty_table_is_not_written() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("muestra.csv");
        let mut table = combined();
        table.batch = table.batch.slice(0, 0);
        let err = write_table(&table, &path, OutputFormat::Delimited { delimiter: b',' })
            .unwrap_err();
        assert!(matches!(err, SampleError::NoSamples));
        assert!(!path.exists());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn output_is_readable_by_group_and_others() -> anyhow::Result<()> {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir()?;
        let path = dir.path().join("muestra.csv");
        write_table(&combined(), &path, OutputFormat::Delimited { delimiter: b',' })?;
        let mode = fs::metadata(&path)?.permissions().mode() & 0o777;
        assert_eq!(mode & 0o644, 0o644, "output mode = {:o}", mode);
        Ok(())
    }

    #[test]
    fn unwritable_destination_is_a_write_error() -> anyhow::Result<()> {
        let dir = tempdir()?;
        let blocker = dir.path().join("not_a_dir");
        fs::write(&blocker, b"x")?;
        let path = blocker.join("muestra.csv");
        let err = write_table(&combined(), &path, OutputFormat::Delimited { delimiter: b',' })
            .unwrap_err();
        assert!(matches!(err, SampleError::Write { .. }), "{err}");
        Ok(())
    }
}
