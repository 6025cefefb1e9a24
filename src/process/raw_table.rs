use arrow::{
    array::{ArrayRef, StringBuilder},
    datatypes::{DataType, Field, Schema},
    error::ArrowError,
    record_batch::RecordBatch,
};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

#[derive(Debug, Default)]
pub struct RawTable {
    /// Column names from the header row, made unique and non-blank.
    pub headers: Vec<String>,
    /// Each data row, exactly `headers.len()` wide. `None` marks a missing cell.
    pub rows: Vec<Vec<Option<String>>>,
    /// Rows that carried more fields than the header; the excess was dropped.
    pub overflow_rows: usize,
}

impl RawTable {
    pub fn new(raw_headers: impl IntoIterator<Item = String>) -> Self {
        Self {
            headers: normalize_headers(raw_headers),
            rows: Vec::new(),
            overflow_rows: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.headers.len()
    }

    /// Push one record, padding short rows with missing cells and truncating long ones.
    /// Empty fields are stored as missing.
    pub fn push_fields<'a>(&mut self, fields: impl IntoIterator<Item = &'a str>) {
        let width = self.width();
        let mut row = Vec::with_capacity(width);
        let mut extra = false;
        for (i, field) in fields.into_iter().enumerate() {
            if i >= width {
                extra = true;
                break;
            }
            row.push(if field.is_empty() {
                None
            } else {
                Some(field.to_string())
            });
        }
        row.resize(width, None);
        if extra {
            self.overflow_rows += 1;
        }
        self.rows.push(row);
    }

    /// Convert to an Arrow batch with one nullable Utf8 column per header.
    pub fn into_record_batch(self) -> Result<RecordBatch, ArrowError> {
        let n_rows = self.rows.len();
        let mut builders: Vec<StringBuilder> = (0..self.width())
            .map(|_| StringBuilder::with_capacity(n_rows, n_rows * 8))
            .collect();
        for row in self.rows {
            for (builder, cell) in builders.iter_mut().zip(row) {
                builder.append_option(cell);
            }
        }

        let fields: Vec<Field> = self
            .headers
            .iter()
            .map(|h| Field::new(h, DataType::Utf8, true))
            .collect();
        let columns: Vec<ArrayRef> = builders
            .into_iter()
            .map(|mut b| Arc::new(b.finish()) as ArrayRef)
            .collect();

        RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
    }
}

/// Blank names become `column_<i>`; repeats of a name get `_<n>` appended.
fn normalize_headers(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let raw: Vec<String> = raw
        .into_iter()
        .enumerate()
        .map(|(i, h)| {
            if h.trim().is_empty() {
                format!("column_{}", i)
            } else {
                h
            }
        })
        .collect();

    let mut seen: HashSet<String> = raw.iter().cloned().collect();
    let mut out = Vec::with_capacity(raw.len());
    let mut counts: HashMap<String, usize> = HashMap::new();
    for h in raw {
        let n = counts.entry(h.clone()).or_insert(0);
        if *n == 0 {
            *n = 1;
            out.push(h);
            continue;
        }
        let mut candidate = format!("{}_{}", h, n);
        while seen.contains(&candidate) {
            *n += 1;
            candidate = format!("{}_{}", h, n);
        }
        *n += 1;
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, StringArray};

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn headers_are_made_unique() {
        let t = RawTable::new(strings(&["P6020", "", "P6020", "P6020_1", "P6020"]));
        assert_eq!(
            t.headers,
            vec!["P6020", "column_1", "P6020_2", "P6020_1", "P6020_3"]
        );
    }

    #[test]
    fn short_and_long_rows_are_aligned() {
        let mut t = RawTable::new(strings(&["a", "b", "c"]));
        t.push_fields(["1", "2", "3"]);
        t.push_fields(["4"]);
        t.push_fields(["5", "", "6", "7", "8"]);
        assert_eq!(t.overflow_rows, 1);
        assert_eq!(
            t.rows,
            vec![
                vec![Some("1".into()), Some("2".into()), Some("3".into())],
                vec![Some("4".into()), None, None],
                vec![Some("5".into()), None, Some("6".into())],
            ]
        );
    }

    #[test]
    fn converts_to_nullable_utf8_batch() {
        let mut t = RawTable::new(strings(&["id", "name"]));
        t.push_fields(["1", "Ana"]);
        t.push_fields(["2"]);
        let batch = t.into_record_batch().unwrap();
        assert_eq!(batch.num_rows(), 2);
        assert_eq!(batch.num_columns(), 2);
        assert_eq!(batch.schema().field(1).name(), "name");
        assert_eq!(batch.schema().field(1).data_type(), &DataType::Utf8);
        let names = batch
            .column(1)
            .as_any()
            .downcast_ref::<StringArray>()
            .unwrap();
        assert_eq!(names.value(0), "Ana");
        assert!(names.is_null(1));
    }
}
