use std::{fs::File, path::PathBuf, sync::Arc};

use arrow::{
    array::{ArrayRef, Float32Array, Float64Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};

use crate::{features::FeatureTable, RecoError, RecoResult};

/// The default number of rows in each written record batch.
pub const DEFAULT_WRITE_BATCH_SIZE: usize = 10_000;

/// Precision for writing floating-point columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FloatPrecision {
    /// 32-bit floats.
    F32,
    /// 64-bit floats.
    #[default]
    F64,
}

/// Options for writing a [`FeatureTable`] to disk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureWriteOptions {
    /// Number of rows to include in each batch when writing.
    pub batch_size: usize,
    /// Floating-point precision to use for persisted columns.
    pub precision: FloatPrecision,
}

impl Default for FeatureWriteOptions {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_WRITE_BATCH_SIZE,
            precision: FloatPrecision::default(),
        }
    }
}

impl FeatureWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the batch size used for writing; defaults to 10_000.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Select the floating-point precision for persisted columns.
    pub fn precision(mut self, precision: FloatPrecision) -> Self {
        self.precision = precision;
        self
    }
}

fn expand_output_path(file_path: &str) -> RecoResult<PathBuf> {
    Ok(PathBuf::from(&*shellexpand::full(file_path)?))
}

fn build_schema(table: &FeatureTable, precision: FloatPrecision) -> Schema {
    let datatype = match precision {
        FloatPrecision::F64 => DataType::Float64,
        FloatPrecision::F32 => DataType::Float32,
    };
    Schema::new(
        table
            .names()
            .iter()
            .map(|name| Field::new(name, datatype.clone(), false))
            .collect::<Vec<_>>(),
    )
}

fn rows_to_record_batch(
    table: &FeatureTable,
    start: usize,
    end: usize,
    schema: Arc<Schema>,
    precision: FloatPrecision,
) -> arrow::error::Result<RecordBatch> {
    let rows = &table.rows()[start..end];
    let columns: Vec<ArrayRef> = (0..table.n_columns())
        .map(|column| -> ArrayRef {
            let values = rows.iter().map(|row| row[column]);
            match precision {
                FloatPrecision::F64 => Arc::new(Float64Array::from(values.collect::<Vec<_>>())),
                FloatPrecision::F32 => Arc::new(Float32Array::from(
                    values.map(|v| v as f32).collect::<Vec<_>>(),
                )),
            }
        })
        .collect();
    RecordBatch::try_new(schema, columns)
}

/// Persist a [`FeatureTable`] to a Parquet file, one floating-point column per feature.
///
/// The path may contain `~` and environment variables.
pub fn write_parquet(
    table: &FeatureTable,
    file_path: &str,
    options: &FeatureWriteOptions,
) -> RecoResult<()> {
    let path = expand_output_path(file_path)?;
    let batch_size = options.batch_size.max(1);
    let precision = options.precision;
    let schema = Arc::new(build_schema(table, precision));
    let file = File::create(&path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), None)
        .map_err(|err| RecoError::Custom(format!("Failed to create Parquet writer: {err}")))?;

    let n_rows = table.len();
    let mut start = 0usize;
    while start < n_rows {
        let end = (start + batch_size).min(n_rows);
        let batch = rows_to_record_batch(table, start, end, schema.clone(), precision)
            .map_err(|err| RecoError::Custom(format!("Failed to build Parquet batch: {err}")))?;
        writer
            .write(&batch)
            .map_err(|err| RecoError::Custom(format!("Failed to write Parquet batch: {err}")))?;
        start = end;
    }

    writer
        .close()
        .map_err(|err| RecoError::Custom(format!("Failed to finalise Parquet file: {err}")))?;
    log::debug!(
        "wrote {} rows x {} features to {}",
        n_rows,
        table.n_columns(),
        path.display()
    );
    Ok(())
}
