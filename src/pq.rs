// Parquet I/O
use crate::error::{FocusError, Result};
use polars::{prelude::*, io::parquet::write::StatisticsOptions};
use std::path::Path;
use tracing::info;

pub fn write(df: &mut DataFrame, path: &Path) -> Result<()> {
  let file = std::fs::File::create(path).map_err(|e| FocusError::output(path, e))?;

  ParquetWriter::new(file)
      .with_statistics(StatisticsOptions::full())
      .with_compression(ParquetCompression::Snappy)
      .finish(df)?;

  Ok(())
}

/// Converts a CSV file to Parquet, reading every column as a string.
pub fn convert_csv(csv_path: &Path, parquet_path: &Path) -> Result<usize> {
  std::fs::metadata(csv_path).map_err(|e| FocusError::input(csv_path, e))?;

  // No schema inference, every column stays a string
  let mut df = CsvReadOptions::default()
      .with_has_header(true)
      .with_infer_schema_length(Some(0))
      .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))?
      .finish()?;

  write(&mut df, parquet_path)?;
  info!("Converted {} to {} ({} rows)", csv_path.display(), parquet_path.display(), df.height());

  Ok(df.height())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::dataset::tests::write_fixture;
  use tempfile::tempdir;

  fn read(path: &Path) -> PolarsResult<DataFrame> {
    ParquetReader::new(std::fs::File::open(path)?)
        .use_statistics(true)
        .finish()
  }

  #[test]
  fn converts_with_string_columns() {
    let dir = tempdir().unwrap();
    let csv = dir.path().join("data.csv");
    let parquet = dir.path().join("data.parquet");
    write_fixture(&csv, 120);

    assert_eq!(convert_csv(&csv, &parquet).unwrap(), 120);

    let df = read(&parquet).unwrap();
    assert_eq!(df.shape(), (120, 3));
    assert_eq!(df.column("Id").unwrap().dtype(), &DataType::String);
    assert_eq!(df.column("BilledCost").unwrap().dtype(), &DataType::String);
  }

  #[test]
  fn missing_csv_is_input_not_found() {
    let dir = tempdir().unwrap();
    let err = convert_csv(&dir.path().join("missing.csv"), &dir.path().join("out.parquet")).unwrap_err();

    assert!(matches!(err, FocusError::InputNotFound { .. }));
  }
}
