use anyhow::{Context, Result};
use polars::prelude::*;
use std::fs::File;
use std::io::Cursor;
use std::path::Path;

use crate::error::{EtlError, EtlResult};
use crate::models::columns;
use crate::models::transaction::{has_column, require_columns};

/// Represents the source format of transaction data
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceType {
    Csv,
    Parquet,
}

/// Result of loading transaction data
#[derive(Debug)]
pub struct LoadResult {
    pub dataframe: DataFrame,
    pub source_type: SourceType,
    pub num_rows: usize,
}

impl LoadResult {
    pub fn new(dataframe: DataFrame, source_type: SourceType) -> Self {
        let num_rows = dataframe.height();
        Self {
            dataframe,
            source_type,
            num_rows,
        }
    }
}

/// Unified interface for loading transaction data from CSV or Parquet
pub struct TransactionLoader;

impl TransactionLoader {
    /// Load transactions from a file (auto-detects CSV or Parquet)
    pub fn load_from_file(path: &Path) -> Result<LoadResult> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "csv" => Self::load_csv(path),
            "parquet" | "pq" => Self::load_parquet(path),
            _ => Err(EtlError::UnsupportedFormat(extension.to_string()).into()),
        }
    }

    /// Load transactions from a CSV file with a header row
    pub fn load_csv(csv_path: &Path) -> Result<LoadResult> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(csv_path.to_path_buf()))
            .with_context(|| format!("Failed to open CSV file {}", csv_path.display()))?
            .finish()
            .context("Failed to parse CSV into DataFrame")?;

        let df = normalize_schema(df).context("CSV does not match the transaction schema")?;
        log::debug!("Loaded {} rows from {}", df.height(), csv_path.display());

        Ok(LoadResult::new(df, SourceType::Csv))
    }

    /// Load transactions from CSV text
    pub fn load_csv_str(csv: &str) -> Result<LoadResult> {
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .into_reader_with_file_handle(Cursor::new(csv.as_bytes().to_vec()))
            .finish()
            .context("Failed to parse CSV string")?;

        let df = normalize_schema(df).context("CSV does not match the transaction schema")?;

        Ok(LoadResult::new(df, SourceType::Csv))
    }

    /// Load transactions from a Parquet file
    pub fn load_parquet(parquet_path: &Path) -> Result<LoadResult> {
        let file = File::open(parquet_path)
            .with_context(|| format!("Failed to open Parquet file {}", parquet_path.display()))?;

        let df = ParquetReader::new(file)
            .finish()
            .context("Failed to read Parquet into DataFrame")?;

        let df = normalize_schema(df).context("Parquet does not match the transaction schema")?;
        log::debug!("Loaded {} rows from {}", df.height(), parquet_path.display());

        Ok(LoadResult::new(df, SourceType::Parquet))
    }

    /// Load a dimension table (CSV or Parquet) without schema normalisation
    pub fn load_lookup(path: &Path) -> Result<DataFrame> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .context("File has no extension")?;

        match extension.to_lowercase().as_str() {
            "csv" => CsvReadOptions::default()
                .with_has_header(true)
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()
                .context("Failed to parse lookup CSV"),
            "parquet" | "pq" => {
                let file = File::open(path)
                    .with_context(|| format!("Failed to open {}", path.display()))?;
                ParquetReader::new(file)
                    .finish()
                    .context("Failed to read lookup Parquet")
            }
            _ => Err(EtlError::UnsupportedFormat(extension.to_string()).into()),
        }
    }
}

/// Check required columns and cast the known columns to their canonical types.
///
/// The CSV reader infers integer types for amounts without a decimal point and
/// for numeric customer ids; both are corrected here. Values that cannot be
/// cast become null.
pub fn normalize_schema(df: DataFrame) -> EtlResult<DataFrame> {
    require_columns(&df, &columns::REQUIRED)?;

    let mut casts = Vec::new();

    for name in columns::TEXT {
        if has_column(&df, name) {
            casts.push(col(name).cast(DataType::String));
        }
    }

    for name in [columns::SALES_AMOUNT, columns::COST] {
        if has_column(&df, name) {
            casts.push(col(name).cast(DataType::Float64));
        }
    }

    if has_column(&df, columns::QUANTITY) {
        casts.push(col(columns::QUANTITY).cast(DataType::Int64));
    }

    let df = df.lazy().with_columns(casts).collect()?;
    Ok(df)
}
