//! Table writers and the output manifest.

use chrono::{DateTime, Utc};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use crate::config::OutputFormat;
use crate::error::{EtlError, EtlResult};
use crate::io::checksum::calculate_file_checksum;

/// File name of the manifest written next to the output tables
pub const MANIFEST_FILE: &str = "_manifest.json";

/// Directory name used for null partition values, as in Hive
pub const DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

fn create_parent(path: &Path) -> EtlResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Write a DataFrame as CSV with a header row. Returns the number of rows written.
pub fn write_csv(df: &DataFrame, path: &Path) -> EtlResult<usize> {
    create_parent(path)?;
    let mut file = File::create(path)?;
    let mut out = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut out)?;
    Ok(out.height())
}

/// Write a DataFrame as Parquet. Returns the number of rows written.
pub fn write_parquet(df: &DataFrame, path: &Path) -> EtlResult<usize> {
    create_parent(path)?;
    let file = File::create(path)?;
    let mut out = df.clone();
    ParquetWriter::new(file).finish(&mut out)?;
    Ok(out.height())
}

/// Write `dir/<name>.<ext>` in the requested format and return its path.
pub fn write_table(
    df: &DataFrame,
    dir: &Path,
    name: &str,
    format: OutputFormat,
) -> EtlResult<PathBuf> {
    let path = dir.join(format!("{}.{}", name, format.extension()));
    match format {
        OutputFormat::Csv => write_csv(df, &path)?,
        OutputFormat::Parquet => write_parquet(df, &path)?,
    };
    log::debug!("Wrote {} rows to {}", df.height(), path.display());
    Ok(path)
}

/// Write one file per distinct value of `column` in Hive layout:
/// `dir/<column>=<value>/part-0.<ext>`.
///
/// The partition column is dropped from the files, its value lives in the
/// directory name. Returns `(path, rows)` for every file written.
pub fn write_partitioned(
    df: &DataFrame,
    dir: &Path,
    column: &str,
    format: OutputFormat,
) -> EtlResult<Vec<(PathBuf, usize)>> {
    if df.column(column).is_err() {
        return Err(EtlError::MissingColumn(column.to_string()));
    }

    let mut written = Vec::new();
    for part in df.partition_by_stable([column], true)? {
        let values = part.column(column)?.cast(&DataType::String)?;
        let value = values
            .str()?
            .get(0)
            .map(partition_dir_value)
            .unwrap_or_else(|| DEFAULT_PARTITION.to_string());

        let body = part.drop(column)?;
        let path = dir
            .join(format!("{}={}", column, value))
            .join(format!("part-0.{}", format.extension()));

        let rows = match format {
            OutputFormat::Csv => write_csv(&body, &path)?,
            OutputFormat::Parquet => write_parquet(&body, &path)?,
        };
        written.push((path, rows));
    }

    log::debug!(
        "Wrote {} partitions of {} under {}",
        written.len(),
        column,
        dir.display()
    );
    Ok(written)
}

fn partition_dir_value(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            '/' | '\\' | '=' => '_',
            other => other,
        })
        .collect()
}

/// One written file in the manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub table: String,
    pub path: String,
    pub rows: usize,
    pub sha256: String,
}

/// Record of every file produced by a pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputManifest {
    pub generated_at: DateTime<Utc>,
    pub files: Vec<ManifestEntry>,
}

impl OutputManifest {
    pub fn new() -> Self {
        Self {
            generated_at: Utc::now(),
            files: Vec::new(),
        }
    }

    /// Checksum `path` and add it under `table`. Paths are stored relative to `root`.
    pub fn record(&mut self, table: &str, root: &Path, path: &Path, rows: usize) -> EtlResult<()> {
        let sha256 = calculate_file_checksum(path)?;
        let relative = path.strip_prefix(root).unwrap_or(path);

        self.files.push(ManifestEntry {
            table: table.to_string(),
            path: relative.to_string_lossy().replace('\\', "/"),
            rows,
            sha256,
        });
        Ok(())
    }

    pub fn total_rows(&self, table: &str) -> usize {
        self.files
            .iter()
            .filter(|entry| entry.table == table)
            .map(|entry| entry.rows)
            .sum()
    }

    /// Write the manifest as pretty JSON to `dir/_manifest.json`.
    pub fn write(&self, dir: &Path) -> EtlResult<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(MANIFEST_FILE);
        let json = serde_json::to_string_pretty(self)?;
        fs::write(&path, json)?;
        Ok(path)
    }

    pub fn read(path: &Path) -> EtlResult<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl Default for OutputManifest {
    fn default() -> Self {
        Self::new()
    }
}
