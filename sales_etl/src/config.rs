//! Pipeline configuration file support.
//!
//! This module provides utilities for reading ETL settings from TOML
//! configuration files.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{EtlError, EtlResult};
use crate::models::columns;
use crate::models::SegmentThresholds;

/// ETL configuration from file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EtlConfig {
    pub input: InputSettings,
    #[serde(default)]
    pub output: OutputSettings,
    #[serde(default)]
    pub outliers: OutlierSettings,
    #[serde(default)]
    pub segments: SegmentThresholds,
    #[serde(default)]
    pub lookup: Option<LookupSettings>,
}

/// Source table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    pub path: PathBuf,
}

/// Output location and format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub partition_by: Option<String>,
}

/// File format of written tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Parquet,
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Parquet => "parquet",
            OutputFormat::Csv => "csv",
        }
    }
}

impl FromStr for OutputFormat {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "parquet" | "pq" => Ok(OutputFormat::Parquet),
            "csv" => Ok(OutputFormat::Csv),
            other => Err(EtlError::Config(format!(
                "Unknown output format: {}. Use 'parquet' or 'csv'",
                other
            ))),
        }
    }
}

/// Outlier fence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutlierSettings {
    #[serde(default = "default_outlier_column")]
    pub column: String,
    #[serde(default = "default_relative_error")]
    pub relative_error: f64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

/// Optional dimension table joined onto transactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupSettings {
    pub path: PathBuf,
    #[serde(default = "default_lookup_key")]
    pub key: String,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}

fn default_outlier_column() -> String {
    columns::SALES_AMOUNT.to_string()
}

fn default_relative_error() -> f64 {
    0.05
}

fn default_multiplier() -> f64 {
    1.5
}

fn default_lookup_key() -> String {
    columns::REGION.to_string()
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            format: OutputFormat::default(),
            partition_by: None,
        }
    }
}

impl Default for OutlierSettings {
    fn default() -> Self {
        Self {
            column: default_outlier_column(),
            relative_error: default_relative_error(),
            multiplier: default_multiplier(),
        }
    }
}

impl EtlConfig {
    /// Build a configuration with defaults for everything but the input.
    pub fn for_input(path: impl Into<PathBuf>) -> Self {
        Self {
            input: InputSettings { path: path.into() },
            output: OutputSettings::default(),
            outliers: OutlierSettings::default(),
            segments: SegmentThresholds::default(),
            lookup: None,
        }
    }

    /// Load ETL configuration from a TOML file.
    ///
    /// Relative paths inside the file are kept as written; they resolve
    /// against the working directory of the process.
    pub fn from_file<P: AsRef<Path>>(path: P) -> EtlResult<Self> {
        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| EtlError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(content: &str) -> EtlResult<Self> {
        let config: EtlConfig = toml::from_str(content)
            .map_err(|e| EtlError::Config(format!("Failed to parse config file: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `etl.toml` in:
    /// 1. Current directory
    /// 2. `sales_etl/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> EtlResult<Self> {
        let search_paths = [
            PathBuf::from("etl.toml"),
            PathBuf::from("sales_etl/etl.toml"),
            PathBuf::from("../etl.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(EtlError::Config(
            "No etl.toml found in standard locations".to_string(),
        ))
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> EtlResult<()> {
        let eps = self.outliers.relative_error;
        if !(0.0..1.0).contains(&eps) {
            return Err(EtlError::Config(format!(
                "outliers.relative_error must be in [0, 1), got {}",
                eps
            )));
        }

        if !self.outliers.multiplier.is_finite() || self.outliers.multiplier < 0.0 {
            return Err(EtlError::Config(format!(
                "outliers.multiplier must be a non-negative number, got {}",
                self.outliers.multiplier
            )));
        }

        self.segments
            .validate()
            .map_err(|e| EtlError::Config(format!("Invalid [segments]: {}", e)))?;

        if let Some(partition) = &self.output.partition_by {
            if partition.trim().is_empty() {
                return Err(EtlError::Config(
                    "output.partition_by must not be empty".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = EtlConfig::from_toml_str(
            r#"
            [input]
            path = "data/transactions.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.input.path, PathBuf::from("data/transactions.csv"));
        assert_eq!(config.output.dir, PathBuf::from("out"));
        assert_eq!(config.output.format, OutputFormat::Parquet);
        assert_eq!(config.outliers.column, "sales_amount");
        assert_eq!(config.outliers.relative_error, 0.05);
        assert_eq!(config.outliers.multiplier, 1.5);
        assert_eq!(config.segments, SegmentThresholds::default());
        assert!(config.lookup.is_none());
    }

    #[test]
    fn test_full_config() {
        let config = EtlConfig::from_toml_str(
            r#"
            [input]
            path = "in.csv"

            [output]
            dir = "results"
            format = "csv"
            partition_by = "region"

            [outliers]
            column = "profit"
            relative_error = 0.0
            multiplier = 3.0

            [segments]
            high = 2000.0
            medium = 750.0

            [lookup]
            path = "regions.csv"
            "#,
        )
        .unwrap();

        assert_eq!(config.output.format, OutputFormat::Csv);
        assert_eq!(config.output.partition_by.as_deref(), Some("region"));
        assert_eq!(config.outliers.multiplier, 3.0);
        assert_eq!(config.segments.high, 2000.0);
        let lookup = config.lookup.unwrap();
        assert_eq!(lookup.key, "region");
    }

    #[test]
    fn test_invalid_relative_error() {
        let result = EtlConfig::from_toml_str(
            r#"
            [input]
            path = "in.csv"
            [outliers]
            relative_error = 1.5
            "#,
        );
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let result = EtlConfig::from_toml_str(
            r#"
            [input]
            path = "in.csv"
            [segments]
            high = 100.0
            medium = 500.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "[input]\npath = \"tx.parquet\"\n").unwrap();

        let config = EtlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.input.path, PathBuf::from("tx.parquet"));
    }

    #[test]
    fn test_missing_file() {
        let result = EtlConfig::from_file("/nonexistent/etl.toml");
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("pq".parse::<OutputFormat>().unwrap(), OutputFormat::Parquet);
        assert!("xlsx".parse::<OutputFormat>().is_err());
    }
}
