//! Integration tests for the end-to-end pipeline.
//!
//! These tests ensure that:
//! 1. A TOML config drives loading, cleaning and writing
//! 2. Written tables can be read back and match the manifest
//! 3. Partitioned output follows the Hive directory layout
//! 4. Invalid inputs fail with a useful error chain

use std::fs;
use std::path::Path;

use polars::prelude::*;
use sales_etl::io::{calculate_file_checksum, OutputManifest, TransactionLoader};
use sales_etl::models::columns::*;
use sales_etl::preprocessing::pipeline::tables;
use sales_etl::preprocessing::EtlPipeline;
use sales_etl::{EtlConfig, EtlError};
use tempfile::TempDir;

// ==================== Helper Functions ====================

const TRANSACTIONS: &str = "\
customer_id,transaction_date,product_category,sales_amount,quantity,cost,region
C001,2024-01-03,Electronics,1200.0,1,900.0,North
C002,2024-01-04,Grocery,35.5,3,20.0,South
C003,2024-01-09,Toys,60.0,2,25.0,North
C002,2024-02-01,Grocery,40.0,4,22.0,South
C004,2024-02-11,Electronics,650.0,1,500.0,West
C003,2024-02-15,Toys,45.0,1,20.0,North
C005,2024-03-01,Grocery,30.0,2,15.0,South
C001,2024-03-03,Toys,55.0,1,30.0,North
";

fn write_input(dir: &Path) -> std::path::PathBuf {
    let input = dir.join("transactions.csv");
    fs::write(&input, TRANSACTIONS).unwrap();
    input
}

fn config_for(dir: &Path, extra: &str) -> EtlConfig {
    let input = write_input(dir);
    let toml = format!(
        "[input]\npath = {:?}\n\n[output]\ndir = {:?}\n{}",
        input.to_string_lossy(),
        dir.join("out").to_string_lossy(),
        extra
    );
    EtlConfig::from_toml_str(&toml).unwrap()
}

// ==================== Pipeline Runs ====================

#[test]
fn test_pipeline_parquet_output_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "");

    let result = EtlPipeline::with_config(config).run().unwrap();
    assert_eq!(result.input_rows, 8);
    assert_eq!(result.output_rows, 8);
    assert_eq!(result.segment_counts.high, 1);
    assert_eq!(result.segment_counts.medium, 1);
    assert_eq!(result.segment_counts.low, 3);

    let out = dir.path().join("out");
    let transactions = TransactionLoader::load_parquet(&out.join("transactions.parquet")).unwrap();
    assert_eq!(transactions.num_rows, 8);
    assert!(transactions.dataframe.column(CUSTOMER_SEGMENT).is_ok());
    assert!(transactions.dataframe.column(UNIT_PRICE).is_ok());

    for name in [
        tables::CUSTOMER_SEGMENTS,
        tables::SALES_BY_REGION,
        tables::SALES_BY_CATEGORY,
        tables::MONTHLY_TREND,
        tables::REGION_CATEGORY_PIVOT,
        tables::OUTLIERS,
    ] {
        assert!(out.join(format!("{}.parquet", name)).exists(), "missing {}", name);
    }
}

#[test]
fn test_manifest_matches_written_files() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "format = \"csv\"\n");

    let result = EtlPipeline::with_config(config).run().unwrap();
    let manifest = OutputManifest::read(&result.manifest_path).unwrap();
    let out = dir.path().join("out");

    assert_eq!(manifest.files.len(), 7);
    for entry in &manifest.files {
        let path = out.join(&entry.path);
        assert!(path.exists(), "{} listed but not written", entry.path);
        assert_eq!(calculate_file_checksum(&path).unwrap(), entry.sha256);
    }
    assert_eq!(manifest.total_rows(tables::TRANSACTIONS), 8);
}

#[test]
fn test_partitioned_output_layout() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "partition_by = \"region\"\n");

    let result = EtlPipeline::with_config(config).run().unwrap();
    let root = dir.path().join("out").join(tables::TRANSACTIONS);

    for region in ["North", "South", "West"] {
        let part = root.join(format!("region={}", region)).join("part-0.parquet");
        assert!(part.exists(), "missing partition {}", region);

        let df = ParquetReader::new(fs::File::open(&part).unwrap()).finish().unwrap();
        assert!(df.column(REGION).is_err(), "partition column kept in file");
    }
    assert_eq!(result.manifest.total_rows(tables::TRANSACTIONS), 8);
}

#[test]
fn test_custom_thresholds_change_segments() {
    let dir = TempDir::new().unwrap();
    let config = config_for(dir.path(), "\n[segments]\nhigh = 100.0\nmedium = 50.0\n");

    let result = EtlPipeline::with_config(config).run().unwrap();
    // C001 1255, C004 650 and C003 105 are high; C002 75.5 medium; C005 30 low
    assert_eq!(result.segment_counts.high, 3);
    assert_eq!(result.segment_counts.medium, 1);
    assert_eq!(result.segment_counts.low, 1);
}

// ==================== Failures ====================

#[test]
fn test_missing_required_column_fails() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("bad.csv");
    fs::write(&input, "customer_id,region\nC1,North\n").unwrap();

    let err = EtlPipeline::new(&input).run().err().unwrap();
    let missing = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<EtlError>())
        .map(|e| matches!(e, EtlError::MissingColumn(name) if name == SALES_AMOUNT));
    assert_eq!(missing, Some(true), "unexpected error: {:#}", err);
}

#[test]
fn test_invalid_config_is_rejected() {
    let err = EtlConfig::from_toml_str(
        "[input]\npath = \"x.csv\"\n\n[segments]\nhigh = 100.0\nmedium = 500.0\n",
    )
    .unwrap_err();
    assert!(matches!(err, EtlError::Config(_)));
}
