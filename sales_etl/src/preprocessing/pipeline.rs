use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::{Path, PathBuf};

use crate::algorithms::aggregation::{monthly_trend, pivot_sales, sales_by_category, sales_by_region};
use crate::algorithms::joins::{attach_segments, enrich_with_lookup, join_coverage, JoinReport};
use crate::algorithms::outliers::{flag_outliers, OutlierBounds};
use crate::algorithms::segmentation::{customer_segments, segment_counts, SegmentCounts};
use crate::config::EtlConfig;
use crate::error::EtlResult;
use crate::io::loaders::TransactionLoader;
use crate::io::writers::{write_partitioned, write_table, OutputManifest};
use crate::models::columns::*;
use crate::models::transaction::has_column;
use crate::preprocessing::validator::{QualityValidator, ValidationResult};
use crate::transformations::cleaning::clean;
use crate::transformations::features::add_features;

/// Names of the tables written by [`EtlPipeline::run`]
pub mod tables {
    pub const TRANSACTIONS: &str = "transactions";
    pub const CUSTOMER_SEGMENTS: &str = "customer_segments";
    pub const SALES_BY_REGION: &str = "sales_by_region";
    pub const SALES_BY_CATEGORY: &str = "sales_by_category";
    pub const MONTHLY_TREND: &str = "monthly_trend";
    pub const REGION_CATEGORY_PIVOT: &str = "region_category_pivot";
    pub const OUTLIERS: &str = "outliers";
}

/// In-memory output of the pipeline
///
/// Summaries whose source columns are absent from the input are `None`.
pub struct PipelineTables {
    pub transactions: DataFrame,
    pub customer_segments: DataFrame,
    pub sales_by_region: Option<DataFrame>,
    pub sales_by_category: Option<DataFrame>,
    pub monthly_trend: Option<DataFrame>,
    pub region_category_pivot: Option<DataFrame>,
    pub outliers: DataFrame,
    pub outlier_bounds: Option<OutlierBounds>,
    pub segment_counts: SegmentCounts,
    pub join_report: Option<JoinReport>,
}

impl PipelineTables {
    /// Every non-empty table paired with its output name
    pub fn named(&self) -> Vec<(&'static str, &DataFrame)> {
        let mut named = vec![
            (tables::TRANSACTIONS, &self.transactions),
            (tables::CUSTOMER_SEGMENTS, &self.customer_segments),
        ];

        let optional = [
            (tables::SALES_BY_REGION, &self.sales_by_region),
            (tables::SALES_BY_CATEGORY, &self.sales_by_category),
            (tables::MONTHLY_TREND, &self.monthly_trend),
            (tables::REGION_CATEGORY_PIVOT, &self.region_category_pivot),
        ];
        for (name, table) in optional {
            if let Some(table) = table {
                named.push((name, table));
            }
        }

        named.push((tables::OUTLIERS, &self.outliers));
        named
    }
}

/// Result of a full pipeline run
pub struct PipelineResult {
    pub validation: ValidationResult,
    pub input_rows: usize,
    pub output_rows: usize,
    pub outlier_bounds: Option<OutlierBounds>,
    pub segment_counts: SegmentCounts,
    pub join_report: Option<JoinReport>,
    pub manifest: OutputManifest,
    pub manifest_path: PathBuf,
}

/// End-to-end ETL: load, validate, clean, enrich, segment, summarise, write.
pub struct EtlPipeline {
    config: EtlConfig,
}

impl EtlPipeline {
    /// Create a pipeline with defaults for everything but the input file
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            config: EtlConfig::for_input(input),
        }
    }

    /// Create a pipeline with custom configuration
    pub fn with_config(config: EtlConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Run every stage and write the output tables plus their manifest.
    pub fn run(&self) -> Result<PipelineResult> {
        self.config.validate().context("Invalid pipeline configuration")?;

        // Step 1: Load
        let input = &self.config.input.path;
        let loaded = TransactionLoader::load_from_file(input)
            .with_context(|| format!("Failed to load {}", input.display()))?;
        log::info!("Loaded {} rows from {}", loaded.num_rows, input.display());

        // Step 2: Validate
        let validation = QualityValidator::validate(&loaded.dataframe);
        for warning in &validation.warnings {
            log::warn!("{}", warning);
        }
        if !validation.is_valid {
            anyhow::bail!("Input failed validation: {}", validation.errors.join("; "));
        }

        // Step 3: Optional lookup table
        let lookup = match &self.config.lookup {
            Some(settings) => Some(
                TransactionLoader::load_lookup(&settings.path).with_context(|| {
                    format!("Failed to load lookup table {}", settings.path.display())
                })?,
            ),
            None => None,
        };

        // Step 4: Transform
        let tables = self
            .run_frame(&loaded.dataframe, lookup.as_ref())
            .context("Pipeline transformation failed")?;

        // Step 5: Write
        let (manifest, manifest_path) = self
            .write_outputs(&tables)
            .context("Failed to write pipeline outputs")?;

        Ok(PipelineResult {
            validation,
            input_rows: loaded.num_rows,
            output_rows: tables.transactions.height(),
            outlier_bounds: tables.outlier_bounds,
            segment_counts: tables.segment_counts,
            join_report: tables.join_report,
            manifest,
            manifest_path,
        })
    }

    /// Run the in-memory stages on an already loaded table.
    ///
    /// Order: clean -> derived features -> outlier flags -> customer segments
    /// -> lookup join -> summaries.
    pub fn run_frame(&self, df: &DataFrame, lookup: Option<&DataFrame>) -> EtlResult<PipelineTables> {
        let cleaned = clean(df)?;
        let featured = add_features(&cleaned)?;

        let settings = &self.config.outliers;
        let (flagged, outlier_bounds) = flag_outliers(
            &featured,
            &settings.column,
            settings.relative_error,
            settings.multiplier,
        )?;

        let segments = customer_segments(&flagged, &self.config.segments)?;
        let counts = segment_counts(&segments)?;
        log::info!(
            "Segments: {} high, {} medium, {} low",
            counts.high,
            counts.medium,
            counts.low
        );

        let mut transactions = attach_segments(&flagged, &segments)?;

        let mut join_report = None;
        if let Some(lookup) = lookup {
            let key = self
                .config
                .lookup
                .as_ref()
                .map(|l| l.key.as_str())
                .unwrap_or(REGION);
            let report = join_coverage(&transactions, lookup, key)?;
            if !report.is_complete() {
                log::warn!(
                    "{} of {} rows have no match in the lookup table (keys: {:?})",
                    report.unmatched_rows(),
                    report.left_rows,
                    report.unmatched_keys
                );
            }
            transactions = enrich_with_lookup(&transactions, lookup, key)?;
            join_report = Some(report);
        }

        let sales_by_region = if has_column(&transactions, REGION) {
            Some(sales_by_region(&transactions)?)
        } else {
            None
        };
        let sales_by_category = if has_column(&transactions, PRODUCT_CATEGORY) {
            Some(sales_by_category(&transactions)?)
        } else {
            None
        };
        let monthly_trend = if has_column(&transactions, TRANSACTION_DATE) {
            Some(monthly_trend(&transactions)?)
        } else {
            None
        };
        let region_category_pivot =
            if has_column(&transactions, REGION) && has_column(&transactions, PRODUCT_CATEGORY) {
                Some(pivot_sales(&transactions, REGION, PRODUCT_CATEGORY, SALES_AMOUNT)?)
            } else {
                None
            };

        let outliers = transactions
            .clone()
            .lazy()
            .filter(col(IS_OUTLIER))
            .collect()?;
        log::info!(
            "Flagged {} outliers in {} of {} rows",
            outliers.height(),
            settings.column,
            transactions.height()
        );

        Ok(PipelineTables {
            transactions,
            customer_segments: segments,
            sales_by_region,
            sales_by_category,
            monthly_trend,
            region_category_pivot,
            outliers,
            outlier_bounds,
            segment_counts: counts,
            join_report,
        })
    }

    fn write_outputs(&self, outputs: &PipelineTables) -> EtlResult<(OutputManifest, PathBuf)> {
        let output = &self.config.output;
        let dir = output.dir.as_path();
        let mut manifest = OutputManifest::new();

        for (name, table) in outputs.named() {
            match &output.partition_by {
                Some(column) if name == tables::TRANSACTIONS && has_column(table, column) => {
                    let root = dir.join(name);
                    for (path, rows) in write_partitioned(table, &root, column, output.format)? {
                        manifest.record(name, dir, &path, rows)?;
                    }
                }
                _ => {
                    let path = write_table(table, dir, name, output.format)?;
                    manifest.record(name, dir, &path, table.height())?;
                }
            }
        }

        let manifest_path = manifest.write(dir)?;
        log::info!(
            "Wrote {} files to {}",
            manifest.files.len(),
            display_dir(dir)
        );

        Ok((manifest, manifest_path))
    }
}

fn display_dir(dir: &Path) -> String {
    if dir.as_os_str().is_empty() {
        ".".to_string()
    } else {
        dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LookupSettings, OutputFormat};
    use crate::io::writers::MANIFEST_FILE;
    use std::fs;
    use tempfile::TempDir;

    const CSV: &str = "\
customer_id,transaction_date,product_category,sales_amount,quantity,cost,region
C1,2024-01-05,Electronics,900.0,1,600.0,North
C1,2024-02-10,Electronics,400.0,2,250.0,North
C2,2024-01-20,Grocery,20.0,4,12.0,South
C2,2024-01-20,Grocery,20.0,4,12.0,South
C3,2024-03-02,Toys,30.0,1,10.0,South
C4,2024-03-15,Grocery,600.0,3,500.0,East
C5,,Toys,30.0,1,15.0,
,2024-03-20,Toys,99.0,1,10.0,East
C6,2024-03-21,Toys,-5.0,1,1.0,East
";

    fn loaded() -> DataFrame {
        TransactionLoader::load_csv_str(CSV).unwrap().dataframe
    }

    #[test]
    fn test_run_frame() {
        let pipeline = EtlPipeline::new("unused.csv");
        let tables = pipeline.run_frame(&loaded(), None).unwrap();

        // Dropped: exact duplicate, missing customer, negative amount
        assert_eq!(tables.transactions.height(), 6);
        assert!(has_column(&tables.transactions, CUSTOMER_SEGMENT));
        assert!(has_column(&tables.transactions, PROFIT));
        assert!(has_column(&tables.transactions, IS_OUTLIER));

        assert_eq!(tables.customer_segments.height(), 5);
        assert_eq!(
            tables.segment_counts,
            SegmentCounts { high: 1, medium: 1, low: 3 }
        );

        let regions = tables.sales_by_region.as_ref().unwrap();
        assert_eq!(regions.height(), 4);
        assert!(tables.region_category_pivot.is_some());
        assert!(tables.join_report.is_none());

        let names: Vec<&str> = tables.named().iter().map(|(name, _)| *name).collect();
        assert_eq!(names.len(), 7);
    }

    #[test]
    fn test_run_frame_without_optional_columns() {
        let df = df!(
            "customer_id" => ["C1", "C2"],
            "sales_amount" => [10.0, 20.0],
        )
        .unwrap();

        let tables = EtlPipeline::new("unused.csv").run_frame(&df, None).unwrap();
        assert!(tables.sales_by_region.is_none());
        assert!(tables.monthly_trend.is_none());
        assert_eq!(tables.named().len(), 3);
    }

    #[test]
    fn test_run_writes_tables_and_manifest() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("transactions.csv");
        fs::write(&input, CSV).unwrap();
        let lookup = dir.path().join("regions.csv");
        fs::write(&lookup, "region,manager\nNorth,Ana\nSouth,Ben\n").unwrap();

        let mut config = EtlConfig::for_input(&input);
        config.output.dir = dir.path().join("out");
        config.output.format = OutputFormat::Csv;
        config.output.partition_by = Some(REGION.to_string());
        config.lookup = Some(LookupSettings {
            path: lookup,
            key: REGION.to_string(),
        });

        let result = EtlPipeline::with_config(config).run().unwrap();

        assert_eq!(result.input_rows, 9);
        assert_eq!(result.output_rows, 6);
        assert!(result.validation.is_valid);
        assert_eq!(result.validation.stats.duplicate_rows, 1);

        let report = result.join_report.unwrap();
        assert_eq!(report.matched_rows, 4);
        assert_eq!(report.unmatched_keys, vec!["East".to_string(), "Unknown".to_string()]);

        let out = dir.path().join("out");
        assert!(out.join(MANIFEST_FILE).exists());
        assert!(out.join("transactions/region=North/part-0.csv").exists());
        assert!(out.join("customer_segments.csv").exists());
        assert_eq!(result.manifest.total_rows(tables::TRANSACTIONS), 6);

        let manifest = OutputManifest::read(&result.manifest_path).unwrap();
        assert_eq!(manifest.files.len(), result.manifest.files.len());
        assert!(manifest.files.iter().all(|f| f.sha256.len() == 64));
    }

    #[test]
    fn test_run_missing_input() {
        let pipeline = EtlPipeline::new("/nonexistent/transactions.csv");
        let err = pipeline.run().err().unwrap();
        assert!(err.to_string().contains("Failed to load"));
    }
}
