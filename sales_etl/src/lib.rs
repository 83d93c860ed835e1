//! Sales ETL - local tabular processing for retail transaction data.
//!
//! The crate loads transaction tables from CSV or Parquet, reports on data
//! quality, cleans and enriches the rows, and produces customer segments,
//! outlier flags, aggregate summaries and windowed views on top of the
//! `polars` lazy engine.
//!
//! # Modules
//!
//! - [`io`]: Loading and writing CSV / Parquet, output manifests
//! - [`models`]: Transaction schema and segment labels
//! - [`transformations`]: Cleaning, filtering and feature engineering
//! - [`algorithms`]: Segmentation, outlier fences, aggregation, windows, joins
//! - [`preprocessing`]: Quality validation and the end-to-end pipeline
//! - [`config`]: TOML configuration for the pipeline

pub mod algorithms;
pub mod config;
pub mod error;
pub mod io;
pub mod models;
pub mod preprocessing;
pub mod transformations;

pub use config::EtlConfig;
pub use error::{EtlError, EtlResult};
pub use models::segment::ValueSegment;
