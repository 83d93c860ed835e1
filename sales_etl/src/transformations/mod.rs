//! Data transformation and cleaning utilities.
//!
//! This module provides operations for cleaning, filtering, and enriching
//! transaction DataFrames, including duplicate removal, missing data handling,
//! date parsing and derived business columns.
//!
//! # Modules
//!
//! - [`cleaning`]: Remove duplicates, fill missing data, drop invalid rows
//! - [`filtering`]: Filter DataFrames by region, category, ranges and dates
//! - [`features`]: Profit, margin, unit price and calendar columns
//!
//! # Example
//!
//! ```no_run
//! use sales_etl::transformations::{clean, add_features, filter_by_region};
//! use polars::prelude::*;
//!
//! # fn example(df: DataFrame) -> sales_etl::EtlResult<()> {
//! let cleaned = clean(&df)?;
//! let enriched = add_features(&cleaned)?;
//! let north = filter_by_region(&enriched, "North")?;
//! # Ok(())
//! # }
//! ```

pub mod cleaning;
pub mod features;
pub mod filtering;

pub use cleaning::{
    clean, drop_missing_customers, fill_missing, parse_dates, remove_duplicates,
    remove_invalid_rows, trim_text_columns, KeepStrategy, UNKNOWN_LABEL,
};
pub use features::{add_date_parts, add_features, add_profit, add_unit_price};
pub use filtering::{
    filter_by_category, filter_by_column, filter_by_date_range, filter_by_range,
    filter_by_region,
};
