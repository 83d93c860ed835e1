//! Reading and writing transaction tables.
//!
//! Loaders detect the file format, read it with `polars` and normalise the
//! column types; writers emit CSV, Parquet, or Hive-partitioned Parquet and
//! record what they wrote in an [`OutputManifest`].
//!
//! # Example
//!
//! ```no_run
//! use sales_etl::io::TransactionLoader;
//! use std::path::Path;
//!
//! let result = TransactionLoader::load_from_file(Path::new("transactions.csv"))
//!     .expect("Failed to load");
//! println!("Loaded {} rows", result.num_rows);
//! ```

pub mod checksum;
pub mod loaders;
pub mod writers;

#[cfg(test)]
mod loaders_tests;

pub use checksum::{calculate_checksum, calculate_file_checksum};
pub use loaders::{normalize_schema, LoadResult, SourceType, TransactionLoader};
pub use writers::{
    write_csv, write_parquet, write_partitioned, write_table, ManifestEntry, OutputManifest,
};
