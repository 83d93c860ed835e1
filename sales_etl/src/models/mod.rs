//! Data model for the transaction dataset.
//!
//! This module defines the canonical column names and typed row structure of
//! the transaction table, and the customer value-segment labels produced by
//! segmentation.

pub mod segment;
pub mod transaction;

pub use segment::{SegmentThresholds, ValueSegment};
pub use transaction::{
    columns, dataframe_to_transactions, require_columns, transactions_to_dataframe, Transaction,
};
