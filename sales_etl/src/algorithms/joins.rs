use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EtlResult;
use crate::models::columns::*;
use crate::models::transaction::require_columns;
use crate::transformations::cleaning::{remove_duplicates, KeepStrategy};

const ROW_ORDER: &str = "__row_order";

/// Left-join `lookup` onto `df` by `key`.
///
/// Every row of `df` is kept, in its original order; rows without a match
/// get nulls in the lookup columns. Keys are compared as text, and a lookup
/// key listed more than once only contributes its first row. The key column
/// keeps the type it had in `df`.
pub fn enrich_with_lookup(df: &DataFrame, lookup: &DataFrame, key: &str) -> EtlResult<DataFrame> {
    require_columns(df, &[key])?;
    require_columns(lookup, &[key])?;

    let key_dtype = df.column(key)?.dtype().clone();
    let lookup = remove_duplicates(lookup, Some(&[key]), KeepStrategy::First)?;
    let left = df.with_row_index(ROW_ORDER.into(), None)?;

    let joined = left
        .lazy()
        .with_column(col(key).cast(DataType::String))
        .left_join(
            lookup.lazy().with_column(col(key).cast(DataType::String)),
            col(key),
            col(key),
        )
        .with_column(col(key).cast(key_dtype))
        .sort([ROW_ORDER], SortMultipleOptions::default())
        .collect()?
        .drop(ROW_ORDER)?;

    log::debug!(
        "Joined lookup on {}: {} rows, {} columns",
        key,
        joined.height(),
        joined.width()
    );

    Ok(joined)
}

/// Attach each customer's `customer_segment` to their transaction rows.
///
/// `segments` is the output of
/// [`customer_segments`](crate::algorithms::segmentation::customer_segments).
/// A segment column already on `df` is replaced.
pub fn attach_segments(df: &DataFrame, segments: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(segments, &[CUSTOMER_ID, CUSTOMER_SEGMENT])?;

    let labels = segments.select([CUSTOMER_ID, CUSTOMER_SEGMENT])?;
    let base = match df.column(CUSTOMER_SEGMENT) {
        Ok(_) => df.drop(CUSTOMER_SEGMENT)?,
        Err(_) => df.clone(),
    };

    enrich_with_lookup(&base, &labels, CUSTOMER_ID)
}

/// How well a lookup table covers the keys of a frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinReport {
    pub left_rows: usize,
    pub matched_rows: usize,
    /// Distinct keys of the left frame missing from the lookup, sorted
    pub unmatched_keys: Vec<String>,
}

impl JoinReport {
    pub fn unmatched_rows(&self) -> usize {
        self.left_rows - self.matched_rows
    }

    pub fn is_complete(&self) -> bool {
        self.matched_rows == self.left_rows
    }
}

/// Measure how many rows of `df` would find a partner in `lookup`.
///
/// Rows with a null key never match.
pub fn join_coverage(df: &DataFrame, lookup: &DataFrame, key: &str) -> EtlResult<JoinReport> {
    require_columns(df, &[key])?;
    require_columns(lookup, &[key])?;

    let keys_of = |frame: &DataFrame| {
        frame
            .clone()
            .lazy()
            .select([col(key).cast(DataType::String)])
    };
    let lookup_keys = keys_of(lookup).unique(None, UniqueKeepStrategy::Any);

    let matched_rows = keys_of(df)
        .join(
            lookup_keys.clone(),
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Semi),
        )
        .collect()?
        .height();

    let unmatched = keys_of(df)
        .join(
            lookup_keys,
            [col(key)],
            [col(key)],
            JoinArgs::new(JoinType::Anti),
        )
        .filter(col(key).is_not_null())
        .unique(None, UniqueKeepStrategy::Any)
        .sort([key], SortMultipleOptions::default())
        .collect()?;

    let unmatched_keys = unmatched
        .column(key)?
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();

    Ok(JoinReport {
        left_rows: df.height(),
        matched_rows,
        unmatched_keys,
    })
}
