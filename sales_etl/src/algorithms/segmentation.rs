//! Customer value segmentation.
//!
//! A customer's tier depends only on their total purchase amount:
//! above 1000 is High Value, above 500 is Medium Value, anything else is Low
//! Value. Both comparisons are strict, so a total of exactly 1000 is Medium
//! and exactly 500 is Low.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::EtlResult;
use crate::models::columns::*;
use crate::models::segment::{SegmentThresholds, ValueSegment};
use crate::models::transaction::require_columns;

/// Classify a total purchase amount with the default thresholds.
///
/// # Examples
///
/// ```
/// use sales_etl::algorithms::segmentation::classify;
/// use sales_etl::ValueSegment;
///
/// assert_eq!(classify(1500.0), ValueSegment::High);
/// assert_eq!(classify(1000.0), ValueSegment::Medium);
/// assert_eq!(classify(500.0), ValueSegment::Low);
/// ```
pub fn classify(total: f64) -> ValueSegment {
    classify_with(total, &SegmentThresholds::default())
}

/// Classify a total purchase amount against custom thresholds.
pub fn classify_with(total: f64, thresholds: &SegmentThresholds) -> ValueSegment {
    if total > thresholds.high {
        ValueSegment::High
    } else if total > thresholds.medium {
        ValueSegment::Medium
    } else {
        ValueSegment::Low
    }
}

/// Expression form of [`classify_with`] over a numeric column.
///
/// NaN is turned into null first, since polars orders NaN above every
/// number. Null totals then fall through to Low Value as in the scalar form.
pub fn segment_expr(column: &str, thresholds: &SegmentThresholds) -> Expr {
    let total = col(column).cast(DataType::Float64).fill_nan(lit(NULL));
    when(total.clone().gt(lit(thresholds.high)))
        .then(lit(ValueSegment::High.as_str()))
        .when(total.gt(lit(thresholds.medium)))
        .then(lit(ValueSegment::Medium.as_str()))
        .otherwise(lit(ValueSegment::Low.as_str()))
}

/// Label every row of `df` from the numeric `column`, writing `customer_segment`.
///
/// An existing label column is overwritten, so relabelling is idempotent.
pub fn label_segments(
    df: &DataFrame,
    column: &str,
    thresholds: &SegmentThresholds,
) -> EtlResult<DataFrame> {
    require_columns(df, &[column])?;

    Ok(df
        .clone()
        .lazy()
        .with_column(segment_expr(column, thresholds).alias(CUSTOMER_SEGMENT))
        .collect()?)
}

/// One row per customer with `total_purchase`, `order_count` and `customer_segment`.
///
/// Sorted by total purchase (largest first), ties broken by customer id.
pub fn customer_segments(df: &DataFrame, thresholds: &SegmentThresholds) -> EtlResult<DataFrame> {
    require_columns(df, &[CUSTOMER_ID, SALES_AMOUNT])?;

    let segments = df
        .clone()
        .lazy()
        .group_by([col(CUSTOMER_ID)])
        .agg([
            col(SALES_AMOUNT).sum().alias(TOTAL_PURCHASE),
            len().alias(ORDER_COUNT),
        ])
        .with_column(segment_expr(TOTAL_PURCHASE, thresholds).alias(CUSTOMER_SEGMENT))
        .sort(
            [TOTAL_PURCHASE, CUSTOMER_ID],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?;

    log::info!("Segmented {} customers", segments.height());
    Ok(segments)
}

/// Number of customers in each tier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SegmentCounts {
    pub fn get(&self, segment: ValueSegment) -> usize {
        match segment {
            ValueSegment::High => self.high,
            ValueSegment::Medium => self.medium,
            ValueSegment::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Count labels in a frame produced by [`customer_segments`] or [`label_segments`].
pub fn segment_counts(segments: &DataFrame) -> EtlResult<SegmentCounts> {
    require_columns(segments, &[CUSTOMER_SEGMENT])?;

    let mut counts = SegmentCounts::default();
    let labels = segments.column(CUSTOMER_SEGMENT)?;
    for label in labels.str()?.into_iter().flatten() {
        match label.parse::<ValueSegment>()? {
            ValueSegment::High => counts.high += 1,
            ValueSegment::Medium => counts.medium += 1,
            ValueSegment::Low => counts.low += 1,
        }
    }

    Ok(counts)
}
