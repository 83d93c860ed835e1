use chrono::NaiveDate;
use polars::prelude::*;

use crate::error::{EtlError, EtlResult};
use crate::models::columns::*;
use crate::models::transaction::{date_to_days, require_columns};
use crate::transformations::cleaning::parse_dates;

/// Filter rows by a single column condition (string equality)
pub fn filter_by_column(df: &DataFrame, column: &str, value: &str) -> EtlResult<DataFrame> {
    require_columns(df, &[column])?;

    Ok(df
        .clone()
        .lazy()
        .filter(col(column).cast(DataType::String).eq(lit(value)))
        .collect()?)
}

/// Filter rows by region
pub fn filter_by_region(df: &DataFrame, region: &str) -> EtlResult<DataFrame> {
    filter_by_column(df, REGION, region)
}

/// Filter rows by product category
pub fn filter_by_category(df: &DataFrame, category: &str) -> EtlResult<DataFrame> {
    filter_by_column(df, PRODUCT_CATEGORY, category)
}

/// Filter rows by numeric range (inclusive on both ends)
pub fn filter_by_range(
    df: &DataFrame,
    column: &str,
    min_value: f64,
    max_value: f64,
) -> EtlResult<DataFrame> {
    require_columns(df, &[column])?;
    if min_value > max_value {
        return Err(EtlError::invalid_argument(format!(
            "Invalid range: min {} is greater than max {}",
            min_value, max_value
        )));
    }

    let value = col(column).cast(DataType::Float64);
    Ok(df
        .clone()
        .lazy()
        .filter(
            value
                .clone()
                .gt_eq(lit(min_value))
                .and(value.lt_eq(lit(max_value))),
        )
        .collect()?)
}

/// Filter rows whose transaction date lies in `[start, end]`.
///
/// Text dates are parsed first; rows with an unknown date are dropped.
pub fn filter_by_date_range(
    df: &DataFrame,
    start: NaiveDate,
    end: NaiveDate,
) -> EtlResult<DataFrame> {
    require_columns(df, &[TRANSACTION_DATE])?;
    if start > end {
        return Err(EtlError::invalid_argument(format!(
            "Invalid date range: {} is after {}",
            start, end
        )));
    }

    let df = parse_dates(df)?;
    let days = col(TRANSACTION_DATE).cast(DataType::Int32);

    Ok(df
        .lazy()
        .filter(
            days.clone()
                .gt_eq(lit(date_to_days(start)))
                .and(days.lt_eq(lit(date_to_days(end)))),
        )
        .collect()?)
}
