//! Per-partition window computations.
//!
//! None of these collapse rows: every function returns the input rows with one
//! extra column. Customer-level windows sort by customer, then by date, and
//! return the frame in that order.

use polars::prelude::*;

use crate::error::{EtlError, EtlResult};
use crate::models::columns::*;
use crate::models::transaction::{has_column, require_columns};
use crate::transformations::cleaning::parse_dates;

pub const RANK: &str = "rank";
pub const RUNNING_TOTAL: &str = "running_total";
pub const PREVIOUS_SALES: &str = "previous_sales_amount";
pub const MOVING_AVERAGE: &str = "moving_avg_sales";

/// Dense rank of `order_by` within each `partition`, written to `rank`.
///
/// Rank 1 is the smallest value, or the largest when `descending`.
pub fn rank_within(
    df: &DataFrame,
    partition: &str,
    order_by: &str,
    descending: bool,
) -> EtlResult<DataFrame> {
    require_columns(df, &[partition, order_by])?;

    let rank = col(order_by)
        .rank(
            RankOptions {
                method: RankMethod::Dense,
                descending,
            },
            None,
        )
        .over([col(partition)]);

    Ok(df.clone().lazy().with_column(rank.alias(RANK)).collect()?)
}

/// The `n` rows with the largest `order_by` in every `partition`.
///
/// Ties keep input order and null `order_by` values rank last. Output is
/// sorted by partition, then by `order_by` descending.
pub fn top_n_per_group(
    df: &DataFrame,
    partition: &str,
    order_by: &str,
    n: usize,
) -> EtlResult<DataFrame> {
    require_columns(df, &[partition, order_by])?;

    let sorted = df.sort(
        [partition, order_by],
        SortMultipleOptions::default()
            .with_order_descending_multi([false, true])
            .with_nulls_last(true)
            .with_maintain_order(true),
    )?;

    let columns: Vec<Expr> = df
        .get_column_names()
        .into_iter()
        .map(|name| col(name.clone()))
        .collect();

    Ok(sorted
        .lazy()
        .group_by_stable([col(partition)])
        .head(Some(n))
        .select(columns)
        .collect()?)
}

/// Cumulative `sales_amount` per customer in date order.
pub fn running_total(df: &DataFrame) -> EtlResult<DataFrame> {
    let sorted = sort_by_customer_date(df)?;

    Ok(sorted
        .lazy()
        .with_column(
            col(SALES_AMOUNT)
                .cum_sum(false)
                .over([col(CUSTOMER_ID)])
                .alias(RUNNING_TOTAL),
        )
        .collect()?)
}

/// The customer's previous `sales_amount`; null on their first purchase.
pub fn previous_purchase(df: &DataFrame) -> EtlResult<DataFrame> {
    let sorted = sort_by_customer_date(df)?;

    Ok(sorted
        .lazy()
        .with_column(
            col(SALES_AMOUNT)
                .shift(lit(1))
                .over([col(CUSTOMER_ID)])
                .alias(PREVIOUS_SALES),
        )
        .collect()?)
}

/// Trailing mean of `sales_amount` over the customer's last `window` rows.
///
/// The first rows of each customer use a partial window. Null amounts are
/// skipped; a window with no values gives null.
pub fn moving_average(df: &DataFrame, window: usize) -> EtlResult<DataFrame> {
    if window == 0 {
        return Err(EtlError::invalid_argument(
            "Moving average window must be at least 1",
        ));
    }

    let sorted = sort_by_customer_date(df)?;
    let options = RollingOptionsFixedWindow {
        window_size: window,
        min_periods: 1,
        ..Default::default()
    };

    Ok(sorted
        .lazy()
        .with_column(
            col(SALES_AMOUNT)
                .cast(DataType::Float64)
                .rolling_mean(options)
                .over([col(CUSTOMER_ID)])
                .alias(MOVING_AVERAGE),
        )
        .collect()?)
}

fn sort_by_customer_date(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[CUSTOMER_ID, SALES_AMOUNT])?;

    let options = SortMultipleOptions::default()
        .with_nulls_last(true)
        .with_maintain_order(true);

    if has_column(df, TRANSACTION_DATE) {
        let df = parse_dates(df)?;
        Ok(df.sort([CUSTOMER_ID, TRANSACTION_DATE], options)?)
    } else {
        Ok(df.sort([CUSTOMER_ID], options)?)
    }
}
