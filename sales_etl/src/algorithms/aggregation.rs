use polars::prelude::*;

use crate::error::EtlResult;
use crate::models::columns::*;
use crate::models::transaction::{has_column, require_columns};
use crate::transformations::cleaning::parse_dates;

pub const TOTAL_SALES: &str = "total_sales";
pub const AVG_SALE: &str = "avg_sale";
pub const TOTAL_PROFIT: &str = "total_profit";
pub const TOTAL_QUANTITY: &str = "total_quantity";
pub const TRANSACTIONS: &str = "transactions";
pub const UNIQUE_CUSTOMERS: &str = "unique_customers";

/// Summarise sales per distinct value of `key`.
///
/// Always produces `total_sales`, `avg_sale` and `transactions`; adds
/// `total_profit`, `total_quantity` and `unique_customers` when the source
/// columns exist. Sorted by total sales (largest first), ties by key.
pub fn summarize_by(df: &DataFrame, key: &str) -> EtlResult<DataFrame> {
    require_columns(df, &[key, SALES_AMOUNT])?;

    let mut aggs = vec![
        col(SALES_AMOUNT).sum().alias(TOTAL_SALES),
        col(SALES_AMOUNT).mean().alias(AVG_SALE),
        len().alias(TRANSACTIONS),
    ];
    if has_column(df, PROFIT) {
        aggs.push(col(PROFIT).sum().alias(TOTAL_PROFIT));
    }
    if has_column(df, QUANTITY) {
        aggs.push(col(QUANTITY).sum().alias(TOTAL_QUANTITY));
    }
    if has_column(df, CUSTOMER_ID) && key != CUSTOMER_ID {
        aggs.push(col(CUSTOMER_ID).n_unique().alias(UNIQUE_CUSTOMERS));
    }

    Ok(df
        .clone()
        .lazy()
        .group_by([col(key)])
        .agg(aggs)
        .sort(
            [TOTAL_SALES, key],
            SortMultipleOptions::default().with_order_descending_multi([true, false]),
        )
        .collect()?)
}

/// Sales summary per region
pub fn sales_by_region(df: &DataFrame) -> EtlResult<DataFrame> {
    summarize_by(df, REGION)
}

/// Sales summary per product category
pub fn sales_by_category(df: &DataFrame) -> EtlResult<DataFrame> {
    summarize_by(df, PRODUCT_CATEGORY)
}

/// Total sales and transaction count per calendar month, oldest first.
///
/// Rows without a date are left out.
pub fn monthly_trend(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[TRANSACTION_DATE, SALES_AMOUNT])?;
    let df = parse_dates(df)?;

    Ok(df
        .lazy()
        .filter(col(TRANSACTION_DATE).is_not_null())
        .group_by([
            col(TRANSACTION_DATE).dt().year().alias(YEAR),
            col(TRANSACTION_DATE).dt().month().alias(MONTH),
        ])
        .agg([
            col(SALES_AMOUNT).sum().alias(TOTAL_SALES),
            len().alias(TRANSACTIONS),
        ])
        .sort([YEAR, MONTH], SortMultipleOptions::default())
        .collect()?)
}

/// Pivot `values` into one column per distinct value of `columns`.
///
/// One row per `index` value (sorted), cells hold the sum of `values`, and
/// combinations with no rows are zero. Null pivot values are skipped. A pivot
/// value equal to the `index` name is written as `<columns>_<value>`.
pub fn pivot_sales(
    df: &DataFrame,
    index: &str,
    columns: &str,
    values: &str,
) -> EtlResult<DataFrame> {
    require_columns(df, &[index, columns, values])?;

    let keys = df.column(columns)?.cast(&DataType::String)?;
    let mut names: Vec<String> = keys
        .str()?
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect();
    names.sort();
    names.dedup();

    let pivot_key = col(columns).cast(DataType::String);
    let cells: Vec<Expr> = names
        .iter()
        .map(|name| {
            let alias = if name == index {
                format!("{}_{}", columns, name)
            } else {
                name.clone()
            };
            col(values)
                .filter(pivot_key.clone().eq(lit(name.as_str())))
                .sum()
                .alias(alias)
        })
        .collect();

    Ok(df
        .clone()
        .lazy()
        .group_by([col(index)])
        .agg(cells)
        .sort([index], SortMultipleOptions::default())
        .collect()?)
}

/// Top `n` rows ordered by `by`, largest first
pub fn top_n(df: &DataFrame, by: &str, n: usize) -> EtlResult<DataFrame> {
    require_columns(df, &[by])?;
    if n == 0 {
        return Ok(df.clear());
    }

    let sorted = df.sort(
        [by],
        SortMultipleOptions::default()
            .with_order_descending(true)
            .with_nulls_last(true),
    )?;
    Ok(sorted.head(Some(n)))
}
