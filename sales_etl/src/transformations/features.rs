//! Derived business columns.

use polars::prelude::*;

use crate::error::EtlResult;
use crate::models::columns::*;
use crate::models::transaction::{has_column, require_columns};
use crate::transformations::cleaning::parse_dates;

fn null_f64() -> Expr {
    lit(NULL).cast(DataType::Float64)
}

/// Add `profit` and `profit_margin`.
///
/// The margin is null for zero-value sales.
pub fn add_profit(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[SALES_AMOUNT, COST])?;

    let profit = col(SALES_AMOUNT) - col(COST);
    let margin = when(col(SALES_AMOUNT).neq(lit(0.0)))
        .then(profit.clone() / col(SALES_AMOUNT))
        .otherwise(null_f64());

    Ok(df
        .clone()
        .lazy()
        .with_columns([profit.alias(PROFIT), margin.alias(PROFIT_MARGIN)])
        .collect()?)
}

/// Add `unit_price`, null where quantity is not positive.
pub fn add_unit_price(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[SALES_AMOUNT, QUANTITY])?;

    let unit_price = when(col(QUANTITY).gt(lit(0)))
        .then(col(SALES_AMOUNT) / col(QUANTITY).cast(DataType::Float64))
        .otherwise(null_f64());

    Ok(df
        .clone()
        .lazy()
        .with_column(unit_price.alias(UNIT_PRICE))
        .collect()?)
}

/// Add calendar `year` and `month` from the transaction date.
pub fn add_date_parts(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[TRANSACTION_DATE])?;
    let df = parse_dates(df)?;

    Ok(df
        .lazy()
        .with_columns([
            col(TRANSACTION_DATE).dt().year().alias(YEAR),
            col(TRANSACTION_DATE).dt().month().alias(MONTH),
        ])
        .collect()?)
}

/// Apply every feature whose source columns are present.
pub fn add_features(df: &DataFrame) -> EtlResult<DataFrame> {
    let mut out = df.clone();

    if has_column(&out, SALES_AMOUNT) && has_column(&out, COST) {
        out = add_profit(&out)?;
    }
    if has_column(&out, SALES_AMOUNT) && has_column(&out, QUANTITY) {
        out = add_unit_price(&out)?;
    }
    if has_column(&out, TRANSACTION_DATE) {
        out = add_date_parts(&out)?;
    }

    log::debug!("Feature columns added, width {} -> {}", df.width(), out.width());
    Ok(out)
}
