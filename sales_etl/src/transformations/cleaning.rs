use polars::prelude::*;
use std::str::FromStr;

use crate::error::{EtlError, EtlResult};
use crate::models::columns::*;
use crate::models::transaction::{has_column, require_columns, DATE_FORMAT};

/// Replacement for missing category and region labels
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Which occurrence of a duplicated row survives deduplication
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepStrategy {
    First,
    Last,
    /// Drop every row that has a duplicate
    None,
}

impl FromStr for KeepStrategy {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "first" => Ok(KeepStrategy::First),
            "last" => Ok(KeepStrategy::Last),
            "none" => Ok(KeepStrategy::None),
            _ => Err(EtlError::invalid_argument(format!(
                "Invalid keep strategy: {}. Must be 'first', 'last', or 'none'",
                s
            ))),
        }
    }
}

fn row_key(names: &[String]) -> Expr {
    if names.len() == 1 {
        col(names[0].as_str())
    } else {
        as_struct(names.iter().map(|name| col(name.as_str())).collect())
    }
}

/// Remove duplicate rows, comparing either all columns or `subset`.
///
/// Row order of the survivors is preserved.
pub fn remove_duplicates(
    df: &DataFrame,
    subset: Option<&[&str]>,
    keep: KeepStrategy,
) -> EtlResult<DataFrame> {
    let names: Vec<String> = match subset {
        Some(cols) => {
            require_columns(df, cols)?;
            cols.iter().map(|name| name.to_string()).collect()
        }
        None => df
            .get_column_names()
            .iter()
            .map(|name| name.to_string())
            .collect(),
    };

    if df.height() == 0 || names.is_empty() {
        return Ok(df.clone());
    }

    let key = row_key(&names);
    let mask = match keep {
        KeepStrategy::First => key.is_first_distinct(),
        KeepStrategy::Last => key.is_last_distinct(),
        KeepStrategy::None => key.is_unique(),
    };

    Ok(df.clone().lazy().filter(mask).collect()?)
}

/// Remove rows whose customer id is null or blank
pub fn drop_missing_customers(df: &DataFrame) -> EtlResult<DataFrame> {
    require_columns(df, &[CUSTOMER_ID])?;

    let id = col(CUSTOMER_ID).cast(DataType::String);
    let mask = id.clone().is_not_null().and(id.neq(lit("")));
    Ok(df.clone().lazy().filter(mask).collect()?)
}

/// Replace nulls with defaults: zero for numbers, `"Unknown"` for labels.
///
/// Columns absent from the frame are skipped.
pub fn fill_missing(df: &DataFrame) -> EtlResult<DataFrame> {
    let mut fills = Vec::new();

    for name in [SALES_AMOUNT, COST] {
        if has_column(df, name) {
            fills.push(col(name).fill_null(lit(0.0)));
        }
    }

    if has_column(df, QUANTITY) {
        fills.push(col(QUANTITY).fill_null(lit(0i64)));
    }

    for name in [PRODUCT_CATEGORY, REGION] {
        if has_column(df, name) {
            fills.push(col(name).fill_null(lit(UNKNOWN_LABEL)));
        }
    }

    if fills.is_empty() {
        return Ok(df.clone());
    }

    Ok(df.clone().lazy().with_columns(fills).collect()?)
}

/// Strip surrounding whitespace from text columns; blank values become null.
pub fn trim_text_columns(df: &DataFrame) -> EtlResult<DataFrame> {
    let mut trims = Vec::new();

    for name in TEXT {
        let is_text = df
            .column(name)
            .map(|c| c.dtype() == &DataType::String)
            .unwrap_or(false);
        if !is_text {
            continue;
        }

        let trimmed = col(name).str().strip_chars(lit(NULL));
        trims.push(
            when(trimmed.clone().eq(lit("")))
                .then(lit(NULL).cast(DataType::String))
                .otherwise(trimmed)
                .alias(name),
        );
    }

    if trims.is_empty() {
        return Ok(df.clone());
    }

    Ok(df.clone().lazy().with_columns(trims).collect()?)
}

/// Convert `transaction_date` text (`%Y-%m-%d`) to a Date column.
///
/// Values that do not parse become null. Frames whose column is already a
/// Date, or that have no date column, are returned unchanged.
pub fn parse_dates(df: &DataFrame) -> EtlResult<DataFrame> {
    let column = match df.column(TRANSACTION_DATE) {
        Ok(column) => column,
        Err(_) => return Ok(df.clone()),
    };

    let parsed = match column.dtype() {
        DataType::Date => return Ok(df.clone()),
        DataType::Datetime(_, _) => col(TRANSACTION_DATE).cast(DataType::Date),
        _ => col(TRANSACTION_DATE)
            .cast(DataType::String)
            .str()
            .strip_chars(lit(NULL))
            .str()
            .to_date(StrptimeOptions {
                format: Some(DATE_FORMAT.into()),
                strict: false,
                ..Default::default()
            }),
    };

    Ok(df
        .clone()
        .lazy()
        .with_column(parsed.alias(TRANSACTION_DATE))
        .collect()?)
}

/// Drop rows with negative amounts, costs or quantities.
///
/// Nulls are not considered invalid here; they are handled by [`fill_missing`].
pub fn remove_invalid_rows(df: &DataFrame) -> EtlResult<DataFrame> {
    let mut mask: Option<Expr> = None;

    for name in [SALES_AMOUNT, COST, QUANTITY] {
        if !has_column(df, name) {
            continue;
        }
        let valid = col(name).gt_eq(lit(0)).or(col(name).is_null());
        mask = Some(match mask {
            Some(existing) => existing.and(valid),
            None => valid,
        });
    }

    match mask {
        Some(mask) => Ok(df.clone().lazy().filter(mask).collect()?),
        None => Ok(df.clone()),
    }
}

/// Full cleaning pass over a transaction table.
///
/// Order: trim text -> drop rows without customer -> fill missing values ->
/// parse dates -> drop exact duplicates (first kept) -> drop invalid rows.
pub fn clean(df: &DataFrame) -> EtlResult<DataFrame> {
    let input_rows = df.height();

    let df = trim_text_columns(df)?;
    let df = drop_missing_customers(&df)?;
    let without_customer = input_rows - df.height();

    let df = fill_missing(&df)?;
    let df = parse_dates(&df)?;

    let before_dedup = df.height();
    let df = remove_duplicates(&df, None, KeepStrategy::First)?;
    let duplicates = before_dedup - df.height();

    let before_invalid = df.height();
    let df = remove_invalid_rows(&df)?;
    let invalid = before_invalid - df.height();

    log::info!(
        "Cleaning: {} -> {} rows ({} without customer, {} duplicates, {} invalid)",
        input_rows,
        df.height(),
        without_customer,
        duplicates,
        invalid
    );

    Ok(df)
}
