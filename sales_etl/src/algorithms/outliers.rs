//! Interquartile-range outlier fences.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::quantile::QuantileSummary;
use crate::error::{EtlError, EtlResult};
use crate::models::columns::IS_OUTLIER;
use crate::models::transaction::require_columns;

/// Tukey's fence multiplier
pub const DEFAULT_MULTIPLIER: f64 = 1.5;

/// Quartiles of a numeric column and the fence derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Compute bounds with the standard 1.5 × IQR fence.
    ///
    /// Returns `Ok(None)` when there are no (non-NaN) values.
    pub fn compute<I>(values: I, relative_error: f64) -> EtlResult<Option<Self>>
    where
        I: IntoIterator<Item = f64>,
    {
        Self::with_multiplier(values, relative_error, DEFAULT_MULTIPLIER)
    }

    /// Compute bounds with a custom fence multiplier.
    pub fn with_multiplier<I>(
        values: I,
        relative_error: f64,
        multiplier: f64,
    ) -> EtlResult<Option<Self>>
    where
        I: IntoIterator<Item = f64>,
    {
        if !multiplier.is_finite() || multiplier < 0.0 {
            return Err(EtlError::invalid_argument(format!(
                "Fence multiplier must be a non-negative number, got {}",
                multiplier
            )));
        }

        let summary = QuantileSummary::from_values(values, relative_error)?;
        let quartiles = summary.query_many(&[0.25, 0.75]);

        match (quartiles[0], quartiles[1]) {
            (Some(q1), Some(q3)) => Ok(Some(Self::from_quartiles(q1, q3, multiplier))),
            _ => Ok(None),
        }
    }

    pub fn from_quartiles(q1: f64, q3: f64, multiplier: f64) -> Self {
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    /// True when `value` lies inside `[lower, upper]`.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn is_outlier(&self, value: f64) -> bool {
        !value.is_nan() && !self.contains(value)
    }

    fn outlier_expr(&self, column: &str) -> Expr {
        let value = col(column).cast(DataType::Float64).fill_nan(lit(NULL));
        value
            .clone()
            .lt(lit(self.lower))
            .or(value.gt(lit(self.upper)))
            .fill_null(lit(false))
    }
}

/// Non-null values of a column as `f64`
pub fn column_values(df: &DataFrame, column: &str) -> EtlResult<Vec<f64>> {
    require_columns(df, &[column])?;
    let values = df.column(column)?.cast(&DataType::Float64)?;
    Ok(values.f64()?.into_iter().flatten().collect())
}

/// Compute the outlier fence of one column.
pub fn column_bounds(
    df: &DataFrame,
    column: &str,
    relative_error: f64,
    multiplier: f64,
) -> EtlResult<Option<OutlierBounds>> {
    let values = column_values(df, column)?;
    OutlierBounds::with_multiplier(values, relative_error, multiplier)
}

/// Add a boolean `is_outlier` column for `column`.
///
/// Nulls are never flagged. An existing `is_outlier` column is replaced, so
/// flagging twice gives the same result. Returns the frame together with the
/// bounds used, or `None` bounds when the column has no values.
pub fn flag_outliers(
    df: &DataFrame,
    column: &str,
    relative_error: f64,
    multiplier: f64,
) -> EtlResult<(DataFrame, Option<OutlierBounds>)> {
    let bounds = column_bounds(df, column, relative_error, multiplier)?;

    let flag = match &bounds {
        Some(bounds) => bounds.outlier_expr(column),
        None => lit(false),
    };

    let flagged = df
        .clone()
        .lazy()
        .with_column(flag.alias(IS_OUTLIER))
        .collect()?;

    if let Some(b) = &bounds {
        log::debug!(
            "Outlier fence for {}: q1={} q3={} bounds=[{}, {}]",
            column,
            b.q1,
            b.q3,
            b.lower,
            b.upper
        );
    }

    Ok((flagged, bounds))
}

/// Keep only the rows inside the fence (and rows where `column` is null or NaN).
pub fn remove_outliers(
    df: &DataFrame,
    column: &str,
    relative_error: f64,
    multiplier: f64,
) -> EtlResult<DataFrame> {
    let bounds = match column_bounds(df, column, relative_error, multiplier)? {
        Some(bounds) => bounds,
        None => return Ok(df.clone()),
    };

    Ok(df
        .clone()
        .lazy()
        .filter(bounds.outlier_expr(column).not())
        .collect()?)
}
