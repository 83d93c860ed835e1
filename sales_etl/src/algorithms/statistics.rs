#![allow(clippy::manual_is_multiple_of)]

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::algorithms::outliers::column_values;
use crate::error::EtlResult;

/// Descriptive statistics of a numeric column
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
    pub sum: f64,
}

/// Compute statistics for a set of values.
/// Calculates mean, median, population standard deviation, min, max, and sum.
pub fn compute_stats(values: &[f64]) -> DistributionStats {
    if values.is_empty() {
        return DistributionStats {
            count: 0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            min: 0.0,
            max: 0.0,
            sum: 0.0,
        };
    }

    let count = values.len();
    let sum: f64 = values.iter().sum();
    let mean = sum / count as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let median = if count % 2 == 0 {
        (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
    } else {
        sorted[count / 2]
    };

    let variance = values
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / count as f64;
    let std_dev = variance.sqrt();

    let min = sorted.first().copied().unwrap_or(0.0);
    let max = sorted.last().copied().unwrap_or(0.0);

    DistributionStats {
        count,
        mean,
        median,
        std_dev,
        min,
        max,
        sum,
    }
}

/// Statistics of the non-null values of a DataFrame column.
pub fn column_stats(df: &DataFrame, column: &str) -> EtlResult<DistributionStats> {
    let values = column_values(df, column)?;
    Ok(compute_stats(&values))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_stats() {
        let values = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let stats = compute_stats(&values);

        assert_eq!(stats.count, 5);
        assert_eq!(stats.mean, 3.0);
        assert_eq!(stats.median, 3.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 5.0);
        assert_eq!(stats.sum, 15.0);
        assert!((stats.std_dev - std::f64::consts::SQRT_2).abs() < 0.001);
    }

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(&[]);

        assert_eq!(stats.count, 0);
        assert_eq!(stats.mean, 0.0);
    }

    #[test]
    fn test_column_stats_ignores_nulls() {
        let df = df!("sales_amount" => [Some(10.0), None, Some(30.0), Some(20.0)]).unwrap();
        let stats = column_stats(&df, "sales_amount").unwrap();

        assert_eq!(stats.count, 3);
        assert_eq!(stats.median, 20.0);
        assert_eq!(stats.sum, 60.0);
    }
}
