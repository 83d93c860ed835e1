//! Approximate quantiles with a bounded rank error.
//!
//! [`QuantileSummary`] keeps a Greenwald-Khanna style summary: a sorted list
//! of sampled values, each carrying the number of observations it stands for
//! (`g`) and the uncertainty of its rank (`delta`). A query for quantile `p`
//! over `n` values returns a value whose rank is within `relative_error * n`
//! of `ceil(p * n)`. With a relative error of zero every value is kept and
//! answers are exact.

use crate::error::{EtlError, EtlResult};

/// Values buffered before they are merged into the sampled list
const HEAD_CAPACITY: usize = 50_000;

/// Sample count above which a merge triggers compression
const COMPRESS_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Sample {
    value: f64,
    g: u64,
    delta: u64,
}

/// Streaming quantile summary.
///
/// # Examples
///
/// ```
/// use sales_etl::algorithms::quantile::QuantileSummary;
///
/// let summary = QuantileSummary::from_values([10.0, 20.0, 20.0, 30.0, 30.0, 30.0, 40.0, 200.0], 0.05)
///     .unwrap();
/// assert_eq!(summary.query(0.25), Some(20.0));
/// assert_eq!(summary.query(0.75), Some(30.0));
/// ```
#[derive(Debug, Clone)]
pub struct QuantileSummary {
    relative_error: f64,
    head: Vec<f64>,
    samples: Vec<Sample>,
    count: u64,
}

impl QuantileSummary {
    /// Create an empty summary. `relative_error` must lie in `[0, 1)`.
    pub fn new(relative_error: f64) -> EtlResult<Self> {
        if !(0.0..1.0).contains(&relative_error) {
            return Err(EtlError::invalid_argument(format!(
                "Relative error must be in [0, 1), got {}",
                relative_error
            )));
        }

        Ok(Self {
            relative_error,
            head: Vec::new(),
            samples: Vec::new(),
            count: 0,
        })
    }

    /// Build a compressed summary from an iterator of values. NaN values are skipped.
    pub fn from_values<I>(values: I, relative_error: f64) -> EtlResult<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let mut summary = Self::new(relative_error)?;
        summary.extend(values);
        summary.compress();
        Ok(summary)
    }

    pub fn relative_error(&self) -> f64 {
        self.relative_error
    }

    /// Number of values inserted so far
    pub fn count(&self) -> u64 {
        self.count + self.head.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Number of retained samples, excluding buffered values
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Add one observation. NaN is ignored.
    pub fn insert(&mut self, value: f64) {
        if value.is_nan() {
            return;
        }

        self.head.push(value);
        if self.head.len() >= HEAD_CAPACITY {
            self.flush_head();
            if self.samples.len() >= COMPRESS_THRESHOLD {
                self.compress();
            }
        }
    }

    pub fn extend<I>(&mut self, values: I)
    where
        I: IntoIterator<Item = f64>,
    {
        for value in values {
            self.insert(value);
        }
    }

    fn merge_threshold(&self) -> u64 {
        (2.0 * self.relative_error * self.count as f64).floor() as u64
    }

    /// Merge the buffered values into the sampled list.
    fn flush_head(&mut self) {
        if self.head.is_empty() {
            return;
        }

        let mut sorted = std::mem::take(&mut self.head);
        sorted.sort_by(f64::total_cmp);

        let mut merged = Vec::with_capacity(self.samples.len() + sorted.len());
        let mut idx = 0;
        let last = sorted.len() - 1;

        for (i, value) in sorted.into_iter().enumerate() {
            while idx < self.samples.len() && self.samples[idx].value <= value {
                merged.push(self.samples[idx]);
                idx += 1;
            }

            self.count += 1;
            // New extremes have an exactly known rank
            let is_new_min = merged.is_empty();
            let is_new_max = idx == self.samples.len() && i == last;
            let delta = if is_new_min || is_new_max {
                0
            } else {
                self.merge_threshold()
            };

            merged.push(Sample { value, g: 1, delta });
        }

        merged.extend_from_slice(&self.samples[idx..]);
        self.samples = merged;
    }

    /// Flush buffered values and merge neighbouring samples whose combined
    /// rank uncertainty stays below `2 * relative_error * count`.
    ///
    /// The minimum and maximum samples are always retained.
    pub fn compress(&mut self) {
        self.flush_head();

        let threshold = self.merge_threshold();
        if self.samples.len() <= 2 || threshold == 0 {
            return;
        }

        let last = self.samples.len() - 1;
        let mut compressed = Vec::with_capacity(self.samples.len());
        let mut head = self.samples[last];

        for i in (1..last).rev() {
            let sample = self.samples[i];
            if sample.g + head.g + head.delta < threshold {
                head.g += sample.g;
            } else {
                compressed.push(head);
                head = sample;
            }
        }

        compressed.push(head);
        compressed.push(self.samples[0]);
        compressed.reverse();
        self.samples = compressed;
    }

    /// Approximate `quantile` in `[0, 1]`.
    ///
    /// Returns `None` for an empty summary or a quantile outside `[0, 1]`.
    pub fn query(&self, quantile: f64) -> Option<f64> {
        if !(0.0..=1.0).contains(&quantile) {
            return None;
        }

        if !self.head.is_empty() {
            let mut flushed = self.clone();
            flushed.flush_head();
            return flushed.query(quantile);
        }

        let first = self.samples.first()?;
        let last = self.samples.last()?;

        if quantile <= self.relative_error {
            return Some(first.value);
        }
        if quantile >= 1.0 - self.relative_error {
            return Some(last.value);
        }

        let rank = (quantile * self.count as f64).ceil();
        let allowed = rank + self.relative_error * self.count as f64;

        // The answer is the last sample whose maximum possible rank does
        // not overshoot the target by more than the allowed error.
        let mut min_rank = 0u64;
        let mut previous = first;
        for sample in &self.samples {
            min_rank += sample.g;
            let max_rank = (min_rank + sample.delta) as f64;
            if max_rank > allowed {
                return Some(previous.value);
            }
            previous = sample;
        }

        Some(last.value)
    }

    /// Query several quantiles at once.
    pub fn query_many(&self, quantiles: &[f64]) -> Vec<Option<f64>> {
        if self.head.is_empty() {
            return quantiles.iter().map(|&q| self.query(q)).collect();
        }

        let mut flushed = self.clone();
        flushed.flush_head();
        quantiles.iter().map(|&q| flushed.query(q)).collect()
    }
}
