//! Customer value-segment labels and thresholds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::EtlError;

/// Value tier of a customer, derived from their total purchase amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ValueSegment {
    #[serde(rename = "High Value")]
    High,
    #[serde(rename = "Medium Value")]
    Medium,
    #[serde(rename = "Low Value")]
    Low,
}

impl ValueSegment {
    pub const ALL: [ValueSegment; 3] = [ValueSegment::High, ValueSegment::Medium, ValueSegment::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            ValueSegment::High => "High Value",
            ValueSegment::Medium => "Medium Value",
            ValueSegment::Low => "Low Value",
        }
    }
}

impl fmt::Display for ValueSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueSegment {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "High Value" => Ok(ValueSegment::High),
            "Medium Value" => Ok(ValueSegment::Medium),
            "Low Value" => Ok(ValueSegment::Low),
            other => Err(EtlError::invalid_argument(format!(
                "Unknown value segment: '{}'. Must be 'High Value', 'Medium Value', or 'Low Value'",
                other
            ))),
        }
    }
}

/// Lower bounds (exclusive) of the High and Medium tiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SegmentThresholds {
    #[serde(default = "default_high")]
    pub high: f64,
    #[serde(default = "default_medium")]
    pub medium: f64,
}

fn default_high() -> f64 {
    1000.0
}

fn default_medium() -> f64 {
    500.0
}

impl SegmentThresholds {
    pub fn new(high: f64, medium: f64) -> Result<Self, EtlError> {
        let thresholds = Self { high, medium };
        thresholds.validate()?;
        Ok(thresholds)
    }

    /// Both thresholds must be finite and `medium <= high`.
    pub fn validate(&self) -> Result<(), EtlError> {
        if !self.high.is_finite() || !self.medium.is_finite() {
            return Err(EtlError::invalid_argument(
                "Segment thresholds must be finite numbers",
            ));
        }
        if self.medium > self.high {
            return Err(EtlError::invalid_argument(format!(
                "Medium threshold ({}) must not exceed high threshold ({})",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

impl Default for SegmentThresholds {
    fn default() -> Self {
        Self {
            high: default_high(),
            medium: default_medium(),
        }
    }
}
