//! Data quality checks with error and warning reporting.
//!
//! This module inspects a raw transaction table before cleaning. It checks for
//! missing columns, null values, duplicate rows, missing customer ids,
//! negative amounts and dates that cannot be parsed.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::models::columns::*;
use crate::models::transaction::DATE_FORMAT;
use crate::transformations::cleaning::{remove_duplicates, KeepStrategy};

/// Individual bad values listed before only the total is reported
const MAX_REPORTED: usize = 5;

/// Quality report with categorized issues and statistics.
///
/// Errors make `is_valid` false, while warnings are informational and don't
/// fail validation.
///
/// # Fields
///
/// * `is_valid` - `false` if any errors were found, `true` otherwise
/// * `errors` - Issues that prevent processing (e.g., missing required columns)
/// * `warnings` - Issues cleaning will repair or that should be reviewed
/// * `stats` - Summary statistics about the validated data
///
/// # Examples
///
/// ```
/// use sales_etl::preprocessing::validator::ValidationResult;
///
/// let mut result = ValidationResult::new();
/// assert!(result.is_valid);
///
/// result.add_error("Missing required column: customer_id".to_string());
/// assert!(!result.is_valid);
/// assert_eq!(result.errors.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub stats: QualityStats,
}

/// Summary statistics computed during validation.
///
/// # Fields
///
/// * `total_rows` - Number of rows inspected
/// * `null_counts` - Null values per column, for every column of the table
/// * `duplicate_rows` - Rows that repeat an earlier row exactly
/// * `missing_customer_ids` - Rows whose customer id is null or blank
/// * `negative_amounts` - Rows with a sales amount below zero
/// * `negative_costs` - Rows with a cost below zero
/// * `negative_quantities` - Rows with a quantity below zero
/// * `unparseable_dates` - Non-null dates that are not `YYYY-MM-DD`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualityStats {
    pub total_rows: usize,
    pub null_counts: BTreeMap<String, usize>,
    pub duplicate_rows: usize,
    pub missing_customer_ids: usize,
    pub negative_amounts: usize,
    pub negative_costs: usize,
    pub negative_quantities: usize,
    pub unparseable_dates: usize,
}

impl ValidationResult {
    /// Creates a new validation result with valid status and empty error/warning lists.
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            stats: QualityStats::default(),
        }
    }

    /// Adds a critical error and marks the result as invalid.
    pub fn add_error(&mut self, error: String) {
        self.is_valid = false;
        self.errors.push(error);
    }

    /// Adds a non-critical warning without invalidating the result.
    ///
    /// ```
    /// use sales_etl::preprocessing::validator::ValidationResult;
    ///
    /// let mut result = ValidationResult::new();
    /// result.add_warning("Found 3 duplicate rows".to_string());
    /// assert!(result.is_valid);  // Still valid despite warning
    /// assert_eq!(result.warnings.len(), 1);
    /// ```
    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

/// Quality validator for raw transaction tables.
///
/// # Examples
///
/// ```
/// use polars::prelude::*;
/// use sales_etl::preprocessing::validator::QualityValidator;
///
/// let df = df!(
///     "customer_id" => ["C1", "C1"],
///     "sales_amount" => [10.0, 10.0],
/// )
/// .unwrap();
///
/// let result = QualityValidator::validate(&df);
/// assert!(result.is_valid);
/// assert_eq!(result.stats.duplicate_rows, 1);
/// ```
pub struct QualityValidator;

impl QualityValidator {
    /// Inspect `df` and report what cleaning would have to repair.
    ///
    /// # Error Conditions
    ///
    /// - Missing required columns (`customer_id`, `sales_amount`)
    ///
    /// Missing optional columns, nulls, duplicates, blank ids, negative values
    /// and unparseable dates are reported as warnings.
    pub fn validate(df: &DataFrame) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.stats.total_rows = df.height();

        for name in REQUIRED {
            if df.column(name).is_err() {
                result.add_error(format!("Missing required column: {}", name));
            }
        }
        for name in ALL {
            if !REQUIRED.contains(&name) && df.column(name).is_err() {
                result.add_warning(format!("Missing optional column: {}", name));
            }
        }

        for column in df.get_columns() {
            result
                .stats
                .null_counts
                .insert(column.name().to_string(), column.null_count());
        }

        if !result.is_valid {
            return result;
        }

        Self::check_duplicates(df, &mut result);
        Self::check_customer_ids(df, &mut result);
        result.stats.negative_amounts = Self::count_negative(df, SALES_AMOUNT);
        result.stats.negative_costs = Self::count_negative(df, COST);
        result.stats.negative_quantities = Self::count_negative(df, QUANTITY);
        Self::check_dates(df, &mut result);

        for (name, nulls) in &result.stats.null_counts.clone() {
            if *nulls > 0 && name != CUSTOMER_ID {
                result.add_warning(format!("Column {} has {} null values", name, nulls));
            }
        }
        if result.stats.negative_amounts > 0 {
            result.add_warning(format!(
                "Found {} negative sales amounts",
                result.stats.negative_amounts
            ));
        }
        if result.stats.negative_costs > 0 {
            result.add_warning(format!("Found {} negative costs", result.stats.negative_costs));
        }
        if result.stats.negative_quantities > 0 {
            result.add_warning(format!(
                "Found {} negative quantities",
                result.stats.negative_quantities
            ));
        }

        result
    }

    fn check_duplicates(df: &DataFrame, result: &mut ValidationResult) {
        if let Ok(unique) = remove_duplicates(df, None, KeepStrategy::First) {
            result.stats.duplicate_rows = df.height() - unique.height();
        }

        if result.stats.duplicate_rows > 0 {
            result.add_warning(format!(
                "Found {} duplicate rows",
                result.stats.duplicate_rows
            ));
        }
    }

    fn check_customer_ids(df: &DataFrame, result: &mut ValidationResult) {
        let ids = match df.column(CUSTOMER_ID).and_then(|c| c.cast(&DataType::String)) {
            Ok(ids) => ids,
            Err(_) => return,
        };

        if let Ok(ids) = ids.str() {
            result.stats.missing_customer_ids = ids
                .into_iter()
                .filter(|id| id.map(|s| s.trim().is_empty()).unwrap_or(true))
                .count();
        }

        if result.stats.missing_customer_ids > 0 {
            result.add_warning(format!(
                "Found {} rows without customer_id",
                result.stats.missing_customer_ids
            ));
        }
    }

    fn count_negative(df: &DataFrame, name: &str) -> usize {
        let values = match df.column(name).and_then(|c| c.cast(&DataType::Float64)) {
            Ok(values) => values,
            Err(_) => return 0,
        };

        match values.f64() {
            Ok(values) => values.into_iter().flatten().filter(|v| *v < 0.0).count(),
            Err(_) => 0,
        }
    }

    fn check_dates(df: &DataFrame, result: &mut ValidationResult) {
        let column = match df.column(TRANSACTION_DATE) {
            Ok(column) => column,
            Err(_) => return,
        };
        if matches!(column.dtype(), DataType::Date | DataType::Datetime(_, _)) {
            return;
        }

        let text = match column.cast(&DataType::String) {
            Ok(text) => text,
            Err(_) => return,
        };
        let Ok(values) = text.str() else {
            return;
        };

        for value in values.into_iter().flatten() {
            if NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).is_err() {
                result.stats.unparseable_dates += 1;
                if result.stats.unparseable_dates <= MAX_REPORTED {
                    result.add_warning(format!("Unparseable transaction_date: {:?}", value));
                }
            }
        }

        if result.stats.unparseable_dates > MAX_REPORTED {
            result.add_warning(format!(
                "Total unparseable dates: {} (showing first {})",
                result.stats.unparseable_dates, MAX_REPORTED
            ));
        }
    }
}
