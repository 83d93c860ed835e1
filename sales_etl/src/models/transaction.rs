//! Transaction table schema and typed rows.
//!
//! The ETL works on `polars` DataFrames; [`Transaction`] is the typed view of a
//! single row, used to build small tables and to inspect results.

use chrono::{Duration, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{EtlError, EtlResult};

/// Column names used across the crate.
pub mod columns {
    pub const CUSTOMER_ID: &str = "customer_id";
    pub const TRANSACTION_DATE: &str = "transaction_date";
    pub const PRODUCT_CATEGORY: &str = "product_category";
    pub const SALES_AMOUNT: &str = "sales_amount";
    pub const QUANTITY: &str = "quantity";
    pub const COST: &str = "cost";
    pub const REGION: &str = "region";

    /// Source columns in canonical order
    pub const ALL: [&str; 7] = [
        CUSTOMER_ID,
        TRANSACTION_DATE,
        PRODUCT_CATEGORY,
        SALES_AMOUNT,
        QUANTITY,
        COST,
        REGION,
    ];

    /// Columns without which a file cannot be processed at all
    pub const REQUIRED: [&str; 2] = [CUSTOMER_ID, SALES_AMOUNT];

    /// Free-text columns
    pub const TEXT: [&str; 3] = [CUSTOMER_ID, PRODUCT_CATEGORY, REGION];

    // Derived columns
    pub const PROFIT: &str = "profit";
    pub const PROFIT_MARGIN: &str = "profit_margin";
    pub const UNIT_PRICE: &str = "unit_price";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const IS_OUTLIER: &str = "is_outlier";
    pub const TOTAL_PURCHASE: &str = "total_purchase";
    pub const ORDER_COUNT: &str = "order_count";
    pub const CUSTOMER_SEGMENT: &str = "customer_segment";
}

/// Text format of `transaction_date` in source files
pub const DATE_FORMAT: &str = "%Y-%m-%d";

use columns::*;

/// A single retail transaction.
///
/// Every field except the customer id is optional because source files are
/// allowed to carry nulls; cleaning replaces them with defaults.
///
/// # Examples
///
/// ```
/// use sales_etl::models::Transaction;
///
/// let tx = Transaction::new("C001", 250.0).with_cost(100.0).with_quantity(2);
/// assert_eq!(tx.profit(), Some(150.0));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub customer_id: String,
    pub transaction_date: Option<NaiveDate>,
    pub product_category: Option<String>,
    pub sales_amount: Option<f64>,
    pub quantity: Option<i64>,
    pub cost: Option<f64>,
    pub region: Option<String>,
}

impl Transaction {
    pub fn new(customer_id: impl Into<String>, sales_amount: f64) -> Self {
        Self {
            customer_id: customer_id.into(),
            transaction_date: None,
            product_category: None,
            sales_amount: Some(sales_amount),
            quantity: None,
            cost: None,
            region: None,
        }
    }

    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.product_category = Some(category.into());
        self
    }

    pub fn with_quantity(mut self, quantity: i64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    /// Sales amount minus cost, when both are known.
    pub fn profit(&self) -> Option<f64> {
        Some(self.sales_amount? - self.cost?)
    }
}

/// Returns true when the DataFrame has a column with this name.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.column(name).is_ok()
}

/// Fails with [`EtlError::MissingColumn`] on the first absent column.
pub fn require_columns(df: &DataFrame, names: &[&str]) -> EtlResult<()> {
    match names.iter().find(|name| !has_column(df, name)) {
        Some(missing) => Err(EtlError::MissingColumn((*missing).to_string())),
        None => Ok(()),
    }
}

pub(crate) fn date_to_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

pub(crate) fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::default().checked_add_signed(Duration::days(days as i64))
}

/// Convert typed transactions into a DataFrame with the canonical schema.
pub fn transactions_to_dataframe(transactions: &[Transaction]) -> EtlResult<DataFrame> {
    let n = transactions.len();

    let mut ids = Vec::with_capacity(n);
    let mut dates = Vec::with_capacity(n);
    let mut categories = Vec::with_capacity(n);
    let mut amounts = Vec::with_capacity(n);
    let mut quantities = Vec::with_capacity(n);
    let mut costs = Vec::with_capacity(n);
    let mut regions = Vec::with_capacity(n);

    for tx in transactions {
        ids.push(tx.customer_id.clone());
        dates.push(tx.transaction_date.map(date_to_days));
        categories.push(tx.product_category.clone());
        amounts.push(tx.sales_amount);
        quantities.push(tx.quantity);
        costs.push(tx.cost);
        regions.push(tx.region.clone());
    }

    let dates = Series::new(TRANSACTION_DATE.into(), dates).cast(&DataType::Date)?;

    let df = DataFrame::new(vec![
        Column::new(CUSTOMER_ID.into(), ids),
        dates.into(),
        Column::new(PRODUCT_CATEGORY.into(), categories),
        Column::new(SALES_AMOUNT.into(), amounts),
        Column::new(QUANTITY.into(), quantities),
        Column::new(COST.into(), costs),
        Column::new(REGION.into(), regions),
    ])?;

    Ok(df)
}

/// Convert a DataFrame back into typed transactions.
///
/// Only `customer_id` is required; absent optional columns yield `None`.
pub fn dataframe_to_transactions(df: &DataFrame) -> EtlResult<Vec<Transaction>> {
    require_columns(df, &[CUSTOMER_ID])?;

    let ids = string_values(df, CUSTOMER_ID)?;
    let dates = date_values(df)?;
    let categories = string_values(df, PRODUCT_CATEGORY)?;
    let amounts = f64_values(df, SALES_AMOUNT)?;
    let quantities = i64_values(df, QUANTITY)?;
    let costs = f64_values(df, COST)?;
    let regions = string_values(df, REGION)?;

    let mut transactions = Vec::with_capacity(df.height());
    for (i, id) in ids.into_iter().enumerate() {
        let customer_id =
            id.ok_or_else(|| EtlError::InvalidData(format!("Missing customer_id at row {}", i)))?;

        transactions.push(Transaction {
            customer_id,
            transaction_date: dates[i],
            product_category: categories[i].clone(),
            sales_amount: amounts[i],
            quantity: quantities[i],
            cost: costs[i],
            region: regions[i].clone(),
        });
    }

    Ok(transactions)
}

fn string_values(df: &DataFrame, name: &str) -> EtlResult<Vec<Option<String>>> {
    match df.column(name) {
        Ok(column) => {
            let column = column.cast(&DataType::String)?;
            Ok(column
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn f64_values(df: &DataFrame, name: &str) -> EtlResult<Vec<Option<f64>>> {
    match df.column(name) {
        Ok(column) => {
            let column = column.cast(&DataType::Float64)?;
            Ok(column.f64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn i64_values(df: &DataFrame, name: &str) -> EtlResult<Vec<Option<i64>>> {
    match df.column(name) {
        Ok(column) => {
            let column = column.cast(&DataType::Int64)?;
            Ok(column.i64()?.into_iter().collect())
        }
        Err(_) => Ok(vec![None; df.height()]),
    }
}

fn date_values(df: &DataFrame) -> EtlResult<Vec<Option<NaiveDate>>> {
    let column = match df.column(TRANSACTION_DATE) {
        Ok(column) => column,
        Err(_) => return Ok(vec![None; df.height()]),
    };

    if column.dtype() == &DataType::Date {
        let days = column.cast(&DataType::Int32)?;
        return Ok(days
            .i32()?
            .into_iter()
            .map(|d| d.and_then(days_to_date))
            .collect());
    }

    let text = column.cast(&DataType::String)?;
    Ok(text
        .str()?
        .into_iter()
        .map(|v| v.and_then(|s| NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()))
        .collect())
}
