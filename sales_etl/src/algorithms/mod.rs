//! Business rules and analytics over transaction tables.
//!
//! - [`segmentation`]: customer value tiers
//! - [`quantile`] and [`outliers`]: approximate quartiles and IQR fences
//! - [`aggregation`]: grouped summaries and pivots
//! - [`windows`]: ranks, running totals and lags per partition
//! - [`joins`]: lookup enrichment
//! - [`statistics`]: descriptive statistics of a column

pub mod aggregation;
pub mod joins;
pub mod outliers;
pub mod quantile;
pub mod segmentation;
pub mod statistics;
pub mod windows;

pub use aggregation::{monthly_trend, pivot_sales, sales_by_category, sales_by_region, top_n};
pub use joins::{attach_segments, enrich_with_lookup, join_coverage, JoinReport};
pub use outliers::{flag_outliers, remove_outliers, OutlierBounds};
pub use quantile::QuantileSummary;
pub use segmentation::{classify, classify_with, customer_segments, segment_counts, SegmentCounts};
pub use statistics::{column_stats, compute_stats, DistributionStats};
pub use windows::{moving_average, previous_purchase, rank_within, running_total, top_n_per_group};
