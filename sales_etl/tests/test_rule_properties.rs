//! Property tests for the segmentation and outlier rules.

use polars::prelude::*;
use proptest::prelude::*;
use sales_etl::algorithms::outliers::{flag_outliers, OutlierBounds};
use sales_etl::algorithms::quantile::QuantileSummary;
use sales_etl::algorithms::segmentation::{classify, classify_with, label_segments};
use sales_etl::models::columns::{CUSTOMER_SEGMENT, IS_OUTLIER};
use sales_etl::models::SegmentThresholds;
use sales_etl::ValueSegment;

proptest! {
    #[test]
    fn classify_matches_tier_definition(total in -1.0e6f64..1.0e6) {
        let expected = if total > 1000.0 {
            ValueSegment::High
        } else if total > 500.0 {
            ValueSegment::Medium
        } else {
            ValueSegment::Low
        };
        prop_assert_eq!(classify(total), expected);
    }

    #[test]
    fn classify_is_monotonic(a in 0.0f64..5000.0, b in 0.0f64..5000.0) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        // High < Medium < Low in declaration order
        prop_assert!(classify(high) <= classify(low));
    }

    #[test]
    fn custom_thresholds_respect_boundaries(medium in 0.0f64..1000.0, gap in 0.0f64..1000.0) {
        let thresholds = SegmentThresholds::new(medium + gap, medium).unwrap();
        prop_assert_eq!(classify_with(medium, &thresholds), ValueSegment::Low);
        prop_assert_ne!(classify_with(thresholds.high + 0.5, &thresholds), ValueSegment::Low);
        prop_assert_eq!(classify_with(thresholds.high + 0.5, &thresholds), ValueSegment::High);
    }

    #[test]
    fn expression_labels_match_scalar(
        totals in prop::collection::vec(prop_oneof![9 => -100.0f64..3000.0, 1 => Just(f64::NAN)], 1..60),
    ) {
        let df = df!("total_purchase" => totals.clone()).unwrap();
        let labelled = label_segments(&df, "total_purchase", &SegmentThresholds::default()).unwrap();
        let labels = labelled.column(CUSTOMER_SEGMENT).unwrap().str().unwrap();

        for (i, total) in totals.iter().enumerate() {
            prop_assert_eq!(labels.get(i), Some(classify(*total).as_str()));
        }
    }

    #[test]
    fn quantile_rank_within_error(
        values in prop::collection::vec(-1.0e4f64..1.0e4, 1..400),
        eps in 0.0f64..0.2,
        q in 0.0f64..=1.0,
    ) {
        let summary = QuantileSummary::from_values(values.iter().copied(), eps).unwrap();
        let answer = summary.query(q).unwrap();

        let mut sorted = values.clone();
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len() as f64;
        let target = (q * n).ceil().max(1.0);

        // Any rank the answer could occupy among equal values
        let below = sorted.iter().filter(|v| **v < answer).count() as f64;
        let through = sorted.iter().filter(|v| **v <= answer).count() as f64;
        let slack = eps * n + 1.0;

        prop_assert!(
            through >= target - slack && below + 1.0 <= target + slack,
            "q={} eps={} answer={} ranks=[{}, {}] target={}",
            q, eps, answer, below + 1.0, through, target
        );
    }

    #[test]
    fn outlier_flags_are_idempotent(
        values in prop::collection::vec(prop_oneof![19 => 0.0f64..10_000.0, 1 => Just(f64::NAN)], 1..200),
    ) {
        let df = df!("sales_amount" => values.clone()).unwrap();

        let (once, _) = flag_outliers(&df, "sales_amount", 0.05, 1.5).unwrap();
        let (twice, _) = flag_outliers(&once, "sales_amount", 0.05, 1.5).unwrap();
        prop_assert!(once.equals_missing(&twice));

        let flags = once.column(IS_OUTLIER).unwrap().bool().unwrap().clone();
        let bounds = OutlierBounds::compute(values.iter().copied(), 0.05).unwrap();
        for (i, v) in values.iter().enumerate() {
            let expected = bounds.map_or(false, |b| b.is_outlier(*v));
            prop_assert_eq!(flags.get(i), Some(expected));
        }
    }

    #[test]
    fn fence_contains_the_quartiles(values in prop::collection::vec(-500.0f64..500.0, 1..200)) {
        let bounds = OutlierBounds::compute(values, 0.01).unwrap().unwrap();
        prop_assert!(bounds.q1 <= bounds.q3);
        prop_assert!(bounds.contains(bounds.q1));
        prop_assert!(bounds.contains(bounds.q3));
    }
}
