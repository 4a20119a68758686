//! Integration tests for trailing-gap detection and on-read backfill.
//!
//! Tests cover:
//! - Which raw fetches a query issues
//! - Merging of persisted and synthesized rollups
//! - Partial failure of individual sub-ranges

use proptest::prelude::*;
use shared::config::RollupConfig;
use shared::handlers::{HandlerError, RollupHandler};
use shared::models::MetricDataKind;
use shared::rollup::Granularity;
use std::collections::HashSet;

use super::common::{range, Call, RecordingStore, FIVE_MIN, METRIC, TENANT};

fn parallel_handler(store: std::sync::Arc<RecordingStore>) -> RollupHandler {
    RollupHandler::with_config(
        store,
        RollupConfig {
            backfill_enabled: true,
            backfill_parallelism: 4,
        },
    )
    .unwrap()
}

#[test]
fn test_full_granularity_never_backfills() {
    let store = RecordingStore::new_shared();
    for ts in [0, 60_000, 120_000] {
        store.insert_raw(ts, 1.0);
    }
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 10 * FIVE_MIN, Granularity::Full)
        .unwrap();

    assert_eq!(response.data().kind(), MetricDataKind::Full);
    assert_eq!(response.data().len(), 3);
    assert_eq!(
        store.calls(),
        vec![Call::Range(range(0, 10 * FIVE_MIN), Granularity::Full)]
    );
}

#[test]
fn test_primary_query_starts_at_snapped_from() {
    let store = RecordingStore::new_shared();
    let handler = RollupHandler::new(store.clone());

    handler
        .get_rollup_by_granularity(TENANT, METRIC, FIVE_MIN + 42, 2 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(
        store.calls()[0],
        Call::Range(range(FIVE_MIN, 2 * FIVE_MIN), Granularity::Min5)
    );
}

#[test]
fn test_covered_request_issues_no_backfill() {
    let store = RecordingStore::new_shared();
    for ts in [0, FIVE_MIN, 2 * FIVE_MIN] {
        store.insert_rollup(Granularity::Min5, ts, &[1.0]);
    }
    let handler = RollupHandler::new(store.clone());

    // latest + width lands past `to`
    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 3 * FIVE_MIN - 1, Granularity::Min5)
        .unwrap();
    assert_eq!(response.data().len(), 3);
    assert!(store.raw_fetches().is_empty());

    // latest + width lands exactly on `to`: nothing left to cover
    handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 3 * FIVE_MIN, Granularity::Min5)
        .unwrap();
    assert!(store.raw_fetches().is_empty());
}

#[test]
fn test_two_missing_buckets_issue_two_fetches() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    store.insert_rollup(Granularity::Min5, FIVE_MIN, &[1.0]);
    let latest = FIVE_MIN;
    let to = latest + 2 * FIVE_MIN + 60_000;
    let handler = RollupHandler::new(store.clone());

    handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, to, Granularity::Min5)
        .unwrap();

    assert_eq!(
        store.raw_fetches(),
        vec![
            range(latest + FIVE_MIN, latest + 2 * FIVE_MIN),
            range(latest + 2 * FIVE_MIN, to),
        ]
    );
}

#[test]
fn test_two_missing_aligned_buckets() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    let handler = RollupHandler::new(store.clone());

    handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 3 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(
        store.raw_fetches(),
        vec![range(FIVE_MIN, 2 * FIVE_MIN), range(2 * FIVE_MIN, 3 * FIVE_MIN)]
    );
}

#[test]
fn test_backfilled_points_extend_without_duplicates() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[5.0]);
    store.insert_rollup(Granularity::Min5, FIVE_MIN, &[6.0]);
    for ts in [FIVE_MIN + 10, 2 * FIVE_MIN + 10, 3 * FIVE_MIN + 10, 3 * FIVE_MIN + 20] {
        store.insert_raw(ts, 2.0);
    }
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 4 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    let timestamps: Vec<i64> = response.data().points().iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![0, FIVE_MIN, 2 * FIVE_MIN, 3 * FIVE_MIN]);

    // The persisted bucket is not overwritten by raw data inside it.
    let persisted = response.data().points().get(FIVE_MIN).unwrap();
    assert_eq!(persisted.data.as_rollup().unwrap().sum(), 6.0);

    let last = response.data().points().get(3 * FIVE_MIN).unwrap();
    assert_eq!(last.data.as_rollup().unwrap().count(), 2);
}

#[test]
fn test_empty_buckets_are_not_merged() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    store.insert_raw(3 * FIVE_MIN + 1, 4.0);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 4 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(store.raw_fetches().len(), 3);
    let timestamps: Vec<i64> = response.data().points().iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![0, 3 * FIVE_MIN]);
    assert!(response
        .data()
        .points()
        .iter()
        .all(|p| p.data.as_rollup().unwrap().count() > 0));
    assert!(!response.is_partial());
}

#[test]
fn test_persisted_empty_rollup_does_not_cover_its_bucket() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    store.insert_rollup(Granularity::Min5, 2 * FIVE_MIN, &[]);
    store.insert_raw(FIVE_MIN + 1, 2.0);
    store.insert_raw(2 * FIVE_MIN + 1, 3.0);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 3 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(
        store.raw_fetches(),
        vec![
            range(FIVE_MIN, 2 * FIVE_MIN),
            range(2 * FIVE_MIN, 3 * FIVE_MIN)
        ]
    );
    let timestamps: Vec<i64> = response.data().points().iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![0, FIVE_MIN, 2 * FIVE_MIN]);
    let synthesized = response.data().points().get(2 * FIVE_MIN).unwrap();
    assert_eq!(synthesized.data.as_rollup().unwrap().sum(), 3.0);
}

#[test]
fn test_failed_sub_range_is_skipped_and_reported() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    for ts in [FIVE_MIN, 2 * FIVE_MIN, 3 * FIVE_MIN] {
        store.insert_raw(ts + 1, 1.0);
    }
    store.fail_raw_fetch_at(2 * FIVE_MIN);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 4 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    let timestamps: Vec<i64> = response.data().points().iter().map(|p| p.timestamp).collect();
    assert_eq!(timestamps, vec![0, FIVE_MIN, 3 * FIVE_MIN]);
    assert!(response.is_partial());
    assert_eq!(response.skipped().len(), 1);
    assert_eq!(response.skipped()[0].range, range(2 * FIVE_MIN, 3 * FIVE_MIN));
    assert!(response.skipped()[0].reason.contains("connection reset"));
}

#[test]
fn test_non_numeric_raw_data_is_skipped() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    store.insert_raw(FIVE_MIN + 1, "degraded");
    store.insert_raw(2 * FIVE_MIN + 1, 3i32);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 3 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(response.skipped().len(), 1);
    assert_eq!(response.skipped()[0].range, range(FIVE_MIN, 2 * FIVE_MIN));
    assert!(response.data().points().get(2 * FIVE_MIN).is_some());
}

#[test]
fn test_primary_fetch_failure_propagates() {
    let store = RecordingStore::new_shared();
    store.fail_primary_fetch();
    let handler = RollupHandler::new(store.clone());

    let result = handler.get_rollup_by_granularity(TENANT, METRIC, 0, FIVE_MIN, Granularity::Min5);

    assert!(matches!(result, Err(HandlerError::Store(_))));
    assert!(store.raw_fetches().is_empty());
}

#[test]
fn test_interior_gaps_are_left_alone() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    store.insert_rollup(Granularity::Min5, 3 * FIVE_MIN, &[1.0]);
    store.insert_raw(FIVE_MIN + 1, 9.0);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 4 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert!(response.data().points().get(FIVE_MIN).is_none());
    assert!(store.raw_fetches().is_empty());
}

#[test]
fn test_parallel_backfill_keeps_order_and_skips_failures() {
    let store = RecordingStore::new_shared();
    store.insert_rollup(Granularity::Min5, 0, &[1.0]);
    for bucket in 1..12 {
        store.insert_raw(bucket * FIVE_MIN + 7, 1.0);
    }
    store.fail_raw_fetch_at(4 * FIVE_MIN);
    store.fail_raw_fetch_at(9 * FIVE_MIN);
    let handler = parallel_handler(store.clone());

    let response = handler
        .get_rollup_by_granularity(TENANT, METRIC, 0, 12 * FIVE_MIN, Granularity::Min5)
        .unwrap();

    assert_eq!(store.raw_fetches().len(), 11);
    let timestamps: Vec<i64> = response.data().points().iter().map(|p| p.timestamp).collect();
    let expected: Vec<i64> = (0..12)
        .filter(|b| *b != 4 && *b != 9)
        .map(|b| b * FIVE_MIN)
        .collect();
    assert_eq!(timestamps, expected);

    let skipped: Vec<i64> = response.skipped().iter().map(|s| s.range.start()).collect();
    assert_eq!(skipped, vec![4 * FIVE_MIN, 9 * FIVE_MIN]);
}

#[test]
fn test_rollup_by_points_backfills_at_chosen_granularity() {
    let store = RecordingStore::new_shared();
    store.insert_raw(3_600_000 + 5, 2.0);
    let handler = RollupHandler::new(store.clone());

    let response = handler
        .get_rollup_by_points(TENANT, METRIC, 0, 86_400_000, 24)
        .unwrap();

    assert_eq!(response.granularity(), Granularity::Min60);
    assert!(response.data().points().get(3_600_000).is_some());
    assert_eq!(store.raw_fetches().len(), 23);
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 64, failure_persistence: None, ..ProptestConfig::default() })]

    #[test]
    fn test_gap_fill_only_extends(
        persisted in 0i64..6,
        extra_buckets in 1i64..8,
        tail in 0i64..FIVE_MIN,
        raw_offsets in proptest::collection::vec(0i64..(14 * FIVE_MIN), 0..40),
    ) {
        let store = RecordingStore::new_shared();
        for bucket in 0..=persisted {
            store.insert_rollup(Granularity::Min5, bucket * FIVE_MIN, &[1.0]);
        }
        for ts in &raw_offsets {
            store.insert_raw(*ts, 1.0);
        }
        let latest = persisted * FIVE_MIN;
        let to = latest + extra_buckets * FIVE_MIN + tail;
        let handler = RollupHandler::new(store.clone());

        let response = handler
            .get_rollup_by_granularity(TENANT, METRIC, 0, to, Granularity::Min5)
            .unwrap();

        let mut seen = HashSet::new();
        for point in response.data().points() {
            prop_assert!(seen.insert(point.timestamp));
            let rollup = point.data.as_rollup().unwrap();
            prop_assert!(rollup.count() > 0);
            if point.timestamp > latest {
                prop_assert!(point.timestamp >= latest + FIVE_MIN);
                prop_assert!(point.timestamp < to);
            }
        }

        let fetched = store.raw_fetches();
        if let (Some(first), Some(last)) = (fetched.first(), fetched.last()) {
            prop_assert_eq!(first.start(), latest + FIVE_MIN);
            prop_assert_eq!(last.end(), to);
        }
        for pair in fetched.windows(2) {
            prop_assert_eq!(pair[0].end(), pair[1].start());
        }
    }
}
