//! Integration tests for histogram queries.

use shared::handlers::{metrics, HandlerError, RollupHandler};
use shared::models::{HistogramBin, HistogramRollup, MetricDataKind};
use shared::rollup::Granularity;

use super::common::{
    capture_histograms, range, Call, RecordingStore, FIVE_MIN, METRIC, TENANT,
};

fn histogram(counts: &[u64]) -> HistogramRollup {
    HistogramRollup::new(
        counts
            .iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                mean: f64::from(u32::try_from(i).unwrap()),
                count: *count,
            })
            .collect(),
    )
}

#[test]
fn test_histogram_at_full_fails_before_store_call() {
    let store = RecordingStore::new_shared();
    let handler = RollupHandler::new(store.clone());

    let result =
        handler.get_histograms_by_granularity(TENANT, METRIC, 0, FIVE_MIN, Granularity::Full);

    assert!(matches!(
        result,
        Err(HandlerError::UnsupportedGranularity(Granularity::Full))
    ));
    assert!(store.calls().is_empty());
}

#[test]
fn test_histogram_query_uses_snapped_range() {
    let store = RecordingStore::new_shared();
    store.insert_histogram(Granularity::Min20, 0, histogram(&[1, 2]));
    store.insert_histogram(Granularity::Min20, 1_200_000, histogram(&[4]));
    let handler = RollupHandler::new(store.clone());

    let data = handler
        .get_histograms_by_granularity(TENANT, METRIC, 1_000, 2_400_000, Granularity::Min20)
        .unwrap();

    assert_eq!(data.kind(), MetricDataKind::Histogram);
    assert_eq!(data.len(), 2);
    assert_eq!(
        data.points().get(0).unwrap().data.as_histogram().unwrap().count(),
        3
    );
    assert_eq!(
        store.calls(),
        vec![Call::Histogram(range(0, 2_400_000), Granularity::Min20)]
    );
}

#[test]
fn test_histograms_are_never_backfilled() {
    let store = RecordingStore::new_shared();
    store.insert_raw(FIVE_MIN + 1, 1.0);
    let handler = RollupHandler::new(store.clone());

    let (data, histograms) = capture_histograms(|| {
        handler.get_histograms_by_granularity(TENANT, METRIC, 0, 4 * FIVE_MIN, Granularity::Min5)
    });

    assert!(data.unwrap().is_empty());
    assert!(store.raw_fetches().is_empty());

    let returned: Vec<&(String, Vec<f64>)> = histograms
        .iter()
        .filter(|(name, _)| name == metrics::HISTOGRAM_POINTS_RETURNED)
        .collect();
    assert_eq!(returned.len(), 1);
    assert_eq!(returned[0].1, vec![0.0]);
    assert!(histograms
        .iter()
        .all(|(name, _)| name != metrics::CALC_ON_READ_DURATION));
}
