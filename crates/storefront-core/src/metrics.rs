//! Storefront metrics.
//!
//! Provides metrics for collection mutations, storage failures and catalog
//! queries. These complement the structured logging already in place; the
//! library records through the `metrics` facade and never installs an
//! exporter itself.

use metrics::{counter, describe_counter, describe_histogram, histogram};

// ============================================================================
// Collection Metrics
// ============================================================================

/// Collection mutation counter.
pub const COLLECTION_MUTATIONS: &str = "storefront_collection_mutations_total";

/// Storage failure counter.
pub const STORAGE_FAILURES: &str = "storefront_storage_failures_total";

/// Persisted state reset counter (malformed documents discarded).
pub const PERSISTED_STATE_RESETS: &str = "storefront_persisted_state_resets_total";

// ============================================================================
// Catalog Metrics
// ============================================================================

/// Catalog query counter.
pub const CATALOG_QUERIES: &str = "storefront_catalog_queries_total";

/// Matched product count histogram.
pub const CATALOG_QUERY_MATCHED: &str = "storefront_catalog_query_matched";

// ============================================================================
// Metric Registration
// ============================================================================

/// Registers all storefront metric descriptions.
///
/// Call this once at application startup after initializing the metrics recorder.
pub fn register_metrics() {
    describe_counter!(COLLECTION_MUTATIONS, "Total collection mutations by collection and op");
    describe_counter!(STORAGE_FAILURES, "Total storage operations rejected by the medium");
    describe_counter!(PERSISTED_STATE_RESETS, "Total malformed persisted documents discarded");
    describe_counter!(CATALOG_QUERIES, "Total catalog queries by outcome");
    describe_histogram!(CATALOG_QUERY_MATCHED, "Products matched per catalog query");
}

// ============================================================================
// Recording
// ============================================================================

/// Records a state-changing collection operation.
pub fn record_mutation(collection: &str, op: &'static str) {
    counter!(COLLECTION_MUTATIONS, "collection" => collection.to_string(), "op" => op).increment(1);
}

/// Records a storage operation the medium rejected.
pub fn record_storage_failure(op: &'static str) {
    counter!(STORAGE_FAILURES, "op" => op).increment(1);
}

/// Records a malformed document being discarded.
pub fn record_state_reset(key: &str) {
    counter!(PERSISTED_STATE_RESETS, "key" => key.to_string()).increment(1);
}

/// Records a catalog query outcome and, on success, its matched count.
pub fn record_catalog_query(outcome: &'static str, matched: Option<usize>) {
    counter!(CATALOG_QUERIES, "outcome" => outcome).increment(1);
    if let Some(matched) = matched {
        #[allow(clippy::cast_precision_loss)]
        histogram!(CATALOG_QUERY_MATCHED).record(matched as f64);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use metrics::{
        Counter, Gauge, Histogram, HistogramFn, Key, KeyName, Metadata, Recorder, SharedString,
        Unit,
    };

    use super::*;

    struct Samples(Mutex<Vec<f64>>);

    impl HistogramFn for Samples {
        fn record(&self, value: f64) {
            self.0.lock().expect("samples lock").push(value);
        }
    }

    /// Keeps every counter and histogram in memory, keyed by
    /// `name{label=value,...}`.
    #[derive(Default)]
    struct CapturingRecorder {
        described: Mutex<BTreeSet<String>>,
        counters: Mutex<BTreeMap<String, Arc<AtomicU64>>>,
        histograms: Mutex<BTreeMap<String, Arc<Samples>>>,
    }

    impl CapturingRecorder {
        fn render(key: &Key) -> String {
            let labels: Vec<String> = key
                .labels()
                .map(|label| format!("{}={}", label.key(), label.value()))
                .collect();
            format!("{}{{{}}}", key.name(), labels.join(","))
        }

        fn describe(&self, key: &KeyName) {
            self.described
                .lock()
                .expect("described lock")
                .insert(key.as_str().to_string());
        }

        fn counter(&self, rendered: &str) -> u64 {
            self.counters
                .lock()
                .expect("counters lock")
                .get(rendered)
                .map_or(0, |value| value.load(Ordering::Relaxed))
        }

        fn samples(&self, rendered: &str) -> Vec<f64> {
            self.histograms
                .lock()
                .expect("histograms lock")
                .get(rendered)
                .map(|samples| samples.0.lock().expect("samples lock").clone())
                .unwrap_or_default()
        }
    }

    impl Recorder for CapturingRecorder {
        fn describe_counter(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(&key);
        }

        fn describe_gauge(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(&key);
        }

        fn describe_histogram(&self, key: KeyName, _: Option<Unit>, _: SharedString) {
            self.describe(&key);
        }

        fn register_counter(&self, key: &Key, _: &Metadata<'_>) -> Counter {
            let value = Arc::clone(
                self.counters
                    .lock()
                    .expect("counters lock")
                    .entry(Self::render(key))
                    .or_default(),
            );
            Counter::from_arc(value)
        }

        fn register_gauge(&self, _: &Key, _: &Metadata<'_>) -> Gauge {
            Gauge::noop()
        }

        fn register_histogram(&self, key: &Key, _: &Metadata<'_>) -> Histogram {
            let samples = Arc::clone(
                self.histograms
                    .lock()
                    .expect("histograms lock")
                    .entry(Self::render(key))
                    .or_insert_with(|| Arc::new(Samples(Mutex::new(Vec::new())))),
            );
            Histogram::from_arc(samples)
        }
    }

    #[test]
    fn test_register_metrics_describes_every_metric() {
        let recorder = CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, register_metrics);

        let described = recorder.described.lock().expect("described lock").clone();
        let expected: BTreeSet<String> = [
            COLLECTION_MUTATIONS,
            STORAGE_FAILURES,
            PERSISTED_STATE_RESETS,
            CATALOG_QUERIES,
            CATALOG_QUERY_MATCHED,
        ]
        .into_iter()
        .map(str::to_string)
        .collect();
        assert_eq!(described, expected);
    }

    #[test]
    fn test_mutations_are_labelled_by_collection_and_op() {
        let recorder = CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            record_mutation("cart", "upsert");
            record_mutation("cart", "upsert");
            record_mutation("compare", "toggle");
        });

        let cart = format!("{COLLECTION_MUTATIONS}{{collection=cart,op=upsert}}");
        let compare = format!("{COLLECTION_MUTATIONS}{{collection=compare,op=toggle}}");
        assert_eq!(recorder.counter(&cart), 2);
        assert_eq!(recorder.counter(&compare), 1);
    }

    #[test]
    fn test_storage_failures_and_resets_are_counted() {
        let recorder = CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            record_storage_failure("set");
            record_state_reset("origin=shop/cart");
        });

        assert_eq!(recorder.counter(&format!("{STORAGE_FAILURES}{{op=set}}")), 1);
        let reset = format!("{PERSISTED_STATE_RESETS}{{key=origin=shop/cart}}");
        assert_eq!(recorder.counter(&reset), 1);
    }

    #[test]
    fn test_catalog_query_records_matched_only_on_success() {
        let recorder = CapturingRecorder::default();
        metrics::with_local_recorder(&recorder, || {
            record_catalog_query("ok", Some(7));
            record_catalog_query("invalid", None);
        });

        assert_eq!(recorder.counter(&format!("{CATALOG_QUERIES}{{outcome=ok}}")), 1);
        assert_eq!(recorder.counter(&format!("{CATALOG_QUERIES}{{outcome=invalid}}")), 1);
        assert_eq!(recorder.samples(&format!("{CATALOG_QUERY_MATCHED}{{}}")), vec![7.0]);
    }

    #[test]
    fn test_recording_without_recorder_is_a_no_op() {
        register_metrics();
        record_mutation("favorites", "toggle");
        record_storage_failure("remove");
        record_state_reset("favorites");
        record_catalog_query("ok", Some(0));
    }
}
