//! Prometheus metrics for the indexer

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_gauge,
    CounterVec, Histogram, IntCounter, IntGauge,
};

pub struct IndexerMetrics {
    /// Delta runs by outcome (processed, busy, no_live_index, failed)
    pub delta_runs: CounterVec,

    /// Change events applied to the live generation, by event type
    pub events_applied: CounterVec,

    /// Full reindex runs by status (success, failed)
    pub full_runs: CounterVec,

    /// Documents written by the last successful full reindex
    pub full_documents: IntGauge,

    /// Full reindex duration in seconds
    pub full_duration: Histogram,

    /// Unconsumed change events, as of the last delta run
    pub change_log_backlog: IntGauge,

    /// Live generation swaps
    pub generation_swaps: IntCounter,

    /// Generations deleted by the orphan sweep
    pub orphans_removed: IntCounter,
}

impl IndexerMetrics {
    pub fn new() -> Self {
        Self {
            delta_runs: register_counter_vec!(
                "villagerdb_indexer_delta_runs_total",
                "Delta reindex runs by outcome",
                &["outcome"]
            )
            .expect("register indexer_delta_runs_total"),

            events_applied: register_counter_vec!(
                "villagerdb_indexer_events_applied_total",
                "Change events applied to the live index",
                &["event_type"]
            )
            .expect("register indexer_events_applied_total"),

            full_runs: register_counter_vec!(
                "villagerdb_indexer_full_runs_total",
                "Full reindex runs by status",
                &["status"]
            )
            .expect("register indexer_full_runs_total"),

            full_documents: register_int_gauge!(
                "villagerdb_indexer_full_documents",
                "Documents written by the last full reindex"
            )
            .expect("register indexer_full_documents"),

            full_duration: register_histogram!(
                "villagerdb_indexer_full_duration_seconds",
                "Full reindex duration in seconds",
                vec![0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 300.0, 900.0]
            )
            .expect("register indexer_full_duration_seconds"),

            change_log_backlog: register_int_gauge!(
                "villagerdb_indexer_change_log_backlog",
                "Unconsumed change events"
            )
            .expect("register indexer_change_log_backlog"),

            generation_swaps: register_int_counter!(
                "villagerdb_indexer_generation_swaps_total",
                "Times the live generation pointer was replaced"
            )
            .expect("register indexer_generation_swaps_total"),

            orphans_removed: register_int_counter!(
                "villagerdb_indexer_orphans_removed_total",
                "Orphaned generations deleted by the sweep"
            )
            .expect("register indexer_orphans_removed_total"),
        }
    }

    pub fn record_delta(&self, outcome: &str) {
        self.delta_runs.with_label_values(&[outcome]).inc();
    }

    pub fn record_event(&self, event_type: &str) {
        self.events_applied.with_label_values(&[event_type]).inc();
    }

    pub fn record_full(&self, success: bool, documents: u64, duration_secs: f64) {
        let status = if success { "success" } else { "failed" };
        self.full_runs.with_label_values(&[status]).inc();
        self.full_duration.observe(duration_secs);
        if success {
            self.full_documents.set(documents as i64);
        }
    }
}

impl Default for IndexerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    /// Global indexer metrics instance
    pub static ref INDEXER_METRICS: IndexerMetrics = IndexerMetrics::new();
}

/// Initialize indexer metrics (idempotent)
pub fn init_indexer_metrics() {
    lazy_static::initialize(&INDEXER_METRICS);
}
