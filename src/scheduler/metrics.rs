//! Prometheus metrics for scheduled jobs

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, register_int_gauge_vec,
    CounterVec, HistogramVec, IntGauge, IntGaugeVec,
};

pub struct SchedulerMetrics {
    pub registered_jobs: IntGauge,

    /// Job runs by outcome (success, failure, overrun)
    pub job_runs: CounterVec,

    /// Time until the caller saw the outcome, capped at the job timeout
    pub job_duration: HistogramVec,

    pub jobs_running: IntGaugeVec,
}

impl SchedulerMetrics {
    pub fn new() -> Self {
        Self {
            registered_jobs: register_int_gauge!(
                "villagerdb_scheduler_registered_jobs",
                "Jobs registered with the scheduler"
            )
            .expect("register scheduler_registered_jobs"),

            job_runs: register_counter_vec!(
                "villagerdb_scheduler_job_runs_total",
                "Scheduled job runs by outcome",
                &["job", "outcome"]
            )
            .expect("register scheduler_job_runs_total"),

            job_duration: register_histogram_vec!(
                "villagerdb_scheduler_job_duration_seconds",
                "Scheduled job run duration in seconds",
                &["job"],
                vec![0.01, 0.1, 0.5, 1.0, 5.0, 30.0, 60.0, 300.0]
            )
            .expect("register scheduler_job_duration_seconds"),

            jobs_running: register_int_gauge_vec!(
                "villagerdb_scheduler_jobs_running",
                "Job runs the scheduler is waiting on",
                &["job"]
            )
            .expect("register scheduler_jobs_running"),
        }
    }

    pub fn run_started(&self, job: &str) {
        self.jobs_running.with_label_values(&[job]).inc();
    }

    pub fn run_finished(&self, job: &str, outcome: &str, duration_secs: f64) {
        self.jobs_running.with_label_values(&[job]).dec();
        self.job_runs.with_label_values(&[job, outcome]).inc();
        self.job_duration
            .with_label_values(&[job])
            .observe(duration_secs);
    }

    pub fn set_registered(&self, count: usize) {
        self.registered_jobs.set(count as i64);
    }
}

impl Default for SchedulerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref SCHEDULER_METRICS: SchedulerMetrics = SchedulerMetrics::new();
}

pub fn init_scheduler_metrics() {
    lazy_static::initialize(&SCHEDULER_METRICS);
}
