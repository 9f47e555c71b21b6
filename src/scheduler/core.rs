//! Core scheduler service implementation

use super::{
    config::SchedulerConfig,
    error::{SchedulerError, SchedulerResult},
    jobs::{Job, JobId, JobMetadata, JobStatus},
    metrics::SCHEDULER_METRICS,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_cron_scheduler::{JobScheduler, JobSchedulerError};
use tracing::{debug, error, info, warn};

/// Runs registered jobs on their cron schedules
pub struct SchedulerService {
    config: SchedulerConfig,

    /// Underlying tokio-cron-scheduler instance
    scheduler: JobScheduler,

    /// Registered jobs, keyed by our id
    jobs: Arc<DashMap<JobId, RegisteredJob>>,

    running: Arc<tokio::sync::RwLock<bool>>,
}

impl SchedulerService {
    pub async fn new(config: SchedulerConfig) -> SchedulerResult<Self> {
        info!("Initializing scheduler service");

        let scheduler = JobScheduler::new()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;

        Ok(Self {
            config,
            scheduler,
            jobs: Arc::new(DashMap::new()),
            running: Arc::new(tokio::sync::RwLock::new(false)),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Start the scheduler
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if !self.config.enabled {
            info!("Scheduler is disabled in configuration");
            return Ok(());
        }

        {
            let mut running = self.running.write().await;
            if *running {
                warn!("Scheduler is already running");
                return Ok(());
            }
            *running = true;
        }

        self.scheduler
            .start()
            .await
            .map_err(|e| SchedulerError::StartupFailed(e.to_string()))?;

        info!(jobs = self.jobs.len(), "Scheduler service started");
        Ok(())
    }

    /// Stop the scheduler
    pub async fn shutdown(&mut self) -> SchedulerResult<()> {
        {
            let mut running = self.running.write().await;
            if !*running {
                debug!("Scheduler is not running");
                return Ok(());
            }
            *running = false;
        }

        info!("Shutting down scheduler service");

        self.scheduler
            .shutdown()
            .await
            .map_err(|e| SchedulerError::ShutdownFailed(e.to_string()))?;

        info!("Scheduler service shut down successfully");
        Ok(())
    }

    /// Register a job on its cron schedule
    pub async fn add_job(&self, job: Job) -> SchedulerResult<JobId> {
        let metadata = job.get_metadata().await;
        let job_id = metadata.id;
        let job_name = metadata.name.clone();

        if self.jobs.iter().any(|entry| entry.value().name == job_name) {
            return Err(SchedulerError::JobAlreadyExists(job_name));
        }

        info!(job_id = %job_id, job_name = %job_name, schedule = %metadata.schedule, "Adding job to scheduler");

        let job = Arc::new(job);
        let timeout = self.config.job_timeout;

        let runner = job.clone();
        let cron_job = tokio_cron_scheduler::Job::new_async(metadata.schedule.as_str(), move |_uuid, _l| {
            let job = runner.clone();
            Box::pin(async move {
                let _ = run_job(job, timeout).await;
            })
        })
        .map_err(|e: JobSchedulerError| SchedulerError::InvalidCronExpression(format!(
            "{}: {}",
            metadata.schedule, e
        )))?;

        let cron_id = self
            .scheduler
            .add(cron_job)
            .await
            .map_err(|e| SchedulerError::JobCreationFailed(e.to_string()))?;

        self.jobs.insert(
            job_id,
            RegisteredJob {
                job,
                cron_id,
                name: job_name,
            },
        );
        SCHEDULER_METRICS.set_registered(self.jobs.len());

        Ok(job_id)
    }

    /// Unregister a job
    pub async fn remove_job(&self, job_id: &JobId) -> SchedulerResult<()> {
        let (_, registered) = self
            .jobs
            .remove(job_id)
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;

        self.scheduler.remove(&registered.cron_id).await?;
        SCHEDULER_METRICS.set_registered(self.jobs.len());

        info!(job_id = %job_id, "Job removed");
        Ok(())
    }

    /// Run a registered job now, outside its schedule
    pub async fn run_now(&self, job_id: &JobId) -> SchedulerResult<()> {
        let job = self
            .jobs
            .get(job_id)
            .map(|entry| entry.value().job.clone())
            .ok_or_else(|| SchedulerError::JobNotFound(job_id.to_string()))?;

        run_job(job, self.config.job_timeout)
            .await
            .map_err(SchedulerError::JobExecutionFailed)
    }

    pub async fn list_jobs(&self) -> Vec<JobMetadata> {
        let jobs: Vec<Arc<Job>> = self.jobs.iter().map(|e| e.value().job.clone()).collect();
        let mut metadata = Vec::with_capacity(jobs.len());
        for job in jobs {
            metadata.push(job.get_metadata().await);
        }
        metadata.sort_by(|a, b| a.name.cmp(&b.name));
        metadata
    }

    pub async fn get_stats(&self) -> SchedulerStats {
        let jobs = self.list_jobs().await;

        let running_jobs = jobs
            .iter()
            .filter(|j| j.status == JobStatus::Running)
            .count();
        let total_executions: u64 = jobs.iter().map(|j| j.run_count).sum();
        let total_failures: u64 = jobs.iter().map(|j| j.failure_count).sum();

        SchedulerStats {
            total_jobs: jobs.len(),
            running_jobs,
            total_executions,
            total_failures,
        }
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}

/// Execute one run of a job with metrics, timeout and logging.
///
/// The run executes on its own task. Once `timeout` passes the caller gets
/// an error, but the run is left to finish and record its own outcome.
/// Failures are logged and returned; they never stop the scheduler.
async fn run_job(job: Arc<Job>, timeout: Duration) -> Result<(), String> {
    let metadata = job.get_metadata().await;
    let job_name = metadata.name;
    let job_id = metadata.id;

    debug!(job_id = %job_id, job_name = %job_name, "Executing scheduled job");
    SCHEDULER_METRICS.run_started(&job_name);

    let start = std::time::Instant::now();
    let runner = job.clone();
    let mut handle = tokio::spawn(async move { runner.execute(timeout).await });
    let (result, outcome) = match tokio::time::timeout(timeout, &mut handle).await {
        Ok(Ok(Ok(()))) => (Ok(()), "success"),
        Ok(Ok(Err(e))) => (Err(e), "failure"),
        Ok(Err(e)) => (Err(format!("job task failed: {}", e)), "failure"),
        Err(_) => {
            warn!(job_id = %job_id, job_name = %job_name, "Job exceeded its timeout, leaving it to finish");
            (
                Err(format!("exceeded job timeout of {}ms", timeout.as_millis())),
                "overrun",
            )
        }
    };
    let duration = start.elapsed();

    SCHEDULER_METRICS.run_finished(&job_name, outcome, duration.as_secs_f64());

    match &result {
        Ok(()) => info!(
            job_id = %job_id,
            job_name = %job_name,
            duration_ms = duration.as_millis() as u64,
            "Job executed successfully"
        ),
        Err(e) => error!(
            job_id = %job_id,
            job_name = %job_name,
            error = %e,
            duration_ms = duration.as_millis() as u64,
            "Job execution failed"
        ),
    }

    result
}

struct RegisteredJob {
    job: Arc<Job>,
    cron_id: uuid::Uuid,
    name: String,
}

/// Statistics about the scheduler
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchedulerStats {
    pub total_jobs: usize,
    pub running_jobs: usize,
    pub total_executions: u64,
    pub total_failures: u64,
}
