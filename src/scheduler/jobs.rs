//! Job definitions and management

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Unique identifier for a scheduled job
pub type JobId = Uuid;

/// Status of a scheduled job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Job is scheduled and will run
    Scheduled,
    /// Job is currently running
    Running,
    /// Last run completed successfully
    Completed,
    /// Last run failed or timed out
    Failed,
}

/// Metadata about a scheduled job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobMetadata {
    pub id: JobId,

    /// Human-readable job name, also the metrics label
    pub name: String,

    pub description: Option<String>,

    /// Cron expression
    pub schedule: String,

    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub run_count: u64,
    pub success_count: u64,
    pub failure_count: u64,

    /// Average execution duration in milliseconds
    pub avg_duration_ms: f64,

    /// Error of the most recent failed run
    pub last_error: Option<String>,
}

impl JobMetadata {
    pub fn new(name: impl Into<String>, schedule: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            description: None,
            schedule: schedule.into(),
            status: JobStatus::Scheduled,
            created_at: Utc::now(),
            last_run: None,
            run_count: 0,
            success_count: 0,
            failure_count: 0,
            avg_duration_ms: 0.0,
            last_error: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn update_execution(&mut self, result: &Result<(), String>, duration_ms: u64) {
        self.run_count += 1;
        match result {
            Ok(()) => {
                self.success_count += 1;
                self.status = JobStatus::Completed;
            }
            Err(e) => {
                self.failure_count += 1;
                self.status = JobStatus::Failed;
                self.last_error = Some(e.clone());
            }
        }

        // Incremental mean
        self.avg_duration_ms = ((self.avg_duration_ms * (self.run_count - 1) as f64)
            + duration_ms as f64)
            / self.run_count as f64;

        self.last_run = Some(Utc::now());
    }

    pub fn success_rate(&self) -> f64 {
        if self.run_count == 0 {
            0.0
        } else {
            (self.success_count as f64 / self.run_count as f64) * 100.0
        }
    }
}

/// Context passed to job execution functions
#[derive(Clone)]
pub struct JobContext {
    pub metadata: JobMetadata,
}

impl JobContext {
    pub fn new(metadata: JobMetadata) -> Self {
        Self { metadata }
    }
}

type JobFn =
    Arc<dyn Fn(JobContext) -> Pin<Box<dyn Future<Output = Result<(), String>> + Send>> + Send + Sync>;

/// A scheduled job
pub struct Job {
    metadata: Arc<RwLock<JobMetadata>>,
    execute: JobFn,
}

impl Job {
    pub fn new<F, Fut>(metadata: JobMetadata, execute: F) -> Self
    where
        F: Fn(JobContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        Self {
            metadata: Arc::new(RwLock::new(metadata)),
            execute: Arc::new(move |ctx| Box::pin(execute(ctx))),
        }
    }

    pub async fn get_metadata(&self) -> JobMetadata {
        self.metadata.read().await.clone()
    }

    /// Run the job once and record the outcome in its metadata.
    ///
    /// A run that outlives `timeout` is not interrupted; it finishes and is
    /// recorded as failed.
    pub async fn execute(&self, timeout: Duration) -> Result<(), String> {
        let start = std::time::Instant::now();

        let ctx = {
            let mut metadata = self.metadata.write().await;
            metadata.status = JobStatus::Running;
            JobContext::new(metadata.clone())
        };

        let mut run = (self.execute)(ctx);
        let result = match tokio::time::timeout(timeout, &mut run).await {
            Ok(result) => result,
            Err(_) => {
                let overrun = format!("exceeded job timeout of {}ms", timeout.as_millis());
                Err(match run.await {
                    Ok(()) => overrun,
                    Err(e) => format!("{}: {}", overrun, e),
                })
            }
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        self.metadata
            .write()
            .await
            .update_execution(&result, duration_ms);

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_execute_records_outcome() {
        let job = Job::new(JobMetadata::new("flaky", "0 * * * * *"), |ctx| async move {
            if ctx.metadata.run_count == 0 {
                Ok(())
            } else {
                Err("second run fails".to_string())
            }
        });

        assert!(job.execute(Duration::from_secs(5)).await.is_ok());
        assert!(job.execute(Duration::from_secs(5)).await.is_err());

        let metadata = job.get_metadata().await;
        assert_eq!(metadata.run_count, 2);
        assert_eq!(metadata.success_count, 1);
        assert_eq!(metadata.failure_count, 1);
        assert_eq!(metadata.status, JobStatus::Failed);
        assert_eq!(metadata.last_error.as_deref(), Some("second run fails"));
        assert_eq!(metadata.success_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_overrun_finishes_and_counts_as_failure() {
        let finished = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let flag = finished.clone();
        let job = Job::new(JobMetadata::new("slow", "0 * * * * *"), move |_ctx| {
            let flag = flag.clone();
            async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                flag.store(true, std::sync::atomic::Ordering::SeqCst);
                Ok(())
            }
        });

        let result = job.execute(Duration::from_millis(10)).await;
        assert_eq!(result, Err("exceeded job timeout of 10ms".to_string()));
        assert!(finished.load(std::sync::atomic::Ordering::SeqCst));

        let metadata = job.get_metadata().await;
        assert_eq!(metadata.run_count, 1);
        assert_eq!(metadata.failure_count, 1);
        assert_eq!(metadata.status, JobStatus::Failed);
    }
}
