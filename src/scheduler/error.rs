use crate::error::AppError;
use tokio_cron_scheduler::JobSchedulerError;

pub type SchedulerResult<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler could not start: {0}")]
    StartupFailed(String),

    #[error("Scheduler could not stop: {0}")]
    ShutdownFailed(String),

    #[error("Could not schedule job: {0}")]
    JobCreationFailed(String),

    #[error("No job with id {0}")]
    JobNotFound(String),

    /// Job names are metric labels, so they must be unique
    #[error("A job named {0} is already registered")]
    JobAlreadyExists(String),

    /// A run failed or outlived the job timeout
    #[error("Job run failed: {0}")]
    JobExecutionFailed(String),

    #[error("Invalid cron schedule {0}")]
    InvalidCronExpression(String),

    #[error("Cron scheduler error: {0}")]
    Cron(String),
}

impl From<JobSchedulerError> for SchedulerError {
    fn from(err: JobSchedulerError) -> Self {
        SchedulerError::Cron(err.to_string())
    }
}

impl From<SchedulerError> for AppError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::JobNotFound(msg) => AppError::NotFound(msg),
            SchedulerError::JobAlreadyExists(msg) => AppError::Conflict(msg),
            SchedulerError::InvalidCronExpression(msg) => AppError::Configuration(msg),
            other => AppError::Internal(other.to_string()),
        }
    }
}
