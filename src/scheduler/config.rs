//! Configuration for the scheduler module

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the scheduler service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Whether the scheduler is enabled
    pub enabled: bool,

    /// Upper bound on a single job execution
    #[serde(with = "duration_secs")]
    pub job_timeout: Duration,

    /// Predefined jobs configuration
    pub jobs: JobsConfig,
}

/// Configuration for predefined scheduled jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    /// Replays pending change events into the live generation
    pub delta_reindex: JobConfig,

    /// Deletes generations that are not live
    pub sweep_orphans: JobConfig,
}

/// Configuration for a single scheduled job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Whether this job is enabled
    pub enabled: bool,

    /// Cron expression with a seconds field
    pub schedule: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            job_timeout: Duration::from_secs(300), // 5 minutes
            jobs: JobsConfig::default(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            delta_reindex: JobConfig {
                enabled: true,
                schedule: "0 */5 * * * *".to_string(), // Every 5 minutes
            },
            sweep_orphans: JobConfig {
                enabled: false,
                schedule: "0 30 3 * * *".to_string(), // Daily at 03:30
            },
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

/// Builder for SchedulerConfig
pub struct SchedulerConfigBuilder {
    config: SchedulerConfig,
}

impl SchedulerConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SchedulerConfig::default(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn job_timeout(mut self, timeout: Duration) -> Self {
        self.config.job_timeout = timeout;
        self
    }

    pub fn delta_reindex(mut self, enabled: bool, schedule: impl Into<String>) -> Self {
        self.config.jobs.delta_reindex = JobConfig {
            enabled,
            schedule: schedule.into(),
        };
        self
    }

    pub fn sweep_orphans(mut self, enabled: bool, schedule: impl Into<String>) -> Self {
        self.config.jobs.sweep_orphans = JobConfig {
            enabled,
            schedule: schedule.into(),
        };
        self
    }

    pub fn build(self) -> SchedulerConfig {
        self.config
    }
}

impl Default for SchedulerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert!(config.enabled);
        assert!(config.jobs.delta_reindex.enabled);
        assert_eq!(config.jobs.delta_reindex.schedule, "0 */5 * * * *");
        assert!(!config.jobs.sweep_orphans.enabled);
    }

    #[test]
    fn test_builder() {
        let config = SchedulerConfigBuilder::new()
            .enabled(false)
            .job_timeout(Duration::from_secs(10))
            .sweep_orphans(true, "0 0 * * * *")
            .build();

        assert!(!config.enabled);
        assert_eq!(config.job_timeout, Duration::from_secs(10));
        assert!(config.jobs.sweep_orphans.enabled);
        assert_eq!(config.jobs.sweep_orphans.schedule, "0 0 * * * *");
    }

    #[test]
    fn test_job_timeout_in_seconds() {
        let config: SchedulerConfig =
            serde_json::from_str(r#"{"job_timeout": 42}"#).unwrap();
        assert_eq!(config.job_timeout, Duration::from_secs(42));
        assert!(config.jobs.delta_reindex.enabled);
    }
}
