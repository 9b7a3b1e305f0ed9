//! Engine configuration.
//!
//! Defaults come from serde `default_*` helpers; `WEFT_*` environment
//! variables override them at load time.

use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Job runner configuration
    #[serde(default)]
    pub runner: RunnerConfig,

    /// Admission control (rate limiting) configuration
    #[serde(default)]
    pub admission: AdmissionConfig,
}

/// Job runner configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Concurrent workers
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Global throughput cap in jobs per second
    #[serde(default = "default_jobs_per_second")]
    pub max_jobs_per_second: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_jobs_per_second: default_jobs_per_second(),
        }
    }
}

fn default_concurrency() -> usize {
    5
}

fn default_jobs_per_second() -> u32 {
    10
}

/// Per-identifier admission window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Counter key prefix
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Requests allowed per window; 0 disables the limit
    #[serde(default = "default_limit")]
    pub limit: u64,

    /// Window length in seconds
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            limit: default_limit(),
            window_seconds: default_window_seconds(),
        }
    }
}

fn default_prefix() -> String {
    "weft:ratelimit".to_string()
}

fn default_limit() -> u64 {
    100
}

fn default_window_seconds() -> u64 {
    60
}

impl EngineConfig {
    /// Defaults plus environment overrides.
    pub fn load() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("WEFT_RUNNER_CONCURRENCY") {
            if let Ok(parsed) = value.parse::<usize>() {
                self.runner.concurrency = parsed;
            }
        }
        if let Ok(value) = std::env::var("WEFT_RUNNER_MAX_JOBS_PER_SECOND") {
            if let Ok(parsed) = value.parse::<u32>() {
                self.runner.max_jobs_per_second = parsed;
            }
        }
        if let Ok(value) = std::env::var("WEFT_ADMISSION_PREFIX") {
            self.admission.prefix = value;
        }
        if let Ok(value) = std::env::var("WEFT_ADMISSION_LIMIT") {
            if let Ok(parsed) = value.parse::<u64>() {
                self.admission.limit = parsed;
            }
        }
        if let Ok(value) = std::env::var("WEFT_ADMISSION_WINDOW_SECONDS") {
            if let Ok(parsed) = value.parse::<u64>() {
                self.admission.window_seconds = parsed;
            }
        }
    }
}
