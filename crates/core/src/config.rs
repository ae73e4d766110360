// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Layered configuration: built-in defaults, overridden by an optional TOML
//! file, overridden by `OJD_*` environment variables.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value:?}")]
    BadEnvValue { var: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub hosts: Vec<String>,
    pub session_timeout_ms: u64,
    pub randomize_hosts: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["memory://local".to_string()],
            session_timeout_ms: 10_000,
            randomize_hosts: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    pub max_jobs: u32,
    pub max_jobs_sleep_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_jobs: 100, max_jobs_sleep_ms: 1_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorConfig {
    pub interval_s: u64,
    pub delay_s: u64,
    pub done_lifetime_s: u64,
    pub recycled_priority: u32,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            interval_s: 2,
            delay_s: 5,
            done_lifetime_s: 60,
            recycled_priority: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub input_limit: u32,
    pub delete_timeout_s: f64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self { input_limit: 5_000, delete_timeout_s: 15.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopsConfig {
    pub fail_sleep_s: u64,
    pub max_fails: u32,
    pub empty_sleep_s: u64,
}

impl Default for LoopsConfig {
    fn default() -> Self {
        Self { fail_sleep_s: 5, max_fails: 10, empty_sleep_s: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub worker: WorkerConfig,
    pub collector: CollectorConfig,
    pub api: ApiConfig,
    pub loops: LoopsConfig,
}

impl Config {
    /// Load defaults, then an optional TOML file at `path` if it exists,
    /// then `OJD_*` environment overrides. A missing file is not an error;
    /// a malformed one is.
    pub fn load(path: Option<&std::path::Path>) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        if let Some(path) = path {
            if path.exists() {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.display().to_string(),
                    source,
                })?;
                config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
                    path: path.display().to_string(),
                    source,
                })?;
            }
        }
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        apply_u64_env("OJD_BACKEND_SESSION_TIMEOUT_MS", &mut self.backend.session_timeout_ms)?;
        apply_bool_env("OJD_BACKEND_RANDOMIZE_HOSTS", &mut self.backend.randomize_hosts)?;
        apply_u32_env("OJD_WORKER_MAX_JOBS", &mut self.worker.max_jobs)?;
        apply_u64_env("OJD_WORKER_MAX_JOBS_SLEEP_MS", &mut self.worker.max_jobs_sleep_ms)?;
        apply_u64_env("OJD_COLLECTOR_INTERVAL_S", &mut self.collector.interval_s)?;
        apply_u64_env("OJD_COLLECTOR_DELAY_S", &mut self.collector.delay_s)?;
        apply_u64_env("OJD_COLLECTOR_DONE_LIFETIME_S", &mut self.collector.done_lifetime_s)?;
        apply_u32_env("OJD_COLLECTOR_RECYCLED_PRIORITY", &mut self.collector.recycled_priority)?;
        apply_u32_env("OJD_API_INPUT_LIMIT", &mut self.api.input_limit)?;
        apply_u64_env("OJD_LOOPS_FAIL_SLEEP_S", &mut self.loops.fail_sleep_s)?;
        apply_u32_env("OJD_LOOPS_MAX_FAILS", &mut self.loops.max_fails)?;
        apply_u64_env("OJD_LOOPS_EMPTY_SLEEP_S", &mut self.loops.empty_sleep_s)?;
        if let Ok(hosts) = std::env::var("OJD_BACKEND_HOSTS") {
            self.backend.hosts = hosts.split(',').map(|s| s.trim().to_string()).collect();
        }
        Ok(())
    }
}

fn apply_u64_env(var: &str, slot: &mut u64) -> Result<(), ConfigError> {
    match std::env::var(var) {
        Ok(value) => {
            *slot = value
                .parse()
                .map_err(|_| ConfigError::BadEnvValue { var: var.to_string(), value })?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

fn apply_u32_env(var: &str, slot: &mut u32) -> Result<(), ConfigError> {
    match std::env::var(var) {
        Ok(value) => {
            *slot = value
                .parse()
                .map_err(|_| ConfigError::BadEnvValue { var: var.to_string(), value })?;
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

fn apply_bool_env(var: &str, slot: &mut bool) -> Result<(), ConfigError> {
    match std::env::var(var) {
        Ok(value) => {
            *slot = match value.as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => return Err(ConfigError::BadEnvValue { var: var.to_string(), value }),
            };
            Ok(())
        }
        Err(_) => Ok(()),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
