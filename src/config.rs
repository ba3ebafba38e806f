//! Runtime configuration, loaded from the environment.

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::lectures::DayLimits;
use crate::scraper::RetryPolicy;

/// Optional file layered beneath the environment.
const CONFIG_FILE: &str = "timetable.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_upstream_url")]
    pub upstream_url: String,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Targets fetched concurrently per slice.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,
    /// Pause between slices.
    #[serde(default = "default_slice_delay_ms")]
    pub slice_delay_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_day_count")]
    pub default_day_count: u32,
    #[serde(default = "default_max_day_count")]
    pub max_day_count: u32,
    #[serde(default = "default_shutdown_timeout_secs")]
    pub shutdown_timeout_secs: u64,
}

fn default_log_level() -> String {
    "info".to_owned()
}
fn default_port() -> u16 {
    8080
}
fn default_upstream_url() -> String {
    "https://lms.nibmworldwide.com/mod/nibm/display.php".to_owned()
}
fn default_request_timeout_ms() -> u64 {
    15_000
}
fn default_concurrency_limit() -> usize {
    3
}
fn default_slice_delay_ms() -> u64 {
    100
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    1_000
}
fn default_cache_ttl_secs() -> u64 {
    5 * 60
}
fn default_day_count() -> u32 {
    3
}
fn default_max_day_count() -> u32 {
    14
}
fn default_shutdown_timeout_secs() -> u64 {
    10
}

/// Validated settings for the aggregation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub upstream_url: Url,
    pub request_timeout: Duration,
    pub concurrency_limit: usize,
    pub slice_delay: Duration,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    pub limits: DayLimits,
}

impl Config {
    /// Load from `timetable.toml` (if present) overlaid with environment variables.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    pub fn figment() -> Figment {
        Figment::new()
            .merge(Toml::file(CONFIG_FILE))
            .merge(Env::raw())
    }

    pub fn pipeline(&self) -> anyhow::Result<PipelineConfig> {
        let upstream_url = Url::parse(&self.upstream_url)
            .with_context(|| format!("Invalid upstream URL {:?}", self.upstream_url))?;

        Ok(PipelineConfig {
            upstream_url,
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            concurrency_limit: self.concurrency_limit.max(1),
            slice_delay: Duration::from_millis(self.slice_delay_ms),
            retry: RetryPolicy::new(
                self.max_attempts,
                Duration::from_millis(self.retry_base_delay_ms),
            ),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            limits: DayLimits {
                default_day_count: self.default_day_count.max(1),
                max_day_count: self.max_day_count.max(self.default_day_count).max(1),
            },
        })
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}
