//! Utility functions

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Build information printed by `--version`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
    pub git_hash: String,
    pub build_time: String,
}

/// Version of this binary, with the metadata stamped in by the build script
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_hash: option_env!("GIT_HASH").unwrap_or("unknown").to_string(),
        build_time: option_env!("BUILD_TIME").unwrap_or("unknown").to_string(),
    }
}

/// Exponential backoff used while waiting on cluster-side controllers
#[derive(Debug, Clone, Copy)]
pub struct Backoff {
    /// Delay before the second attempt
    pub base_delay: Duration,

    /// Upper bound for a single delay
    pub max_delay: Duration,

    /// Growth factor between attempts
    pub multiplier: f64,

    /// Total number of attempts, including the first
    pub attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            attempts: 10,
        }
    }
}

impl Backoff {
    /// Delay to wait after the given zero-based attempt failed
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let delay_secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay_secs.min(self.max_delay.as_secs_f64()))
    }

    /// Worst-case time spent sleeping before giving up
    pub fn total_wait(&self) -> Duration {
        (0..self.attempts.saturating_sub(1)).map(|a| self.delay(a)).sum()
    }
}
