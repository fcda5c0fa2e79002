use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::app::{FetchPoolError, Result};

pub const DEFAULT_WORKERS: usize = 20;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the fetch pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of concurrent fetch workers (default: 20)
    pub workers: usize,

    /// Per-fetch timeout in seconds (default: 10)
    pub timeout_secs: u64,

    /// User agent string sent with every request
    pub user_agent: Option<String>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: None,
        }
    }
}

impl PoolConfig {
    pub fn with_workers(workers: usize) -> Self {
        Self {
            workers,
            ..Default::default()
        }
    }

    /// Get the per-fetch timeout as a Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(FetchPoolError::InvalidConfig(
                "workers must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(FetchPoolError::InvalidConfig(
                "timeout_secs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
