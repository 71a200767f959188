//! Watch loop configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default lap interval, in seconds.
pub const DEFAULT_INTERVAL_SECS: i64 = 10;
/// Default job timeout, in seconds (ten days).
pub const DEFAULT_TIMEOUT_SECS: i64 = 864_000;
/// Default number of concurrently tracked jobs.
pub const DEFAULT_MAX_WATCH_NUM: i64 = 100;

/// Configuration for the watch loop.
///
/// Values are kept signed so config files can carry `0` or a negative number
/// to mean "use the default"; [`WatchConfig::set_default`] normalizes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
    /// Minimum seconds between laps.
    #[serde(default = "default_interval")]
    pub interval: i64,

    /// Seconds a job may run before it is force-terminated.
    #[serde(default = "default_timeout")]
    pub timeout: i64,

    /// Maximum number of concurrently tracked jobs.
    #[serde(default = "default_max_watch_num")]
    pub max_watch_num: i64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            max_watch_num: default_max_watch_num(),
        }
    }
}

impl WatchConfig {
    /// Set the lap interval in seconds.
    #[must_use]
    pub const fn interval_secs(mut self, secs: i64) -> Self {
        self.interval = secs;
        self
    }

    /// Set the job timeout in seconds.
    #[must_use]
    pub const fn timeout_secs(mut self, secs: i64) -> Self {
        self.timeout = secs;
        self
    }

    /// Set the capacity.
    #[must_use]
    pub const fn max_watch_num(mut self, max: i64) -> Self {
        self.max_watch_num = max;
        self
    }

    /// Replace every non-positive value with its default.
    pub fn set_default(&mut self) {
        if self.interval <= 0 {
            self.interval = DEFAULT_INTERVAL_SECS;
        }
        if self.timeout <= 0 {
            self.timeout = DEFAULT_TIMEOUT_SECS;
        }
        if self.max_watch_num <= 0 {
            self.max_watch_num = DEFAULT_MAX_WATCH_NUM;
        }
    }

    /// Lap interval, falling back to the default for non-positive values.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(positive_or(self.interval, DEFAULT_INTERVAL_SECS))
    }

    /// Job timeout in seconds, falling back to the default for non-positive
    /// values.
    pub fn timeout(&self) -> u64 {
        positive_or(self.timeout, DEFAULT_TIMEOUT_SECS)
    }

    /// Capacity, falling back to the default for non-positive values.
    pub fn capacity(&self) -> usize {
        let max = positive_or(self.max_watch_num, DEFAULT_MAX_WATCH_NUM);
        usize::try_from(max).unwrap_or(usize::MAX)
    }
}

fn positive_or(value: i64, default: i64) -> u64 {
    u64::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .or_else(|| u64::try_from(default).ok())
        .unwrap_or(1)
}

const fn default_interval() -> i64 {
    DEFAULT_INTERVAL_SECS
}

const fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

const fn default_max_watch_num() -> i64 {
    DEFAULT_MAX_WATCH_NUM
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WatchConfig::default();
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.timeout(), 864_000);
        assert_eq!(config.capacity(), 100);
    }

    #[test]
    fn test_set_default_replaces_non_positive_values() {
        let mut config = WatchConfig::default()
            .interval_secs(0)
            .timeout_secs(-5)
            .max_watch_num(7);
        config.set_default();
        assert_eq!(config.interval, 10);
        assert_eq!(config.timeout, 864_000);
        assert_eq!(config.max_watch_num, 7);
    }

    #[test]
    fn test_accessors_tolerate_unnormalized_values() {
        let config = WatchConfig::default().interval_secs(-1).max_watch_num(0);
        assert_eq!(config.interval(), Duration::from_secs(10));
        assert_eq!(config.capacity(), 100);
    }

    #[test]
    fn test_partial_document_uses_defaults() -> Result<(), serde_json::Error> {
        let config: WatchConfig = serde_json::from_str(r#"{"interval": 3}"#)?;
        assert_eq!(config.interval(), Duration::from_secs(3));
        assert_eq!(config.timeout(), 864_000);
        assert_eq!(config.capacity(), 100);
        Ok(())
    }
}
