//! Configuration for memory monitoring windows

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::aggregator::StatisticsMode;
use crate::error::{MonitorError, Result};

/// Default pause between polls.
pub const DEFAULT_SAMPLING_INTERVAL: Duration = Duration::from_micros(500);

/// Longest allowed pause between polls; beyond this the peak estimate is meaningless
const MAX_SAMPLING_INTERVAL: Duration = Duration::from_secs(1);

const DEFAULT_THREAD_NAME: &str = "memory-sampler";

/// Configuration for a [`crate::MemoryMonitor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "MonitorConfigRepr", into = "MonitorConfigRepr")]
pub struct MonitorConfig {
    /// Pause between polls
    sampling_interval: Duration,

    /// Which statistics to aggregate
    statistics: StatisticsMode,

    /// Name given to the sampler thread
    thread_name: String,
}

impl MonitorConfig {
    /// Create a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if the interval is zero or
    /// longer than one second.
    ///
    /// # Examples
    ///
    /// ```
    /// # use peakbench_monitor::{MonitorConfig, StatisticsMode};
    /// # use std::time::Duration;
    /// let config = MonitorConfig::new(Duration::from_millis(1), StatisticsMode::Full);
    /// assert!(config.is_ok());
    /// ```
    pub fn new(sampling_interval: Duration, statistics: StatisticsMode) -> Result<Self> {
        Self::validate_sampling_interval(sampling_interval)?;
        Ok(Self {
            sampling_interval,
            statistics,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        })
    }

    /// Set the sampler thread name.
    ///
    /// # Errors
    ///
    /// Returns [`MonitorError::InvalidConfig`] if the name contains a NUL
    /// byte; the OS cannot name a thread like that.
    pub fn with_thread_name(mut self, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate_thread_name(&name)?;
        self.thread_name = name;
        Ok(self)
    }

    #[must_use]
    pub const fn sampling_interval(&self) -> Duration {
        self.sampling_interval
    }

    #[must_use]
    pub const fn statistics(&self) -> StatisticsMode {
        self.statistics
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    fn validate_sampling_interval(interval: Duration) -> Result<()> {
        if interval.is_zero() {
            Err(MonitorError::invalid_config(
                "sampling interval must be greater than 0",
            ))
        } else if interval > MAX_SAMPLING_INTERVAL {
            Err(MonitorError::invalid_config(format!(
                "sampling interval {interval:?} exceeds maximum {MAX_SAMPLING_INTERVAL:?}"
            )))
        } else {
            Ok(())
        }
    }

    fn validate_thread_name(name: &str) -> Result<()> {
        if name.contains('\0') {
            Err(MonitorError::invalid_config(format!(
                "sampler thread name {name:?} contains a NUL byte"
            )))
        } else {
            Ok(())
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            sampling_interval: DEFAULT_SAMPLING_INTERVAL,
            statistics: StatisticsMode::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

/// On-disk shape of [`MonitorConfig`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MonitorConfigRepr {
    sampling_interval_us: u64,
    statistics: StatisticsMode,
    thread_name: String,
}

impl Default for MonitorConfigRepr {
    fn default() -> Self {
        MonitorConfig::default().into()
    }
}

impl TryFrom<MonitorConfigRepr> for MonitorConfig {
    type Error = MonitorError;

    fn try_from(repr: MonitorConfigRepr) -> Result<Self> {
        Self::new(
            Duration::from_micros(repr.sampling_interval_us),
            repr.statistics,
        )
        .and_then(|config| config.with_thread_name(repr.thread_name))
    }
}

impl From<MonitorConfig> for MonitorConfigRepr {
    fn from(config: MonitorConfig) -> Self {
        Self {
            sampling_interval_us: u64::try_from(config.sampling_interval.as_micros())
                .unwrap_or(u64::MAX),
            statistics: config.statistics,
            thread_name: config.thread_name,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_valid_config() {
        let config = MonitorConfig::new(Duration::from_millis(2), StatisticsMode::MaxOnly);
        assert!(config.is_ok());
        let config = config.unwrap();
        assert_eq!(config.sampling_interval(), Duration::from_millis(2));
        assert_eq!(config.statistics(), StatisticsMode::MaxOnly);
        assert_eq!(config.thread_name(), "memory-sampler");
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = MonitorConfig::new(Duration::ZERO, StatisticsMode::Full);
        assert!(matches!(config, Err(MonitorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_interval_too_long_rejected() {
        let config = MonitorConfig::new(Duration::from_secs(2), StatisticsMode::Full);
        assert!(matches!(config, Err(MonitorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_default_config() {
        let config = MonitorConfig::default();
        assert_eq!(config.sampling_interval(), DEFAULT_SAMPLING_INTERVAL);
        assert_eq!(config.statistics(), StatisticsMode::Full);
    }

    #[test]
    fn test_with_thread_name() {
        let config = MonitorConfig::default()
            .with_thread_name("bench-sampler")
            .unwrap();
        assert_eq!(config.thread_name(), "bench-sampler");
    }

    #[test]
    fn test_thread_name_with_nul_rejected() {
        let config = MonitorConfig::default().with_thread_name("sampler\0x");
        assert!(matches!(config, Err(MonitorError::InvalidConfig { .. })));
    }

    #[test]
    fn test_deserialize_rejects_nul_thread_name() {
        let config = serde_json::from_str::<MonitorConfig>(r#"{"thread_name": "a\u0000b"}"#);
        assert!(config.is_err());
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: MonitorConfig =
            serde_json::from_str(r#"{"sampling_interval_us": 250}"#).unwrap();
        assert_eq!(config.sampling_interval(), Duration::from_micros(250));
        assert_eq!(config.statistics(), StatisticsMode::Full);
        assert_eq!(config.thread_name(), "memory-sampler");
    }

    #[test]
    fn test_deserialize_validates() {
        let config = serde_json::from_str::<MonitorConfig>(r#"{"sampling_interval_us": 0}"#);
        assert!(config.is_err());

        let config = serde_json::from_str::<MonitorConfig>(r#"{"interval": 5}"#);
        assert!(config.is_err());
    }

    #[test]
    fn test_serialize_uses_microseconds() {
        let json = serde_json::to_value(MonitorConfig::default()).unwrap();
        assert_eq!(json["sampling_interval_us"], 500);
        assert_eq!(json["statistics"], "full");
    }
}
