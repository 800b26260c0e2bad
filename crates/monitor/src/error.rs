//! Error types for probing and monitoring.
//!
//! Probe failures are recovered inside the sampler and never reach the
//! workload. Monitor errors are usage or resource problems the benchmark
//! adapter is expected to report and then continue without memory counters.

use thiserror::Error;

use crate::monitor::MonitorState;

/// A failed or unsupported operating-system memory query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// The query was attempted and failed.
    #[error("memory probe unavailable: {reason}")]
    Unavailable { reason: String },

    /// This platform exposes no usable memory counters.
    #[error("memory probing is not supported on {platform}")]
    Unsupported { platform: &'static str },
}

impl ProbeError {
    /// Create an unavailable-probe error.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Errors reported by [`crate::MemoryMonitor`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// `start()` outside Idle or `stop()` outside Running.
    #[error("cannot {operation} a memory monitor that is {state}")]
    InvalidStateTransition {
        operation: &'static str,
        state: MonitorState,
    },

    /// The sampling thread could not be created.
    #[error("failed to spawn memory sampler thread: {reason}")]
    SpawnFailure { reason: String },

    /// The sampling thread panicked before producing statistics.
    #[error("memory sampler thread panicked; statistics were lost")]
    SamplerPanicked,

    /// Monitor configuration was rejected.
    #[error("invalid monitor configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl MonitorError {
    pub(crate) const fn invalid_transition(operation: &'static str, state: MonitorState) -> Self {
        Self::InvalidStateTransition { operation, state }
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result type for monitor operations.
pub type Result<T> = std::result::Result<T, MonitorError>;
