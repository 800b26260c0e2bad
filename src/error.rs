//! Harness error types.
//!
//! Monitor problems are not listed here as fatal conditions: the adapter logs
//! them and continues without memory counters. Only configuration and output
//! failures stop a run.

use std::path::PathBuf;

use peakbench_monitor::MonitorError;
use thiserror::Error;

/// Error type for harness operations.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("failed to read config file '{path}': {reason}")]
    ConfigReadFailed { path: PathBuf, reason: String },

    #[error("failed to parse config file '{path}': {reason}")]
    ConfigParseFailed { path: PathBuf, reason: String },

    #[error("invalid benchmark configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to read benchmark history '{path}': {reason}")]
    HistoryReadFailed { path: PathBuf, reason: String },

    #[error("failed to parse saved run '{path}': {reason}")]
    HistoryParseFailed { path: PathBuf, reason: String },

    #[error(transparent)]
    Monitor(#[from] MonitorError),

    #[error("failed to render report: {0}")]
    Render(#[from] serde_json::Error),
}

impl HarnessError {
    /// Create an invalid configuration error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

/// Result type for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
