use thiserror::Error;

/// Errors from workload setup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubarrayError {
    #[error("value range is empty: min {min} > max {max}")]
    EmptyRange { min: i64, max: i64 },

    #[error("unknown algorithm '{name}' (expected 'greedy' or 'divide-conquer')")]
    UnknownAlgorithm { name: String },
}
