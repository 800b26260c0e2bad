//! Publishing window statistics as named benchmark counters.
//!
//! Statistics stay in bytes until this point; the unit is applied here and
//! nowhere else.

use std::collections::BTreeMap;

use clap::ValueEnum;
use peakbench_monitor::{MemoryStatistics, ProbeCapabilities};
use serde::{Deserialize, Serialize};

pub const MAX_PROC_PHYS_MEM: &str = "MaxProcPhysMem";
pub const MAX_PROC_VIRT_MEM: &str = "MaxProcVirtMem";
pub const MIN_PROC_PHYS_MEM: &str = "MinProcPhysMem";
pub const AVG_PROC_PHYS_MEM: &str = "AvgProcPhysMem";

/// Display unit for memory counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MemoryUnit {
    Bytes,
    #[value(name = "kib")]
    #[serde(rename = "kib")]
    KiB,
    #[default]
    #[value(name = "mib")]
    #[serde(rename = "mib")]
    MiB,
}

impl MemoryUnit {
    const fn divisor(self) -> f64 {
        match self {
            Self::Bytes => 1.0,
            Self::KiB => 1024.0,
            Self::MiB => 1024.0 * 1024.0,
        }
    }

    /// Short label used in report headers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bytes => "B",
            Self::KiB => "KiB",
            Self::MiB => "MiB",
        }
    }

    #[must_use]
    #[allow(clippy::cast_precision_loss)] // Acceptable precision loss for display purposes
    pub fn convert(self, bytes: u64) -> f64 {
        bytes as f64 / self.divisor()
    }

    #[must_use]
    pub fn convert_f64(self, bytes: f64) -> f64 {
        bytes / self.divisor()
    }
}

/// Named counters published alongside timing results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Counters(BTreeMap<String, f64>);

impl Counters {
    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, &value)| (name.as_str(), value))
    }
}

/// Convert window statistics into counters in `unit`.
///
/// Figures the probe cannot measure are left out rather than published as zero.
#[must_use]
pub fn publish(
    stats: &MemoryStatistics,
    capabilities: ProbeCapabilities,
    unit: MemoryUnit,
) -> Counters {
    let mut counters = Counters::default();

    if capabilities.resident.is_supported() {
        counters.insert(MAX_PROC_PHYS_MEM, unit.convert(stats.max_resident()));
        if let Some(min) = stats.min_resident() {
            counters.insert(MIN_PROC_PHYS_MEM, unit.convert(min));
        }
        if let Some(mean) = stats.mean_resident() {
            counters.insert(AVG_PROC_PHYS_MEM, unit.convert_f64(mean));
        }
    }

    if capabilities.virtual_memory.is_supported() {
        counters.insert(MAX_PROC_VIRT_MEM, unit.convert(stats.max_virtual()));
    }

    counters
}
