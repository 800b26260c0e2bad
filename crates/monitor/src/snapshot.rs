//! Point-in-time memory figures and what a probe can report.

use serde::{Deserialize, Serialize};

/// Memory footprint of the current process at one instant, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemorySnapshot {
    resident_bytes: u64,
    virtual_bytes: u64,
}

impl MemorySnapshot {
    /// Fallback used before any successful query.
    pub const ZERO: Self = Self::new(0, 0);

    /// Create a snapshot from resident and virtual byte counts.
    #[must_use]
    pub const fn new(resident_bytes: u64, virtual_bytes: u64) -> Self {
        Self {
            resident_bytes,
            virtual_bytes,
        }
    }

    /// Resident set size in bytes.
    #[must_use]
    pub const fn resident_bytes(&self) -> u64 {
        self.resident_bytes
    }

    /// Virtual (private) memory in bytes. Zero when unsupported.
    #[must_use]
    pub const fn virtual_bytes(&self) -> u64 {
        self.virtual_bytes
    }
}

/// How a probe obtains one of its figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    /// The OS keeps a running maximum; one sample already reflects the peak.
    PeakTracked,
    /// The OS reports the current value; polling approximates the peak.
    Instantaneous,
    /// Not available here. The figure is always zero and must not be published.
    Unsupported,
}

impl Capability {
    /// Whether the figure carries real data.
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::Unsupported)
    }
}

/// Per-figure capabilities of a probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeCapabilities {
    pub resident: Capability,
    #[serde(rename = "virtual")]
    pub virtual_memory: Capability,
}

impl ProbeCapabilities {
    /// Capabilities of a probe that can report nothing.
    pub const UNSUPPORTED: Self = Self::new(Capability::Unsupported, Capability::Unsupported);

    #[must_use]
    pub const fn new(resident: Capability, virtual_memory: Capability) -> Self {
        Self {
            resident,
            virtual_memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_accessors() {
        let snapshot = MemorySnapshot::new(4096, 8192);
        assert_eq!(snapshot.resident_bytes(), 4096);
        assert_eq!(snapshot.virtual_bytes(), 8192);
        assert_eq!(MemorySnapshot::default(), MemorySnapshot::ZERO);
    }

    #[test]
    fn test_capability_support() {
        assert!(Capability::PeakTracked.is_supported());
        assert!(Capability::Instantaneous.is_supported());
        assert!(!Capability::Unsupported.is_supported());
        assert!(!ProbeCapabilities::UNSUPPORTED.resident.is_supported());
    }
}
