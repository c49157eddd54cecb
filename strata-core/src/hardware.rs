//! Hardware detection and architecture lookup for the device executor.
//!
//! Resolves the device name to a coarse target-architecture identifier that
//! the per-algorithm tuning tables are keyed by. The name comes from the
//! `STRATA_DEVICE_NAME` environment variable when set (used to pin a target
//! in tests), otherwise the host identifier is used.

use std::num::NonZeroUsize;

/// Coarse target-architecture identifier used as a tuning-table key.
///
/// The variants follow the accelerator generations the measurement data was
/// recorded on; `Generic` is every device without recorded measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetArch {
    Gcn3,
    Vega,
    Cdna1,
    Cdna2,
    Rdna2,
    Rdna3,
    Generic,
}

/// Hardware information for the current device.
pub struct HardwareInfo {
    /// Device name (e.g., "gfx90a", "host").
    pub device_name: String,
    /// Architecture identifier resolved from the device name.
    pub arch: TargetArch,
    /// Number of compute units available to the worker pool.
    pub compute_units: usize,
}

impl HardwareInfo {
    /// Detect hardware for the executing device.
    pub fn detect() -> Self {
        let device_name =
            std::env::var("STRATA_DEVICE_NAME").unwrap_or_else(|_| "host".to_string());
        let arch = lookup_arch(&device_name);
        let compute_units = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);

        Self {
            device_name,
            arch,
            compute_units,
        }
    }
}

/// Lookup the target architecture by device name.
pub fn lookup_arch(device_name: &str) -> TargetArch {
    let name = device_name.to_lowercase();

    if name.contains("gfx803") || name.contains("fiji") {
        TargetArch::Gcn3
    } else if name.contains("gfx900") || name.contains("gfx906") || name.contains("vega") {
        TargetArch::Vega
    } else if name.contains("gfx908") || name.contains("mi100") {
        TargetArch::Cdna1
    } else if name.contains("gfx90a") || name.contains("mi200") || name.contains("mi250") {
        TargetArch::Cdna2
    } else if name.contains("gfx103") || name.contains("navi2") {
        TargetArch::Rdna2
    } else if name.contains("gfx110") || name.contains("navi3") {
        TargetArch::Rdna3
    } else {
        TargetArch::Generic
    }
}
