//! Kernel configuration selection for the merge sort engine.
//!
//! Maps (target architecture, key size, value size) to the execution-group
//! shapes used by the two phases. Resolution order: exact measured entry for
//! the type pair, then a measured entry for the key's size class, then an
//! architecture-independent formula. The tables are compiled-in constants
//! produced from offline measurements; selection is a pure lookup with no
//! branching in the per-element path.

use strata_core::TargetArch;

/// Shape of one execution group: lanes per group and elements per lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelShape {
    pub block_size: u32,
    pub items_per_thread: u32,
}

impl KernelShape {
    pub const fn new(block_size: u32, items_per_thread: u32) -> Self {
        Self {
            block_size,
            items_per_thread,
        }
    }

    /// Elements processed by one group: block_size * items_per_thread.
    pub const fn tile(self) -> usize {
        self.block_size as usize * self.items_per_thread as usize
    }
}

/// Complete kernel configuration for one sort invocation.
///
/// Immutable for the duration of a call. `items_per_launch` bounds how many
/// elements a single merge-pass launch may cover before the range splitter
/// chunks it into multiple dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSortConfig {
    /// Shape of the in-group (block sort) phase.
    pub block_sort: KernelShape,
    /// Shape of the merge phase.
    pub merge: KernelShape,
    /// Maximum elements one merge-pass launch may address.
    pub items_per_launch: usize,
}

/// Default splitter threshold: comfortably inside native addressing for any
/// tile shape in the tables.
pub const DEFAULT_ITEMS_PER_LAUNCH: usize = 1 << 30;

impl MergeSortConfig {
    pub const fn new(block_sort: KernelShape, merge: KernelShape) -> Self {
        Self {
            block_sort,
            merge,
            items_per_launch: DEFAULT_ITEMS_PER_LAUNCH,
        }
    }

    pub const fn with_items_per_launch(mut self, items_per_launch: usize) -> Self {
        self.items_per_launch = items_per_launch;
        self
    }

    /// Entry-time validation of an explicit configuration.
    ///
    /// The merge network requires power-of-two tiles with the merge tile no
    /// larger than one run pair, and the splitter threshold must admit at
    /// least one merge group per launch.
    pub fn validate(&self) -> Result<(), String> {
        for (name, shape) in [("block_sort", self.block_sort), ("merge", self.merge)] {
            if shape.block_size == 0 || !shape.block_size.is_power_of_two() {
                return Err(format!("{name} block_size must be a nonzero power of two"));
            }
            if shape.items_per_thread == 0 || !shape.items_per_thread.is_power_of_two() {
                return Err(format!(
                    "{name} items_per_thread must be a nonzero power of two"
                ));
            }
        }
        if self.merge.tile() > 2 * self.block_sort.tile() {
            return Err(format!(
                "merge tile {} exceeds one run pair ({} elements)",
                self.merge.tile(),
                2 * self.block_sort.tile()
            ));
        }
        if self.items_per_launch < self.merge.tile() {
            return Err(format!(
                "items_per_launch {} is below the merge tile {}",
                self.items_per_launch,
                self.merge.tile()
            ));
        }
        Ok(())
    }
}

/// Coarse key-size bucket used by the class-level tuning tier.
///
/// Cutoffs are tuning constants recorded with the measurements, not
/// semantically meaningful boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeClass {
    B1,
    B2,
    B4,
    B8,
    B16,
    Wide,
}

pub(crate) fn size_class(key_bytes: usize) -> SizeClass {
    match key_bytes {
        0..=1 => SizeClass::B1,
        2 => SizeClass::B2,
        3..=4 => SizeClass::B4,
        5..=8 => SizeClass::B8,
        9..=16 => SizeClass::B16,
        _ => SizeClass::Wide,
    }
}

struct TunedPair {
    arch: TargetArch,
    key_bytes: usize,
    value_bytes: usize,
    config: MergeSortConfig,
}

struct TunedClass {
    arch: TargetArch,
    class: SizeClass,
    config: MergeSortConfig,
}

const fn cfg(sort_bs: u32, sort_ipt: u32, merge_bs: u32, merge_ipt: u32) -> MergeSortConfig {
    MergeSortConfig::new(
        KernelShape::new(sort_bs, sort_ipt),
        KernelShape::new(merge_bs, merge_ipt),
    )
}

/// Exact measured entries, keyed by (arch, key bytes, value bytes).
/// value_bytes = 0 means key-only sort.
const TUNED_PAIRS: &[TunedPair] = &[
    TunedPair {
        arch: TargetArch::Cdna2,
        key_bytes: 4,
        value_bytes: 0,
        config: cfg(256, 16, 256, 8),
    },
    TunedPair {
        arch: TargetArch::Cdna2,
        key_bytes: 4,
        value_bytes: 4,
        config: cfg(256, 8, 256, 8),
    },
    TunedPair {
        arch: TargetArch::Cdna2,
        key_bytes: 8,
        value_bytes: 0,
        config: cfg(256, 8, 256, 4),
    },
    TunedPair {
        arch: TargetArch::Rdna3,
        key_bytes: 4,
        value_bytes: 0,
        config: cfg(128, 16, 128, 8),
    },
    TunedPair {
        arch: TargetArch::Rdna3,
        key_bytes: 8,
        value_bytes: 4,
        config: cfg(128, 8, 128, 4),
    },
];

/// Class-level measured entries, keyed by (arch, key size class).
const TUNED_CLASSES: &[TunedClass] = &[
    TunedClass {
        arch: TargetArch::Cdna2,
        class: SizeClass::B1,
        config: cfg(256, 16, 256, 16),
    },
    TunedClass {
        arch: TargetArch::Cdna2,
        class: SizeClass::B2,
        config: cfg(256, 16, 256, 8),
    },
    TunedClass {
        arch: TargetArch::Cdna2,
        class: SizeClass::B8,
        config: cfg(256, 8, 256, 4),
    },
    TunedClass {
        arch: TargetArch::Cdna2,
        class: SizeClass::B16,
        config: cfg(256, 4, 256, 2),
    },
    TunedClass {
        arch: TargetArch::Rdna3,
        class: SizeClass::B4,
        config: cfg(128, 16, 128, 8),
    },
    TunedClass {
        arch: TargetArch::Vega,
        class: SizeClass::B4,
        config: cfg(256, 8, 256, 8),
    },
];

/// Architecture-independent fallback: larger combined footprints get fewer
/// elements per lane to bound register and group-memory pressure.
pub(crate) fn fallback_config(key_bytes: usize, value_bytes: usize) -> MergeSortConfig {
    let combined = (key_bytes + value_bytes).max(1);
    let items_per_thread: u32 = match combined {
        0..=4 => 8,
        5..=8 => 4,
        9..=16 => 2,
        _ => 1,
    };
    cfg(256, items_per_thread, 256, items_per_thread)
}

/// Resolve the configuration for a sort over the given type sizes.
pub(crate) fn select_config(
    arch: TargetArch,
    key_bytes: usize,
    value_bytes: usize,
) -> MergeSortConfig {
    if let Some(entry) = TUNED_PAIRS
        .iter()
        .find(|e| e.arch == arch && e.key_bytes == key_bytes && e.value_bytes == value_bytes)
    {
        return entry.config;
    }
    let class = size_class(key_bytes);
    if let Some(entry) = TUNED_CLASSES
        .iter()
        .find(|e| e.arch == arch && e.class == class)
    {
        return entry.config;
    }
    fallback_config(key_bytes, value_bytes)
}
