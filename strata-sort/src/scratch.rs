//! Scratch memory layout for one sort invocation.
//!
//! The caller-supplied scratch buffer is partitioned into the partition-
//! offset region (one entry per merge-tile boundary), the secondary key
//! buffer, and (for pair sorts) the secondary value buffer. The same
//! computation serves both size-query mode (report `total_bytes`) and
//! execute mode (carve typed views).

use strata_core::buffer::ALLOC_ALIGN;
use strata_core::{DeviceBuffer, DeviceView};

use crate::config::MergeSortConfig;

/// Every region starts on an allocation-granule boundary, which satisfies
/// any trivially-copyable element alignment.
const REGION_ALIGN: usize = ALLOC_ALIGN;

fn align_up(offset: usize) -> usize {
    (offset + REGION_ALIGN - 1) & !(REGION_ALIGN - 1)
}

/// Byte offsets of the regions inside the scratch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScratchLayout {
    pub partitions_offset: usize,
    pub partition_entries: usize,
    pub keys_offset: usize,
    pub values_offset: usize,
    pub total_bytes: usize,
}

impl ScratchLayout {
    /// Compute the layout for sorting `n` elements under `config`.
    ///
    /// `value_bytes` is zero for key-only sorts. The result is positive for
    /// every `n`, including zero, so a size query is always allocatable.
    pub fn compute(
        n: usize,
        config: &MergeSortConfig,
        key_bytes: usize,
        value_bytes: usize,
    ) -> Self {
        let merge_tile = config.merge.tile();
        let partition_entries = n.div_ceil(merge_tile) + 1;

        let partitions_offset = 0;
        let keys_offset = align_up(partitions_offset + partition_entries * 8);
        let values_offset = align_up(keys_offset + n * key_bytes);
        let end = values_offset + n * value_bytes;
        let total_bytes = align_up(end).max(REGION_ALIGN);

        Self {
            partitions_offset,
            partition_entries,
            keys_offset,
            values_offset,
            total_bytes,
        }
    }

    /// View of the partition-offset region.
    pub fn partitions_view(&self, scratch: &DeviceBuffer<u8>) -> DeviceView<u64> {
        scratch.typed_view(self.partitions_offset, self.partition_entries)
    }

    /// View of the secondary key buffer.
    pub fn keys_view<K: Copy + Send + Sync + 'static>(
        &self,
        scratch: &DeviceBuffer<u8>,
        n: usize,
    ) -> DeviceView<K> {
        scratch.typed_view(self.keys_offset, n)
    }

    /// View of the secondary value buffer.
    pub fn values_view<V: Copy + Send + Sync + 'static>(
        &self,
        scratch: &DeviceBuffer<u8>,
        n: usize,
    ) -> DeviceView<V> {
        scratch.typed_view(self.values_offset, n)
    }
}
