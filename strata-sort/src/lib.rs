//! Device-wide stable merge sort.
//!
//! Comparison-based, stable, and addressable past the native per-launch
//! range. Follows the two-call scratch protocol: call once with
//! `scratch = None` to obtain the required byte count, allocate, then call
//! again with the buffer to perform the sort.
//!
//! ```no_run
//! use strata_core::DeviceContext;
//! use strata_sort::merge_sort;
//!
//! let ctx = DeviceContext::new();
//! let queue = ctx.command_queue();
//! let keys = ctx.alloc_buffer_with_data(&[5u32, 3, 3, 1, 4]).unwrap();
//!
//! let mut scratch_bytes = 0;
//! merge_sort(None, &mut scratch_bytes, &keys, &keys, 5, |a, b| a < b, &queue, false).unwrap();
//! let scratch = ctx.alloc_buffer::<u8>(scratch_bytes).unwrap();
//! merge_sort(Some(&scratch), &mut scratch_bytes, &keys, &keys, 5, |a, b| a < b, &queue, false)
//!     .unwrap();
//! assert_eq!(keys.as_slice(), &[1, 3, 3, 4, 5]);
//! ```

use strata_core::{CommandQueue, DeviceBuffer, DeviceError};

pub mod config;
mod block_sort;
mod merge;
mod partition;
mod scratch;
mod split;

pub use config::{KernelShape, MergeSortConfig};
pub use partition::merge_path;

use block_sort::launch_block_sort;
use config::select_config;
use merge::{run_merge_passes, MergeBuffers};
use scratch::ScratchLayout;

/// Marker bound for sortable keys and values: trivially copyable and safe
/// to hand to device kernels.
pub trait SortItem: Copy + Send + Sync + 'static {}
impl<T: Copy + Send + Sync + 'static> SortItem for T {}

#[derive(Debug, thiserror::Error)]
pub enum SortError {
    #[error("invalid kernel configuration: {0}")]
    InvalidConfig(String),
    #[error("scratch buffer holds {got} bytes but {required} are required")]
    ScratchTooSmall { got: usize, required: usize },
    #[error("{name} holds {len} elements but n is {n}")]
    BufferTooShort {
        name: &'static str,
        len: usize,
        n: usize,
    },
    #[error(transparent)]
    Device(#[from] DeviceError),
}

/// Stable sort of `n` keys by a strict-weak-ordering comparator.
///
/// With `scratch = None` (size-query mode) the required scratch byte count
/// is written to `scratch_bytes` (always positive, including for `n = 0`)
/// and the key buffers are not touched. With `Some(buffer)` the sort runs on
/// `queue`; `keys_output` may share storage with `keys_input` (in-place) or
/// be disjoint.
///
/// The kernel configuration is resolved from the queue's architecture and
/// the key size; `debug_synchronous` logs every internal dispatch.
#[allow(clippy::too_many_arguments)]
pub fn merge_sort<K, C>(
    scratch: Option<&DeviceBuffer<u8>>,
    scratch_bytes: &mut usize,
    keys_input: &DeviceBuffer<K>,
    keys_output: &DeviceBuffer<K>,
    n: usize,
    is_less: C,
    queue: &CommandQueue,
    debug_synchronous: bool,
) -> Result<(), SortError>
where
    K: SortItem,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    let config = select_config(queue.arch(), std::mem::size_of::<K>(), 0);
    merge_sort_with_config(
        scratch,
        scratch_bytes,
        keys_input,
        keys_output,
        n,
        is_less,
        queue,
        debug_synchronous,
        config,
    )
}

/// [`merge_sort`] with an explicit kernel configuration.
///
/// Intended for testing specific tile shapes, including splitter-stressing
/// configurations with a small `items_per_launch`.
#[allow(clippy::too_many_arguments)]
pub fn merge_sort_with_config<K, C>(
    scratch: Option<&DeviceBuffer<u8>>,
    scratch_bytes: &mut usize,
    keys_input: &DeviceBuffer<K>,
    keys_output: &DeviceBuffer<K>,
    n: usize,
    is_less: C,
    queue: &CommandQueue,
    debug_synchronous: bool,
    config: MergeSortConfig,
) -> Result<(), SortError>
where
    K: SortItem,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    sort_impl::<K, K, C>(
        scratch,
        scratch_bytes,
        keys_input,
        keys_output,
        None,
        n,
        is_less,
        queue,
        debug_synchronous,
        config,
    )
}

/// Stable sort of `n` (key, value) pairs by key.
///
/// Values travel with their keys; for equal keys the original input order
/// of the pairs is preserved. Same two-call scratch protocol and aliasing
/// rules as [`merge_sort`].
#[allow(clippy::too_many_arguments)]
pub fn merge_sort_pairs<K, V, C>(
    scratch: Option<&DeviceBuffer<u8>>,
    scratch_bytes: &mut usize,
    keys_input: &DeviceBuffer<K>,
    keys_output: &DeviceBuffer<K>,
    values_input: &DeviceBuffer<V>,
    values_output: &DeviceBuffer<V>,
    n: usize,
    is_less: C,
    queue: &CommandQueue,
    debug_synchronous: bool,
) -> Result<(), SortError>
where
    K: SortItem,
    V: SortItem,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    let config = select_config(
        queue.arch(),
        std::mem::size_of::<K>(),
        std::mem::size_of::<V>(),
    );
    merge_sort_pairs_with_config(
        scratch,
        scratch_bytes,
        keys_input,
        keys_output,
        values_input,
        values_output,
        n,
        is_less,
        queue,
        debug_synchronous,
        config,
    )
}

/// [`merge_sort_pairs`] with an explicit kernel configuration.
#[allow(clippy::too_many_arguments)]
pub fn merge_sort_pairs_with_config<K, V, C>(
    scratch: Option<&DeviceBuffer<u8>>,
    scratch_bytes: &mut usize,
    keys_input: &DeviceBuffer<K>,
    keys_output: &DeviceBuffer<K>,
    values_input: &DeviceBuffer<V>,
    values_output: &DeviceBuffer<V>,
    n: usize,
    is_less: C,
    queue: &CommandQueue,
    debug_synchronous: bool,
    config: MergeSortConfig,
) -> Result<(), SortError>
where
    K: SortItem,
    V: SortItem,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    sort_impl::<K, V, C>(
        scratch,
        scratch_bytes,
        keys_input,
        keys_output,
        Some((values_input, values_output)),
        n,
        is_less,
        queue,
        debug_synchronous,
        config,
    )
}

fn ceil_log2(x: usize) -> usize {
    debug_assert!(x > 0);
    x.next_power_of_two().trailing_zeros() as usize
}

#[allow(clippy::too_many_arguments)]
fn sort_impl<K, V, C>(
    scratch: Option<&DeviceBuffer<u8>>,
    scratch_bytes: &mut usize,
    keys_input: &DeviceBuffer<K>,
    keys_output: &DeviceBuffer<K>,
    values: Option<(&DeviceBuffer<V>, &DeviceBuffer<V>)>,
    n: usize,
    is_less: C,
    queue: &CommandQueue,
    debug_synchronous: bool,
    config: MergeSortConfig,
) -> Result<(), SortError>
where
    K: SortItem,
    V: SortItem,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    config.validate().map_err(SortError::InvalidConfig)?;

    let value_bytes = if values.is_some() {
        std::mem::size_of::<V>()
    } else {
        0
    };
    let layout = ScratchLayout::compute(n, &config, std::mem::size_of::<K>(), value_bytes);

    // Size-query mode: report and return without touching any input.
    let Some(scratch) = scratch else {
        *scratch_bytes = layout.total_bytes;
        return Ok(());
    };

    if scratch.len() < layout.total_bytes {
        return Err(SortError::ScratchTooSmall {
            got: scratch.len(),
            required: layout.total_bytes,
        });
    }
    for (name, len) in [
        ("keys_input", keys_input.len()),
        ("keys_output", keys_output.len()),
    ] {
        if len < n {
            return Err(SortError::BufferTooShort { name, len, n });
        }
    }
    if let Some((vin, vout)) = values {
        for (name, len) in [
            ("values_input", vin.len()),
            ("values_output", vout.len()),
        ] {
            if len < n {
                return Err(SortError::BufferTooShort { name, len, n });
            }
        }
    }

    if n == 0 {
        return Ok(());
    }

    let sort_tile = config.block_sort.tile();
    let pass_count = ceil_log2(n.div_ceil(sort_tile));

    if debug_synchronous {
        log::debug!(
            "merge_sort: n={n}, sort_tile={sort_tile}, merge_tile={}, {pass_count} merge passes",
            config.merge.tile()
        );
    }

    let out_keys = keys_output.view();
    let tmp_keys = layout.keys_view::<K>(scratch, n);
    let out_vals = values.map(|(_, vout)| vout.view());
    let tmp_vals = values.map(|_| layout.values_view::<V>(scratch, n));
    let partitions = layout.partitions_view(scratch);

    // The block sort writes the side that makes the final merge pass land
    // in keys_output (see merge.rs for the parity argument).
    let (block_dst_keys, block_dst_vals) = if pass_count % 2 == 1 {
        (tmp_keys, tmp_vals)
    } else {
        (out_keys, out_vals)
    };

    let block_vals = match (values, block_dst_vals) {
        (Some((vin, _)), Some(dst)) => Some((vin.view(), dst)),
        _ => None,
    };
    launch_block_sort(
        queue,
        keys_input.view(),
        block_dst_keys,
        block_vals,
        n,
        config.block_sort,
        &is_less,
        debug_synchronous,
    )?;

    let bufs = MergeBuffers {
        out_keys,
        tmp_keys,
        out_vals,
        tmp_vals,
        partitions,
    };
    run_merge_passes(queue, n, &config, &bufs, pass_count, &is_less, debug_synchronous)?;

    Ok(())
}
