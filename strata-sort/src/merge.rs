//! Hierarchical merge network: doubles run length each pass until one run
//! spans the input.
//!
//! A pass is two dispatches (per launch chunk): the partition kernel runs
//! the merge-path search for every merge-tile boundary, then the merge
//! kernel fills each tile's disjoint output range from the two input
//! sub-ranges the search assigned to it. Passes ping-pong between the
//! output buffer and the scratch copy; the caller picks the block-sort
//! destination so the final pass always lands in the output buffer.
//!
//! Buffer roles per pass (pass_count = total number of passes):
//!   pass 0 reads the block-sort destination, writes the other side;
//!   pass k reads what pass k-1 wrote.
//! With the block sort writing to scratch when pass_count is odd, the last
//! pass always writes the output buffer and no copy-back is needed.

use strata_core::{CommandQueue, DeviceError, DeviceView};

use crate::config::MergeSortConfig;
use crate::partition::{merge_path, merge_ranges};
use crate::split::launch_chunks;

/// Views over the two ping-pong sides and the partition-offset region.
pub(crate) struct MergeBuffers<K, V> {
    pub out_keys: DeviceView<K>,
    pub tmp_keys: DeviceView<K>,
    pub out_vals: Option<DeviceView<V>>,
    pub tmp_vals: Option<DeviceView<V>>,
    pub partitions: DeviceView<u64>,
}

/// Per-tile geometry shared by the partition and merge kernels.
struct TileGeometry {
    pair_start: usize,
    left_end: usize,
    right_end: usize,
}

fn tile_geometry(group: usize, tiles_per_pair: usize, run_len: usize, n: usize) -> TileGeometry {
    let pair = group / tiles_per_pair;
    let pair_start = pair * 2 * run_len;
    TileGeometry {
        pair_start,
        left_end: (pair_start + run_len).min(n),
        right_end: (pair_start + 2 * run_len).min(n),
    }
}

/// Run all merge passes. `pass_count` is the number of passes the caller
/// derived from n and the block-sort tile; the block sort must have written
/// its runs to `tmp` when `pass_count` is odd, to `out` otherwise.
pub(crate) fn run_merge_passes<K, V, C>(
    queue: &CommandQueue,
    n: usize,
    config: &MergeSortConfig,
    bufs: &MergeBuffers<K, V>,
    pass_count: usize,
    is_less: &C,
    debug_synchronous: bool,
) -> Result<(), DeviceError>
where
    K: Copy + Send + Sync,
    V: Copy + Send + Sync,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    let sort_tile = config.block_sort.tile();
    let merge_tile = config.merge.tile();
    let max_groups_per_launch = (config.items_per_launch / merge_tile).max(1);
    let partitions = bufs.partitions;

    let mut run_len = sort_tile;
    let mut src_is_tmp = pass_count % 2 == 1;
    let mut pass = 0usize;

    while run_len < n {
        let (src_keys, dst_keys) = if src_is_tmp {
            (bufs.tmp_keys, bufs.out_keys)
        } else {
            (bufs.out_keys, bufs.tmp_keys)
        };
        let (src_vals, dst_vals) = if src_is_tmp {
            (bufs.tmp_vals, bufs.out_vals)
        } else {
            (bufs.out_vals, bufs.tmp_vals)
        };

        let total_groups = n.div_ceil(merge_tile);
        // Power-of-two tiles guarantee merge_tile divides one run pair.
        let tiles_per_pair = (2 * run_len) / merge_tile;

        if debug_synchronous {
            log::trace!(
                "merge pass {pass}: run_len={run_len}, {total_groups} groups, \
                 {tiles_per_pair} tiles per run pair"
            );
        }

        // The full pass's boundaries must be materialized before any merge
        // group reads its right neighbor, so all partition launches precede
        // all merge launches.
        for (offset, count) in launch_chunks(total_groups, max_groups_per_launch) {
            queue.dispatch("merge_partition", count, debug_synchronous, |local| {
                let g = offset + local;
                let geo = tile_geometry(g, tiles_per_pair, run_len, n);
                let tile_in_pair = g % tiles_per_pair;
                let diag = (tile_in_pair * merge_tile).min(geo.right_end - geo.pair_start);
                // SAFETY: src side is read-only for this pass; the slices
                // cover this pass's fully-materialized runs.
                let (left, right) = unsafe {
                    (
                        src_keys.slice(geo.pair_start, geo.left_end),
                        src_keys.slice(geo.left_end, geo.right_end),
                    )
                };
                let split = merge_path(left, right, diag, is_less);
                // SAFETY: entry g is owned by this group.
                unsafe { partitions.set(g, split as u64) };
            })?;
        }

        for (offset, count) in launch_chunks(total_groups, max_groups_per_launch) {
            queue.dispatch("merge_tiles", count, debug_synchronous, |local| {
                let g = offset + local;
                let geo = tile_geometry(g, tiles_per_pair, run_len, n);
                let left_len = geo.left_end - geo.pair_start;

                let out_start = g * merge_tile;
                let out_end = (out_start + merge_tile).min(geo.right_end);

                // SAFETY: partition dispatches for this pass have completed;
                // entries g and g+1 are read-only now.
                let a0 = unsafe { partitions.get(g) } as usize;
                let a1 = if out_end == geo.right_end {
                    // Last tile of this run pair takes the left run's tail.
                    left_len
                } else {
                    let next = unsafe { partitions.get(g + 1) };
                    next as usize
                };
                let b0 = (out_start - geo.pair_start) - a0;
                let b1 = (out_end - geo.pair_start) - a1;

                // SAFETY: src side read-only; dst range [out_start, out_end)
                // is this group's disjoint output tile.
                let (left, right) = unsafe {
                    (
                        src_keys.slice(geo.pair_start, geo.left_end),
                        src_keys.slice(geo.left_end, geo.right_end),
                    )
                };
                let mut out = out_start;
                merge_ranges(left, right, (a0, a1), (b0, b1), is_less, |from_left, idx| {
                    let (key, src_index) = if from_left {
                        (left[idx], geo.pair_start + idx)
                    } else {
                        (right[idx], geo.left_end + idx)
                    };
                    unsafe {
                        dst_keys.set(out, key);
                        if let (Some(sv), Some(dv)) = (src_vals, dst_vals) {
                            dv.set(out, sv.get(src_index));
                        }
                    }
                    out += 1;
                });
                debug_assert_eq!(out, out_end);
            })?;
        }

        src_is_tmp = !src_is_tmp;
        run_len *= 2;
        pass += 1;
    }

    // Parity bookkeeping must leave the final result in the output buffer.
    debug_assert!(n == 0 || run_len >= n);
    debug_assert!(!src_is_tmp, "pass parity out of sync after {pass} passes");
    Ok(())
}
