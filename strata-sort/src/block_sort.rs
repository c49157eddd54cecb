//! In-group sorter: sorts one tile per execution group, stably.
//!
//! Each group stages its tile into group-local memory, sorts lane-local
//! runs with insertion sort, then merges the runs hierarchically (run count
//! halving per level) with the left run winning ties. The final partial
//! tile simply sorts its true length; no sentinel keys are materialized and
//! nothing past the input length is read.

use strata_core::{CommandQueue, DeviceError, DeviceView};

use crate::config::KernelShape;

/// Launch the block-sort phase over the first `n` elements of `src_keys`,
/// writing tiles of sorted runs to `dst_keys`. `vals` carries the matching
/// (source, destination) value views for pair sorts.
///
/// `src` and `dst` may share storage: every group stages its tile before
/// writing it back.
pub(crate) fn launch_block_sort<K, V, C>(
    queue: &CommandQueue,
    src_keys: DeviceView<K>,
    dst_keys: DeviceView<K>,
    vals: Option<(DeviceView<V>, DeviceView<V>)>,
    n: usize,
    shape: KernelShape,
    is_less: &C,
    debug_synchronous: bool,
) -> Result<(), DeviceError>
where
    K: Copy + Send + Sync,
    V: Copy + Send + Sync,
    C: Fn(&K, &K) -> bool + Send + Sync,
{
    let tile = shape.tile();
    let items_per_thread = shape.items_per_thread as usize;
    let group_count = n.div_ceil(tile);

    queue.dispatch("block_sort", group_count, debug_synchronous, |group| {
        let start = group * tile;
        let end = (start + tile).min(n);

        // Group-local staging, the shared-memory analogue. Staging before
        // writing also makes in-place operation safe within the tile.
        // SAFETY: [start, end) is this group's disjoint tile; src is not
        // written during this dispatch.
        let keys: Vec<K> = unsafe { src_keys.slice(start, end) }.to_vec();
        let staged_vals: Option<Vec<V>> =
            vals.map(|(src, _)| unsafe { src.slice(start, end) }.to_vec());

        let perm = sort_tile_perm(&keys, items_per_thread, is_less);

        // SAFETY: writes stay inside this group's tile.
        unsafe {
            for (i, &p) in perm.iter().enumerate() {
                dst_keys.set(start + i, keys[p as usize]);
            }
            if let (Some((_, dst_vals)), Some(staged)) = (vals, staged_vals.as_ref()) {
                for (i, &p) in perm.iter().enumerate() {
                    dst_vals.set(start + i, staged[p as usize]);
                }
            }
        }
    })
}

/// Stable sort of one tile, returned as a permutation of 0..keys.len().
///
/// Lane-local runs of `items_per_thread` are insertion sorted, then merged
/// pairwise level by level; both stages keep equal keys in input order.
fn sort_tile_perm<K, C>(keys: &[K], items_per_thread: usize, is_less: &C) -> Vec<u32>
where
    C: Fn(&K, &K) -> bool,
{
    let len = keys.len();
    let mut cur: Vec<u32> = (0..len as u32).collect();

    for run in cur.chunks_mut(items_per_thread) {
        insertion_sort_perm(keys, run, is_less);
    }

    let mut alt = vec![0u32; len];
    let mut width = items_per_thread;
    while width < len {
        for pair_start in (0..len).step_by(2 * width) {
            let mid = (pair_start + width).min(len);
            let pair_end = (pair_start + 2 * width).min(len);
            merge_perm_runs(
                keys,
                &cur[pair_start..pair_end],
                &mut alt[pair_start..pair_end],
                mid - pair_start,
                is_less,
            );
        }
        std::mem::swap(&mut cur, &mut alt);
        width *= 2;
    }
    cur
}

fn insertion_sort_perm<K, C>(keys: &[K], run: &mut [u32], is_less: &C)
where
    C: Fn(&K, &K) -> bool,
{
    for i in 1..run.len() {
        let item = run[i];
        let mut j = i;
        // Shift only while strictly greater; equal keys keep input order.
        while j > 0 && is_less(&keys[item as usize], &keys[run[j - 1] as usize]) {
            run[j] = run[j - 1];
            j -= 1;
        }
        run[j] = item;
    }
}

fn merge_perm_runs<K, C>(keys: &[K], src: &[u32], dst: &mut [u32], mid: usize, is_less: &C)
where
    C: Fn(&K, &K) -> bool,
{
    let (left, right) = src.split_at(mid);
    let mut i = 0;
    let mut j = 0;
    for slot in dst.iter_mut() {
        let take_right = i >= left.len()
            || (j < right.len()
                && is_less(&keys[right[j] as usize], &keys[left[i] as usize]));
        if take_right {
            *slot = right[j];
            j += 1;
        } else {
            *slot = left[i];
            i += 1;
        }
    }
}
