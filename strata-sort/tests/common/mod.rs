#![allow(dead_code)]

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use strata_core::{DeviceBuffer, DeviceContext};
use strata_sort::{
    merge_sort, merge_sort_pairs_with_config, merge_sort_with_config, MergeSortConfig,
};

pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Full two-call protocol: query the scratch size, allocate, sort, read back.
pub fn device_sort<K, C>(ctx: &DeviceContext, data: &[K], is_less: C) -> Vec<K>
where
    K: Copy + Send + Sync + 'static,
    C: Fn(&K, &K) -> bool + Send + Sync + Copy,
{
    let queue = ctx.command_queue();
    let keys_in = ctx.alloc_buffer_with_data(data).unwrap();
    let keys_out = ctx.alloc_buffer::<K>(data.len()).unwrap();

    let mut scratch_bytes = 0;
    merge_sort(
        None,
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        data.len(),
        is_less,
        &queue,
        false,
    )
    .unwrap();
    assert!(scratch_bytes > 0, "size query must report a positive size");

    let scratch = ctx.alloc_buffer::<u8>(scratch_bytes).unwrap();
    merge_sort(
        Some(&scratch),
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        data.len(),
        is_less,
        &queue,
        false,
    )
    .unwrap();
    keys_out.as_slice().to_vec()
}

/// As [`device_sort`], with an explicit configuration.
pub fn device_sort_with_config<K, C>(
    ctx: &DeviceContext,
    data: &[K],
    is_less: C,
    config: MergeSortConfig,
) -> Vec<K>
where
    K: Copy + Send + Sync + 'static,
    C: Fn(&K, &K) -> bool + Send + Sync + Copy,
{
    let queue = ctx.command_queue();
    let keys_in = ctx.alloc_buffer_with_data(data).unwrap();
    let keys_out = ctx.alloc_buffer::<K>(data.len()).unwrap();

    let mut scratch_bytes = 0;
    merge_sort_with_config(
        None,
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        data.len(),
        is_less,
        &queue,
        false,
        config,
    )
    .unwrap();
    let scratch = ctx.alloc_buffer::<u8>(scratch_bytes).unwrap();
    merge_sort_with_config(
        Some(&scratch),
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        data.len(),
        is_less,
        &queue,
        false,
        config,
    )
    .unwrap();
    keys_out.as_slice().to_vec()
}

/// Pair-sort harness; returns the sorted (keys, values).
pub fn device_sort_pairs_with_config<K, V, C>(
    ctx: &DeviceContext,
    keys: &[K],
    values: &[V],
    is_less: C,
    config: MergeSortConfig,
) -> (Vec<K>, Vec<V>)
where
    K: Copy + Send + Sync + 'static,
    V: Copy + Send + Sync + 'static,
    C: Fn(&K, &K) -> bool + Send + Sync + Copy,
{
    assert_eq!(keys.len(), values.len());
    let queue = ctx.command_queue();
    let keys_in = ctx.alloc_buffer_with_data(keys).unwrap();
    let keys_out = ctx.alloc_buffer::<K>(keys.len()).unwrap();
    let vals_in = ctx.alloc_buffer_with_data(values).unwrap();
    let vals_out = ctx.alloc_buffer::<V>(values.len()).unwrap();

    let mut scratch_bytes = 0;
    merge_sort_pairs_with_config(
        None,
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        &vals_in,
        &vals_out,
        keys.len(),
        is_less,
        &queue,
        false,
        config,
    )
    .unwrap();
    let scratch = ctx.alloc_buffer::<u8>(scratch_bytes).unwrap();
    merge_sort_pairs_with_config(
        Some(&scratch),
        &mut scratch_bytes,
        &keys_in,
        &keys_out,
        &vals_in,
        &vals_out,
        keys.len(),
        is_less,
        &queue,
        false,
        config,
    )
    .unwrap();
    (keys_out.as_slice().to_vec(), vals_out.as_slice().to_vec())
}

/// Allocate the queried scratch size for a key-only sort of `n` elements.
pub fn alloc_scratch_for<K>(ctx: &DeviceContext, n: usize) -> DeviceBuffer<u8>
where
    K: Copy + Send + Sync + 'static,
{
    let queue = ctx.command_queue();
    let keys = ctx.alloc_buffer::<K>(n).unwrap();
    let mut scratch_bytes = 0;
    merge_sort(
        None,
        &mut scratch_bytes,
        &keys,
        &keys,
        n,
        |_: &K, _: &K| false,
        &queue,
        false,
    )
    .unwrap();
    ctx.alloc_buffer::<u8>(scratch_bytes).unwrap()
}

/// Verify that the same multiset of (key, value) pairs exists before and
/// after sorting.
pub fn verify_pairs_preserved(
    orig_keys: &[u32],
    orig_vals: &[u32],
    sorted_keys: &[u32],
    sorted_vals: &[u32],
) -> bool {
    if orig_keys.len() != sorted_keys.len() || orig_vals.len() != sorted_vals.len() {
        return false;
    }
    let mut orig: Vec<(u32, u32)> = orig_keys
        .iter()
        .copied()
        .zip(orig_vals.iter().copied())
        .collect();
    let mut sorted: Vec<(u32, u32)> = sorted_keys
        .iter()
        .copied()
        .zip(sorted_vals.iter().copied())
        .collect();
    orig.sort();
    sorted.sort();
    orig == sorted
}
