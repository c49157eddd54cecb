//! Merge-path partitioning: the split-point search that assigns disjoint
//! sub-ranges of two sorted runs to merge groups.
//!
//! For a diagonal `d` (a desired output offset into the merged sequence),
//! `merge_path` returns the unique split `a` such that taking the first `a`
//! elements of the left run and the first `d - a` elements of the right run
//! reproduces the first `d` elements of a stable merge. Ties break toward
//! the left run, so group boundaries never reorder equal keys.

/// Find the stable split point for output offset `diag`.
///
/// Returns `a`, the number of elements taken from `left`; the remaining
/// `diag - a` come from `right`. `diag` must not exceed
/// `left.len() + right.len()`.
pub fn merge_path<K, C>(left: &[K], right: &[K], diag: usize, is_less: &C) -> usize
where
    C: Fn(&K, &K) -> bool,
{
    debug_assert!(diag <= left.len() + right.len());
    let mut lo = diag.saturating_sub(right.len());
    let mut hi = diag.min(left.len());
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        // left[mid] pairs with right[diag - 1 - mid] across the diagonal.
        // Keep left[mid] unless the right element is strictly less; equal
        // keys therefore stay with the left run.
        if is_less(&right[diag - 1 - mid], &left[mid]) {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Stable serial merge of `left[a0..a1]` and `right[b0..b1]`, invoking
/// `emit(from_left, run_index)` once per output element in order.
///
/// Both sub-ranges must come from a [`merge_path`] partition of the same
/// diagonal pair for the result to be globally stable.
pub(crate) fn merge_ranges<K, C, E>(
    left: &[K],
    right: &[K],
    (a0, a1): (usize, usize),
    (b0, b1): (usize, usize),
    is_less: &C,
    mut emit: E,
) where
    C: Fn(&K, &K) -> bool,
    E: FnMut(bool, usize),
{
    let mut i = a0;
    let mut j = b0;
    while i < a1 && j < b1 {
        // Take from the left run unless the right head is strictly less.
        if is_less(&right[j], &left[i]) {
            emit(false, j);
            j += 1;
        } else {
            emit(true, i);
            i += 1;
        }
    }
    while i < a1 {
        emit(true, i);
        i += 1;
    }
    while j < b1 {
        emit(false, j);
        j += 1;
    }
}
