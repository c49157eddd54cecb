//! Oversized-range splitting for merge-pass launches.
//!
//! Native group indexing inside one launch covers a bounded element range;
//! when a pass needs more groups than one launch may address, the pass is
//! issued as several launches over contiguous group ranges. The cap comes
//! from the selected configuration (`items_per_launch / merge_tile`), so
//! tuning can trade per-launch overhead against addressing headroom.

/// Contiguous group ranges of at most `max_groups` each, covering
/// `0..total_groups` exactly once, in order.
pub(crate) fn launch_chunks(
    total_groups: usize,
    max_groups: usize,
) -> impl Iterator<Item = (usize, usize)> {
    debug_assert!(max_groups > 0);
    (0..total_groups)
        .step_by(max_groups.max(1))
        .map(move |offset| (offset, max_groups.min(total_groups - offset)))
}
