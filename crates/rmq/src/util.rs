use std::cmp::Ordering;

use crate::Tie;

/// Picks the better of two positions holding a minimum, breaking ties by `tie`.
#[inline(always)]
pub(crate) fn better_index<T: Ord>(values: &[T], tie: Tie, a: usize, b: usize) -> usize {
    match values[a].cmp(&values[b]) {
        Ordering::Less => a,
        Ordering::Greater => b,
        Ordering::Equal => match tie {
            Tie::Leftmost => a.min(b),
            Tie::Rightmost => a.max(b),
        },
    }
}

#[inline(always)]
pub(crate) fn floor_log2_nonzero(x: usize) -> u32 {
    debug_assert!(x > 0);
    usize::BITS - 1 - x.leading_zeros()
}
