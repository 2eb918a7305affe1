mod sparse_table;
mod util;

use std::ops::Range;

pub use sparse_table::SparseTableRmq;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("invalid query range {start}..{end} over {len} elements")]
    InvalidRange { start: usize, end: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Error>;

/// Which position to report when a range holds several minima.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Tie {
    #[default]
    Leftmost,
    Rightmost,
}

/// Static RMQ (Range Minimum Query) interface.
///
/// - Query ranges are half-open: `[l, r)`.
/// - The answer is `Some(argmin_index)` when the range is valid and non-empty.
/// - Ties are broken by the smallest index unless the structure was built
///   with [`Tie::Rightmost`].
pub trait StaticRmq<T: Ord>: Sized {
    fn new(values: &[T]) -> Self;

    fn argmin(&self, range: Range<usize>) -> Option<usize>;

    /// Value at `index` of the indexed array.
    fn value(&self, index: usize) -> &T;

    /// Like [`argmin`](StaticRmq::argmin), but reports an empty or
    /// out-of-bounds range as [`Error::InvalidRange`].
    fn query(&self, range: Range<usize>) -> Result<usize> {
        let Range { start, end } = range;
        self.argmin(range).ok_or(Error::InvalidRange {
            start,
            end,
            len: self.len(),
        })
    }

    /// Minimum value over `range`.
    fn min(&self, range: Range<usize>) -> Option<&T> {
        self.argmin(range).map(|i| self.value(i))
    }

    fn len(&self) -> usize;
}
