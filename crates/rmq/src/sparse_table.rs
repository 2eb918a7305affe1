use std::ops::Range;

use crate::util::{better_index, floor_log2_nonzero};
use crate::{StaticRmq, Tie};

#[derive(Clone, Debug)]
enum SparseTable {
    U32(Vec<u32>),
    Usize(Vec<usize>),
}

impl SparseTable {
    #[inline(always)]
    fn get(&self, i: usize) -> usize {
        match self {
            Self::U32(table) => table[i] as usize,
            Self::Usize(table) => table[i],
        }
    }
}

/// Sparse table over a fixed array: O(n log n) build, O(1) query.
#[derive(Clone, Debug)]
pub struct SparseTableRmq<T> {
    values: Vec<T>,
    tie: Tie,
    row_offsets: Vec<usize>,
    table: SparseTable,
}

impl<T: Ord + Clone> SparseTableRmq<T> {
    /// Builds a table that resolves ties among equal minima by `tie`.
    pub fn with_tie(values: &[T], tie: Tie) -> Self {
        let n = values.len();
        let values = values.to_vec();

        if n == 0 {
            return Self {
                values,
                tie,
                row_offsets: Vec::new(),
                table: SparseTable::U32(Vec::new()),
            };
        }

        // row k holds the answer for every window of length 2^k
        let levels = (floor_log2_nonzero(n) as usize) + 1;
        let mut row_offsets = Vec::with_capacity(levels);
        let mut total_len = 0_usize;
        for k in 0..levels {
            row_offsets.push(total_len);
            total_len += n + 1 - (1_usize << k);
        }

        let mut table = Vec::with_capacity(total_len);
        table.extend(0..n);
        for k in 1..levels {
            let half = 1_usize << (k - 1);
            let len = n + 1 - (1_usize << k);
            let prev_base = row_offsets[k - 1];
            for i in 0..len {
                let a = table[prev_base + i];
                let b = table[prev_base + i + half];
                table.push(better_index(&values, tie, a, b));
            }
        }
        debug_assert_eq!(table.len(), total_len);

        let table = if n <= (u32::MAX as usize) {
            SparseTable::U32(table.into_iter().map(|i| i as u32).collect())
        } else {
            SparseTable::Usize(table)
        };

        Self {
            values,
            tie,
            row_offsets,
            table,
        }
    }

    pub fn tie(&self) -> Tie {
        self.tie
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<T: Ord + Clone> StaticRmq<T> for SparseTableRmq<T> {
    fn new(values: &[T]) -> Self {
        Self::with_tie(values, Tie::Leftmost)
    }

    fn argmin(&self, range: Range<usize>) -> Option<usize> {
        let n = self.values.len();
        if range.start >= range.end || range.end > n {
            return None;
        }
        let len = range.end - range.start;
        if len == 1 {
            return Some(range.start);
        }

        let k = floor_log2_nonzero(len) as usize;
        let span = 1_usize << k;
        let base = self.row_offsets[k];
        let a = self.table.get(base + range.start);
        let b = self.table.get(base + range.end - span);
        Some(better_index(&self.values, self.tie, a, b))
    }

    fn value(&self, index: usize) -> &T {
        &self.values[index]
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}
