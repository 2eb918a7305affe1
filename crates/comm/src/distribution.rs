//! Block distribution of a global sequence over the ranks of a communicator.
//!
//! In the canonical block partition of `n` elements over `p` ranks every
//! rank holds `n / p` elements and the first `n % p` ranks hold one more.

use std::ops::Range;

use log::debug;

use crate::{Communicator, Message};

/// Number of elements rank `rank` holds in the block partition of `n`
/// elements over `p` ranks.
#[inline]
pub fn block_local_size(n: usize, p: usize, rank: usize) -> usize {
    debug_assert!(p > 0 && rank < p);
    n / p + usize::from(rank < n % p)
}

/// Global index of the first element held by `rank`.
#[inline]
pub fn block_offset(n: usize, p: usize, rank: usize) -> usize {
    debug_assert!(p > 0 && rank <= p);
    rank * (n / p) + rank.min(n % p)
}

/// Rank holding global index `i`.
#[inline]
pub fn block_owner(n: usize, p: usize, i: usize) -> usize {
    debug_assert!(i < n);
    let small = n / p;
    let rem = n % p;
    let boundary = rem * (small + 1);
    if i < boundary {
        i / (small + 1)
    } else {
        rem + (i - boundary) / small
    }
}

fn ranges_from_sizes(sizes: &[usize]) -> Vec<Range<usize>> {
    let mut start = 0;
    sizes
        .iter()
        .map(|&len| {
            let range = start..start + len;
            start += len;
            range
        })
        .collect()
}

fn overlap(a: &Range<usize>, b: &Range<usize>) -> Range<usize> {
    a.start.max(b.start)..a.end.min(b.end)
}

/// Moves elements between ranks so that this rank ends up with exactly
/// `target_len` elements, keeping the global order.
///
/// # Panics
///
/// If the target lengths of all ranks do not sum to the global length.
pub fn redistribute<T, C>(data: Vec<T>, target_len: usize, comm: &C) -> Vec<T>
where
    T: Message,
    C: Communicator,
{
    let rank = comm.rank();
    let (sizes, _) = comm.all_gather(vec![data.len(), target_len]);
    let current: Vec<usize> = sizes.iter().step_by(2).copied().collect();
    let target: Vec<usize> = sizes.iter().skip(1).step_by(2).copied().collect();

    let total: usize = current.iter().sum();
    assert_eq!(
        total,
        target.iter().sum::<usize>(),
        "target sizes do not cover the global sequence"
    );
    if current == target {
        return data;
    }

    let current = ranges_from_sizes(&current);
    let target = ranges_from_sizes(&target);
    let mine = &current[rank];
    debug!(
        "rank {rank}: redistributing {:?} -> {:?} of {total}",
        mine, target[rank]
    );

    let pieces = target
        .iter()
        .map(|wanted| {
            let piece = overlap(mine, wanted);
            if piece.is_empty() {
                Vec::new()
            } else {
                data[piece.start - mine.start..piece.end - mine.start].to_vec()
            }
        })
        .collect();
    let result: Vec<T> = comm.all_to_all(pieces).into_iter().flatten().collect();
    debug_assert_eq!(result.len(), target_len);
    result
}

/// Redistributes `data` to the canonical block partition.
pub fn block_distribute<T, C>(data: Vec<T>, comm: &C) -> Vec<T>
where
    T: Message,
    C: Communicator,
{
    let n = comm.all_sum(data.len());
    redistribute(data, block_local_size(n, comm.size(), comm.rank()), comm)
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;
    use crate::LocalUniverse;

    #[test]
    fn block_sizes_cover_and_balance() {
        for n in [0_usize, 1, 2, 7, 13, 64, 1000, 1001] {
            for p in 1..=9 {
                let sizes: Vec<usize> = (0..p).map(|r| block_local_size(n, p, r)).collect();
                assert_eq!(sizes.iter().sum::<usize>(), n, "n={n} p={p}");
                let max = *sizes.iter().max().unwrap();
                let min = *sizes.iter().min().unwrap();
                assert!(max - min <= 1, "n={n} p={p}");
                // larger shares go to the lowest ranks
                assert!(sizes.windows(2).all(|w| w[0] >= w[1]), "n={n} p={p}");

                for r in 0..p {
                    let off = block_offset(n, p, r);
                    assert_eq!(off, sizes[..r].iter().sum::<usize>());
                    for i in off..off + sizes[r] {
                        assert_eq!(block_owner(n, p, i), r, "n={n} p={p} i={i}");
                    }
                }
                assert_eq!(block_offset(n, p, p), n);
            }
        }
    }

    #[test]
    fn redistribute_preserves_order() {
        let mut rng = StdRng::seed_from_u64(0x5EED_2026);
        for p in [1_usize, 2, 3, 5, 8] {
            for _ in 0..8 {
                let current: Vec<usize> = (0..p).map(|_| rng.random_range(0..20)).collect();
                let n: usize = current.iter().sum();
                let mut target = vec![0; p];
                for _ in 0..n {
                    target[rng.random_range(0..p)] += 1;
                }
                let starts: Vec<usize> = ranges_from_sizes(&current)
                    .into_iter()
                    .map(|r| r.start)
                    .collect();

                let results = LocalUniverse::new(p).run(|comm| {
                    let r = comm.rank();
                    let local: Vec<usize> = (starts[r]..starts[r] + current[r]).collect();
                    redistribute(local, target[r], comm)
                });

                for (r, local) in results.iter().enumerate() {
                    assert_eq!(local.len(), target[r]);
                }
                let gathered: Vec<usize> = results.into_iter().flatten().collect();
                assert_eq!(gathered, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn block_distribute_from_root() {
        let n = 23;
        let p = 4;
        let results = LocalUniverse::new(p).run(|comm| {
            let local = if comm.is_root() {
                (0..n).collect()
            } else {
                Vec::new()
            };
            block_distribute(local, comm)
        });
        for (r, local) in results.iter().enumerate() {
            let off = block_offset(n, p, r);
            assert_eq!(local, &(off..off + block_local_size(n, p, r)).collect::<Vec<_>>());
        }
    }

    #[test]
    #[should_panic]
    fn redistribute_rejects_bad_targets() {
        LocalUniverse::new(2).run(|comm| redistribute(vec![1, 2, 3], 1, comm));
    }
}
