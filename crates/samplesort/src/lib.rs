//! Distributed sample sort.
//!
//! Each rank sorts its slice, contributes regularly spaced samples, and all
//! ranks derive the same `P - 1` splitters from the gathered samples. Every
//! rank then sends the part of its slice between consecutive splitters to
//! the matching rank, merges what it receives, and the merged sequence is
//! moved back so that every rank ends with as many elements as it started.
//!
//! Splitter quality only affects load balance during the exchange, never
//! the result.

mod merge;

use std::cmp::Ordering;
use std::ops::Range;

use comm::{Communicator, Message, redistribute};
use log::debug;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("output is not globally sorted")]
    NotSorted,
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Clone, Copy, Debug)]
pub struct TunedParams {
    /// Samples per rank per splitter.
    pub oversampling: usize,
}

pub const TUNED_PARAMS: TunedParams = TunedParams { oversampling: 2 };

impl Default for TunedParams {
    fn default() -> Self {
        TUNED_PARAMS
    }
}

/// Sorts the distributed sequence formed by every rank's `data` with `T`'s
/// natural order.
pub fn sample_sort<T, C>(data: &mut [T], comm: &C)
where
    T: Ord + Message,
    C: Communicator,
{
    sample_sort_with(data, T::cmp, &TUNED_PARAMS, comm);
}

/// Sorts the distributed sequence formed by every rank's `data` by
/// `compare`, which must be the same total order on every rank.
pub fn sample_sort_by<T, F, C>(data: &mut [T], compare: F, comm: &C)
where
    T: Message,
    F: Fn(&T, &T) -> Ordering,
    C: Communicator,
{
    sample_sort_with(data, compare, &TUNED_PARAMS, comm);
}

/// [`sample_sort_by`] with explicit tuning.
///
/// Collective. Afterwards the rank-ordered concatenation of all slices is
/// sorted and every slice keeps its length.
pub fn sample_sort_with<T, F, C>(data: &mut [T], compare: F, params: &TunedParams, comm: &C)
where
    T: Message,
    F: Fn(&T, &T) -> Ordering,
    C: Communicator,
{
    let p = comm.size();
    data.sort_by(&compare);
    if p == 1 {
        return;
    }

    let wanted = params.oversampling.max(1) * (p - 1);
    let (mut samples, _) = comm.all_gather(regular_samples(data, wanted));
    if samples.is_empty() {
        // no rank holds any element
        return;
    }
    samples.sort_by(&compare);
    let splitters = select_splitters(&samples, p);
    debug!(
        "rank {}: {} splitters from {} samples",
        comm.rank(),
        splitters.len(),
        samples.len()
    );

    let bounds = bucket_bounds(data, &splitters, &compare, comm);
    let buckets: Vec<Vec<T>> = bounds.windows(2).map(|w| data[w[0]..w[1]].to_vec()).collect();
    debug!(
        "rank {}: bucket sizes {:?}",
        comm.rank(),
        buckets.iter().map(Vec::len).collect::<Vec<_>>()
    );

    let received = comm.all_to_all(buckets);
    let merged = merge::merge_runs(received, &compare);
    debug!("rank {}: merged {} elements", comm.rank(), merged.len());

    let merged = redistribute(merged, data.len(), comm);
    for (slot, value) in data.iter_mut().zip(merged) {
        *slot = value;
    }
}

/// Up to `count` evenly spaced elements of the sorted slice `data`.
fn regular_samples<T: Clone>(data: &[T], count: usize) -> Vec<T> {
    let len = data.len();
    let count = count.min(len);
    (1..=count).map(|i| data[i * len / (count + 1)].clone()).collect()
}

/// `p - 1` splitters at evenly spaced ranks of the sorted, non-empty
/// `samples`.
fn select_splitters<T: Clone>(samples: &[T], p: usize) -> Vec<T> {
    debug_assert!(!samples.is_empty());
    let m = samples.len();
    (1..p).map(|k| samples[k * m / p].clone()).collect()
}

/// Bucket `b` of `data` is `bounds[b]..bounds[b + 1]`; it holds the
/// elements greater than splitter `b - 1` and at most splitter `b`.
///
/// A value repeated over several splitters spans several buckets. Its
/// copies are numbered in global order and dealt out to those buckets in
/// contiguous, near-equal chunks, so equal elements keep their order and no
/// single rank receives all of them.
///
/// Collective when `splitters` holds repeats.
fn bucket_bounds<T, F, C>(data: &[T], splitters: &[T], compare: &F, comm: &C) -> Vec<usize>
where
    T: Message,
    F: Fn(&T, &T) -> Ordering,
    C: Communicator,
{
    let mut bounds = Vec::with_capacity(splitters.len() + 2);
    bounds.push(0);
    for s in splitters {
        bounds.push(data.partition_point(|x| compare(x, s) != Ordering::Greater));
    }
    bounds.push(data.len());

    let repeats = repeated_splitters(splitters, compare);
    if repeats.is_empty() {
        return bounds;
    }

    // local copies of each repeated value
    let copies: Vec<Range<usize>> = repeats
        .iter()
        .map(|run| {
            let value = &splitters[run.start];
            let lo = data.partition_point(|x| compare(x, value) == Ordering::Less);
            lo..bounds[run.start + 1]
        })
        .collect();
    let (counts, _) = comm.all_gather(copies.iter().map(Range::len).collect());
    let groups = repeats.len();
    let rank = comm.rank();

    for (g, (run, local)) in repeats.iter().zip(&copies).enumerate() {
        let count_on = |r: usize| counts[r * groups + g];
        let before: usize = (0..rank).map(count_on).sum();
        let total: usize = (0..comm.size()).map(count_on).sum();
        let buckets = run.len() + 1;
        for t in 0..run.len() {
            let cut = (t + 1) * total / buckets;
            bounds[run.start + 1 + t] = local.start + cut.saturating_sub(before).min(local.len());
        }
    }
    bounds
}

/// Maximal runs of two or more equal splitters, as index ranges.
fn repeated_splitters<T, F>(splitters: &[T], compare: &F) -> Vec<Range<usize>>
where
    F: Fn(&T, &T) -> Ordering,
{
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=splitters.len() {
        if i == splitters.len() || compare(&splitters[start], &splitters[i]) != Ordering::Equal {
            if i - start > 1 {
                runs.push(start..i);
            }
            start = i;
        }
    }
    runs
}

/// Whether the rank-ordered concatenation of every rank's `data` is sorted
/// by `compare`. Empty slices are skipped.
///
/// Collective.
pub fn is_sorted_by<T, F, C>(data: &[T], compare: F, comm: &C) -> bool
where
    T: Message,
    F: Fn(&T, &T) -> Ordering,
    C: Communicator,
{
    let in_order = |a: &T, b: &T| compare(a, b) != Ordering::Greater;
    let local = data.windows(2).all(|w| in_order(&w[0], &w[1]));
    let ends = match (data.first(), data.last()) {
        (Some(first), Some(last)) => vec![first.clone(), last.clone()],
        _ => Vec::new(),
    };
    let (ends, _) = comm.all_gather(ends);
    let boundaries = ends.windows(2).all(|w| in_order(&w[0], &w[1]));
    comm.all_of(local) && boundaries
}

pub fn is_sorted<T, C>(data: &[T], comm: &C) -> bool
where
    T: Ord + Message,
    C: Communicator,
{
    is_sorted_by(data, T::cmp, comm)
}

/// [`is_sorted_by`] as a `Result`.
pub fn verify_sorted<T, F, C>(data: &[T], compare: F, comm: &C) -> Result<()>
where
    T: Message,
    F: Fn(&T, &T) -> Ordering,
    C: Communicator,
{
    if is_sorted_by(data, compare, comm) {
        Ok(())
    } else {
        Err(Error::NotSorted)
    }
}
