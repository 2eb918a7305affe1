use comm::{Communicator, Message, Tag};
use log::debug;

use crate::sequential::{Scan, scan};
use crate::{Direction, Nsv, Policy};

const LEFT_PASS: Tag = Tag::new(1);
const RIGHT_PASS: Tag = Tag::new(2);

/// Nearest smaller values of the sequence formed by concatenating every
/// rank's `local` slice in rank order.
///
/// Returns the answers for this rank's elements as global indices. The
/// result is the same as [`ansv_sequential`](crate::ansv_sequential) on the
/// concatenated sequence, for every policy pair. Slices may have any length,
/// including zero.
///
/// The left pass runs up from rank 0 and the right pass down from the last
/// rank at the same time; the two meet at the middle rank, which takes both
/// stacks in before it forwards either.
///
/// Collective: every rank of `comm` must call this with the same policies.
pub fn ansv<T, C>(local: &[T], left: Policy, right: Policy, comm: &C) -> Nsv
where
    T: Ord + Message,
    C: Communicator,
{
    let (sizes, _) = comm.all_gather(vec![local.len()]);
    let rank = comm.rank();
    let offset = sizes[..rank].iter().sum();

    let mut left_pass = Pass::new(local, offset, Direction::Left, left, comm);
    let mut right_pass = Pass::new(local, offset, Direction::Right, right, comm);
    let middle = comm.size() / 2;
    let (left, right) = if rank < middle {
        left_pass.take_over(comm);
        let left = left_pass.forward(comm);
        right_pass.take_over(comm);
        (left, right_pass.forward(comm))
    } else if rank == middle {
        right_pass.take_over(comm);
        left_pass.take_over(comm);
        let right = right_pass.forward(comm);
        (left_pass.forward(comm), right)
    } else {
        right_pass.take_over(comm);
        let right = right_pass.forward(comm);
        left_pass.take_over(comm);
        (left_pass.forward(comm), right)
    };
    Nsv { left, right }
}

/// One direction of the scan over the global sequence on one rank.
///
/// The scan stack travels between ranks as two messages on the pass tag:
/// `[index, run_start]` pairs, then the values, bottom first.
struct Pass<'a, T> {
    local: &'a [T],
    offset: usize,
    policy: Policy,
    direction: Direction,
    upstream: Option<usize>,
    downstream: Option<usize>,
    tag: Tag,
    scan: Scan,
    nsv: Vec<Option<usize>>,
    outgoing: (Vec<[usize; 2]>, Vec<T>),
}

impl<'a, T: Ord + Message> Pass<'a, T> {
    fn new<C: Communicator>(
        local: &'a [T],
        offset: usize,
        direction: Direction,
        policy: Policy,
        comm: &C,
    ) -> Self {
        let rank = comm.rank();
        let after = (rank + 1 < comm.size()).then_some(rank + 1);
        let before = rank.checked_sub(1);
        let (upstream, downstream, tag) = match direction {
            Direction::Left => (before, after, LEFT_PASS),
            Direction::Right => (after, before, RIGHT_PASS),
        };
        let scan = scan(local, direction, policy);
        let nsv = scan.answers.iter().map(|a| a.map(|p| offset + p)).collect();
        Self {
            local,
            offset,
            policy,
            direction,
            upstream,
            downstream,
            tag,
            scan,
            nsv,
            outgoing: (Vec::new(), Vec::new()),
        }
    }

    /// Receives the stack of the ranks before this one in scan order and
    /// finishes the scan over them.
    fn take_over<C: Communicator>(&mut self, comm: &C) {
        let (mut entries, mut values): (Vec<[usize; 2]>, Vec<T>) = match self.upstream {
            Some(source) => (comm.receive(source, self.tag), comm.receive(source, self.tag)),
            None => (Vec::new(), Vec::new()),
        };
        assert_eq!(entries.len(), values.len(), "malformed scan stack");
        let incoming = entries.len();
        let policy = self.policy;
        let local = self.local;
        let scan = &self.scan;

        // Unresolved elements pop the incoming stack exactly as they would in
        // one scan over the whole sequence; resolved ones never reach it.
        // `remote_start[u]` is set when u's run of equal values continues
        // upstream.
        let mut remote_start: Vec<Option<usize>> = vec![None; local.len()];
        for &u in &scan.unresolved {
            let value = &local[u];
            while values.last().is_some_and(|top| policy.beaten(top, value)) {
                values.pop();
                entries.pop();
            }
            let (Some(&[index, run_start]), Some(top)) = (entries.last(), values.last()) else {
                continue;
            };
            if *top == *value {
                remote_start[u] = Some(run_start);
            }
            self.nsv[u] = Some(match remote_start[u] {
                Some(start) if policy == Policy::FurthestEqual => start,
                _ => index,
            });
        }

        if policy == Policy::FurthestEqual {
            for (p, answer) in self.nsv.iter_mut().enumerate() {
                let start = scan.run_start[p];
                if start != p {
                    if let Some(remote) = remote_start[start] {
                        *answer = Some(remote);
                    }
                }
            }
        }

        let resolved = scan
            .unresolved
            .iter()
            .filter(|&&u| self.nsv[u].is_some())
            .count();
        let kept = entries.len();
        for &p in &scan.stack {
            let start = scan.run_start[p];
            entries.push([self.offset + p, remote_start[start].unwrap_or(self.offset + start)]);
            values.push(local[p]);
        }
        debug!(
            "rank {} {:?} pass: received {incoming} entries, resolved {resolved} of {} boundary elements, forwarding {} ({kept} upstream)",
            comm.rank(),
            self.direction,
            scan.unresolved.len(),
            entries.len(),
        );
        self.outgoing = (entries, values);
    }

    /// Sends the stack on to the next rank and returns the answers.
    fn forward<C: Communicator>(self, comm: &C) -> Vec<Option<usize>> {
        if let Some(dest) = self.downstream {
            let (entries, values) = self.outgoing;
            comm.send(dest, self.tag, entries);
            comm.send(dest, self.tag, values);
        }
        self.nsv
    }
}
