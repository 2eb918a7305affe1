//! Message-passing substrate for block-distributed algorithms.
//!
//! [`Communicator`] is the contract the distributed algorithms are written
//! against: a fixed group of `size()` ranks that exchange typed messages of
//! plain-old-data elements. Only point-to-point messaging is required; the
//! collectives are provided on top of it and are overridden by backends with
//! native support.
//!
//! [`LocalUniverse`] runs every rank as a thread of the current process. With
//! the `mpi` feature, [`MpiComm`] runs one rank per MPI process.

pub mod distribution;
mod local;
#[cfg(feature = "mpi")]
mod mpi_comm;

pub use distribution::{
    block_distribute, block_local_size, block_offset, block_owner, redistribute,
};
pub use local::{LocalComm, LocalUniverse};
#[cfg(feature = "mpi")]
pub use mpi_comm::MpiComm;

/// Element type of a message. Plain old data, so that any backend can move
/// it between processes as bytes.
pub trait Message: bytemuck::Pod + Send {}

impl<T: bytemuck::Pod + Send> Message for T {}

/// Channel tag. Messages are matched by `(source, tag)` and never overtake
/// each other within one such pair.
///
/// Tags stay below 2^15, the smallest tag bound MPI allows.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Tag(pub u32);

impl Tag {
    /// First tag reserved for the provided collectives.
    pub const RESERVED: u32 = 1 << 14;

    pub const BARRIER: Tag = Tag(Self::RESERVED);
    pub const BROADCAST: Tag = Tag(Self::RESERVED + 1);
    pub const GATHER: Tag = Tag(Self::RESERVED + 2);
    pub const ALL_TO_ALL: Tag = Tag(Self::RESERVED + 3);

    pub const fn new(tag: u32) -> Self {
        assert!(tag < Self::RESERVED, "tag collides with a reserved tag");
        Tag(tag)
    }
}

/// A fixed group of cooperating ranks.
///
/// Every rank must issue the same sequence of collective calls; this is not
/// checked and a mismatch deadlocks or panics. A send may block until the
/// matching receive is posted. Communication failures are fatal:
/// implementations panic rather than return errors.
pub trait Communicator {
    fn rank(&self) -> usize;

    fn size(&self) -> usize;

    /// Sends `data` to `dest`. The message carries its own length.
    fn send<T: Message>(&self, dest: usize, tag: Tag, data: Vec<T>);

    /// Blocks until the next message from `source` on `tag` arrives.
    ///
    /// # Panics
    ///
    /// If the message does not hold elements of type `T`, or if a peer has
    /// failed.
    fn receive<T: Message>(&self, source: usize, tag: Tag) -> Vec<T>;

    fn is_root(&self) -> bool {
        self.rank() == 0
    }

    fn barrier(&self) {
        let size = self.size();
        if size == 1 {
            return;
        }
        if self.is_root() {
            for source in 1..size {
                let _: Vec<u8> = self.receive(source, Tag::BARRIER);
            }
            for dest in 1..size {
                self.send::<u8>(dest, Tag::BARRIER, Vec::new());
            }
        } else {
            self.send::<u8>(0, Tag::BARRIER, Vec::new());
            let _: Vec<u8> = self.receive(0, Tag::BARRIER);
        }
    }

    /// Returns `root`'s `data` on every rank. Non-root input is ignored.
    fn broadcast<T: Message>(&self, root: usize, data: Vec<T>) -> Vec<T> {
        if self.rank() != root {
            return self.receive(root, Tag::BROADCAST);
        }
        for dest in (0..self.size()).filter(|&r| r != root) {
            self.send(dest, Tag::BROADCAST, data.clone());
        }
        data
    }

    /// Concatenates every rank's `data` in rank order on `root`, together
    /// with the per-rank sizes. Other ranks get `None`.
    fn gather<T: Message>(&self, root: usize, data: Vec<T>) -> Option<(Vec<T>, Vec<usize>)> {
        if self.rank() != root {
            self.send(root, Tag::GATHER, data);
            return None;
        }
        let mut data = Some(data);
        let mut all = Vec::new();
        let mut sizes = Vec::with_capacity(self.size());
        for source in 0..self.size() {
            let part = if source == root {
                data.take().unwrap_or_default()
            } else {
                self.receive(source, Tag::GATHER)
            };
            sizes.push(part.len());
            all.extend(part);
        }
        Some((all, sizes))
    }

    /// [`gather`](Communicator::gather) to rank 0 followed by a broadcast.
    fn all_gather<T: Message>(&self, data: Vec<T>) -> (Vec<T>, Vec<usize>) {
        let (all, sizes) = self.gather(0, data).unwrap_or_default();
        let sizes = self.broadcast(0, sizes);
        let all = self.broadcast(0, all);
        (all, sizes)
    }

    /// Sends `buckets[r]` to rank `r` and returns the buckets received,
    /// indexed by source rank. Buckets may be empty.
    fn all_to_all<T: Message>(&self, buckets: Vec<Vec<T>>) -> Vec<Vec<T>> {
        let size = self.size();
        let rank = self.rank();
        assert_eq!(buckets.len(), size, "all_to_all needs one bucket per rank");

        let mut own = Vec::new();
        for (dest, bucket) in buckets.into_iter().enumerate() {
            if dest == rank {
                own = bucket;
            } else {
                self.send(dest, Tag::ALL_TO_ALL, bucket);
            }
        }

        let mut own = Some(own);
        (0..size)
            .map(|source| {
                if source == rank {
                    own.take().unwrap_or_default()
                } else {
                    self.receive(source, Tag::ALL_TO_ALL)
                }
            })
            .collect()
    }

    /// Logical AND of `value` over all ranks.
    fn all_of(&self, value: bool) -> bool {
        let (all, _) = self.all_gather(vec![u8::from(value)]);
        all.into_iter().all(|v| v != 0)
    }

    /// Sum of `value` over all ranks.
    fn all_sum(&self, value: usize) -> usize {
        let (all, _) = self.all_gather(vec![value]);
        all.into_iter().sum()
    }
}
