use std::mem::size_of;

use log::trace;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Rank, SimpleCommunicator};
use mpi::traits::{
    Communicator as MpiCommunicator, CommunicatorCollectives, Destination, Root, Source,
};
use mpi::Count;

use crate::{Communicator, Message, Tag};

/// One rank per MPI process.
///
/// Messages travel as bytes; the collectives map onto the native MPI
/// collectives, with element counts exchanged ahead of variable-size data.
pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    pub fn new(world: SimpleCommunicator) -> Self {
        Self { world }
    }
}

fn to_rank(rank: usize) -> Rank {
    Rank::try_from(rank).unwrap_or_else(|_| panic!("rank {rank} out of range"))
}

fn to_count(len: usize) -> Count {
    Count::try_from(len).unwrap_or_else(|_| panic!("message of {len} elements is too large"))
}

fn byte_counts<T>(lens: &[Count]) -> Vec<Count> {
    lens.iter()
        .map(|&len| to_count(len as usize * size_of::<T>()))
        .collect()
}

fn displacements(counts: &[Count]) -> Vec<Count> {
    counts
        .iter()
        .scan(0, |acc, &count| {
            let displ = *acc;
            *acc += count;
            Some(displ)
        })
        .collect()
}

fn from_bytes<T: Message>(bytes: &[u8]) -> Vec<T> {
    assert!(
        bytes.len() % size_of::<T>() == 0,
        "message of {} bytes does not hold whole elements of {} bytes",
        bytes.len(),
        size_of::<T>()
    );
    bytemuck::pod_collect_to_vec(bytes)
}

impl Communicator for MpiComm {
    fn rank(&self) -> usize {
        self.world.rank() as usize
    }

    fn size(&self) -> usize {
        self.world.size() as usize
    }

    fn send<T: Message>(&self, dest: usize, tag: Tag, data: Vec<T>) {
        trace!(
            "rank {} -> {dest} tag {} ({} elements)",
            self.rank(),
            tag.0,
            data.len()
        );
        let bytes: &[u8] = bytemuck::cast_slice(&data);
        self.world.process_at_rank(to_rank(dest)).send_with_tag(bytes, tag.0 as mpi::Tag);
    }

    fn receive<T: Message>(&self, source: usize, tag: Tag) -> Vec<T> {
        let (bytes, _status) = self
            .world
            .process_at_rank(to_rank(source))
            .receive_vec_with_tag::<u8>(tag.0 as mpi::Tag);
        from_bytes(&bytes)
    }

    fn barrier(&self) {
        self.world.barrier();
    }

    fn broadcast<T: Message>(&self, root: usize, data: Vec<T>) -> Vec<T> {
        let root_process = self.world.process_at_rank(to_rank(root));
        let mut len = to_count(data.len());
        root_process.broadcast_into(&mut len);

        if self.rank() == root {
            let mut bytes = bytemuck::cast_slice::<T, u8>(&data).to_vec();
            root_process.broadcast_into(&mut bytes[..]);
            data
        } else {
            let mut bytes = vec![0_u8; len as usize * size_of::<T>()];
            root_process.broadcast_into(&mut bytes[..]);
            from_bytes(&bytes)
        }
    }

    fn gather<T: Message>(&self, root: usize, data: Vec<T>) -> Option<(Vec<T>, Vec<usize>)> {
        let root_process = self.world.process_at_rank(to_rank(root));
        let len = to_count(data.len());
        let bytes: &[u8] = bytemuck::cast_slice(&data);

        if self.rank() != root {
            root_process.gather_into(&len);
            root_process.gather_varcount_into(bytes);
            return None;
        }

        let mut lens = vec![0 as Count; self.size()];
        root_process.gather_into_root(&len, &mut lens[..]);
        let counts = byte_counts::<T>(&lens);
        let displs = displacements(&counts);
        let total: usize = counts.iter().map(|&c| c as usize).sum();

        let mut all = vec![0_u8; total];
        let mut partition = PartitionMut::new(&mut all[..], &counts[..], &displs[..]);
        root_process.gather_varcount_into_root(bytes, &mut partition);
        drop(partition);

        let sizes = lens.into_iter().map(|len| len as usize).collect();
        Some((from_bytes(&all), sizes))
    }

    fn all_gather<T: Message>(&self, data: Vec<T>) -> (Vec<T>, Vec<usize>) {
        let len = to_count(data.len());
        let mut lens = vec![0 as Count; self.size()];
        self.world.all_gather_into(&len, &mut lens[..]);
        let counts = byte_counts::<T>(&lens);
        let displs = displacements(&counts);
        let total: usize = counts.iter().map(|&c| c as usize).sum();

        let bytes: &[u8] = bytemuck::cast_slice(&data);
        let mut all = vec![0_u8; total];
        let mut partition = PartitionMut::new(&mut all[..], &counts[..], &displs[..]);
        self.world.all_gather_varcount_into(bytes, &mut partition);
        drop(partition);

        let sizes = lens.into_iter().map(|len| len as usize).collect();
        (from_bytes(&all), sizes)
    }

    fn all_to_all<T: Message>(&self, buckets: Vec<Vec<T>>) -> Vec<Vec<T>> {
        assert_eq!(
            buckets.len(),
            self.size(),
            "all_to_all needs one bucket per rank"
        );
        let send_lens: Vec<Count> = buckets.iter().map(|b| to_count(b.len())).collect();
        let mut recv_lens = vec![0 as Count; self.size()];
        self.world.all_to_all_into(&send_lens[..], &mut recv_lens[..]);

        let send_counts = byte_counts::<T>(&send_lens);
        let send_displs = displacements(&send_counts);
        let recv_counts = byte_counts::<T>(&recv_lens);
        let recv_displs = displacements(&recv_counts);
        let total: usize = recv_counts.iter().map(|&c| c as usize).sum();

        let send: Vec<u8> = buckets
            .iter()
            .flat_map(|b| bytemuck::cast_slice::<T, u8>(b).iter().copied())
            .collect();
        let mut recv = vec![0_u8; total];
        let partition_snd = Partition::new(&send[..], &send_counts[..], &send_displs[..]);
        let mut partition_recv = PartitionMut::new(&mut recv[..], &recv_counts[..], &recv_displs[..]);
        self.world
            .all_to_all_varcount_into(&partition_snd, &mut partition_recv);
        drop(partition_recv);

        recv_displs
            .iter()
            .zip(&recv_counts)
            .map(|(&displ, &count)| {
                let start = displ as usize;
                from_bytes(&recv[start..start + count as usize])
            })
            .collect()
    }
}
