use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::panic;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use log::{debug, trace};

use crate::{Communicator, Message, Tag};

// How often a blocked receive checks whether a peer has failed.
const FAILURE_POLL: Duration = Duration::from_millis(50);

struct Envelope {
    source: usize,
    tag: Tag,
    payload: Box<dyn Any + Send>,
}

/// A group of `size` ranks run as scoped threads of this process.
#[derive(Clone, Copy, Debug)]
pub struct LocalUniverse {
    size: usize,
}

impl LocalUniverse {
    /// # Panics
    ///
    /// If `size` is zero.
    pub fn new(size: usize) -> Self {
        assert!(size > 0, "a communicator needs at least one rank");
        Self { size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Runs `f` once per rank, each on its own thread, and returns the
    /// results in rank order.
    ///
    /// If any rank panics, the ranks blocked on it panic as well and the
    /// first panic is resumed on the caller.
    pub fn run<R, F>(&self, f: F) -> Vec<R>
    where
        F: Fn(&LocalComm) -> R + Sync,
        R: Send,
    {
        let failed = Arc::new(AtomicBool::new(false));
        let (senders, receivers): (Vec<_>, Vec<_>) =
            (0..self.size).map(|_| mpsc::channel::<Envelope>()).unzip();

        debug!("starting local universe with {} ranks", self.size);
        let f = &f;
        let outcomes: Vec<thread::Result<R>> = thread::scope(|scope| {
            let handles: Vec<_> = receivers
                .into_iter()
                .enumerate()
                .map(|(rank, receiver)| {
                    let comm = LocalComm {
                        rank,
                        peers: senders.clone(),
                        inbox: receiver,
                        pending: RefCell::new(VecDeque::new()),
                        failed: Arc::clone(&failed),
                    };
                    thread::Builder::new()
                        .name(format!("rank-{rank}"))
                        .spawn_scoped(scope, move || f(&comm))
                        .unwrap_or_else(|e| panic!("cannot spawn rank {rank}: {e}"))
                })
                .collect();
            handles.into_iter().map(|h| h.join()).collect()
        });

        let mut results = Vec::with_capacity(self.size);
        for outcome in outcomes {
            match outcome {
                Ok(r) => results.push(r),
                Err(payload) => panic::resume_unwind(payload),
            }
        }
        results
    }
}

/// One rank of a [`LocalUniverse`].
pub struct LocalComm {
    rank: usize,
    peers: Vec<Sender<Envelope>>,
    inbox: Receiver<Envelope>,
    // arrived but not yet matched, in arrival order
    pending: RefCell<VecDeque<Envelope>>,
    failed: Arc<AtomicBool>,
}

impl LocalComm {
    fn take_pending(&self, source: usize, tag: Tag) -> Option<Envelope> {
        let mut pending = self.pending.borrow_mut();
        let pos = pending
            .iter()
            .position(|e| e.source == source && e.tag == tag)?;
        pending.remove(pos)
    }

    fn abort_if_failed(&self) {
        if self.failed.load(Ordering::Acquire) {
            panic!("rank {} aborting: a peer rank failed", self.rank);
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.peers.len()
    }

    fn send<T: Message>(&self, dest: usize, tag: Tag, data: Vec<T>) {
        trace!(
            "rank {} -> {dest} tag {} ({} elements)",
            self.rank,
            tag.0,
            data.len()
        );
        let envelope = Envelope {
            source: self.rank,
            tag,
            payload: Box::new(data),
        };
        if self.peers[dest].send(envelope).is_err() {
            self.failed.store(true, Ordering::Release);
            panic!("rank {} cannot reach rank {dest}", self.rank);
        }
    }

    fn receive<T: Message>(&self, source: usize, tag: Tag) -> Vec<T> {
        assert!(source < self.size(), "no rank {source} in this communicator");
        let envelope = match self.take_pending(source, tag) {
            Some(envelope) => envelope,
            None => loop {
                match self.inbox.recv_timeout(FAILURE_POLL) {
                    Ok(e) if e.source == source && e.tag == tag => break e,
                    Ok(e) => self.pending.borrow_mut().push_back(e),
                    Err(RecvTimeoutError::Timeout) => self.abort_if_failed(),
                    Err(RecvTimeoutError::Disconnected) => {
                        panic!("rank {} lost its inbox", self.rank)
                    }
                }
            },
        };
        match envelope.payload.downcast::<Vec<T>>() {
            Ok(data) => *data,
            Err(_) => panic!(
                "rank {} received a message of unexpected type from rank {source} on tag {}",
                self.rank, tag.0
            ),
        }
    }
}

impl Drop for LocalComm {
    fn drop(&mut self) {
        if thread::panicking() {
            self.failed.store(true, Ordering::Release);
        }
    }
}
