//! The bulk-synchronous exchange seam used by the distributed permutation.
//!
//! Cluster transports (MPI and friends) live outside this crate; the
//! generator only needs one all-to-all collective, expressed as a trait. The
//! in-process [`ChannelMesh`] implementation backs tests and the CLI's
//! multi-worker mode.

use std::sync::mpsc::{channel, Receiver, Sender};

use crate::permute::Slot;

/// One all-to-all personalized exchange among `size` workers.
pub trait AllToAll {
    fn rank(&self) -> u32;
    fn size(&self) -> u32;

    /// Deliver `outbound[d]` to rank `d` (one bucket per rank, empty buckets
    /// included). Returns every pair addressed to this rank, concatenated in
    /// sender-rank order with each sender's order preserved, the same
    /// guarantee an `Alltoallv` over rank-sorted send buffers provides.
    fn exchange(&mut self, outbound: Vec<Vec<Slot>>) -> Vec<Slot>;
}

/// In-process mesh of mpsc channels, one worker per thread. Supports the one
/// collective the permutation performs; concurrent collectives would need
/// round tags.
pub struct ChannelMesh {
    rank: u32,
    size: u32,
    peers: Vec<Sender<(u32, Vec<Slot>)>>,
    inbox: Receiver<(u32, Vec<Slot>)>,
}

impl AllToAll for ChannelMesh {
    fn rank(&self) -> u32 {
        self.rank
    }

    fn size(&self) -> u32 {
        self.size
    }

    fn exchange(&mut self, outbound: Vec<Vec<Slot>>) -> Vec<Slot> {
        assert_eq!(outbound.len(), self.size as usize);
        for (dest, pairs) in outbound.into_iter().enumerate() {
            self.peers[dest]
                .send((self.rank, pairs))
                .expect("peer disappeared mid-exchange");
        }
        let mut received: Vec<(u32, Vec<Slot>)> = (0..self.size)
            .map(|_| self.inbox.recv().expect("peer disappeared mid-exchange"))
            .collect();
        received.sort_by_key(|&(src, _)| src);
        received.into_iter().flat_map(|(_, pairs)| pairs).collect()
    }
}

/// Run `size` workers on scoped threads, each holding one endpoint of a full
/// mesh, and collect their results in rank order.
pub fn with_mesh<T, F>(size: u32, run: F) -> Vec<T>
where
    F: Fn(ChannelMesh) -> T + Sync,
    T: Send,
{
    assert!(size >= 1, "mesh needs at least one worker");
    let mut senders = Vec::with_capacity(size as usize);
    let mut receivers = Vec::with_capacity(size as usize);
    for _ in 0..size {
        let (tx, rx) = channel();
        senders.push(tx);
        receivers.push(rx);
    }
    let endpoints: Vec<ChannelMesh> = receivers
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| ChannelMesh {
            rank: rank as u32,
            size,
            peers: senders.clone(),
            inbox,
        })
        .collect();
    drop(senders);

    std::thread::scope(|scope| {
        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|mesh| {
                let run = &run;
                scope.spawn(move || run(mesh))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker thread panicked"))
            .collect()
    })
}
