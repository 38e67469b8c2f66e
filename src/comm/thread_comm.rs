//! An in-process communicator that simulates `size` MPI ranks as `size`
//! threads, rendezvousing on shared exchange slots guarded by a barrier.
//! Every collective call follows the same two-barrier shape: ranks publish
//! into their own slot, wait for everyone to publish, read what they need,
//! then wait again so the next collective doesn't race the reads of this
//! one.
//!
//! This exists so the crate's own tests can exercise `comm_size > 1`
//! behavior (the seed scenarios in the spec's testable-properties section)
//! without requiring `mpirun`; it is not meant as a production transport.

use std::sync::{Arc, Barrier, Mutex};

use super::{Comm, Rank};

struct Shared {
    barrier: Barrier,
    f64_slots: Vec<Mutex<Option<f64>>>,
    byte_matrix: Vec<Vec<Mutex<Option<Vec<u8>>>>>,
}

impl Shared {
    fn new(size: usize) -> Self {
        Shared {
            barrier: Barrier::new(size),
            f64_slots: (0..size).map(|_| Mutex::new(None)).collect(),
            byte_matrix: (0..size)
                .map(|_| (0..size).map(|_| Mutex::new(None)).collect())
                .collect(),
        }
    }
}

/// A single rank's handle onto a [`Shared`] rendezvous. Clone it (cheap,
/// just bumps the `Arc`) to hand one to each simulated-rank thread.
#[derive(Clone)]
pub struct ThreadComm {
    shared: Arc<Shared>,
    rank: Rank,
    size: Rank,
}

impl ThreadComm {
    /// Builds `size` linked communicator handles, one per simulated rank.
    /// Typical use: spawn one thread per handle with `std::thread::scope`.
    pub fn world(size: usize) -> Vec<ThreadComm> {
        assert!(size > 0, "a communicator needs at least one rank");
        let shared = Arc::new(Shared::new(size));
        (0..size)
            .map(|rank| ThreadComm {
                shared: Arc::clone(&shared),
                rank: rank as Rank,
                size: size as Rank,
            })
            .collect()
    }
}

impl Comm for ThreadComm {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> Rank {
        self.size
    }

    fn all_gather_f64(&self, value: f64) -> Vec<f64> {
        *self.shared.f64_slots[self.rank as usize].lock().unwrap() = Some(value);
        self.shared.barrier.wait();
        let gathered = self
            .shared
            .f64_slots
            .iter()
            .map(|slot| slot.lock().unwrap().expect("all ranks must publish before gather completes"))
            .collect();
        self.shared.barrier.wait();
        gathered
    }

    fn all_to_all_varying(&self, send_by_rank: &[Vec<u8>]) -> Vec<Vec<u8>> {
        assert_eq!(send_by_rank.len(), self.size as usize);
        for (dest, payload) in send_by_rank.iter().enumerate() {
            *self.shared.byte_matrix[self.rank as usize][dest].lock().unwrap() = Some(payload.clone());
        }
        self.shared.barrier.wait();
        let received = (0..self.size as usize)
            .map(|src| {
                self.shared.byte_matrix[src][self.rank as usize]
                    .lock()
                    .unwrap()
                    .take()
                    .expect("all ranks must publish before all-to-all completes")
            })
            .collect();
        self.shared.barrier.wait();
        received
    }

    fn barrier(&self) {
        self.shared.barrier.wait();
    }
}
