//! Production communicator backed by `rsmpi`. Thin wrapper: all it does is
//! translate between this crate's narrow [`Comm`] trait and the calls
//! `mpi::topology::SimpleCommunicator` actually exposes.

use mpi::collective::SystemOperation;
use mpi::datatype::{Partition, PartitionMut};
use mpi::topology::{Communicator as _, SimpleCommunicator};
use mpi::traits::*;

use super::{Comm, Rank};

pub struct MpiComm {
    world: SimpleCommunicator,
}

impl MpiComm {
    /// Initializes MPI (if not already) and wraps `COMM_WORLD`.
    pub fn world() -> Self {
        let universe = mpi::initialize().expect("MPI_Init failed");
        // Leak the universe: MPI_Finalize runs at process exit via rsmpi's
        // drop glue, and the rendezvous facade only ever needs COMM_WORLD's
        // lifetime, which is the whole program's.
        std::mem::forget(universe);
        MpiComm {
            world: mpi::topology::SimpleCommunicator::world(),
        }
    }
}

impl Comm for MpiComm {
    fn rank(&self) -> Rank {
        self.world.rank()
    }

    fn size(&self) -> Rank {
        self.world.size()
    }

    fn all_gather_f64(&self, value: f64) -> Vec<f64> {
        let mut buf = vec![0.0f64; self.size() as usize];
        self.world.all_gather_into(&value, &mut buf[..]);
        buf
    }

    fn all_reduce_sum_f64(&self, value: f64) -> f64 {
        let mut result = 0.0f64;
        self.world
            .all_reduce_into(&value, &mut result, SystemOperation::sum());
        result
    }

    fn all_reduce_min_f64(&self, value: f64) -> f64 {
        let mut result = 0.0f64;
        self.world
            .all_reduce_into(&value, &mut result, SystemOperation::min());
        result
    }

    fn all_reduce_max_f64(&self, value: f64) -> f64 {
        let mut result = 0.0f64;
        self.world
            .all_reduce_into(&value, &mut result, SystemOperation::max());
        result
    }

    fn all_reduce_any(&self, flag: bool) -> bool {
        let local = if flag { 1i32 } else { 0i32 };
        let mut result = 0i32;
        self.world
            .all_reduce_into(&local, &mut result, SystemOperation::max());
        result != 0
    }

    fn all_to_all_varying(&self, send_by_rank: &[Vec<u8>]) -> Vec<Vec<u8>> {
        let size = self.size() as usize;
        assert_eq!(send_by_rank.len(), size);

        // Phase 1: exchange how many bytes each rank will send each other
        // rank, so the variable-size all-to-all can be sized up front.
        let send_counts: Vec<i32> = send_by_rank.iter().map(|b| b.len() as i32).collect();
        let mut recv_counts = vec![0i32; size];
        self.world.all_to_all_into(&send_counts, &mut recv_counts);

        let send_displs = displacements(&send_counts);
        let recv_displs = displacements(&recv_counts);

        let send_buf: Vec<u8> = send_by_rank.iter().flatten().copied().collect();
        let mut recv_buf = vec![0u8; recv_counts.iter().sum::<i32>() as usize];

        let send_partition = Partition::new(&send_buf, send_counts, send_displs);
        let mut recv_partition = PartitionMut::new(&mut recv_buf, recv_counts.clone(), recv_displs.clone());
        self.world
            .all_to_all_varying_into(&send_partition, &mut recv_partition);

        (0..size)
            .map(|src| {
                let start = recv_displs[src] as usize;
                let len = recv_counts[src] as usize;
                recv_buf[start..start + len].to_vec()
            })
            .collect()
    }

    fn barrier(&self) {
        self.world.barrier();
    }
}

fn displacements(counts: &[i32]) -> Vec<i32> {
    let mut displs = Vec::with_capacity(counts.len());
    let mut running = 0i32;
    for count in counts {
        displs.push(running);
        running += count;
    }
    displs
}
