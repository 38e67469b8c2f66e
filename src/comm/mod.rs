//! The communicator abstraction every collective operation in this crate
//! goes through. `Comm` is deliberately narrow: it exposes only the handful
//! of collectives the RCB partitioner and import planner actually need
//! (point counts, weighted sums, a bounding-box reduction and a variable-size
//! all-to-all), so swapping the transport never touches algorithmic code.
//!
//! Two implementations are provided:
//! - [`mpi_comm::MpiComm`] (behind the `mpi` feature), a thin wrapper over
//!   `rsmpi`'s [`mpi::topology::SimpleCommunicator`] for production use.
//! - [`thread_comm::ThreadComm`], an in-process simulation of `N` ranks as
//!   `N` threads rendezvousing on shared exchange slots, used by this crate's
//!   own tests to exercise multi-rank behavior without `mpirun`.

#[cfg(feature = "mpi")]
pub mod mpi_comm;
pub mod thread_comm;

use crate::geometry::BoundingBox;

pub type Rank = i32;

/// A collective-operations handle. Every method here must be called by every
/// rank of the communicator, in the same order, or the program deadlocks --
/// exactly as with real MPI.
pub trait Comm: Send + Sync {
    fn rank(&self) -> Rank;
    fn size(&self) -> Rank;

    fn all_gather_f64(&self, value: f64) -> Vec<f64>;

    fn all_reduce_sum_f64(&self, value: f64) -> f64 {
        self.all_gather_f64(value).into_iter().sum()
    }

    fn all_reduce_min_f64(&self, value: f64) -> f64 {
        self.all_gather_f64(value)
            .into_iter()
            .fold(f64::INFINITY, f64::min)
    }

    fn all_reduce_max_f64(&self, value: f64) -> f64 {
        self.all_gather_f64(value)
            .into_iter()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    fn all_reduce_sum_u64(&self, value: u64) -> u64 {
        self.all_gather_f64(value as f64).into_iter().sum::<f64>() as u64
    }

    /// `true` iff any rank passed `true`. Used to detect a locally-failed
    /// phase collectively, per the spec's error propagation rule.
    fn all_reduce_any(&self, flag: bool) -> bool {
        self.all_gather_f64(if flag { 1.0 } else { 0.0 })
            .into_iter()
            .any(|v| v != 0.0)
    }

    /// Merges every rank's local bounding box into the global one.
    fn all_reduce_bbox(&self, local: BoundingBox) -> BoundingBox {
        let mins = [
            self.all_reduce_min_f64(local.min.x),
            self.all_reduce_min_f64(local.min.y),
            self.all_reduce_min_f64(local.min.z),
        ];
        let maxs = [
            self.all_reduce_max_f64(local.max.x),
            self.all_reduce_max_f64(local.max.y),
            self.all_reduce_max_f64(local.max.z),
        ];
        BoundingBox::new(mins[0], mins[1], mins[2], maxs[0], maxs[1], maxs[2])
    }

    /// One round of a variable-size all-to-all: `send_by_rank[r]` are the
    /// raw bytes destined for rank `r` (including `r == self.rank()`, which
    /// is simply looped back). Returns what this rank received from every
    /// rank, in rank order. This is the "distributor" primitive the import
    /// planner builds on.
    fn all_to_all_varying(&self, send_by_rank: &[Vec<u8>]) -> Vec<Vec<u8>>;

    fn barrier(&self);
}
