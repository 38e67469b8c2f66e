//! Recursive Coordinate Bisection across a communicator (spec §4.3).
//!
//! Every rank ends up holding the *same* cut tree: at each level, every rank
//! in the whole communicator -- not just the ones eventually assigned to the
//! branch being split -- contributes to the weighted-median reduction, using
//! only the points it locally owns that fall into that branch. This costs a
//! little redundant computation (every rank walks every branch of the tree,
//! not just its own) but means `get_destination_proc` needs no further
//! communication afterwards: any rank can route any point in the global box,
//! which is exactly the contract `Rendezvous::get_rendezvous_procs` needs.
//!
//! The recursive calls into the lower and upper branches below stay
//! sequential, unlike the single-process bisection this is modeled on:
//! every rank must issue the *same sequence* of collective calls in the
//! same order, since neither `Comm` implementation tags a collective with
//! which tree branch it belongs to. Running both branches concurrently
//! (e.g. via `rayon::join`) would let one rank be mid-collective on the
//! lower branch while another is mid-collective on the upper branch,
//! silently pairing up the wrong reductions. Within a single collective
//! round, though, the local (non-collective) per-point scans over this
//! rank's own points are embarrassingly parallel and run via `rayon`.

use itertools::{Either, Itertools};
use rayon::prelude::*;

use crate::comm::Comm;
use crate::error::{RendezvousError, Result};
use crate::geometry::{BoundingBox, Point3D};

/// Number of bisection steps used to locate each weighted median. 52 halves
/// the full `f64` mantissa range, which is far more precision than any mesh
/// coordinate needs; cuts converge long before that in practice.
const MAX_BISECTION_ITERS: usize = 52;

#[derive(Debug, Clone, Copy)]
struct Cut {
    axis: usize,
    value: f64,
}

#[derive(Debug, Clone)]
enum RcbNode {
    Leaf(i32),
    Split {
        cut: Cut,
        lower: Box<RcbNode>,
        upper: Box<RcbNode>,
    },
}

/// The distributed decomposition produced by [`partition`]: a binary tree of
/// axis-aligned cuts whose leaves tile the global box, one leaf per rank.
#[derive(Debug, Clone)]
pub struct RcbTree {
    root: RcbNode,
    global_box: BoundingBox,
}

impl RcbTree {
    /// The rank whose region contains `point`. Points outside the global box
    /// still route somewhere (the last cut they fail to match), per the
    /// spec's "unspecified but deterministic" contract -- callers are
    /// expected to pre-filter with the global box.
    pub fn get_destination_proc(&self, point: Point3D<f64>) -> i32 {
        let mut node = &self.root;
        loop {
            match node {
                RcbNode::Leaf(rank) => return *rank,
                RcbNode::Split { cut, lower, upper } => {
                    node = if point[cut.axis] <= cut.value { lower } else { upper };
                }
            }
        }
    }

    pub fn global_box(&self) -> BoundingBox {
        self.global_box
    }
}

/// A point handed to RCB: its global id (unused by the algorithm itself, but
/// threaded through so callers can zip results back up), its padded-to-3D
/// coordinate and its partitioning weight.
pub struct WeightedPoint {
    pub coord: Point3D<f64>,
    pub weight: f64,
}

/// Builds the distributed cut tree over `active_points` (already filtered to
/// the subset that is in-box or attached to an in-box element, per the
/// spec's RCB inputs). Collective: every rank in `comm` must call this.
pub fn partition(comm: &dyn Comm, global_box: BoundingBox, active_points: &[WeightedPoint]) -> Result<RcbTree> {
    let local_count = active_points.len() as u64;
    let global_count = comm.all_reduce_sum_u64(local_count);
    if global_count == 0 {
        return Err(RendezvousError::PartitionError(
            "active point set is empty on every rank".to_string(),
        ));
    }
    if comm.size() as u64 > global_count {
        return Err(RendezvousError::PartitionError(format!(
            "communicator size ({}) exceeds the number of active points ({global_count})",
            comm.size()
        )));
    }

    let ranks: Vec<i32> = (0..comm.size()).collect();
    let points: Vec<&WeightedPoint> = active_points.iter().collect();
    let root = bisect(comm, &ranks, global_box, &points);
    Ok(RcbTree { root, global_box })
}

fn bisect(comm: &dyn Comm, ranks: &[i32], region: BoundingBox, points: &[&WeightedPoint]) -> RcbNode {
    if ranks.len() == 1 {
        return RcbNode::Leaf(ranks[0]);
    }

    let axis = region.longest_axis();
    let n_lower = ranks.len() / 2;
    let fraction = n_lower as f64 / ranks.len() as f64;

    let local_total: f64 = points.par_iter().map(|p| p.weight).sum();
    let total_weight = comm.all_reduce_sum_f64(local_total);

    let local_lo = points
        .par_iter()
        .map(|p| p.coord[axis])
        .reduce(|| f64::INFINITY, f64::min);
    let local_hi = points
        .par_iter()
        .map(|p| p.coord[axis])
        .reduce(|| f64::NEG_INFINITY, f64::max);
    let lo_bound = comm.all_reduce_min_f64(local_lo);
    let hi_bound = comm.all_reduce_max_f64(local_hi);

    let cut_value = weighted_median(comm, points, axis, lo_bound, hi_bound, total_weight * fraction);

    let (lower_region, upper_region) = region.split(axis, cut_value);
    let (lower_points, upper_points): (Vec<&WeightedPoint>, Vec<&WeightedPoint>) =
        points.iter().copied().partition_map(|p| {
            if p.coord[axis] <= cut_value {
                Either::Left(p)
            } else {
                Either::Right(p)
            }
        });

    let lower = bisect(comm, &ranks[..n_lower], lower_region, &lower_points);
    let upper = bisect(comm, &ranks[n_lower..], upper_region, &upper_points);

    RcbNode::Split {
        cut: Cut { axis, value: cut_value },
        lower: Box::new(lower),
        upper: Box::new(upper),
    }
}

/// Finds a cut value that sends global weight `target` to the "lower" side
/// (`coord[axis] <= value`), by bisecting `[lo, hi]` on the cumulative weight
/// function. That function is a step, not a continuous curve -- points
/// cluster at a handful of coordinate values -- so plain bisection converges
/// to `boundary`, the smallest coordinate with enough cumulative weight at
/// or below it, which sits exactly *on* a cluster of points rather than
/// between two clusters. The cut is then nudged to the midpoint between
/// `boundary` and the next distinct coordinate value above it, so it falls
/// in the gap between clusters instead of on top of one. Points exactly on
/// the resulting cut are tie-broken towards the lower (smaller axis value,
/// hence lower rank range) side by `<=` in both this scan and
/// `RcbTree::get_destination_proc`.
fn weighted_median(
    comm: &dyn Comm,
    points: &[&WeightedPoint],
    axis: usize,
    mut lo: f64,
    mut hi: f64,
    target: f64,
) -> f64 {
    if lo >= hi {
        return lo;
    }
    let span = hi - lo;
    for _ in 0..MAX_BISECTION_ITERS {
        if hi - lo <= span * 1e-15 {
            break;
        }
        let mid = lo + 0.5 * (hi - lo);
        if mid == lo || mid == hi {
            break;
        }
        let local_weight_below: f64 = points
            .par_iter()
            .filter(|p| p.coord[axis] <= mid)
            .map(|p| p.weight)
            .sum();
        let global_weight_below = comm.all_reduce_sum_f64(local_weight_below);
        if global_weight_below < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    let boundary = hi;
    let local_next_above = points
        .par_iter()
        .map(|p| p.coord[axis])
        .filter(|&v| v > boundary)
        .reduce(|| f64::INFINITY, f64::min);
    let next_above = comm.all_reduce_min_f64(local_next_above);

    if next_above.is_finite() {
        0.5 * (boundary + next_above)
    } else {
        boundary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::thread_comm::ThreadComm;
    use proptest::prelude::*;

    fn point(x: f64, y: f64, z: f64) -> WeightedPoint {
        WeightedPoint {
            coord: Point3D::new(x, y, z),
            weight: 1.0,
        }
    }

    #[test]
    fn single_rank_routes_every_in_box_point_to_itself() {
        let comms = ThreadComm::world(1);
        let comm = &comms[0];
        let global_box = BoundingBox::new(0., 0., 0., 1., 1., 1.);
        let points = vec![point(0.1, 0.1, 0.1), point(0.9, 0.9, 0.9)];
        let tree = partition(comm, global_box, &points).unwrap();
        assert_eq!(tree.get_destination_proc(Point3D::new(0.5, 0.5, 0.5)), 0);
    }

    #[test]
    fn four_ranks_tile_a_square_into_quadrants() {
        let comms = ThreadComm::world(4);
        let global_box = BoundingBox::new(0., 0., 0., 2., 2., 0.);
        // One point per quadrant of a 2x2 grid, matching the spec's seed scenario.
        let quadrant_centers = [
            point(0.5, 0.5, 0.0),
            point(1.5, 0.5, 0.0),
            point(0.5, 1.5, 0.0),
            point(1.5, 1.5, 0.0),
        ];

        let destinations: Vec<Vec<i32>> = std::thread::scope(|s| {
            let handles: Vec<_> = comms
                .iter()
                .map(|comm| {
                    let points = &quadrant_centers;
                    s.spawn(move || {
                        let tree = partition(comm, global_box, points).unwrap();
                        quadrant_centers
                            .iter()
                            .map(|p| tree.get_destination_proc(p.coord))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        // Every rank must compute the exact same routing table.
        for routing in &destinations[1..] {
            assert_eq!(routing, &destinations[0]);
        }
        // And the four quadrant centers must land on four distinct ranks.
        let mut unique = destinations[0].clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn empty_active_set_on_every_rank_fails() {
        let comms = ThreadComm::world(2);
        let global_box = BoundingBox::new(0., 0., 0., 1., 1., 1.);
        std::thread::scope(|s| {
            for comm in &comms {
                s.spawn(move || {
                    let result = partition(comm, global_box, &[]);
                    assert!(matches!(result, Err(RendezvousError::PartitionError(_))));
                });
            }
        });
    }

    proptest! {
        // Single rank: exercises weighted_median's own bounds invariant in
        // isolation, without also driving ThreadComm's barrier machinery
        // across many generated cases.
        #[test]
        fn weighted_median_stays_within_its_search_bounds(
            lo in -20.0f64..0.0,
            span in 0.01f64..40.0,
            coords_and_weights in proptest::collection::vec((0.0f64..1.0, 0.1f64..10.0), 1..20),
            fraction in 0.0f64..1.0,
        ) {
            let hi = lo + span;
            let comms = ThreadComm::world(1);
            let comm = &comms[0];
            let points: Vec<WeightedPoint> = coords_and_weights
                .iter()
                .map(|&(t, weight)| WeightedPoint {
                    coord: Point3D::new(lo + t * span, 0.0, 0.0),
                    weight,
                })
                .collect();
            let refs: Vec<&WeightedPoint> = points.iter().collect();
            let total: f64 = points.iter().map(|p| p.weight).sum();

            let cut = weighted_median(comm, &refs, 0, lo, hi, total * fraction);

            prop_assert!(cut.is_finite());
            prop_assert!(cut >= lo && cut <= hi);
        }
    }
}
