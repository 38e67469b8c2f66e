//! Rendezvous couples two independently partitioned distributed meshes so
//! that query points from a "target" mesh can be located inside elements of
//! a "source" mesh across process boundaries.
//!
//! Given a source mesh scattered across a communicator -- each rank owning
//! some nodes and elements in an unrelated decomposition -- [`Rendezvous::build`]
//! assembles a third, geometry-aware decomposition in which every rank is
//! responsible for a contiguous spatial region. That decomposition answers
//! two queries a downstream interpolation layer needs:
//!
//! - [`Rendezvous::get_rendezvous_procs`]: for a batch of coordinates, which
//!   rank owns each one's spatial region.
//! - [`Rendezvous::get_elements`]: on the owning rank, which source-mesh
//!   element (if any) contains each coordinate.
//!
//! # Crate layout
//!
//! - [`mesh_traits`] -- the read-only capability set a caller's mesh type
//!   must expose.
//! - [`geometry`] -- bounding boxes and the 3D point type every algorithm
//!   here operates in.
//! - [`comm`] -- the communicator abstraction ([`comm::Comm`]) RCB and the
//!   import planner run their collectives through.
//! - [`algorithms::rcb`] -- recursive coordinate bisection.
//! - [`algorithms::import_planner`] -- the multi-destination redistribution
//!   of mesh connectivity.
//! - [`algorithms::kdtree`] -- the local spatial index built over the
//!   redistributed mesh.
//! - [`point_in_cell`] -- the pluggable point-in-cell predicate the kD-tree
//!   uses at leaf resolution.

pub mod algorithms;
pub mod comm;
pub mod distributor;
pub mod error;
pub mod geometry;
pub mod mesh_traits;
pub mod point_in_cell;
pub mod rendezvous_mesh;


pub use error::{RendezvousError, Result};
pub use mesh_traits::{ElementTopology, GlobalOrdinal, MeshTraits, SENTINEL};

use std::collections::BTreeSet;

use algorithms::rcb::{RcbTree, WeightedPoint};
use comm::{Comm, Rank};
use geometry::{node_coord, BoundingBox};
use point_in_cell::PointInCell;
use rendezvous_mesh::RendezvousMesh;

/// Orchestrates RCB partitioning, the import planner and the kD-tree build,
/// and exposes the two queries described at the crate level.
///
/// `build` is collective: every rank of `comm` must call it, in the same
/// order. `get_rendezvous_procs` and `get_elements` are purely local reads
/// of immutable state afterwards, and safe to call concurrently from
/// different threads (the underlying RCB tree and kD-tree are read-only).
pub struct Rendezvous {
    comm: Box<dyn Comm>,
    global_box: BoundingBox,
    rcb: RcbTree,
    mesh: RendezvousMesh,
    kdtree: algorithms::kdtree::KdTree,
    predicate: Box<dyn PointInCell>,
}

impl Rendezvous {
    /// Builds the rendezvous decomposition over `mesh`. Collective across
    /// `comm`.
    ///
    /// `predicate` resolves point-in-cell containment at kD-tree leaves; see
    /// [`point_in_cell`] for why that's a pluggable collaborator rather than
    /// something this crate computes itself.
    #[tracing::instrument(skip_all, fields(rank = comm.rank(), size = comm.size()))]
    pub fn build(
        comm: Box<dyn Comm>,
        global_box: BoundingBox,
        mesh: &dyn MeshTraits,
        predicate: Box<dyn PointInCell>,
    ) -> Result<Self> {
        // Each rank owns a different slice of an unrelated source
        // decomposition, so this check is realistically rank-local: one
        // rank can fail it while its peers pass. Fold the local result into
        // the same all-reduce-a-failure-flag pattern `import_planner`'s
        // phases use, so either every rank observes the failure and returns
        // before any of them calls a collective in `algorithms::rcb::partition`,
        // or none do -- never a mix that leaves the others blocked on a
        // collective the failing rank never reaches.
        let local_validation = validate_input(mesh, &global_box);
        if comm.all_reduce_any(local_validation.is_err()) {
            return local_validation.and(Err(RendezvousError::InvalidInput(
                "mesh input failed validation on at least one rank".to_string(),
            )));
        }

        // Computed once, shared by RCB (needs the active point set) and the
        // import planner (needs the in-box element list and the node
        // global-id -> local-slot map); see `algorithms::filter`.
        let filter = algorithms::filter::compute(mesh, &global_box);
        tracing::debug!(
            active_nodes = filter.active_nodes.len(),
            in_box_elements = filter.element_in_box.iter().filter(|b| **b).count(),
            "filtered source mesh against the global box"
        );

        let active_points: Vec<WeightedPoint> = filter
            .active_nodes
            .iter()
            .map(|&node_id| {
                let slot = filter.node_index[&node_id];
                WeightedPoint {
                    coord: node_coord(mesh.coords(), mesh.num_nodes(), mesh.node_dim(), slot),
                    weight: 1.0,
                }
            })
            .collect();

        let rcb = algorithms::rcb::partition(comm.as_ref(), global_box, &active_points)?;
        tracing::debug!("RCB partition complete");

        let plan = algorithms::import_planner::build(comm.as_ref(), mesh, &rcb, &filter)?;
        tracing::debug!(
            rendezvous_nodes = plan.rendezvous_node_ids.len(),
            rendezvous_elements = plan.rendezvous_element_ids.len(),
            "import plan complete"
        );

        let rendezvous_mesh = RendezvousMesh::from_import_plan(plan, mesh.element_topology());
        let kdtree = algorithms::kdtree::KdTree::build(&rendezvous_mesh);

        Ok(Rendezvous {
            comm,
            global_box,
            rcb,
            mesh: rendezvous_mesh,
            kdtree,
            predicate,
        })
    }

    /// For each of the `N` points in `coords` (dimension-major blocked,
    /// length `node_dim * N`), the rank whose region contains it. Purely
    /// local; points outside the global box still produce a deterministic,
    /// but otherwise unspecified, rank -- callers should pre-filter.
    pub fn get_rendezvous_procs(&self, coords: &[f64]) -> Vec<Rank> {
        let node_dim = self.mesh.node_dim;
        let n = points_in(coords, node_dim);
        (0..n)
            .map(|i| {
                let p = node_coord(coords, n, node_dim, i);
                self.rcb.get_destination_proc(p)
            })
            .collect()
    }

    /// For each of the `N` points in `coords` (same layout as
    /// `get_rendezvous_procs`), the `GlobalOrdinal` of a rendezvous element
    /// containing it, or [`SENTINEL`] if none does. Purely local; callers
    /// are expected to have already routed each point to this rank via
    /// `get_rendezvous_procs`.
    pub fn get_elements(&self, coords: &[f64]) -> Vec<GlobalOrdinal> {
        let node_dim = self.mesh.node_dim;
        let n = points_in(coords, node_dim);
        (0..n)
            .map(|i| {
                let p = node_coord(coords, n, node_dim, i);
                self.kdtree.find_point(p, self.predicate.as_ref())
            })
            .collect()
    }

    pub fn global_box(&self) -> BoundingBox {
        self.global_box
    }

    pub fn rank(&self) -> Rank {
        self.comm.rank()
    }

    /// The rendezvous mesh assembled on this rank: its nodes, elements and
    /// connectivity, with global ordinals preserved.
    pub fn mesh(&self) -> &dyn MeshTraits {
        &self.mesh
    }
}

fn points_in(coords: &[f64], node_dim: usize) -> usize {
    if node_dim == 0 {
        0
    } else {
        coords.len() / node_dim
    }
}

fn validate_input(mesh: &dyn MeshTraits, global_box: &BoundingBox) -> Result<()> {
    if !(1..=3).contains(&mesh.node_dim()) {
        return Err(RendezvousError::InvalidInput(format!(
            "mesh dimension must be 1, 2 or 3, got {}",
            mesh.node_dim()
        )));
    }
    if !global_box.is_valid() {
        return Err(RendezvousError::InvalidInput(
            "global box has xmin > xmax (or ymin > ymax, or zmin > zmax)".to_string(),
        ));
    }

    let known_nodes: BTreeSet<GlobalOrdinal> = mesh.nodes().iter().copied().collect();
    let unknown = mesh
        .connectivity()
        .iter()
        .any(|node_id| !known_nodes.contains(node_id));
    if unknown {
        return Err(RendezvousError::InvalidInput(
            "connectivity references a node global id absent from the mesh".to_string(),
        ));
    }

    Ok(())
}
