//! The import planner (spec §4.4) -- the hardest part of the rendezvous.
//! Ships whole elements, and every node they touch, to every rank that owns
//! any node of that element, so each rendezvous rank ends up with a locally
//! complete mesh over its spatial region.
//!
//! Phases, mirroring the spec exactly:
//! 1. Filtering -- delegated to [`super::filter`], shared with RCB.
//! 2. Element destinations -- per in-box element, the set of ranks owning
//!    any of its nodes (via `rcb.get_destination_proc`).
//! 3. Element shipping -- unroll to `(element_id, dest_rank)` pairs, run
//!    through the distributor, dedup into `rendezvous_elements`.
//! 4. Node destinations -- computed from step 2's per-element destination
//!    sets (not from RCB directly), so nodes pulled along by a
//!    cross-boundary element aren't missed.
//! 5. Node + coordinate/connectivity shipping -- same mechanism as step 3.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::filter::FilterResult;
use super::rcb::RcbTree;
use crate::comm::{Comm, Rank};
use crate::distributor;
use crate::error::{RendezvousError, Result};
use crate::geometry::node_coord;
use crate::mesh_traits::{element_nodes, GlobalOrdinal, MeshTraits};

#[derive(Serialize, Deserialize)]
struct ElementExport {
    element_id: GlobalOrdinal,
    node_ids: Vec<GlobalOrdinal>,
}

#[derive(Serialize, Deserialize)]
struct NodeExport {
    node_id: GlobalOrdinal,
    coord: Vec<f64>,
}

/// The redistributed arrays a [`crate::rendezvous_mesh::RendezvousMesh`] is
/// built from.
pub struct ImportPlan {
    pub node_dim: usize,
    pub nodes_per_element: usize,
    pub rendezvous_node_ids: Vec<GlobalOrdinal>,
    pub rendezvous_coords: Vec<f64>,
    pub rendezvous_element_ids: Vec<GlobalOrdinal>,
    pub rendezvous_connectivity: Vec<GlobalOrdinal>,
}

pub fn build(comm: &dyn Comm, mesh: &dyn MeshTraits, rcb: &RcbTree, filter: &FilterResult) -> Result<ImportPlan> {
    let node_dim = mesh.node_dim();
    let num_nodes = mesh.num_nodes();
    let num_elements = mesh.num_elements();
    let nodes_per_element = mesh.nodes_per_element();
    let coords = mesh.coords();
    let connectivity = mesh.connectivity();
    let elements = mesh.elements();

    // Phase 2: element destinations.
    let mut element_exports: Vec<ElementExport> = Vec::new();
    let mut element_dests: Vec<Rank> = Vec::new();
    // Phase 4 piggybacks on the same per-element destination sets.
    let mut node_dest_pairs: BTreeSet<(GlobalOrdinal, Rank)> = BTreeSet::new();

    let mut phase_failed = false;
    for element in 0..num_elements {
        if !filter.element_in_box[element] {
            continue;
        }
        let node_ids: Vec<GlobalOrdinal> =
            element_nodes(connectivity, num_elements, nodes_per_element, element).collect();

        let mut destinations: BTreeSet<Rank> = BTreeSet::new();
        for &node_id in &node_ids {
            let slot = match filter.node_index.get(&node_id) {
                Some(&slot) => slot,
                None => {
                    phase_failed = true;
                    continue;
                }
            };
            let p = node_coord(coords, num_nodes, node_dim, slot);
            destinations.insert(rcb.get_destination_proc(p));
        }

        for &dest in &destinations {
            element_exports.push(ElementExport {
                element_id: elements[element],
                node_ids: node_ids.clone(),
            });
            element_dests.push(dest);
            for &node_id in &node_ids {
                node_dest_pairs.insert((node_id, dest));
            }
        }
    }

    if comm.all_reduce_any(phase_failed) {
        return Err(RendezvousError::InvalidInput(
            "connectivity references a node global id absent from the mesh".to_string(),
        ));
    }

    // Phase 3: ship elements, dedup into an ordered set for determinism.
    let received_elements = distributor::distribute(comm, &element_exports, &element_dests)?;
    let mut rendezvous_elements: BTreeSet<GlobalOrdinal> = BTreeSet::new();
    let mut connectivity_by_element: BTreeMap<GlobalOrdinal, Vec<GlobalOrdinal>> = BTreeMap::new();
    for export in received_elements {
        rendezvous_elements.insert(export.element_id);
        connectivity_by_element.insert(export.element_id, export.node_ids);
    }

    // Phase 5: ship nodes (and their coordinates), dedup into an ordered set.
    let mut node_exports: Vec<NodeExport> = Vec::new();
    let mut node_dests: Vec<Rank> = Vec::new();
    for &(node_id, dest) in &node_dest_pairs {
        let slot = filter.node_index[&node_id];
        let coord: Vec<f64> = (0..node_dim).map(|axis| coords[axis * num_nodes + slot]).collect();
        node_exports.push(NodeExport { node_id, coord });
        node_dests.push(dest);
    }

    let received_nodes = distributor::distribute(comm, &node_exports, &node_dests)?;
    let mut rendezvous_nodes: BTreeSet<GlobalOrdinal> = BTreeSet::new();
    let mut coord_by_node: BTreeMap<GlobalOrdinal, Vec<f64>> = BTreeMap::new();
    for export in received_nodes {
        rendezvous_nodes.insert(export.node_id);
        coord_by_node.insert(export.node_id, export.coord);
    }

    let rendezvous_node_ids: Vec<GlobalOrdinal> = rendezvous_nodes.into_iter().collect();
    let node_local_index: BTreeMap<GlobalOrdinal, usize> = rendezvous_node_ids
        .iter()
        .enumerate()
        .map(|(slot, &id)| (id, slot))
        .collect();

    let mut rendezvous_coords = vec![0.0; node_dim * rendezvous_node_ids.len()];
    for (slot, node_id) in rendezvous_node_ids.iter().enumerate() {
        let coord = &coord_by_node[node_id];
        for axis in 0..node_dim {
            rendezvous_coords[axis * rendezvous_node_ids.len() + slot] = coord[axis];
        }
    }

    let rendezvous_element_ids: Vec<GlobalOrdinal> = rendezvous_elements.into_iter().collect();
    let mut rendezvous_connectivity = vec![0u64; nodes_per_element * rendezvous_element_ids.len()];
    for (slot, element_id) in rendezvous_element_ids.iter().enumerate() {
        let node_ids = &connectivity_by_element[element_id];
        for (i, node_id) in node_ids.iter().enumerate() {
            // Invariant: every node of a shipped element was shipped to the
            // same destinations as the element itself (phase 4), so every
            // node id here also appears in `rendezvous_node_ids`.
            debug_assert!(node_local_index.contains_key(node_id));
            rendezvous_connectivity[i * rendezvous_element_ids.len() + slot] = *node_id;
        }
    }

    Ok(ImportPlan {
        node_dim,
        nodes_per_element,
        rendezvous_node_ids,
        rendezvous_coords,
        rendezvous_element_ids,
        rendezvous_connectivity,
    })
}
