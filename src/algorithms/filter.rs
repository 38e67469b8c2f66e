//! Shared "is this in-box" bookkeeping, computed once and handed to both RCB
//! (needs the active point set) and the import planner (needs the in-box
//! element list and the same node global-id -> local-slot map). The original
//! DataTransferKit-style sources built this map twice -- once while
//! filtering, once while planning; the spec calls that out as a minor
//! inefficiency, not a contract, so here it is a single pass.

use std::collections::BTreeMap;

use crate::geometry::{node_coord, BoundingBox};
use crate::mesh_traits::{element_nodes, GlobalOrdinal, MeshTraits};

pub struct FilterResult {
    /// Node global id -> local slot, built once from `mesh.nodes()`.
    pub node_index: BTreeMap<GlobalOrdinal, usize>,
    /// Per local node slot: does its coordinate lie in the global box?
    pub node_in_box: Vec<bool>,
    /// Per local element slot: is at least one of its nodes in-box?
    pub element_in_box: Vec<bool>,
    /// Union, over every in-box element, of all of its nodes -- including
    /// ones that are themselves outside the box. This is the set RCB
    /// partitions over.
    pub active_nodes: Vec<GlobalOrdinal>,
}

pub fn compute(mesh: &dyn MeshTraits, global_box: &BoundingBox) -> FilterResult {
    let node_dim = mesh.node_dim();
    let num_nodes = mesh.num_nodes();
    let num_elements = mesh.num_elements();
    let nodes_per_element = mesh.nodes_per_element();
    let coords = mesh.coords();
    let connectivity = mesh.connectivity();

    let node_index: BTreeMap<GlobalOrdinal, usize> = mesh
        .nodes()
        .iter()
        .enumerate()
        .map(|(slot, &id)| (id, slot))
        .collect();

    let node_in_box: Vec<bool> = (0..num_nodes)
        .map(|slot| global_box.contains(node_coord(coords, num_nodes, node_dim, slot)))
        .collect();

    let mut element_in_box = vec![false; num_elements];
    let mut active: std::collections::BTreeSet<GlobalOrdinal> = Default::default();

    for element in 0..num_elements {
        let nodes: Vec<GlobalOrdinal> =
            element_nodes(connectivity, num_elements, nodes_per_element, element).collect();
        let in_box = nodes.iter().any(|node_id| {
            node_index
                .get(node_id)
                .map(|&slot| node_in_box[slot])
                .unwrap_or(false)
        });
        element_in_box[element] = in_box;
        if in_box {
            active.extend(nodes);
        }
    }

    FilterResult {
        node_index,
        node_in_box,
        element_in_box,
        active_nodes: active.into_iter().collect(),
    }
}
