//! A passive container for the redistributed mesh (spec §4.5). It implements
//! the same [`MeshTraits`] contract the caller's source mesh does, so the
//! kD-tree builder doesn't need to know it's looking at rendezvous data
//! rather than the original mesh.

use crate::algorithms::import_planner::ImportPlan;
use crate::mesh_traits::{ElementTopology, GlobalOrdinal, MeshTraits};

pub struct RendezvousMesh {
    pub node_dim: usize,
    pub rendezvous_node_ids: Vec<GlobalOrdinal>,
    pub rendezvous_coords: Vec<f64>,
    pub nodes_per_element: usize,
    pub rendezvous_element_ids: Vec<GlobalOrdinal>,
    pub rendezvous_connectivity: Vec<GlobalOrdinal>,
    pub element_topology: ElementTopology,
}

impl RendezvousMesh {
    pub fn from_import_plan(plan: ImportPlan, element_topology: ElementTopology) -> Self {
        RendezvousMesh {
            node_dim: plan.node_dim,
            rendezvous_node_ids: plan.rendezvous_node_ids,
            rendezvous_coords: plan.rendezvous_coords,
            nodes_per_element: plan.nodes_per_element,
            rendezvous_element_ids: plan.rendezvous_element_ids,
            rendezvous_connectivity: plan.rendezvous_connectivity,
            element_topology,
        }
    }
}

impl MeshTraits for RendezvousMesh {
    fn node_dim(&self) -> usize {
        self.node_dim
    }

    fn num_nodes(&self) -> usize {
        self.rendezvous_node_ids.len()
    }

    fn num_elements(&self) -> usize {
        self.rendezvous_element_ids.len()
    }

    fn nodes(&self) -> &[GlobalOrdinal] {
        &self.rendezvous_node_ids
    }

    fn coords(&self) -> &[f64] {
        &self.rendezvous_coords
    }

    fn nodes_per_element(&self) -> usize {
        self.nodes_per_element
    }

    fn elements(&self) -> &[GlobalOrdinal] {
        &self.rendezvous_element_ids
    }

    fn connectivity(&self) -> &[GlobalOrdinal] {
        &self.rendezvous_connectivity
    }

    fn element_topology(&self) -> ElementTopology {
        // RendezvousMesh carries whichever single element block the source
        // mesh handed to `Rendezvous::build`; see DESIGN.md for the
        // single-block assumption this crate makes.
        self.element_topology
    }
}
