//! The read-only capability set the rendezvous core consumes, adapted from
//! whatever mesh type the caller brings (see the spec's `MeshTraits adapter`
//! component). Both the caller's source mesh and the rendezvous's own
//! [`crate::rendezvous_mesh::RendezvousMesh`] implement it, so the kD-tree
//! and import planner only ever talk to this trait.

/// Process-unique integer identifier of a node or element, supplied by the
/// caller's mesh and preserved verbatim through redistribution.
pub type GlobalOrdinal = u64;

/// Reserved `GlobalOrdinal` meaning "no element found". Never a valid id
/// coming out of a well-formed mesh.
pub const SENTINEL: GlobalOrdinal = GlobalOrdinal::MAX;

/// The element shapes the rendezvous knows how to carry. The core never
/// interprets topology beyond `dimension()` and `nodes_per_element()`; actual
/// point-in-cell containment is delegated to [`crate::point_in_cell::PointInCell`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementTopology {
    Vertex,
    Edge2,
    Tri3,
    Quad4,
    Tet4,
    Hex8,
    Wedge6,
    Pyramid5,
}

impl ElementTopology {
    pub fn dimension(&self) -> usize {
        match self {
            ElementTopology::Vertex => 0,
            ElementTopology::Edge2 => 1,
            ElementTopology::Tri3 | ElementTopology::Quad4 => 2,
            ElementTopology::Tet4
            | ElementTopology::Hex8
            | ElementTopology::Wedge6
            | ElementTopology::Pyramid5 => 3,
        }
    }

    pub fn nodes_per_element(&self) -> usize {
        match self {
            ElementTopology::Vertex => 1,
            ElementTopology::Edge2 => 2,
            ElementTopology::Tri3 => 3,
            ElementTopology::Quad4 | ElementTopology::Tet4 => 4,
            ElementTopology::Pyramid5 => 5,
            ElementTopology::Wedge6 => 6,
            ElementTopology::Hex8 => 8,
        }
    }
}

/// A uniform, read-only view over a mesh's nodes, coordinates, elements and
/// connectivity. The core never assumes the nodes of a single element are
/// contiguous in `connectivity()`: that array is node-slot-major blocked
/// (slot `i` of element `n` lives at `i * num_elements() + n`), not
/// element-major.
pub trait MeshTraits {
    /// Number of spatial dimensions actually stored in `coords()`, in `1..=3`.
    fn node_dim(&self) -> usize;

    fn num_nodes(&self) -> usize;

    fn num_elements(&self) -> usize;

    /// Node global ids, in the same order as `coords()`'s blocks.
    fn nodes(&self) -> &[GlobalOrdinal];

    /// Dimension-major blocked: axis `k` of node `n` at `k * num_nodes() + n`.
    fn coords(&self) -> &[f64];

    fn nodes_per_element(&self) -> usize;

    /// Element global ids, in the same order as `connectivity()`'s blocks.
    fn elements(&self) -> &[GlobalOrdinal];

    /// Node-slot-major blocked: slot `i` of element `n` at
    /// `i * num_elements() + n`. Entries are `GlobalOrdinal`s of nodes, not
    /// local indices.
    fn connectivity(&self) -> &[GlobalOrdinal];

    fn element_topology(&self) -> ElementTopology;
}

/// Reads node-local slot `node` of element `element` out of a node-slot-major
/// blocked connectivity array.
pub fn connectivity_slot(
    connectivity: &[GlobalOrdinal],
    num_elements: usize,
    nodes_per_element: usize,
    element: usize,
    slot: usize,
) -> GlobalOrdinal {
    debug_assert!(slot < nodes_per_element);
    connectivity[slot * num_elements + element]
}

/// Iterates the node global ids of `element` (node-slot-major blocked).
pub fn element_nodes(
    connectivity: &[GlobalOrdinal],
    num_elements: usize,
    nodes_per_element: usize,
    element: usize,
) -> impl Iterator<Item = GlobalOrdinal> + '_ {
    (0..nodes_per_element)
        .map(move |slot| connectivity_slot(connectivity, num_elements, nodes_per_element, element, slot))
}
