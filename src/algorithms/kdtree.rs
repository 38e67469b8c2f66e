//! Local spatial index over rendezvous element bounding volumes (spec §4.6).
//! Built top-down on element centroids, splitting on the axis of largest
//! extent at each node; axis-aligned bounds are only ever used to prune the
//! search, never to decide containment -- that's delegated to the
//! caller-supplied [`PointInCell`] predicate.

use crate::geometry::{node_coord, BoundingBox, Point3D};
use crate::mesh_traits::{element_nodes, GlobalOrdinal, MeshTraits, SENTINEL};
use crate::point_in_cell::PointInCell;

/// Leaves hold up to this many elements before splitting again.
const MAX_LEAF_SIZE: usize = 8;

enum Node {
    Leaf {
        bbox: BoundingBox,
        elements: Vec<usize>,
    },
    Split {
        bbox: BoundingBox,
        lower: Box<Node>,
        upper: Box<Node>,
    },
}

impl Node {
    fn bbox(&self) -> BoundingBox {
        match self {
            Node::Leaf { bbox, .. } | Node::Split { bbox, .. } => *bbox,
        }
    }
}

pub struct KdTree {
    root: Node,
    element_ids: Vec<GlobalOrdinal>,
    element_node_coords: Vec<Vec<Point3D<f64>>>,
}

impl KdTree {
    pub fn build(mesh: &dyn MeshTraits) -> Self {
        let node_dim = mesh.node_dim();
        let num_nodes = mesh.num_nodes();
        let num_elements = mesh.num_elements();
        let nodes_per_element = mesh.nodes_per_element();
        let coords = mesh.coords();
        let connectivity = mesh.connectivity();
        let node_index: std::collections::BTreeMap<GlobalOrdinal, usize> = mesh
            .nodes()
            .iter()
            .enumerate()
            .map(|(slot, &id)| (id, slot))
            .collect();

        let element_ids: Vec<GlobalOrdinal> = mesh.elements().to_vec();
        let element_node_coords: Vec<Vec<Point3D<f64>>> = (0..num_elements)
            .map(|element| {
                element_nodes(connectivity, num_elements, nodes_per_element, element)
                    .map(|node_id| {
                        let slot = node_index[&node_id];
                        node_coord(coords, num_nodes, node_dim, slot)
                    })
                    .collect()
            })
            .collect();

        let centroids: Vec<Point3D<f64>> = element_node_coords
            .iter()
            .map(|nodes| {
                let sum = nodes.iter().fold(Point3D::origin(), |acc, p| {
                    Point3D::new(acc.x + p.x, acc.y + p.y, acc.z + p.z)
                });
                let n = nodes.len().max(1) as f64;
                Point3D::new(sum.x / n, sum.y / n, sum.z / n)
            })
            .collect();

        let all: Vec<usize> = (0..num_elements).collect();
        let root = if num_elements == 0 {
            Node::Leaf {
                bbox: BoundingBox::new(0., 0., 0., 0., 0., 0.),
                elements: Vec::new(),
            }
        } else {
            build_node(&all, &centroids, &element_node_coords)
        };

        KdTree {
            root,
            element_ids,
            element_node_coords,
        }
    }

    /// Returns the `GlobalOrdinal` of an element whose cell contains `point`,
    /// tie-broken towards the smallest such id, or [`SENTINEL`] if none does.
    pub fn find_point(&self, point: Point3D<f64>, predicate: &dyn PointInCell) -> GlobalOrdinal {
        let mut best: Option<GlobalOrdinal> = None;
        self.search(&self.root, point, predicate, &mut best);
        best.unwrap_or(SENTINEL)
    }

    fn search(&self, node: &Node, point: Point3D<f64>, predicate: &dyn PointInCell, best: &mut Option<GlobalOrdinal>) {
        if !node.bbox().contains(point) {
            return;
        }
        match node {
            Node::Leaf { elements, .. } => {
                for &element in elements {
                    let id = self.element_ids[element];
                    if best.is_some_and(|b| b <= id) {
                        continue;
                    }
                    if predicate.contains(&self.element_node_coords[element], point) {
                        *best = Some(match *best {
                            Some(current) => current.min(id),
                            None => id,
                        });
                    }
                }
            }
            Node::Split { lower, upper, .. } => {
                self.search(lower, point, predicate, best);
                self.search(upper, point, predicate, best);
            }
        }
    }
}

fn bboxes_union(indices: &[usize], element_node_coords: &[Vec<Point3D<f64>>]) -> BoundingBox {
    let mut bbox: Option<BoundingBox> = None;
    for &element in indices {
        let element_bbox = BoundingBox::from_points(element_node_coords[element].iter().copied())
            .unwrap_or_else(|| BoundingBox::new(0., 0., 0., 0., 0., 0.));
        bbox = Some(match bbox {
            Some(acc) => acc.union(&element_bbox),
            None => element_bbox,
        });
    }
    bbox.expect("build_node is never called with an empty index list")
}

fn build_node(indices: &[usize], centroids: &[Point3D<f64>], element_node_coords: &[Vec<Point3D<f64>>]) -> Node {
    let bbox = bboxes_union(indices, element_node_coords);

    if indices.len() <= MAX_LEAF_SIZE {
        return Node::Leaf {
            bbox,
            elements: indices.to_vec(),
        };
    }

    let centroid_bbox = BoundingBox::from_points(indices.iter().map(|&i| centroids[i]))
        .expect("indices is non-empty here");
    let axis = centroid_bbox.longest_axis();

    let mut sorted: Vec<usize> = indices.to_vec();
    sorted.sort_by(|&a, &b| centroids[a][axis].partial_cmp(&centroids[b][axis]).unwrap());
    let mid = sorted.len() / 2;
    let (lower_indices, upper_indices) = sorted.split_at(mid);

    Node::Split {
        bbox,
        lower: Box::new(build_node(lower_indices, centroids, element_node_coords)),
        upper: Box::new(build_node(upper_indices, centroids, element_node_coords)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point_in_cell::BoundingBoxPredicate;
    use crate::rendezvous_mesh::RendezvousMesh;

    fn unit_tet() -> RendezvousMesh {
        RendezvousMesh {
            node_dim: 3,
            rendezvous_node_ids: vec![1, 2, 3, 4],
            // dimension-major blocked coords for a right tetrahedron at the origin
            rendezvous_coords: vec![
                0., 1., 0., 0., // x
                0., 0., 1., 0., // y
                0., 0., 0., 1., // z
            ],
            nodes_per_element: 4,
            rendezvous_element_ids: vec![100],
            rendezvous_connectivity: vec![1, 2, 3, 4],
            element_topology: crate::mesh_traits::ElementTopology::Tet4,
        }
    }

    #[test]
    fn finds_the_element_containing_a_point() {
        let mesh = unit_tet();
        let tree = KdTree::build(&mesh);
        let predicate = BoundingBoxPredicate;
        assert_eq!(tree.find_point(Point3D::new(0.1, 0.1, 0.1), &predicate), 100);
    }

    #[test]
    fn returns_sentinel_outside_every_element() {
        let mesh = unit_tet();
        let tree = KdTree::build(&mesh);
        let predicate = BoundingBoxPredicate;
        assert_eq!(tree.find_point(Point3D::new(2., 2., 2.), &predicate), SENTINEL);
    }

    #[test]
    fn empty_mesh_always_returns_sentinel() {
        let mesh = RendezvousMesh {
            node_dim: 3,
            rendezvous_node_ids: vec![],
            rendezvous_coords: vec![],
            nodes_per_element: 4,
            rendezvous_element_ids: vec![],
            rendezvous_connectivity: vec![],
            element_topology: crate::mesh_traits::ElementTopology::Tet4,
        };
        let tree = KdTree::build(&mesh);
        let predicate = BoundingBoxPredicate;
        assert_eq!(tree.find_point(Point3D::new(0., 0., 0.), &predicate), SENTINEL);
    }
}
