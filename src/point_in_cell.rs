//! The point-in-cell geometric predicate is an external collaborator (the
//! spec scopes it out: "the point-in-cell geometric predicate used by the
//! kD-tree at leaf resolution"). The kD-tree only ever prunes with bounding
//! boxes; containment inside an actual element is delegated to whatever
//! implements this trait.

use crate::geometry::Point3D;

/// Tests whether `point` lies inside the cell spanned by `node_coords`
/// (the element's nodes, in connectivity slot order, already padded to 3D).
pub trait PointInCell: Send + Sync {
    fn contains(&self, node_coords: &[Point3D<f64>], point: Point3D<f64>) -> bool;
}

/// A conservative stand-in predicate: a point is "in" a cell if it lies in
/// the cell's own axis-aligned bounding box. This is exact for axis-aligned
/// boxes (hexahedra built from unit cubes, as in this crate's own tests) and
/// a reasonable default for callers who have not wired in a real topology
/// predicate; production embeddings should supply one that understands the
/// actual element shapes (isoparametric inversion, barycentric coordinates,
/// etc).
#[derive(Debug, Default, Clone, Copy)]
pub struct BoundingBoxPredicate;

impl PointInCell for BoundingBoxPredicate {
    fn contains(&self, node_coords: &[Point3D<f64>], point: Point3D<f64>) -> bool {
        let bbox = match crate::geometry::BoundingBox::from_points(node_coords.iter().copied()) {
            Some(bbox) => bbox,
            None => return false,
        };
        bbox.contains(point)
    }
}
