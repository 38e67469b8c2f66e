//! Minimal geometric primitives shared by the RCB partitioner and the kD-tree.
//!
//! Mesh nodes may live in 1, 2 or 3 dimensions, but every geometric
//! computation inside the rendezvous is done in 3D: coordinates below 3D are
//! zero-padded on the way in (see [`pad3`]), and cuts along a degenerate axis
//! simply never get selected because the axis has zero extent.

pub use nalgebra::Point3 as Point3D;

/// Zero-pads a `node_dim`-dimensional coordinate, read out of a blocked
/// coordinate array, up to 3 dimensions.
pub fn pad3(components: &[f64]) -> Point3D<f64> {
    let mut xyz = [0.0; 3];
    for (axis, value) in components.iter().enumerate().take(3) {
        xyz[axis] = *value;
    }
    Point3D::new(xyz[0], xyz[1], xyz[2])
}

/// Reads node `node` of a dimension-major blocked coordinate array
/// (`coords[axis * num_nodes + node]`, see the crate-level data model docs)
/// and zero-pads it to 3D via [`pad3`].
pub fn node_coord(coords: &[f64], num_nodes: usize, node_dim: usize, node: usize) -> Point3D<f64> {
    let dim = node_dim.min(3);
    let mut components = [0.0; 3];
    for axis in 0..dim {
        components[axis] = coords[axis * num_nodes + node];
    }
    pad3(&components[..dim])
}

/// A closed axis-aligned box. Degenerate boxes (zero extent along one or
/// more axes) are legal and commonly arise from padding meshes of
/// `node_dim < 3`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min: Point3D<f64>,
    pub max: Point3D<f64>,
}

impl BoundingBox {
    pub fn new(xmin: f64, ymin: f64, zmin: f64, xmax: f64, ymax: f64, zmax: f64) -> Self {
        Self {
            min: Point3D::new(xmin, ymin, zmin),
            max: Point3D::new(xmax, ymax, zmax),
        }
    }

    /// `true` iff `xmin <= xmax`, `ymin <= ymax` and `zmin <= zmax`.
    pub fn is_valid(&self) -> bool {
        self.min.x <= self.max.x && self.min.y <= self.max.y && self.min.z <= self.max.z
    }

    /// Closed-box containment: points on a face are inside.
    pub fn contains(&self, p: Point3D<f64>) -> bool {
        (self.min.x..=self.max.x).contains(&p.x)
            && (self.min.y..=self.max.y).contains(&p.y)
            && (self.min.z..=self.max.z).contains(&p.z)
    }

    pub fn extent(&self, axis: usize) -> f64 {
        self.max[axis] - self.min[axis]
    }

    /// The axis with the largest extent. Ties are broken towards the lowest
    /// axis index (x before y before z), which keeps cuts deterministic on
    /// perfectly cubic regions.
    pub fn longest_axis(&self) -> usize {
        let extents = [self.extent(0), self.extent(1), self.extent(2)];
        let mut best = 0;
        for axis in 1..3 {
            if extents[axis] > extents[best] {
                best = axis;
            }
        }
        best
    }

    /// Splits the box along `axis` at `value`, returning `(lower, upper)`.
    /// `value` is shared by both halves, matching the closed-box, tie-to-lower
    /// semantics used by the RCB cut tree.
    pub fn split(&self, axis: usize, value: f64) -> (BoundingBox, BoundingBox) {
        let mut lower_max = self.max;
        lower_max[axis] = value;
        let mut upper_min = self.min;
        upper_min[axis] = value;
        (
            BoundingBox {
                min: self.min,
                max: lower_max,
            },
            BoundingBox {
                min: upper_min,
                max: self.max,
            },
        )
    }

    /// The box that encloses both `self` and `other`.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox {
            min: Point3D::new(
                self.min.x.min(other.min.x),
                self.min.y.min(other.min.y),
                self.min.z.min(other.min.z),
            ),
            max: Point3D::new(
                self.max.x.max(other.max.x),
                self.max.y.max(other.max.y),
                self.max.z.max(other.max.z),
            ),
        }
    }

    pub fn from_points<I: IntoIterator<Item = Point3D<f64>>>(points: I) -> Option<BoundingBox> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = BoundingBox {
            min: first,
            max: first,
        };
        for p in iter {
            bbox.min = Point3D::new(bbox.min.x.min(p.x), bbox.min.y.min(p.y), bbox.min.z.min(p.z));
            bbox.max = Point3D::new(bbox.max.x.max(p.x), bbox.max.y.max(p.y), bbox.max.z.max(p.z));
        }
        Some(bbox)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn closed_box_contains_its_faces() {
        let bbox = BoundingBox::new(0., 0., 0., 1., 1., 1.);
        assert!(bbox.contains(Point3D::new(0., 0.5, 1.)));
        assert!(bbox.contains(Point3D::new(1., 1., 1.)));
        assert!(!bbox.contains(Point3D::new(1.0001, 0., 0.)));
    }

    #[test]
    fn degenerate_box_is_legal() {
        let bbox = BoundingBox::new(0., 0., 0., 1., 1., 0.);
        assert!(bbox.is_valid());
        assert!(bbox.contains(Point3D::new(0.5, 0.5, 0.)));
        assert!(!bbox.contains(Point3D::new(0.5, 0.5, 0.1)));
    }

    #[test]
    fn longest_axis_breaks_ties_towards_x() {
        let cube = BoundingBox::new(0., 0., 0., 2., 2., 2.);
        assert_eq!(cube.longest_axis(), 0);
    }

    #[test]
    fn pad3_zero_fills_missing_dimensions() {
        let p = pad3(&[1.5]);
        assert_eq!(p, Point3D::new(1.5, 0., 0.));
    }

    #[test]
    fn node_coord_matches_pad3_of_the_same_components() {
        // node_coord (the call site every algorithm actually uses) is
        // specified in terms of pad3; keep the two in lockstep.
        let coords = [1.0, 2.0]; // node_dim = 1, num_nodes = 2, reading node 1
        let via_node_coord = node_coord(&coords, 2, 1, 1);
        let via_pad3 = pad3(&[coords[1]]);
        approx::assert_relative_eq!(via_node_coord.x, via_pad3.x);
        approx::assert_relative_eq!(via_node_coord.y, via_pad3.y);
        approx::assert_relative_eq!(via_node_coord.z, via_pad3.z);
    }

    fn ordered_box() -> impl Strategy<Value = (f64, f64, f64, f64, f64, f64)> {
        (-50.0f64..50.0, -50.0f64..50.0, -50.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0, 0.0f64..50.0)
            .prop_map(|(xmin, ymin, zmin, dx, dy, dz)| (xmin, ymin, zmin, xmin + dx, ymin + dy, zmin + dz))
    }

    proptest! {
        #[test]
        fn union_is_commutative(a in ordered_box(), b in ordered_box()) {
            let a = BoundingBox::new(a.0, a.1, a.2, a.3, a.4, a.5);
            let b = BoundingBox::new(b.0, b.1, b.2, b.3, b.4, b.5);
            prop_assert_eq!(a.union(&b), b.union(&a));
        }

        #[test]
        fn union_contains_both_operands(a in ordered_box(), b in ordered_box()) {
            let a = BoundingBox::new(a.0, a.1, a.2, a.3, a.4, a.5);
            let b = BoundingBox::new(b.0, b.1, b.2, b.3, b.4, b.5);
            let u = a.union(&b);
            prop_assert!(u.contains(a.min) && u.contains(a.max));
            prop_assert!(u.contains(b.min) && u.contains(b.max));
        }

        #[test]
        fn pad3_leaves_the_third_axis_at_zero(x in -100.0f64..100.0, y in -100.0f64..100.0) {
            let p = pad3(&[x, y]);
            prop_assert_eq!(p.z, 0.0);
        }
    }
}
