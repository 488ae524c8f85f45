//! Separating axis test for oriented boxes
//!
//! Two boxes are disjoint iff their projections are disjoint on one of 15
//! axes: the three face normals of each box and the nine cross products of
//! their edge directions. Cross products of (nearly) parallel edges carry no
//! information and are skipped.

use crate::foundation::math::Vec3;
use crate::geometry::OBB;

use super::narrow_phase::Contact;

/// Squared length below which an edge cross product is treated as parallel
pub const PARALLEL_EPSILON: f32 = 1e-6;

/// Up to 15 candidate axes, face axes first
fn candidate_axes(a: &OBB, b: &OBB) -> Vec<Vec3> {
    let axes_a = a.axes();
    let axes_b = b.axes();

    let mut axes = Vec::with_capacity(15);
    axes.extend_from_slice(&axes_a);
    axes.extend_from_slice(&axes_b);
    for edge_a in &axes_a {
        for edge_b in &axes_b {
            let cross = edge_a.cross(edge_b);
            if cross.norm_squared() >= PARALLEL_EPSILON {
                axes.push(cross);
            }
        }
    }
    axes
}

/// Exact box-box overlap test (touching counts as overlapping)
pub fn test_obb_collision(a: &OBB, b: &OBB) -> bool {
    let offset = b.center - a.center;
    candidate_axes(a, b).iter().all(|axis| {
        offset.dot(axis).abs() <= a.project_radius(axis) + b.project_radius(axis)
    })
}

/// Minimum-overlap contact between two boxes, `None` when separated
///
/// The normal points from `a` to `b` along the axis of least overlap, the depth
/// is that overlap, and the point is halfway between the two boxes' deepest
/// corners along the normal.
pub fn obb_contact(a: &OBB, b: &OBB) -> Option<Contact> {
    let offset = b.center - a.center;
    let mut best: Option<(f32, Vec3)> = None;

    for axis in candidate_axes(a, b) {
        let axis = axis.normalize();
        let distance = offset.dot(&axis);
        let overlap = a.project_radius(&axis) + b.project_radius(&axis) - distance.abs();
        if overlap < 0.0 {
            return None;
        }
        if best.map_or(true, |(least, _)| overlap < least) {
            let normal = if distance < 0.0 { -axis } else { axis };
            best = Some((overlap, normal));
        }
    }

    best.map(|(depth, normal)| {
        let deepest_a = a.support(&normal);
        let deepest_b = b.support(&-normal);
        Contact {
            point: (deepest_a + deepest_b) * 0.5,
            normal,
            depth,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat3, Quat};
    use approx::assert_relative_eq;

    fn cube_at(center: Vec3) -> OBB {
        OBB::new(center, Vec3::repeat(0.5), Mat3::identity())
    }

    fn rotated(center: Vec3, half: Vec3, rotation: Quat) -> OBB {
        OBB::new(center, half, rotation.to_rotation_matrix().into_inner())
    }

    #[test]
    fn test_axis_aligned_cubes() {
        let origin = cube_at(Vec3::zeros());
        assert!(test_obb_collision(&origin, &cube_at(Vec3::zeros())));
        assert!(test_obb_collision(&origin, &cube_at(Vec3::new(0.99, 0.0, 0.0))));
        assert!(test_obb_collision(&origin, &cube_at(Vec3::new(1.0, 0.0, 0.0))));
        assert!(!test_obb_collision(&origin, &cube_at(Vec3::new(10.0, 0.0, 0.0))));
    }

    #[test]
    fn test_crossing_rods() {
        let a = rotated(
            Vec3::zeros(),
            Vec3::new(1.0, 0.1, 0.1),
            Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4),
        );
        let crossing = rotated(
            Vec3::new(0.0, 0.0, 0.15),
            Vec3::new(1.0, 0.1, 0.1),
            Quat::from_axis_angle(&Vec3::z_axis(), -std::f32::consts::FRAC_PI_4),
        );
        assert!(test_obb_collision(&a, &crossing));
        assert!(test_obb_collision(&crossing, &a));

        let lifted = rotated(
            Vec3::new(0.0, 0.0, 0.25),
            Vec3::new(1.0, 0.1, 0.1),
            Quat::from_axis_angle(&Vec3::z_axis(), -std::f32::consts::FRAC_PI_4),
        );
        assert!(!test_obb_collision(&a, &lifted));
    }

    #[test]
    fn test_skewed_rods_separated() {
        // Rods crossing at a skew angle, 0.165 apart along their common normal
        let a = rotated(Vec3::zeros(), Vec3::new(1.0, 0.05, 0.05), Quat::identity());
        let b = rotated(
            Vec3::new(0.0, 0.0, 0.2),
            Vec3::new(0.05, 1.0, 0.05),
            Quat::from_axis_angle(&Vec3::x_axis(), 0.6),
        );
        assert!(!test_obb_collision(&a, &b));
        assert!(!test_obb_collision(&b, &a));
    }

    #[test]
    fn test_parallel_boxes_skip_degenerate_axes() {
        let rotation = Quat::from_axis_angle(&Vec3::y_axis(), 0.3);
        let a = rotated(Vec3::zeros(), Vec3::repeat(0.5), rotation);
        let b = rotated(Vec3::new(0.5, 0.0, 0.0), Vec3::repeat(0.5), rotation);
        // Only the three same-axis cross products vanish
        assert_eq!(candidate_axes(&a, &b).len(), 12);
        assert!(test_obb_collision(&a, &b));
    }

    #[test]
    fn test_symmetry() {
        let a = rotated(Vec3::zeros(), Vec3::new(0.7, 0.2, 0.4), Quat::from_euler_angles(0.3, 0.5, 0.1));
        for step in 0..20 {
            let center = Vec3::new(step as f32 * 0.1, 0.35, -0.2);
            let b = rotated(center, Vec3::new(0.3, 0.3, 0.6), Quat::from_euler_angles(-0.8, 0.1, 1.2));
            assert_eq!(test_obb_collision(&a, &b), test_obb_collision(&b, &a));
        }
    }

    #[test]
    fn test_contact_normal_and_depth() {
        let a = cube_at(Vec3::zeros());
        let b = cube_at(Vec3::new(0.0, 0.0, -0.75));
        let contact = obb_contact(&a, &b).expect("overlapping");

        assert_relative_eq!(contact.normal, -Vec3::z(), epsilon = 1e-6);
        assert_relative_eq!(contact.depth, 0.25, epsilon = 1e-6);
        assert_relative_eq!(contact.point.z, -0.375, epsilon = 1e-6);
        assert!(obb_contact(&a, &cube_at(Vec3::new(0.0, 2.0, 0.0))).is_none());
    }
}
