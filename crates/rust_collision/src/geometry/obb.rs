//! Oriented bounding box

use crate::foundation::math::{Mat3, Transform, Vec3};

use super::AABB;

/// Oriented bounding box
///
/// `orientation` columns are the box's local x, y and z axes in world space
/// (orthonormal).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OBB {
    /// World-space center
    pub center: Vec3,
    /// Half size along each local axis
    pub half_extents: Vec3,
    /// Rotation whose columns are the box axes
    pub orientation: Mat3,
}

impl OBB {
    /// Create a box from its parts
    pub const fn new(center: Vec3, half_extents: Vec3, orientation: Mat3) -> Self {
        Self { center, half_extents, orientation }
    }

    /// Axis-aligned box as an OBB
    pub fn from_aabb(aabb: &AABB) -> Self {
        Self::new(aabb.center(), aabb.half_extents(), Mat3::identity())
    }

    /// World box for a local-space AABB placed by `transform`
    pub fn from_local_aabb(local: &AABB, transform: &Transform) -> Self {
        Self {
            center: transform.transform_point(&local.center()),
            half_extents: local.half_extents().component_mul(&transform.scale.abs()),
            orientation: transform.rotation_matrix(),
        }
    }

    /// The three unit axes
    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.orientation.column(0).into_owned(),
            self.orientation.column(1).into_owned(),
            self.orientation.column(2).into_owned(),
        ]
    }

    /// Half-length of this box's projection onto `axis`
    pub fn project_radius(&self, axis: &Vec3) -> f32 {
        let [x, y, z] = self.axes();
        self.half_extents.x * x.dot(axis).abs()
            + self.half_extents.y * y.dot(axis).abs()
            + self.half_extents.z * z.dot(axis).abs()
    }

    /// Furthest corner along `direction`
    pub fn support(&self, direction: &Vec3) -> Vec3 {
        self.axes()
            .iter()
            .zip(self.half_extents.iter())
            .fold(self.center, |point, (axis, half)| {
                let sign = if axis.dot(direction) >= 0.0 { 1.0 } else { -1.0 };
                point + axis * (sign * half)
            })
    }

    /// The eight world-space corners
    pub fn corners(&self) -> [Vec3; 8] {
        let local = AABB::from_center_half_extents(Vec3::zeros(), self.half_extents);
        local.corners().map(|corner| self.center + self.orientation * corner)
    }

    /// Axis-aligned box around the eight corners
    pub fn aabb(&self) -> AABB {
        AABB::from_points(self.corners().iter())
    }
}
