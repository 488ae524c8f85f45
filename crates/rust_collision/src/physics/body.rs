//! Shape adapter
//!
//! A [`Body`] binds a model-space [`CollisionShape`] to a world [`Transform`]
//! and answers the three questions the pipeline asks of it: world bounds
//! (AABB and OBB), support points, and whether its transform changed since
//! the bounds were last computed.

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::geometry::{AABB, OBB};

use super::collision_layers::CollisionLayers;
use super::gjk::SupportMap;
use super::shape::{CollisionShape, ShapePiece};

/// A collidable body
#[derive(Debug, Clone)]
pub struct Body {
    name: String,
    transform: Transform,
    shape: CollisionShape,
    layer: CollisionLayers,
    mask: CollisionLayers,
    dirty: bool,
    aabb: AABB,
    obb: OBB,
}

impl Body {
    /// Create a body at the origin
    ///
    /// Bounds are computed immediately, so a freshly created body is clean.
    pub fn new(name: impl Into<String>, shape: CollisionShape) -> Self {
        let mut body = Self {
            name: name.into(),
            transform: Transform::identity(),
            shape,
            layer: CollisionLayers::DEFAULT,
            mask: CollisionLayers::all(),
            dirty: true,
            aabb: AABB::empty(),
            obb: OBB::from_aabb(&AABB::from_center_half_extents(Vec3::zeros(), Vec3::zeros())),
        };
        body.update_bounds();
        body
    }

    /// Set the transform, builder style
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.set_transform(transform);
        self.update_bounds();
        self
    }

    /// Set the position, builder style
    #[must_use]
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.set_position(position);
        self.update_bounds();
        self
    }

    /// Set layer and mask, builder style
    #[must_use]
    pub const fn with_layers(mut self, layer: CollisionLayers, mask: CollisionLayers) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current transform
    pub const fn transform(&self) -> &Transform {
        &self.transform
    }

    /// World position
    pub const fn position(&self) -> Vec3 {
        self.transform.position
    }

    /// World orientation
    pub const fn rotation(&self) -> Quat {
        self.transform.rotation
    }

    /// Per-axis scale
    pub const fn scale(&self) -> Vec3 {
        self.transform.scale
    }

    /// Model-space geometry
    pub const fn shape(&self) -> &CollisionShape {
        &self.shape
    }

    /// Collision layer
    pub const fn layer(&self) -> CollisionLayers {
        self.layer
    }

    /// Collision mask
    pub const fn mask(&self) -> CollisionLayers {
        self.mask
    }

    /// Replace layer and mask
    pub fn set_layers(&mut self, layer: CollisionLayers, mask: CollisionLayers) {
        self.layer = layer;
        self.mask = mask;
    }

    /// Replace the transform
    pub fn set_transform(&mut self, transform: Transform) {
        self.transform = transform;
        self.dirty = true;
    }

    /// Move to a new position
    pub fn set_position(&mut self, position: Vec3) {
        self.transform.position = position;
        self.dirty = true;
    }

    /// Set the orientation
    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
        self.dirty = true;
    }

    /// Set the scale
    pub fn set_scale(&mut self, scale: Vec3) {
        self.transform.scale = scale;
        self.dirty = true;
    }

    /// Move by `delta`
    pub fn translate(&mut self, delta: Vec3) {
        self.transform.position += delta;
        self.dirty = true;
    }

    /// Apply an extra rotation on top of the current one
    pub fn rotate(&mut self, rotation: Quat) {
        self.transform.rotation = rotation * self.transform.rotation;
        self.dirty = true;
    }

    /// Replace the geometry
    pub fn set_shape(&mut self, shape: CollisionShape) {
        self.shape = shape;
        self.dirty = true;
    }

    /// Whether the cached bounds are stale
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute cached bounds if the body is dirty
    ///
    /// Returns `true` when the bounds were recomputed.
    pub fn update_bounds(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.aabb = self.compute_aabb();
        self.obb = OBB::from_local_aabb(&self.local_bounds(), &self.transform);
        self.dirty = false;
        true
    }

    /// Cached world AABB, valid as of the last [`update_bounds`](Self::update_bounds)
    pub const fn aabb(&self) -> AABB {
        self.aabb
    }

    /// Cached world OBB, valid as of the last [`update_bounds`](Self::update_bounds)
    pub const fn obb(&self) -> OBB {
        self.obb
    }

    /// World AABB computed from scratch
    ///
    /// Hulls use every transformed vertex, so the box is tight as well as
    /// conservative. A non-finite transform yields the empty box.
    pub fn compute_aabb(&self) -> AABB {
        if !self.transform.is_finite() {
            log::warn!("body '{}' has a non-finite transform, ignoring it for collisions", self.name);
            return AABB::empty();
        }
        self.shape
            .pieces()
            .iter()
            .fold(AABB::empty(), |acc, piece| acc.merge(&piece_world_aabb(piece, &self.transform)))
    }

    fn local_bounds(&self) -> AABB {
        let local = self.shape.local_aabb();
        if local.is_valid() {
            local
        } else {
            AABB::from_center_half_extents(Vec3::zeros(), Vec3::zeros())
        }
    }

    /// World-space support point over the whole shape
    ///
    /// For decomposed shapes this is the arg-max over every hull. The union is
    /// not convex, so the narrow phase uses [`hull_supports`](Self::hull_supports)
    /// instead. `None` when the shape has no vertices.
    pub fn support(&self, direction: &Vec3) -> Option<Vec3> {
        self.hull_supports()
            .into_iter()
            .filter(|hull| !hull.is_empty())
            .map(|hull| hull.support(direction))
            .max_by(|a, b| a.dot(direction).total_cmp(&b.dot(direction)))
    }

    /// One world-space support view per convex piece
    pub fn hull_supports(&self) -> Vec<HullSupport<'_>> {
        self.shape
            .pieces()
            .into_iter()
            .map(|piece| HullSupport { piece, transform: &self.transform })
            .collect()
    }
}

fn piece_world_aabb(piece: &ShapePiece<'_>, transform: &Transform) -> AABB {
    let points = piece.local_points();
    let world: Vec<Vec3> = points.iter().map(|p| transform.transform_point(p)).collect();
    AABB::from_points(world.iter())
}

/// World-space view of one convex piece of a body
#[derive(Debug, Clone, Copy)]
pub struct HullSupport<'a> {
    piece: ShapePiece<'a>,
    transform: &'a Transform,
}

impl HullSupport<'_> {
    /// World bounds of this piece
    pub fn aabb(&self) -> AABB {
        piece_world_aabb(&self.piece, self.transform)
    }
}

impl SupportMap for HullSupport<'_> {
    fn support(&self, direction: &Vec3) -> Vec3 {
        let local_direction = self.transform.inverse_transform_direction(direction);
        self.piece
            .support_local(&local_direction)
            .map_or(self.transform.position, |local| self.transform.transform_point(&local))
    }

    fn reference_point(&self) -> Vec3 {
        let local = self.piece.local_aabb();
        if local.is_valid() {
            self.transform.transform_point(&local.center())
        } else {
            self.transform.position
        }
    }

    fn is_empty(&self) -> bool {
        self.piece.is_empty()
    }
}
