//! Convex geometry sources
//!
//! Shapes live in model space. A [`Body`](super::Body) places them in the
//! world through its transform; nothing here knows about world space.

use crate::foundation::math::Vec3;
use crate::geometry::AABB;

/// A single convex hull: vertices plus triangle indices (three per face)
///
/// Only the vertices take part in support queries. The indices are kept so
/// hulls loaded from a decomposition round-trip unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvexHull {
    vertices: Vec<Vec3>,
    indices: Vec<u32>,
}

impl ConvexHull {
    /// Create a hull from vertices and triangle indices
    pub fn new(vertices: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Create a hull from a point cloud (no face data)
    pub fn from_vertices(vertices: Vec<Vec3>) -> Self {
        Self::new(vertices, Vec::new())
    }

    /// Box hull with 8 vertices and 12 triangles
    pub fn cuboid(half_extents: Vec3) -> Self {
        let vertices = AABB::from_center_half_extents(Vec3::zeros(), half_extents)
            .corners()
            .to_vec();
        #[rustfmt::skip]
        let indices = vec![
            0, 2, 1,  1, 2, 3, // -z
            4, 5, 6,  5, 7, 6, // +z
            0, 1, 4,  1, 5, 4, // -y
            2, 6, 3,  3, 6, 7, // +y
            0, 4, 2,  2, 4, 6, // -x
            1, 3, 5,  3, 7, 5, // +x
        ];
        Self::new(vertices, indices)
    }

    /// Model-space vertices
    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    /// Triangle indices
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// A hull without vertices has no support point
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Model-space bounds; empty sentinel for an empty hull
    pub fn local_aabb(&self) -> AABB {
        AABB::from_points(self.vertices.iter())
    }

    /// Vertex maximizing `direction · v`; the first one wins ties
    pub fn support_local(&self, direction: &Vec3) -> Option<Vec3> {
        let mut best: Option<(f32, Vec3)> = None;
        for vertex in &self.vertices {
            let projection = vertex.dot(direction);
            if best.map_or(true, |(best_projection, _)| projection > best_projection) {
                best = Some((projection, *vertex));
            }
        }
        best.map(|(_, vertex)| vertex)
    }
}

/// Convex geometry attached to a body
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionShape {
    /// Box centered on the body origin; eligible for the SAT narrow phase
    Cuboid {
        /// Half size along each local axis
        half_extents: Vec3,
    },
    /// Single convex hull
    Hull(ConvexHull),
    /// Union of convex hulls from a convex decomposition
    Decomposed(Vec<ConvexHull>),
}

impl Default for CollisionShape {
    /// Unit cube (half extent 0.5)
    fn default() -> Self {
        Self::Cuboid { half_extents: Vec3::repeat(0.5) }
    }
}

impl CollisionShape {
    /// Box shape
    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::Cuboid { half_extents: half_extents.abs() }
    }

    /// Whether the shape is an exact box
    pub const fn is_cuboid(&self) -> bool {
        matches!(self, Self::Cuboid { .. })
    }

    /// Whether there is any geometry to test against
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Cuboid { .. } => false,
            Self::Hull(hull) => hull.is_empty(),
            Self::Decomposed(hulls) => hulls.iter().all(ConvexHull::is_empty),
        }
    }

    /// Model-space bounds of the whole shape
    pub fn local_aabb(&self) -> AABB {
        match self {
            Self::Cuboid { half_extents } => {
                AABB::from_center_half_extents(Vec3::zeros(), *half_extents)
            }
            Self::Hull(hull) => hull.local_aabb(),
            Self::Decomposed(hulls) => hulls
                .iter()
                .fold(AABB::empty(), |acc, hull| acc.merge(&hull.local_aabb())),
        }
    }

    /// Convex pieces the narrow phase iterates over
    pub fn pieces(&self) -> Vec<ShapePiece<'_>> {
        match self {
            Self::Cuboid { half_extents } => vec![ShapePiece::Cuboid(*half_extents)],
            Self::Hull(hull) => vec![ShapePiece::Hull(hull)],
            Self::Decomposed(hulls) => hulls.iter().map(ShapePiece::Hull).collect(),
        }
    }
}

/// One convex piece of a [`CollisionShape`]
#[derive(Debug, Clone, Copy)]
pub enum ShapePiece<'a> {
    /// Origin-centered box
    Cuboid(Vec3),
    /// Borrowed hull
    Hull(&'a ConvexHull),
}

impl ShapePiece<'_> {
    /// Model-space support point
    pub fn support_local(&self, direction: &Vec3) -> Option<Vec3> {
        match self {
            Self::Cuboid(half) => Some(Vec3::new(
                if direction.x >= 0.0 { half.x } else { -half.x },
                if direction.y >= 0.0 { half.y } else { -half.y },
                if direction.z >= 0.0 { half.z } else { -half.z },
            )),
            Self::Hull(hull) => hull.support_local(direction),
        }
    }

    /// Model-space bounds
    pub fn local_aabb(&self) -> AABB {
        match self {
            Self::Cuboid(half) => AABB::from_center_half_extents(Vec3::zeros(), *half),
            Self::Hull(hull) => hull.local_aabb(),
        }
    }

    /// Model-space points whose transformed images bound the piece
    pub fn local_points(&self) -> Vec<Vec3> {
        match self {
            Self::Cuboid(half) => AABB::from_center_half_extents(Vec3::zeros(), *half)
                .corners()
                .to_vec(),
            Self::Hull(hull) => hull.vertices().to_vec(),
        }
    }

    /// Whether the piece has no vertices
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Cuboid(_) => false,
            Self::Hull(hull) => hull.is_empty(),
        }
    }
}
