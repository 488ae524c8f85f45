//! Expanding Polytope Algorithm
//!
//! Grows the terminating GJK tetrahedron inside the Minkowski difference until
//! the face closest to the origin is on the boundary. That face gives the
//! penetration normal and depth; its barycentric coordinates map back onto the
//! two shapes' support points to give witness points.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::math::Vec3;

use super::gjk::{Simplex, SupportMap, SupportPoint};

/// # EPA Configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EpaConfig {
    /// Maximum polytope expansions
    pub max_iterations: u32,
    /// Convergence tolerance on the closest-face distance
    pub tolerance: f32,
}

impl Default for EpaConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            tolerance: 1e-4,
        }
    }
}

impl EpaConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Validation("epa.max_iterations must be at least 1".into()));
        }
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(ConfigError::Validation(format!(
                "epa.tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

/// Penetration of shape A into shape B
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penetration {
    /// Unit normal pointing from A towards B
    pub normal: Vec3,
    /// Distance A must move along `-normal` to separate
    pub depth: f32,
    /// Deepest point of A inside B
    pub point_a: Vec3,
    /// Deepest point of B inside A
    pub point_b: Vec3,
}

impl Penetration {
    /// Midpoint of the two witness points
    pub fn contact_point(&self) -> Vec3 {
        (self.point_a + self.point_b) * 0.5
    }
}

const DEGENERATE_FACE: f32 = 1e-10;

#[derive(Debug, Clone, Copy)]
struct Face {
    indices: [usize; 3],
    normal: Vec3,
    distance: f32,
}

struct Polytope {
    vertices: Vec<SupportPoint>,
    faces: Vec<Face>,
    interior: Vec3,
}

impl Polytope {
    fn from_tetrahedron(points: &[SupportPoint]) -> Option<Self> {
        let interior = points.iter().map(|p| p.point).sum::<Vec3>() / points.len() as f32;
        let mut polytope = Self {
            vertices: points.to_vec(),
            faces: Vec::with_capacity(16),
            interior,
        };
        for [i, j, k] in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
            let face = polytope.make_face(i, j, k)?;
            polytope.faces.push(face);
        }
        Some(polytope)
    }

    /// Face with an outward unit normal, or `None` when it has no area
    fn make_face(&self, i: usize, j: usize, k: usize) -> Option<Face> {
        let a = self.vertices[i].point;
        let b = self.vertices[j].point;
        let c = self.vertices[k].point;
        let mut normal = (b - a).cross(&(c - a));
        let length = normal.norm();
        if length < DEGENERATE_FACE {
            return None;
        }
        normal /= length;

        let mut indices = [i, j, k];
        if normal.dot(&(a - self.interior)) < 0.0 {
            normal = -normal;
            indices.swap(1, 2);
        }
        Some(Face {
            indices,
            normal,
            distance: normal.dot(&a),
        })
    }

    fn closest_face(&self) -> Option<Face> {
        self.faces
            .iter()
            .copied()
            .min_by(|x, y| x.distance.total_cmp(&y.distance))
    }

    /// Replace every face visible from the new vertex with a fan to it
    fn expand(&mut self, support: SupportPoint) {
        let new_index = self.vertices.len();
        self.vertices.push(support);

        let mut horizon: Vec<[usize; 2]> = Vec::new();
        let vertices = &self.vertices;
        self.faces.retain(|face| {
            let visible = face.normal.dot(&(support.point - vertices[face.indices[0]].point)) > 0.0;
            if visible {
                let [i, j, k] = face.indices;
                for edge in [[i, j], [j, k], [k, i]] {
                    add_edge(&mut horizon, edge);
                }
            }
            !visible
        });

        for [i, j] in horizon {
            if let Some(face) = self.make_face(i, j, new_index) {
                self.faces.push(face);
            }
        }
    }

    fn penetration(&self, face: &Face) -> Penetration {
        let [i, j, k] = face.indices;
        let (a, b, c) = (self.vertices[i], self.vertices[j], self.vertices[k]);
        let projected = face.normal * face.distance;
        let (u, v, w) = barycentric(&projected, &a.point, &b.point, &c.point);

        Penetration {
            normal: face.normal,
            depth: face.distance.max(0.0),
            point_a: a.a * u + b.a * v + c.a * w,
            point_b: a.b * u + b.b * v + c.b * w,
        }
    }
}

/// Edges shared by two removed faces appear once in each winding; drop both.
fn add_edge(edges: &mut Vec<[usize; 2]>, edge: [usize; 2]) {
    let reversed = [edge[1], edge[0]];
    if let Some(position) = edges.iter().position(|e| *e == reversed) {
        edges.swap_remove(position);
    } else {
        edges.push(edge);
    }
}

/// Barycentric coordinates of `p` in triangle `abc`, falling back to vertex `a`
fn barycentric(p: &Vec3, a: &Vec3, b: &Vec3, c: &Vec3) -> (f32, f32, f32) {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = p - a;
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denominator = d00 * d11 - d01 * d01;
    if denominator.abs() < DEGENERATE_FACE {
        return (1.0, 0.0, 0.0);
    }
    let v = (d11 * d20 - d01 * d21) / denominator;
    let w = (d00 * d21 - d01 * d20) / denominator;
    (1.0 - v - w, v, w)
}

/// Grow a GJK simplex that stopped early (origin on a vertex, edge or face)
/// into a tetrahedron with non-zero volume. `None` when the difference is
/// flat in every sampled direction, which means the shapes only touch.
fn complete_simplex<A: SupportMap + ?Sized, B: SupportMap + ?Sized>(
    a: &A,
    b: &B,
    simplex: &Simplex,
    tolerance: f32,
) -> Option<Vec<SupportPoint>> {
    let mut points = simplex.points().to_vec();
    let axes = [Vec3::x(), Vec3::y(), Vec3::z()];

    if points.len() == 1 {
        let origin = points[0].point;
        let extra = axes
            .iter()
            .flat_map(|axis| [*axis, -axis])
            .map(|direction| SupportPoint::compute(a, b, &direction))
            .find(|candidate| (candidate.point - origin).norm() > tolerance)?;
        points.push(extra);
    }

    if points.len() == 2 {
        let start = points[0].point;
        let line = (points[1].point - start).normalize();
        let extra = axes
            .iter()
            .map(|axis| line.cross(axis))
            .filter(|direction| direction.norm_squared() > tolerance)
            .flat_map(|direction| [direction, -direction])
            .map(|direction| SupportPoint::compute(a, b, &direction))
            .find(|candidate| {
                let offset = candidate.point - start;
                (offset - line * offset.dot(&line)).norm() > tolerance
            })?;
        points.push(extra);
    }

    if points.len() == 3 {
        let base = points[0].point;
        let normal = (points[1].point - base)
            .cross(&(points[2].point - base))
            .try_normalize(DEGENERATE_FACE)?;
        let extra = [normal, -normal]
            .iter()
            .map(|direction| SupportPoint::compute(a, b, direction))
            .map(|candidate| ((candidate.point - base).dot(&normal).abs(), candidate))
            .filter(|(height, _)| *height > tolerance)
            .max_by(|x, y| x.0.total_cmp(&y.0))
            .map(|(_, candidate)| candidate)?;
        points.push(extra);
    }

    (points.len() == 4).then_some(points)
}

/// Penetration depth and witness points for overlapping shapes
///
/// Starts from the GJK simplex, completing it to a tetrahedron first when GJK
/// stopped on a lower-dimensional feature. Returns `None` when no tetrahedron
/// can be formed (touching contact) or the polytope degenerates.
pub fn penetration<A: SupportMap + ?Sized, B: SupportMap + ?Sized>(
    a: &A,
    b: &B,
    simplex: &Simplex,
    config: &EpaConfig,
) -> Option<Penetration> {
    if simplex.is_empty() {
        return None;
    }
    let tetrahedron = complete_simplex(a, b, simplex, config.tolerance)?;
    let mut polytope = Polytope::from_tetrahedron(&tetrahedron)?;

    let mut closest = polytope.closest_face()?;
    for _ in 0..config.max_iterations {
        let support = SupportPoint::compute(a, b, &closest.normal);
        let gain = support.point.dot(&closest.normal) - closest.distance;
        if gain < config.tolerance {
            return Some(polytope.penetration(&closest));
        }

        polytope.expand(support);
        closest = polytope.closest_face()?;
    }

    log::trace!("epa: iteration cap {} reached, using closest face", config.max_iterations);
    Some(polytope.penetration(&closest))
}
