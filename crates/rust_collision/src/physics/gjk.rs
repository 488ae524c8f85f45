//! Gilbert-Johnson-Keerthi intersection test
//!
//! Works on the Minkowski difference `A - B` through the combined support
//! function `s(d) = support_a(d) - support_b(-d)`. The shapes overlap iff
//! the origin lies inside that set, and the solver evolves a simplex of at
//! most four points towards the origin to decide it.
//!
//! Termination is bounded three ways: an iteration cap, detection of repeated
//! support points, and explicit handling of degenerate search directions.
//! When the origin lies on the current simplex feature (the shapes only
//! touch) the solver reports an intersection. Every tolerance is measured
//! against the extent of the difference, so scaling both shapes by the same
//! factor never changes the answer.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::foundation::math::Vec3;
use crate::geometry::OBB;

/// Anything with a convex support function
pub trait SupportMap {
    /// World-space point of the shape furthest along `direction`
    fn support(&self, direction: &Vec3) -> Vec3;

    /// A point inside the shape, used to seed the search direction
    fn reference_point(&self) -> Vec3;

    /// Shapes without vertices never intersect anything
    fn is_empty(&self) -> bool {
        false
    }
}

impl SupportMap for OBB {
    fn support(&self, direction: &Vec3) -> Vec3 {
        OBB::support(self, direction)
    }

    fn reference_point(&self) -> Vec3 {
        self.center
    }
}

/// # GJK Configuration
///
/// Iteration cap and tolerance for the simplex search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GjkConfig {
    /// Maximum number of support evaluations after the first
    pub max_iterations: u32,
    /// Tolerance relative to the size of the Minkowski difference, used for
    /// separation, duplicates and degenerate directions
    pub epsilon: f32,
}

impl Default for GjkConfig {
    fn default() -> Self {
        Self {
            max_iterations: 64,
            epsilon: 1e-6,
        }
    }
}

impl GjkConfig {
    /// Set the iteration cap
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: u32) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the tolerance
    #[must_use]
    pub const fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::Validation("gjk.max_iterations must be at least 1".into()));
        }
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(ConfigError::Validation(format!(
                "gjk.epsilon must be positive, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

/// A Minkowski-difference point and the two shape points that produced it
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SupportPoint {
    /// `a - b`
    pub point: Vec3,
    /// Support point on shape A
    pub a: Vec3,
    /// Support point on shape B
    pub b: Vec3,
}

impl SupportPoint {
    /// Evaluate the combined support function of `a - b` along `direction`
    pub fn compute<A: SupportMap + ?Sized, B: SupportMap + ?Sized>(
        a: &A,
        b: &B,
        direction: &Vec3,
    ) -> Self {
        let on_a = a.support(direction);
        let on_b = b.support(&-direction);
        Self {
            point: on_a - on_b,
            a: on_a,
            b: on_b,
        }
    }
}

/// Fixed-capacity simplex, oldest point first
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    points: [SupportPoint; 4],
    len: usize,
}

impl Simplex {
    /// Empty simplex
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of points (0 to 4)
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no points
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current points, oldest first
    pub fn points(&self) -> &[SupportPoint] {
        &self.points[..self.len]
    }

    fn push(&mut self, point: SupportPoint) {
        debug_assert!(self.len < 4, "simplex reduced before push");
        if self.len < 4 {
            self.points[self.len] = point;
            self.len += 1;
        }
    }

    fn assign(&mut self, points: &[SupportPoint]) {
        self.len = points.len().min(4);
        self.points[..self.len].copy_from_slice(&points[..self.len]);
    }

    fn contains_point(&self, point: &Vec3, tolerance: f32) -> bool {
        self.points()
            .iter()
            .any(|existing| (existing.point - point).norm_squared() <= tolerance * tolerance)
    }

    fn min_distance_to_origin(&self) -> f32 {
        self.points()
            .iter()
            .map(|p| p.point.norm())
            .fold(f32::INFINITY, f32::min)
    }
}

/// Outcome of a GJK query
#[derive(Debug, Clone, Copy)]
pub enum GjkResult {
    /// The shapes are disjoint
    Separated,
    /// The shapes overlap or touch; the final simplex is kept for EPA
    Intersecting(Simplex),
}

impl GjkResult {
    /// Whether the shapes overlap or touch
    pub const fn is_intersecting(&self) -> bool {
        matches!(self, Self::Intersecting(_))
    }
}

/// GJK solver
#[derive(Debug, Clone, Copy, Default)]
pub struct GjkSolver {
    config: GjkConfig,
}

impl GjkSolver {
    /// Create a solver
    pub const fn new(config: GjkConfig) -> Self {
        Self { config }
    }

    /// Active configuration
    pub const fn config(&self) -> &GjkConfig {
        &self.config
    }

    /// Boolean overlap test
    pub fn intersect<A: SupportMap + ?Sized, B: SupportMap + ?Sized>(&self, a: &A, b: &B) -> bool {
        self.evaluate(a, b).is_intersecting()
    }

    /// Overlap test that keeps the terminating simplex
    pub fn evaluate<A: SupportMap + ?Sized, B: SupportMap + ?Sized>(&self, a: &A, b: &B) -> GjkResult {
        if a.is_empty() || b.is_empty() {
            return GjkResult::Separated;
        }

        let mut direction = a.reference_point() - b.reference_point();
        if direction.norm_squared() <= self.config.epsilon * self.config.epsilon {
            direction = Vec3::x();
        }

        let mut simplex = Simplex::new();
        let first = SupportPoint::compute(a, b, &direction);
        simplex.push(first);

        // Length tolerance proportional to the extent of the Minkowski
        // difference, so the outcome does not depend on the scale of the scene
        let opposite = SupportPoint::compute(a, b, &-direction);
        let tolerance = self.config.epsilon * first.point.norm().max(opposite.point.norm());

        direction = -first.point;
        if direction.norm() <= tolerance {
            // The first support point is the origin itself
            return GjkResult::Intersecting(simplex);
        }

        for _ in 0..self.config.max_iterations {
            let next = SupportPoint::compute(a, b, &direction);

            // No progress possible once the search returns a point it already has
            if simplex.contains_point(&next.point, tolerance) {
                log::trace!("gjk: repeated support point, using closest-point fallback");
                return closest_point_fallback(simplex, tolerance);
            }

            if next.point.dot(&direction) <= tolerance * direction.norm() {
                return GjkResult::Separated;
            }

            simplex.push(next);
            if reduce(&mut simplex, &mut direction, tolerance, self.config.epsilon) {
                return GjkResult::Intersecting(simplex);
            }
        }

        log::trace!("gjk: iteration cap {} reached", self.config.max_iterations);
        closest_point_fallback(simplex, tolerance)
    }
}

fn closest_point_fallback(simplex: Simplex, tolerance: f32) -> GjkResult {
    if simplex.min_distance_to_origin() <= tolerance {
        GjkResult::Intersecting(simplex)
    } else {
        GjkResult::Separated
    }
}

/// Whether `edge × origin × edge` is too short to be a search direction,
/// i.e. the origin lies within `tolerance` of the line through `edge`
fn on_line(towards_origin: &Vec3, edge: &Vec3, tolerance: f32) -> bool {
    let edge_sq = edge.norm_squared();
    towards_origin.norm_squared() <= tolerance * tolerance * edge_sq * edge_sq
}

/// Keep the feature closest to the origin and aim `direction` at it.
/// Returns `true` once the origin is enclosed (or lies on the feature).
///
/// `tolerance` is a length; `epsilon` is the relative tolerance used for the
/// collinearity test, which compares lengths with lengths.
fn reduce(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32, epsilon: f32) -> bool {
    match simplex.len() {
        2 => reduce_line(simplex, direction, tolerance),
        3 => reduce_triangle(simplex, direction, tolerance, epsilon),
        4 => reduce_tetrahedron(simplex, direction, tolerance, epsilon),
        _ => false,
    }
}

fn reduce_line(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32) -> bool {
    let [b, a] = [simplex.points[0], simplex.points[1]];
    let ab = b.point - a.point;
    let ao = -a.point;

    if ab.dot(&ao) > 0.0 {
        let towards_origin = ab.cross(&ao).cross(&ab);
        if on_line(&towards_origin, &ab, tolerance) {
            // Origin on the segment
            return true;
        }
        *direction = towards_origin;
    } else {
        simplex.assign(&[a]);
        if ao.norm() <= tolerance {
            return true;
        }
        *direction = ao;
    }
    false
}

fn reduce_triangle(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32, epsilon: f32) -> bool {
    let [c, b, a] = [simplex.points[0], simplex.points[1], simplex.points[2]];
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ao = -a.point;
    let abc = ab.cross(&ac);

    if abc.norm_squared() <= epsilon * epsilon * ab.norm_squared() * ac.norm_squared() {
        // Collinear points, drop the oldest
        simplex.assign(&[b, a]);
        return reduce_line(simplex, direction, tolerance);
    }

    if abc.cross(&ac).dot(&ao) > 0.0 {
        if ac.dot(&ao) > 0.0 {
            simplex.assign(&[c, a]);
            let towards_origin = ac.cross(&ao).cross(&ac);
            if on_line(&towards_origin, &ac, tolerance) {
                return true;
            }
            *direction = towards_origin;
            return false;
        }
        simplex.assign(&[b, a]);
        return reduce_line(simplex, direction, tolerance);
    }

    if ab.cross(&abc).dot(&ao) > 0.0 {
        simplex.assign(&[b, a]);
        return reduce_line(simplex, direction, tolerance);
    }

    let side = abc.dot(&ao);
    if side.abs() <= tolerance * abc.norm() {
        // Origin inside the triangle itself
        return true;
    }
    if side > 0.0 {
        *direction = abc;
    } else {
        simplex.assign(&[b, c, a]);
        *direction = -abc;
    }
    false
}

fn reduce_tetrahedron(simplex: &mut Simplex, direction: &mut Vec3, tolerance: f32, epsilon: f32) -> bool {
    let [d, c, b, a] = simplex.points;
    let ab = b.point - a.point;
    let ac = c.point - a.point;
    let ad = d.point - a.point;
    let ao = -a.point;

    let abc = ab.cross(&ac);
    let acd = ac.cross(&ad);
    let adb = ad.cross(&ab);

    if abc.dot(&ao) > 0.0 {
        simplex.assign(&[c, b, a]);
        return reduce_triangle(simplex, direction, tolerance, epsilon);
    }
    if acd.dot(&ao) > 0.0 {
        simplex.assign(&[d, c, a]);
        return reduce_triangle(simplex, direction, tolerance, epsilon);
    }
    if adb.dot(&ao) > 0.0 {
        simplex.assign(&[b, d, a]);
        return reduce_triangle(simplex, direction, tolerance, epsilon);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Mat3, Quat};
    use crate::physics::sat;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::cell::Cell;

    fn cube_at(center: Vec3) -> OBB {
        OBB::new(center, Vec3::repeat(0.5), Mat3::identity())
    }

    fn rotated_box(center: Vec3, half: Vec3, axis: Vec3, angle: f32) -> OBB {
        let rotation = Quat::from_axis_angle(&nalgebra::Unit::new_normalize(axis), angle);
        OBB::new(center, half, rotation.to_rotation_matrix().into_inner())
    }

    /// Point cloud support map used to exercise degenerate inputs
    struct Points(Vec<Vec3>);

    impl SupportMap for Points {
        fn support(&self, direction: &Vec3) -> Vec3 {
            self.0
                .iter()
                .copied()
                .fold((f32::NEG_INFINITY, Vec3::zeros()), |(best, point), v| {
                    let d = v.dot(direction);
                    if d > best { (d, v) } else { (best, point) }
                })
                .1
        }

        fn reference_point(&self) -> Vec3 {
            self.0.iter().sum::<Vec3>() / self.0.len().max(1) as f32
        }

        fn is_empty(&self) -> bool {
            self.0.is_empty()
        }
    }

    #[test]
    fn test_coincident_cubes_intersect() {
        let solver = GjkSolver::default();
        assert!(solver.intersect(&cube_at(Vec3::zeros()), &cube_at(Vec3::zeros())));
    }

    #[test]
    fn test_distant_cubes_do_not_intersect() {
        let solver = GjkSolver::default();
        assert!(!solver.intersect(&cube_at(Vec3::zeros()), &cube_at(Vec3::new(10.0, 0.0, 0.0))));
    }

    #[test]
    fn test_nearly_touching_cubes_intersect() {
        let solver = GjkSolver::default();
        assert!(solver.intersect(&cube_at(Vec3::zeros()), &cube_at(Vec3::new(0.99, 0.0, 0.0))));
        assert!(!solver.intersect(&cube_at(Vec3::zeros()), &cube_at(Vec3::new(1.05, 0.0, 0.0))));
    }

    #[test]
    fn test_diagonal_offsets() {
        let solver = GjkSolver::default();
        let origin = cube_at(Vec3::zeros());
        assert!(solver.intersect(&origin, &cube_at(Vec3::new(0.6, 0.7, -0.4))));
        assert!(!solver.intersect(&origin, &cube_at(Vec3::new(0.6, 1.2, -0.4))));
    }

    #[test]
    fn test_rotated_box_corner_overlap() {
        let solver = GjkSolver::default();
        let axis_aligned = cube_at(Vec3::zeros());
        // 45 degrees about z puts a corner at distance sqrt(2)/2 along x
        let diamond = rotated_box(
            Vec3::new(1.15, 0.0, 0.0),
            Vec3::repeat(0.5),
            Vec3::z(),
            std::f32::consts::FRAC_PI_4,
        );
        assert!(solver.intersect(&axis_aligned, &diamond));

        let further = rotated_box(
            Vec3::new(1.25, 0.0, 0.0),
            Vec3::repeat(0.5),
            Vec3::z(),
            std::f32::consts::FRAC_PI_4,
        );
        assert!(!solver.intersect(&axis_aligned, &further));
    }

    #[test]
    fn test_symmetry_over_grid_of_offsets() {
        let solver = GjkSolver::default();
        let a = rotated_box(Vec3::zeros(), Vec3::new(0.8, 0.3, 0.5), Vec3::new(1.0, 1.0, 0.0), 0.4);
        for i in -6..=6 {
            for j in -6..=6 {
                let center = Vec3::new(i as f32 * 0.27, j as f32 * 0.23, 0.1);
                let b = rotated_box(center, Vec3::new(0.4, 0.6, 0.2), Vec3::new(0.0, 1.0, 1.0), 0.9);
                assert_eq!(
                    solver.intersect(&a, &b),
                    solver.intersect(&b, &a),
                    "asymmetric result at offset {center:?}"
                );
            }
        }
    }

    #[test]
    fn test_empty_shape_never_intersects() {
        let solver = GjkSolver::default();
        let empty = Points(Vec::new());
        assert!(!solver.intersect(&empty, &cube_at(Vec3::zeros())));
        assert!(!solver.intersect(&cube_at(Vec3::zeros()), &empty));
    }

    #[test]
    fn test_point_inside_and_outside_box() {
        let solver = GjkSolver::default();
        let cube = cube_at(Vec3::zeros());
        assert!(solver.intersect(&Points(vec![Vec3::new(0.1, 0.2, -0.3)]), &cube));
        assert!(!solver.intersect(&Points(vec![Vec3::new(0.1, 2.0, -0.3)]), &cube));
    }

    #[test]
    fn test_flat_shapes_terminate() {
        // Two coplanar triangles: the difference is flat, so the simplex can
        // never become a proper tetrahedron.
        let solver = GjkSolver::new(GjkConfig::default().with_max_iterations(32));
        let a = Points(vec![
            Vec3::new(0.0, 0.0, 0.0),
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
        ]);
        let overlapping = Points(vec![
            Vec3::new(0.2, 0.2, 0.0),
            Vec3::new(1.2, 0.2, 0.0),
            Vec3::new(0.2, 1.2, 0.0),
        ]);
        let apart = Points(vec![
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(4.0, 0.0, 0.0),
            Vec3::new(3.0, 1.0, 0.0),
        ]);
        assert!(solver.intersect(&a, &overlapping));
        assert!(!solver.intersect(&a, &apart));
    }

    #[test]
    fn test_intersecting_result_keeps_simplex() {
        let solver = GjkSolver::default();
        match solver.evaluate(&cube_at(Vec3::zeros()), &cube_at(Vec3::new(0.3, 0.2, 0.1))) {
            GjkResult::Intersecting(simplex) => {
                assert!(!simplex.is_empty());
                assert!(simplex.len() <= 4);
            }
            GjkResult::Separated => panic!("overlapping cubes reported separated"),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(GjkConfig::default().validate().is_ok());
        assert!(GjkConfig::default().with_max_iterations(0).validate().is_err());
        assert!(GjkConfig::default().with_epsilon(-1.0).validate().is_err());
    }

    /// Returns its points in order regardless of direction, repeating the last one
    struct Scripted {
        points: Vec<Vec3>,
        calls: Cell<usize>,
    }

    impl SupportMap for Scripted {
        fn support(&self, _direction: &Vec3) -> Vec3 {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.points[call.min(self.points.len() - 1)]
        }

        fn reference_point(&self) -> Vec3 {
            self.points[0]
        }
    }

    fn random_box(rng: &mut StdRng, scale: f32) -> OBB {
        let center = Vec3::new(
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
            rng.gen_range(-2.0..2.0),
        ) * scale;
        let half = Vec3::new(
            rng.gen_range(0.2..1.2),
            rng.gen_range(0.2..1.2),
            rng.gen_range(0.2..1.2),
        ) * scale;
        let rotation = Quat::from_euler_angles(
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
            rng.gen_range(-3.0..3.0),
        );
        OBB::new(center, half, rotation.to_rotation_matrix().into_inner())
    }

    fn grown(obb: &OBB, factor: f32) -> OBB {
        OBB::new(obb.center, obb.half_extents * factor, obb.orientation)
    }

    #[test]
    fn test_millimetre_boxes_with_a_gap_are_separated() {
        let solver = GjkSolver::default();
        let tilted = rotated_box(Vec3::zeros(), Vec3::repeat(0.004), Vec3::new(1.0, 1.0, 1.0), 0.7);
        let small = OBB::new(Vec3::new(0.009, 0.0045, 0.0), Vec3::repeat(0.002), Mat3::identity());

        // The tilted box fits in a sphere of radius 0.0069 and the small box
        // starts 0.0074 from the origin
        assert!(!sat::test_obb_collision(&tilted, &small));
        assert!(!solver.intersect(&tilted, &small));
        assert!(!solver.intersect(&small, &tilted));
    }

    #[test]
    fn test_result_does_not_depend_on_scale() {
        let solver = GjkSolver::default();
        let mut rng = StdRng::seed_from_u64(0x91c);

        for scale in [0.01, 1.0, 100.0] {
            let mut checked = 0;
            for _ in 0..400 {
                let a = random_box(&mut rng, scale);
                let b = random_box(&mut rng, scale);
                // Skip pairs within a couple of percent of touching
                let loose = sat::test_obb_collision(&grown(&a, 1.02), &grown(&b, 1.02));
                let tight = sat::test_obb_collision(&grown(&a, 0.98), &grown(&b, 0.98));
                if loose != tight {
                    continue;
                }
                checked += 1;
                assert_eq!(solver.intersect(&a, &b), tight, "scale {scale}: {a:?} vs {b:?}");
                assert_eq!(solver.intersect(&b, &a), tight, "scale {scale}: {b:?} vs {a:?}");
            }
            assert!(checked > 200, "scale {scale}: only {checked} pairs checked");
        }
    }

    #[test]
    fn test_iteration_cap_falls_back_to_closest_point() {
        let overlapping = (cube_at(Vec3::zeros()), cube_at(Vec3::new(0.3, 0.2, 0.1)));
        assert!(GjkSolver::default().intersect(&overlapping.0, &overlapping.1));

        // One step leaves a segment whose vertices are far from the origin
        let capped = GjkSolver::new(GjkConfig::default().with_max_iterations(1));
        assert!(!capped.intersect(&overlapping.0, &overlapping.1));
        assert!(!capped.intersect(&cube_at(Vec3::zeros()), &cube_at(Vec3::new(10.0, 0.0, 0.0))));
    }

    #[test]
    fn test_repeated_support_point_stops_search() {
        let solver = GjkSolver::default();
        let stalled = Scripted {
            points: vec![
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            calls: Cell::new(0),
        };
        let origin = Points(vec![Vec3::zeros()]);

        // Seed, opposite extent, one new point, then the repeat
        assert!(!solver.intersect(&stalled, &origin));
        assert_eq!(stalled.calls.get(), 4);
    }
}
