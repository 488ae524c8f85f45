//! Narrow phase: exact per-pair tests and contact generation

use serde::{Deserialize, Serialize};

use crate::foundation::math::{unit_axis, Vec3};
use crate::geometry::AABB;

use super::body::Body;
use super::epa::{self, EpaConfig};
use super::gjk::{GjkConfig, GjkResult, GjkSolver};
use super::sat;

/// Which exact test the narrow phase runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum NarrowPhaseAlgorithm {
    /// AABB overlap only; cheapest, most conservative
    Aabb,
    /// GJK per convex piece pair, EPA for contact data
    #[default]
    Gjk,
    /// Separating axis test; exact for box pairs, AABB for anything else
    Sat,
}

/// Pair-level contact, normal pointing from the first body to the second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// World-space contact point
    pub point: Vec3,
    /// Unit normal from the first body towards the second
    pub normal: Vec3,
    /// Penetration depth along `normal`
    pub depth: f32,
}

impl Contact {
    /// Same contact seen from the second body
    #[must_use]
    pub fn mirrored(&self) -> Self {
        Self {
            normal: -self.normal,
            ..*self
        }
    }
}

/// Configured narrow-phase test
#[derive(Debug, Clone, Copy, Default)]
pub struct NarrowPhase {
    algorithm: NarrowPhaseAlgorithm,
    gjk: GjkSolver,
    epa: EpaConfig,
}

impl NarrowPhase {
    /// Create a narrow phase
    pub const fn new(algorithm: NarrowPhaseAlgorithm, gjk: GjkConfig, epa: EpaConfig) -> Self {
        Self {
            algorithm,
            gjk: GjkSolver::new(gjk),
            epa,
        }
    }

    /// Active algorithm
    pub const fn algorithm(&self) -> NarrowPhaseAlgorithm {
        self.algorithm
    }

    /// Switch algorithm
    pub fn set_algorithm(&mut self, algorithm: NarrowPhaseAlgorithm) {
        self.algorithm = algorithm;
    }

    /// Whether this algorithm runs its exact test on the pair
    ///
    /// `false` means the pair degrades to the AABB check.
    pub const fn supports(&self, a: &Body, b: &Body) -> bool {
        match self.algorithm {
            NarrowPhaseAlgorithm::Sat => a.shape().is_cuboid() && b.shape().is_cuboid(),
            NarrowPhaseAlgorithm::Aabb | NarrowPhaseAlgorithm::Gjk => true,
        }
    }

    /// Test a pair whose bounds are up to date
    ///
    /// Returns the contact (normal from `a` to `b`) when they overlap.
    pub fn collide(&self, a: &Body, b: &Body) -> Option<Contact> {
        if !a.aabb().intersects(&b.aabb()) {
            return None;
        }
        match self.algorithm {
            NarrowPhaseAlgorithm::Aabb => aabb_contact(&a.aabb(), &b.aabb()),
            NarrowPhaseAlgorithm::Sat if self.supports(a, b) => sat::obb_contact(&a.obb(), &b.obb()),
            NarrowPhaseAlgorithm::Sat => aabb_contact(&a.aabb(), &b.aabb()),
            NarrowPhaseAlgorithm::Gjk => self.gjk_contact(a, b),
        }
    }

    /// Deepest contact over every overlapping (piece of `a`, piece of `b`) pair
    fn gjk_contact(&self, a: &Body, b: &Body) -> Option<Contact> {
        let pieces_b = b.hull_supports();
        let bounds_b: Vec<AABB> = pieces_b.iter().map(|piece| piece.aabb()).collect();

        let mut deepest: Option<Contact> = None;
        for piece_a in a.hull_supports() {
            let bounds_a = piece_a.aabb();
            for (piece_b, bounds) in pieces_b.iter().zip(&bounds_b) {
                if !bounds_a.intersects(bounds) {
                    continue;
                }
                let GjkResult::Intersecting(simplex) = self.gjk.evaluate(&piece_a, piece_b) else {
                    continue;
                };
                let contact = epa::penetration(&piece_a, piece_b, &simplex, &self.epa)
                    .map_or_else(
                        || fallback_contact(a, b),
                        |penetration| Contact {
                            point: penetration.contact_point(),
                            normal: penetration.normal,
                            depth: penetration.depth,
                        },
                    );
                if deepest.map_or(true, |best| contact.depth > best.depth) {
                    deepest = Some(contact);
                }
            }
        }
        deepest
    }
}

/// Contact for overlapping boxes along their axis of least overlap
pub fn aabb_contact(a: &AABB, b: &AABB) -> Option<Contact> {
    if !a.intersects(b) {
        return None;
    }
    let overlap = a.intersection(b);
    let size = overlap.size();
    let axis = (0..3)
        .min_by(|&i, &j| size[i].total_cmp(&size[j]))
        .unwrap_or(0);
    let sign = if b.center()[axis] >= a.center()[axis] { 1.0 } else { -1.0 };

    Some(Contact {
        point: overlap.center(),
        normal: unit_axis(axis) * sign,
        depth: size[axis],
    })
}

/// Approximate contact used when EPA has nothing to work with
///
/// Point halfway between the bodies, normal along the center line and depth
/// from the AABB overlap on that normal's dominant axis.
fn fallback_contact(a: &Body, b: &Body) -> Contact {
    let offset = b.position() - a.position();
    let normal = offset.try_normalize(f32::EPSILON).unwrap_or_else(Vec3::x);
    let dominant = normal.iamax();
    let overlap = a.aabb().intersection(&b.aabb()).size()[dominant].max(0.0);

    Contact {
        point: (a.position() + b.position()) * 0.5,
        normal,
        depth: overlap,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Transform};
    use crate::physics::shape::{CollisionShape, ConvexHull};
    use approx::assert_relative_eq;

    fn cube(name: &str, position: Vec3) -> Body {
        Body::new(name, CollisionShape::default()).with_position(position)
    }

    fn narrow(algorithm: NarrowPhaseAlgorithm) -> NarrowPhase {
        NarrowPhase::new(algorithm, GjkConfig::default(), EpaConfig::default())
    }

    #[test]
    fn test_all_algorithms_agree_on_axis_aligned_cubes() {
        let a = cube("a", Vec3::zeros());
        let near = cube("near", Vec3::new(0.9, 0.2, 0.0));
        let far = cube("far", Vec3::new(3.0, 0.0, 0.0));

        for algorithm in [NarrowPhaseAlgorithm::Aabb, NarrowPhaseAlgorithm::Gjk, NarrowPhaseAlgorithm::Sat] {
            let phase = narrow(algorithm);
            let contact = phase.collide(&a, &near).expect("overlapping cubes");
            assert_relative_eq!(contact.normal, Vec3::x(), epsilon = 1e-3);
            assert_relative_eq!(contact.depth, 0.1, epsilon = 1e-3);
            assert!(phase.collide(&a, &far).is_none(), "{algorithm:?} reported a distant pair");
        }
    }

    #[test]
    fn test_gjk_rejects_rotated_box_that_aabbs_accept() {
        // The rotated cube's AABB reaches x = 1.5 - 0.707 but its faces do not
        let a = cube("a", Vec3::zeros());
        let diamond = Body::new("diamond", CollisionShape::default()).with_transform(
            Transform::from_position_rotation(
                Vec3::new(1.12, 0.0, 0.0),
                Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4),
            ),
        );
        // Corner of the diamond is at 1.12 - 0.707 = 0.413 < 0.5: overlap
        assert!(narrow(NarrowPhaseAlgorithm::Gjk).collide(&a, &diamond).is_some());

        let offset = Body::new("offset", CollisionShape::default()).with_transform(
            Transform::from_position_rotation(
                Vec3::new(1.1, 1.1, 0.0),
                Quat::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4),
            ),
        );
        assert!(a.aabb().intersects(&offset.aabb()));
        assert!(narrow(NarrowPhaseAlgorithm::Gjk).collide(&a, &offset).is_none());
        assert!(narrow(NarrowPhaseAlgorithm::Sat).collide(&a, &offset).is_none());
        assert!(narrow(NarrowPhaseAlgorithm::Aabb).collide(&a, &offset).is_some());
    }

    #[test]
    fn test_sat_degrades_to_aabb_for_hulls() {
        let phase = narrow(NarrowPhaseAlgorithm::Sat);
        let hull = Body::new("hull", CollisionShape::Hull(ConvexHull::cuboid(Vec3::repeat(0.5))));
        let cube = cube("cube", Vec3::new(0.5, 0.0, 0.0));

        assert!(!phase.supports(&hull, &cube));
        let contact = phase.collide(&hull, &cube).expect("aabb overlap");
        assert_relative_eq!(contact.depth, 0.5);
    }

    #[test]
    fn test_decomposed_body_matches_union_of_pieces() {
        let left = ConvexHull::cuboid(Vec3::repeat(0.5));
        let right = ConvexHull::from_vertices(
            ConvexHull::cuboid(Vec3::repeat(0.5))
                .vertices()
                .iter()
                .map(|v| v + Vec3::new(3.0, 0.0, 0.0))
                .collect(),
        );
        let decomposed = Body::new("dumbbell", CollisionShape::Decomposed(vec![left.clone(), right.clone()]));
        let left_only = Body::new("left", CollisionShape::Hull(left));
        let right_only = Body::new("right", CollisionShape::Hull(right));
        let phase = narrow(NarrowPhaseAlgorithm::Gjk);

        // Sample positions: inside the gap, touching each piece, far away
        for x in [-1.2, -0.6, 0.3, 1.5, 2.2, 2.8, 4.0, 5.0] {
            let sample = cube("sample", Vec3::new(x, 0.2, 0.0));
            let expected = phase.collide(&left_only, &sample).is_some()
                || phase.collide(&right_only, &sample).is_some();
            assert_eq!(phase.collide(&decomposed, &sample).is_some(), expected, "sample at x = {x}");
        }
        // The bridging AABB covers the gap but no piece does
        assert!(phase.collide(&decomposed, &cube("gap", Vec3::new(1.5, 0.0, 0.0))).is_none());
    }

    #[test]
    fn test_empty_hull_never_collides() {
        let empty = Body::new("empty", CollisionShape::Hull(ConvexHull::default()));
        let cube = cube("cube", Vec3::zeros());
        for algorithm in [NarrowPhaseAlgorithm::Aabb, NarrowPhaseAlgorithm::Gjk, NarrowPhaseAlgorithm::Sat] {
            assert!(narrow(algorithm).collide(&empty, &cube).is_none());
        }
    }

    #[test]
    fn test_contact_mirroring() {
        let contact = Contact { point: Vec3::new(1.0, 2.0, 3.0), normal: Vec3::y(), depth: 0.5 };
        let mirrored = contact.mirrored();
        assert_eq!(mirrored.normal, -Vec3::y());
        assert_eq!(mirrored.point, contact.point);
        assert_eq!(mirrored.depth, contact.depth);
    }
}
