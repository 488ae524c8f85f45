//! Pipeline-level scenarios for the collision manager

mod conservativeness;

use rand::rngs::StdRng;
use rand::Rng;

use crate::foundation::math::{Quat, Transform, Vec3};
use crate::physics::{Body, CollisionShape, ConvexHull};

/// Axis-aligned unit cube at `position`
pub(super) fn cube(name: &str, position: Vec3) -> Body {
    Body::new(name, CollisionShape::default()).with_position(position)
}

/// Random box, hull or two-piece body somewhere in a 12-unit cube
pub(super) fn random_body(rng: &mut StdRng, index: usize) -> Body {
    let position = Vec3::new(
        rng.gen_range(-6.0..6.0),
        rng.gen_range(-6.0..6.0),
        rng.gen_range(-6.0..6.0),
    );
    let rotation = Quat::from_euler_angles(
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
        rng.gen_range(-3.0..3.0),
    );
    let half = Vec3::new(
        rng.gen_range(0.2..1.2),
        rng.gen_range(0.2..1.2),
        rng.gen_range(0.2..1.2),
    );

    let shape = match index % 3 {
        0 => CollisionShape::cuboid(half),
        1 => {
            // Random tetrahedron-ish hull
            let vertices = (0..6)
                .map(|_| {
                    Vec3::new(
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                        rng.gen_range(-1.0..1.0),
                    )
                })
                .collect();
            CollisionShape::Hull(ConvexHull::from_vertices(vertices))
        }
        _ => {
            let offset = Vec3::new(half.x * 1.5, 0.0, 0.0);
            let piece = |center: Vec3| {
                ConvexHull::from_vertices(
                    ConvexHull::cuboid(half * 0.5)
                        .vertices()
                        .iter()
                        .map(|v| v + center)
                        .collect(),
                )
            };
            CollisionShape::Decomposed(vec![piece(offset), piece(-offset)])
        }
    };

    Body::new(format!("body{index}"), shape)
        .with_transform(Transform::from_position_rotation(position, rotation))
}
