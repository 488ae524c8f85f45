//! Every strategy and algorithm combination agrees with a brute-force reference

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::random_body;
use crate::core::config::CollisionConfig;
use crate::foundation::math::Vec3;
use crate::physics::{CollisionManager, CollisionPair, NarrowPhaseAlgorithm};
use crate::spatial::{BroadPhase, BroadPhaseKind, BruteForce};

const STRATEGIES: [BroadPhaseKind; 5] = [
    BroadPhaseKind::BruteForce,
    BroadPhaseKind::Bvh,
    BroadPhaseKind::Octree,
    BroadPhaseKind::UniformGrid,
    BroadPhaseKind::SweepAndPrune,
];

const ALGORITHMS: [NarrowPhaseAlgorithm; 3] = [
    NarrowPhaseAlgorithm::Aabb,
    NarrowPhaseAlgorithm::Gjk,
    NarrowPhaseAlgorithm::Sat,
];

fn populated(config: CollisionConfig, seed: u64, count: usize) -> CollisionManager {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut manager = CollisionManager::with_config(config);
    for i in 0..count {
        manager.register_body(random_body(&mut rng, i));
    }
    manager
}

fn reference_pairs(manager: &CollisionManager) -> Vec<CollisionPair> {
    let mut brute = BruteForce::new();
    for (handle, body) in manager.bodies() {
        brute.insert(handle, body.aabb());
    }
    brute.query_pairs()
}

#[test]
fn test_narrow_phase_pairs_are_broad_phase_pairs() {
    for seed in 0..4 {
        for kind in STRATEGIES {
            for algorithm in ALGORITHMS {
                let config = CollisionConfig::default()
                    .with_broad_phase(kind)
                    .with_narrow_phase(algorithm);
                let mut manager = populated(config, seed, 50);
                manager.update();

                let broad = reference_pairs(&manager);
                assert_eq!(manager.potential_pair_count(), broad.len(), "{kind:?} seed {seed}");
                for pair in manager.colliding_pairs() {
                    assert!(broad.contains(&pair), "{kind:?}/{algorithm:?} invented {pair:?}");
                }
            }
        }
    }
}

#[test]
fn test_strategies_agree_frame_by_frame() {
    let mut managers: Vec<CollisionManager> = STRATEGIES
        .iter()
        .map(|kind| populated(CollisionConfig::default().with_broad_phase(*kind), 11, 40))
        .collect();
    let mut rng = StdRng::seed_from_u64(12);

    for _ in 0..5 {
        let moves: Vec<(usize, Vec3)> = (0..40)
            .step_by(4)
            .map(|i| {
                let delta = Vec3::new(
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                    rng.gen_range(-1.0..1.0),
                );
                (i, delta)
            })
            .collect();

        for manager in &mut managers {
            let handles: Vec<_> = manager.bodies().map(|(handle, _)| handle).collect();
            for (i, delta) in &moves {
                if let Some(body) = manager.body_mut(handles[*i]) {
                    body.translate(*delta);
                }
            }
            manager.update();
        }

        let expected = managers[0].colliding_pairs();
        for manager in &managers[1..] {
            assert_eq!(manager.colliding_pairs(), expected, "{:?}", manager.broad_phase_strategy());
        }
    }
}

#[test]
fn test_exact_algorithms_refine_aabb_results() {
    let aabb = {
        let mut manager = populated(
            CollisionConfig::default().with_narrow_phase(NarrowPhaseAlgorithm::Aabb),
            21,
            60,
        );
        manager.update();
        manager.colliding_pairs()
    };
    let mut gjk = populated(CollisionConfig::default(), 21, 60);
    gjk.update();

    assert_eq!(aabb, reference_pairs(&gjk));
    for pair in gjk.colliding_pairs() {
        assert!(aabb.contains(&pair));
    }
    assert!(gjk.collision_count() <= aabb.len());
}
