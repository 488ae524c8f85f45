//! Collision manager: the per-frame detection pipeline
//!
//! Detection runs in two phases. The broad phase asks the active
//! [`SpatialIndex`] for every pair of bodies whose AABBs overlap; the narrow
//! phase runs the configured exact test on the pairs that survive layer
//! filtering. The result is diffed against the previous detection pass and
//! turned into enter / stay / exit events.
//!
//! Bodies are owned by the manager and addressed by [`BodyHandle`]. Moving a
//! body through [`CollisionManager::body_mut`] marks it dirty; its bounds are
//! recomputed and pushed into the index at the start of the next detection
//! pass.

use std::collections::HashMap;
use std::time::Duration;

use rayon::prelude::*;
use slotmap::SlotMap;

use crate::config::ConfigError;
use crate::core::config::CollisionConfig;
use crate::events::{
    CollisionEvent, CollisionEventHandler, CollisionEventKind, CollisionInfo, EventQueue,
};
use crate::foundation::time::Stopwatch;
use crate::spatial::{BroadPhase, BroadPhaseKind, SpatialIndex};

use super::body::Body;
use super::collision_layers::CollisionLayers;
use super::narrow_phase::{Contact, NarrowPhase, NarrowPhaseAlgorithm};
use super::pair::{BodyHandle, CollisionPair};

/// Diagnostics for the most recent `update` call
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameStats {
    /// Update counter value for this call (first call is 1)
    pub frame: u64,
    /// Whether detection ran or the call was skipped by the check interval
    pub detection_ran: bool,
    /// Registered bodies
    pub body_count: usize,
    /// Bodies whose bounds were recomputed
    pub refreshed_bodies: usize,
    /// Pairs reported by the broad phase
    pub potential_pairs: usize,
    /// Broad-phase pairs dropped by layer filtering
    pub filtered_pairs: usize,
    /// Pairs the narrow phase confirmed
    pub collisions: usize,
    /// New pairs this pass
    pub enters: usize,
    /// Pairs continuing from the previous pass
    pub stays: usize,
    /// Pairs that ended this pass
    pub exits: usize,
    /// Time spent refreshing bounds and querying the spatial index
    pub broad_phase_time: Duration,
    /// Time spent in the exact tests
    pub narrow_phase_time: Duration,
}

/// Orchestrates broad phase, narrow phase and event generation
#[derive(Debug)]
pub struct CollisionManager {
    config: CollisionConfig,
    bodies: SlotMap<BodyHandle, Body>,
    index: SpatialIndex,
    narrow_phase: NarrowPhase,
    active: HashMap<CollisionPair, Contact>,
    events: EventQueue,
    stats: FrameStats,
    frame: u64,
}

impl Default for CollisionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CollisionManager {
    /// Create a manager with the default configuration (BVH + GJK)
    pub fn new() -> Self {
        Self::with_config(CollisionConfig::default())
    }

    /// Create a manager from an unvalidated configuration
    ///
    /// A zero check interval is treated as 1.
    pub fn with_config(mut config: CollisionConfig) -> Self {
        config.check_interval = config.check_interval.max(1);
        let index = SpatialIndex::from_config(&config.broad_phase);
        let narrow_phase = NarrowPhase::new(config.narrow_phase, config.gjk, config.epa);
        log::debug!(
            "collision manager: {:?} broad phase, {:?} narrow phase",
            config.broad_phase.kind,
            config.narrow_phase
        );
        Self {
            config,
            bodies: SlotMap::with_key(),
            index,
            narrow_phase,
            active: HashMap::new(),
            events: EventQueue::new(),
            stats: FrameStats::default(),
            frame: 0,
        }
    }

    /// Create a manager after validating `config`
    pub fn from_config(config: CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// Add a body and return its handle
    pub fn register_body(&mut self, mut body: Body) -> BodyHandle {
        if self.narrow_phase.algorithm() == NarrowPhaseAlgorithm::Sat && !body.shape().is_cuboid() {
            log::warn!(
                "SAT narrow phase only handles boxes; '{}' falls back to AABB tests",
                body.name()
            );
        }
        body.update_bounds();
        let aabb = body.aabb();
        let handle = self.bodies.insert(body);
        self.index.insert(handle, aabb);
        log::trace!("registered body {:?}", handle);
        handle
    }

    /// Remove a body
    ///
    /// Every pair the body was colliding in ends immediately: exit events are
    /// queued for both participants and the pair leaves the state table.
    pub fn unregister_body(&mut self, handle: BodyHandle) -> Option<Body> {
        let body = self.bodies.remove(handle)?;
        self.index.remove(handle);

        let mut ended: Vec<(CollisionPair, Contact)> = self
            .active
            .iter()
            .filter(|(pair, _)| pair.contains(handle))
            .map(|(pair, contact)| (*pair, *contact))
            .collect();
        ended.sort_unstable_by_key(|(pair, _)| *pair);
        for (pair, contact) in ended {
            self.active.remove(&pair);
            queue_pair_events(&mut self.events, CollisionEventKind::Exit, pair, &contact);
        }

        log::trace!("unregistered body {:?} ('{}')", handle, body.name());
        Some(body)
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Option<&Body> {
        self.bodies.get(handle)
    }

    /// Look up a body for modification
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut Body> {
        self.bodies.get_mut(handle)
    }

    /// Every registered body
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    /// Number of registered bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Remove every body and forget all collision state
    ///
    /// Queued events are dropped; no exit events are generated.
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
        self.active.clear();
        self.events.clear();
        self.stats = FrameStats::default();
    }

    /// Active broad-phase strategy
    pub const fn broad_phase_strategy(&self) -> BroadPhaseKind {
        self.index.kind()
    }

    /// Switch the broad-phase strategy, rebuilding the new index from every body
    pub fn set_broad_phase_strategy(&mut self, kind: BroadPhaseKind) {
        if kind == self.index.kind() {
            return;
        }
        self.config.broad_phase.kind = kind;
        self.index = SpatialIndex::new(kind, &self.config.broad_phase);
        for (handle, body) in self.bodies.iter_mut() {
            body.update_bounds();
            self.index.insert(handle, body.aabb());
        }
        self.index.rebuild();
        log::debug!("broad phase switched to {:?} with {} bodies", kind, self.bodies.len());
    }

    /// Active narrow-phase algorithm
    pub const fn narrow_phase_algorithm(&self) -> NarrowPhaseAlgorithm {
        self.narrow_phase.algorithm()
    }

    /// Switch the narrow-phase algorithm
    pub fn set_narrow_phase_algorithm(&mut self, algorithm: NarrowPhaseAlgorithm) {
        self.config.narrow_phase = algorithm;
        self.narrow_phase.set_algorithm(algorithm);
        if algorithm == NarrowPhaseAlgorithm::Sat {
            let non_boxes = self.sat_fallback_count();
            if non_boxes > 0 {
                log::warn!(
                    "SAT narrow phase only handles boxes; {} non-box bodies fall back to AABB tests",
                    non_boxes
                );
            }
        }
        log::debug!("narrow phase switched to {:?}", algorithm);
    }

    /// Registered bodies the active algorithm only tests by AABB overlap
    ///
    /// Non-zero only under SAT, which is exact for box pairs alone.
    pub fn sat_fallback_count(&self) -> usize {
        if self.narrow_phase.algorithm() != NarrowPhaseAlgorithm::Sat {
            return 0;
        }
        self.bodies.values().filter(|body| !body.shape().is_cuboid()).count()
    }

    /// Run detection on every `interval`-th update (values below 1 mean 1)
    pub fn set_collision_check_interval(&mut self, interval: u32) {
        self.config.check_interval = interval.max(1);
    }

    /// Current detection interval
    pub const fn collision_check_interval(&self) -> u32 {
        self.config.check_interval
    }

    /// Advance one frame
    ///
    /// Calls that the check interval skips change nothing except the frame
    /// counter. Returns the diagnostics of this call.
    pub fn update(&mut self) -> &FrameStats {
        self.frame += 1;
        if self.frame % u64::from(self.config.check_interval) != 0 {
            self.stats = FrameStats {
                frame: self.frame,
                body_count: self.bodies.len(),
                ..FrameStats::default()
            };
            return &self.stats;
        }

        let mut stats = FrameStats {
            frame: self.frame,
            detection_ran: true,
            body_count: self.bodies.len(),
            ..FrameStats::default()
        };

        // Broad phase
        let mut broad_watch = Stopwatch::start_new();
        for (handle, body) in self.bodies.iter_mut() {
            if body.update_bounds() {
                self.index.update(handle, body.aabb());
                stats.refreshed_bodies += 1;
            }
        }
        let potential = self.index.query_pairs();
        stats.potential_pairs = potential.len();
        let candidates: Vec<CollisionPair> = potential
            .into_iter()
            .filter(|pair| self.layers_allow(pair))
            .collect();
        stats.filtered_pairs = stats.potential_pairs - candidates.len();
        stats.broad_phase_time = broad_watch.stop();

        // Narrow phase
        let mut narrow_watch = Stopwatch::start_new();
        let parallel = self.config.parallel_narrow_phase
            && candidates.len() >= self.config.parallel_threshold;
        let bodies = &self.bodies;
        let narrow_phase = &self.narrow_phase;
        let confirmed: Vec<(CollisionPair, Contact)> = if parallel {
            candidates
                .par_iter()
                .filter_map(|pair| test_pair(bodies, narrow_phase, *pair))
                .collect()
        } else {
            candidates
                .iter()
                .filter_map(|pair| test_pair(bodies, narrow_phase, *pair))
                .collect()
        };
        stats.narrow_phase_time = narrow_watch.stop();
        stats.collisions = confirmed.len();

        // Diff against the previous pass
        let mut next = HashMap::with_capacity(confirmed.len());
        for (pair, contact) in confirmed {
            let kind = if self.active.contains_key(&pair) {
                stats.stays += 1;
                CollisionEventKind::Stay
            } else {
                stats.enters += 1;
                CollisionEventKind::Enter
            };
            queue_pair_events(&mut self.events, kind, pair, &contact);
            next.insert(pair, contact);
        }

        let mut ended: Vec<(CollisionPair, Contact)> = self
            .active
            .iter()
            .filter(|(pair, _)| !next.contains_key(pair))
            .map(|(pair, contact)| (*pair, *contact))
            .collect();
        ended.sort_unstable_by_key(|(pair, _)| *pair);
        stats.exits = ended.len();
        for (pair, contact) in ended {
            queue_pair_events(&mut self.events, CollisionEventKind::Exit, pair, &contact);
        }

        self.active = next;

        log::trace!(
            "frame {}: {} bodies, {} potential, {} filtered, {} colliding (+{} ={} -{}){}",
            stats.frame,
            stats.body_count,
            stats.potential_pairs,
            stats.filtered_pairs,
            stats.collisions,
            stats.enters,
            stats.stays,
            stats.exits,
            if parallel { " [parallel]" } else { "" }
        );

        self.stats = stats;
        &self.stats
    }

    fn layers_allow(&self, pair: &CollisionPair) -> bool {
        match (self.bodies.get(pair.first), self.bodies.get(pair.second)) {
            (Some(a), Some(b)) => CollisionLayers::should_collide(a.layer(), a.mask(), b.layer(), b.mask()),
            _ => false,
        }
    }

    /// Take every queued event, oldest first
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        self.events.drain()
    }

    /// Events queued since the last drain or dispatch
    pub fn pending_events(&self) -> &[CollisionEvent] {
        self.events.pending()
    }

    /// Subscribe to one kind of collision event
    ///
    /// Handlers run only from [`dispatch_events`](Self::dispatch_events).
    pub fn register_handler(&mut self, kind: CollisionEventKind, handler: Box<dyn CollisionEventHandler>) {
        self.events.register_handler(kind, handler);
    }

    /// Deliver queued events to the registered handlers; returns how many were delivered
    pub fn dispatch_events(&mut self) -> usize {
        self.events.dispatch()
    }

    /// Whether `handle` was in at least one colliding pair during the last pass
    pub fn is_colliding(&self, handle: BodyHandle) -> bool {
        self.active.keys().any(|pair| pair.contains(handle))
    }

    /// Current contacts of one body, seen from that body
    pub fn collisions_for(&self, handle: BodyHandle) -> Vec<CollisionInfo> {
        let mut pairs: Vec<(&CollisionPair, &Contact)> = self
            .active
            .iter()
            .filter(|(pair, _)| pair.contains(handle))
            .collect();
        pairs.sort_unstable_by_key(|(pair, _)| **pair);
        pairs
            .into_iter()
            .filter_map(|(pair, contact)| {
                let other = pair.other(handle)?;
                let seen = if pair.first == handle { *contact } else { contact.mirrored() };
                Some(info_from(other, &seen))
            })
            .collect()
    }

    /// Colliding pairs from the last pass, sorted
    pub fn colliding_pairs(&self) -> Vec<CollisionPair> {
        let mut pairs: Vec<CollisionPair> = self.active.keys().copied().collect();
        pairs.sort_unstable();
        pairs
    }

    /// Contact of a colliding pair (normal from `pair.first` to `pair.second`)
    pub fn contact(&self, pair: &CollisionPair) -> Option<&Contact> {
        self.active.get(pair)
    }

    /// Broad-phase pairs in the last detection pass
    pub const fn potential_pair_count(&self) -> usize {
        self.stats.potential_pairs
    }

    /// Colliding pairs after the last detection pass
    pub fn collision_count(&self) -> usize {
        self.active.len()
    }

    /// Diagnostics of the last `update` call
    pub const fn stats(&self) -> &FrameStats {
        &self.stats
    }

    /// Number of `update` calls so far
    pub const fn frame(&self) -> u64 {
        self.frame
    }
}

fn test_pair(
    bodies: &SlotMap<BodyHandle, Body>,
    narrow_phase: &NarrowPhase,
    pair: CollisionPair,
) -> Option<(CollisionPair, Contact)> {
    let a = bodies.get(pair.first)?;
    let b = bodies.get(pair.second)?;
    narrow_phase.collide(a, b).map(|contact| (pair, contact))
}

fn info_from(other: BodyHandle, contact: &Contact) -> CollisionInfo {
    CollisionInfo {
        other,
        point: contact.point,
        normal: contact.normal,
        depth: contact.depth,
    }
}

/// One event per participant; the second participant sees the mirrored normal
fn queue_pair_events(events: &mut EventQueue, kind: CollisionEventKind, pair: CollisionPair, contact: &Contact) {
    events.push(CollisionEvent {
        kind,
        body: pair.first,
        info: info_from(pair.second, contact),
    });
    events.push(CollisionEvent {
        kind,
        body: pair.second,
        info: info_from(pair.first, &contact.mirrored()),
    });
}
