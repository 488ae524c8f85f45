//! Collision events
//!
//! The collision manager fills an [`EventQueue`] once per detection pass. The
//! client either drains it directly or registers handlers and calls
//! [`EventQueue::dispatch`]. Handlers never run during detection itself.
//!
//! Key principles:
//! - One event per participant per transition (enter, stay, exit)
//! - Handler returns bool (true = consumed, stops forwarding)
//! - Registration per event kind (only interested handlers are notified)

use std::collections::HashMap;

use crate::foundation::math::Vec3;
use crate::physics::BodyHandle;

/// Per-pair transition kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionEventKind {
    /// First frame of overlap
    Enter,
    /// Overlap continued from the previous pass
    Stay,
    /// Overlap ended (or a participant was unregistered)
    Exit,
}

/// Contact as seen by one participant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionInfo {
    /// The other body of the pair
    pub other: BodyHandle,
    /// World-space contact point
    pub point: Vec3,
    /// Unit normal pointing from this body to `other`
    pub normal: Vec3,
    /// Penetration depth along `normal`
    pub depth: f32,
}

/// A collision transition delivered to one participant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Transition kind
    pub kind: CollisionEventKind,
    /// The participant receiving the event
    pub body: BodyHandle,
    /// Contact data from `body`'s point of view; the last known contact for exits
    pub info: CollisionInfo,
}

/// Event handler trait
/// Returns true if event was consumed (stops forwarding)
/// Returns false to allow forwarding to other handlers
pub trait CollisionEventHandler: Send {
    /// Handle an event, return true if consumed
    fn on_event(&mut self, event: &CollisionEvent) -> bool;
}

impl<F> CollisionEventHandler for F
where
    F: FnMut(&CollisionEvent) -> bool + Send,
{
    fn on_event(&mut self, event: &CollisionEvent) -> bool {
        self(event)
    }
}

/// Collision event queue with optional handler registration
#[derive(Default)]
pub struct EventQueue {
    pending: Vec<CollisionEvent>,
    handlers: HashMap<CollisionEventKind, Vec<Box<dyn CollisionEventHandler>>>,
}

impl std::fmt::Debug for EventQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventQueue")
            .field("pending", &self.pending.len())
            .field("handler_kinds", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for one event kind
    pub fn register_handler(&mut self, kind: CollisionEventKind, handler: Box<dyn CollisionEventHandler>) {
        self.handlers.entry(kind).or_default().push(handler);
    }

    /// Queue an event
    pub fn push(&mut self, event: CollisionEvent) {
        self.pending.push(event);
    }

    /// Events waiting to be drained or dispatched
    pub fn pending(&self) -> &[CollisionEvent] {
        &self.pending
    }

    /// Number of queued events
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Take every queued event, oldest first
    pub fn drain(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Deliver every queued event to the handlers registered for its kind
    ///
    /// Stops forwarding an event at the first handler that consumes it.
    /// Returns the number of events delivered.
    pub fn dispatch(&mut self) -> usize {
        let events = std::mem::take(&mut self.pending);
        for event in &events {
            if let Some(handlers) = self.handlers.get_mut(&event.kind) {
                for handler in handlers.iter_mut() {
                    if handler.on_event(event) {
                        break;
                    }
                }
            }
        }
        events.len()
    }

    /// Drop queued events (handlers stay registered)
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
