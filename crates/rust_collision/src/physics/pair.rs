//! Body identity and unordered body pairs

use slotmap::new_key_type;

new_key_type! {
    /// Handle to a body registered with a [`CollisionManager`](super::CollisionManager)
    pub struct BodyHandle;
}

/// Unordered pair of bodies
///
/// `new(a, b)` and `new(b, a)` produce the same key: the lower handle is
/// always stored first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollisionPair {
    /// Lower handle
    pub first: BodyHandle,
    /// Higher handle
    pub second: BodyHandle,
}

impl CollisionPair {
    /// Create a canonical pair
    pub fn new(a: BodyHandle, b: BodyHandle) -> Self {
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Whether `handle` is one of the two bodies
    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.first == handle || self.second == handle
    }

    /// The body paired with `handle`, if `handle` is part of the pair
    pub fn other(&self, handle: BodyHandle) -> Option<BodyHandle> {
        if self.first == handle {
            Some(self.second)
        } else if self.second == handle {
            Some(self.first)
        } else {
            None
        }
    }
}
