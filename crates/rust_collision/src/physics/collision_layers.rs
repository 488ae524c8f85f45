//! Collision layer filtering
//!
//! Every body carries a layer (what it is) and a mask (what it wants to touch).
//! A candidate pair reaches the narrow phase only when each body's layer is in
//! the other's mask.

use bitflags::bitflags;

bitflags! {
    /// Collision layer / mask bits
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CollisionLayers: u32 {
        /// Layer used by bodies that never opted into anything else
        const DEFAULT = 1 << 0;
        /// Immovable world geometry
        const STATIC = 1 << 1;
        /// Simulated moving bodies
        const DYNAMIC = 1 << 2;
        /// Script-driven moving bodies
        const KINEMATIC = 1 << 3;
        /// Volumes that only report overlap
        const TRIGGER = 1 << 4;
        /// Query shapes that only sense overlap
        const SENSOR = 1 << 5;

        // Bits 8..31 are free for applications, see `CollisionLayers::custom`
        const _ = !0;
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl CollisionLayers {
    /// First bit available for application-defined layers
    pub const FIRST_CUSTOM_BIT: u32 = 8;

    /// Application-defined layer `index` (0-based, up to 23)
    ///
    /// Returns `None` if the index runs past the 32-bit mask.
    pub const fn custom(index: u32) -> Option<Self> {
        if index < u32::BITS - Self::FIRST_CUSTOM_BIT {
            Some(Self::from_bits_retain(1 << (index + Self::FIRST_CUSTOM_BIT)))
        } else {
            None
        }
    }

    /// Check if two bodies should collide based on their layers and masks
    ///
    /// A's layer must be in B's mask and B's layer must be in A's mask.
    ///
    /// # Example
    /// ```
    /// use rust_collision::physics::CollisionLayers;
    ///
    /// let player = (CollisionLayers::DYNAMIC, CollisionLayers::STATIC | CollisionLayers::DYNAMIC);
    /// let wall = (CollisionLayers::STATIC, CollisionLayers::all());
    /// assert!(CollisionLayers::should_collide(player.0, player.1, wall.0, wall.1));
    /// ```
    pub const fn should_collide(layer_a: Self, mask_a: Self, layer_b: Self, mask_b: Self) -> bool {
        layer_a.intersects(mask_b) && layer_b.intersects(mask_a)
    }

    /// Union of several layers
    pub fn mask(layers: &[Self]) -> Self {
        layers.iter().fold(Self::empty(), |acc, &layer| acc | layer)
    }
}
