//! Collision layer system for filtering collision detection
//!
//! An entity's *layer* says what it is; its *mask* says which layers it
//! reacts to. Filtering happens per perspective: when A is stepped it only
//! considers neighbours whose layer is in A's mask.

use serde::{Deserialize, Serialize};

bitflags::bitflags! {
    /// Collision layer bitmask
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionLayers: u32 {
        /// Player and AI ships
        const SHIP = 1 << 0;
        /// Asteroids and other drifting terrain
        const ASTEROID = 1 << 1;
        /// Proximity mines
        const MINE = 1 << 2;
        /// Bullets, missiles and other kinetic payloads
        const PROJECTILE = 1 << 3;
        /// Stations and other large immovable bodies
        const STATION = 1 << 4;
        /// Debris and effect particles
        const PARTICLE = 1 << 5;
        /// Every layer
        const ALL = u32::MAX;
    }
}

impl Default for CollisionLayers {
    fn default() -> Self {
        Self::ALL
    }
}

impl CollisionLayers {
    /// No collision layer
    pub const NONE: Self = Self::empty();

    /// Does an entity with `mask` react to something on `layer`?
    #[inline]
    pub fn reacts_to(mask: Self, layer: Self) -> bool {
        mask.intersects(layer)
    }

    /// Check if two entities should collide based on their layers and masks
    ///
    /// A's layer must be in B's mask AND B's layer must be in A's mask.
    ///
    /// # Example
    /// ```
    /// use collision_engine::physics::CollisionLayers;
    ///
    /// let ship_mask = CollisionLayers::ASTEROID | CollisionLayers::PROJECTILE;
    /// let asteroid_mask = CollisionLayers::ALL;
    ///
    /// assert!(CollisionLayers::should_collide(
    ///     CollisionLayers::SHIP, ship_mask,
    ///     CollisionLayers::ASTEROID, asteroid_mask,
    /// ));
    /// ```
    pub fn should_collide(layer_a: Self, mask_a: Self, layer_b: Self, mask_b: Self) -> bool {
        Self::reacts_to(mask_b, layer_a) && Self::reacts_to(mask_a, layer_b)
    }

    /// Helper to create a mask from multiple layers
    pub fn mask(layers: &[Self]) -> Self {
        layers.iter().fold(Self::NONE, |acc, &layer| acc | layer)
    }
}
