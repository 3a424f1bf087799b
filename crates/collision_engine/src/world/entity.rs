//! Entity implementation
//!
//! Every simulated body is a circle with a bounding radius, a velocity and
//! a collision layer/mask pair. What it does on contact is decided by its
//! [`EntityKind`], a closed set of response variants.

use crate::foundation::math::Vec2;
use crate::physics::collision_layers::CollisionLayers;
use std::collections::HashSet;
use std::fmt;

/// Entity identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(u32);

impl EntityId {
    /// Create an id from its raw value
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Faction tag; kinetic payloads never damage bodies of their own faction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FactionTag(pub u16);

/// Collision response variant of an entity
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// Ships, particles: generic velocity nudge along the contact normal
    Default,
    /// Asteroids and other inert terrain
    Terrain {
        /// Current orientation in radians (cosmetic)
        rotation: f32,
        /// Angular velocity in radians per second
        spin: f32,
    },
    /// Proximity-triggered bodies such as mines
    Trigger,
    /// Projectiles carrying a damage payload
    Kinetic {
        /// Damage applied to each body hit
        damage: f32,
        /// Bodies already damaged by this payload
        hits: HashSet<EntityId>,
    },
    /// Stations and other bodies that ignore collision response
    Immovable,
}

impl EntityKind {
    /// Terrain with no initial spin
    pub const fn terrain() -> Self {
        Self::Terrain { rotation: 0.0, spin: 0.0 }
    }

    /// Kinetic payload that has not hit anything yet
    pub fn kinetic(damage: f32) -> Self {
        Self::Kinetic { damage, hits: HashSet::new() }
    }

    /// Is this an inert terrain body?
    pub const fn is_terrain(&self) -> bool {
        matches!(self, Self::Terrain { .. })
    }

    /// Is this a proximity-triggered body?
    pub const fn is_trigger(&self) -> bool {
        matches!(self, Self::Trigger)
    }

    /// Short name for logs
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Terrain { .. } => "terrain",
            Self::Trigger => "trigger",
            Self::Kinetic { .. } => "kinetic",
            Self::Immovable => "immovable",
        }
    }
}

/// A simulated body
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: EntityId,
    /// World-space centre
    pub position: Vec2,
    /// Units per second
    pub velocity: Vec2,
    /// Collision circle radius; `<= 0` opts out of collision
    pub bounding_radius: f32,
    /// What this entity is
    pub layer: CollisionLayers,
    /// What this entity reacts to; empty opts out of collision
    pub mask: CollisionLayers,
    /// Optional faction tag
    pub faction: Option<FactionTag>,
    /// Remaining health; `None` means the body cannot be damaged
    pub health: Option<f32>,
    /// Response variant
    pub kind: EntityKind,
    destroy_scheduled: bool,
}

impl Entity {
    /// Get the entity ID
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity takes part in collision at all
    pub fn participates(&self) -> bool {
        self.bounding_radius > 0.0 && !self.mask.is_empty()
    }

    /// Whether this entity reacts to `other` (one-directional mask test)
    pub fn reacts_to(&self, other: &Self) -> bool {
        CollisionLayers::reacts_to(self.mask, other.layer)
    }

    /// Both entities carry the same faction tag
    pub fn shares_faction(&self, other: &Self) -> bool {
        matches!((self.faction, other.faction), (Some(a), Some(b)) if a == b)
    }

    /// Mark for removal at the end of the tick
    pub fn schedule_destroy(&mut self) {
        self.destroy_scheduled = true;
    }

    /// Pending removal?
    pub const fn is_destroy_scheduled(&self) -> bool {
        self.destroy_scheduled
    }

    /// Subtract health and schedule destruction when it runs out
    ///
    /// Returns `true` if this call scheduled the destruction.
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        let Some(health) = self.health.as_mut() else {
            return false;
        };
        *health -= amount;
        if *health <= 0.0 && !self.destroy_scheduled {
            self.destroy_scheduled = true;
            return true;
        }
        false
    }

    /// Advance position (and terrain rotation) by one step
    pub fn integrate(&mut self, delta_time: f32) {
        self.position += self.velocity * delta_time;
        if let EntityKind::Terrain { rotation, spin } = &mut self.kind {
            *rotation = (*rotation + *spin * delta_time).rem_euclid(std::f32::consts::TAU);
        }
    }
}

/// Builder used by [`crate::world::World::spawn`]
#[derive(Debug, Clone)]
pub struct EntityBuilder {
    position: Vec2,
    velocity: Vec2,
    bounding_radius: f32,
    layer: CollisionLayers,
    mask: CollisionLayers,
    faction: Option<FactionTag>,
    health: Option<f32>,
    kind: EntityKind,
}

impl EntityBuilder {
    /// Start a builder for an arbitrary kind
    pub fn new(kind: EntityKind, position: Vec2, bounding_radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::zeros(),
            bounding_radius,
            layer: CollisionLayers::ALL,
            mask: CollisionLayers::ALL,
            faction: None,
            health: None,
            kind,
        }
    }

    /// A ship: default response, collides with everything
    pub fn ship(position: Vec2, bounding_radius: f32) -> Self {
        Self::new(EntityKind::Default, position, bounding_radius)
            .with_layers(CollisionLayers::SHIP, CollisionLayers::ALL)
    }

    /// An asteroid: terrain response
    pub fn asteroid(position: Vec2, bounding_radius: f32) -> Self {
        Self::new(EntityKind::terrain(), position, bounding_radius)
            .with_layers(CollisionLayers::ASTEROID, CollisionLayers::ALL)
    }

    /// A mine: detonates when a non-mine body comes within the trigger radius
    pub fn mine(position: Vec2, bounding_radius: f32) -> Self {
        Self::new(EntityKind::Trigger, position, bounding_radius)
            .with_layers(CollisionLayers::MINE, CollisionLayers::ALL)
    }

    /// A projectile carrying `damage`
    pub fn projectile(position: Vec2, velocity: Vec2, bounding_radius: f32, damage: f32) -> Self {
        Self::new(EntityKind::kinetic(damage), position, bounding_radius)
            .with_velocity(velocity)
            .with_layers(
                CollisionLayers::PROJECTILE,
                CollisionLayers::ALL.difference(CollisionLayers::PROJECTILE),
            )
    }

    /// A station: immovable, ignores collision response
    pub fn station(position: Vec2, bounding_radius: f32) -> Self {
        Self::new(EntityKind::Immovable, position, bounding_radius)
            .with_layers(CollisionLayers::STATION, CollisionLayers::ALL)
    }

    /// An effect particle: never collides
    pub fn particle(position: Vec2, velocity: Vec2) -> Self {
        Self::new(EntityKind::Default, position, 0.0)
            .with_velocity(velocity)
            .with_layers(CollisionLayers::PARTICLE, CollisionLayers::NONE)
    }

    /// Set the initial velocity
    pub fn with_velocity(mut self, velocity: Vec2) -> Self {
        self.velocity = velocity;
        self
    }

    /// Set layer and mask
    pub fn with_layers(mut self, layer: CollisionLayers, mask: CollisionLayers) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// Tag with a faction
    pub fn with_faction(mut self, faction: FactionTag) -> Self {
        self.faction = Some(faction);
        self
    }

    /// Give the body health so it can be damaged
    pub fn with_health(mut self, health: f32) -> Self {
        self.health = Some(health);
        self
    }

    pub(crate) fn build(self, id: EntityId) -> Entity {
        Entity {
            id,
            position: self.position,
            velocity: self.velocity,
            bounding_radius: self.bounding_radius,
            layer: self.layer,
            mask: self.mask,
            faction: self.faction,
            health: self.health,
            kind: self.kind,
            destroy_scheduled: false,
        }
    }
}
