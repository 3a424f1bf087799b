//! # Collision Engine
//!
//! Real-time 2D collision subsystem for a space shooter world of a few
//! hundred moving bodies.
//!
//! ## Features
//!
//! - **Broad phase**: uniform cell grid or dynamic AABB tree behind one trait
//! - **Narrow phase**: exact circle test with penetration depth and normal
//! - **Response**: per-kind policies for terrain, triggers, projectiles and stations
//! - **Layers**: bitmask filtering of what reacts to what
//! - **Deterministic ticks**: fixed stepping order and deferred destruction
//!
//! ## Quick Start
//!
//! ```rust
//! use collision_engine::prelude::*;
//!
//! let mut world = World::new();
//! let a = world.spawn(EntityBuilder::ship(Vec2::new(100.0, 100.0), 5.0));
//! let b = world.spawn(EntityBuilder::ship(Vec2::new(108.0, 100.0), 5.0));
//!
//! let mut engine = CollisionEngine::new(CollisionConfig::default()).unwrap();
//! engine.rebuild(&world);
//!
//! let stats = engine.tick(&mut world, 1.0 / 60.0);
//! assert_eq!(stats.contacts, 2);
//! assert!(world.get(a).unwrap().velocity.x < 0.0);
//! assert!(world.get(b).unwrap().velocity.x > 0.0);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod physics;
pub mod spatial;
pub mod world;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        config::{BroadPhaseKind, CollisionConfig, Config, ConfigError},
        foundation::{
            math::Vec2,
            time::{FixedTimestep, Timer},
        },
        physics::{CollisionEngine, CollisionEvent, CollisionLayers, Contact, TickStats},
        spatial::{AabbShape, BroadPhase, DynamicBvh, SpatialGrid},
        world::{Entity, EntityBuilder, EntityId, EntityKind, FactionTag, World},
    };
}
