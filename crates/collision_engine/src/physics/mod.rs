//! Physics module for collision detection and response
//!
//! Narrow-phase circle tests, per-kind collision response and the engine
//! that drives them over a broad-phase index once per tick.

pub mod collision;
pub mod collision_layers;
pub mod collision_system;
pub mod events;
mod response;

#[cfg(test)]
mod tests;

pub use collision::{circle_contact, BoundingCircle, Contact};
pub use collision_layers::CollisionLayers;
pub use collision_system::{CollisionEngine, TickStats};
pub use events::{CollisionEvent, EventQueue};
