//! Core collision system
//!
//! Drives one tick of the subsystem: re-index the broad phase, step every
//! entity (integrate, gather candidates, narrow-phase test, respond,
//! refresh its index entry), then sweep the entities destroyed during the
//! tick.
//!
//! Each entity tests its own neighbourhood, so a logical pair is usually
//! seen twice per tick, once from each side. Pairs are not de-duplicated;
//! responses are written to be safe under that double invocation.

use crate::config::{BroadPhaseKind, CollisionConfig, ConfigError};
use crate::physics::collision::circle_contact;
use crate::physics::events::{CollisionEvent, EventQueue};
use crate::physics::response::{self, ResponseContext};
use crate::spatial::broad_phase::{create_broad_phase, BroadPhase};
use crate::world::{EntityId, World};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::ops::AddAssign;

/// Counters for one tick (or one stepped entity)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    /// Entities integrated and tested
    pub entities_stepped: usize,
    /// Broad-phase candidates examined, self excluded
    pub candidate_pairs: usize,
    /// Confirmed narrow-phase contacts
    pub contacts: usize,
    /// Entities removed by the end-of-tick sweep
    pub destroyed: usize,
}

impl AddAssign for TickStats {
    fn add_assign(&mut self, other: Self) {
        self.entities_stepped += other.entities_stepped;
        self.candidate_pairs += other.candidate_pairs;
        self.contacts += other.contacts;
        self.destroyed += other.destroyed;
    }
}

/// Broad phase, narrow phase and response for a [`World`]
pub struct CollisionEngine {
    broad_phase: Box<dyn BroadPhase>,
    config: CollisionConfig,
    rng: StdRng,
    events: EventQueue,
}

impl CollisionEngine {
    /// Create an engine with the broad phase selected by `config`
    pub fn new(config: CollisionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let broad_phase = create_broad_phase(&config);
        Ok(Self::assemble(config, broad_phase))
    }

    /// Create an engine around a caller-supplied broad phase
    pub fn with_broad_phase(config: CollisionConfig, broad_phase: Box<dyn BroadPhase>) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, broad_phase))
    }

    fn assemble(config: CollisionConfig, broad_phase: Box<dyn BroadPhase>) -> Self {
        match broad_phase.kind() {
            BroadPhaseKind::Grid => log::info!(
                "Collision engine using {}x{} grid over {} world units",
                config.grid_divisions,
                config.grid_divisions,
                config.world_size
            ),
            BroadPhaseKind::Bvh => log::info!(
                "Collision engine using dynamic BVH (initial capacity {})",
                config.bvh_initial_capacity
            ),
        }
        Self {
            broad_phase,
            rng: StdRng::seed_from_u64(config.rng_seed),
            events: EventQueue::new(config.record_events),
            config,
        }
    }

    /// Active configuration
    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    /// The broad-phase index, for inspection
    pub fn broad_phase(&self) -> &dyn BroadPhase {
        self.broad_phase.as_ref()
    }

    /// Mutable access to the broad-phase index
    pub fn broad_phase_mut(&mut self) -> &mut dyn BroadPhase {
        self.broad_phase.as_mut()
    }

    /// Start tracking an entity that was just spawned
    pub fn register(&mut self, world: &World, id: EntityId) -> bool {
        match world.get(id) {
            Some(entity) => {
                self.broad_phase.insert(entity);
                true
            }
            None => false,
        }
    }

    /// Stop tracking an entity removed outside of [`CollisionEngine::tick`]
    pub fn unregister(&mut self, id: EntityId) {
        self.broad_phase.remove(id);
    }

    /// Clear the index and insert every entity currently in `world`
    pub fn rebuild(&mut self, world: &World) {
        self.broad_phase.clear();
        for entity in world.iter().filter(|entity| !entity.is_destroy_scheduled()) {
            self.broad_phase.insert(entity);
        }
        log::debug!("Rebuilt broad phase with {} entries", self.broad_phase.entity_count());
    }

    /// Re-index the broad phase for the current tick
    pub fn update_broad_phase(&mut self, world: &World) {
        self.broad_phase.update(world);
    }

    /// Integrate one entity, test it against its candidates and respond
    ///
    /// Entities already scheduled for destruction are left untouched.
    pub fn step_entity(&mut self, world: &mut World, id: EntityId, delta_time: f32) -> TickStats {
        let mut stats = TickStats::default();
        let Some(mut entity) = world.take(id) else {
            return stats;
        };
        if entity.is_destroy_scheduled() {
            world.restore(entity);
            return stats;
        }

        let previous = entity.position;
        entity.integrate(delta_time);
        stats.entities_stepped = 1;

        if entity.participates() {
            let candidates = if entity.kind.is_trigger() {
                self.broad_phase.query_reach(&entity, self.config.trigger_radius)
            } else {
                self.broad_phase.query(&entity)
            };
            let mut ctx = ResponseContext {
                trigger_radius: self.config.trigger_radius,
                terrain_spin_factor: self.config.terrain_spin_factor,
                rng: &mut self.rng,
                events: &mut self.events,
            };
            for other_id in candidates {
                if other_id == id {
                    continue;
                }
                let Some(other) = world.get_mut(other_id) else {
                    continue;
                };
                if !other.participates() {
                    continue;
                }
                stats.candidate_pairs += 1;
                if !entity.reacts_to(other) {
                    continue;
                }

                response::proximity(&mut entity, other, &mut ctx);

                let Some(contact) = circle_contact(&entity, other) else {
                    continue;
                };
                stats.contacts += 1;
                ctx.events.push(CollisionEvent::Contact {
                    entity: id,
                    other: other_id,
                    normal: contact.normal,
                    penetration: contact.penetration,
                });
                response::respond(&mut entity, other, &contact, &mut ctx);
            }
        }

        self.broad_phase.refresh(&entity, &previous);
        world.restore(entity);
        stats
    }

    /// Run one full tick: update, step highest id first, sweep
    pub fn tick(&mut self, world: &mut World, delta_time: f32) -> TickStats {
        self.broad_phase.update(world);

        let mut stats = TickStats::default();
        for id in world.ids_descending() {
            stats += self.step_entity(world, id, delta_time);
        }

        for id in world.sweep_destroyed() {
            self.broad_phase.remove(id);
            self.events.push(CollisionEvent::Destroyed { entity: id });
            stats.destroyed += 1;
        }
        if stats.destroyed > 0 {
            log::debug!("Destroyed {} entities, {} remain", stats.destroyed, world.len());
        }

        log::trace!(
            "Tick: {} stepped, {} candidates, {} contacts, {} destroyed",
            stats.entities_stepped,
            stats.candidate_pairs,
            stats.contacts,
            stats.destroyed
        );
        stats
    }

    /// Take every event recorded since the last drain
    pub fn drain_events(&mut self) -> Vec<CollisionEvent> {
        self.events.drain()
    }
}
