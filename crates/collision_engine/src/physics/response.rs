//! Per-kind collision response
//!
//! A single dispatch over [`EntityKind`]. Only the stepped entity's own
//! response runs; the neighbour reacts when it is stepped in turn, so every
//! handler here must tolerate seeing the same pair twice in one tick.

use crate::foundation::math::utils;
use crate::physics::collision::Contact;
use crate::physics::events::{CollisionEvent, EventQueue};
use crate::world::{Entity, EntityKind};
use rand::rngs::StdRng;
use rand::Rng;

/// Tuning and sinks shared by every response in a tick
pub(crate) struct ResponseContext<'a> {
    pub trigger_radius: f32,
    pub terrain_spin_factor: f32,
    pub rng: &'a mut StdRng,
    pub events: &'a mut EventQueue,
}

/// Trigger proximity check, independent of the circle test
///
/// Returns `true` if `entity` detonated.
pub(crate) fn proximity(entity: &mut Entity, other: &Entity, ctx: &mut ResponseContext<'_>) -> bool {
    if !entity.kind.is_trigger() || other.kind.is_trigger() || entity.is_destroy_scheduled() {
        return false;
    }
    let distance_squared = utils::distance_squared(&entity.position, &other.position);
    if distance_squared > ctx.trigger_radius * ctx.trigger_radius {
        return false;
    }
    entity.schedule_destroy();
    log::debug!("Trigger {} fired by {} {}", entity.id(), other.kind.name(), other.id());
    ctx.events.push(CollisionEvent::TriggerFired {
        trigger: entity.id(),
        by: other.id(),
    });
    true
}

/// Apply `entity`'s response to a confirmed contact with `other`
pub(crate) fn respond(entity: &mut Entity, other: &mut Entity, contact: &Contact, ctx: &mut ResponseContext<'_>) {
    let push = contact.normal * contact.penetration;
    let same_faction = entity.shares_faction(other);

    match &mut entity.kind {
        EntityKind::Default => {
            entity.velocity += push;
        }
        EntityKind::Terrain { spin, .. } => {
            let sign = if ctx.rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            *spin += contact.penetration * ctx.terrain_spin_factor * sign;
            entity.velocity += push;
            // Terrain stacked on terrain only trades velocity
            if !other.kind.is_terrain() {
                entity.position += push;
            }
        }
        EntityKind::Kinetic { damage, hits } => {
            if same_faction || !hits.insert(other.id()) {
                return;
            }
            let amount = *damage;
            let killed = other.apply_damage(amount);
            entity.schedule_destroy();
            log::debug!(
                "{} hit {} {} for {amount}{}",
                entity.id(),
                other.kind.name(),
                other.id(),
                if killed { " (destroyed)" } else { "" }
            );
            ctx.events.push(CollisionEvent::Damage {
                source: entity.id(),
                target: other.id(),
                amount,
            });
        }
        // Triggers act through `proximity`
        EntityKind::Trigger | EntityKind::Immovable => {}
    }
}
