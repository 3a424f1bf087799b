//! Collision events
//!
//! Responses record what happened during a tick into a queue that the host
//! drains after the tick, instead of calling back into game code mid-sweep.

use crate::foundation::math::Vec2;
use crate::world::EntityId;

/// Something the collision subsystem did during a tick
#[derive(Debug, Clone, PartialEq)]
pub enum CollisionEvent {
    /// Narrow phase confirmed a contact, seen from `entity`
    Contact {
        /// Body being stepped
        entity: EntityId,
        /// Body it touched
        other: EntityId,
        /// Unit vector from `other` towards `entity`
        normal: Vec2,
        /// Overlap depth
        penetration: f32,
    },
    /// A trigger body detonated
    TriggerFired {
        /// The trigger
        trigger: EntityId,
        /// Body that came within range
        by: EntityId,
    },
    /// A kinetic payload damaged a body
    Damage {
        /// The kinetic body
        source: EntityId,
        /// Body that took the damage
        target: EntityId,
        /// Damage applied
        amount: f32,
    },
    /// An entity was removed by the end-of-tick sweep
    Destroyed {
        /// Removed entity
        entity: EntityId,
    },
}

/// FIFO event buffer; pushes are dropped while disabled
#[derive(Debug, Default)]
pub struct EventQueue {
    enabled: bool,
    queue: Vec<CollisionEvent>,
}

impl EventQueue {
    /// Create a queue
    pub fn new(enabled: bool) -> Self {
        Self { enabled, queue: Vec::new() }
    }

    /// Record an event
    pub fn push(&mut self, event: CollisionEvent) {
        if self.enabled {
            self.queue.push(event);
        }
    }

    /// Take every buffered event in the order it was recorded
    pub fn drain(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.queue)
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
