//! Simulation world
//!
//! Owns every entity, keyed by id. Iteration is id-ordered so a tick visits
//! entities in a deterministic order, and removal is deferred to an explicit
//! end-of-tick sweep.

pub mod entity;

pub use entity::{Entity, EntityBuilder, EntityId, EntityKind, FactionTag};

use std::collections::BTreeMap;

/// World containing all entities
#[derive(Debug, Default)]
pub struct World {
    next_entity_id: u32,
    entities: BTreeMap<EntityId, Entity>,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity and return its id
    pub fn spawn(&mut self, builder: EntityBuilder) -> EntityId {
        let id = EntityId::new(self.next_entity_id);
        self.next_entity_id += 1;
        self.entities.insert(id, builder.build(id));
        id
    }

    /// Look up an entity
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    /// Look up an entity mutably
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Is `id` a live entity?
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// Number of entities, including those pending destruction
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether the world holds no entities
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Iterate entities in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Iterate entities mutably in ascending id order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Ids in descending order, the order a tick steps entities in
    pub fn ids_descending(&self) -> Vec<EntityId> {
        self.entities.keys().rev().copied().collect()
    }

    /// Mark an entity for removal at the next sweep
    pub fn schedule_destroy(&mut self, id: EntityId) -> bool {
        self.entities.get_mut(&id).map_or(false, |entity| {
            entity.schedule_destroy();
            true
        })
    }

    /// Remove every entity scheduled for destruction, returning their ids
    pub fn sweep_destroyed(&mut self) -> Vec<EntityId> {
        let doomed: Vec<EntityId> = self
            .entities
            .values()
            .filter(|entity| entity.is_destroy_scheduled())
            .map(Entity::id)
            .collect();
        for id in &doomed {
            self.entities.remove(id);
        }
        doomed
    }

    /// Detach an entity so it can be mutated alongside its neighbours
    pub(crate) fn take(&mut self, id: EntityId) -> Option<Entity> {
        self.entities.remove(&id)
    }

    /// Re-attach an entity detached with [`World::take`]
    pub(crate) fn restore(&mut self, entity: Entity) {
        self.entities.insert(entity.id(), entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec2;

    #[test]
    fn test_spawn_assigns_increasing_ids() {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::ship(Vec2::zeros(), 1.0));
        let b = world.spawn(EntityBuilder::ship(Vec2::zeros(), 1.0));
        assert!(b > a);
        assert_eq!(world.ids_descending(), vec![b, a]);
    }

    #[test]
    fn test_sweep_removes_only_scheduled() {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::ship(Vec2::zeros(), 1.0));
        let b = world.spawn(EntityBuilder::asteroid(Vec2::zeros(), 1.0));
        assert!(world.schedule_destroy(a));

        assert_eq!(world.sweep_destroyed(), vec![a]);
        assert!(!world.contains(a));
        assert!(world.contains(b));
        assert!(world.sweep_destroyed().is_empty());
    }

    #[test]
    fn test_take_and_restore() {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::ship(Vec2::zeros(), 1.0));
        let entity = world.take(a).unwrap();
        assert!(!world.contains(a));
        world.restore(entity);
        assert_eq!(world.get(a).map(Entity::id), Some(a));
    }
}
