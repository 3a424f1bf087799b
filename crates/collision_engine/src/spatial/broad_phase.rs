//! Swappable broad-phase interface
//!
//! The collision engine only sees a `Box<dyn BroadPhase>`, so the uniform
//! grid and the dynamic BVH can be exchanged through configuration without
//! touching the narrow phase.

use crate::config::{BroadPhaseKind, CollisionConfig};
use crate::foundation::math::Vec2;
use crate::spatial::aabb::AabbShape;
use crate::spatial::bvh::DynamicBvh;
use crate::spatial::grid::SpatialGrid;
use crate::world::{Entity, EntityId, World};
use std::any::Any;

/// Spatial index that narrows all-pairs testing down to candidate pairs
pub trait BroadPhase: Send + Sync {
    /// Re-index every tracked entity; call once per tick before querying
    fn update(&mut self, world: &World);

    /// Start tracking an entity
    fn insert(&mut self, entity: &Entity);

    /// Stop tracking an entity
    fn remove(&mut self, id: EntityId);

    /// Bring one entity's entry up to date after it moved from `previous`
    /// during the tick, so entities stepped later see where it is now
    fn refresh(&mut self, entity: &Entity, previous: &Vec2);

    /// Candidate neighbours of `entity`, which may include the entity itself
    fn query(&self, entity: &Entity) -> Vec<EntityId>;

    /// Like [`BroadPhase::query`], widened to everything within `reach` of
    /// the entity's centre (used by triggers whose range exceeds their radius)
    fn query_reach(&self, entity: &Entity, reach: f32) -> Vec<EntityId>;

    /// Drop every tracked entity
    fn clear(&mut self);

    /// Number of index entries
    fn entity_count(&self) -> usize;

    /// Which implementation this is
    fn kind(&self) -> BroadPhaseKind;

    /// Downcast for implementation-specific inspection
    fn as_any(&self) -> &dyn Any;

    /// Mutable downcast
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl BroadPhase for SpatialGrid {
    fn update(&mut self, world: &World) {
        SpatialGrid::update(self, world);
    }

    fn insert(&mut self, entity: &Entity) {
        SpatialGrid::insert(self, entity);
    }

    fn remove(&mut self, id: EntityId) {
        SpatialGrid::remove(self, id);
    }

    fn refresh(&mut self, entity: &Entity, previous: &Vec2) {
        SpatialGrid::refresh(self, entity, previous);
    }

    fn query(&self, entity: &Entity) -> Vec<EntityId> {
        SpatialGrid::query(self, entity)
    }

    fn query_reach(&self, entity: &Entity, reach: f32) -> Vec<EntityId> {
        SpatialGrid::query_reach(self, &entity.position, reach)
    }

    fn clear(&mut self) {
        SpatialGrid::clear(self);
    }

    fn entity_count(&self) -> usize {
        SpatialGrid::entity_count(self)
    }

    fn kind(&self) -> BroadPhaseKind {
        BroadPhaseKind::Grid
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl BroadPhase for DynamicBvh {
    fn update(&mut self, world: &World) {
        DynamicBvh::update(self, world);
    }

    fn insert(&mut self, entity: &Entity) {
        DynamicBvh::insert(self, entity);
    }

    fn remove(&mut self, id: EntityId) {
        DynamicBvh::remove(self, id);
    }

    fn refresh(&mut self, entity: &Entity, _previous: &Vec2) {
        DynamicBvh::refresh(self, entity);
    }

    fn query(&self, entity: &Entity) -> Vec<EntityId> {
        self.query_entity(entity)
    }

    fn query_reach(&self, entity: &Entity, reach: f32) -> Vec<EntityId> {
        let reach = reach.max(entity.bounding_radius);
        DynamicBvh::query(self, &AabbShape::from_circle(entity.position, reach))
    }

    fn clear(&mut self) {
        DynamicBvh::clear(self);
    }

    fn entity_count(&self) -> usize {
        self.leaf_count()
    }

    fn kind(&self) -> BroadPhaseKind {
        BroadPhaseKind::Bvh
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Build the broad phase selected by `config`
pub fn create_broad_phase(config: &CollisionConfig) -> Box<dyn BroadPhase> {
    match config.broad_phase {
        BroadPhaseKind::Grid => Box::new(SpatialGrid::new(config.world_size, config.grid_divisions)),
        BroadPhaseKind::Bvh => Box::new(DynamicBvh::new(config.bvh_initial_capacity)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::EntityBuilder;

    #[test]
    fn test_factory_selects_implementation() {
        let grid = create_broad_phase(&CollisionConfig::default());
        assert_eq!(grid.kind(), BroadPhaseKind::Grid);
        assert!(grid.as_any().downcast_ref::<SpatialGrid>().is_some());

        let bvh = create_broad_phase(&CollisionConfig::default().with_broad_phase(BroadPhaseKind::Bvh));
        assert_eq!(bvh.kind(), BroadPhaseKind::Bvh);
        assert!(bvh.as_any().downcast_ref::<DynamicBvh>().is_some());
    }

    #[test]
    fn test_both_implementations_find_overlapping_neighbour() {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::ship(Vec2::new(100.0, 100.0), 5.0));
        let b = world.spawn(EntityBuilder::asteroid(Vec2::new(108.0, 100.0), 5.0));
        let c = world.spawn(EntityBuilder::mine(Vec2::new(130.0, 100.0), 2.0));

        for kind in [BroadPhaseKind::Grid, BroadPhaseKind::Bvh] {
            let mut broad_phase = create_broad_phase(&CollisionConfig::default().with_broad_phase(kind));
            for entity in world.iter() {
                broad_phase.insert(entity);
            }
            broad_phase.update(&world);
            assert_eq!(broad_phase.entity_count(), 3);

            let candidates = broad_phase.query(world.get(a).unwrap());
            assert!(candidates.contains(&a), "{kind:?} dropped self");
            assert!(candidates.contains(&b), "{kind:?} missed neighbour");

            let widened = broad_phase.query_reach(world.get(c).unwrap(), 30.0);
            assert!(widened.contains(&b), "{kind:?} reach query missed neighbour");
            if kind == BroadPhaseKind::Bvh {
                // Exact box overlap only without the extra reach
                assert!(!broad_phase.query(world.get(c).unwrap()).contains(&b));
            }

            broad_phase.remove(b);
            assert!(!broad_phase.query(world.get(a).unwrap()).contains(&b));
            broad_phase.clear();
            assert_eq!(broad_phase.entity_count(), 0);
        }
    }
}
