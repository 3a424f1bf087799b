//! Collision scenarios run through full engine ticks
//!
//! Each scenario is checked against both broad phases.

use crate::config::{BroadPhaseKind, CollisionConfig};
use crate::foundation::logging;
use crate::foundation::math::Vec2;
use crate::physics::{CollisionEngine, CollisionEvent};
use crate::world::{EntityBuilder, EntityId, EntityKind, FactionTag, World};
use approx::assert_relative_eq;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const KINDS: [BroadPhaseKind; 2] = [BroadPhaseKind::Grid, BroadPhaseKind::Bvh];

fn engine_for(world: &World, kind: BroadPhaseKind) -> CollisionEngine {
    logging::init_for_tests();
    let mut engine = CollisionEngine::new(CollisionConfig::default().with_broad_phase(kind)).unwrap();
    engine.rebuild(world);
    engine
}

fn contacts_of(events: &[CollisionEvent]) -> Vec<(EntityId, EntityId)> {
    let mut pairs: Vec<_> = events
        .iter()
        .filter_map(|event| match event {
            CollisionEvent::Contact { entity, other, .. } => Some((*entity, *other)),
            _ => None,
        })
        .collect();
    pairs.sort();
    pairs
}

#[test]
fn test_zero_radius_never_contacts() {
    for kind in KINDS {
        let mut world = World::new();
        let solid = world.spawn(EntityBuilder::ship(Vec2::new(300.0, 300.0), 10.0));
        let point = world.spawn(EntityBuilder::ship(Vec2::new(300.0, 300.0), 0.0));
        let spark = world.spawn(EntityBuilder::particle(Vec2::new(302.0, 300.0), Vec2::zeros()));
        let mut engine = engine_for(&world, kind);

        let stats = engine.tick(&mut world, 0.0);
        assert_eq!(stats.contacts, 0, "{kind:?}");
        assert!(contacts_of(&engine.drain_events()).is_empty());
        for id in [solid, point, spark] {
            assert_eq!(world.get(id).unwrap().velocity, Vec2::zeros());
        }
    }
}

#[test]
fn test_touching_circles_contact() {
    // radius 5 at distance 8 touches with penetration 2; at 11 it does not
    for kind in KINDS {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::ship(Vec2::new(100.0, 100.0), 5.0));
        let b = world.spawn(EntityBuilder::ship(Vec2::new(108.0, 100.0), 5.0));
        let c = world.spawn(EntityBuilder::ship(Vec2::new(500.0, 500.0), 5.0));
        let d = world.spawn(EntityBuilder::ship(Vec2::new(511.0, 500.0), 5.0));
        let mut engine = engine_for(&world, kind);

        engine.tick(&mut world, 0.0);
        let events = engine.drain_events();
        assert_eq!(contacts_of(&events), vec![(a, b), (b, a)], "{kind:?}");
        let penetration = events.iter().find_map(|event| match event {
            CollisionEvent::Contact { penetration, .. } => Some(*penetration),
            _ => None,
        });
        assert_relative_eq!(penetration.unwrap(), 2.0);
        assert_eq!(world.get(c).unwrap().velocity, Vec2::zeros());
        assert_eq!(world.get(d).unwrap().velocity, Vec2::zeros());
    }
}

#[test]
fn test_kinetic_same_faction_is_harmless() {
    for kind in KINDS {
        let mut world = World::new();
        let target = world.spawn(
            EntityBuilder::ship(Vec2::new(200.0, 200.0), 8.0)
                .with_faction(FactionTag(3))
                .with_health(10.0),
        );
        let bullet = world.spawn(
            EntityBuilder::projectile(Vec2::new(205.0, 200.0), Vec2::zeros(), 1.0, 4.0).with_faction(FactionTag(3)),
        );
        let mut engine = engine_for(&world, kind);

        let stats = engine.tick(&mut world, 0.0);
        assert_eq!(stats.destroyed, 0, "{kind:?}");
        assert_eq!(world.get(target).unwrap().health, Some(10.0));
        assert!(world.contains(bullet));
        assert!(!engine
            .drain_events()
            .iter()
            .any(|event| matches!(event, CollisionEvent::Damage { .. })));
    }
}

#[test]
fn test_kinetic_damages_other_faction_once() {
    for kind in KINDS {
        let mut world = World::new();
        let target = world.spawn(
            EntityBuilder::ship(Vec2::new(200.0, 200.0), 8.0)
                .with_faction(FactionTag(1))
                .with_health(10.0),
        );
        let bullet = world.spawn(
            EntityBuilder::projectile(Vec2::new(205.0, 200.0), Vec2::zeros(), 1.0, 4.0).with_faction(FactionTag(2)),
        );
        let mut engine = engine_for(&world, kind);

        // The pair is seen from both sides during the tick
        let stats = engine.tick(&mut world, 0.0);
        assert_eq!(stats.contacts, 2, "{kind:?}");
        assert_eq!(world.get(target).unwrap().health, Some(6.0));
        assert!(!world.contains(bullet));

        let events = engine.drain_events();
        let damage: Vec<_> = events
            .iter()
            .filter(|event| matches!(event, CollisionEvent::Damage { .. }))
            .collect();
        assert_eq!(damage, vec![&CollisionEvent::Damage { source: bullet, target, amount: 4.0 }]);

        // Nothing left to hit on the next tick
        engine.tick(&mut world, 0.0);
        assert_eq!(world.get(target).unwrap().health, Some(6.0));
    }
}

#[test]
fn test_kinetic_kill_removes_target() {
    for kind in KINDS {
        let mut world = World::new();
        let target = world.spawn(EntityBuilder::ship(Vec2::new(600.0, 600.0), 8.0).with_health(3.0));
        let bullet = world.spawn(EntityBuilder::projectile(Vec2::new(603.0, 600.0), Vec2::zeros(), 1.0, 5.0));
        let mut engine = engine_for(&world, kind);

        let stats = engine.tick(&mut world, 0.0);
        assert_eq!(stats.destroyed, 2, "{kind:?}");
        assert!(world.is_empty());
        assert_eq!(engine.broad_phase().entity_count(), 0);
        let destroyed: Vec<_> = engine
            .drain_events()
            .into_iter()
            .filter_map(|event| match event {
                CollisionEvent::Destroyed { entity } => Some(entity),
                _ => None,
            })
            .collect();
        assert_eq!(destroyed, vec![target, bullet]);
    }
}

#[test]
fn test_mines_ignore_mines_and_detonate_on_ships() {
    for kind in KINDS {
        let mut world = World::new();
        let mine_a = world.spawn(EntityBuilder::mine(Vec2::new(400.0, 400.0), 3.0));
        let mine_b = world.spawn(EntityBuilder::mine(Vec2::new(404.0, 400.0), 3.0));
        let mut engine = engine_for(&world, kind);

        engine.tick(&mut world, 0.0);
        assert!(world.contains(mine_a) && world.contains(mine_b), "{kind:?}");

        // Inside the 24 unit trigger radius of mine_b only, without touching it
        let ship = world.spawn(EntityBuilder::ship(Vec2::new(425.0, 400.0), 2.0));
        engine.register(&world, ship);
        let stats = engine.tick(&mut world, 0.0);

        assert!(world.contains(mine_a), "{kind:?}");
        assert!(!world.contains(mine_b), "{kind:?}");
        assert!(world.contains(ship));
        assert_eq!(stats.destroyed, 1);
        assert!(engine
            .drain_events()
            .contains(&CollisionEvent::TriggerFired { trigger: mine_b, by: ship }));
    }
}

#[test]
fn test_immovable_is_untouched() {
    for kind in KINDS {
        let mut world = World::new();
        let station = world.spawn(EntityBuilder::station(Vec2::new(512.0, 512.0), 30.0));
        let ship = world.spawn(EntityBuilder::ship(Vec2::new(540.0, 512.0), 5.0));
        let mut engine = engine_for(&world, kind);

        engine.tick(&mut world, 0.0);
        let station = world.get(station).unwrap();
        assert_eq!(station.velocity, Vec2::zeros());
        assert_eq!(station.position, Vec2::new(512.0, 512.0));
        assert_relative_eq!(world.get(ship).unwrap().velocity, Vec2::new(7.0, 0.0));
    }
}

#[test]
fn test_terrain_stacking_only_trades_velocity() {
    for kind in KINDS {
        let mut world = World::new();
        let a = world.spawn(EntityBuilder::asteroid(Vec2::new(700.0, 300.0), 10.0));
        let b = world.spawn(EntityBuilder::asteroid(Vec2::new(715.0, 300.0), 10.0));
        let mut engine = engine_for(&world, kind);

        engine.tick(&mut world, 0.0);
        for (id, start, velocity) in [(a, 700.0, -5.0), (b, 715.0, 5.0)] {
            let rock = world.get(id).unwrap();
            assert_eq!(rock.position, Vec2::new(start, 300.0), "{kind:?}");
            assert_relative_eq!(rock.velocity, Vec2::new(velocity, 0.0));
            let EntityKind::Terrain { spin, .. } = rock.kind else {
                panic!("kind changed");
            };
            assert_relative_eq!(spin.abs(), 0.25);
        }
    }
}

#[test]
fn test_terrain_pushed_by_ship() {
    for kind in KINDS {
        let mut world = World::new();
        let rock = world.spawn(EntityBuilder::asteroid(Vec2::new(300.0, 700.0), 10.0));
        world.spawn(EntityBuilder::ship(Vec2::new(300.0, 712.0), 5.0));
        let mut engine = engine_for(&world, kind);

        engine.tick(&mut world, 0.0);
        let rock = world.get(rock).unwrap();
        assert_relative_eq!(rock.position, Vec2::new(300.0, 697.0));
        assert_relative_eq!(rock.velocity, Vec2::new(0.0, -3.0));
    }
}

#[test]
fn test_grid_and_bvh_agree() {
    fn populate(seed: u64) -> World {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut world = World::new();
        for n in 0..200 {
            let position = Vec2::new(rng.gen_range(100.0..900.0), rng.gen_range(100.0..900.0));
            let radius = rng.gen_range(2.0..12.0);
            let velocity = Vec2::new(rng.gen_range(-30.0..30.0), rng.gen_range(-30.0..30.0));
            let builder = match n % 5 {
                0 => EntityBuilder::mine(position, radius),
                1 => EntityBuilder::projectile(position, velocity, radius, 2.0)
                    .with_faction(FactionTag(rng.gen_range(0..2))),
                2 => EntityBuilder::station(position, radius * 2.0),
                _ => EntityBuilder::ship(position, radius)
                    .with_velocity(velocity)
                    .with_faction(FactionTag(rng.gen_range(0..2)))
                    .with_health(5.0),
            };
            world.spawn(builder);
        }
        world
    }

    // At rest and in motion: entities stepped early must be found where they moved to
    for (seed, delta_time) in [(1, 0.0), (2, 0.0), (3, 0.0), (4, 0.5), (5, 0.5), (6, 0.5)] {
        let mut outcomes = Vec::new();
        for kind in KINDS {
            let mut world = populate(seed);
            let mut engine = engine_for(&world, kind);
            let stats = engine.tick(&mut world, delta_time);
            let events = engine.drain_events();

            let mut fired: Vec<_> = events
                .iter()
                .filter_map(|event| match event {
                    CollisionEvent::TriggerFired { trigger, .. } => Some(*trigger),
                    _ => None,
                })
                .collect();
            fired.sort();
            let mut damaged: Vec<_> = events
                .iter()
                .filter_map(|event| match event {
                    CollisionEvent::Damage { source, target, .. } => Some((*source, *target)),
                    _ => None,
                })
                .collect();
            damaged.sort();
            let survivors: Vec<_> = world.iter().map(|entity| entity.id()).collect();

            outcomes.push((stats.contacts, contacts_of(&events), fired, damaged, survivors));
        }
        assert_eq!(outcomes[0], outcomes[1], "seed {seed}, dt {delta_time}");
    }
}

#[test]
fn test_moving_entities_stay_indexed() {
    for kind in KINDS {
        let mut rng = StdRng::seed_from_u64(77);
        let mut world = World::new();
        for _ in 0..100 {
            let position = Vec2::new(rng.gen_range(0.0..1024.0), rng.gen_range(0.0..1024.0));
            let velocity = Vec2::new(rng.gen_range(-80.0..80.0), rng.gen_range(-80.0..80.0));
            world.spawn(EntityBuilder::ship(position, 4.0).with_velocity(velocity));
        }
        let mut engine = engine_for(&world, kind);

        for _ in 0..30 {
            let stats = engine.tick(&mut world, 1.0 / 60.0);
            assert_eq!(stats.entities_stepped, 100);
        }
        engine.update_broad_phase(&world);
        assert_eq!(engine.broad_phase().entity_count(), 100, "{kind:?}");
        for entity in world.iter() {
            assert!(engine.broad_phase().query(entity).contains(&entity.id()), "{kind:?}");
        }
    }
}
