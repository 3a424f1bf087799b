//! Asteroid Field Demo
//!
//! Headless simulation of a crowded asteroid field driving the collision
//! engine on a fixed step:
//! - Ships from two factions drifting through the field and firing volleys
//! - Asteroids tumbling off each other and off ships
//! - Mines that detonate when anything but another mine comes close
//! - A station nothing can move, and particles nothing can hit
//!
//! Usage: `asteroid_field [config.toml | config.ron] [ticks]`

use collision_engine::foundation::logging;
use collision_engine::prelude::*;
use collision_engine::spatial::DynamicBvh;
use nalgebra::Rotation2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

// Population
const NUM_SHIPS: usize = 24;
const NUM_ASTEROIDS: usize = 120;
const NUM_MINES: usize = 30;
const NUM_PARTICLES: usize = 40;

// Bodies
const SHIP_RADIUS: f32 = 6.0;
const SHIP_SPEED: f32 = 40.0;
const SHIP_HEALTH: f32 = 10.0;
const ASTEROID_MIN_RADIUS: f32 = 4.0;
const ASTEROID_MAX_RADIUS: f32 = 16.0;
const ASTEROID_SPEED: f32 = 25.0;
const MINE_RADIUS: f32 = 3.0;
const STATION_RADIUS: f32 = 40.0;

// Weapons
const BULLET_RADIUS: f32 = 1.0;
const BULLET_SPEED: f32 = 160.0;
const BULLET_DAMAGE: f32 = 4.0;
const BULLET_SPREAD: f32 = 0.15;
const BULLET_LIFETIME_TICKS: u64 = 90;
const FIRE_INTERVAL_TICKS: u64 = 30;

// Simulation
const TICK_RATE: f32 = 60.0;
const DEFAULT_TICKS: u64 = 600;
const REPORT_INTERVAL_TICKS: u64 = 60;
const FIELD_SEED: u64 = 0xa57e;

/// Running totals drawn from the engine's event stream
#[derive(Debug, Default)]
struct Totals {
    contacts: usize,
    detonations: usize,
    hits: usize,
    damage: f32,
    destroyed: usize,
}

struct AsteroidField {
    world: World,
    engine: CollisionEngine,
    rng: StdRng,
    clock: FixedTimestep,
    timer: Timer,
    tick: u64,
    world_size: f32,
    ships: Vec<EntityId>,
    bullets: HashMap<EntityId, u64>,
    totals: Totals,
}

impl AsteroidField {
    fn new(config: CollisionConfig) -> Result<Self, ConfigError> {
        let world_size = config.world_size;
        let engine = CollisionEngine::new(config)?;
        Ok(Self {
            world: World::new(),
            engine,
            rng: StdRng::seed_from_u64(FIELD_SEED),
            clock: FixedTimestep::new(1.0 / TICK_RATE),
            timer: Timer::new(),
            tick: 0,
            world_size,
            ships: Vec::new(),
            bullets: HashMap::new(),
            totals: Totals::default(),
        })
    }

    fn spawn(&mut self, builder: EntityBuilder) -> EntityId {
        let id = self.world.spawn(builder);
        self.engine.register(&self.world, id);
        id
    }

    fn random_position(&mut self) -> Vec2 {
        Vec2::new(
            self.rng.gen_range(0.0..self.world_size),
            self.rng.gen_range(0.0..self.world_size),
        )
    }

    fn random_velocity(&mut self, speed: f32) -> Vec2 {
        let angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
        Rotation2::new(angle) * Vec2::new(self.rng.gen_range(0.2..1.0) * speed, 0.0)
    }

    fn populate(&mut self) {
        let center = Vec2::new(self.world_size * 0.5, self.world_size * 0.5);
        self.spawn(EntityBuilder::station(center, STATION_RADIUS));

        for n in 0..NUM_SHIPS {
            let position = self.random_position();
            let velocity = self.random_velocity(SHIP_SPEED);
            let faction = FactionTag((n % 2) as u16);
            let id = self.spawn(
                EntityBuilder::ship(position, SHIP_RADIUS)
                    .with_velocity(velocity)
                    .with_faction(faction)
                    .with_health(SHIP_HEALTH),
            );
            self.ships.push(id);
        }

        for _ in 0..NUM_ASTEROIDS {
            let position = self.random_position();
            let velocity = self.random_velocity(ASTEROID_SPEED);
            let radius = self.rng.gen_range(ASTEROID_MIN_RADIUS..ASTEROID_MAX_RADIUS);
            self.spawn(EntityBuilder::asteroid(position, radius).with_velocity(velocity));
        }

        for _ in 0..NUM_MINES {
            let position = self.random_position();
            self.spawn(EntityBuilder::mine(position, MINE_RADIUS));
        }

        for _ in 0..NUM_PARTICLES {
            let position = self.random_position();
            let velocity = self.random_velocity(SHIP_SPEED * 2.0);
            self.spawn(EntityBuilder::particle(position, velocity));
        }

        log::info!(
            "Populated field: {} entities in a {}x{} world",
            self.world.len(),
            self.world_size,
            self.world_size
        );
    }

    /// Every surviving ship fires one bullet along its heading
    fn fire_volley(&mut self) {
        let tick = self.tick;
        self.ships.retain(|id| self.world.contains(*id));
        let shooters: Vec<(Vec2, Vec2, Option<FactionTag>)> = self
            .ships
            .iter()
            .filter_map(|id| self.world.get(*id))
            .map(|ship| (ship.position, ship.velocity, ship.faction))
            .collect();

        for (position, velocity, faction) in shooters {
            let spread = self.rng.gen_range(-BULLET_SPREAD..BULLET_SPREAD);
            let heading = Rotation2::new(spread) * velocity.try_normalize(1.0e-6).unwrap_or_else(Vec2::x);
            let muzzle = position + heading * (SHIP_RADIUS + BULLET_RADIUS * 2.0);
            let mut bullet = EntityBuilder::projectile(muzzle, heading * BULLET_SPEED, BULLET_RADIUS, BULLET_DAMAGE);
            if let Some(faction) = faction {
                bullet = bullet.with_faction(faction);
            }
            let id = self.spawn(bullet);
            self.bullets.insert(id, tick);
        }
    }

    /// Retire bullets past their lifetime; the next tick's sweep removes them
    fn expire_bullets(&mut self) {
        let tick = self.tick;
        let world = &mut self.world;
        self.bullets.retain(|id, fired| {
            if !world.contains(*id) {
                return false;
            }
            if tick - *fired > BULLET_LIFETIME_TICKS {
                world.schedule_destroy(*id);
                return false;
            }
            true
        });
    }

    /// The field is a torus: anything leaving one edge re-enters at the other
    fn wrap_positions(&mut self) {
        let size = self.world_size;
        for entity in self.world.iter_mut() {
            entity.position = entity.position.map(|c| c.rem_euclid(size));
        }
    }

    fn drain_events(&mut self) {
        for event in self.engine.drain_events() {
            match event {
                CollisionEvent::Contact { .. } => self.totals.contacts += 1,
                CollisionEvent::TriggerFired { trigger, by } => {
                    self.totals.detonations += 1;
                    log::info!("Mine {trigger} detonated by {by}");
                }
                CollisionEvent::Damage { amount, .. } => {
                    self.totals.hits += 1;
                    self.totals.damage += amount;
                }
                CollisionEvent::Destroyed { .. } => self.totals.destroyed += 1,
            }
        }
    }

    fn step(&mut self) {
        let stats = self.engine.tick(&mut self.world, self.clock.step());
        self.tick += 1;
        self.drain_events();
        self.wrap_positions();

        let tick = self.tick;
        if tick % FIRE_INTERVAL_TICKS == 0 {
            self.fire_volley();
        }
        self.expire_bullets();
        if tick % REPORT_INTERVAL_TICKS == 0 {
            self.report(tick, stats);
        }
    }

    fn report(&mut self, tick: u64, stats: TickStats) {
        self.timer.update();
        log::info!(
            "tick {tick}: {} entities, {} candidates, {} contacts ({:.1} ms since last report)",
            self.world.len(),
            stats.candidate_pairs,
            stats.contacts,
            self.timer.delta_time() * 1000.0
        );

        if let Some(tree) = self.engine.broad_phase().as_any().downcast_ref::<DynamicBvh>() {
            log::info!(
                "  bvh: {} leaves, {} nodes, height {}, capacity {}",
                tree.leaf_count(),
                tree.node_count(),
                tree.height(),
                tree.capacity()
            );
            if let Err(e) = tree.validate() {
                log::error!("  bvh invariant broken: {e}");
            }
        } else if let Some(grid) = self.engine.broad_phase().as_any().downcast_ref::<SpatialGrid>() {
            let divisions = grid.divisions();
            let busiest = (0..divisions)
                .flat_map(|cy| (0..divisions).map(move |cx| (cx, cy)))
                .map(|(cx, cy)| grid.bucket(cx, cy).len())
                .max()
                .unwrap_or(0);
            log::info!("  grid: {} entries, busiest cell holds {busiest}", grid.entity_count());
        }
    }

    fn run(&mut self, ticks: u64) {
        while self.tick < ticks {
            // Jittered frame times, as a real frame loop would produce
            let frame = self.rng.gen_range(0.5..1.5) / TICK_RATE;
            let steps = self.clock.advance(frame);
            for _ in 0..steps {
                if self.tick >= ticks {
                    break;
                }
                self.step();
            }
        }

        log::info!(
            "Finished {} ticks: {} contacts, {} detonations, {} hits for {:.0} damage, {} destroyed, {} entities left",
            self.tick,
            self.totals.contacts,
            self.totals.detonations,
            self.totals.hits,
            self.totals.damage,
            self.totals.destroyed,
            self.world.len()
        );
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => {
            log::info!("Loading collision config from {path}");
            CollisionConfig::load_from_file(&path)?
        }
        None => CollisionConfig::default(),
    };
    let ticks = match args.next() {
        Some(ticks) => ticks.parse()?,
        None => DEFAULT_TICKS,
    };

    let mut field = AsteroidField::new(config)?;
    field.populate();
    field.run(ticks);
    Ok(())
}
