//! # Wander Simulation
//!
//! A small deterministic ecosystem for demos, benchmarks and tests:
//! creatures wander inside a disc, occasionally die and leave corpses that
//! decay away, plants grow. Every death is replaced by a birth so the
//! population size stays constant.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use verdant_shared::{
    Activity, CorpseTraits, CreatureTraits, Diet, EntityId, EntityRecord, Habitat, PlantTraits,
    RemovedIds, Snapshot, Traits, Vec3,
};

use crate::sim_link::Simulation;

/// Population parameters, loadable from the `[demo]` table of a config file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// RNG seed.
    pub seed: u64,
    /// Live creatures.
    pub creatures: u32,
    /// Plants.
    pub plants: u32,
    /// Radius of the world disc.
    pub world_radius: f32,
    /// Chance per creature per simulated second of dying.
    pub death_rate: f32,
    /// Seconds for a corpse to decay completely.
    pub decay_seconds: f32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            creatures: 2_000,
            plants: 4_000,
            world_radius: 400.0,
            death_rate: 0.01,
            decay_seconds: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Creature {
    id: EntityId,
    position: Vec3,
    velocity: Vec3,
    size: f32,
    traits: CreatureTraits,
}

#[derive(Debug, Clone, Copy)]
struct Corpse {
    id: EntityId,
    position: Vec3,
    size: f32,
    toxicity: f32,
    decay: f32,
}

/// Deterministic wandering population.
#[derive(Debug)]
pub struct WanderSimulation {
    config: DemoConfig,
    rng: ChaCha8Rng,
    tick: u64,
    creatures: Vec<Creature>,
    plants: Vec<EntityRecord>,
    corpses: Vec<Corpse>,
    next_creature: EntityId,
    next_corpse: EntityId,
}

impl WanderSimulation {
    /// Seeds the world.
    #[must_use]
    pub fn new(config: DemoConfig) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let radius = config.world_radius.max(1.0);

        let plants = (0..config.plants)
            .map(|id| {
                let habitat = if rng.gen_bool(0.25) { Habitat::Water } else { Habitat::Land };
                let traits = PlantTraits {
                    habitat,
                    hue: rng.gen_range(0.2..0.45),
                    maturity: rng.gen_range(0.1..1.0),
                };
                EntityRecord::new(id, random_point(&mut rng, radius), rng.gen_range(0.5..2.0), Traits::Plant(traits))
            })
            .collect();

        let mut sim = Self {
            rng,
            tick: 0,
            creatures: Vec::with_capacity(config.creatures as usize),
            plants,
            corpses: Vec::new(),
            next_creature: 0,
            next_corpse: 0,
            config,
        };
        for _ in 0..sim.config.creatures {
            sim.spawn_creature();
        }
        sim
    }

    /// Steps completed.
    #[must_use]
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Live creature count.
    #[must_use]
    pub fn creature_count(&self) -> usize {
        self.creatures.len()
    }

    /// Corpse count.
    #[must_use]
    pub fn corpse_count(&self) -> usize {
        self.corpses.len()
    }

    fn radius(&self) -> f32 {
        self.config.world_radius.max(1.0)
    }

    fn spawn_creature(&mut self) {
        let radius = self.radius();
        let rng = &mut self.rng;
        let diet = match rng.gen_range(0..3) {
            0 => Diet::Herbivore,
            1 => Diet::Carnivore,
            _ => Diet::Omnivore,
        };
        let traits = CreatureTraits {
            diet,
            hue: rng.gen(),
            limbs: rng.gen_range(0..=8),
            eyes: rng.gen_range(1..=6),
            speed: rng.gen(),
            aggression: rng.gen(),
            activity: Activity::Moving,
        };
        let heading: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        let velocity = Vec3::new(heading.sin(), 0.0, heading.cos()) * (2.0 + 8.0 * traits.speed);
        let creature = Creature {
            id: self.next_creature,
            position: random_point(rng, radius),
            velocity,
            size: rng.gen_range(0.5..1.5),
            traits,
        };
        self.next_creature += 1;
        self.creatures.push(creature);
    }

    fn snapshot(&self, removed: RemovedIds) -> Snapshot {
        let creatures = self.creatures.iter().map(|c| {
            EntityRecord::new(c.id, c.position, c.size, Traits::Creature(c.traits)).with_velocity(c.velocity)
        });
        let corpses = self.corpses.iter().map(|c| {
            let traits = CorpseTraits { toxicity: c.toxicity, decay: c.decay };
            EntityRecord::new(c.id, c.position, c.size, Traits::Corpse(traits))
        });
        let records: Vec<EntityRecord> = creatures.chain(self.plants.iter().copied()).chain(corpses).collect();
        Snapshot::from_records(self.tick, &records).with_removed(removed)
    }
}

impl Simulation for WanderSimulation {
    fn step(&mut self, elapsed: f32) -> Snapshot {
        let dt = if elapsed.is_finite() { elapsed.max(0.0) } else { 0.0 };
        self.tick += 1;
        let mut removed = RemovedIds::default();
        let radius = self.radius();
        let death_chance = f64::from((self.config.death_rate * dt).clamp(0.0, 1.0));
        let decay_step = dt / self.config.decay_seconds.max(f32::EPSILON);

        // Corpses
        self.corpses.retain_mut(|corpse| {
            corpse.decay += decay_step;
            if corpse.decay >= 1.0 {
                removed.corpses.push(corpse.id);
                false
            } else {
                true
            }
        });

        // Creatures
        let rng = &mut self.rng;
        let mut dead = Vec::new();
        for creature in &mut self.creatures {
            if rng.gen_bool(death_chance) {
                dead.push(*creature);
                continue;
            }
            let turn: f32 = rng.gen_range(-0.5..0.5) * dt;
            let (sin, cos) = turn.sin_cos();
            let v = creature.velocity;
            creature.velocity = Vec3::new(v.x * cos - v.z * sin, 0.0, v.x * sin + v.z * cos);
            creature.position = creature.position + creature.velocity * dt;
            if creature.position.length() > radius {
                creature.velocity = creature.velocity * -1.0;
                creature.position = creature.position.normalize_or_zero() * radius;
            }
            creature.traits.activity = match rng.gen_range(0..100) {
                0..=2 => Activity::Eating,
                3 => Activity::Attacking,
                4 => Activity::Mating,
                5..=14 => Activity::Idle,
                _ => Activity::Moving,
            };
        }
        self.creatures.retain(|c| !dead.iter().any(|d| d.id == c.id));

        for body in &dead {
            removed.creatures.push(body.id);
            let toxicity = match body.traits.diet {
                Diet::Carnivore => 0.6 + 0.4 * body.traits.aggression,
                _ => 0.4 * body.traits.aggression,
            };
            self.corpses.push(Corpse {
                id: self.next_corpse,
                position: body.position,
                size: body.size,
                toxicity,
                decay: 0.0,
            });
            self.next_corpse += 1;
        }
        for _ in 0..dead.len() {
            self.spawn_creature();
        }

        // Plants
        let growth = dt * 0.01;
        for plant in &mut self.plants {
            if let Traits::Plant(traits) = &mut plant.traits {
                traits.maturity = (traits.maturity + growth).min(1.0);
            }
        }

        self.snapshot(removed)
    }
}

fn random_point(rng: &mut ChaCha8Rng, radius: f32) -> Vec3 {
    let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
    let distance = radius * rng.gen::<f32>().sqrt();
    Vec3::new(angle.cos() * distance, 0.0, angle.sin() * distance)
}
