//! Per-Tick Random Streams
//!
//! One seed per run, advanced by the tick counter. Each pass draws from a
//! stream derived from (seed, tick, lane, entity), so parallel work-items never
//! share a sequence and replays with the same seed are bit-identical.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Separates the streams of passes that visit the same entity in one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum RngLane {
    Spawn = 1,
    Flocking = 2,
    Decision = 3,
    Hatch = 4,
    Scatter = 5,
}

/// Seeded random source for the current tick
#[derive(Resource, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickRng {
    seed: u64,
    tick: u64,
}

impl TickRng {
    pub fn new(seed: u64) -> Self {
        Self { seed, tick: 0 }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Move to the given tick; every stream changes with it
    pub fn set_tick(&mut self, tick: u64) {
        self.tick = tick;
    }

    /// Independent stream for one entity in one pass
    pub fn stream(&self, lane: RngLane, entity: Entity) -> SmallRng {
        self.stream_for_key(lane, entity.to_bits())
    }

    /// Independent stream keyed by an arbitrary value (e.g. a spawn ordinal)
    pub fn stream_for_key(&self, lane: RngLane, key: u64) -> SmallRng {
        let mut h = splitmix64(self.seed);
        h = splitmix64(h ^ self.tick);
        h = splitmix64(h ^ lane as u64);
        h = splitmix64(h ^ key);
        SmallRng::seed_from_u64(h)
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Uniform sample from the unit ball
pub fn inside_unit_sphere(rng: &mut impl Rng) -> Vec3 {
    loop {
        let v = Vec3::new(
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
            rng.gen_range(-1.0..=1.0),
        );
        if v.length_squared() <= 1.0 {
            return v;
        }
    }
}
