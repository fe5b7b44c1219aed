//! Arena Parameters
//!
//! The immutable per-simulation singleton every pass reads. Built once from a
//! [`SimConfig`], with ranges pre-squared and the resource grid derived from
//! the field size.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};

use crate::config::SimConfig;
use crate::error::ConfigError;
use crate::grid::GridGeometry;

/// Fraction of the field half-width beyond which a landing resource is a hive delivery
pub const HIVE_ZONE_FRACTION: f32 = 0.4;
/// Fraction of the field width at which carriers aim to drop resources
pub const HIVE_TARGET_FRACTION: f32 = 0.45;
/// Distance from the hive point at which a carrier lets go
pub const DROP_DISTANCE: f32 = 1.0;
/// Factor applied to the two tangential velocity components on a wall bounce
pub const BOUNCE_TANGENT_DAMPING: f32 = 0.8;
/// Factor applied to the normal velocity component on a wall bounce
pub const BOUNCE_NORMAL_FACTOR: f32 = -0.5;
/// Lengths below this are treated as zero
pub const EPSILON: f32 = 1e-5;

/// Per-simulation arena parameters
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct ArenaParams {
    /// Full arena extents
    pub field_size: Vec3,
    pub gravity: f32,
    pub flight_jitter: f32,
    pub damping: f32,
    pub team_attraction: f32,
    pub team_repulsion: f32,
    pub aggression: f32,
    pub chase_force: f32,
    pub carry_force: f32,
    pub attack_force: f32,
    pub grab_distance_sq: f32,
    pub attack_distance_sq: f32,
    pub hit_distance_sq: f32,
    pub death_duration: f32,
    pub min_bee_size: f32,
    pub max_bee_size: f32,
    pub max_spawn_speed: f32,
    pub speed_stretch: f32,
    pub rotation_stiffness: f32,
    pub resource_size: f32,
    pub snap_stiffness: f32,
    pub carry_stiffness: f32,
    pub bees_per_resource: u32,
    pub team_colors: [[f32; 4]; 2],
    pub grid: GridGeometry,
}

impl ArenaParams {
    /// Validate a configuration and derive the runtime parameters from it
    pub fn from_config(config: &SimConfig) -> Result<Self, ConfigError> {
        let bees = &config.bees;
        let res = &config.resources;
        let field_size = Vec3::from_array(config.field.size);

        if !(field_size.cmpgt(Vec3::ZERO).all() && field_size.is_finite()) {
            return Err(ConfigError::invalid("field.size", "every extent must be positive"));
        }
        if !(config.simulation.dt > 0.0 && config.simulation.dt.is_finite()) {
            return Err(ConfigError::invalid("simulation.dt", "timestep must be positive"));
        }
        if !(0.0..=1.0).contains(&bees.aggression) {
            return Err(ConfigError::invalid("bees.aggression", "must lie in [0, 1]"));
        }
        if !(0.0..=1.0).contains(&bees.damping) {
            return Err(ConfigError::invalid("bees.damping", "must lie in [0, 1]"));
        }
        if bees.min_size <= 0.0 || bees.min_size > bees.max_size {
            return Err(ConfigError::invalid(
                "bees.min_size",
                format!("need 0 < min_size <= max_size, got {} and {}", bees.min_size, bees.max_size),
            ));
        }
        if bees.death_duration < 0.0 {
            return Err(ConfigError::invalid("bees.death_duration", "cannot be negative"));
        }
        if bees.hit_distance > bees.attack_distance {
            return Err(ConfigError::invalid(
                "bees.hit_distance",
                "must not exceed attack_distance",
            ));
        }
        if res.size <= 0.0 {
            return Err(ConfigError::invalid("resources.size", "must be positive"));
        }

        let grid = GridGeometry::for_field(Vec2::new(field_size.x, field_size.z), res.size);

        Ok(Self {
            field_size,
            gravity: config.field.gravity,
            flight_jitter: bees.flight_jitter,
            damping: bees.damping,
            team_attraction: bees.team_attraction,
            team_repulsion: bees.team_repulsion,
            aggression: bees.aggression,
            chase_force: bees.chase_force,
            carry_force: bees.carry_force,
            attack_force: bees.attack_force,
            grab_distance_sq: bees.grab_distance * bees.grab_distance,
            attack_distance_sq: bees.attack_distance * bees.attack_distance,
            hit_distance_sq: bees.hit_distance * bees.hit_distance,
            death_duration: bees.death_duration,
            min_bee_size: bees.min_size,
            max_bee_size: bees.max_size,
            max_spawn_speed: bees.max_spawn_speed,
            speed_stretch: bees.speed_stretch,
            rotation_stiffness: bees.rotation_stiffness,
            resource_size: res.size,
            snap_stiffness: res.snap_stiffness,
            carry_stiffness: res.carry_stiffness,
            bees_per_resource: res.bees_per_resource,
            team_colors: bees.team_colors,
            grid,
        })
    }

    /// Half of the arena extents; positions are kept inside `[-half, half]`
    pub fn half_extents(&self) -> Vec3 {
        self.field_size * 0.5
    }

    /// Height of the arena floor resources stack on
    pub fn floor_height(&self) -> f32 {
        -0.5 * self.field_size.y
    }
}

/// Current tick number and fixed timestep
#[derive(Resource, Debug, Clone, Copy, PartialEq)]
pub struct TickClock {
    pub tick: u64,
    pub dt: f32,
}

impl TickClock {
    pub fn new(dt: f32) -> Self {
        Self { tick: 0, dt }
    }
}

impl Default for ArenaParams {
    fn default() -> Self {
        // The default config always validates.
        Self::from_config(&SimConfig::default()).unwrap_or_else(|e| unreachable!("{e}"))
    }
}
