//! Spawner Components
//!
//! One-shot spawn requests. The spawn pass consumes each request once and
//! queues its removal.

use bevy_ecs::prelude::*;

/// Marker for an entity that issues spawn requests
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Spawner;

/// Spawn `count` bees, alternating teams
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BeeSpawnRequest {
    pub count: u32,
}

/// Drop `count` resources into the arena
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceSpawnRequest {
    pub count: u32,
}
