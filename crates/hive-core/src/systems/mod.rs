//! ECS Systems
//!
//! One module per pass family: spawning, team buckets, flocking, resource
//! motion, behaviour decisions, stacking, lifecycle, visual state and
//! integration.

use bevy_ecs::prelude::*;

use crate::components::{Bee, Dead, ResourceItem};

pub mod behavior;
pub mod buckets;
pub mod flocking;
pub mod integrate;
pub mod lifecycle;
pub mod resources;
pub mod spawn;
pub mod stacking;
pub mod visual;

pub use behavior::decide;
pub use buckets::{rebuild_team_buckets, ForageCandidates, TeamBuckets};
pub use flocking::{apply_dead_gravity, apply_flocking};
pub use integrate::{integrate_bees, integrate_resources};
pub use lifecycle::{advance_death_timers, release_orphaned_resources};
pub use resources::move_resources;
pub use spawn::spawn_requests;
pub use stacking::{count_stacks, mark_stack_tops, place_resources};
pub use visual::update_visual_scale;

// The `Without`/`With` pairs keep bee and resource queries provably disjoint,
// so passes over the two kinds can share a stage.

/// Filter for bees that are still alive
pub type LiveBee = (With<Bee>, Without<Dead>, Without<ResourceItem>);
/// Filter for killed bees awaiting removal
pub type DeadBee = (With<Bee>, With<Dead>, Without<ResourceItem>);
/// Filter for every bee
pub type AnyBee = (With<Bee>, Without<ResourceItem>);
/// Filter for every resource
pub type AnyResource = (With<ResourceItem>, Without<Bee>);
