//! Visual State
//!
//! Live bees stretch along their direction of travel; dead bees shrink as
//! their death timer runs out.

use bevy_ecs::prelude::*;
use glam::Vec3;

use crate::components::{Bee, Dead, Scale, Velocity};
use crate::params::ArenaParams;

use super::AnyBee;

/// Scale of a bee given its speed and death state
pub fn bee_scale(params: &ArenaParams, size: f32, velocity: Vec3, dead: Option<&Dead>) -> Vec3 {
    match dead {
        None => {
            let stretch = (velocity.length() * params.speed_stretch).max(1.0);
            let squash = (stretch - 1.0) / 5.0 + 1.0;
            Vec3::new(size / squash, size / squash, size * stretch)
        }
        Some(dead) => {
            let remaining = if params.death_duration > 0.0 {
                (1.0 - dead.elapsed / params.death_duration).max(0.0)
            } else {
                0.0
            };
            Vec3::splat(size * remaining.sqrt())
        }
    }
}

/// Update the non-uniform scale of every bee
pub fn update_visual_scale(
    params: Res<ArenaParams>,
    mut bees: Query<(&Bee, &Velocity, Option<&Dead>, &mut Scale), AnyBee>,
) {
    bees.par_iter_mut().for_each(|(bee, velocity, dead, mut scale)| {
        scale.0 = bee_scale(&params, bee.size, velocity.0, dead);
    });
}
