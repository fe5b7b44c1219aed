//! Resource Motion
//!
//! Held resources hang below their carrier; falling resources drift toward
//! the centre of their grid cell and accumulate gravity. Stacked resources
//! are at rest and never visited.

use bevy_ecs::prelude::*;
use glam::Vec3;

use crate::components::{Bee, HeldBy, Position, Stacked, Velocity};
use crate::grid::GridCell;
use crate::params::{ArenaParams, TickClock};

use super::{AnyResource, LiveBee};

/// Carried update for held resources, snap and gravity for falling ones
pub fn move_resources(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    holders: Query<(&Position, &Velocity, &Bee), LiveBee>,
    mut resources: Query<
        (&mut Position, &mut Velocity, &mut GridCell, Option<&HeldBy>),
        (AnyResource, Without<Stacked>),
    >,
) {
    let dt = clock.dt;
    let carry = (params.carry_stiffness * dt).min(1.0);
    let snap = (params.snap_stiffness * dt).min(1.0);
    let half = params.half_extents();

    resources
        .par_iter_mut()
        .for_each(|(mut position, mut velocity, mut cell, held_by)| {
            if let Some(Ok((holder_pos, holder_vel, bee))) = held_by.map(|h| holders.get(h.0)) {
                let hang = holder_pos.0 - Vec3::Y * (params.resource_size + bee.size) * 0.5;
                let hang = hang.clamp(-half, half);
                position.0 = position.0.lerp(hang, carry);
                velocity.0 = holder_vel.0;
            } else {
                // A dead or vanished holder is released by the lifecycle
                // passes; until then the resource falls like any other.
                let coord = params.grid.cell_of(position.0);
                let centre = params.grid.cell_center(coord);
                let snapped = Vec3::new(centre.x, position.0.y, centre.y);
                position.0 = position.0.lerp(snapped, snap);
                velocity.0.y += params.gravity * dt;
                cell.index = params.grid.index_of(coord);
            }
        });
}
