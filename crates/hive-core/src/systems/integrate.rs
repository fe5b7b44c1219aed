//! Integrator
//!
//! Advances positions by velocity, reflects off the arena walls, updates the
//! smoothed lean state and settles the transform handed to the renderer.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};

use crate::components::{
    Activity, Dead, HeldBy, InstanceTransform, Position, Scale, Smoothing, Stacked, Velocity,
};
use crate::params::{
    ArenaParams, TickClock, BOUNCE_NORMAL_FACTOR, BOUNCE_TANGENT_DAMPING, EPSILON,
};

use super::{AnyBee, AnyResource};

/// Tint applied to dead bees
pub const DEAD_TINT: f32 = 0.75;

/// Clamp `position` into `[-limit, limit]` per axis, bouncing `velocity`
///
/// On each axis that is out of bounds the normal component is reversed and
/// halved and the two tangential components are damped.
pub fn reflect_into_bounds(position: &mut Vec3, velocity: &mut Vec3, limit: Vec3) {
    for axis in 0..3 {
        if position[axis].abs() > limit[axis] {
            position[axis] = limit[axis].copysign(position[axis]);
            velocity[axis] *= BOUNCE_NORMAL_FACTOR;
            for other in (0..3).filter(|&o| o != axis) {
                velocity[other] *= BOUNCE_TANGENT_DAMPING;
            }
        }
    }
}

/// Rotation that looks along `direction`, keeping `previous` for a zero direction
pub fn look_rotation(direction: Vec3, previous: Quat) -> Quat {
    if direction.length_squared() > EPSILON * EPSILON {
        Quat::from_rotation_arc(Vec3::Z, direction.normalize())
    } else {
        previous
    }
}

/// Integrate every bee and settle its transform
pub fn integrate_bees(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    mut bees: Query<
        (
            &mut Position,
            &mut Velocity,
            &mut Smoothing,
            &mut InstanceTransform,
            &Activity,
            &Scale,
            Has<Dead>,
        ),
        AnyBee,
    >,
) {
    let dt = clock.dt;
    let half = params.half_extents();
    let lean = (params.rotation_stiffness * dt).min(1.0);

    bees.par_iter_mut().for_each(
        |(mut position, mut velocity, mut smoothing, mut transform, activity, scale, dead)| {
            let mut pos = position.0 + velocity.0 * dt;
            let mut vel = velocity.0;

            // Carriers lose one resource size of headroom at floor and ceiling.
            let mut limit = half;
            if *activity == Activity::Carrying {
                limit.y -= params.resource_size;
            }
            reflect_into_bounds(&mut pos, &mut vel, limit);

            position.0 = pos;
            velocity.0 = vel;

            let previous = smoothing.position;
            smoothing.position = if *activity == Activity::Attacking {
                previous.lerp(pos, lean)
            } else {
                pos
            };
            let delta = smoothing.position - previous;
            if delta.length() > EPSILON {
                smoothing.direction = delta.normalize();
            }

            transform.translation = pos;
            transform.rotation = look_rotation(smoothing.direction, transform.rotation);
            transform.scale = scale.0;
            transform.tint = if dead { DEAD_TINT } else { 1.0 };
        },
    );
}

/// Integrate falling resources and settle every resource transform
pub fn integrate_resources(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    mut resources: Query<
        (
            &mut Position,
            &mut Velocity,
            &mut InstanceTransform,
            &Scale,
            Has<Stacked>,
            Has<HeldBy>,
        ),
        AnyResource,
    >,
) {
    let dt = clock.dt;
    let half = params.half_extents();

    resources.par_iter_mut().for_each(
        |(mut position, mut velocity, mut transform, scale, stacked, held)| {
            if !stacked && !held {
                let mut pos = position.0 + velocity.0 * dt;
                let mut vel = velocity.0;
                reflect_into_bounds(&mut pos, &mut vel, half);
                position.0 = pos;
                velocity.0 = vel;
            }
            transform.translation = position.0;
            transform.scale = scale.0;
        },
    );
}
