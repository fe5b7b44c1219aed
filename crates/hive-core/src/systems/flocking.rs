//! Flocking System
//!
//! Local interaction forces for live bees: jitter, damping, and attraction to
//! and repulsion from two independently sampled teammates. Dead bees only
//! fall.

use bevy_ecs::prelude::*;

use crate::components::{Activity, Bee, Position, Target, Velocity};
use crate::params::{ArenaParams, TickClock, EPSILON};
use crate::rng::{inside_unit_sphere, RngLane, TickRng};

use super::{DeadBee, LiveBee, TeamBuckets};

/// Accumulate flocking forces into live bee velocities
pub fn apply_flocking(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    tick_rng: Res<TickRng>,
    buckets: Res<TeamBuckets>,
    positions: Query<&Position, LiveBee>,
    mut bees: Query<(Entity, &Bee, &Position, &mut Velocity), LiveBee>,
) {
    let dt = clock.dt;
    bees.par_iter_mut().for_each(|(entity, bee, position, mut velocity)| {
        let mut rng = tick_rng.stream(RngLane::Flocking, entity);
        let mut v = velocity.0;

        v += inside_unit_sphere(&mut rng) * (params.flight_jitter * dt);
        v *= 1.0 - params.damping;

        let attract = buckets.pick(bee.team, &mut rng);
        let repel = buckets.pick(bee.team, &mut rng);

        if let Some(Ok(ally)) = attract.map(|e| positions.get(e)) {
            let delta = ally.0 - position.0;
            let dist = delta.length();
            if dist > EPSILON {
                v += delta * (params.team_attraction * dt / dist);
            }
        }
        if let Some(Ok(ally)) = repel.map(|e| positions.get(e)) {
            let delta = ally.0 - position.0;
            let dist = delta.length();
            if dist > EPSILON {
                v -= delta * (params.team_repulsion * dt / dist);
            }
        }

        velocity.0 = v;
    });
}

/// Dead bees drop their intent and accumulate gravity
pub fn apply_dead_gravity(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    mut bees: Query<(&mut Velocity, &mut Target, &mut Activity), DeadBee>,
) {
    let fall = params.gravity * clock.dt;
    bees.par_iter_mut().for_each(|(mut velocity, mut target, mut activity)| {
        velocity.0.y += fall;
        if !target.is_none() {
            *target = Target::None;
        }
        if *activity != Activity::Idle {
            *activity = Activity::Idle;
        }
    });
}
