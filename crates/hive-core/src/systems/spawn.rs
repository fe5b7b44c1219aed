//! Spawn System
//!
//! Consumes one-shot spawn requests. Every new entity is queued as a deferred
//! create and the request itself is queued for removal, so a request is
//! processed exactly once.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use crate::blueprint::Blueprint;
use crate::components::{BeeSpawnRequest, ResourceSpawnRequest, TeamId};
use crate::mutation::{ComponentKind, MutationLane, MutationQueue};
use crate::params::ArenaParams;
use crate::rng::{inside_unit_sphere, RngLane, TickRng};

/// Blueprint of a freshly spawned bee at a hive position
pub fn random_bee(params: &ArenaParams, team: TeamId, position: Vec3, rng: &mut impl Rng) -> Blueprint {
    Blueprint::Bee {
        team,
        size: rng.gen_range(params.min_bee_size..=params.max_bee_size),
        position,
        velocity: inside_unit_sphere(rng) * params.max_spawn_speed,
    }
}

/// Hive spawn point for a team
pub fn hive_spawn_point(params: &ArenaParams, team: TeamId) -> Vec3 {
    let width = params.field_size.x;
    Vec3::new(-width * 0.4 + width * 0.8 * team.index() as f32, 0.0, 0.0)
}

/// Starting position of a scattered resource, biased toward the middle
pub fn random_resource_position(params: &ArenaParams, rng: &mut impl Rng) -> Vec3 {
    let grid = &params.grid;
    let span_x = grid.cell_size.x * grid.counts[0] as f32;
    let span_z = grid.cell_size.y * grid.counts[1] as f32;
    Vec3::new(
        (grid.min_corner.x + rng.gen::<f32>() * span_x) * 0.25,
        rng.gen::<f32>() * 10.0,
        grid.min_corner.y + rng.gen::<f32>() * span_z,
    )
}

/// Turn pending spawn requests into deferred creates
///
/// A spawner carrying both kinds of request emits through a single writer,
/// bees first, so its creates keep a total order.
pub fn spawn_requests(
    params: Res<ArenaParams>,
    tick_rng: Res<TickRng>,
    queue: Res<MutationQueue>,
    requests: Query<
        (Entity, Option<&BeeSpawnRequest>, Option<&ResourceSpawnRequest>),
        Or<(With<BeeSpawnRequest>, With<ResourceSpawnRequest>)>,
    >,
) {
    for (spawner, bees, resources) in requests.iter() {
        let mut out = queue.writer(MutationLane::Spawn, spawner);

        if let Some(request) = bees {
            let mut rng = tick_rng.stream(RngLane::Spawn, spawner);
            for i in 0..request.count {
                let team = TeamId::alternating(i);
                let position = hive_spawn_point(&params, team);
                out.enqueue_create(random_bee(&params, team, position, &mut rng));
            }
            out.enqueue_remove_component(spawner, ComponentKind::BeeSpawnRequest);
            tracing::info!(count = request.count, "Spawning bees");
        }

        if let Some(request) = resources {
            let mut rng = tick_rng.stream(RngLane::Scatter, spawner);
            for _ in 0..request.count {
                out.enqueue_create(Blueprint::resource(random_resource_position(&params, &mut rng)));
            }
            out.enqueue_remove_component(spawner, ComponentKind::ResourceSpawnRequest);
            tracing::info!(count = request.count, "Scattering resources");
        }
    }
}
