//! Resource Stacking
//!
//! Three passes per tick:
//!
//! - [`count_stacks`] rebuilds the per-cell occupancy from resources already
//!   carrying the `Stacked` marker.
//! - [`place_resources`] settles falling resources that reached the top of
//!   their cell's stack, lowest first, claiming the next slot for each. Landings
//!   inside a hive zone become new bees instead; landings above the ceiling are
//!   discarded.
//! - [`mark_stack_tops`] flags the top resource of every cell once all
//!   placements of the tick are applied, and publishes the foraging candidates.
//!
//! Placement is the one sequential pass in the tick; per-cell slot claims must
//! not race.

use bevy_ecs::prelude::*;
use glam::Vec3;

use crate::components::{HeldBy, Position, Stacked, StackTop, TeamId, Velocity};
use crate::grid::{GridCell, GridGeometry, StackCounts};
use crate::mutation::{ComponentValue, MutationLane, MutationQueue, Tallies};
use crate::params::{ArenaParams, HIVE_ZONE_FRACTION};
use crate::rng::{RngLane, TickRng};

use super::spawn::random_bee;
use super::{AnyResource, ForageCandidates};

/// Count settled resources per cell
pub fn count_stacks(
    params: Res<ArenaParams>,
    mut counts: ResMut<StackCounts>,
    stacked: Query<&GridCell, (AnyResource, With<Stacked>)>,
) {
    counts.reset(params.grid.cell_count());
    for cell in stacked.iter() {
        counts.increment(cell.index);
    }
}

/// Settle falling resources onto their cell's stack
pub fn place_resources(
    params: Res<ArenaParams>,
    tick_rng: Res<TickRng>,
    queue: Res<MutationQueue>,
    mut counts: ResMut<StackCounts>,
    mut tallies: ResMut<Tallies>,
    mut falling: Query<
        (Entity, &mut Position, &mut Velocity, &GridCell),
        (AnyResource, Without<Stacked>, Without<HeldBy>),
    >,
) {
    let floor = params.floor_height();
    let size = params.resource_size;

    // Bottom to top within each cell.
    let mut order: Vec<(usize, f32, Entity)> = falling
        .iter()
        .map(|(entity, position, _, cell)| (cell.index, position.0.y, entity))
        .collect();
    order.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)).then(a.2.cmp(&b.2)));

    for (cell, _, entity) in order {
        let Ok((_, mut position, mut velocity, _)) = falling.get_mut(entity) else {
            continue;
        };
        let slot = counts.get(cell);
        let height = GridGeometry::stack_height(floor, slot, size);
        if position.0.y > height {
            continue;
        }

        let mut out = queue.writer(MutationLane::Stacking, entity);

        if position.0.x.abs() > params.field_size.x * HIVE_ZONE_FRACTION {
            let team = TeamId::for_side(position.0.x);
            let mut rng = tick_rng.stream(RngLane::Hatch, entity);
            let landing = Vec3::new(position.0.x, floor, position.0.z);
            for _ in 0..params.bees_per_resource {
                out.enqueue_create(random_bee(&params, team, landing, &mut rng));
            }
            out.enqueue_destroy(entity);
            tallies.deliveries += 1;
            tracing::trace!(?entity, ?team, "Resource delivered to hive");
            continue;
        }

        if (slot + 1) as f32 * size > params.field_size.y {
            out.enqueue_destroy(entity);
            tracing::trace!(?entity, cell, "Stack full, discarding resource");
            continue;
        }

        let index = counts.claim(cell);
        let centre = params.grid.cell_center(params.grid.cell_of(position.0));
        position.0 = Vec3::new(centre.x, height, centre.y);
        velocity.0 = Vec3::ZERO;
        out.enqueue_add_component(entity, ComponentValue::Stacked(Stacked { index }));
    }
}

/// Flag stack tops and publish the foraging candidates
pub fn mark_stack_tops(
    counts: Res<StackCounts>,
    mut candidates: ResMut<ForageCandidates>,
    mut resources: Query<(Entity, &GridCell, Option<&Stacked>, &mut StackTop), AnyResource>,
) {
    let mut tops = Vec::new();
    for (entity, cell, stacked, mut top) in resources.iter_mut() {
        let on_top = stacked.is_some_and(|s| counts.top_index(cell.index) == Some(s.index));
        if top.0 != on_top {
            top.0 = on_top;
        }
        if on_top {
            tops.push(entity);
        }
    }
    candidates.set(tops);
}
