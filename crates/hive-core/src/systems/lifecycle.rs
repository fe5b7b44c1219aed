//! Lifecycle Systems
//!
//! Holder release for resources whose carrier died or vanished, and the
//! death timer that removes dead bees.

use bevy_ecs::prelude::*;

use crate::components::{Dead, HeldBy};
use crate::mutation::{ComponentKind, MutationLane, MutationQueue};
use crate::params::{ArenaParams, TickClock};

use super::{AnyResource, LiveBee};

/// Queue removal of `HeldBy` when the holder is no longer a live bee
pub fn release_orphaned_resources(
    queue: Res<MutationQueue>,
    live: Query<(), LiveBee>,
    held: Query<(Entity, &HeldBy), AnyResource>,
) {
    for (resource, holder) in held.iter() {
        if live.get(holder.0).is_err() {
            queue
                .writer(MutationLane::Release, resource)
                .enqueue_remove_component(resource, ComponentKind::HeldBy);
            tracing::trace!(?resource, holder = ?holder.0, "Releasing orphaned resource");
        }
    }
}

/// Advance death timers and queue removal of expired bees
///
/// Bees killed in the current tick are skipped, so the timer starts at zero
/// on the tick after the kill.
pub fn advance_death_timers(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    queue: Res<MutationQueue>,
    mut dead: Query<(Entity, &mut Dead)>,
) {
    let queue = &*queue;
    dead.par_iter_mut().for_each(|(entity, mut dead)| {
        if dead.since_tick >= clock.tick {
            return;
        }
        dead.elapsed += clock.dt;
        if dead.elapsed >= params.death_duration {
            queue
                .writer(MutationLane::Lifecycle, entity)
                .enqueue_destroy(entity);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Bee, ResourceItem, TeamId};
    use crate::mutation::flush_mutations;

    fn setup(dt: f32, tick: u64) -> World {
        let mut world = World::new();
        let mut params = ArenaParams::default();
        params.death_duration = 2.0;
        world.insert_resource(params);
        world.insert_resource(TickClock { tick, dt });
        world.insert_resource(MutationQueue::new());
        world
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((release_orphaned_resources, advance_death_timers, flush_mutations).chain());
        schedule.run(world);
    }

    #[test]
    fn test_kill_tick_is_not_counted() {
        let mut world = setup(1.0, 5);
        let bee = world.spawn((Bee { team: TeamId::Blue, size: 0.3 }, Dead::at_tick(5))).id();

        run(&mut world);
        assert_eq!(world.get::<Dead>(bee).unwrap().elapsed, 0.0);
    }

    #[test]
    fn test_bee_removed_after_duration() {
        let mut world = setup(1.0, 6);
        let bee = world.spawn((Bee { team: TeamId::Blue, size: 0.3 }, Dead::at_tick(5))).id();

        run(&mut world);
        assert_eq!(world.get::<Dead>(bee).unwrap().elapsed, 1.0);

        world.resource_mut::<TickClock>().tick = 7;
        run(&mut world);
        assert!(world.get_entity(bee).is_none());
    }

    #[test]
    fn test_dead_holder_releases_resource() {
        let mut world = setup(1.0, 0);
        let holder = world.spawn((Bee { team: TeamId::Blue, size: 0.3 }, Dead::at_tick(0))).id();
        let alive = world.spawn(Bee { team: TeamId::Yellow, size: 0.3 }).id();
        let dropped = world.spawn((ResourceItem, HeldBy(holder))).id();
        let kept = world.spawn((ResourceItem, HeldBy(alive))).id();
        let gone = world.spawn((ResourceItem, HeldBy(Entity::from_raw(4242)))).id();

        run(&mut world);

        assert!(world.get::<HeldBy>(dropped).is_none());
        assert_eq!(world.get::<HeldBy>(kept), Some(&HeldBy(alive)));
        assert!(world.get::<HeldBy>(gone).is_none());
    }
}
