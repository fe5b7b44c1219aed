//! Behaviour System
//!
//! The per-bee decision state machine. Each live bee acquires a target when
//! idle, then chases, attacks, forages or carries it home. Every structural
//! consequence (kills, grabs, drops) goes through the mutation queue; the
//! pass itself only writes the bee's own velocity, target and activity.
//!
//! Positions and liveness of other entities are read from the state at the
//! start of the pass.

use bevy_ecs::prelude::*;
use glam::Vec3;
use rand::Rng;

use crate::components::{
    Activity, Bee, Dead, HeldBy, Position, StackTop, Target, TeamId, Velocity,
};
use crate::mutation::{ComponentKind, ComponentValue, MutationLane, MutationQueue, MutationWriter};
use crate::params::{ArenaParams, TickClock, DROP_DISTANCE, EPSILON, HIVE_TARGET_FRACTION};
use crate::rng::{RngLane, TickRng};

use super::{AnyBee, AnyResource, ForageCandidates, LiveBee, TeamBuckets};

/// Read-only view of another bee
type OtherBee<'a> = (&'a Bee, &'a Position, Has<Dead>);
/// Read-only view of a resource
type ResourceView<'a> = (&'a Position, Option<&'a HeldBy>, &'a StackTop);

/// Where a carrier drops its load
pub fn hive_drop_point(params: &ArenaParams, team: TeamId, z: f32) -> Vec3 {
    Vec3::new(team.side() * params.field_size.x * HIVE_TARGET_FRACTION, 0.0, z)
}

/// Steer `velocity` toward `delta` with a force scaled by `force * dt / |delta|`
fn steer(velocity: &mut Vec3, delta: Vec3, dist: f32, force: f32, dt: f32) {
    if dist > EPSILON {
        *velocity += delta * (force * dt / dist);
    }
}

struct Decider<'w, 's, 'a> {
    params: &'a ArenaParams,
    dt: f32,
    tick: u64,
    others: &'a Query<'w, 's, OtherBee<'static>, AnyBee>,
    resources: &'a Query<'w, 's, ResourceView<'static>, AnyResource>,
}

impl Decider<'_, '_, '_> {
    fn chase_enemy(
        &self,
        me: Entity,
        position: Vec3,
        velocity: &mut Vec3,
        enemy: Entity,
        out: &mut MutationWriter<'_>,
    ) -> (Target, Activity) {
        let Ok((_, enemy_pos, false)) = self.others.get(enemy) else {
            // Dead or gone.
            return (Target::None, Activity::Idle);
        };

        let delta = enemy_pos.0 - position;
        let dist_sq = delta.length_squared();
        let dist = dist_sq.sqrt();

        if dist_sq > self.params.attack_distance_sq {
            steer(velocity, delta, dist, self.params.chase_force, self.dt);
            (Target::Enemy(enemy), Activity::SeekingEnemy)
        } else if dist_sq > self.params.hit_distance_sq {
            steer(velocity, delta, dist, self.params.attack_force, self.dt);
            (Target::Enemy(enemy), Activity::Attacking)
        } else {
            out.enqueue_add_component(enemy, ComponentValue::Dead(Dead::at_tick(self.tick)));
            tracing::trace!(killer = ?me, victim = ?enemy, "Hit");
            (Target::None, Activity::Attacking)
        }
    }

    fn forage(
        &self,
        me: Entity,
        bee: &Bee,
        position: Vec3,
        velocity: &mut Vec3,
        resource: Entity,
        out: &mut MutationWriter<'_>,
    ) -> (Target, Activity) {
        let Ok((res_pos, held_by, top)) = self.resources.get(resource) else {
            return (Target::None, Activity::Idle);
        };

        match held_by {
            Some(&HeldBy(holder)) if holder == me => {
                let home = hive_drop_point(self.params, bee.team, position.z);
                let delta = home - position;
                let dist = delta.length();
                steer(velocity, delta, dist, self.params.carry_force, self.dt);
                if dist < DROP_DISTANCE {
                    out.enqueue_remove_component(resource, ComponentKind::HeldBy);
                    tracing::trace!(bee = ?me, ?resource, "Dropped resource at hive");
                    (Target::None, Activity::Carrying)
                } else {
                    (Target::Resource(resource), Activity::Carrying)
                }
            }
            Some(&HeldBy(holder)) => match self.others.get(holder) {
                Ok((holder_bee, _, false)) if holder_bee.team != bee.team => {
                    (Target::Enemy(holder), Activity::SeekingEnemy)
                }
                _ => (Target::None, Activity::Idle),
            },
            // Falling, or buried under a newer arrival.
            None if !top.0 => (Target::None, Activity::Idle),
            None => {
                let delta = res_pos.0 - position;
                let dist_sq = delta.length_squared();
                if dist_sq > self.params.grab_distance_sq {
                    steer(velocity, delta, dist_sq.sqrt(), self.params.chase_force, self.dt);
                } else {
                    out.enqueue_add_component(resource, ComponentValue::HeldBy(HeldBy(me)));
                    tracing::trace!(bee = ?me, ?resource, "Grabbing resource");
                }
                (Target::Resource(resource), Activity::SeekingResource)
            }
        }
    }
}

/// Run one step of the decision state machine for every live bee
#[allow(clippy::too_many_arguments)]
pub fn decide(
    params: Res<ArenaParams>,
    clock: Res<TickClock>,
    tick_rng: Res<TickRng>,
    queue: Res<MutationQueue>,
    buckets: Res<TeamBuckets>,
    candidates: Res<ForageCandidates>,
    others: Query<OtherBee<'static>, AnyBee>,
    resources: Query<ResourceView<'static>, AnyResource>,
    mut bees: Query<(Entity, &Bee, &Position, &mut Velocity, &mut Target, &mut Activity), LiveBee>,
) {
    let decider = Decider {
        params: &params,
        dt: clock.dt,
        tick: clock.tick,
        others: &others,
        resources: &resources,
    };
    let queue = &*queue;

    bees.par_iter_mut()
        .for_each(|(me, bee, position, mut velocity, mut target, mut activity)| {
            let mut out = queue.writer(MutationLane::Decision, me);
            let mut v = velocity.0;

            let mut current = *target;
            if current.is_none() {
                let mut rng = tick_rng.stream(RngLane::Decision, me);
                current = if rng.gen::<f32>() < params.aggression {
                    buckets
                        .pick(bee.team.opponent(), &mut rng)
                        .map_or(Target::None, Target::Enemy)
                } else {
                    candidates.pick(&mut rng).map_or(Target::None, Target::Resource)
                };
            }

            let (next, state) = match current {
                Target::None => (Target::None, Activity::Idle),
                Target::Enemy(enemy) => decider.chase_enemy(me, position.0, &mut v, enemy, &mut out),
                Target::Resource(res) => decider.forage(me, bee, position.0, &mut v, res, &mut out),
            };

            if v != velocity.0 {
                velocity.0 = v;
            }
            if *target != next {
                *target = next;
            }
            if *activity != state {
                *activity = state;
            }
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ResourceItem, Stacked};
    use crate::mutation::flush_mutations;
    use crate::render::RenderGroups;

    fn setup(params: ArenaParams) -> World {
        let mut world = World::new();
        world.insert_resource(params);
        world.insert_resource(TickClock::new(0.1));
        world.insert_resource(TickRng::new(9));
        world.insert_resource(MutationQueue::new());
        world.insert_resource(RenderGroups::new());
        world.insert_resource(TeamBuckets::new());
        world.insert_resource(ForageCandidates::new());
        world
    }

    fn spawn_bee(world: &mut World, team: TeamId, pos: Vec3, target: Target) -> Entity {
        world
            .spawn((
                Bee { team, size: 0.3 },
                Position(pos),
                Velocity::default(),
                target,
                Activity::Idle,
            ))
            .id()
    }

    fn spawn_resource(world: &mut World, pos: Vec3) -> Entity {
        world
            .spawn((ResourceItem, Position(pos), Stacked { index: 0 }, StackTop(true)))
            .id()
    }

    fn run(world: &mut World) {
        let mut schedule = Schedule::default();
        schedule.add_systems((super::super::rebuild_team_buckets, decide, flush_mutations).chain());
        schedule.run(world);
    }

    #[test]
    fn test_hit_kills_enemy_and_clears_target() {
        let mut params = ArenaParams::default();
        params.aggression = 0.0;
        let mut world = setup(params);
        let victim = spawn_bee(&mut world, TeamId::Yellow, Vec3::new(0.1, 0.0, 0.0), Target::None);
        let attacker = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Enemy(victim));

        run(&mut world);

        assert!(world.get::<Dead>(victim).is_some());
        assert!(world.get::<Target>(attacker).unwrap().is_none());
        assert_eq!(*world.get::<Activity>(attacker).unwrap(), Activity::Attacking);
    }

    #[test]
    fn test_chase_force_points_at_enemy() {
        let mut world = setup(ArenaParams::default());
        let enemy = spawn_bee(&mut world, TeamId::Yellow, Vec3::new(20.0, 0.0, 0.0), Target::None);
        let chaser = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Enemy(enemy));

        run(&mut world);

        let v = world.get::<Velocity>(chaser).unwrap().0;
        let params = ArenaParams::default();
        assert!((v.x - params.chase_force * 0.1).abs() < 1e-4);
        assert_eq!(*world.get::<Activity>(chaser).unwrap(), Activity::SeekingEnemy);
        assert!(world.get::<Dead>(enemy).is_none());
    }

    #[test]
    fn test_target_on_dead_enemy_is_cleared() {
        let mut world = setup(ArenaParams::default());
        let enemy = spawn_bee(&mut world, TeamId::Yellow, Vec3::ZERO, Target::None);
        world.entity_mut(enemy).insert(Dead::at_tick(0));
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::X, Target::Enemy(enemy));

        run(&mut world);
        assert_eq!(*world.get::<Target>(bee).unwrap(), Target::None);
    }

    #[test]
    fn test_grab_within_range() {
        let mut world = setup(ArenaParams::default());
        let res = spawn_resource(&mut world, Vec3::new(0.2, 0.0, 0.0));
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Resource(res));

        run(&mut world);

        assert_eq!(world.get::<HeldBy>(res), Some(&HeldBy(bee)));
        assert!(world.get::<Stacked>(res).is_none());
        assert_eq!(*world.get::<Target>(bee).unwrap(), Target::Resource(res));
    }

    #[test]
    fn test_escalates_against_enemy_carrier() {
        let mut world = setup(ArenaParams::default());
        let carrier = spawn_bee(&mut world, TeamId::Yellow, Vec3::new(10.0, 0.0, 0.0), Target::None);
        let res = world
            .spawn((ResourceItem, Position(Vec3::new(10.0, -0.5, 0.0)), HeldBy(carrier), StackTop(false)))
            .id();
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Resource(res));

        run(&mut world);
        assert_eq!(*world.get::<Target>(bee).unwrap(), Target::Enemy(carrier));
    }

    #[test]
    fn test_abandons_resource_held_by_ally() {
        let mut world = setup(ArenaParams::default());
        let ally = spawn_bee(&mut world, TeamId::Blue, Vec3::new(10.0, 0.0, 0.0), Target::None);
        let res = world
            .spawn((ResourceItem, Position(Vec3::new(10.0, -0.5, 0.0)), HeldBy(ally), StackTop(false)))
            .id();
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Resource(res));

        run(&mut world);
        assert!(world.get::<Target>(bee).unwrap().is_none());
    }

    #[test]
    fn test_abandons_buried_resource() {
        let mut world = setup(ArenaParams::default());
        let res = world
            .spawn((ResourceItem, Position(Vec3::new(5.0, 0.0, 0.0)), Stacked { index: 0 }, StackTop(false)))
            .id();
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Resource(res));

        run(&mut world);
        assert!(world.get::<Target>(bee).unwrap().is_none());
    }

    #[test]
    fn test_abandons_falling_resource() {
        let mut world = setup(ArenaParams::default());
        let res = world
            .spawn((ResourceItem, Position(Vec3::new(0.2, 0.0, 0.0)), StackTop(false)))
            .id();
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::Resource(res));

        run(&mut world);

        assert_eq!(*world.get::<Target>(bee).unwrap(), Target::None);
        assert_eq!(*world.get::<Activity>(bee).unwrap(), Activity::Idle);
        assert!(world.get::<HeldBy>(res).is_none());
    }

    #[test]
    fn test_carrier_drops_at_hive() {
        let params = ArenaParams::default();
        let home = hive_drop_point(&params, TeamId::Yellow, 2.0);
        let mut world = setup(params);
        let bee = spawn_bee(&mut world, TeamId::Yellow, home + Vec3::new(0.0, 0.5, 0.0), Target::None);
        let res = world
            .spawn((ResourceItem, Position(home), HeldBy(bee), StackTop(false)))
            .id();
        world.entity_mut(bee).insert(Target::Resource(res));

        run(&mut world);

        assert!(world.get::<HeldBy>(res).is_none());
        assert!(world.get::<Target>(bee).unwrap().is_none());
    }

    #[test]
    fn test_idle_bee_acquires_enemy_with_full_aggression() {
        let mut params = ArenaParams::default();
        params.aggression = 1.0;
        let mut world = setup(params);
        let enemy = spawn_bee(&mut world, TeamId::Yellow, Vec3::new(30.0, 0.0, 0.0), Target::None);
        let bee = spawn_bee(&mut world, TeamId::Blue, Vec3::ZERO, Target::None);

        run(&mut world);

        assert_eq!(*world.get::<Target>(bee).unwrap(), Target::Enemy(enemy));
        // Evaluated in the same tick.
        assert_eq!(*world.get::<Activity>(bee).unwrap(), Activity::SeekingEnemy);
    }

    #[test]
    fn test_hive_drop_points() {
        let params = ArenaParams::default();
        let blue = hive_drop_point(&params, TeamId::Blue, 1.0);
        let yellow = hive_drop_point(&params, TeamId::Yellow, 1.0);
        assert!((blue.x + params.field_size.x * 0.45).abs() < 1e-4);
        assert!((yellow.x - params.field_size.x * 0.45).abs() < 1e-4);
        assert_eq!(blue.z, 1.0);
    }
}
