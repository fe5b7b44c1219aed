//! Team Buckets
//!
//! Per-tick snapshots used for random candidate selection: live bees grouped
//! by team, and the resources currently eligible for foraging.

use bevy_ecs::prelude::*;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::components::{Bee, TeamId};

use super::LiveBee;

/// Live bees per team, rebuilt every tick
#[derive(Resource, Debug, Clone, Default)]
pub struct TeamBuckets {
    teams: [Vec<Entity>; 2],
}

impl TeamBuckets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self, team: TeamId) -> &[Entity] {
        &self.teams[team.index()]
    }

    /// Uniformly random member of a team
    pub fn pick(&self, team: TeamId, rng: &mut impl Rng) -> Option<Entity> {
        self.teams[team.index()].choose(rng).copied()
    }

    pub fn count(&self, team: TeamId) -> usize {
        self.teams[team.index()].len()
    }

    pub fn clear(&mut self) {
        for members in &mut self.teams {
            members.clear();
        }
    }

    pub fn add(&mut self, team: TeamId, bee: Entity) {
        self.teams[team.index()].push(bee);
    }

    /// Sort every bucket so sampling does not depend on iteration order
    pub fn sort(&mut self) {
        for members in &mut self.teams {
            members.sort_unstable();
        }
    }
}

/// Resources on top of their stack, as of the end of the previous tick
#[derive(Resource, Debug, Clone, Default)]
pub struct ForageCandidates {
    resources: Vec<Entity>,
}

impl ForageCandidates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pick(&self, rng: &mut impl Rng) -> Option<Entity> {
        self.resources.choose(rng).copied()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Replace the candidate list
    pub fn set(&mut self, mut resources: Vec<Entity>) {
        resources.sort_unstable();
        self.resources = resources;
    }
}

/// Rebuild the team snapshot from the live population
pub fn rebuild_team_buckets(mut buckets: ResMut<TeamBuckets>, bees: Query<(Entity, &Bee), LiveBee>) {
    buckets.clear();
    for (entity, bee) in bees.iter() {
        buckets.add(bee.team, entity);
    }
    buckets.sort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Dead;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn test_buckets_skip_dead_bees() {
        let mut world = World::new();
        world.insert_resource(TeamBuckets::new());
        let blue = world.spawn(Bee { team: TeamId::Blue, size: 0.3 }).id();
        world.spawn((Bee { team: TeamId::Blue, size: 0.3 }, Dead::at_tick(0)));
        let yellow = world.spawn(Bee { team: TeamId::Yellow, size: 0.3 }).id();

        let mut schedule = Schedule::default();
        schedule.add_systems(rebuild_team_buckets);
        schedule.run(&mut world);

        let buckets = world.resource::<TeamBuckets>();
        assert_eq!(buckets.members(TeamId::Blue), &[blue]);
        assert_eq!(buckets.members(TeamId::Yellow), &[yellow]);
    }

    #[test]
    fn test_pick_from_empty_bucket() {
        let buckets = TeamBuckets::new();
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(buckets.pick(TeamId::Blue, &mut rng), None);
        assert!(ForageCandidates::new().pick(&mut rng).is_none());
    }

    #[test]
    fn test_candidates_are_sorted() {
        let mut candidates = ForageCandidates::new();
        candidates.set(vec![Entity::from_raw(5), Entity::from_raw(2)]);
        assert_eq!(candidates.as_slice(), &[Entity::from_raw(2), Entity::from_raw(5)]);
    }
}
