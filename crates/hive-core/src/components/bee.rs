//! Bee Components
//!
//! Team membership, targeting and lifecycle columns for agents.

use bevy_ecs::prelude::*;
use glam::Vec3;
use serde::{Deserialize, Serialize};

/// The two competing hives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamId {
    Blue,
    Yellow,
}

impl TeamId {
    pub const ALL: [TeamId; 2] = [TeamId::Blue, TeamId::Yellow];

    /// Team for the n-th bee of an alternating spawn
    pub fn alternating(n: u32) -> Self {
        if n % 2 == 0 {
            TeamId::Blue
        } else {
            TeamId::Yellow
        }
    }

    /// Team owning the hive on the given side of the arena
    pub fn for_side(x: f32) -> Self {
        if x < 0.0 {
            TeamId::Blue
        } else {
            TeamId::Yellow
        }
    }

    pub fn index(self) -> usize {
        match self {
            TeamId::Blue => 0,
            TeamId::Yellow => 1,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            TeamId::Blue => TeamId::Yellow,
            TeamId::Yellow => TeamId::Blue,
        }
    }

    /// -1 for the left hive, +1 for the right
    pub fn side(self) -> f32 {
        match self {
            TeamId::Blue => -1.0,
            TeamId::Yellow => 1.0,
        }
    }
}

/// Marker and fixed attributes of a bee
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Bee {
    pub team: TeamId,
    /// Body size, fixed at spawn
    pub size: f32,
}

/// What a bee is currently after. At most one referent by construction.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    #[default]
    None,
    Enemy(Entity),
    Resource(Entity),
}

impl Target {
    pub fn is_none(&self) -> bool {
        matches!(self, Target::None)
    }

    pub fn enemy(&self) -> Option<Entity> {
        match *self {
            Target::Enemy(e) => Some(e),
            _ => None,
        }
    }

    pub fn resource(&self) -> Option<Entity> {
        match *self {
            Target::Resource(e) => Some(e),
            _ => None,
        }
    }
}

/// Decision state produced by the behaviour pass each tick
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Activity {
    #[default]
    Idle,
    SeekingEnemy,
    SeekingResource,
    Attacking,
    Carrying,
}

/// Visual lean state, decoupled from the physical position
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct Smoothing {
    pub position: Vec3,
    pub direction: Vec3,
}

impl Smoothing {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            direction: Vec3::ZERO,
        }
    }
}

/// Structural marker for a killed bee
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Dead {
    /// Tick in which the kill was applied
    pub since_tick: u64,
    /// Seconds spent dead, not counting the kill tick
    pub elapsed: f32,
}

impl Dead {
    pub fn at_tick(tick: u64) -> Self {
        Self {
            since_tick: tick,
            elapsed: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_alternation() {
        let teams: Vec<_> = (0..4).map(TeamId::alternating).collect();
        assert_eq!(teams, vec![TeamId::Blue, TeamId::Yellow, TeamId::Blue, TeamId::Yellow]);
        assert_eq!(TeamId::Blue.opponent(), TeamId::Yellow);
        assert_eq!(TeamId::for_side(-3.0), TeamId::Blue);
        assert_eq!(TeamId::for_side(3.0), TeamId::Yellow);
    }

    #[test]
    fn test_target_accessors() {
        let e = Entity::from_raw(7);
        assert!(Target::None.is_none());
        assert_eq!(Target::Enemy(e).enemy(), Some(e));
        assert_eq!(Target::Enemy(e).resource(), None);
        assert_eq!(Target::Resource(e).resource(), Some(e));
    }
}
