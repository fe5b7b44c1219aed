//! Entity Blueprints
//!
//! The component sets a deferred create expands into. Spawning through
//! [`spawn_blueprint`] also registers the entity with its render group.

use bevy_ecs::prelude::*;
use glam::Vec3;

use crate::components::{
    Activity, Bee, InstanceTransform, Position, ResourceItem, Scale, Smoothing, StackTop, Target,
    TeamId, Velocity,
};
use crate::grid::GridCell;
use crate::params::ArenaParams;
use crate::render::{RenderGroups, VisualGroup};

/// Component set of a new entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Blueprint {
    Bee {
        team: TeamId,
        size: f32,
        position: Vec3,
        velocity: Vec3,
    },
    Resource {
        position: Vec3,
    },
}

impl Blueprint {
    pub fn bee(team: TeamId, size: f32, position: Vec3) -> Self {
        Blueprint::Bee {
            team,
            size,
            position,
            velocity: Vec3::ZERO,
        }
    }

    pub fn resource(position: Vec3) -> Self {
        Blueprint::Resource { position }
    }

    pub fn visual_group(&self) -> VisualGroup {
        match *self {
            Blueprint::Bee { team, .. } => VisualGroup::Bees(team),
            Blueprint::Resource { .. } => VisualGroup::Resources,
        }
    }
}

/// Create the entity described by a blueprint
pub fn spawn_blueprint(world: &mut World, blueprint: &Blueprint) -> Entity {
    let entity = match *blueprint {
        Blueprint::Bee {
            team,
            size,
            position,
            velocity,
        } => world
            .spawn((
                Bee { team, size },
                Position(position),
                Velocity(velocity),
                Smoothing::at(position),
                Target::None,
                Activity::Idle,
                Scale(Vec3::splat(size)),
                InstanceTransform {
                    translation: position,
                    scale: Vec3::splat(size),
                    ..Default::default()
                },
            ))
            .id(),
        Blueprint::Resource { position } => {
            let (size, index) = world
                .get_resource::<ArenaParams>()
                .map(|p| (p.resource_size, p.grid.cell_index(position)))
                .unwrap_or((1.0, 0));
            let scale = Vec3::new(size, size * 0.5, size);
            world
                .spawn((
                    ResourceItem,
                    Position(position),
                    Velocity::default(),
                    GridCell { index },
                    StackTop(false),
                    Scale(scale),
                    InstanceTransform {
                        translation: position,
                        scale,
                        ..Default::default()
                    },
                ))
                .id()
        }
    };

    if let Some(mut groups) = world.get_resource_mut::<RenderGroups>() {
        groups.insert(entity, blueprint.visual_group());
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_bee_registers_group() {
        let mut world = World::new();
        world.insert_resource(RenderGroups::new());

        let e = spawn_blueprint(&mut world, &Blueprint::bee(TeamId::Yellow, 0.4, Vec3::X));

        assert_eq!(world.get::<Bee>(e).unwrap().team, TeamId::Yellow);
        assert_eq!(world.get::<Position>(e).unwrap().0, Vec3::X);
        assert_eq!(*world.get::<Target>(e).unwrap(), Target::None);
        assert_eq!(
            world.resource::<RenderGroups>().group_of(e),
            Some(VisualGroup::Bees(TeamId::Yellow))
        );
    }

    #[test]
    fn test_spawn_resource_has_cell() {
        let mut world = World::new();
        let params = ArenaParams::default();
        let pos = Vec3::new(3.0, 2.0, -4.0);
        let expected = params.grid.cell_index(pos);
        world.insert_resource(params);

        let e = spawn_blueprint(&mut world, &Blueprint::resource(pos));
        assert_eq!(world.get::<GridCell>(e).unwrap().index, expected);
        assert!(world.get::<ResourceItem>(e).is_some());
        assert!(!world.get::<StackTop>(e).unwrap().0);
    }
}
