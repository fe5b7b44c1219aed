//! Render Interface
//!
//! The core never draws. It keeps a stable map from visual group to member
//! entities, updated by the mutation flush on every create and destroy, and
//! hands out one batch of settled transforms per group.

use bevy_ecs::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::components::{InstanceTransform, TeamId};
use crate::params::ArenaParams;

/// Colour used for every resource instance
pub const RESOURCE_COLOR: [f32; 4] = [0.55, 0.4, 0.2, 1.0];

/// Key the renderer batches draws by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum VisualGroup {
    Bees(TeamId),
    Resources,
}

/// Incrementally maintained group membership
#[derive(Resource, Debug, Default)]
pub struct RenderGroups {
    groups: BTreeMap<VisualGroup, Vec<Entity>>,
    slots: HashMap<Entity, (VisualGroup, usize)>,
}

impl RenderGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity to a group, moving it if it was in another one
    pub fn insert(&mut self, entity: Entity, group: VisualGroup) {
        if let Some(&(current, _)) = self.slots.get(&entity) {
            if current == group {
                return;
            }
            self.remove(entity);
        }
        let members = self.groups.entry(group).or_default();
        self.slots.insert(entity, (group, members.len()));
        members.push(entity);
    }

    /// Drop an entity from its group in O(1)
    pub fn remove(&mut self, entity: Entity) -> Option<VisualGroup> {
        let (group, slot) = self.slots.remove(&entity)?;
        let members = self.groups.get_mut(&group)?;
        members.swap_remove(slot);
        if let Some(&moved) = members.get(slot) {
            self.slots.insert(moved, (group, slot));
        }
        Some(group)
    }

    pub fn group_of(&self, entity: Entity) -> Option<VisualGroup> {
        self.slots.get(&entity).map(|&(group, _)| group)
    }

    pub fn members(&self, group: VisualGroup) -> &[Entity] {
        self.groups.get(&group).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Non-empty groups in key order
    pub fn groups(&self) -> impl Iterator<Item = (VisualGroup, &[Entity])> {
        self.groups
            .iter()
            .filter(|(_, members)| !members.is_empty())
            .map(|(group, members)| (*group, members.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// One batched draw
#[derive(Debug, Clone, Serialize)]
pub struct RenderBatch {
    pub group: VisualGroup,
    pub color: [f32; 4],
    pub instances: Vec<InstanceTransform>,
}

/// Gather settled transforms, one batch per visual group
pub fn collect_batches(world: &World) -> Vec<RenderBatch> {
    let Some(groups) = world.get_resource::<RenderGroups>() else {
        return Vec::new();
    };
    let team_colors = world
        .get_resource::<ArenaParams>()
        .map(|p| p.team_colors)
        .unwrap_or([[1.0; 4]; 2]);

    groups
        .groups()
        .map(|(group, members)| {
            let color = match group {
                VisualGroup::Bees(team) => team_colors[team.index()],
                VisualGroup::Resources => RESOURCE_COLOR,
            };
            let instances = members
                .iter()
                .filter_map(|&e| world.get::<InstanceTransform>(e).copied())
                .collect();
            RenderBatch {
                group,
                color,
                instances,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_remove_keep_slots_consistent() {
        let mut groups = RenderGroups::new();
        let a = Entity::from_raw(1);
        let b = Entity::from_raw(2);
        let c = Entity::from_raw(3);

        groups.insert(a, VisualGroup::Bees(TeamId::Blue));
        groups.insert(b, VisualGroup::Bees(TeamId::Blue));
        groups.insert(c, VisualGroup::Bees(TeamId::Blue));
        assert_eq!(groups.len(), 3);

        // Removing the first member moves the last one into its slot
        assert_eq!(groups.remove(a), Some(VisualGroup::Bees(TeamId::Blue)));
        assert_eq!(groups.members(VisualGroup::Bees(TeamId::Blue)), &[c, b]);

        // The moved entity can still be removed
        groups.remove(c);
        assert_eq!(groups.members(VisualGroup::Bees(TeamId::Blue)), &[b]);
        assert_eq!(groups.remove(c), None);
    }

    #[test]
    fn test_insert_moves_between_groups() {
        let mut groups = RenderGroups::new();
        let a = Entity::from_raw(1);

        groups.insert(a, VisualGroup::Resources);
        groups.insert(a, VisualGroup::Bees(TeamId::Yellow));

        assert!(groups.members(VisualGroup::Resources).is_empty());
        assert_eq!(groups.group_of(a), Some(VisualGroup::Bees(TeamId::Yellow)));
        assert_eq!(groups.groups().count(), 1);
    }

    #[test]
    fn test_collect_batches_reads_transforms() {
        let mut world = World::new();
        world.insert_resource(ArenaParams::default());
        let bee = world.spawn(InstanceTransform::default()).id();
        let res = world.spawn(InstanceTransform { tint: 0.5, ..Default::default() }).id();

        let mut groups = RenderGroups::new();
        groups.insert(bee, VisualGroup::Bees(TeamId::Yellow));
        groups.insert(res, VisualGroup::Resources);
        world.insert_resource(groups);

        let batches = collect_batches(&world);
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].group, VisualGroup::Bees(TeamId::Yellow));
        assert_eq!(batches[0].color, ArenaParams::default().team_colors[1]);
        assert_eq!(batches[1].instances[0].tint, 0.5);
    }
}
