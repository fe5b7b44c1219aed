//! Deferred Mutation Queue
//!
//! Structural changes (create, destroy, add or remove a component) emitted by
//! parallel passes are buffered here and applied in one single-threaded flush.
//!
//! Any number of passes append concurrently: each work-item fills a local
//! [`MutationWriter`] and hands the whole batch to one of several sharded
//! buffers when it is dropped. A flush merges the shards and applies
//! operations in `(origin, lane, emission)` order, with every create applied
//! first so that pending references always resolve.

use bevy_ecs::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use crate::blueprint::{spawn_blueprint, Blueprint};
use crate::components::{BeeSpawnRequest, Dead, HeldBy, ResourceSpawnRequest, Stacked};
use crate::render::{RenderGroups, VisualGroup};

const SHARD_COUNT: usize = 16;

/// Placeholder for an entity created earlier in the same flush window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PendingId(u32);

/// Target of a queued operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationTarget {
    Live(Entity),
    Pending(PendingId),
}

impl From<Entity> for MutationTarget {
    fn from(entity: Entity) -> Self {
        MutationTarget::Live(entity)
    }
}

impl From<PendingId> for MutationTarget {
    fn from(id: PendingId) -> Self {
        MutationTarget::Pending(id)
    }
}

/// Component values that can be added structurally
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ComponentValue {
    /// Applies only if the bee is not already dead
    Dead(Dead),
    Stacked(Stacked),
    /// Applies only if nobody holds the resource yet
    HeldBy(HeldBy),
}

/// Component types that can be removed structurally
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Dead,
    Stacked,
    HeldBy,
    BeeSpawnRequest,
    ResourceSpawnRequest,
}

/// One buffered structural change
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Create { pending: PendingId, blueprint: Blueprint },
    Destroy(MutationTarget),
    AddComponent(MutationTarget, ComponentValue),
    RemoveComponent(MutationTarget, ComponentKind),
}

/// Pass family an operation came from; orders operations sharing an origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MutationLane {
    Spawn,
    Decision,
    Release,
    Stacking,
    Lifecycle,
}

#[derive(Debug)]
struct Tagged {
    origin: u32,
    lane: MutationLane,
    seq: u32,
    op: Mutation,
}

impl Tagged {
    fn sort_key(&self) -> (u32, MutationLane, u32) {
        (self.origin, self.lane, self.seq)
    }
}

/// Counts of what a flush did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub created: usize,
    pub destroyed: usize,
    pub added: usize,
    pub removed: usize,
    /// Claims that lost to an earlier operation on the same entity
    pub rejected: usize,
    /// Operations whose target no longer exists
    pub stale: usize,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.created + self.destroyed + self.added + self.removed + self.rejected + self.stale
    }
}

/// Running totals across every flush
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tallies {
    pub kills: u64,
    pub bees_created: u64,
    pub bees_removed: u64,
    pub resources_created: u64,
    pub resources_removed: u64,
    /// Resources dropped into a hive and turned into bees
    pub deliveries: u64,
}

/// Multi-producer, single-consumer log of structural changes
#[derive(Resource, Debug)]
pub struct MutationQueue {
    shards: Vec<Mutex<Vec<Tagged>>>,
    next_pending: AtomicU32,
}

impl Default for MutationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MutationQueue {
    pub fn new() -> Self {
        Self {
            shards: (0..SHARD_COUNT).map(|_| Mutex::new(Vec::new())).collect(),
            next_pending: AtomicU32::new(0),
        }
    }

    /// Open a batch of operations for one work-item
    pub fn writer(&self, lane: MutationLane, origin: Entity) -> MutationWriter<'_> {
        MutationWriter {
            queue: self,
            origin: origin.index(),
            lane,
            buffer: Vec::new(),
        }
    }

    /// Number of buffered operations
    pub fn len(&self) -> usize {
        self.shards
            .iter()
            .map(|shard| lock(shard).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn submit(&self, origin: u32, batch: Vec<Tagged>) {
        let shard = &self.shards[origin as usize % SHARD_COUNT];
        lock(shard).extend(batch);
    }

    fn drain_sorted(&mut self) -> Vec<Tagged> {
        let mut ops: Vec<Tagged> = self
            .shards
            .iter_mut()
            .flat_map(|shard| {
                std::mem::take(shard.get_mut().unwrap_or_else(|poisoned| poisoned.into_inner()))
            })
            .collect();
        ops.sort_by_key(Tagged::sort_key);
        *self.next_pending.get_mut() = 0;
        ops
    }

    /// Apply every buffered operation to the world and clear the queue
    pub fn flush(&mut self, world: &mut World) -> FlushReport {
        let ops = self.drain_sorted();
        let mut report = FlushReport::default();
        let mut tallies = Tallies::default();
        let mut resolved: HashMap<PendingId, Entity> = HashMap::new();

        // Creations first, so later operations can refer to their output.
        for tagged in &ops {
            if let Mutation::Create { pending, blueprint } = &tagged.op {
                let entity = spawn_blueprint(world, blueprint);
                resolved.insert(*pending, entity);
                report.created += 1;
                match blueprint {
                    Blueprint::Bee { .. } => tallies.bees_created += 1,
                    Blueprint::Resource { .. } => tallies.resources_created += 1,
                }
            }
        }

        for tagged in ops {
            let resolve = |target: MutationTarget| match target {
                MutationTarget::Live(e) => Some(e),
                MutationTarget::Pending(id) => resolved.get(&id).copied(),
            };
            match tagged.op {
                Mutation::Create { .. } => {}
                Mutation::Destroy(target) => {
                    let Some(entity) = resolve(target).filter(|&e| world.get_entity(e).is_some())
                    else {
                        report.stale += 1;
                        continue;
                    };
                    let group = world
                        .get_resource_mut::<RenderGroups>()
                        .and_then(|mut groups| groups.remove(entity));
                    if world.despawn(entity) {
                        report.destroyed += 1;
                        match group {
                            Some(VisualGroup::Bees(_)) => tallies.bees_removed += 1,
                            Some(VisualGroup::Resources) => tallies.resources_removed += 1,
                            None => {}
                        }
                    } else {
                        report.stale += 1;
                    }
                }
                Mutation::AddComponent(target, value) => {
                    let Some(mut entity) = resolve(target).and_then(|e| world.get_entity_mut(e))
                    else {
                        report.stale += 1;
                        continue;
                    };
                    if apply_add(&mut entity, value) {
                        report.added += 1;
                        if matches!(value, ComponentValue::Dead(_)) {
                            tallies.kills += 1;
                        }
                    } else {
                        report.rejected += 1;
                    }
                }
                Mutation::RemoveComponent(target, kind) => {
                    let Some(mut entity) = resolve(target).and_then(|e| world.get_entity_mut(e))
                    else {
                        report.stale += 1;
                        continue;
                    };
                    if apply_remove(&mut entity, kind) {
                        report.removed += 1;
                    }
                }
            }
        }

        if let Some(mut totals) = world.get_resource_mut::<Tallies>() {
            totals.kills += tallies.kills;
            totals.bees_created += tallies.bees_created;
            totals.bees_removed += tallies.bees_removed;
            totals.resources_created += tallies.resources_created;
            totals.resources_removed += tallies.resources_removed;
        }

        report
    }
}

fn lock(shard: &Mutex<Vec<Tagged>>) -> std::sync::MutexGuard<'_, Vec<Tagged>> {
    // A poisoned shard only means a producer panicked mid-tick; the tick is
    // already faulted and the buffered data is still well-formed.
    shard.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn apply_add(entity: &mut EntityWorldMut<'_>, value: ComponentValue) -> bool {
    match value {
        ComponentValue::Dead(dead) => {
            if entity.contains::<Dead>() {
                return false;
            }
            entity.insert(dead);
        }
        ComponentValue::Stacked(stacked) => {
            if entity.contains::<HeldBy>() {
                return false;
            }
            entity.insert(stacked);
        }
        ComponentValue::HeldBy(holder) => {
            if entity.contains::<HeldBy>() {
                return false;
            }
            entity.remove::<Stacked>();
            entity.insert(holder);
        }
    }
    true
}

fn apply_remove(entity: &mut EntityWorldMut<'_>, kind: ComponentKind) -> bool {
    match kind {
        ComponentKind::Dead => entity.take::<Dead>().is_some(),
        ComponentKind::Stacked => entity.take::<Stacked>().is_some(),
        ComponentKind::HeldBy => entity.take::<HeldBy>().is_some(),
        ComponentKind::BeeSpawnRequest => entity.take::<BeeSpawnRequest>().is_some(),
        ComponentKind::ResourceSpawnRequest => entity.take::<ResourceSpawnRequest>().is_some(),
    }
}

/// Batch of operations from one work-item, submitted on drop
pub struct MutationWriter<'q> {
    queue: &'q MutationQueue,
    origin: u32,
    lane: MutationLane,
    buffer: Vec<Tagged>,
}

impl MutationWriter<'_> {
    fn push(&mut self, op: Mutation) {
        let seq = self.buffer.len() as u32;
        self.buffer.push(Tagged {
            origin: self.origin,
            lane: self.lane,
            seq,
            op,
        });
    }

    /// Queue a new entity; the returned id can be targeted by later operations
    pub fn enqueue_create(&mut self, blueprint: Blueprint) -> PendingId {
        let pending = PendingId(self.queue.next_pending.fetch_add(1, Ordering::Relaxed));
        self.push(Mutation::Create { pending, blueprint });
        pending
    }

    pub fn enqueue_destroy(&mut self, target: impl Into<MutationTarget>) {
        self.push(Mutation::Destroy(target.into()));
    }

    pub fn enqueue_add_component(&mut self, target: impl Into<MutationTarget>, value: ComponentValue) {
        self.push(Mutation::AddComponent(target.into(), value));
    }

    pub fn enqueue_remove_component(&mut self, target: impl Into<MutationTarget>, kind: ComponentKind) {
        self.push(Mutation::RemoveComponent(target.into(), kind));
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Drop for MutationWriter<'_> {
    fn drop(&mut self) {
        if !self.buffer.is_empty() {
            let batch = std::mem::take(&mut self.buffer);
            self.queue.submit(self.origin, batch);
        }
    }
}

/// Exclusive system that flushes the queue at a synchronization point
pub fn flush_mutations(world: &mut World) {
    let report = world.resource_scope(|world, mut queue: Mut<MutationQueue>| queue.flush(world));
    if report.total() > 0 {
        tracing::debug!(
            created = report.created,
            destroyed = report.destroyed,
            added = report.added,
            removed = report.removed,
            rejected = report.rejected,
            stale = report.stale,
            "Flushed deferred mutations"
        );
    }
}
