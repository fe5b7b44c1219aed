//! Task Graph
//!
//! A fixed, hand-authored sequence of passes per tick. Each pass declares the
//! columns it reads and writes; two passes conflict when either writes a
//! column the other touches. Conflicting passes are ordered in declaration
//! order, everything else may run concurrently on the compute pool. Barriers
//! flush the [`MutationQueue`](crate::mutation::MutationQueue) and order every
//! pass before them ahead of every pass after them.
//!
//! The graph compiles down to a bevy [`Schedule`]: every node lives in its own
//! system set and dependencies become `after` edges.

use bevy_ecs::prelude::*;
use bevy_ecs::schedule::{
    ExecutorKind, LogLevel, ScheduleBuildSettings, ScheduleLabel, SystemConfigs,
};
use bevy_tasks::{ComputeTaskPool, TaskPool, TaskPoolBuilder};
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::error::SimError;
use crate::mutation::flush_mutations;
use crate::params::TickClock;

/// A column of shared state a pass can touch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Column {
    /// Team and size; fixed after spawn
    BeeIdentity,
    /// Whether a bee carries the `Dead` marker
    BeeLiveness,
    BeePosition,
    LiveBeeVelocity,
    DeadBeeVelocity,
    BeeTarget,
    BeeActivity,
    BeeSmoothing,
    DeathTimer,
    BeeScale,
    BeeTransform,
    ResourcePosition,
    ResourceVelocity,
    ResourceCell,
    /// `Stacked` and `HeldBy` markers
    ResourceState,
    StackTop,
    ResourceScale,
    ResourceTransform,
    SpawnRequests,
    TeamBuckets,
    StackCounts,
    ForageCandidates,
    Tallies,
}

/// Bit set of columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ColumnSet(u64);

impl ColumnSet {
    pub const EMPTY: ColumnSet = ColumnSet(0);

    pub const fn of(columns: &[Column]) -> Self {
        let mut bits = 0u64;
        let mut i = 0;
        while i < columns.len() {
            bits |= 1 << columns[i] as u8;
            i += 1;
        }
        ColumnSet(bits)
    }

    pub fn contains(self, column: Column) -> bool {
        self.0 & (1 << column as u8) != 0
    }

    pub fn union(self, other: ColumnSet) -> Self {
        ColumnSet(self.0 | other.0)
    }

    pub fn intersects(self, other: ColumnSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Declared read and write sets of a pass
///
/// Appending to the mutation queue is not a column: producers never conflict
/// with each other, and only barriers consume the queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Access {
    pub reads: ColumnSet,
    pub writes: ColumnSet,
}

impl Access {
    /// Returns `true` if running both passes at once could race
    pub fn conflicts_with(&self, other: &Access) -> bool {
        self.writes.intersects(other.writes)
            || self.writes.intersects(other.reads)
            || self.reads.intersects(other.writes)
    }
}

/// One data-parallel update over the store
pub struct Pass {
    name: &'static str,
    access: Access,
    systems: SystemConfigs,
}

impl Pass {
    pub fn new<M>(name: &'static str, systems: impl IntoSystemConfigs<M>) -> Self {
        Self {
            name,
            access: Access::default(),
            systems: systems.into_configs(),
        }
    }

    pub fn reads(mut self, columns: &[Column]) -> Self {
        self.access.reads = self.access.reads.union(ColumnSet::of(columns));
        self
    }

    pub fn writes(mut self, columns: &[Column]) -> Self {
        self.access.writes = self.access.writes.union(ColumnSet::of(columns));
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }
}

/// Completion token for scheduled nodes; later nodes can wait on it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JobHandle {
    nodes: Vec<usize>,
}

impl JobHandle {
    /// A handle that waits on nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// A handle that completes when every given handle has completed
    pub fn combine(handles: &[&JobHandle]) -> Self {
        let mut nodes: Vec<usize> = handles.iter().flat_map(|h| h.nodes.iter().copied()).collect();
        nodes.sort_unstable();
        nodes.dedup();
        Self { nodes }
    }

    pub fn is_none(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct NodeLabel(usize);

/// Label of the per-tick simulation schedule
#[derive(ScheduleLabel, Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimTick;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Pass,
    Barrier,
}

#[derive(Debug)]
struct Node {
    name: &'static str,
    kind: NodeKind,
    access: Access,
    deps: Vec<usize>,
}

/// Dependency-ordered passes for one tick
pub struct TaskGraph {
    schedule: Schedule,
    nodes: Vec<Node>,
    last_barrier: Option<usize>,
}

impl Default for TaskGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskGraph {
    /// Empty graph running on the shared compute pool
    pub fn new() -> Self {
        ComputeTaskPool::get_or_init(TaskPool::default);
        Self::build()
    }

    /// Empty graph; sizes the compute pool on first use (0 = one per core)
    pub fn with_workers(workers: usize) -> Self {
        ComputeTaskPool::get_or_init(|| {
            let mut builder = TaskPoolBuilder::new().thread_name("hive-worker".to_string());
            if workers > 0 {
                builder = builder.num_threads(workers);
            }
            builder.build()
        });
        Self::build()
    }

    fn build() -> Self {
        let mut schedule = Schedule::new(SimTick);
        schedule
            .set_executor_kind(ExecutorKind::MultiThreaded)
            .set_build_settings(ScheduleBuildSettings {
                ambiguity_detection: LogLevel::Warn,
                auto_insert_apply_deferred: false,
                ..Default::default()
            });
        Self {
            schedule,
            nodes: Vec::new(),
            last_barrier: None,
        }
    }

    /// Add a pass that runs after `depends_on`, after the last barrier, and
    /// after every earlier pass it conflicts with
    pub fn schedule(&mut self, pass: Pass, depends_on: &JobHandle) -> JobHandle {
        let id = self.nodes.len();
        let first_open = self.last_barrier.map_or(0, |b| b + 1);

        let mut deps: Vec<usize> = depends_on.nodes.clone();
        deps.extend(self.last_barrier);
        deps.extend(
            (first_open..id).filter(|&i| self.nodes[i].access.conflicts_with(&pass.access)),
        );
        deps.sort_unstable();
        deps.dedup();

        tracing::debug!(pass = pass.name, node = id, deps = ?deps, "Scheduled pass");
        self.add_node(id, pass.systems, &deps);
        self.nodes.push(Node {
            name: pass.name,
            kind: NodeKind::Pass,
            access: pass.access,
            deps,
        });
        JobHandle { nodes: vec![id] }
    }

    /// Combine handles; see [`JobHandle::combine`]
    pub fn combine(&self, handles: &[&JobHandle]) -> JobHandle {
        JobHandle::combine(handles)
    }

    /// Flush the mutation queue once every node scheduled so far has finished
    pub fn barrier(&mut self, name: &'static str) -> JobHandle {
        let id = self.nodes.len();
        let first_open = self.last_barrier.map_or(0, |b| b + 1);
        let mut deps: Vec<usize> = self.last_barrier.into_iter().collect();
        deps.extend(first_open..id);

        tracing::debug!(barrier = name, node = id, "Scheduled flush");
        self.add_node(id, flush_mutations.into_configs(), &deps);
        self.nodes.push(Node {
            name,
            kind: NodeKind::Barrier,
            access: Access::default(),
            deps,
        });
        self.last_barrier = Some(id);
        JobHandle { nodes: vec![id] }
    }

    fn add_node(&mut self, id: usize, systems: SystemConfigs, deps: &[usize]) {
        let mut configs = systems.in_set(NodeLabel(id));
        for &dep in deps {
            configs = configs.after(NodeLabel(dep));
        }
        self.schedule.add_systems(configs);
    }

    /// Node names grouped into waves that may execute concurrently
    pub fn stages(&self) -> Vec<Vec<&'static str>> {
        let mut level = vec![0usize; self.nodes.len()];
        let mut stages: Vec<Vec<&'static str>> = Vec::new();
        for (i, node) in self.nodes.iter().enumerate() {
            level[i] = node.deps.iter().map(|&d| level[d] + 1).max().unwrap_or(0);
            if stages.len() <= level[i] {
                stages.resize_with(level[i] + 1, Vec::new);
            }
            stages[level[i]].push(node.name);
        }
        stages
    }

    /// Names of the barrier nodes, in order
    pub fn barriers(&self) -> Vec<&'static str> {
        self.nodes
            .iter()
            .filter(|n| n.kind == NodeKind::Barrier)
            .map(|n| n.name)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Run every pass and flush of the tick, blocking until all are done
    ///
    /// A panicking pass aborts the tick and is reported as
    /// [`SimError::PassFault`]. Flushes that already ran stay applied.
    pub fn run_to_completion(&mut self, world: &mut World) -> Result<(), SimError> {
        let schedule = &mut self.schedule;
        catch_unwind(AssertUnwindSafe(|| schedule.run(world))).map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "pass panicked".to_string());
            let tick = world.get_resource::<TickClock>().map_or(0, |c| c.tick);
            tracing::error!(tick, %message, "Tick faulted");
            SimError::PassFault { tick, message }
        })
    }
}
