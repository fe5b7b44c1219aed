//! Simulation
//!
//! Owns the world and the per-tick task graph. Each call to [`Simulation::tick`]
//! runs every pass and flush once:
//!
//! ```text
//! spawn -> FLUSH
//!   -> team buckets -> flocking | dead gravity -> resource motion -> decisions -> FLUSH
//!   -> stack count -> placement | holder release | visual scale -> death timer -> FLUSH
//!   -> integrate bees | integrate resources | stack tops
//! ```

use bevy_ecs::prelude::*;

use crate::components::{BeeSpawnRequest, ResourceSpawnRequest, Spawner};
use crate::config::SimConfig;
use crate::error::SimError;
use crate::graph::{Column, JobHandle, Pass, TaskGraph};
use crate::grid::StackCounts;
use crate::mutation::{MutationQueue, Tallies};
use crate::output::stats::TickStats;
use crate::params::{ArenaParams, TickClock};
use crate::render::{collect_batches, RenderBatch, RenderGroups};
use crate::rng::TickRng;
use crate::systems::{
    advance_death_timers, apply_dead_gravity, apply_flocking, count_stacks, decide,
    integrate_bees, integrate_resources, mark_stack_tops, move_resources, place_resources,
    rebuild_team_buckets, release_orphaned_resources, spawn_requests, update_visual_scale,
    ForageCandidates, TeamBuckets,
};

/// Build the fixed per-tick pass graph
pub fn build_tick_graph(workers: usize) -> TaskGraph {
    let mut graph = TaskGraph::with_workers(workers);
    let none = JobHandle::none();

    graph.schedule(
        Pass::new("spawn", spawn_requests).reads(&[Column::SpawnRequests]),
        &none,
    );
    graph.barrier("flush_spawn");

    graph.schedule(
        Pass::new("team_buckets", rebuild_team_buckets)
            .reads(&[Column::BeeIdentity, Column::BeeLiveness])
            .writes(&[Column::TeamBuckets]),
        &none,
    );
    let flocking = graph.schedule(
        Pass::new("flocking", apply_flocking)
            .reads(&[
                Column::BeeIdentity,
                Column::BeeLiveness,
                Column::BeePosition,
                Column::TeamBuckets,
            ])
            .writes(&[Column::LiveBeeVelocity]),
        &none,
    );
    let falling = graph.schedule(
        Pass::new("dead_bees", apply_dead_gravity)
            .reads(&[Column::BeeLiveness])
            .writes(&[Column::DeadBeeVelocity, Column::BeeTarget, Column::BeeActivity]),
        &none,
    );
    let forces = graph.combine(&[&flocking, &falling]);
    graph.schedule(
        Pass::new("resource_motion", move_resources)
            .reads(&[
                Column::BeeIdentity,
                Column::BeePosition,
                Column::LiveBeeVelocity,
                Column::DeadBeeVelocity,
                Column::ResourceState,
            ])
            .writes(&[
                Column::ResourcePosition,
                Column::ResourceVelocity,
                Column::ResourceCell,
            ]),
        &forces,
    );
    graph.schedule(
        Pass::new("decisions", decide)
            .reads(&[
                Column::BeeIdentity,
                Column::BeeLiveness,
                Column::BeePosition,
                Column::ResourcePosition,
                Column::ResourceState,
                Column::StackTop,
                Column::TeamBuckets,
                Column::ForageCandidates,
            ])
            .writes(&[Column::LiveBeeVelocity, Column::BeeTarget, Column::BeeActivity]),
        &none,
    );
    graph.barrier("flush_decisions");

    graph.schedule(
        Pass::new("stack_count", count_stacks)
            .reads(&[Column::ResourceCell, Column::ResourceState])
            .writes(&[Column::StackCounts]),
        &none,
    );
    graph.schedule(
        Pass::new("stack_place", place_resources)
            .reads(&[Column::ResourceCell, Column::ResourceState])
            .writes(&[
                Column::ResourcePosition,
                Column::ResourceVelocity,
                Column::StackCounts,
                Column::Tallies,
            ]),
        &none,
    );
    graph.schedule(
        Pass::new("holder_release", release_orphaned_resources)
            .reads(&[Column::BeeIdentity, Column::BeeLiveness, Column::ResourceState]),
        &none,
    );
    graph.schedule(
        Pass::new("visual_scale", update_visual_scale)
            .reads(&[
                Column::BeeIdentity,
                Column::BeeLiveness,
                Column::LiveBeeVelocity,
                Column::DeadBeeVelocity,
                Column::DeathTimer,
            ])
            .writes(&[Column::BeeScale]),
        &none,
    );
    graph.schedule(
        Pass::new("death_timer", advance_death_timers).writes(&[Column::DeathTimer]),
        &none,
    );
    graph.barrier("flush_lifecycle");

    graph.schedule(
        Pass::new("integrate_bees", integrate_bees)
            .reads(&[Column::BeeActivity, Column::BeeScale, Column::BeeLiveness])
            .writes(&[
                Column::BeePosition,
                Column::LiveBeeVelocity,
                Column::DeadBeeVelocity,
                Column::BeeSmoothing,
                Column::BeeTransform,
            ]),
        &none,
    );
    graph.schedule(
        Pass::new("integrate_resources", integrate_resources)
            .reads(&[Column::ResourceState, Column::ResourceScale])
            .writes(&[
                Column::ResourcePosition,
                Column::ResourceVelocity,
                Column::ResourceTransform,
            ]),
        &none,
    );
    graph.schedule(
        Pass::new("stack_tops", mark_stack_tops)
            .reads(&[Column::ResourceCell, Column::ResourceState, Column::StackCounts])
            .writes(&[Column::StackTop, Column::ForageCandidates]),
        &none,
    );

    graph
}

/// A running Combat Bees arena
pub struct Simulation {
    world: World,
    graph: TaskGraph,
    tick: u64,
}

impl Simulation {
    /// Arena from a configuration, with the initial bees and resources
    /// queued as spawn requests for the first tick
    pub fn new(config: &SimConfig) -> Result<Self, SimError> {
        let params = ArenaParams::from_config(config)?;
        let mut sim = Self::empty(
            params,
            config.simulation.dt,
            config.simulation.seed,
            config.simulation.workers,
        );
        sim.world.spawn((
            Spawner,
            BeeSpawnRequest {
                count: config.bees.initial_count,
            },
            ResourceSpawnRequest {
                count: config.resources.initial_count,
            },
        ));
        tracing::info!(
            seed = config.simulation.seed,
            bees = config.bees.initial_count,
            resources = config.resources.initial_count,
            "Simulation created"
        );
        Ok(sim)
    }

    /// Arena with no entities
    pub fn empty(params: ArenaParams, dt: f32, seed: u64, workers: usize) -> Self {
        let mut world = World::new();
        world.insert_resource(StackCounts::new(params.grid.cell_count()));
        world.insert_resource(params);
        world.insert_resource(TickClock::new(dt));
        world.insert_resource(TickRng::new(seed));
        world.insert_resource(MutationQueue::new());
        world.insert_resource(RenderGroups::new());
        world.insert_resource(Tallies::default());
        world.insert_resource(TeamBuckets::new());
        world.insert_resource(ForageCandidates::new());

        Self {
            world,
            graph: build_tick_graph(workers),
            tick: 0,
        }
    }

    /// Run one tick to completion
    pub fn tick(&mut self) -> Result<(), SimError> {
        self.world.resource_mut::<TickClock>().tick = self.tick;
        self.world.resource_mut::<TickRng>().set_tick(self.tick);

        self.graph.run_to_completion(&mut self.world)?;
        self.tick += 1;
        Ok(())
    }

    /// Run `ticks` ticks, stopping at the first fault
    pub fn run(&mut self, ticks: u64) -> Result<(), SimError> {
        for _ in 0..ticks {
            self.tick()?;
        }
        Ok(())
    }

    /// Number of completed ticks
    pub fn ticks_completed(&self) -> u64 {
        self.tick
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn params(&self) -> &ArenaParams {
        self.world.resource::<ArenaParams>()
    }

    /// Parallel waves of the tick graph
    pub fn stages(&self) -> Vec<Vec<&'static str>> {
        self.graph.stages()
    }

    /// Settled transforms, one batch per visual group
    pub fn render_batches(&self) -> Vec<RenderBatch> {
        collect_batches(&self.world)
    }

    /// Population snapshot for the last completed tick
    pub fn stats(&mut self) -> TickStats {
        TickStats::collect(&mut self.world, self.tick)
    }
}
