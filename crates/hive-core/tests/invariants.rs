//! Invariant checks over a busy arena
//!
//! Runs a mixed population for a few seconds of simulated time and checks the
//! world after every tick.

use std::collections::BTreeMap;

use bevy_ecs::entity::Entity;
use hive_core::grid::GridCell;
use hive_core::{
    Bee, Dead, HeldBy, Position, ResourceItem, SimConfig, Simulation, StackTop, Stacked,
};

const TOLERANCE: f32 = 1e-4;

fn busy_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.simulation.seed = 7;
    config.simulation.workers = 4;
    config.bees.initial_count = 300;
    config.resources.initial_count = 120;
    config
}

/// Stacked indices per cell form `0..n` and only index `n - 1` is marked top
fn check_stacks(sim: &mut Simulation) {
    let world = sim.world_mut();
    let mut query = world.query::<(&GridCell, Option<&Stacked>, &StackTop, Option<&HeldBy>)>();

    let mut cells: BTreeMap<usize, Vec<(u32, bool)>> = BTreeMap::new();
    for (cell, stacked, top, held) in query.iter(world) {
        match stacked {
            Some(stacked) => {
                assert!(held.is_none(), "stacked resource is also held");
                cells
                    .entry(cell.index)
                    .or_default()
                    .push((stacked.index, top.0));
            }
            None => assert!(!top.0, "unstacked resource marked as stack top"),
        }
    }

    for (cell, mut slots) in cells {
        slots.sort_unstable();
        let n = slots.len() as u32;
        for (expected, (index, top)) in (0..n).zip(slots) {
            assert_eq!(index, expected, "gap in stack of cell {cell}");
            assert_eq!(top, index == n - 1, "wrong top in cell {cell}");
        }
    }
}

/// Every holder is a live bee
fn check_holders(sim: &mut Simulation) {
    let world = sim.world_mut();
    let holders: Vec<Entity> = world
        .query::<&HeldBy>()
        .iter(world)
        .map(|h| h.0)
        .collect();
    for holder in holders {
        assert!(world.get::<Bee>(holder).is_some(), "holder is not a bee");
        assert!(world.get::<Dead>(holder).is_none(), "holder is dead");
    }
}

/// Every bee and resource is inside the arena
fn check_bounds(sim: &mut Simulation) {
    let half = sim.params().half_extents();
    let world = sim.world_mut();
    let mut query = world.query::<&Position>();
    for position in query.iter(world) {
        let p = position.0;
        assert!(p.x.abs() <= half.x + TOLERANCE, "x out of bounds: {p}");
        assert!(p.y.abs() <= half.y + TOLERANCE, "y out of bounds: {p}");
        assert!(p.z.abs() <= half.z + TOLERANCE, "z out of bounds: {p}");
    }
}

/// Created minus removed matches what is alive
fn check_population(sim: &mut Simulation) {
    let stats = sim.stats();
    let bees = (stats.total_live_bees() + stats.dead_bees) as u64;
    assert_eq!(stats.bees_created - stats.bees_removed, bees);

    let world = sim.world_mut();
    let resources = world.query::<&ResourceItem>().iter(world).count();
    assert_eq!(stats.total_resources(), resources);
}

#[test]
fn test_invariants_hold_every_tick() {
    let mut sim = Simulation::new(&busy_config()).unwrap();

    for _ in 0..360 {
        sim.tick().unwrap();
        check_stacks(&mut sim);
        check_holders(&mut sim);
        check_bounds(&mut sim);
        check_population(&mut sim);
    }

    let stats = sim.stats();
    assert_eq!(stats.tick, 360);
    assert!(stats.total_live_bees() > 0);
}

#[test]
fn test_combat_happens_in_a_crowded_arena() {
    let mut config = busy_config();
    config.bees.aggression = 1.0;
    config.resources.initial_count = 0;
    let mut sim = Simulation::new(&config).unwrap();

    sim.run(900).unwrap();

    let stats = sim.stats();
    assert!(stats.kills > 0, "no kills after fifteen seconds of all-out war");
    assert!(stats.total_live_bees() < 300);
}
