//! Statistics Output
//!
//! Per-sample population counts and cumulative tallies, appended one JSON
//! object per line.

use bevy_ecs::prelude::*;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::components::{Bee, Dead, HeldBy, ResourceItem, Stacked};
use crate::mutation::Tallies;

/// Statistics for a single sample
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TickStats {
    /// Completed ticks at sampling time
    pub tick: u64,
    /// Live bees per team, indexed by team
    pub live_bees: [usize; 2],
    pub dead_bees: usize,
    pub resources_stacked: usize,
    pub resources_held: usize,
    pub resources_falling: usize,
    pub kills: u64,
    pub deliveries: u64,
    pub bees_created: u64,
    pub bees_removed: u64,
}

impl TickStats {
    /// Count the current population
    pub fn collect(world: &mut World, tick: u64) -> Self {
        let mut stats = TickStats {
            tick,
            ..Default::default()
        };

        let mut bees = world.query::<(&Bee, Has<Dead>)>();
        for (bee, dead) in bees.iter(world) {
            if dead {
                stats.dead_bees += 1;
            } else {
                stats.live_bees[bee.team.index()] += 1;
            }
        }

        let mut resources = world.query_filtered::<(Has<Stacked>, Has<HeldBy>), With<ResourceItem>>();
        for (stacked, held) in resources.iter(world) {
            match (stacked, held) {
                (_, true) => stats.resources_held += 1,
                (true, false) => stats.resources_stacked += 1,
                (false, false) => stats.resources_falling += 1,
            }
        }

        if let Some(tallies) = world.get_resource::<Tallies>() {
            stats.kills = tallies.kills;
            stats.deliveries = tallies.deliveries;
            stats.bees_created = tallies.bees_created;
            stats.bees_removed = tallies.bees_removed;
        }

        stats
    }

    /// Live bees across both teams
    pub fn total_live_bees(&self) -> usize {
        self.live_bees.iter().sum()
    }

    pub fn total_resources(&self) -> usize {
        self.resources_stacked + self.resources_held + self.resources_falling
    }
}

/// Append-only JSONL writer for [`TickStats`]
pub struct StatsWriter {
    writer: BufWriter<File>,
    samples: u64,
}

impl StatsWriter {
    /// Create a writer, truncating any existing file at `path`
    pub fn create(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
            samples: 0,
        })
    }

    /// Append one sample
    pub fn write(&mut self, stats: &TickStats) -> std::io::Result<()> {
        let json = serde_json::to_string(stats)?;
        writeln!(self.writer, "{}", json)?;
        self.samples += 1;
        Ok(())
    }

    pub fn samples(&self) -> u64 {
        self.samples
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TeamId;
    use std::fs;

    #[test]
    fn test_collect_counts_population() {
        let mut world = World::new();
        world.insert_resource(Tallies {
            kills: 3,
            ..Default::default()
        });
        world.spawn(Bee { team: TeamId::Blue, size: 0.3 });
        world.spawn(Bee { team: TeamId::Yellow, size: 0.3 });
        world.spawn((Bee { team: TeamId::Yellow, size: 0.3 }, Dead::at_tick(0)));
        let holder = world.spawn(Bee { team: TeamId::Yellow, size: 0.3 }).id();
        world.spawn((ResourceItem, Stacked { index: 0 }));
        world.spawn((ResourceItem, HeldBy(holder)));
        world.spawn(ResourceItem);

        let stats = TickStats::collect(&mut world, 12);
        assert_eq!(stats.tick, 12);
        assert_eq!(stats.live_bees, [1, 2]);
        assert_eq!(stats.dead_bees, 1);
        assert_eq!(stats.resources_stacked, 1);
        assert_eq!(stats.resources_held, 1);
        assert_eq!(stats.resources_falling, 1);
        assert_eq!(stats.total_resources(), 3);
        assert_eq!(stats.kills, 3);
    }

    #[test]
    fn test_writer_emits_one_line_per_sample() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stats.jsonl");

        let mut writer = StatsWriter::create(&path).unwrap();
        writer.write(&TickStats { tick: 1, ..Default::default() }).unwrap();
        writer.write(&TickStats { tick: 2, ..Default::default() }).unwrap();
        writer.flush().unwrap();
        assert_eq!(writer.samples(), 2);

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["tick"], 2);
        assert_eq!(second["live_bees"], serde_json::json!([0, 0]));
    }
}
