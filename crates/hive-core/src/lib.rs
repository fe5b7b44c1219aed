//! Combat Bees Simulation Core
//!
//! Two hives of bees fight over resources in a bounded arena. Every tick runs
//! a fixed graph of data-parallel passes over an ECS world; structural changes
//! are deferred to a mutation queue and applied at three flush points.

pub mod blueprint;
pub mod components;
pub mod config;
pub mod error;
pub mod graph;
pub mod grid;
pub mod mutation;
pub mod output;
pub mod params;
pub mod render;
pub mod rng;
pub mod simulation;
pub mod systems;

pub use components::*;

pub use config::SimConfig;
pub use error::{ConfigError, SimError};
pub use graph::{Access, Column, ColumnSet, JobHandle, Pass, TaskGraph};
pub use mutation::{MutationQueue, Tallies};
pub use params::{ArenaParams, TickClock};
pub use render::{collect_batches, RenderBatch, VisualGroup};
pub use simulation::Simulation;
