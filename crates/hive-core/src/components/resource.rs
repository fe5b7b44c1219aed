//! Resource Components
//!
//! A resource is falling (no `Stacked`, no `HeldBy`), stacked (`Stacked`) or
//! held (`HeldBy`). The flush keeps those states exclusive.

use bevy_ecs::prelude::*;

/// Marker for a collectible resource
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResourceItem;

/// Structural marker for a resource at rest in a grid stack
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stacked {
    /// 0-based slot within the cell's stack
    pub index: u32,
}

/// Weak reference to the bee carrying this resource
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeldBy(pub Entity);

/// Whether this resource is the top of its stack and may be foraged
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackTop(pub bool);
