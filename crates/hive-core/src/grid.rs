//! Spatial Grid
//!
//! Uniform 2-D grid over the arena floor (x/z). Maps world positions to cell
//! indices for resource stacking. Out-of-range positions clamp to the border
//! cells.

use bevy_ecs::prelude::*;
use glam::{Vec2, Vec3};

/// Grid geometry derived from the field size and resource size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridGeometry {
    /// Centre of cell (0, 0) on the x/z plane
    pub min_corner: Vec2,
    /// Cell extents along x and z
    pub cell_size: Vec2,
    /// Cell counts along x and z
    pub counts: [u32; 2],
}

/// A resolved grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub x: u32,
    pub z: u32,
}

impl GridGeometry {
    /// Lay a grid of resource-sized cells over a field of the given x/z extents
    pub fn for_field(field_xz: Vec2, resource_size: f32) -> Self {
        let counts_f = (field_xz / resource_size).round().max(Vec2::ONE);
        let counts = [counts_f.x as u32, counts_f.y as u32];
        let cell_size = field_xz / counts_f;
        let min_corner = (counts_f - Vec2::ONE) * -(0.5 * cell_size);
        Self {
            min_corner,
            cell_size,
            counts,
        }
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.counts[0] as usize * self.counts[1] as usize
    }

    /// Cell containing a world position, clamped to the grid
    pub fn cell_of(&self, pos: Vec3) -> CellCoord {
        let x = axis_cell(pos.x, self.min_corner.x, self.cell_size.x, self.counts[0]);
        let z = axis_cell(pos.z, self.min_corner.y, self.cell_size.y, self.counts[1]);
        CellCoord { x, z }
    }

    /// Row-major index of a cell
    pub fn index_of(&self, cell: CellCoord) -> usize {
        cell.z as usize * self.counts[0] as usize + cell.x as usize
    }

    /// Shorthand for `index_of(cell_of(pos))`
    pub fn cell_index(&self, pos: Vec3) -> usize {
        self.index_of(self.cell_of(pos))
    }

    /// World x/z of a cell's centre
    pub fn cell_center(&self, cell: CellCoord) -> Vec2 {
        self.min_corner + Vec2::new(cell.x as f32, cell.z as f32) * self.cell_size
    }

    /// Vertical centre of the slot `stack_index` in a stack resting on `floor`
    pub fn stack_height(floor: f32, stack_index: u32, resource_size: f32) -> f32 {
        floor + stack_index as f32 * resource_size + resource_size * 0.5
    }
}

fn axis_cell(coord: f32, min: f32, size: f32, count: u32) -> u32 {
    let raw = ((coord - min + size * 0.5) / size).floor();
    let max = count.saturating_sub(1) as f32;
    // NaN clamps to 0 through the cast.
    raw.clamp(0.0, max) as u32
}

/// Grid cell a resource currently occupies
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GridCell {
    pub index: usize,
}

/// Per-tick occupancy of settled resources per cell
#[derive(Resource, Debug, Clone, Default)]
pub struct StackCounts {
    counts: Vec<u32>,
}

impl StackCounts {
    pub fn new(cell_count: usize) -> Self {
        Self {
            counts: vec![0; cell_count],
        }
    }

    /// Zero every cell, resizing to `cell_count`
    pub fn reset(&mut self, cell_count: usize) {
        self.counts.clear();
        self.counts.resize(cell_count, 0);
    }

    /// Settled resources in a cell; out-of-range cells read as empty
    pub fn get(&self, index: usize) -> u32 {
        self.counts.get(index).copied().unwrap_or(0)
    }

    /// Claim the next slot in a cell and return it
    pub fn claim(&mut self, index: usize) -> u32 {
        match self.counts.get_mut(index) {
            Some(count) => {
                *count += 1;
                *count - 1
            }
            None => 0,
        }
    }

    pub fn increment(&mut self, index: usize) {
        if let Some(count) = self.counts.get_mut(index) {
            *count += 1;
        }
    }

    /// Index of the top slot in a cell, if any resource is stacked there
    pub fn top_index(&self, index: usize) -> Option<u32> {
        self.get(index).checked_sub(1)
    }

    /// Total settled resources across all cells
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }
}
