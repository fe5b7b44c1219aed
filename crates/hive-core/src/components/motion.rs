//! Motion Components
//!
//! Kinematic columns shared by bees and resources, plus the settled transform
//! handed to the renderer.

use bevy_ecs::prelude::*;
use glam::{Quat, Vec3};
use serde::Serialize;

/// World position
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Position(pub Vec3);

/// World velocity, units per second
#[derive(Component, Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Velocity(pub Vec3);

/// Non-uniform scale computed by the visual pass
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scale(pub Vec3);

impl Default for Scale {
    fn default() -> Self {
        Self(Vec3::ONE)
    }
}

/// Final per-instance transform, settled after integration
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct InstanceTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    /// Colour multiplier; dead bees render darker
    pub tint: f32,
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            tint: 1.0,
        }
    }
}

impl InstanceTransform {
    /// Column-major 4x4 model matrix
    pub fn to_cols_array(&self) -> [f32; 16] {
        glam::Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
            .to_cols_array()
    }
}
