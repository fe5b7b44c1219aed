//! ECS Components
//!
//! Columns for bees, resources and spawners.

pub mod bee;
pub mod motion;
pub mod resource;
pub mod spawn;

pub use bee::*;
pub use motion::*;
pub use resource::*;
pub use spawn::*;
