//! Rapier3D physics for the Gorillas city: Z-up world, collision groups and
//! explosion impulses.

pub mod collision;
pub mod explosion;
pub mod physics_world;

pub use collision::*;
pub use explosion::*;
pub use physics_world::*;

// Re-export Rapier for downstream crates
pub use rapier3d;

// Re-export common Rapier types
pub use rapier3d::prelude::{ColliderHandle, RigidBodyHandle};
