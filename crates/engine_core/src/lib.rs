//! Core engine types and utilities for Gorillas 3D.
//!
//! This crate provides the foundational types used across all game systems:
//! - Transform and spatial components (Z is up)
//! - Time management
//! - Common component types for ECS
//! - The scene-graph collaborator traits and an in-memory scene graph

pub mod components;
pub mod scene;
pub mod scene_graph;
pub mod time;
pub mod transform;

pub use components::*;
pub use scene::*;
pub use scene_graph::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
pub use hecs::{Entity, World};
