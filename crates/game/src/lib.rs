//! Gorillas 3D War: a city of destructible buildings, two banana-throwing
//! gorillas, and the effects that make each impact count.

pub mod city;
pub mod config;
pub mod destruction;
pub mod effects;
pub mod lod;
pub mod pool;
pub mod projectile;
pub mod weather;
pub mod world;

pub use config::GameConfig;
pub use world::{Aim, GameWorld, MatchState, ThrowError};
