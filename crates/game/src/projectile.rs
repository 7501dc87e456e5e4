//! Banana flight: explicit Euler integration under gravity and wind.

use crate::city::{Building, GORILLA_HIT_RADIUS};
use engine_core::{NodeId, Quat, Transform, Vec3};
use rand::Rng;
use std::collections::VecDeque;

/// Standard gravity, pointing down Z.
pub const GRAVITY: Vec3 = Vec3::new(0.0, 0.0, -9.8);
/// Throw force to initial speed.
pub const FORCE_SCALE: f32 = 0.1;
/// Wind only nudges the banana.
pub const WIND_FACTOR: f32 = 0.3;
pub const DEFAULT_TTL: f32 = 15.0;
pub const MAX_TRAJECTORY: usize = 50;
pub const WORLD_LIMIT: f32 = 200.0;
pub const FLOOR_LIMIT: f32 = -10.0;
/// Height below which the banana counts as having hit the ground.
pub const GROUND_EPSILON: f32 = 0.5;
/// Collision radius of the banana against buildings.
pub const BANANA_RADIUS: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectileState {
    Active,
    Collided,
    OutOfBounds,
}

#[derive(Debug, Clone)]
pub struct Projectile {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Accumulated spin in degrees; drives heading, pitch and roll.
    pub spin: f32,
    /// Degrees added to `spin` every step.
    pub spin_rate: f32,
    pub trajectory: VecDeque<Vec3>,
    pub max_trajectory: usize,
    pub ttl: f32,
    pub state: ProjectileState,
    /// Player who threw it.
    pub owner: usize,
    pub node: Option<NodeId>,
}

impl Projectile {
    /// Throw from `origin`. Angles are in degrees: `angle_h` around Z from +X,
    /// `angle_v` above the horizon.
    pub fn launch<R: Rng>(origin: Vec3, angle_h: f32, angle_v: f32, force: f32, rng: &mut R) -> Self {
        let (h, v) = (angle_h.to_radians(), angle_v.to_radians());
        let speed = force * FORCE_SCALE;
        let velocity = speed * Vec3::new(v.cos() * h.cos(), v.cos() * h.sin(), v.sin());
        Self {
            position: origin,
            velocity,
            spin: 0.0,
            spin_rate: rng.gen_range(5.0..=15.0),
            trajectory: VecDeque::with_capacity(MAX_TRAJECTORY),
            max_trajectory: MAX_TRAJECTORY,
            ttl: DEFAULT_TTL,
            state: ProjectileState::Active,
            owner: 0,
            node: None,
        }
    }

    /// Advance one tick. Terminal states are sticky.
    pub fn step(&mut self, dt: f32, gravity: Vec3, wind: Vec3) -> ProjectileState {
        if self.state != ProjectileState::Active {
            return self.state;
        }

        self.ttl -= dt;
        if self.ttl <= 0.0 {
            self.state = ProjectileState::OutOfBounds;
            return self.state;
        }

        self.velocity += gravity * dt + wind * dt * WIND_FACTOR;
        self.position += self.velocity * dt;
        self.spin = (self.spin + self.spin_rate) % 360.0;

        self.trajectory.push_back(self.position);
        while self.trajectory.len() > self.max_trajectory {
            self.trajectory.pop_front();
        }

        let p = self.position;
        if p.x.abs() > WORLD_LIMIT || p.y.abs() > WORLD_LIMIT || p.z < FLOOR_LIMIT || p.z > WORLD_LIMIT {
            self.state = ProjectileState::OutOfBounds;
        } else if p.z < GROUND_EPSILON {
            self.state = ProjectileState::Collided;
        }
        self.state
    }

    /// Heading/pitch/roll tumble for rendering.
    pub fn rotation(&self) -> Quat {
        Transform::hpr_rotation(self.spin, self.spin * 0.5, self.spin * 0.3)
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: self.rotation(),
            scale: Vec3::new(0.3, 0.5, 0.25),
        }
    }

    pub fn hits_sphere(&self, center: Vec3) -> bool {
        self.position.distance(center) < GORILLA_HIT_RADIUS
    }

    pub fn hits_building(&self, building: &Building) -> bool {
        let closest = building.closest_point(self.position);
        closest.distance_squared(self.position) <= BANANA_RADIUS * BANANA_RADIUS
    }

    pub fn mark_collided(&mut self) {
        self.state = ProjectileState::Collided;
    }
}
