//! Per-particle kinematics for explosion debris, sparks and smoke.
//!
//! Each particle keeps its own copy of the transform it pushes to the scene,
//! so `advance` is pure and `sync` is the only place that touches nodes.

use engine_core::{Lifetime, NodeId, Scene, Transform, Vec3};
use rand::Rng;
use std::f32::consts::{PI, TAU};

const GRAVITY: f32 = 9.8;
const AIR_DRAG: f32 = 0.98;
const GROUND_Z: f32 = 0.1;
const MIN_DEBRIS_SCALE: f32 = 0.01;

/// Uniform direction on the unit sphere.
pub fn random_direction<R: Rng>(rng: &mut R) -> Vec3 {
    let phi = rng.gen_range(0.0..TAU);
    let theta = rng.gen_range(0.0..PI);
    Vec3::new(theta.sin() * phi.cos(), theta.sin() * phi.sin(), theta.cos())
}

fn jitter<R: Rng>(rng: &mut R, value: f32, amount: f32) -> f32 {
    (value + rng.gen_range(-amount..=amount)).clamp(0.0, 1.0)
}

/// A chunk thrown out by the blast. Bounces on the ground and fades out.
#[derive(Debug, Clone)]
pub struct Debris {
    pub node: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading, pitch, roll in degrees.
    pub hpr: Vec3,
    /// Degrees per second on each of heading, pitch and roll.
    pub spin: Vec3,
    pub scale: f32,
    pub color: [f32; 3],
    pub life: Lifetime,
}

impl Debris {
    pub fn random<R: Rng>(
        rng: &mut R,
        node: NodeId,
        epicenter: Vec3,
        radius: f32,
        base_color: [f32; 3],
        duration: f32,
    ) -> Self {
        let half = radius / 2.0;
        let offset = Vec3::new(
            rng.gen_range(-0.2..=0.2),
            rng.gen_range(-0.2..=0.2),
            rng.gen_range(-0.2..=0.2),
        ) * radius;
        let max_life = (duration * 0.75).max(0.5);
        Self {
            node,
            position: epicenter + offset,
            velocity: random_direction(rng) * rng.gen_range(5.0..=15.0) * half,
            hpr: Vec3::new(
                rng.gen_range(-180.0..=180.0),
                rng.gen_range(-180.0..=180.0),
                rng.gen_range(-180.0..=180.0),
            ),
            spin: Vec3::new(
                rng.gen_range(-180.0..=180.0),
                rng.gen_range(-180.0..=180.0),
                rng.gen_range(-180.0..=180.0),
            ),
            scale: rng.gen_range(0.1..=0.3) * half,
            color: [
                jitter(rng, base_color[0], 0.2),
                jitter(rng, base_color[1], 0.2),
                jitter(rng, base_color[2], 0.2),
            ],
            life: Lifetime::new(rng.gen_range(0.5..=max_life)),
        }
    }

    /// Integrate one tick. Returns false once the chunk has burned out.
    pub fn advance(&mut self, dt: f32) -> bool {
        if self.life.update(dt) {
            return false;
        }
        self.velocity.z -= GRAVITY * dt;
        self.velocity *= AIR_DRAG;
        self.position += self.velocity * dt;
        self.hpr += self.spin * dt;
        self.scale = (self.scale * 0.99).max(MIN_DEBRIS_SCALE);

        if self.position.z < GROUND_Z {
            self.position.z = GROUND_Z;
            if self.velocity.z.abs() > 1.0 {
                self.velocity.z = -self.velocity.z * 0.4;
                self.velocity.x *= 0.7;
                self.velocity.y *= 0.7;
            } else {
                // Resting chunks burn out at triple speed.
                self.velocity = Vec3::ZERO;
                self.life.remaining -= dt * 2.0;
            }
        }
        !self.life.is_expired()
    }

    pub fn alpha(&self) -> f32 {
        self.life.ratio()
    }

    pub fn transform(&self) -> Transform {
        Transform {
            position: self.position,
            rotation: Transform::hpr_rotation(self.hpr.x, self.hpr.y, self.hpr.z),
            scale: Vec3::splat(self.scale),
        }
    }

    pub fn sync<S: Scene>(&self, scene: &mut S) {
        scene.set_transform(self.node, self.transform());
        let [r, g, b] = self.color;
        scene.set_color(self.node, [r, g, b, self.alpha()]);
    }
}

/// Hot, fast, short-lived point that flickers as it falls.
#[derive(Debug, Clone)]
pub struct Spark {
    pub node: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
    pub life: Lifetime,
}

impl Spark {
    pub const BASE_SCALE: f32 = 0.05;

    pub fn random<R: Rng>(rng: &mut R, node: NodeId, epicenter: Vec3, radius: f32) -> Self {
        Self {
            node,
            position: epicenter,
            velocity: random_direction(rng) * rng.gen_range(15.0..=30.0) * (radius / 2.0),
            life: Lifetime::new(rng.gen_range(0.2..=1.0)),
        }
    }

    pub fn color<R: Rng>(rng: &mut R) -> [f32; 4] {
        [1.0, rng.gen_range(0.8..=1.0), rng.gen_range(0.3..=0.6), 1.0]
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        if self.life.update(dt) {
            return false;
        }
        self.velocity.z -= GRAVITY * 0.5 * dt;
        self.position += self.velocity * dt;
        true
    }

    pub fn scale(&self) -> f32 {
        Self::BASE_SCALE * self.life.ratio()
    }

    /// Push position and size; `flicker` toggles visibility this tick.
    pub fn sync<S: Scene>(&self, scene: &mut S, flicker: bool) {
        scene.set_position(self.node, self.position);
        scene.set_uniform_scale(self.node, self.scale());
        if flicker {
            scene.toggle_visible(self.node);
        }
    }
}

/// Slowly rising, spinning, growing puff.
#[derive(Debug, Clone)]
pub struct SmokePuff {
    pub node: NodeId,
    pub position: Vec3,
    pub velocity: Vec3,
    /// Heading in degrees.
    pub heading: f32,
    /// Degrees per second.
    pub spin: f32,
    pub base_scale: f32,
    pub gray: f32,
    pub life: Lifetime,
}

impl SmokePuff {
    pub const ALPHA: f32 = 0.3;

    pub fn random<R: Rng>(
        rng: &mut R,
        node: NodeId,
        epicenter: Vec3,
        radius: f32,
        duration: f32,
    ) -> Self {
        let half = radius / 2.0;
        let offset = Vec3::new(
            rng.gen_range(-half..=half),
            rng.gen_range(-half..=half),
            rng.gen_range(0.0..=half),
        );
        Self {
            node,
            position: epicenter + offset,
            velocity: Vec3::new(
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(-1.0..=1.0),
                rng.gen_range(1.0..=3.0),
            ),
            heading: rng.gen_range(0.0..360.0),
            spin: rng.gen_range(-20.0..=20.0),
            base_scale: rng.gen_range(0.5..=1.5) * radius,
            gray: rng.gen_range(0.3..=0.7),
            life: Lifetime::new(rng.gen_range(1.2..=2.5) * duration),
        }
    }

    pub fn advance(&mut self, dt: f32) -> bool {
        if self.life.update(dt) {
            return false;
        }
        self.position += self.velocity * dt;
        self.heading = (self.heading + self.spin * dt).rem_euclid(360.0);
        true
    }

    /// Grows from a fifth of the base size to twice the base size.
    pub fn scale(&self) -> f32 {
        self.base_scale * (0.2 + 1.8 * (1.0 - self.life.ratio()))
    }

    pub fn alpha(&self) -> f32 {
        Self::ALPHA * self.life.ratio()
    }

    pub fn sync<S: Scene>(&self, scene: &mut S) {
        scene.set_transform(
            self.node,
            Transform {
                position: self.position,
                rotation: Transform::hpr_rotation(self.heading, 0.0, 0.0),
                scale: Vec3::splat(self.scale()),
            },
        );
        scene.set_color(self.node, [self.gray, self.gray, self.gray, self.alpha()]);
    }
}
