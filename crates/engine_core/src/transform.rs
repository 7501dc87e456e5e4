//! Transform component and utilities for spatial positioning.
//!
//! The world is Z-up: the ground is the XY plane, +Y points "forward" and
//! heading rotates around Z.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Create a new transform at the given position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Build a rotation from heading/pitch/roll in degrees.
    /// Heading turns around Z, pitch around X, roll around Y.
    pub fn hpr_rotation(heading: f32, pitch: f32, roll: f32) -> Quat {
        Quat::from_euler(
            EulerRot::ZXY,
            heading.to_radians(),
            pitch.to_radians(),
            roll.to_radians(),
        )
    }

    /// Set the rotation from heading/pitch/roll in degrees.
    pub fn set_hpr(&mut self, heading: f32, pitch: f32, roll: f32) {
        self.rotation = Self::hpr_rotation(heading, pitch, roll);
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Get the forward direction (positive Y).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    /// Get the right direction (positive X).
    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    /// Get the up direction (positive Z).
    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Translate the transform by a delta.
    pub fn translate(&mut self, delta: Vec3) {
        self.position += delta;
    }

    /// Apply an angular velocity (radians per second, per axis) over `dt`.
    pub fn spin(&mut self, angular: Vec3, dt: f32) {
        let delta = Quat::from_scaled_axis(angular * dt);
        self.rotation = (delta * self.rotation).normalize();
    }
}

/// Raw transform data for GPU upload (instance data).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TransformRaw {
    pub model: [[f32; 4]; 4],
}

impl From<&Transform> for TransformRaw {
    fn from(transform: &Transform) -> Self {
        Self {
            model: transform.to_matrix().to_cols_array_2d(),
        }
    }
}

impl From<Transform> for TransformRaw {
    fn from(transform: Transform) -> Self {
        Self::from(&transform)
    }
}
