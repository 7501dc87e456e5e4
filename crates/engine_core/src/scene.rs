//! Scene-graph collaborator interface.
//!
//! Game systems never own renderer objects directly. They create nodes through
//! [`Scene`], move and tint them through the capability traits and hand them
//! back when done. Every call is synchronous and takes effect immediately.

use crate::Transform;
use glam::{Quat, Vec3};
use thiserror::Error;

/// Handle to a node in the scene.
pub type NodeId = hecs::Entity;

/// Built-in model paths every scene is expected to provide.
pub const MODEL_SPHERE: &str = "models/misc/sphere";
pub const MODEL_CUBE: &str = "models/misc/cube";
pub const MODEL_PLANE: &str = "models/misc/plane";
pub const MODEL_BOX: &str = "models/misc/box";

/// Errors raised by scene operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SceneError {
    #[error("asset not found: {0}")]
    MissingAsset(String),
    #[error("node {0:?} does not exist")]
    UnknownNode(NodeId),
    #[error("node {0:?} is not a light")]
    NotALight(NodeId),
    #[error("feature unavailable: {0}")]
    Unsupported(&'static str),
}

/// How a node's color is combined with what is behind it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlendMode {
    #[default]
    Opaque,
    Alpha,
    Additive,
}

/// Handle to a loaded (or generated) texture.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub String);

/// Description of a visual node to create.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeDesc {
    /// Model path, or `None` for an empty grouping node.
    pub model: Option<String>,
    pub transform: Transform,
    pub color: [f32; 4],
    pub visible: bool,
    pub blend: BlendMode,
    /// Always face the camera.
    pub billboard: bool,
    /// Ignore scene lighting.
    pub unlit: bool,
}

impl Default for NodeDesc {
    fn default() -> Self {
        Self {
            model: None,
            transform: Transform::default(),
            color: [1.0; 4],
            visible: true,
            blend: BlendMode::Opaque,
            billboard: false,
            unlit: false,
        }
    }
}

impl NodeDesc {
    pub fn model(path: &str) -> Self {
        Self {
            model: Some(path.to_string()),
            ..Default::default()
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.transform.scale = Vec3::splat(scale);
        self
    }

    pub fn colored(mut self, color: [f32; 4]) -> Self {
        self.color = color;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn billboard(mut self) -> Self {
        self.billboard = true;
        self
    }

    pub fn unlit(mut self) -> Self {
        self.unlit = true;
        self
    }
}

/// Description of a point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightDesc {
    pub position: Vec3,
    pub color: [f32; 4],
    /// Constant, linear and quadratic attenuation.
    pub attenuation: Vec3,
    pub max_distance: f32,
}

impl Default for LightDesc {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            color: [1.0, 0.5, 0.2, 1.0],
            attenuation: Vec3::new(1.0, 0.0, 0.5),
            max_distance: f32::INFINITY,
        }
    }
}

/// Nodes that can be moved, rotated and scaled.
pub trait Transformable {
    fn set_position(&mut self, node: NodeId, position: Vec3);
    fn position(&self, node: NodeId) -> Option<Vec3>;
    fn set_rotation(&mut self, node: NodeId, rotation: Quat);
    fn rotation(&self, node: NodeId) -> Option<Quat>;
    fn set_scale(&mut self, node: NodeId, scale: Vec3);
    fn scale(&self, node: NodeId) -> Option<Vec3>;

    fn set_uniform_scale(&mut self, node: NodeId, scale: f32) {
        self.set_scale(node, Vec3::splat(scale));
    }

    fn set_transform(&mut self, node: NodeId, transform: Transform) {
        self.set_position(node, transform.position);
        self.set_rotation(node, transform.rotation);
        self.set_scale(node, transform.scale);
    }
}

/// Nodes that can be shown and hidden.
pub trait Visible {
    fn set_visible(&mut self, node: NodeId, visible: bool);
    fn is_visible(&self, node: NodeId) -> bool;

    fn toggle_visible(&mut self, node: NodeId) {
        let visible = self.is_visible(node);
        self.set_visible(node, !visible);
    }
}

/// Nodes that carry an RGBA tint.
pub trait Colorable {
    fn set_color(&mut self, node: NodeId, color: [f32; 4]);
    fn color(&self, node: NodeId) -> Option<[f32; 4]>;

    /// Replace only the alpha channel.
    fn set_alpha(&mut self, node: NodeId, alpha: f32) {
        if let Some(mut color) = self.color(node) {
            color[3] = alpha.clamp(0.0, 1.0);
            self.set_color(node, color);
        }
    }
}

/// The host scene graph as seen by game systems.
pub trait Scene: Transformable + Visible + Colorable {
    /// Create a visual node. Fails when its model cannot be loaded.
    fn spawn(&mut self, desc: NodeDesc) -> Result<NodeId, SceneError>;

    /// Detach and destroy a node. Returns false if it was already gone.
    fn despawn(&mut self, node: NodeId) -> bool;

    fn contains(&self, node: NodeId) -> bool;

    /// Number of live nodes.
    fn node_count(&self) -> usize;

    /// Create a point light node. The light does not illuminate anything until enabled.
    fn spawn_light(&mut self, desc: LightDesc) -> Result<NodeId, SceneError>;

    fn set_light_color(&mut self, node: NodeId, color: [f32; 4]) -> Result<(), SceneError>;

    /// Change a light's falloff and cutoff distance.
    fn set_light_range(
        &mut self,
        node: NodeId,
        attenuation: Vec3,
        max_distance: f32,
    ) -> Result<(), SceneError>;

    /// Add a light to the set of lights affecting the scene.
    fn enable_light(&mut self, node: NodeId) -> Result<(), SceneError>;

    /// Remove a light from the active set. Disabling an inactive light is a no-op.
    fn disable_light(&mut self, node: NodeId);

    fn active_light_count(&self) -> usize;

    fn load_texture(&mut self, path: &str) -> Result<TextureHandle, SceneError>;

    /// Generate a stand-in texture when an asset is missing.
    fn procedural_texture(&mut self, name: &str) -> TextureHandle;

    fn set_texture(&mut self, node: NodeId, texture: &TextureHandle) -> Result<(), SceneError>;

    /// Apply a named shader effect. Hosts without shader support return `Unsupported`.
    fn apply_shader(&mut self, node: NodeId, shader: &str) -> Result<(), SceneError>;
}
