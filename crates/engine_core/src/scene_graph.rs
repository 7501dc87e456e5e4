//! In-memory scene graph backed by a hecs world.
//!
//! Used by the headless runner and the tests. It keeps exactly the state a
//! renderer would need (transform, tint, visibility, lights) and can export
//! per-instance transforms for upload.

use crate::scene::*;
use crate::{Transform, TransformRaw};
use glam::{Quat, Vec3};
use hecs::World;
use std::collections::HashSet;

/// Render state of a visual node.
#[derive(Debug, Clone)]
pub struct Appearance {
    pub color: [f32; 4],
    pub visible: bool,
    pub blend: BlendMode,
    pub billboard: bool,
    pub unlit: bool,
    pub texture: Option<TextureHandle>,
    pub shader: Option<String>,
}

/// Model a node was built from.
#[derive(Debug, Clone)]
pub struct ModelRef(pub Option<String>);

/// Point light state.
#[derive(Debug, Clone, Copy)]
pub struct PointLight {
    pub color: [f32; 4],
    pub attenuation: Vec3,
    pub max_distance: f32,
}

pub struct SceneGraph {
    world: World,
    models: HashSet<String>,
    textures: HashSet<String>,
    active_lights: HashSet<NodeId>,
    shaders_supported: bool,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    /// Create an empty scene with the built-in primitive models available.
    pub fn new() -> Self {
        let models = [MODEL_SPHERE, MODEL_CUBE, MODEL_PLANE, MODEL_BOX]
            .iter()
            .map(|m| m.to_string())
            .collect();
        Self {
            world: World::new(),
            models,
            textures: HashSet::new(),
            active_lights: HashSet::new(),
            shaders_supported: true,
        }
    }

    /// Toggle shader support (older GPUs / software renderers report none).
    pub fn with_shaders(mut self, supported: bool) -> Self {
        self.shaders_supported = supported;
        self
    }

    pub fn register_model(&mut self, path: &str) {
        self.models.insert(path.to_string());
    }

    /// Make a model unavailable so later loads fail.
    pub fn remove_model(&mut self, path: &str) {
        self.models.remove(path);
    }

    pub fn register_texture(&mut self, path: &str) {
        self.textures.insert(path.to_string());
    }

    pub fn appearance(&self, node: NodeId) -> Option<Appearance> {
        self.world.get::<&Appearance>(node).ok().map(|a| (*a).clone())
    }

    pub fn light(&self, node: NodeId) -> Option<PointLight> {
        self.world.get::<&PointLight>(node).ok().map(|l| *l)
    }

    pub fn is_light_enabled(&self, node: NodeId) -> bool {
        self.active_lights.contains(&node)
    }

    /// Count of live nodes built from `model`.
    pub fn count_model(&self, model: &str) -> usize {
        self.world
            .query::<&ModelRef>()
            .iter()
            .filter(|(_, m)| m.0.as_deref() == Some(model))
            .count()
    }

    /// Count of live nodes currently shown.
    pub fn visible_count(&self) -> usize {
        self.world
            .query::<&Appearance>()
            .iter()
            .filter(|(_, a)| a.visible)
            .count()
    }

    /// Instance transforms of every visible node, ready for GPU upload.
    pub fn visible_instances(&self) -> Vec<TransformRaw> {
        self.world
            .query::<(&Transform, &Appearance)>()
            .iter()
            .filter(|(_, (_, a))| a.visible)
            .map(|(_, (t, _))| TransformRaw::from(t))
            .collect()
    }
}

impl Transformable for SceneGraph {
    fn set_position(&mut self, node: NodeId, position: Vec3) {
        if let Ok(mut t) = self.world.get::<&mut Transform>(node) {
            t.position = position;
        }
    }

    fn position(&self, node: NodeId) -> Option<Vec3> {
        self.world.get::<&Transform>(node).ok().map(|t| t.position)
    }

    fn set_rotation(&mut self, node: NodeId, rotation: Quat) {
        if let Ok(mut t) = self.world.get::<&mut Transform>(node) {
            t.rotation = rotation;
        }
    }

    fn rotation(&self, node: NodeId) -> Option<Quat> {
        self.world.get::<&Transform>(node).ok().map(|t| t.rotation)
    }

    fn set_scale(&mut self, node: NodeId, scale: Vec3) {
        if let Ok(mut t) = self.world.get::<&mut Transform>(node) {
            t.scale = scale;
        }
    }

    fn scale(&self, node: NodeId) -> Option<Vec3> {
        self.world.get::<&Transform>(node).ok().map(|t| t.scale)
    }
}

impl Visible for SceneGraph {
    fn set_visible(&mut self, node: NodeId, visible: bool) {
        if let Ok(mut a) = self.world.get::<&mut Appearance>(node) {
            a.visible = visible;
        }
    }

    fn is_visible(&self, node: NodeId) -> bool {
        self.world
            .get::<&Appearance>(node)
            .map(|a| a.visible)
            .unwrap_or(false)
    }
}

impl Colorable for SceneGraph {
    fn set_color(&mut self, node: NodeId, color: [f32; 4]) {
        if let Ok(mut a) = self.world.get::<&mut Appearance>(node) {
            a.color = color;
        }
    }

    fn color(&self, node: NodeId) -> Option<[f32; 4]> {
        self.world.get::<&Appearance>(node).ok().map(|a| a.color)
    }
}

impl Scene for SceneGraph {
    fn spawn(&mut self, desc: NodeDesc) -> Result<NodeId, SceneError> {
        if let Some(model) = &desc.model {
            if !self.models.contains(model) {
                return Err(SceneError::MissingAsset(model.clone()));
            }
        }
        let appearance = Appearance {
            color: desc.color,
            visible: desc.visible,
            blend: desc.blend,
            billboard: desc.billboard,
            unlit: desc.unlit,
            texture: None,
            shader: None,
        };
        Ok(self
            .world
            .spawn((desc.transform, appearance, ModelRef(desc.model))))
    }

    fn despawn(&mut self, node: NodeId) -> bool {
        self.active_lights.remove(&node);
        self.world.despawn(node).is_ok()
    }

    fn contains(&self, node: NodeId) -> bool {
        self.world.contains(node)
    }

    fn node_count(&self) -> usize {
        self.world.len() as usize
    }

    fn spawn_light(&mut self, desc: LightDesc) -> Result<NodeId, SceneError> {
        let light = PointLight {
            color: desc.color,
            attenuation: desc.attenuation,
            max_distance: desc.max_distance,
        };
        Ok(self.world.spawn((
            Transform::from_position(desc.position),
            light,
            ModelRef(None),
        )))
    }

    fn set_light_color(&mut self, node: NodeId, color: [f32; 4]) -> Result<(), SceneError> {
        if !self.world.contains(node) {
            return Err(SceneError::UnknownNode(node));
        }
        let mut light = self
            .world
            .get::<&mut PointLight>(node)
            .map_err(|_| SceneError::NotALight(node))?;
        light.color = color;
        Ok(())
    }

    fn set_light_range(
        &mut self,
        node: NodeId,
        attenuation: Vec3,
        max_distance: f32,
    ) -> Result<(), SceneError> {
        if !self.world.contains(node) {
            return Err(SceneError::UnknownNode(node));
        }
        let mut light = self
            .world
            .get::<&mut PointLight>(node)
            .map_err(|_| SceneError::NotALight(node))?;
        light.attenuation = attenuation;
        light.max_distance = max_distance;
        Ok(())
    }

    fn enable_light(&mut self, node: NodeId) -> Result<(), SceneError> {
        if !self.world.contains(node) {
            return Err(SceneError::UnknownNode(node));
        }
        if self.world.get::<&PointLight>(node).is_err() {
            return Err(SceneError::NotALight(node));
        }
        self.active_lights.insert(node);
        Ok(())
    }

    fn disable_light(&mut self, node: NodeId) {
        self.active_lights.remove(&node);
    }

    fn active_light_count(&self) -> usize {
        self.active_lights.len()
    }

    fn load_texture(&mut self, path: &str) -> Result<TextureHandle, SceneError> {
        if self.textures.contains(path) {
            Ok(TextureHandle(path.to_string()))
        } else {
            Err(SceneError::MissingAsset(path.to_string()))
        }
    }

    fn procedural_texture(&mut self, name: &str) -> TextureHandle {
        let path = format!("procedural:{name}");
        log::debug!("Generated texture {path}");
        self.textures.insert(path.clone());
        TextureHandle(path)
    }

    fn set_texture(&mut self, node: NodeId, texture: &TextureHandle) -> Result<(), SceneError> {
        if !self.textures.contains(&texture.0) {
            return Err(SceneError::MissingAsset(texture.0.clone()));
        }
        let mut a = self
            .world
            .get::<&mut Appearance>(node)
            .map_err(|_| SceneError::UnknownNode(node))?;
        a.texture = Some(texture.clone());
        Ok(())
    }

    fn apply_shader(&mut self, node: NodeId, shader: &str) -> Result<(), SceneError> {
        if !self.shaders_supported {
            return Err(SceneError::Unsupported("shaders"));
        }
        let mut a = self
            .world
            .get::<&mut Appearance>(node)
            .map_err(|_| SceneError::UnknownNode(node))?;
        a.shader = Some(shader.to_string());
        Ok(())
    }
}
