//! One live explosion and the sub-effects it owns.

use super::particles::{Debris, SmokePuff, Spark};
use super::{EffectPools, ExplosionKind};
use engine_core::{NodeId, Scene, Vec3};
use physics::{ExplosionPhysics, RigidBodyHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExplosionId(pub u64);

/// Shockwave is visible for the first 40% of the explosion.
const SHOCKWAVE_END: f32 = 0.4;
/// Flash is visible for the first 10%.
const FLASH_END: f32 = 0.1;
/// Lights dimmer than this are switched off for good.
const LIGHT_CUTOFF: f32 = 0.05;

#[derive(Debug, Clone, Copy)]
pub struct ExplosionLight {
    pub node: NodeId,
    /// 1.0 for the central light, less for the secondary ones.
    pub strength: f32,
    pub central: bool,
}

impl ExplosionLight {
    pub fn color(&self, fade: f32) -> [f32; 4] {
        let i = fade * self.strength;
        if self.central {
            [i, i * 0.6, i * 0.2, 1.0]
        } else {
            [i * 0.8, i * 0.5, i * 0.2, 1.0]
        }
    }
}

#[derive(Debug)]
pub struct Explosion {
    pub id: ExplosionId,
    pub kind: ExplosionKind,
    pub epicenter: Vec3,
    pub radius: f32,
    pub color: [f32; 3],
    pub age: f32,
    pub duration: f32,
    pub lights: Vec<ExplosionLight>,
    pub shockwave: Option<NodeId>,
    pub flash: Option<NodeId>,
    pub debris: Vec<Debris>,
    pub sparks: Vec<Spark>,
    pub smoke: Vec<SmokePuff>,
    pub fragments: Vec<RigidBodyHandle>,
}

impl Explosion {
    pub fn new(
        id: ExplosionId,
        kind: ExplosionKind,
        epicenter: Vec3,
        radius: f32,
        duration: f32,
    ) -> Self {
        Self {
            id,
            kind,
            epicenter,
            radius,
            color: kind.profile().color,
            age: 0.0,
            duration,
            lights: Vec::new(),
            shockwave: None,
            flash: None,
            debris: Vec::new(),
            sparks: Vec::new(),
            smoke: Vec::new(),
            fragments: Vec::new(),
        }
    }

    /// Normalized age in [0, 1].
    pub fn progress(&self) -> f32 {
        if self.duration <= 0.0 {
            1.0
        } else {
            (self.age / self.duration).clamp(0.0, 1.0)
        }
    }

    pub fn is_finished(&self) -> bool {
        self.age >= self.duration
    }

    pub fn particle_count(&self) -> usize {
        self.debris.len() + self.sparks.len() + self.smoke.len()
    }

    /// Shrink the explosion to `new_duration`, keeping the same share of its
    /// remaining time.
    pub fn shorten(&mut self, new_duration: f32) {
        if self.duration <= new_duration {
            return;
        }
        let remaining = self.duration - self.age;
        let factor = new_duration / self.duration;
        self.duration = new_duration;
        self.age = (new_duration - remaining * factor).max(0.0);
    }

    pub(super) fn update_shockwave<S: Scene>(&mut self, scene: &mut S, t: f32) {
        let Some(node) = self.shockwave else {
            return;
        };
        if t < SHOCKWAVE_END {
            scene.set_uniform_scale(node, (t * self.radius * 3.0).max(0.01));
            scene.set_alpha(node, (0.8 - t * 2.0).max(0.0));
        } else if scene.is_visible(node) {
            scene.set_visible(node, false);
        }
    }

    pub(super) fn update_flash<S: Scene>(&mut self, scene: &mut S, t: f32) {
        let Some(node) = self.flash else {
            return;
        };
        if t < FLASH_END {
            scene.set_alpha(node, (0.7 - t * 7.0).max(0.0));
        } else if scene.is_visible(node) {
            scene.set_visible(node, false);
        }
    }

    pub(super) fn update_lights<S: Scene + 'static>(
        &mut self,
        scene: &mut S,
        pools: &mut EffectPools<S>,
        t: f32,
    ) {
        if self.lights.is_empty() {
            return;
        }
        let fade = (1.0 - t * 2.0).max(0.0);
        if fade <= LIGHT_CUTOFF {
            for light in self.lights.drain(..) {
                pools.release_light(scene, light.node);
            }
            return;
        }
        for light in &self.lights {
            if let Err(e) = scene.set_light_color(light.node, light.color(fade)) {
                log::trace!("Explosion {:?} light: {e}", self.id);
            }
        }
    }

    /// Return every pooled visual, despawn the rest and drop physics
    /// fragments. Safe to call more than once.
    pub(super) fn teardown<S: Scene + 'static>(
        &mut self,
        scene: &mut S,
        pools: &mut EffectPools<S>,
        physics: Option<&mut ExplosionPhysics>,
    ) {
        for light in self.lights.drain(..) {
            pools.release_light(scene, light.node);
        }
        for d in self.debris.drain(..) {
            pools.debris.release(scene, d.node);
        }
        for s in self.sparks.drain(..) {
            pools.sparks.release(scene, s.node);
        }
        for p in self.smoke.drain(..) {
            pools.smoke.release(scene, p.node);
        }
        if let Some(node) = self.shockwave.take() {
            scene.despawn(node);
        }
        if let Some(node) = self.flash.take() {
            scene.despawn(node);
        }
        match physics {
            Some(physics) => {
                for handle in self.fragments.drain(..) {
                    if physics.is_registered(handle) {
                        physics.remove_body(handle);
                    }
                }
            }
            None => self.fragments.clear(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Colorable, NodeDesc, SceneGraph, Transformable, Visible, MODEL_SPHERE};

    fn with_overlays(scene: &mut SceneGraph, radius: f32) -> Explosion {
        let mut e = Explosion::new(ExplosionId(0), ExplosionKind::Standard, Vec3::ZERO, radius, 2.0);
        e.shockwave = Some(scene.spawn(NodeDesc::model(MODEL_SPHERE)).unwrap());
        e.flash = Some(scene.spawn(NodeDesc::model(MODEL_SPHERE)).unwrap());
        e
    }

    #[test]
    fn shockwave_grows_then_hides() {
        let mut scene = SceneGraph::new();
        let mut e = with_overlays(&mut scene, 2.0);
        let node = e.shockwave.unwrap();

        e.update_shockwave(&mut scene, 0.0);
        assert_eq!(scene.scale(node), Some(Vec3::splat(0.01)));

        e.update_shockwave(&mut scene, 0.05);
        assert!(scene.is_visible(node));
        assert!((scene.scale(node).unwrap().x - 0.3).abs() < 1e-5);
        assert!((scene.color(node).unwrap()[3] - 0.7).abs() < 1e-5);

        e.update_shockwave(&mut scene, 0.2);
        assert!(scene.is_visible(node));
        assert!((scene.scale(node).unwrap().x - 1.2).abs() < 1e-5);
        assert!((scene.color(node).unwrap()[3] - 0.4).abs() < 1e-5);

        e.update_shockwave(&mut scene, 0.4);
        assert!(!scene.is_visible(node));
        e.update_shockwave(&mut scene, 0.5);
        assert!(!scene.is_visible(node));
        // Hidden, not despawned: teardown owns the node.
        assert!(scene.contains(node));
        assert_eq!(e.shockwave, Some(node));
        assert_eq!(scene.node_count(), 2);
    }

    #[test]
    fn flash_only_shows_at_the_start() {
        let mut scene = SceneGraph::new();
        let mut e = with_overlays(&mut scene, 2.0);
        let node = e.flash.unwrap();

        e.update_flash(&mut scene, 0.05);
        assert!(scene.is_visible(node));
        assert!((scene.color(node).unwrap()[3] - 0.35).abs() < 1e-5);

        e.update_flash(&mut scene, 0.1);
        assert!(!scene.is_visible(node));
        e.update_flash(&mut scene, 0.2);
        assert!(!scene.is_visible(node));
        assert!(scene.contains(node));
        assert!(scene.is_visible(e.shockwave.unwrap()));
    }

    #[test]
    fn overlays_without_nodes_are_skipped() {
        let mut scene = SceneGraph::new();
        let mut e = Explosion::new(ExplosionId(1), ExplosionKind::Small, Vec3::ZERO, 1.0, 1.0);
        e.update_shockwave(&mut scene, 0.1);
        e.update_flash(&mut scene, 0.05);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn shorten_scales_remaining_time() {
        let mut e = Explosion::new(ExplosionId(0), ExplosionKind::Fire, Vec3::ZERO, 2.0, 4.0);
        e.age = 1.0;
        e.shorten(2.0);
        assert_eq!(e.duration, 2.0);
        // 3 s left at half speed: 1.5 s left.
        assert!((e.age - 0.5).abs() < 1e-6);

        // Never lengthens.
        e.shorten(3.0);
        assert_eq!(e.duration, 2.0);
    }

    #[test]
    fn light_colors_fade() {
        let central = ExplosionLight {
            node: hecs::Entity::DANGLING,
            strength: 1.0,
            central: true,
        };
        assert_eq!(central.color(1.0), [1.0, 0.6, 0.2, 1.0]);
        let secondary = ExplosionLight {
            strength: 0.8,
            central: false,
            ..central
        };
        let c = secondary.color(0.5);
        assert!((c[0] - 0.32).abs() < 1e-6);
        assert!((c[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn progress_clamps() {
        let mut e = Explosion::new(ExplosionId(1), ExplosionKind::Small, Vec3::ZERO, 1.0, 1.0);
        e.age = 2.0;
        assert_eq!(e.progress(), 1.0);
        assert!(e.is_finished());
        e.duration = 0.0;
        assert_eq!(e.progress(), 1.0);
    }
}
