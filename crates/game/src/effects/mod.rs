//! Explosion and effects engine.
//!
//! An explosion is a bundle of short-lived sub-effects: point lights, a
//! shockwave shell, a flash billboard, debris, sparks and smoke, plus
//! optional rigid-body fragments in the physics world. Particle nodes come
//! from shared [`NodePool`]s and go back to them when they expire; nothing
//! an explosion created outlives it.
//!
//! Sub-effects fail independently. A missing model or texture costs that
//! sub-effect only and is logged; the rest of the explosion still plays.

mod explosion;
mod particles;
mod trail;

pub use explosion::{Explosion, ExplosionId, ExplosionLight};
pub use particles::{random_direction, Debris, SmokePuff, Spark};
pub use trail::{TrailMote, TRAIL_CHANCE};

use crate::config::PoolConfig;
use crate::lod::{LodController, TierSettings};
use crate::pool::{Factory, NodePool, ObjectPool, PoolStats, Release, Reset};
use audio::{SoundCue, SoundSink};
use engine_core::{
    BlendMode, LightDesc, NodeDesc, NodeId, Scene, SceneError, TextureHandle, Vec3, MODEL_PLANE,
    MODEL_SPHERE,
};
use physics::ExplosionPhysics;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;

const MIN_RADIUS: f32 = 0.1;
const MAX_LIGHTS_PER_EXPLOSION: usize = 3;
const LIGHT_STRENGTH: [f32; MAX_LIGHTS_PER_EXPLOSION] = [1.0, 0.8, 0.6];

const TEXTURES: [(&str, &str); 4] = [
    ("smoke", "textures/smoke.png"),
    ("fire", "textures/fire.png"),
    ("explosion", "textures/explosion.png"),
    ("shockwave", "textures/shockwave.png"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExplosionKind {
    Standard,
    Large,
    Small,
    Fire,
}

/// Fixed parameters of an explosion kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindProfile {
    pub radius_scale: f32,
    /// Seconds.
    pub duration: f32,
    pub color: [f32; 3],
    /// Rigid-body fragments before the tier cap.
    pub fragments: usize,
    pub force: f32,
    pub volume: f32,
}

const STANDARD: KindProfile = KindProfile {
    radius_scale: 1.0,
    duration: 2.0,
    color: [1.0, 0.5, 0.0],
    fragments: 10,
    force: 500.0,
    volume: 0.8,
};

const LARGE: KindProfile = KindProfile {
    radius_scale: 2.0,
    duration: 3.0,
    color: [1.0, 0.6, 0.0],
    fragments: 20,
    force: 1000.0,
    volume: 1.0,
};

const SMALL: KindProfile = KindProfile {
    radius_scale: 0.6,
    duration: 1.0,
    color: [1.0, 0.8, 0.2],
    fragments: 0,
    force: 200.0,
    volume: 0.5,
};

const FIRE: KindProfile = KindProfile {
    radius_scale: 1.2,
    duration: 4.0,
    color: [0.9, 0.3, 0.1],
    fragments: 5,
    force: 500.0,
    volume: 0.8,
};

impl ExplosionKind {
    pub fn profile(self) -> &'static KindProfile {
        match self {
            ExplosionKind::Standard => &STANDARD,
            ExplosionKind::Large => &LARGE,
            ExplosionKind::Small => &SMALL,
            ExplosionKind::Fire => &FIRE,
        }
    }

    /// Debris count for a particle hint, before the tier cap.
    pub fn particle_count(self, hint: usize) -> usize {
        match self {
            ExplosionKind::Large => hint * 2,
            ExplosionKind::Small => (hint / 2).max(10),
            ExplosionKind::Standard | ExplosionKind::Fire => hint,
        }
    }

    pub fn has_smoke(self) -> bool {
        self != ExplosionKind::Small
    }

    /// Large blasts also push building bodies around.
    pub fn affects_buildings(self) -> bool {
        self == ExplosionKind::Large
    }
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("could not create {effect}: {source}")]
    Scene {
        effect: &'static str,
        #[source]
        source: SceneError,
    },
}

fn failed(effect: &'static str) -> impl FnOnce(SceneError) -> EffectError {
    move |source| EffectError::Scene { effect, source }
}

/// Collaborators borrowed for one effects call.
pub struct EffectContext<'a, S: Scene> {
    pub scene: &'a mut S,
    pub physics: Option<&'a mut ExplosionPhysics>,
    pub audio: &'a mut dyn SoundSink,
    pub lod: &'a LodController,
}

/// Running totals since the system was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectStats {
    pub explosions: usize,
    /// Debris and sparks.
    pub particles: usize,
    pub fragments: usize,
}

/// Every pool the effects engine draws from.
pub struct EffectPools<S: Scene> {
    pub debris: NodePool<S>,
    pub sparks: NodePool<S>,
    pub smoke: NodePool<S>,
    pub trails: NodePool<S>,
    lights: ObjectPool<NodeId, S>,
}

impl<S: Scene + 'static> EffectPools<S> {
    fn new(scene: &mut S, config: &PoolConfig) -> Self {
        let debris = NodePool::new(
            "debris",
            scene,
            NodeDesc::model(MODEL_SPHERE).blend(BlendMode::Alpha),
            config.debris.initial,
            config.debris.max,
        );
        let sparks = NodePool::new(
            "sparks",
            scene,
            NodeDesc::model(MODEL_SPHERE)
                .scaled(Spark::BASE_SCALE)
                .blend(BlendMode::Additive)
                .unlit(),
            config.sparks.initial,
            config.sparks.max,
        );
        let smoke = NodePool::new(
            "smoke",
            scene,
            NodeDesc::model(MODEL_PLANE)
                .colored([0.5, 0.5, 0.5, SmokePuff::ALPHA])
                .blend(BlendMode::Alpha)
                .billboard(),
            config.smoke.initial,
            config.smoke.max,
        );
        let trails = NodePool::new(
            "trails",
            scene,
            NodeDesc::model(MODEL_SPHERE)
                .scaled(trail::TRAIL_SCALE)
                .colored(trail::TRAIL_COLOR)
                .blend(BlendMode::Alpha)
                .unlit(),
            config.trails.initial,
            config.trails.max,
        );

        let factory: Factory<NodeId, S> =
            Box::new(|scene: &mut S| scene.spawn_light(LightDesc::default()));
        let reset: Reset<NodeId, S> = Box::new(|scene: &mut S, node: &NodeId| {
            scene.disable_light(*node);
            if let Err(e) = scene.set_light_color(*node, LightDesc::default().color) {
                log::trace!("Light reset: {e}");
            }
        });
        let mut lights = ObjectPool::new(factory, Some(reset), config.lights.max.max(1));
        if let Err(e) = lights.prefill(scene, config.lights.initial) {
            log::warn!("Could not prefill light pool: {e}");
        }

        Self {
            debris,
            sparks,
            smoke,
            trails,
            lights,
        }
    }

    fn acquire_light(&mut self, scene: &mut S) -> Result<NodeId, SceneError> {
        self.lights.acquire(scene)
    }

    /// Switch a light off and hand it back.
    fn release_light(&mut self, scene: &mut S, node: NodeId) {
        match self.lights.release(scene, node) {
            Release::Discarded(node) => {
                scene.despawn(node);
            }
            Release::NotCheckedOut => log::trace!("light {node:?} was not checked out"),
            Release::Recycled => {}
        }
    }

    pub fn light_stats(&self) -> PoolStats {
        self.lights.stats()
    }

    /// Despawn every pooled node.
    fn clear(&mut self, scene: &mut S) {
        self.debris.clear(scene);
        self.sparks.clear(scene);
        self.smoke.clear(scene);
        self.trails.clear(scene);
        for node in self.lights.clear() {
            scene.despawn(node);
        }
    }
}

pub struct EffectsSystem<S: Scene> {
    pools: EffectPools<S>,
    textures: HashMap<&'static str, TextureHandle>,
    explosions: Vec<Explosion>,
    trails: VecDeque<TrailMote>,
    rng: StdRng,
    advanced_physics: bool,
    next_id: u64,
    stats: EffectStats,
}

impl<S: Scene + 'static> EffectsSystem<S> {
    pub fn new(scene: &mut S, pools: &PoolConfig, seed: u64) -> Self {
        let textures = TEXTURES
            .iter()
            .map(|&(name, path)| {
                let handle = scene.load_texture(path).unwrap_or_else(|e| {
                    log::warn!("{e}; generating a {name} texture");
                    scene.procedural_texture(name)
                });
                (name, handle)
            })
            .collect();

        Self {
            pools: EffectPools::new(scene, pools),
            textures,
            explosions: Vec::new(),
            trails: VecDeque::new(),
            rng: StdRng::seed_from_u64(seed),
            advanced_physics: true,
            next_id: 0,
            stats: EffectStats::default(),
        }
    }

    /// Whether explosions push rigid bodies and spawn physics fragments.
    pub fn set_advanced_physics(&mut self, enabled: bool) {
        self.advanced_physics = enabled;
    }

    /// Start an explosion at `position`. Degenerate radius and particle
    /// hints are clamped; sub-effects that cannot be built are skipped.
    pub fn create_explosion(
        &mut self,
        ctx: &mut EffectContext<'_, S>,
        position: Vec3,
        base_radius: f32,
        particle_hint: usize,
        kind: ExplosionKind,
    ) -> ExplosionId {
        let settings = ctx.lod.settings();
        let profile = kind.profile();
        let radius = (base_radius * profile.radius_scale).max(MIN_RADIUS);
        let count = kind
            .particle_count(particle_hint.max(1))
            .min(settings.max_explosion_particles);

        let id = ExplosionId(self.next_id);
        self.next_id += 1;
        let mut explosion = Explosion::new(id, kind, position, radius, profile.duration);

        if let Err(e) = self.spawn_lights(ctx.scene, &mut explosion, settings) {
            log::warn!("Explosion {}: {e}", id.0);
        }
        match self.spawn_shockwave(ctx.scene, &explosion, settings) {
            Ok(node) => explosion.shockwave = Some(node),
            Err(e) => log::warn!("Explosion {}: {e}", id.0),
        }
        match self.spawn_flash(ctx.scene, &explosion) {
            Ok(node) => explosion.flash = Some(node),
            Err(e) => log::warn!("Explosion {}: {e}", id.0),
        }
        if let Err(e) = self.spawn_debris(ctx.scene, &mut explosion, count) {
            log::warn!("Explosion {}: {e}", id.0);
        }
        let sparks = ((count as f32 * 0.3) as usize).max(5);
        if let Err(e) = self.spawn_sparks(ctx.scene, &mut explosion, sparks) {
            log::warn!("Explosion {}: {e}", id.0);
        }
        if kind.has_smoke() {
            let puffs = ((count as f32 * 0.2) as usize)
                .max(3)
                .min(settings.max_smoke_particles);
            if let Err(e) = self.spawn_smoke(ctx.scene, &mut explosion, puffs) {
                log::warn!("Explosion {}: {e}", id.0);
            }
        }

        if self.advanced_physics {
            if let Some(physics) = ctx.physics.as_deref_mut() {
                physics.apply_explosion_force(
                    position,
                    radius * 2.0,
                    profile.force,
                    kind.affects_buildings(),
                );
                let fragments = profile.fragments.min(settings.max_fragments);
                if fragments > 0 {
                    explosion.fragments = physics.spawn_fragments(
                        position,
                        fragments,
                        profile.force,
                        radius * 0.2,
                        explosion.duration,
                    );
                }
            }
        }

        ctx.audio.play_cue(SoundCue::Explosion, position, profile.volume);

        self.stats.explosions += 1;
        self.stats.particles += explosion.debris.len() + explosion.sparks.len();
        self.stats.fragments += explosion.fragments.len();
        log::debug!(
            "{:?} explosion {} at {:?}: r={radius:.2}, {} debris, {} sparks, {} smoke, {} fragments",
            kind,
            id.0,
            position,
            explosion.debris.len(),
            explosion.sparks.len(),
            explosion.smoke.len(),
            explosion.fragments.len()
        );
        self.explosions.push(explosion);
        id
    }

    fn apply_texture(&self, scene: &mut S, node: NodeId, name: &str) {
        if let Some(texture) = self.textures.get(name) {
            if let Err(e) = scene.set_texture(node, texture) {
                log::debug!("Texture {name}: {e}");
            }
        }
    }

    fn spawn_lights(
        &mut self,
        scene: &mut S,
        explosion: &mut Explosion,
        settings: &TierSettings,
    ) -> Result<(), EffectError> {
        let count = settings.max_lights.min(MAX_LIGHTS_PER_EXPLOSION);
        let r = explosion.radius;
        for (i, strength) in LIGHT_STRENGTH.iter().copied().enumerate().take(count) {
            let node = self.pools.acquire_light(scene).map_err(failed("light"))?;
            let central = i == 0;
            let light = ExplosionLight {
                node,
                strength,
                central,
            };
            explosion.lights.push(light);

            let (position, attenuation, range) = if central {
                (explosion.epicenter, Vec3::new(0.0, 0.0, 0.5 / r), r * 3.0)
            } else {
                let offset = Vec3::new(
                    self.rng.gen_range(-0.5..=0.5),
                    self.rng.gen_range(-0.5..=0.5),
                    self.rng.gen_range(-0.1..=0.5),
                ) * r;
                (explosion.epicenter + offset, Vec3::new(0.0, 0.0, 1.0 / r), r * 1.8)
            };
            scene.set_position(node, position);
            scene
                .set_light_range(node, attenuation, range.min(settings.light_radius))
                .and_then(|_| scene.set_light_color(node, light.color(1.0)))
                .and_then(|_| scene.enable_light(node))
                .map_err(failed("light"))?;
        }
        Ok(())
    }

    fn spawn_shockwave(
        &mut self,
        scene: &mut S,
        explosion: &Explosion,
        settings: &TierSettings,
    ) -> Result<NodeId, EffectError> {
        let [r, g, b] = explosion.color;
        let color = [(r * 1.5).min(1.0), (g * 1.5).min(1.0), (b * 1.5).min(1.0), 0.7];
        let node = scene
            .spawn(
                NodeDesc::model(MODEL_SPHERE)
                    .at(explosion.epicenter)
                    .scaled(0.1)
                    .colored(color)
                    .blend(BlendMode::Additive),
            )
            .map_err(failed("shockwave"))?;
        self.apply_texture(scene, node, "shockwave");
        if settings.use_shaders {
            if let Err(e) = scene.apply_shader(node, "shockwave") {
                log::debug!("Shockwave without shader: {e}");
            }
        }
        Ok(node)
    }

    fn spawn_flash(&mut self, scene: &mut S, explosion: &Explosion) -> Result<NodeId, EffectError> {
        let [r, g, b] = explosion.color;
        let color = [(r * 2.0).min(1.0), (g * 2.0).min(1.0), (b * 2.0).min(1.0), 0.9];
        let node = scene
            .spawn(
                NodeDesc::model(MODEL_PLANE)
                    .at(explosion.epicenter)
                    .scaled(explosion.radius * 1.5)
                    .colored(color)
                    .blend(BlendMode::Additive)
                    .billboard(),
            )
            .map_err(failed("flash"))?;
        self.apply_texture(scene, node, "explosion");
        Ok(node)
    }

    fn spawn_debris(
        &mut self,
        scene: &mut S,
        explosion: &mut Explosion,
        count: usize,
    ) -> Result<(), EffectError> {
        for _ in 0..count {
            let node = self.pools.debris.acquire(scene).map_err(failed("debris"))?;
            let debris = Debris::random(
                &mut self.rng,
                node,
                explosion.epicenter,
                explosion.radius,
                explosion.color,
                explosion.duration,
            );
            debris.sync(scene);
            explosion.debris.push(debris);
        }
        Ok(())
    }

    fn spawn_sparks(
        &mut self,
        scene: &mut S,
        explosion: &mut Explosion,
        count: usize,
    ) -> Result<(), EffectError> {
        for _ in 0..count {
            let node = self.pools.sparks.acquire(scene).map_err(failed("spark"))?;
            let spark = Spark::random(&mut self.rng, node, explosion.epicenter, explosion.radius);
            scene.set_color(node, Spark::color(&mut self.rng));
            spark.sync(scene, false);
            explosion.sparks.push(spark);
        }
        Ok(())
    }

    fn spawn_smoke(
        &mut self,
        scene: &mut S,
        explosion: &mut Explosion,
        count: usize,
    ) -> Result<(), EffectError> {
        for _ in 0..count {
            let node = self.pools.smoke.acquire(scene).map_err(failed("smoke"))?;
            let puff = SmokePuff::random(
                &mut self.rng,
                node,
                explosion.epicenter,
                explosion.radius,
                explosion.duration,
            );
            self.apply_texture(scene, node, "smoke");
            puff.sync(scene);
            explosion.smoke.push(puff);
        }
        Ok(())
    }

    /// Advance every explosion and trail mote by `dt` seconds.
    pub fn update(&mut self, ctx: &mut EffectContext<'_, S>, dt: f32) {
        let Self {
            pools,
            explosions,
            trails,
            rng,
            ..
        } = self;
        let scene = &mut *ctx.scene;

        for explosion in explosions.iter_mut() {
            explosion.age += dt;
            let t = explosion.progress();
            explosion.update_shockwave(scene, t);
            explosion.update_flash(scene, t);
            explosion.update_lights(scene, pools, t);

            explosion.debris.retain_mut(|d| {
                if d.advance(dt) {
                    d.sync(scene);
                    true
                } else {
                    pools.debris.release(scene, d.node);
                    false
                }
            });
            explosion.sparks.retain_mut(|s| {
                if s.advance(dt) {
                    s.sync(scene, rng.gen_bool(0.3));
                    true
                } else {
                    pools.sparks.release(scene, s.node);
                    false
                }
            });
            explosion.smoke.retain_mut(|p| {
                if p.advance(dt) {
                    p.sync(scene);
                    true
                } else {
                    pools.smoke.release(scene, p.node);
                    false
                }
            });
        }

        let physics = &mut ctx.physics;
        explosions.retain_mut(|e| {
            if e.is_finished() {
                e.teardown(scene, pools, physics.as_deref_mut());
                log::trace!("Explosion {} finished", e.id.0);
                false
            } else {
                true
            }
        });

        trails.retain_mut(|mote| {
            if mote.advance(dt) {
                mote.sync(scene);
                true
            } else {
                pools.trails.release(scene, mote.node);
                false
            }
        });
    }

    /// Drop a trail mote behind a flying banana, with [`TRAIL_CHANCE`] per call.
    pub fn maybe_spawn_trail(
        &mut self,
        scene: &mut S,
        position: Vec3,
        settings: &TierSettings,
    ) -> Option<NodeId> {
        if !self.rng.gen_bool(TRAIL_CHANCE) {
            return None;
        }
        self.spawn_trail(scene, position, settings)
            .map_err(|e| log::warn!("{e}"))
            .ok()
    }

    pub fn spawn_trail(
        &mut self,
        scene: &mut S,
        position: Vec3,
        settings: &TierSettings,
    ) -> Result<NodeId, EffectError> {
        let node = self.pools.trails.acquire(scene).map_err(failed("trail"))?;
        scene.set_position(node, position);
        let mote = TrailMote::new(node);
        mote.sync(scene);
        self.trails.push_back(mote);
        self.evict_trails(scene, settings.max_trails);
        Ok(node)
    }

    fn evict_trails(&mut self, scene: &mut S, max: usize) {
        while self.trails.len() > max {
            if let Some(mote) = self.trails.pop_front() {
                self.pools.trails.release(scene, mote.node);
            }
        }
    }

    /// Bring live effects within a new tier's budgets.
    pub fn on_tier_changed(&mut self, scene: &mut S, settings: &TierSettings) {
        let max = settings.max_explosion_particles;
        for explosion in &mut self.explosions {
            if explosion.debris.len() > max {
                for d in explosion.debris.drain(max..) {
                    self.pools.debris.release(scene, d.node);
                }
            }
            explosion.shorten(settings.effect_duration);
        }
        self.evict_trails(scene, settings.max_trails);
    }

    /// Tear everything down now and empty the pools.
    pub fn clear(&mut self, scene: &mut S, mut physics: Option<&mut ExplosionPhysics>) {
        let count = self.explosions.len();
        for mut explosion in self.explosions.drain(..) {
            explosion.teardown(scene, &mut self.pools, physics.as_deref_mut());
        }
        for mote in self.trails.drain(..) {
            self.pools.trails.release(scene, mote.node);
        }
        self.pools.clear(scene);
        log::debug!("Effects cleared ({count} explosions)");
    }

    pub fn explosions(&self) -> &[Explosion] {
        &self.explosions
    }

    pub fn explosion(&self, id: ExplosionId) -> Option<&Explosion> {
        self.explosions.iter().find(|e| e.id == id)
    }

    pub fn active_explosions(&self) -> usize {
        self.explosions.len()
    }

    pub fn trail_count(&self) -> usize {
        self.trails.len()
    }

    pub fn texture(&self, name: &str) -> Option<&TextureHandle> {
        self.textures.get(name)
    }

    pub fn pools(&self) -> &EffectPools<S> {
        &self.pools
    }

    pub fn stats(&self) -> EffectStats {
        self.stats
    }
}
