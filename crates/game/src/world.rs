//! One match: the city, two gorillas taking turns, and the fixed-order tick
//! that drives every other system.

use crate::city::{place_gorillas, BuildingId, City, Gorilla};
use crate::config::GameConfig;
use crate::destruction::{DamageOutcome, DestructionSystem};
use crate::effects::{EffectContext, EffectsSystem, ExplosionId, ExplosionKind};
use crate::lod::{LodController, TierChange};
use crate::projectile::{Projectile, ProjectileState, FORCE_SCALE, GRAVITY};
use crate::weather::Weather;
use audio::{SoundCue, SoundSink};
use engine_core::{NodeDesc, Scene, Vec3, MODEL_SPHERE};
use physics::{ExplosionPhysics, RigidBodyHandle};
use rand::prelude::*;
use std::collections::HashMap;
use thiserror::Error;

pub const PLAYERS: usize = 2;
pub const MIN_FORCE: f32 = 10.0;
pub const MAX_FORCE: f32 = 100.0;
pub const MAX_ANGLE_H: f32 = 180.0;
pub const MAX_ANGLE_V: f32 = 90.0;
/// Blast radius of a banana, for effects and building damage alike.
pub const IMPACT_RADIUS: f32 = 2.0;

/// Bananas leave from above the thrower's head.
const LAUNCH_HEIGHT: f32 = 1.0;
const BANANA_COLOR: [f32; 4] = [1.0, 0.9, 0.1, 1.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Playing,
    GameOver { winner: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ThrowError {
    #[error("the match is over")]
    GameOver,
    #[error("a banana is already in flight")]
    InFlight,
    #[error("player {0} has no gorilla")]
    NoGorilla(usize),
}

/// Aim in degrees: `angle_h` around Z from +X, `angle_v` above the horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aim {
    pub angle_h: f32,
    pub angle_v: f32,
    pub force: f32,
}

impl Default for Aim {
    fn default() -> Self {
        Self {
            angle_h: 45.0,
            angle_v: 45.0,
            force: 50.0,
        }
    }
}

impl Aim {
    pub fn clamped(self) -> Self {
        Self {
            angle_h: self.angle_h.clamp(0.0, MAX_ANGLE_H),
            angle_v: self.angle_v.clamp(0.0, MAX_ANGLE_V),
            force: self.force.clamp(MIN_FORCE, MAX_FORCE),
        }
    }
}

/// What a banana ran into this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Impact {
    Gorilla { player: usize, at: Vec3 },
    Building { id: BuildingId, at: Vec3 },
    Ground(Vec3),
    Lost,
}

/// Target gorilla first, then buildings, then the ground.
fn find_impact(
    banana: &mut Projectile,
    state: ProjectileState,
    gorillas: &[Gorilla],
    city: &City,
) -> Option<Impact> {
    if state == ProjectileState::OutOfBounds {
        return Some(Impact::Lost);
    }
    let at = banana.position;
    if let Some(target) = gorillas
        .iter()
        .find(|g| g.player != banana.owner && banana.hits_sphere(g.position))
    {
        banana.mark_collided();
        return Some(Impact::Gorilla {
            player: target.player,
            at,
        });
    }
    if let Some(building) = city.buildings().iter().find(|b| banana.hits_building(b)) {
        banana.mark_collided();
        return Some(Impact::Building {
            id: building.id,
            at,
        });
    }
    (state == ProjectileState::Collided).then_some(Impact::Ground(at))
}

pub struct GameWorld<S: Scene + 'static> {
    scene: S,
    audio: Box<dyn SoundSink>,
    physics: Option<ExplosionPhysics>,
    lod: LodController,
    effects: EffectsSystem<S>,
    destruction: DestructionSystem,
    city: City,
    building_bodies: HashMap<BuildingId, RigidBodyHandle>,
    gorillas: Vec<Gorilla>,
    projectiles: Vec<Projectile>,
    weather: Weather,
    wind: Vec3,
    scores: [u32; PLAYERS],
    state: MatchState,
    current_player: usize,
    aim: Aim,
    config: GameConfig,
    rng: StdRng,
}

impl<S: Scene + 'static> GameWorld<S> {
    pub fn new(config: GameConfig, mut scene: S, audio: Box<dyn SoundSink>) -> Self {
        let seed = config.seed.unwrap_or_else(|| thread_rng().gen());
        let mut rng = StdRng::seed_from_u64(seed);

        let mut effects = EffectsSystem::new(&mut scene, &config.pools, rng.gen());
        effects.set_advanced_physics(config.advanced_physics);
        let physics = config
            .advanced_physics
            .then(|| ExplosionPhysics::new(rng.gen()));
        let destruction = DestructionSystem::new(rng.gen());

        let mut world = Self {
            scene,
            audio,
            physics,
            lod: LodController::new(config.lod.clone()),
            effects,
            destruction,
            city: City::default(),
            building_bodies: HashMap::new(),
            gorillas: Vec::new(),
            projectiles: Vec::new(),
            weather: Weather::default(),
            wind: Vec3::ZERO,
            scores: [0; PLAYERS],
            state: MatchState::Playing,
            current_player: 0,
            aim: Aim::default(),
            config,
            rng,
        };
        world.build_city();
        world.roll_weather();
        world.start_turn(0);
        log::info!(
            "New match (seed {seed}): {} buildings, {:?} weather",
            world.city.len(),
            world.weather.kind
        );
        world
    }

    fn build_city(&mut self) {
        self.city = City::generate(&mut self.rng, self.config.city_rows, self.config.city_cols);
        self.city.spawn_nodes(&mut self.scene);
        self.building_bodies.clear();
        if let Some(physics) = self.physics.as_mut() {
            for b in self.city.buildings() {
                let handle = physics.add_building(b.center(), b.size() * 0.5);
                self.building_bodies.insert(b.id, handle);
            }
        }
        self.gorillas = place_gorillas(&mut self.scene, &self.city, &mut self.rng);
    }

    fn roll_weather(&mut self) {
        self.weather = Weather::random(&mut self.rng);
        if let Some(physics) = self.physics.as_mut() {
            physics.set_gravity(GRAVITY * self.weather.gravity_scale());
        }
    }

    fn start_turn(&mut self, player: usize) {
        self.current_player = player % PLAYERS;
        self.wind = self.weather.roll_wind(&mut self.rng);
        if let Some(me) = self.gorillas.get(self.current_player) {
            let facing = self
                .gorillas
                .iter()
                .find(|g| g.player != me.player)
                .map_or(Vec3::Y, |target| target.position - me.position);
            self.audio.set_listener(me.position, facing);
        }
        log::debug!("Player {}'s turn, wind {:?}", self.current_player, self.wind);
    }

    /// Throw a banana from the current player's gorilla. Vertical angle and
    /// force are clamped to their ranges; any heading is accepted.
    pub fn throw(&mut self, angle_h: f32, angle_v: f32, force: f32) -> Result<(), ThrowError> {
        if matches!(self.state, MatchState::GameOver { .. }) {
            return Err(ThrowError::GameOver);
        }
        if !self.projectiles.is_empty() {
            return Err(ThrowError::InFlight);
        }
        let player = self.current_player;
        let origin = self
            .gorillas
            .get(player)
            .ok_or(ThrowError::NoGorilla(player))?
            .position
            + Vec3::Z * LAUNCH_HEIGHT;

        let angle_v = angle_v.clamp(0.0, MAX_ANGLE_V);
        let force = force.clamp(MIN_FORCE, MAX_FORCE);
        let mut banana = Projectile::launch(origin, angle_h, angle_v, force, &mut self.rng);
        banana.owner = player;
        banana.node = self
            .scene
            .spawn(NodeDesc::model(MODEL_SPHERE).colored(BANANA_COLOR))
            .map_err(|e| log::warn!("Banana has no visual: {e}"))
            .ok();
        if let Some(node) = banana.node {
            self.scene.set_transform(node, banana.transform());
        }

        self.audio.play_cue(SoundCue::Launch, origin, 1.0);
        log::debug!("Player {player} throws: h={angle_h:.1} v={angle_v:.1} f={force:.1}");
        self.projectiles.push(banana);
        Ok(())
    }

    /// Throw with the current aim.
    pub fn throw_aimed(&mut self) -> Result<(), ThrowError> {
        let Aim {
            angle_h,
            angle_v,
            force,
        } = self.aim;
        self.throw(angle_h, angle_v, force)
    }

    pub fn adjust_aim(&mut self, d_angle_h: f32, d_angle_v: f32, d_force: f32) -> Aim {
        self.aim = Aim {
            angle_h: self.aim.angle_h + d_angle_h,
            angle_v: self.aim.angle_v + d_angle_v,
            force: self.aim.force + d_force,
        }
        .clamped();
        self.aim
    }

    /// A 45 degree lob straight at the opponent, ignoring wind and height.
    pub fn suggest_aim(&self) -> Option<Aim> {
        let me = self.gorillas.get(self.current_player)?;
        let target = self.gorillas.iter().find(|g| g.player != me.player)?;
        let delta = target.position - me.position;
        let range = delta.truncate().length();
        let g = GRAVITY.z.abs() * self.weather.gravity_scale();
        Some(Aim {
            angle_h: delta.y.atan2(delta.x).to_degrees(),
            angle_v: 45.0,
            force: ((range * g).sqrt() / FORCE_SCALE).clamp(MIN_FORCE, MAX_FORCE),
        })
    }

    /// Feed one rendered frame's duration to the LOD controller. Call once per
    /// frame with the measured frame time, not the fixed simulation step.
    pub fn sample_frame(&mut self, frame_dt: f32) -> Option<TierChange> {
        let change = self.lod.sample(frame_dt)?;
        self.effects
            .on_tier_changed(&mut self.scene, change.new.settings());
        Some(change)
    }

    /// Advance the match by one fixed step.
    pub fn update_tick(&mut self, dt: f32) {
        let gravity = GRAVITY * self.weather.gravity_scale();
        let mut impacts = Vec::new();
        let mut flying = Vec::with_capacity(self.projectiles.len());
        for mut banana in self.projectiles.drain(..) {
            let state = banana.step(dt, gravity, self.wind);
            match find_impact(&mut banana, state, &self.gorillas, &self.city) {
                Some(impact) => {
                    if let Some(node) = banana.node {
                        self.scene.despawn(node);
                    }
                    impacts.push((banana.owner, impact));
                }
                None => {
                    if let Some(node) = banana.node {
                        self.scene.set_transform(node, banana.transform());
                    }
                    flying.push(banana);
                }
            }
        }
        self.projectiles = flying;

        for (owner, impact) in impacts {
            self.resolve(owner, impact);
        }

        if let Some(physics) = self.physics.as_mut() {
            let contacts = physics.update(dt);
            if contacts > 0 {
                log::trace!("{contacts} debris contacts");
            }
        }
        let mut ctx = EffectContext {
            scene: &mut self.scene,
            physics: self.physics.as_mut(),
            audio: &mut *self.audio,
            lod: &self.lod,
        };
        self.effects.update(&mut ctx, dt);
        self.destruction.update(&mut self.scene, dt);

        let settings = self.lod.settings();
        for banana in &self.projectiles {
            self.effects
                .maybe_spawn_trail(&mut self.scene, banana.position, settings);
        }
    }

    fn resolve(&mut self, owner: usize, impact: Impact) {
        let next = (owner + 1) % PLAYERS;
        match impact {
            Impact::Gorilla { player, at } => {
                self.explode(at, ExplosionKind::Large);
                self.audio.play_cue(SoundCue::GorillaImpact, at, 1.0);
                self.scores[owner] += 1;
                log::info!(
                    "Player {owner} hit player {player}: {} - {}",
                    self.scores[0],
                    self.scores[1]
                );
                if self.scores[owner] >= self.config.max_score {
                    self.state = MatchState::GameOver { winner: owner };
                    self.audio.play_cue(SoundCue::Victory, at, 1.0);
                    log::info!("Player {owner} wins");
                } else {
                    self.start_turn(owner);
                }
            }
            Impact::Building { id, at } => {
                self.explode(at, ExplosionKind::Standard);
                let outcome = self.destruction.building_explosion(
                    &mut self.scene,
                    &mut *self.audio,
                    &mut self.city,
                    id,
                    at,
                    IMPACT_RADIUS,
                );
                if outcome == Some(DamageOutcome::Demolished) {
                    self.remove_building_body(id);
                }
                self.start_turn(next);
            }
            Impact::Ground(at) => {
                self.explode(at, ExplosionKind::Small);
                self.start_turn(next);
            }
            Impact::Lost => {
                log::debug!("Player {owner}'s banana left the city");
                self.start_turn(next);
            }
        }
    }

    fn explode(&mut self, at: Vec3, kind: ExplosionKind) -> ExplosionId {
        let mut ctx = EffectContext {
            scene: &mut self.scene,
            physics: self.physics.as_mut(),
            audio: &mut *self.audio,
            lod: &self.lod,
        };
        self.effects.create_explosion(
            &mut ctx,
            at,
            IMPACT_RADIUS,
            self.config.explosion_particles,
            kind,
        )
    }

    fn remove_building_body(&mut self, id: BuildingId) {
        if let (Some(handle), Some(physics)) = (self.building_bodies.remove(&id), self.physics.as_mut()) {
            physics.remove_body(handle);
        }
    }

    /// Tear the match down and start over in a fresh city.
    pub fn restart(&mut self) {
        self.audio.stop_all();
        for banana in self.projectiles.drain(..) {
            if let Some(node) = banana.node {
                self.scene.despawn(node);
            }
        }
        self.effects.clear(&mut self.scene, self.physics.as_mut());
        self.destruction.clear(&mut self.scene);
        if let Some(physics) = self.physics.as_mut() {
            physics.remove_all();
        }
        self.city.clear(&mut self.scene);
        for gorilla in self.gorillas.drain(..) {
            if let Some(node) = gorilla.node {
                self.scene.despawn(node);
            }
        }

        self.scores = [0; PLAYERS];
        self.state = MatchState::Playing;
        self.aim = Aim::default();
        self.build_city();
        self.roll_weather();
        self.start_turn(0);
        log::info!("Match restarted: {:?} weather", self.weather.kind);
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn city(&self) -> &City {
        &self.city
    }

    pub fn gorillas(&self) -> &[Gorilla] {
        &self.gorillas
    }

    pub fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }

    pub fn effects(&self) -> &EffectsSystem<S> {
        &self.effects
    }

    pub fn destruction(&self) -> &DestructionSystem {
        &self.destruction
    }

    pub fn physics(&self) -> Option<&ExplosionPhysics> {
        self.physics.as_ref()
    }

    pub fn lod(&self) -> &LodController {
        &self.lod
    }

    pub fn lod_mut(&mut self) -> &mut LodController {
        &mut self.lod
    }

    pub fn weather(&self) -> Weather {
        self.weather
    }

    pub fn wind(&self) -> Vec3 {
        self.wind
    }

    pub fn scores(&self) -> [u32; PLAYERS] {
        self.scores
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn current_player(&self) -> usize {
        self.current_player
    }

    pub fn aim(&self) -> Aim {
        self.aim
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lod::Tier;
    use engine_core::SceneGraph;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Heard {
        cues: Vec<SoundCue>,
        listener: Option<(Vec3, Vec3)>,
        stops: usize,
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Heard>>);

    impl Recorder {
        fn cues(&self) -> Vec<SoundCue> {
            self.0.borrow().cues.clone()
        }

        fn listener(&self) -> Option<(Vec3, Vec3)> {
            self.0.borrow().listener
        }

        fn stops(&self) -> usize {
            self.0.borrow().stops
        }
    }

    impl SoundSink for Recorder {
        fn play_cue(&mut self, cue: SoundCue, _position: Vec3, _volume: f32) {
            self.0.borrow_mut().cues.push(cue);
        }

        fn set_listener(&mut self, position: Vec3, forward: Vec3) {
            self.0.borrow_mut().listener = Some((position, forward));
        }

        fn stop_all(&mut self) {
            self.0.borrow_mut().stops += 1;
        }
    }

    fn world(seed: u64, advanced_physics: bool) -> (GameWorld<SceneGraph>, Recorder) {
        let config = GameConfig {
            seed: Some(seed),
            advanced_physics,
            ..Default::default()
        };
        let recorder = Recorder::default();
        let world = GameWorld::new(config, SceneGraph::new(), Box::new(recorder.clone()));
        (world, recorder)
    }

    /// Put a motionless banana from the current player at `at`.
    fn drop_banana(world: &mut GameWorld<SceneGraph>, at: Vec3) {
        let mut rng = StdRng::seed_from_u64(0);
        let mut banana = Projectile::launch(at, 0.0, 0.0, 0.0, &mut rng);
        banana.owner = world.current_player;
        world.projectiles.push(banana);
    }

    fn empty_building(world: &GameWorld<SceneGraph>) -> BuildingId {
        let taken: Vec<BuildingId> = world.gorillas.iter().map(|g| g.building).collect();
        world
            .city
            .buildings()
            .iter()
            .find(|b| !taken.contains(&b.id))
            .map(|b| b.id)
            .unwrap()
    }

    #[test]
    fn new_match_layout() {
        let (world, _) = world(1, false);
        assert_eq!(world.city().len(), 49);
        assert_eq!(world.gorillas().len(), 2);
        assert_ne!(world.gorillas()[0].building, world.gorillas()[1].building);
        assert_eq!(world.state(), MatchState::Playing);
        assert_eq!(world.current_player(), 0);
        assert_eq!(world.wind().z, 0.0);
        let limit = 2.0 * world.weather().wind_factor();
        assert!(world.wind().x.abs() <= limit && world.wind().y.abs() <= limit);
    }

    #[test]
    fn one_banana_at_a_time() {
        let (mut world, audio) = world(2, false);
        world.throw(45.0, 45.0, 50.0).unwrap();
        assert_eq!(world.throw(45.0, 45.0, 50.0), Err(ThrowError::InFlight));
        assert_eq!(world.projectiles().len(), 1);
        assert_eq!(world.projectiles()[0].owner, 0);
        assert_eq!(audio.cues(), vec![SoundCue::Launch]);
    }

    #[test]
    fn aim_is_clamped() {
        let (mut world, _) = world(3, false);
        let aim = world.adjust_aim(500.0, -100.0, 1000.0);
        assert_eq!((aim.angle_h, aim.angle_v, aim.force), (180.0, 0.0, 100.0));
        let aim = world.adjust_aim(-500.0, 200.0, -1000.0);
        assert_eq!((aim.angle_h, aim.angle_v, aim.force), (0.0, 90.0, 10.0));
    }

    #[test]
    fn direct_hit_scores_and_keeps_the_turn() {
        let (mut world, audio) = world(4, false);
        let target = world.gorillas()[1].position;
        drop_banana(&mut world, target + Vec3::new(0.0, 0.0, 0.5));
        world.update_tick(1.0 / 60.0);

        assert!(world.projectiles().is_empty());
        assert_eq!(world.scores(), [1, 0]);
        assert_eq!(world.current_player(), 0);
        assert_eq!(world.effects().active_explosions(), 1);
        assert!(audio.cues().contains(&SoundCue::GorillaImpact));
        assert!(world.city().buildings().iter().all(|b| b.damage.is_none()));
    }

    #[test]
    fn third_hit_wins() {
        let (mut world, audio) = world(5, false);
        world.scores = [2, 0];
        let target = world.gorillas()[1].position;
        drop_banana(&mut world, target);
        world.update_tick(1.0 / 60.0);

        assert_eq!(world.state(), MatchState::GameOver { winner: 0 });
        assert_eq!(audio.cues().last(), Some(&SoundCue::Victory));
        assert_eq!(world.throw(45.0, 45.0, 50.0), Err(ThrowError::GameOver));
    }

    #[test]
    fn building_hit_damages_and_passes_the_turn() {
        let (mut world, audio) = world(6, false);
        let id = empty_building(&world);
        let center = world.city().get(id).unwrap().center();
        drop_banana(&mut world, center);
        world.update_tick(1.0 / 60.0);

        let damage = world.city().get(id).unwrap().damage.unwrap();
        assert!((damage - 0.1 * IMPACT_RADIUS).abs() < 1e-5);
        assert_eq!(world.current_player(), 1);
        assert_eq!(world.destruction().fragment_count(), 20);
        assert_eq!(world.effects().active_explosions(), 1);
        assert!(audio.cues().contains(&SoundCue::BuildingImpact));
    }

    #[test]
    fn misses_pass_the_turn() {
        let (mut world, audio) = world(7, false);
        drop_banana(&mut world, Vec3::new(250.0, 0.0, 50.0));
        world.update_tick(1.0 / 60.0);
        assert_eq!(world.current_player(), 1);
        assert_eq!(world.effects().active_explosions(), 0);
        assert!(audio.cues().is_empty());

        // Outside the grid corner, just above the street.
        let corner = world.city().buildings()[0].origin - Vec3::new(3.0, 3.0, 0.0);
        drop_banana(&mut world, corner + Vec3::new(0.0, 0.0, 0.3));
        world.update_tick(1.0 / 60.0);
        assert_eq!(world.current_player(), 0);
        assert_eq!(world.effects().active_explosions(), 1);
        assert_eq!(world.effects().explosions()[0].kind, ExplosionKind::Small);
    }

    #[test]
    fn demolished_buildings_leave_physics() {
        let (mut world, _) = world(8, true);
        let id = empty_building(&world);
        let bodies = world.physics().unwrap().registered_count();
        world.city.get_mut(id).unwrap().damage = Some(0.85);
        let center = world.city().get(id).unwrap().center();
        drop_banana(&mut world, center);
        world.update_tick(1.0 / 60.0);

        assert!(world.city().get(id).is_none());
        assert_eq!(world.destruction().demolitions(), 1);
        assert!(!world.building_bodies.contains_key(&id));
        // One building gone, explosion fragments added.
        let physics = world.physics().unwrap();
        assert_eq!(
            physics.registered_count(),
            bodies - 1 + physics.temporary_count()
        );
    }

    #[test]
    fn listener_follows_the_thrower() {
        let (mut world, audio) = world(13, false);
        let (at, facing) = audio.listener().unwrap();
        let me = world.gorillas()[0].position;
        let them = world.gorillas()[1].position;
        assert_eq!(at, me);
        assert_eq!(facing, them - me);

        drop_banana(&mut world, Vec3::new(250.0, 0.0, 50.0));
        world.update_tick(1.0 / 60.0);
        assert_eq!(world.current_player(), 1);
        assert_eq!(audio.listener().unwrap().0, them);
    }

    #[test]
    fn measured_frame_time_drives_quality() {
        fn slow_frames(world: &mut GameWorld<SceneGraph>, frames: usize) -> Vec<TierChange> {
            (0..frames)
                .filter_map(|_| {
                    let change = world.sample_frame(1.0 / 24.0);
                    world.update_tick(1.0 / 60.0);
                    change
                })
                .collect()
        }

        // Fixed steps on their own never reach the controller.
        let (mut steady, _) = world(12, false);
        for _ in 0..60 * 6 {
            steady.update_tick(1.0 / 60.0);
        }
        assert_eq!(steady.lod().tier(), Tier::High);
        assert_eq!(steady.lod().stats().samples, 0);

        let (mut world, _) = world(12, false);
        let changes = slow_frames(&mut world, 124);
        assert_eq!(changes, vec![TierChange { old: Tier::High, new: Tier::Medium }]);
        assert!((world.lod().fps() - 24.0).abs() < 0.1);

        let target = world.gorillas()[1].position;
        drop_banana(&mut world, target);
        world.update_tick(1.0 / 60.0);
        assert_eq!(world.effects().explosions()[0].duration, 3.0);

        let changes = slow_frames(&mut world, 124);
        assert_eq!(changes, vec![TierChange { old: Tier::Medium, new: Tier::Low }]);
        // The live explosion was cut down to the new tier's duration.
        assert_eq!(world.effects().active_explosions(), 1);
        assert_eq!(world.effects().explosions()[0].duration, 0.8);
    }

    #[test]
    fn restart_leaves_only_the_new_city() {
        let (mut world, audio) = world(9, true);
        let id = empty_building(&world);
        let center = world.city().get(id).unwrap().center();
        drop_banana(&mut world, center);
        for _ in 0..30 {
            world.update_tick(1.0 / 60.0);
        }
        world.throw(45.0, 45.0, 50.0).unwrap();
        world.scores = [2, 1];

        world.restart();
        assert_eq!(audio.stops(), 1);
        assert_eq!(world.scores(), [0, 0]);
        assert_eq!(world.state(), MatchState::Playing);
        assert!(world.projectiles().is_empty());
        assert_eq!(world.effects().active_explosions(), 0);
        assert_eq!(world.effects().trail_count(), 0);
        assert_eq!(world.destruction().fragment_count(), 0);
        assert_eq!(world.city().len(), 49);
        assert_eq!(world.physics().unwrap().registered_count(), 49);
        assert_eq!(world.scene().node_count(), 49 + 2);
    }

    #[test]
    fn scripted_matches_are_deterministic() {
        fn play(seed: u64) -> ([u32; PLAYERS], usize) {
            let (mut world, _) = world(seed, true);
            for _ in 0..60 * 90 {
                if world.projectiles().is_empty() && world.state() == MatchState::Playing {
                    let aim = world.suggest_aim().unwrap();
                    world.throw(aim.angle_h, aim.angle_v, aim.force).unwrap();
                }
                world.update_tick(1.0 / 60.0);
                assert!(world.destruction().fragment_count() <= crate::destruction::MAX_FRAGMENTS);
            }
            (world.scores(), world.city().len())
        }
        assert_eq!(play(10), play(10));
    }
}
