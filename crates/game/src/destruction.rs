//! Destruction system: building damage, craters, demolition and flying rubble.

use crate::city::{despawn_building, Building, BuildingId, City};
use audio::{SoundCue, SoundSink};
use engine_core::{
    BlendMode, Lifetime, NodeDesc, NodeId, Scene, Transform, Velocity, Vec3, MODEL_CUBE,
    MODEL_SPHERE,
};
use hecs::World;
use rand::prelude::*;

/// Craters kept per building; older ones are removed first.
pub const MAX_CRATERS: usize = 20;
/// Live fragments shared by every building.
pub const MAX_FRAGMENTS: usize = 100;
/// Seconds before a fragment is removed, moving or not.
pub const FRAGMENT_LIFETIME: f32 = 10.0;
/// A building collapses once its damage goes above this.
pub const DEMOLITION_THRESHOLD: f32 = 0.9;

const IMPACT_FRAGMENTS: usize = 20;
const DEMOLITION_FRAGMENTS: usize = 100;
const CRATER_OFFSET: f32 = 0.05;
const CRATER_COLOR: [f32; 4] = [0.1, 0.1, 0.1, 0.8];
const GRAVITY: f32 = 9.8;

/// Side of a building an impact landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Top,
    /// +Y side.
    Front,
    /// -Y side.
    Back,
    /// -X side.
    Left,
    /// +X side.
    Right,
}

impl Face {
    /// Face of `building` nearest to `impact`.
    pub fn of_impact(building: &Building, impact: Vec3) -> Self {
        let rel = impact - building.origin;
        if rel.z >= building.height * 0.9 {
            return Face::Top;
        }
        let candidates = [
            (Face::Front, (rel.y - building.depth).abs()),
            (Face::Back, rel.y.abs()),
            (Face::Left, rel.x.abs()),
            (Face::Right, (rel.x - building.width).abs()),
        ];
        let mut best = candidates[0];
        for candidate in &candidates[1..] {
            if candidate.1 < best.1 {
                best = *candidate;
            }
        }
        best.0
    }

    /// Point just outside this face, under `impact`.
    pub fn anchor(self, building: &Building, impact: Vec3) -> Vec3 {
        let p = building.closest_point(impact);
        let (min, max) = (building.origin, building.max());
        match self {
            Face::Top => Vec3::new(p.x, p.y, max.z + CRATER_OFFSET),
            Face::Front => Vec3::new(p.x, max.y + CRATER_OFFSET, p.z),
            Face::Back => Vec3::new(p.x, min.y - CRATER_OFFSET, p.z),
            Face::Left => Vec3::new(min.x - CRATER_OFFSET, p.y, p.z),
            Face::Right => Vec3::new(max.x + CRATER_OFFSET, p.y, p.z),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DamageOutcome {
    Damaged { damage: f32, face: Face },
    Demolished,
}

/// Rubble chunk component.
#[derive(Debug, Clone, Copy)]
pub struct Fragment {
    pub node: NodeId,
}

/// Manages building damage and the rubble it throws.
pub struct DestructionSystem {
    fragments: World,
    max_fragments: usize,
    fragment_lifetime: f32,
    demolitions: usize,
    rng: StdRng,
}

impl Default for DestructionSystem {
    fn default() -> Self {
        Self::new(StdRng::from_entropy().gen())
    }
}

impl DestructionSystem {
    pub fn new(seed: u64) -> Self {
        Self {
            fragments: World::new(),
            max_fragments: MAX_FRAGMENTS,
            fragment_lifetime: FRAGMENT_LIFETIME,
            demolitions: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Leave a crater on the face that was hit and add damage. Does not
    /// remove the building; callers act on [`DamageOutcome::Demolished`].
    pub fn damage_building<S: Scene>(
        &mut self,
        scene: &mut S,
        building: &mut Building,
        impact: Vec3,
        radius: f32,
    ) -> DamageOutcome {
        let radius = radius.max(0.0);
        let face = Face::of_impact(building, impact);
        let crater = NodeDesc::model(MODEL_SPHERE)
            .at(face.anchor(building, impact))
            .scaled((radius * 0.5).max(0.01))
            .colored(CRATER_COLOR)
            .blend(BlendMode::Alpha);
        match scene.spawn(crater) {
            Ok(node) => {
                building.craters.push_back(node);
                while building.craters.len() > MAX_CRATERS {
                    if let Some(old) = building.craters.pop_front() {
                        scene.despawn(old);
                    }
                }
            }
            Err(e) => log::warn!("Building {} crater: {e}", building.id),
        }

        let damage = building.damage.get_or_insert(0.0);
        *damage += 0.1 * radius;
        log::debug!("Building {} hit on {:?}, damage {:.2}", building.id, face, *damage);
        if *damage > DEMOLITION_THRESHOLD {
            DamageOutcome::Demolished
        } else {
            DamageOutcome::Damaged {
                damage: *damage,
                face,
            }
        }
    }

    /// Banana hit on a building: rubble at the impact, a crater, damage and
    /// a demolition if it was the last straw. `None` if the building is gone.
    pub fn building_explosion<S: Scene>(
        &mut self,
        scene: &mut S,
        audio: &mut dyn SoundSink,
        city: &mut City,
        id: BuildingId,
        impact: Vec3,
        radius: f32,
    ) -> Option<DamageOutcome> {
        city.get(id)?;
        self.spawn_fragments(scene, impact, IMPACT_FRAGMENTS, radius);
        let outcome = {
            let building = city.get_mut(id)?;
            self.damage_building(scene, building, impact, radius)
        };
        audio.play_cue(SoundCue::BuildingImpact, impact, 1.0);
        if outcome == DamageOutcome::Demolished {
            self.demolish(scene, city, id);
        }
        Some(outcome)
    }

    /// Collapse a building in a burst of rubble and take it out of the city.
    pub fn demolish<S: Scene>(&mut self, scene: &mut S, city: &mut City, id: BuildingId) -> bool {
        let Some(building) = city.remove(id) else {
            return false;
        };
        let size = building.size();
        let spread = size.x.max(size.y).max(size.z) * 0.5;
        let spawned = self.spawn_fragments(scene, building.center(), DEMOLITION_FRAGMENTS, spread);
        log::info!("Building {} demolished ({spawned} fragments)", building.id);
        despawn_building(scene, building);
        self.demolitions += 1;
        true
    }

    /// Throw up to `count` rubble chunks around `position`, within the global
    /// ceiling. Returns how many were spawned.
    pub fn spawn_fragments<S: Scene>(
        &mut self,
        scene: &mut S,
        position: Vec3,
        count: usize,
        spread: f32,
    ) -> usize {
        let live = self.fragments.len() as usize;
        let count = count.min(self.max_fragments.saturating_sub(live));
        let spread = spread.abs();

        for spawned in 0..count {
            let offset = Vec3::new(
                self.rng.gen_range(-spread..=spread),
                self.rng.gen_range(-spread..=spread),
                self.rng.gen_range(-spread..=spread),
            );
            let base = self.rng.gen_range(0.1..=0.5);
            let scale = Vec3::new(
                base,
                base * self.rng.gen_range(0.5..=1.5),
                base * self.rng.gen_range(0.5..=1.5),
            );
            let color = [
                self.rng.gen_range(0.4..=0.6),
                self.rng.gen_range(0.3..=0.5),
                self.rng.gen_range(0.2..=0.4),
                1.0,
            ];
            let velocity = Vec3::new(
                self.rng.gen_range(-5.0..=5.0),
                self.rng.gen_range(-5.0..=5.0),
                self.rng.gen_range(2.0..=8.0),
            );
            let angular = Vec3::new(
                self.rng.gen_range(-10.0..=10.0),
                self.rng.gen_range(-10.0..=10.0),
                self.rng.gen_range(-10.0..=10.0),
            );
            let transform = Transform {
                position: position + offset,
                scale,
                ..Default::default()
            };

            let mut desc = NodeDesc::model(MODEL_CUBE).colored(color);
            desc.transform = transform;
            let node = match scene.spawn(desc) {
                Ok(node) => node,
                Err(e) => {
                    log::warn!("Rubble unavailable: {e}");
                    return spawned;
                }
            };

            self.fragments.spawn((
                transform,
                Velocity::with_angular(velocity, angular),
                Fragment { node },
                Lifetime::new(self.fragment_lifetime),
            ));
        }
        count
    }

    /// Simple ballistic rubble: gravity, ground bounce, and faster decay on
    /// the ground.
    pub fn update<S: Scene>(&mut self, scene: &mut S, dt: f32) {
        let mut expired = Vec::new();

        for (entity, (transform, velocity, fragment, life)) in self
            .fragments
            .query_mut::<(&mut Transform, &mut Velocity, &Fragment, &mut Lifetime)>()
        {
            velocity.linear.z -= GRAVITY * dt;
            transform.position += velocity.linear * dt;
            transform.spin(velocity.angular, dt);

            let mut burn = dt;
            if transform.position.z < 0.0 {
                transform.position.z = 0.0;
                velocity.linear.z *= -0.4;
                velocity.linear.x *= 0.8;
                velocity.linear.y *= 0.8;
                burn *= 3.0;
            }

            if life.update(burn) {
                expired.push((entity, fragment.node));
            } else {
                scene.set_transform(fragment.node, *transform);
            }
        }

        for (entity, node) in expired {
            self.fragments.despawn(entity).ok();
            scene.despawn(node);
        }
    }

    /// Remove every fragment now.
    pub fn clear<S: Scene>(&mut self, scene: &mut S) {
        for (_, fragment) in self.fragments.query_mut::<&Fragment>() {
            scene.despawn(fragment.node);
        }
        self.fragments.clear();
    }

    pub fn fragment_count(&self) -> usize {
        self.fragments.len() as usize
    }

    pub fn demolitions(&self) -> usize {
        self.demolitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::SceneGraph;

    #[derive(Default)]
    struct Recorder(Vec<SoundCue>);

    impl SoundSink for Recorder {
        fn play_cue(&mut self, cue: SoundCue, _position: Vec3, _volume: f32) {
            self.0.push(cue);
        }
    }

    fn tower() -> Building {
        Building::new(0, Vec3::ZERO, 4.0, 4.0, 10.0)
    }

    #[test]
    fn impacts_pick_the_nearest_face() {
        let b = tower();
        assert_eq!(Face::of_impact(&b, Vec3::new(2.0, 4.0, 5.0)), Face::Front);
        assert_eq!(Face::of_impact(&b, Vec3::new(2.0, 0.2, 5.0)), Face::Back);
        assert_eq!(Face::of_impact(&b, Vec3::new(-0.3, 2.0, 5.0)), Face::Left);
        assert_eq!(Face::of_impact(&b, Vec3::new(4.1, 2.0, 5.0)), Face::Right);
        assert_eq!(Face::of_impact(&b, Vec3::new(2.0, 2.0, 9.5)), Face::Top);
        // Corner tie goes to the earlier face.
        assert_eq!(Face::of_impact(&b, Vec3::new(0.0, 0.0, 5.0)), Face::Back);
    }

    #[test]
    fn craters_sit_just_outside_the_face() {
        let b = tower();
        let top = Face::Top.anchor(&b, Vec3::new(1.0, 1.0, 10.4));
        assert!((top - Vec3::new(1.0, 1.0, 10.05)).length() < 1e-5);
        let left = Face::Left.anchor(&b, Vec3::new(-0.4, 3.0, 2.0));
        assert!((left - Vec3::new(-0.05, 3.0, 2.0)).length() < 1e-5);
    }

    #[test]
    fn demolished_exactly_when_damage_exceeds_threshold() {
        let mut scene = SceneGraph::new();
        let mut fx = DestructionSystem::new(1);
        let mut b = tower();
        assert!(b.damage.is_none());
        for hit in 1..=4 {
            let outcome = fx.damage_building(&mut scene, &mut b, Vec3::new(2.0, 4.0, 5.0), 2.0);
            assert!(
                matches!(outcome, DamageOutcome::Damaged { face: Face::Front, .. }),
                "hit {hit}"
            );
        }
        assert!((b.damage() - 0.8).abs() < 1e-5);
        let last = fx.damage_building(&mut scene, &mut b, Vec3::new(2.0, 4.0, 5.0), 2.0);
        assert_eq!(last, DamageOutcome::Demolished);
    }

    #[test]
    fn only_the_latest_craters_are_kept() {
        let mut scene = SceneGraph::new();
        let mut fx = DestructionSystem::new(2);
        let mut b = tower();
        let mut spawned = Vec::new();
        for i in 0..25 {
            let impact = Vec3::new(2.0, 4.0, 1.0 + i as f32 * 0.3);
            fx.damage_building(&mut scene, &mut b, impact, 0.1);
            spawned.push(*b.craters.back().unwrap());
        }
        assert_eq!(b.craters.len(), MAX_CRATERS);
        assert!(b.craters.iter().eq(spawned[5..].iter()));
        assert_eq!(scene.node_count(), MAX_CRATERS);
        assert!((b.damage() - 0.25).abs() < 1e-4);
    }

    #[test]
    fn final_hit_takes_the_building_out_of_the_city() {
        let mut scene = SceneGraph::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut city = City::generate(&mut rng, 2, 2);
        city.spawn_nodes(&mut scene);
        let mut fx = DestructionSystem::new(3);
        let mut audio = Recorder::default();

        let id = city.buildings()[0].id;
        let impact = city.buildings()[0].center();
        let first = fx.building_explosion(&mut scene, &mut audio, &mut city, id, impact, 2.0);
        assert!(matches!(first, Some(DamageOutcome::Damaged { .. })));
        assert_eq!(fx.fragment_count(), 20);

        city.get_mut(id).unwrap().damage = Some(0.85);
        let second = fx.building_explosion(&mut scene, &mut audio, &mut city, id, impact, 2.0);
        assert_eq!(second, Some(DamageOutcome::Demolished));
        assert!(city.get(id).is_none());
        assert_eq!(city.len(), 3);
        assert_eq!(fx.fragment_count(), MAX_FRAGMENTS);
        assert_eq!(fx.demolitions(), 1);
        assert_eq!(audio.0, vec![SoundCue::BuildingImpact; 2]);
        // Three buildings plus rubble; craters went with the building.
        assert_eq!(scene.node_count(), 3 + MAX_FRAGMENTS);

        assert!(fx
            .building_explosion(&mut scene, &mut audio, &mut city, id, impact, 2.0)
            .is_none());
    }

    #[test]
    fn rubble_lands_and_expires() {
        let mut scene = SceneGraph::new();
        let mut fx = DestructionSystem::new(4);
        assert_eq!(fx.spawn_fragments(&mut scene, Vec3::new(0.0, 0.0, 5.0), 80, 1.0), 80);
        assert_eq!(fx.spawn_fragments(&mut scene, Vec3::new(0.0, 0.0, 5.0), 80, 1.0), 20);
        assert_eq!(scene.node_count(), MAX_FRAGMENTS);

        for _ in 0..120 {
            fx.update(&mut scene, 1.0 / 60.0);
        }
        for (_, (t, _)) in fx.fragments.query::<(&Transform, &Fragment)>().iter() {
            assert!(t.position.z >= 0.0);
        }

        for _ in 0..600 {
            fx.update(&mut scene, 1.0 / 60.0);
        }
        assert_eq!(fx.fragment_count(), 0);
        assert_eq!(scene.node_count(), 0);
    }

    #[test]
    fn clear_removes_rubble_nodes() {
        let mut scene = SceneGraph::new();
        let mut fx = DestructionSystem::new(5);
        fx.spawn_fragments(&mut scene, Vec3::ZERO, 10, 0.0);
        fx.clear(&mut scene);
        assert_eq!(fx.fragment_count(), 0);
        assert_eq!(scene.node_count(), 0);
    }
}
