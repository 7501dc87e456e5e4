//! Explosion physics: radial impulses and short-lived rigid-body fragments.
//!
//! The adapter owns the [`PhysicsWorld`] plus a registry of the bodies game
//! code cares about. Only registered bodies are pushed by explosions.

use crate::collision::CollisionGroup;
use crate::physics_world::{ContactEvent, PhysicsWorld};
use engine_core::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rapier3d::prelude::*;
use std::collections::{HashMap, HashSet};

/// Explosions never reach further than this, whatever their radius.
pub const MAX_EXPLOSION_DISTANCE: f32 = 20.0;

const FRAGMENT_RESTITUTION: f32 = 0.3;
const FRAGMENT_FRICTION: f32 = 0.8;

/// What a registered body represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyTag {
    Building,
    Gorilla,
    Fragment,
    Projectile,
}

#[derive(Debug, Clone, Default)]
pub struct BodyInfo {
    pub tags: HashSet<BodyTag>,
}

/// A body pushed by an explosion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffectedBody {
    pub handle: RigidBodyHandle,
    pub distance: f32,
    pub force: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentShape {
    Box,
    Ball,
    Cylinder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactCallbackId(u64);

/// Called once per contact that started during an [`ExplosionPhysics::update`].
pub type ContactCallback = Box<dyn FnMut(&ContactEvent)>;

struct Temporary {
    handle: RigidBodyHandle,
    remaining: f32,
}

pub struct ExplosionPhysics {
    pub world: PhysicsWorld,
    bodies: HashMap<RigidBodyHandle, BodyInfo>,
    temporaries: Vec<Temporary>,
    restitution: f32,
    rng: StdRng,
    contact_callbacks: Vec<(ContactCallbackId, ContactCallback)>,
    next_callback: u64,
}

impl ExplosionPhysics {
    pub fn new(seed: u64) -> Self {
        let mut world = PhysicsWorld::new();
        world.add_ground_plane();
        Self {
            world,
            bodies: HashMap::new(),
            temporaries: Vec::new(),
            restitution: FRAGMENT_RESTITUTION,
            rng: StdRng::seed_from_u64(seed),
            contact_callbacks: Vec::new(),
            next_callback: 0,
        }
    }

    /// Track a body so explosions can affect it.
    pub fn register_body(&mut self, handle: RigidBodyHandle, tags: &[BodyTag]) {
        let info = self.bodies.entry(handle).or_default();
        info.tags.extend(tags.iter().copied());
    }

    /// Register a body that is removed automatically after `lifetime` seconds.
    pub fn register_temporary(&mut self, handle: RigidBodyHandle, tags: &[BodyTag], lifetime: f32) {
        self.register_body(handle, tags);
        self.temporaries.push(Temporary {
            handle,
            remaining: lifetime,
        });
    }

    pub fn is_registered(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.contains_key(&handle)
    }

    pub fn has_tag(&self, handle: RigidBodyHandle, tag: BodyTag) -> bool {
        self.bodies
            .get(&handle)
            .map(|info| info.tags.contains(&tag))
            .unwrap_or(false)
    }

    pub fn registered_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn temporary_count(&self) -> usize {
        self.temporaries.len()
    }

    /// Add a static box for a building, registered with the `Building` tag.
    pub fn add_building(&mut self, center: Vec3, half_extents: Vec3) -> RigidBodyHandle {
        let handle = self.world.add_static_body(center);
        self.world
            .add_box_collider(handle, half_extents, CollisionGroup::Building);
        self.register_body(handle, &[BodyTag::Building]);
        handle
    }

    /// Push every registered dynamic body within range away from `epicenter`.
    pub fn apply_explosion_force(
        &mut self,
        epicenter: Vec3,
        radius: f32,
        force: f32,
        affect_buildings: bool,
    ) -> Vec<AffectedBody> {
        let radius = radius.min(MAX_EXPLOSION_DISTANCE);
        if radius <= 0.0 {
            return Vec::new();
        }

        let mut handles: Vec<RigidBodyHandle> = self.bodies.keys().copied().collect();
        // Stable order keeps seeded runs reproducible.
        handles.sort_by_key(|h| h.into_raw_parts());

        let mut affected = Vec::new();
        for handle in handles {
            if !self.world.is_dynamic(handle) {
                continue;
            }
            if self.has_tag(handle, BodyTag::Building) && !affect_buildings {
                continue;
            }
            let Some(position) = self.world.body_position(handle) else {
                continue;
            };

            let offset = position - epicenter;
            let distance = offset.length();
            if distance > radius {
                continue;
            }

            let falloff = force * (1.0 - distance / radius);
            let mut direction = if distance < 0.1 {
                Vec3::new(
                    self.rng.gen_range(-1.0..1.0),
                    self.rng.gen_range(-1.0..1.0),
                    self.rng.gen_range(0.5..1.0),
                )
            } else {
                offset / distance
            };
            direction.z += 0.5;
            let direction = direction.normalize_or(Vec3::Z);

            self.world.apply_impulse(handle, direction * falloff);
            let torque = Vec3::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
            ) * 0.5
                * falloff;
            self.world.apply_torque_impulse(handle, torque);

            affected.push(AffectedBody {
                handle,
                distance,
                force: falloff,
            });
        }

        log::debug!(
            "Explosion at {:?} pushed {} bodies (r={radius:.1}, f={force:.0})",
            epicenter,
            affected.len()
        );
        affected
    }

    /// Spawn `count` loose fragments that fly out from `position`.
    pub fn spawn_fragments(
        &mut self,
        position: Vec3,
        count: usize,
        force: f32,
        scale: f32,
        lifetime: f32,
    ) -> Vec<RigidBodyHandle> {
        let scale = scale.max(0.01);
        let mut handles = Vec::with_capacity(count);

        for _ in 0..count {
            let shape = match self.rng.gen_range(0..3) {
                0 => FragmentShape::Box,
                1 => FragmentShape::Ball,
                _ => FragmentShape::Cylinder,
            };
            let mass = self.rng.gen_range(0.1..1.0) * scale;

            let offset = Vec3::new(
                self.rng.gen_range(-0.5..0.5),
                self.rng.gen_range(-0.5..0.5),
                self.rng.gen_range(0.0..0.5),
            ) * scale;
            let spawn_at = position + offset;
            let rotation = vector![
                self.rng.gen_range(0.0..std::f32::consts::TAU),
                self.rng.gen_range(0.0..std::f32::consts::TAU),
                self.rng.gen_range(0.0..std::f32::consts::TAU)
            ];

            let body = RigidBodyBuilder::dynamic()
                .translation(vector![spawn_at.x, spawn_at.y, spawn_at.z])
                .rotation(rotation)
                .build();
            let handle = self.world.rigid_body_set.insert(body);

            let builder = match shape {
                FragmentShape::Box => ColliderBuilder::cuboid(scale, scale, scale),
                FragmentShape::Ball => ColliderBuilder::ball(scale),
                FragmentShape::Cylinder => ColliderBuilder::cylinder(scale, scale * 0.5),
            };
            let collider = builder
                .mass(mass)
                .restitution(self.restitution)
                .friction(FRAGMENT_FRICTION)
                .collision_groups(CollisionGroup::Debris.interaction_groups())
                .active_events(ActiveEvents::COLLISION_EVENTS)
                .build();
            self.world.attach_collider(handle, collider);

            let direction = Vec3::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(0.5..1.5),
            )
            .normalize_or(Vec3::Z);
            let magnitude = force * self.rng.gen_range(0.5..1.5) / mass;
            self.world.apply_impulse(handle, direction * magnitude);
            let torque = Vec3::new(
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
                self.rng.gen_range(-1.0..1.0),
            ) * magnitude
                * 0.1;
            self.world.apply_torque_impulse(handle, torque);

            self.register_temporary(handle, &[BodyTag::Fragment], lifetime);
            handles.push(handle);
        }

        handles
    }

    pub fn register_contact_callback(&mut self, callback: ContactCallback) -> ContactCallbackId {
        let id = ContactCallbackId(self.next_callback);
        self.next_callback += 1;
        self.contact_callbacks.push((id, callback));
        id
    }

    pub fn unregister_contact_callback(&mut self, id: ContactCallbackId) -> bool {
        let before = self.contact_callbacks.len();
        self.contact_callbacks.retain(|(cid, _)| *cid != id);
        self.contact_callbacks.len() != before
    }

    /// Step the world, report new contacts, then drop expired temporaries,
    /// resting or not. Returns how many contacts started this step.
    pub fn update(&mut self, dt: f32) -> usize {
        self.world.step(dt);

        let contacts = self.world.drain_contacts();
        for contact in &contacts {
            for (_, callback) in &mut self.contact_callbacks {
                callback(contact);
            }
        }

        let mut expired = Vec::new();
        self.temporaries.retain_mut(|t| {
            t.remaining -= dt;
            if t.remaining <= 0.0 {
                expired.push(t.handle);
                false
            } else {
                true
            }
        });
        for handle in expired {
            self.bodies.remove(&handle);
            self.world.remove_body(handle);
        }
        contacts.len()
    }

    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.bodies.remove(&handle);
        self.temporaries.retain(|t| t.handle != handle);
        self.world.remove_body(handle)
    }

    /// Remove every registered body from the world.
    pub fn remove_all(&mut self) {
        let handles: Vec<RigidBodyHandle> = self.bodies.keys().copied().collect();
        for handle in handles {
            self.world.remove_body(handle);
        }
        self.bodies.clear();
        self.temporaries.clear();
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.world.set_gravity(gravity);
    }

    /// Set restitution on all registered bodies and on future fragments.
    pub fn set_restitution(&mut self, restitution: f32) {
        self.restitution = restitution.clamp(0.0, 1.0);
        let handles: Vec<RigidBodyHandle> = self.bodies.keys().copied().collect();
        for handle in handles {
            self.world.set_body_restitution(handle, self.restitution);
        }
    }

    pub fn restitution(&self) -> f32 {
        self.restitution
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn crate_at(physics: &mut ExplosionPhysics, position: Vec3, tags: &[BodyTag]) -> RigidBodyHandle {
        let handle = physics.world.add_dynamic_body(position);
        physics
            .world
            .add_box_collider(handle, Vec3::splat(0.5), CollisionGroup::Debris);
        physics.register_body(handle, tags);
        handle
    }

    #[test]
    fn force_falls_off_with_distance() {
        let mut physics = ExplosionPhysics::new(7);
        let near = crate_at(&mut physics, Vec3::new(2.0, 0.0, 1.0), &[]);
        let far = crate_at(&mut physics, Vec3::new(8.0, 0.0, 1.0), &[]);
        let out = crate_at(&mut physics, Vec3::new(15.0, 0.0, 1.0), &[]);

        let affected = physics.apply_explosion_force(Vec3::new(0.0, 0.0, 1.0), 10.0, 100.0, false);
        let force_of = |h| affected.iter().find(|a| a.handle == h).map(|a| a.force);

        assert!((force_of(near).unwrap() - 80.0).abs() < 1e-3);
        assert!((force_of(far).unwrap() - 20.0).abs() < 1e-3);
        assert!(force_of(out).is_none());
    }

    #[test]
    fn radius_is_capped_and_buildings_are_opt_in() {
        let mut physics = ExplosionPhysics::new(1);
        let tower = crate_at(&mut physics, Vec3::new(5.0, 0.0, 1.0), &[BodyTag::Building]);
        let far = crate_at(&mut physics, Vec3::new(25.0, 0.0, 1.0), &[]);
        let fixed = physics.add_building(Vec3::new(3.0, 0.0, 5.0), Vec3::new(1.0, 1.0, 5.0));

        let calm = physics.apply_explosion_force(Vec3::new(0.0, 0.0, 1.0), 50.0, 100.0, false);
        assert!(calm.is_empty());

        let large = physics.apply_explosion_force(Vec3::new(0.0, 0.0, 1.0), 50.0, 100.0, true);
        assert_eq!(large.len(), 1);
        assert_eq!(large[0].handle, tower);
        assert!((large[0].force - 75.0).abs() < 1e-3);
        assert!(large.iter().all(|a| a.handle != far && a.handle != fixed));
    }

    #[test]
    fn fragments_expire_after_lifetime() {
        let mut physics = ExplosionPhysics::new(3);
        let handles = physics.spawn_fragments(Vec3::new(0.0, 0.0, 2.0), 6, 50.0, 0.4, 0.5);
        assert_eq!(handles.len(), 6);
        assert!(handles.iter().all(|h| physics.has_tag(*h, BodyTag::Fragment)));
        assert_eq!(physics.temporary_count(), 6);

        for _ in 0..20 {
            physics.update(1.0 / 60.0);
        }
        assert_eq!(physics.temporary_count(), 6);

        for _ in 0..20 {
            physics.update(1.0 / 60.0);
        }
        assert_eq!(physics.temporary_count(), 0);
        assert_eq!(physics.registered_count(), 0);
        assert_eq!(physics.world.body_count(), 0);
    }

    #[test]
    fn fragments_report_landing_on_the_ground() {
        let mut physics = ExplosionPhysics::new(11);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = physics.register_contact_callback(Box::new(move |contact| {
            sink.borrow_mut().push(*contact);
        }));

        let fragment = physics.spawn_fragments(Vec3::new(0.0, 0.0, 1.0), 1, 0.0, 0.2, 10.0)[0];
        let mut reported = 0;
        for _ in 0..120 {
            reported += physics.update(1.0 / 60.0);
        }

        let contacts = seen.borrow().clone();
        assert_eq!(contacts.len(), reported);
        let landing = contacts
            .iter()
            .find(|c| c.involves(fragment))
            .expect("fragment never touched anything");
        // The ground plane has no body.
        assert_eq!(landing.other(fragment), None);
        assert!(landing.normal.z.abs() > 0.9);
        if let Some(point) = landing.point {
            assert!(point.z.abs() < 0.5);
        }

        assert!(physics.unregister_contact_callback(id));
        assert!(!physics.unregister_contact_callback(id));
    }

    #[test]
    fn restitution_is_clamped() {
        let mut physics = ExplosionPhysics::new(0);
        physics.set_restitution(1.7);
        assert_eq!(physics.restitution(), 1.0);
        physics.set_restitution(-0.2);
        assert_eq!(physics.restitution(), 0.0);
    }

    #[test]
    fn remove_all_clears_registry() {
        let mut physics = ExplosionPhysics::new(0);
        physics.add_building(Vec3::new(0.0, 0.0, 5.0), Vec3::new(2.0, 2.0, 5.0));
        physics.spawn_fragments(Vec3::ZERO, 3, 10.0, 0.2, 5.0);
        physics.remove_all();
        assert_eq!(physics.registered_count(), 0);
        assert_eq!(physics.temporary_count(), 0);
        assert_eq!(physics.world.body_count(), 0);
    }
}
