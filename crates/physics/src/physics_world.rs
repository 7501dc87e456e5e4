//! Physics world management with Rapier3D.
//!
//! Z is up: gravity pulls along -Z and the ground is the `z = 0` half-space.

use crate::collision::CollisionGroup;
use crossbeam::channel::Receiver;
use engine_core::Vec3;
use rapier3d::prelude::*;

/// Default downward acceleration in m/s².
pub const DEFAULT_GRAVITY: f32 = 9.81;

/// Two colliders that started touching during the last step.
///
/// Only colliders built with `ActiveEvents::COLLISION_EVENTS` report contacts.
/// A `None` body is a free-standing collider such as the ground plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub collider1: ColliderHandle,
    pub collider2: ColliderHandle,
    pub body1: Option<RigidBodyHandle>,
    pub body2: Option<RigidBodyHandle>,
    /// World-space contact point, when the narrow phase produced one.
    pub point: Option<Vec3>,
    /// Contact normal pointing from the first collider to the second.
    pub normal: Vec3,
    pub impulse: f32,
}

impl ContactEvent {
    pub fn involves(&self, body: RigidBodyHandle) -> bool {
        self.body1 == Some(body) || self.body2 == Some(body)
    }

    /// The body on the other side of the contact from `body`.
    pub fn other(&self, body: RigidBodyHandle) -> Option<RigidBodyHandle> {
        if self.body1 == Some(body) {
            self.body2
        } else {
            self.body1
        }
    }
}

/// Main physics world containing all simulation state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub gravity: Vector<Real>,
    pub integration_parameters: IntegrationParameters,
    pub physics_pipeline: PhysicsPipeline,
    pub island_manager: IslandManager,
    pub broad_phase: DefaultBroadPhase,
    pub narrow_phase: NarrowPhase,
    pub impulse_joint_set: ImpulseJointSet,
    pub multibody_joint_set: MultibodyJointSet,
    pub ccd_solver: CCDSolver,

    collision_recv: Receiver<CollisionEvent>,
    contact_force_recv: Receiver<ContactForceEvent>,
    event_handler: ChannelEventCollector,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld {
    /// Create a new physics world with default gravity.
    pub fn new() -> Self {
        let (collision_send, collision_recv) = crossbeam::channel::unbounded();
        let (contact_force_send, contact_force_recv) = crossbeam::channel::unbounded();
        let event_handler = ChannelEventCollector::new(collision_send, contact_force_send);

        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            gravity: vector![0.0, 0.0, -DEFAULT_GRAVITY],
            integration_parameters: IntegrationParameters::default(),
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            collision_recv,
            contact_force_recv,
            event_handler,
        }
    }

    /// Step the simulation by `dt` seconds. Non-positive steps are skipped.
    pub fn step(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.integration_parameters.dt = dt;
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            None,
            &(),
            &self.event_handler,
        );
    }

    /// Contacts that started during the steps since the last drain.
    pub fn drain_contacts(&mut self) -> Vec<ContactEvent> {
        // Force events are not requested by any collider; keep the channel empty.
        while self.contact_force_recv.try_recv().is_ok() {}

        let mut contacts = Vec::new();
        while let Ok(event) = self.collision_recv.try_recv() {
            if let CollisionEvent::Started(c1, c2, _) = event {
                contacts.push(self.describe_contact(c1, c2));
            }
        }
        contacts
    }

    fn describe_contact(&self, collider1: ColliderHandle, collider2: ColliderHandle) -> ContactEvent {
        let parent = |c: ColliderHandle| self.collider_set.get(c).and_then(|c| c.parent());
        let mut event = ContactEvent {
            collider1,
            collider2,
            body1: parent(collider1),
            body2: parent(collider2),
            point: None,
            normal: Vec3::ZERO,
            impulse: 0.0,
        };
        let Some(pair) = self.narrow_phase.contact_pair(collider1, collider2) else {
            return event;
        };
        event.impulse = pair.total_impulse_magnitude();
        if let Some(manifold) = pair.manifolds.iter().find(|m| !m.data.solver_contacts.is_empty()) {
            let n = manifold.data.normal;
            let p = manifold.data.solver_contacts[0].point;
            // The pair may be stored in the opposite order from the event.
            let sign = if pair.collider1 == collider1 { 1.0 } else { -1.0 };
            event.normal = Vec3::new(n.x, n.y, n.z) * sign;
            event.point = Some(Vec3::new(p.x, p.y, p.z));
        }
        event
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = vector![gravity.x, gravity.y, gravity.z];
    }

    /// Add a dynamic rigid body and return its handle.
    pub fn add_dynamic_body(&mut self, position: Vec3) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::dynamic()
            .translation(vector![position.x, position.y, position.z])
            .build();
        self.rigid_body_set.insert(rigid_body)
    }

    /// Add a static rigid body (for buildings, rooftops).
    pub fn add_static_body(&mut self, position: Vec3) -> RigidBodyHandle {
        let rigid_body = RigidBodyBuilder::fixed()
            .translation(vector![position.x, position.y, position.z])
            .build();
        self.rigid_body_set.insert(rigid_body)
    }

    /// Add a box collider to a rigid body.
    pub fn add_box_collider(
        &mut self,
        body_handle: RigidBodyHandle,
        half_extents: Vec3,
        group: CollisionGroup,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::cuboid(half_extents.x, half_extents.y, half_extents.z)
            .collision_groups(group.interaction_groups())
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set)
    }

    /// Add a sphere collider to a rigid body.
    pub fn add_sphere_collider(
        &mut self,
        body_handle: RigidBodyHandle,
        radius: f32,
        group: CollisionGroup,
    ) -> ColliderHandle {
        let collider = ColliderBuilder::ball(radius)
            .collision_groups(group.interaction_groups())
            .build();
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set)
    }

    /// Insert a fully configured collider on a body.
    pub fn attach_collider(
        &mut self,
        body_handle: RigidBodyHandle,
        collider: Collider,
    ) -> ColliderHandle {
        self.collider_set
            .insert_with_parent(collider, body_handle, &mut self.rigid_body_set)
    }

    /// Add the ground plane collider (the `z = 0` half-space).
    pub fn add_ground_plane(&mut self) -> ColliderHandle {
        let collider = ColliderBuilder::halfspace(Vector::z_axis())
            .collision_groups(CollisionGroup::Terrain.interaction_groups())
            .build();
        self.collider_set.insert(collider)
    }

    pub fn body_position(&self, handle: RigidBodyHandle) -> Option<Vec3> {
        self.rigid_body_set.get(handle).map(|body| {
            let pos = body.translation();
            Vec3::new(pos.x, pos.y, pos.z)
        })
    }

    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .get(handle)
            .map(|body| body.is_dynamic())
            .unwrap_or(false)
    }

    /// Apply an impulse to a dynamic body.
    pub fn apply_impulse(&mut self, handle: RigidBodyHandle, impulse: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_impulse(vector![impulse.x, impulse.y, impulse.z], true);
        }
    }

    /// Apply an angular impulse to a dynamic body.
    pub fn apply_torque_impulse(&mut self, handle: RigidBodyHandle, torque: Vec3) {
        if let Some(body) = self.rigid_body_set.get_mut(handle) {
            body.apply_torque_impulse(vector![torque.x, torque.y, torque.z], true);
        }
    }

    /// Set the restitution of every collider attached to a body.
    pub fn set_body_restitution(&mut self, handle: RigidBodyHandle, restitution: f32) {
        let Some(body) = self.rigid_body_set.get(handle) else {
            return;
        };
        for collider in body.colliders().to_vec() {
            if let Some(c) = self.collider_set.get_mut(collider) {
                c.set_restitution(restitution);
            }
        }
    }

    /// Remove a rigid body and its colliders.
    pub fn remove_body(&mut self, handle: RigidBodyHandle) -> bool {
        self.rigid_body_set
            .remove(
                handle,
                &mut self.island_manager,
                &mut self.collider_set,
                &mut self.impulse_joint_set,
                &mut self.multibody_joint_set,
                true,
            )
            .is_some()
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }
}
