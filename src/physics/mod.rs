//! Rigid-body simulation interface
//!
//! Gameplay code talks to the physics engine only through [`Simulation`].
//! The built-in [`World`] implements it; tests can substitute a double.
//!
//! Bodies are referenced by [`BodyHandle`]. Two handles compare equal iff
//! they name the same body, which is how collision participants are
//! identified.

pub mod body;
pub mod contact;
pub mod world;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

pub use body::RigidBody;
pub use contact::{Contact, find_contacts};
pub use world::World;

/// Identity of a simulated body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyHandle(pub u32);

/// Registration of a collision listener on one body
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CollideSubscription(pub u32);

/// Registration of a world-wide post-step hook
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PostStepSubscription(pub u32);

/// Collision volume
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Cuboid { half_extents: Vec3 },
}

impl Shape {
    /// Radius of the smallest sphere enclosing the shape
    pub fn bounding_radius(&self) -> f32 {
        match *self {
            Shape::Sphere { radius } => radius,
            Shape::Cuboid { half_extents } => half_extents.length(),
        }
    }
}

/// Parameters for [`Simulation::create_body`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    /// Mass in kg; zero makes the body static
    pub mass: f32,
    pub position: Vec3,
    pub shape: Shape,
}

/// Kinematic snapshot of a body
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vec3,
    pub orientation: Quat,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
}

/// A contact reported to a collision listener
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Body the listener is attached to
    pub body: BodyHandle,
    /// Body it touched
    pub other: BodyHandle,
    /// Approach speed along the contact normal (m/s, >= 0)
    pub impact_velocity: f32,
}

/// Callbacks invoked synchronously from inside [`Simulation::step`]
///
/// Both callbacks receive the simulation itself, so handlers can add or
/// remove bodies and subscriptions before the step continues.
pub trait StepHooks {
    fn on_collide(
        &mut self,
        sim: &mut dyn Simulation,
        subscription: CollideSubscription,
        event: &CollisionEvent,
    );

    fn on_post_step(&mut self, sim: &mut dyn Simulation, subscription: PostStepSubscription);
}

/// Stepping with nobody listening
impl StepHooks for () {
    fn on_collide(&mut self, _: &mut dyn Simulation, _: CollideSubscription, _: &CollisionEvent) {}

    fn on_post_step(&mut self, _: &mut dyn Simulation, _: PostStepSubscription) {}
}

/// Rigid-body world consumed by the gameplay layer
pub trait Simulation {
    /// Create a body. It is not simulated until [`Simulation::add_body`].
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle;

    /// Make a created body part of the world. No-op if already added or unknown.
    fn add_body(&mut self, body: BodyHandle);

    /// Take a body out of the world and forget it. No-op for unknown handles.
    fn remove_body(&mut self, body: BodyHandle);

    /// Whether the body is currently simulated
    fn contains_body(&self, body: BodyHandle) -> bool;

    /// Current transform and velocities of a created body
    fn body_state(&self, body: BodyHandle) -> Option<BodyState>;

    /// Apply an impulse given in body-local axes at a body-local point
    fn apply_local_impulse(&mut self, body: BodyHandle, impulse: Vec3, local_point: Vec3);

    /// Accumulate a world-space force at the centre of mass for the next step
    fn apply_force(&mut self, body: BodyHandle, force: Vec3);

    fn on_collide(&mut self, body: BodyHandle) -> CollideSubscription;

    /// No-op if the subscription is not active
    fn off_collide(&mut self, subscription: CollideSubscription);

    fn on_post_step(&mut self) -> PostStepSubscription;

    /// No-op if the subscription is not active
    fn off_post_step(&mut self, subscription: PostStepSubscription);

    /// Advance by whole `fixed_dt` steps covering `measured_dt`, at most
    /// `max_sub_steps` of them. Returns the number of steps taken.
    fn step(
        &mut self,
        fixed_dt: f32,
        measured_dt: f32,
        max_sub_steps: u32,
        hooks: &mut dyn StepHooks,
    ) -> u32;

    /// Simulated seconds since creation
    fn time(&self) -> f64;
}
