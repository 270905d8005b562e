//! Built-in rigid-body world
//!
//! Fixed-timestep integration with an accumulator, brute-force pair
//! detection (body counts stay in the low hundreds) and a sequential
//! impulse solver. Iteration is by handle order, so identical inputs give
//! identical results.

use std::collections::{BTreeMap, BTreeSet};

use glam::Vec3;

use super::contact::{Contact, find_contacts};
use super::{
    BodyDesc, BodyHandle, BodyState, CollideSubscription, CollisionEvent, PostStepSubscription,
    RigidBody, Simulation, StepHooks,
};
use crate::consts::*;

/// Below this approach speed contacts do not bounce
const RESTITUTION_THRESHOLD: f32 = 1.0;
/// Allowed overlap before positional correction kicks in
const PENETRATION_SLOP: f32 = 0.005;
/// Fraction of the remaining overlap removed per step
const CORRECTION_PERCENT: f32 = 0.6;

/// Material and solver parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldConfig {
    pub gravity: Vec3,
    pub friction: f32,
    pub restitution: f32,
    pub solver_iterations: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, GRAVITY, 0.0),
            friction: FRICTION,
            restitution: RESTITUTION,
            solver_iterations: 10,
        }
    }
}

/// Contact prepared for the velocity solver
struct SolverContact {
    a: usize,
    b: usize,
    contact: Contact,
    /// Normal velocity the solver drives toward (restitution bounce)
    target_vn: f32,
    /// Accumulated normal impulse (clamped >= 0)
    normal_impulse: f32,
    /// Friction directions spanning the contact plane
    tangents: [Vec3; 2],
    /// Accumulated friction impulse along each tangent
    tangent_impulse: [f32; 2],
    /// Largest friction impulse per tangent this step
    friction_limit: f32,
    /// Contacts sharing this body pair (splits positional correction)
    pair_contacts: usize,
}

/// Touching pair found during one fixed step
struct TouchingPair {
    a: BodyHandle,
    b: BodyHandle,
    impact_velocity: f32,
}

pub struct World {
    config: WorldConfig,
    bodies: BTreeMap<BodyHandle, RigidBody>,
    collide_subs: BTreeMap<CollideSubscription, BodyHandle>,
    post_step_subs: BTreeSet<PostStepSubscription>,
    next_body: u32,
    next_subscription: u32,
    accumulator: f32,
    time: f64,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        Self {
            config,
            bodies: BTreeMap::new(),
            collide_subs: BTreeMap::new(),
            post_step_subs: BTreeSet::new(),
            next_body: 1,
            next_subscription: 1,
            accumulator: 0.0,
            time: 0.0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Number of bodies currently simulated
    pub fn body_count(&self) -> usize {
        self.bodies.values().filter(|b| b.in_world).count()
    }

    /// Number of active collision listeners
    pub fn collide_subscription_count(&self) -> usize {
        self.collide_subs.len()
    }

    /// Number of active post-step hooks
    pub fn post_step_subscription_count(&self) -> usize {
        self.post_step_subs.len()
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(&handle)
    }

    fn next_subscription_id(&mut self) -> u32 {
        let id = self.next_subscription;
        self.next_subscription += 1;
        id
    }

    /// Advance exactly one fixed step
    fn internal_step(&mut self, dt: f32, hooks: &mut dyn StepHooks) {
        let handles: Vec<BodyHandle> = self
            .bodies
            .iter()
            .filter(|(_, b)| b.in_world)
            .map(|(h, _)| *h)
            .collect();
        let mut scratch: Vec<RigidBody> = handles
            .iter()
            .filter_map(|h| self.bodies.get(h).cloned())
            .collect();

        for body in &mut scratch {
            body.integrate_velocity(self.config.gravity, dt);
        }

        let (mut solver, touching) = self.detect(&handles, &scratch, dt);
        self.solve_velocities(&mut scratch, &mut solver);
        correct_positions(&mut scratch, &solver);

        for body in &mut scratch {
            body.integrate_position(dt);
            body.force = Vec3::ZERO;
        }
        for (handle, body) in handles.iter().zip(scratch) {
            self.bodies.insert(*handle, body);
        }
        self.time += dt as f64;

        self.dispatch_collisions(&touching, hooks);
        self.dispatch_post_step(hooks);
    }

    /// Find every touching pair and prepare solver contacts
    fn detect(
        &self,
        handles: &[BodyHandle],
        bodies: &[RigidBody],
        dt: f32,
    ) -> (Vec<SolverContact>, Vec<TouchingPair>) {
        let mut solver = Vec::new();
        let mut touching = Vec::new();
        let weight = self.config.gravity.length();

        for i in 0..bodies.len() {
            for j in (i + 1)..bodies.len() {
                let (a, b) = (&bodies[i], &bodies[j]);
                if a.is_static() && b.is_static() {
                    continue;
                }
                let contacts = find_contacts(a, b);
                if contacts.is_empty() {
                    continue;
                }

                let mut impact = 0.0f32;
                let pair_contacts = contacts.len();
                // Friction bound scales with weight, not with the normal load
                let reduced_mass = 1.0 / (a.inv_mass + b.inv_mass);
                let friction_limit = self.config.friction * weight * reduced_mass * dt;
                for contact in contacts {
                    let rel = b.velocity_at(contact.point - b.position)
                        - a.velocity_at(contact.point - a.position);
                    let vn = rel.dot(contact.normal);
                    impact = impact.max(-vn);
                    let target_vn = if -vn > RESTITUTION_THRESHOLD {
                        -self.config.restitution * vn
                    } else {
                        0.0
                    };
                    let (t1, t2) = contact.normal.any_orthonormal_pair();
                    solver.push(SolverContact {
                        a: i,
                        b: j,
                        contact,
                        target_vn,
                        normal_impulse: 0.0,
                        tangents: [t1, t2],
                        tangent_impulse: [0.0; 2],
                        friction_limit,
                        pair_contacts,
                    });
                }

                touching.push(TouchingPair {
                    a: handles[i],
                    b: handles[j],
                    impact_velocity: impact.max(0.0),
                });
            }
        }

        (solver, touching)
    }

    fn solve_velocities(&self, bodies: &mut [RigidBody], contacts: &mut [SolverContact]) {
        for _ in 0..self.config.solver_iterations {
            for sc in contacts.iter_mut() {
                let n = sc.contact.normal;
                let ra = sc.contact.point - bodies[sc.a].position;
                let rb = sc.contact.point - bodies[sc.b].position;

                let rel = bodies[sc.b].velocity_at(rb) - bodies[sc.a].velocity_at(ra);
                let vn = rel.dot(n);

                let k = effective_mass(&bodies[sc.a], &bodies[sc.b], ra, rb, n);
                if k <= f32::EPSILON {
                    continue;
                }

                // Normal impulse with accumulated clamping
                let delta = (sc.target_vn - vn) / k;
                let accumulated = (sc.normal_impulse + delta).max(0.0);
                let applied = accumulated - sc.normal_impulse;
                sc.normal_impulse = accumulated;
                bodies[sc.a].apply_impulse(-n * applied, ra);
                bodies[sc.b].apply_impulse(n * applied, rb);

                // Friction with accumulated clamping per tangent
                for (t, tangent) in sc.tangents.into_iter().enumerate() {
                    let kt = effective_mass(&bodies[sc.a], &bodies[sc.b], ra, rb, tangent);
                    if kt <= f32::EPSILON {
                        continue;
                    }
                    let rel = bodies[sc.b].velocity_at(rb) - bodies[sc.a].velocity_at(ra);
                    let delta = -rel.dot(tangent) / kt;
                    let accumulated = (sc.tangent_impulse[t] + delta)
                        .clamp(-sc.friction_limit, sc.friction_limit);
                    let applied = accumulated - sc.tangent_impulse[t];
                    sc.tangent_impulse[t] = accumulated;
                    bodies[sc.a].apply_impulse(-tangent * applied, ra);
                    bodies[sc.b].apply_impulse(tangent * applied, rb);
                }
            }
        }
    }

    fn dispatch_collisions(&mut self, touching: &[TouchingPair], hooks: &mut dyn StepHooks) {
        if self.collide_subs.is_empty() {
            return;
        }

        let mut deliveries: Vec<(CollideSubscription, CollisionEvent)> = Vec::new();
        for pair in touching {
            for (sub, body) in &self.collide_subs {
                let other = if *body == pair.a {
                    pair.b
                } else if *body == pair.b {
                    pair.a
                } else {
                    continue;
                };
                deliveries.push((
                    *sub,
                    CollisionEvent {
                        body: *body,
                        other,
                        impact_velocity: pair.impact_velocity,
                    },
                ));
            }
        }

        for (sub, event) in deliveries {
            // An earlier handler may have unsubscribed this listener
            if !self.collide_subs.contains_key(&sub) {
                continue;
            }
            hooks.on_collide(self, sub, &event);
        }
    }

    fn dispatch_post_step(&mut self, hooks: &mut dyn StepHooks) {
        let subs: Vec<PostStepSubscription> = self.post_step_subs.iter().copied().collect();
        for sub in subs {
            if self.post_step_subs.contains(&sub) {
                hooks.on_post_step(self, sub);
            }
        }
    }
}

/// Inverse effective mass of the pair along `dir`
fn effective_mass(a: &RigidBody, b: &RigidBody, ra: Vec3, rb: Vec3, dir: Vec3) -> f32 {
    let angular_a = (a.inv_inertia_world() * ra.cross(dir)).cross(ra);
    let angular_b = (b.inv_inertia_world() * rb.cross(dir)).cross(rb);
    a.inv_mass + b.inv_mass + dir.dot(angular_a + angular_b)
}

/// Push overlapping bodies apart in proportion to their inverse masses
fn correct_positions(bodies: &mut [RigidBody], contacts: &[SolverContact]) {
    for sc in contacts {
        let total_inv = bodies[sc.a].inv_mass + bodies[sc.b].inv_mass;
        if total_inv <= 0.0 {
            continue;
        }
        let depth = (sc.contact.penetration - PENETRATION_SLOP).max(0.0);
        if depth == 0.0 {
            continue;
        }
        let correction =
            sc.contact.normal * (depth * CORRECTION_PERCENT / total_inv / sc.pair_contacts as f32);
        let inv_a = bodies[sc.a].inv_mass;
        let inv_b = bodies[sc.b].inv_mass;
        bodies[sc.a].position -= correction * inv_a;
        bodies[sc.b].position += correction * inv_b;
    }
}

impl Simulation for World {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let handle = BodyHandle(self.next_body);
        self.next_body += 1;
        self.bodies.insert(handle, RigidBody::new(&desc));
        handle
    }

    fn add_body(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.in_world = true;
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body).is_some() {
            // Listeners die with their body
            self.collide_subs.retain(|_, b| *b != body);
        }
    }

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.bodies.get(&body).is_some_and(|b| b.in_world)
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&body).map(RigidBody::state)
    }

    fn apply_local_impulse(&mut self, body: BodyHandle, impulse: Vec3, local_point: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            let world_impulse = b.orientation * impulse;
            let offset = b.orientation * local_point;
            b.apply_impulse(world_impulse, offset);
        }
    }

    fn apply_force(&mut self, body: BodyHandle, force: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.force += force;
        }
    }

    fn on_collide(&mut self, body: BodyHandle) -> CollideSubscription {
        let sub = CollideSubscription(self.next_subscription_id());
        self.collide_subs.insert(sub, body);
        sub
    }

    fn off_collide(&mut self, subscription: CollideSubscription) {
        self.collide_subs.remove(&subscription);
    }

    fn on_post_step(&mut self) -> PostStepSubscription {
        let sub = PostStepSubscription(self.next_subscription_id());
        self.post_step_subs.insert(sub);
        sub
    }

    fn off_post_step(&mut self, subscription: PostStepSubscription) {
        self.post_step_subs.remove(&subscription);
    }

    fn step(
        &mut self,
        fixed_dt: f32,
        measured_dt: f32,
        max_sub_steps: u32,
        hooks: &mut dyn StepHooks,
    ) -> u32 {
        if fixed_dt <= 0.0 {
            return 0;
        }
        let measured_dt = if measured_dt.is_finite() {
            measured_dt.clamp(0.0, MAX_FRAME_DT)
        } else {
            0.0
        };

        self.accumulator += measured_dt;
        let mut substeps = 0;
        while self.accumulator >= fixed_dt && substeps < max_sub_steps {
            self.internal_step(fixed_dt, hooks);
            self.accumulator -= fixed_dt;
            substeps += 1;
        }
        // Drop whole steps we could not afford this frame
        self.accumulator %= fixed_dt;

        substeps
    }

    fn time(&self) -> f64 {
        self.time
    }
}
