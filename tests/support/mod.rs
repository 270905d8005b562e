//! Scripted simulation double shared by the integration tests.
//!
//! Bodies never move; each fixed step delivers whatever collisions the test
//! queued, then runs the post-step hooks. It can also mimic a backend that
//! hands out duplicate events for one contact within a step.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};

use glam::{Quat, Vec3};

use brick_reveal::physics::{
    BodyDesc, BodyHandle, BodyState, CollideSubscription, CollisionEvent, PostStepSubscription,
    Simulation, StepHooks,
};

pub struct ScriptedBody {
    pub desc: BodyDesc,
    pub state: BodyState,
    pub in_world: bool,
}

#[derive(Default)]
pub struct ScriptedSim {
    pub bodies: BTreeMap<BodyHandle, ScriptedBody>,
    pub collide_subs: BTreeMap<CollideSubscription, BodyHandle>,
    pub post_step_subs: BTreeSet<PostStepSubscription>,
    /// Collisions delivered on the next fixed step, then cleared
    pub queued: Vec<CollisionEvent>,
    /// Deliver to the listeners snapshotted at step start, even if a
    /// handler unsubscribed them mid-step
    pub stale_delivery: bool,
    /// Number of `apply_force` calls so far
    pub force_calls: usize,
    pub steps: u32,
    next_id: u32,
}

impl ScriptedSim {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a contact between `body` and `other` for the next step
    pub fn queue(&mut self, body: BodyHandle, other: BodyHandle, impact_velocity: f32) {
        self.queued.push(CollisionEvent {
            body,
            other,
            impact_velocity,
        });
    }

    /// Bodies currently in the world
    pub fn world_count(&self) -> usize {
        self.bodies.values().filter(|b| b.in_world).count()
    }

    fn fixed_step(&mut self, hooks: &mut dyn StepHooks) {
        self.steps += 1;

        let events = std::mem::take(&mut self.queued);
        let listeners: Vec<(CollideSubscription, BodyHandle)> =
            self.collide_subs.iter().map(|(s, b)| (*s, *b)).collect();
        for event in &events {
            for (sub, body) in &listeners {
                if *body != event.body {
                    continue;
                }
                if !self.stale_delivery && !self.collide_subs.contains_key(sub) {
                    continue;
                }
                hooks.on_collide(self, *sub, event);
            }
        }

        let post: Vec<PostStepSubscription> = self.post_step_subs.iter().copied().collect();
        for sub in post {
            if self.post_step_subs.contains(&sub) {
                hooks.on_post_step(self, sub);
            }
        }
    }
}

impl Simulation for ScriptedSim {
    fn create_body(&mut self, desc: BodyDesc) -> BodyHandle {
        self.next_id += 1;
        let handle = BodyHandle(self.next_id);
        self.bodies.insert(
            handle,
            ScriptedBody {
                desc,
                state: BodyState {
                    position: desc.position,
                    orientation: Quat::IDENTITY,
                    velocity: Vec3::ZERO,
                    angular_velocity: Vec3::ZERO,
                },
                in_world: false,
            },
        );
        handle
    }

    fn add_body(&mut self, body: BodyHandle) {
        if let Some(b) = self.bodies.get_mut(&body) {
            b.in_world = true;
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        self.bodies.remove(&body);
        self.collide_subs.retain(|_, b| *b != body);
    }

    fn contains_body(&self, body: BodyHandle) -> bool {
        self.bodies.get(&body).is_some_and(|b| b.in_world)
    }

    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.bodies.get(&body).map(|b| b.state)
    }

    fn apply_local_impulse(&mut self, body: BodyHandle, impulse: Vec3, _local_point: Vec3) {
        if let Some(b) = self.bodies.get_mut(&body) {
            if b.desc.mass > 0.0 {
                b.state.velocity += impulse / b.desc.mass;
            }
        }
    }

    fn apply_force(&mut self, _body: BodyHandle, _force: Vec3) {
        self.force_calls += 1;
    }

    fn on_collide(&mut self, body: BodyHandle) -> CollideSubscription {
        self.next_id += 1;
        let sub = CollideSubscription(self.next_id);
        self.collide_subs.insert(sub, body);
        sub
    }

    fn off_collide(&mut self, subscription: CollideSubscription) {
        self.collide_subs.remove(&subscription);
    }

    fn on_post_step(&mut self) -> PostStepSubscription {
        self.next_id += 1;
        let sub = PostStepSubscription(self.next_id);
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
        let n = ((measured_dt / fixed_dt) + 1e-3).floor().max(0.0) as u32;
        let n = n.min(max_sub_steps);
        for _ in 0..n {
            self.fixed_step(hooks);
        }
        n
    }

    fn time(&self) -> f64 {
        self.steps as f64 / 60.0
    }
}
