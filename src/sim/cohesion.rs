//! Synthetic cohesion between wall bricks
//!
//! Every pair of bricks is joined by a zero-length damped spring, so the
//! wall behaves as one loosely cohesive lump until the projectile breaks
//! it. The pair count is quadratic in the brick count; walls stay in the
//! tens to low hundreds of bricks.
//!
//! The set is either empty or complete. The post-step hook that applies the
//! forces is registered with the set and removed before it is cleared.

use glam::Vec3;

use super::state::PairedEntity;
use crate::physics::{BodyHandle, BodyState, PostStepSubscription, Simulation};

/// Spring between two brick centres
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CohesionConstraint {
    pub body_a: BodyHandle,
    pub body_b: BodyHandle,
    pub rest_length: f32,
    pub stiffness: f32,
    pub damping: f32,
}

impl CohesionConstraint {
    /// Force on `body_b` (the negation acts on `body_a`)
    ///
    /// `None` when the centres coincide and there is no direction to pull.
    pub fn force(&self, a: &BodyState, b: &BodyState) -> Option<Vec3> {
        let r = b.position - a.position;
        let len = r.length();
        if len <= f32::EPSILON {
            return None;
        }
        let dir = r / len;
        let approach = (b.velocity - a.velocity).dot(dir);
        let magnitude = -self.stiffness * (len - self.rest_length) - self.damping * approach;
        Some(dir * magnitude)
    }
}

/// The active constraint set and its force hook
#[derive(Debug, Default)]
pub struct Cohesion {
    constraints: Vec<CohesionConstraint>,
    hook: Option<PostStepSubscription>,
}

impl Cohesion {
    /// Join every unordered pair of `boxes` and start applying forces
    ///
    /// An existing set is torn down first.
    pub fn build(
        &mut self,
        sim: &mut dyn Simulation,
        boxes: &[PairedEntity],
        stiffness: f32,
        damping: f32,
    ) {
        self.teardown(sim);

        let n = boxes.len();
        self.constraints.reserve(n * n.saturating_sub(1) / 2);
        for (i, a) in boxes.iter().enumerate() {
            for b in &boxes[i + 1..] {
                self.constraints.push(CohesionConstraint {
                    body_a: a.body,
                    body_b: b.body,
                    rest_length: 0.0,
                    stiffness,
                    damping,
                });
            }
        }
        self.hook = Some(sim.on_post_step());

        log::debug!("Cohesion built: {} bricks, {} pairs", n, self.constraints.len());
    }

    /// Push every constraint's force onto its two bodies
    pub fn apply(&self, sim: &mut dyn Simulation) {
        if self.hook.is_none() {
            return;
        }
        for c in &self.constraints {
            let (Some(a), Some(b)) = (sim.body_state(c.body_a), sim.body_state(c.body_b)) else {
                continue;
            };
            if let Some(f) = c.force(&a, &b) {
                sim.apply_force(c.body_a, -f);
                sim.apply_force(c.body_b, f);
            }
        }
    }

    /// Stop applying forces and drop every constraint; no-op when empty
    pub fn teardown(&mut self, sim: &mut dyn Simulation) {
        if let Some(hook) = self.hook.take() {
            sim.off_post_step(hook);
        }
        self.constraints.clear();
    }

    pub fn len(&self) -> usize {
        self.constraints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    /// Whether the force hook is registered
    pub fn is_active(&self) -> bool {
        self.hook.is_some()
    }

    pub fn hook(&self) -> Option<PostStepSubscription> {
        self.hook
    }

    pub fn constraints(&self) -> &[CohesionConstraint] {
        &self.constraints
    }
}
