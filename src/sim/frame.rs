//! Per-frame orchestration
//!
//! One tick: measure the frame delta, step the simulation at the fixed rate
//! (collision and post-step callbacks run inside the step), mirror bodies
//! onto proxies, refresh the debug overlay, advance camera controls and
//! render. Scheduling the next tick is the platform's job.

use super::reveal::RevealCoordinator;
use super::state::{GameEvent, GuessOutcome, RoundPhase};
use crate::consts::*;
use crate::physics::{
    CollideSubscription, CollisionEvent, PostStepSubscription, Simulation, StepHooks,
};
use crate::scene::VisualSurface;

/// Forwards simulation callbacks to the coordinator
pub struct RoundHooks<'a> {
    pub coordinator: &'a mut RevealCoordinator,
    pub surface: &'a mut dyn VisualSurface,
}

impl StepHooks for RoundHooks<'_> {
    fn on_collide(
        &mut self,
        sim: &mut dyn Simulation,
        subscription: CollideSubscription,
        event: &CollisionEvent,
    ) {
        self.coordinator
            .handle_collision(sim, self.surface, subscription, event);
    }

    fn on_post_step(&mut self, sim: &mut dyn Simulation, subscription: PostStepSubscription) {
        self.coordinator.handle_post_step(sim, subscription);
    }
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    /// Fixed steps taken
    pub substeps: u32,
    /// Proxies updated from their bodies
    pub synced: usize,
}

/// Frame timing and per-frame toggles
#[derive(Debug, Default)]
pub struct FrameLoop {
    /// Timestamp of the previous tick (seconds)
    previous: Option<f64>,
    pub debug_overlay: bool,
}

impl FrameLoop {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one frame at wall-clock time `now` (seconds)
    ///
    /// The first tick only records the timestamp and steps nothing.
    pub fn tick(
        &mut self,
        now: f64,
        coordinator: &mut RevealCoordinator,
        sim: &mut dyn Simulation,
        surface: &mut dyn VisualSurface,
    ) -> FrameReport {
        let delta = self
            .previous
            .map(|prev| (now - prev).max(0.0) as f32)
            .unwrap_or(0.0);
        self.previous = Some(now);

        let substeps = {
            let mut hooks = RoundHooks {
                coordinator: &mut *coordinator,
                surface: &mut *surface,
            };
            sim.step(SIM_DT, delta, MAX_SUBSTEPS, &mut hooks)
        };

        let synced = coordinator.sync_visuals(&*sim, surface);
        surface.update_debug_overlay(self.debug_overlay);
        surface.update_controls(delta);
        surface.render();

        FrameReport { substeps, synced }
    }
}

/// How long a guess result stays up before the next wall is built (seconds)
pub const RESULT_DISPLAY_SECS: f64 = 1.0;

/// Delayed start of the next round after a guess
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NextRoundTimer {
    due: Option<f64>,
}

impl NextRoundTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the countdown at `now`; an earlier pending countdown is replaced
    pub fn schedule(&mut self, now: f64) {
        self.due = Some(now + RESULT_DISPLAY_SECS);
    }

    pub fn cancel(&mut self) {
        self.due = None;
    }

    pub fn is_pending(&self) -> bool {
        self.due.is_some()
    }

    /// True exactly once, on the first call at or after the due time
    pub fn fire(&mut self, now: f64) -> bool {
        match self.due {
            Some(due) if now >= due => {
                self.due = None;
                true
            }
            _ => false,
        }
    }
}

/// Outcome of [`play_round`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundSummary {
    /// Frames ticked before the reveal (or the frame limit)
    pub frames: u32,
    pub revealed: bool,
    /// Hit-sound cues emitted along the way
    pub hit_sounds: usize,
    /// Result of the guess, if the wall broke
    pub outcome: Option<GuessOutcome>,
}

/// Launch at `lane_x`, tick at the fixed rate until the wall breaks or
/// `max_frames` pass, then guess `guess`
pub fn play_round(
    frames: &mut FrameLoop,
    coordinator: &mut RevealCoordinator,
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    lane_x: f32,
    max_frames: u32,
    guess: usize,
) -> RoundSummary {
    coordinator.launch(sim, surface, lane_x);

    let start = sim.time();
    let mut summary = RoundSummary {
        frames: 0,
        revealed: false,
        hit_sounds: 0,
        outcome: None,
    };
    frames.tick(start, coordinator, sim, surface);
    while summary.frames < max_frames {
        summary.frames += 1;
        // Nudge past the step boundary so each tick takes exactly one step
        let now = start + summary.frames as f64 * SIM_DT as f64 + 1e-4;
        frames.tick(now, coordinator, sim, surface);
        summary.hit_sounds += coordinator
            .drain_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::HitSound(_)))
            .count();
        if coordinator.phase() == RoundPhase::Revealed {
            summary.revealed = true;
            break;
        }
    }

    if summary.revealed {
        summary.outcome = coordinator.guess(guess);
    }
    summary
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::physics::World;
    use crate::scene::HeadlessSurface;
    use crate::sim::RoundPhase;
    use crate::tuning::{GameTuning, WallSegment};

    fn setup() -> (World, HeadlessSurface, RevealCoordinator) {
        let mut tuning = GameTuning::default();
        tuning.wall.segments = vec![WallSegment::new(1, 2, Vec3::ZERO)];
        tuning.wall.box_count = 2;
        let mut world = World::new(tuning.world_config());
        let mut surface = HeadlessSurface::new();
        let coordinator = RevealCoordinator::new(tuning, 1, &mut world, &mut surface);
        (world, surface, coordinator)
    }

    #[test]
    fn test_first_tick_only_renders() {
        let (mut world, mut surface, mut coordinator) = setup();
        let mut frames = FrameLoop::new();

        let report = frames.tick(10.0, &mut coordinator, &mut world, &mut surface);
        assert_eq!(report.substeps, 0);
        assert_eq!(surface.frames_rendered, 1);
        assert_eq!(world.time(), 0.0);
    }

    #[test]
    fn test_ticks_step_and_sync() {
        let (mut world, mut surface, mut coordinator) = setup();
        let mut frames = FrameLoop::new();
        frames.debug_overlay = true;

        frames.tick(0.0, &mut coordinator, &mut world, &mut surface);
        let report = frames.tick(1.0 / 60.0 + 1e-4, &mut coordinator, &mut world, &mut surface);
        assert_eq!(report.substeps, 1);
        // Two bricks plus 90 hidden spheres
        assert_eq!(report.synced, 92);
        assert!(surface.debug_overlay);

        // A long stall is capped
        let report = frames.tick(5.0, &mut coordinator, &mut world, &mut surface);
        assert_eq!(report.substeps, MAX_SUBSTEPS);
    }

    #[test]
    fn test_proxies_follow_falling_projectile() {
        let (mut world, mut surface, mut coordinator) = setup();
        let mut frames = FrameLoop::new();
        coordinator.launch(&mut world, &mut surface, 8.0);
        let projectile = coordinator.state().projectile.unwrap();

        frames.tick(0.0, &mut coordinator, &mut world, &mut surface);
        for i in 1..=10 {
            frames.tick(i as f64 / 60.0 + 1e-4, &mut coordinator, &mut world, &mut surface);
        }
        let body = world.body_state(projectile.entity.body).unwrap();
        let proxy = surface.proxy(projectile.entity.proxy).unwrap();
        assert_eq!(proxy.position, body.position);
        assert!(body.position.z < 5.0);
        // Launched well clear of the wall
        assert_eq!(coordinator.phase(), RoundPhase::Collapsing);
    }

    #[test]
    fn test_next_round_timer_fires_once() {
        let mut timer = NextRoundTimer::new();
        assert!(!timer.fire(100.0));

        timer.schedule(10.0);
        assert!(timer.is_pending());
        assert!(!timer.fire(10.5));
        assert!(timer.fire(10.0 + RESULT_DISPLAY_SECS));
        assert!(!timer.fire(20.0));

        timer.schedule(30.0);
        timer.cancel();
        assert!(!timer.fire(40.0));
    }

    #[test]
    fn test_guess_leaves_round_revealed() {
        let mut tuning = GameTuning::default();
        tuning.wall.segments = vec![WallSegment::new(2, 5, Vec3::ZERO)];
        tuning.wall.box_count = 10;
        let mut world = World::new(tuning.world_config());
        let mut surface = HeadlessSurface::new();
        let mut coordinator = RevealCoordinator::new(tuning, 4, &mut world, &mut surface);
        let mut frames = FrameLoop::new();

        let color = coordinator.state().color_index;
        let summary = play_round(
            &mut frames,
            &mut coordinator,
            &mut world,
            &mut surface,
            0.0,
            180,
            color,
        );
        assert!(summary.revealed);
        assert_eq!(summary.outcome, Some(GuessOutcome::Correct));
        // The result stays on screen with the spheres until the next round is asked for
        assert_eq!(coordinator.phase(), RoundPhase::Revealed);
        assert_eq!(coordinator.state().round, 1);
        assert!(
            coordinator
                .drain_events()
                .iter()
                .all(|e| !matches!(e, GameEvent::RoundStarted { .. }))
        );
    }
}
