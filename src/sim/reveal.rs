//! Round state machine
//!
//! `Intact → Collapsing → Revealed → Resetting → Intact`. The player's
//! launch starts the collapse; the projectile's first contact with a brick
//! reveals the fill spheres; a next-round request tears everything down and
//! builds a fresh wall before returning.
//!
//! Collision and post-step callbacks arrive through [`handle_collision`]
//! and [`handle_post_step`], synchronously from inside a simulation step.
//! Each finishes its transition before returning, so the frame's visual
//! sync never sees a half-updated round.
//!
//! [`handle_collision`]: RevealCoordinator::handle_collision
//! [`handle_post_step`]: RevealCoordinator::handle_post_step

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::assembly::{
    activate, instantiate_boxes, instantiate_fill_spheres, release, release_all, spawn,
};
use super::layout::generate_layout;
use super::state::{GameEvent, GuessOutcome, PairedEntity, Projectile, RoundPhase, RoundState};
use crate::audio::{HitSound, HitSoundPlanner};
use crate::consts::*;
use crate::physics::{
    BodyDesc, BodyHandle, CollideSubscription, CollisionEvent, PostStepSubscription, Shape,
    Simulation,
};
use crate::scene::{Material, ProxyShape, VisualSurface};
use crate::tuning::GameTuning;

pub struct RevealCoordinator {
    tuning: GameTuning,
    rng: Pcg32,
    /// Persists across rounds; never part of the box collection
    floor: PairedEntity,
    state: RoundState,
    sounds: HitSoundPlanner,
    events: Vec<GameEvent>,
}

impl RevealCoordinator {
    /// Lay the floor and build the first round
    pub fn new(
        tuning: GameTuning,
        seed: u64,
        sim: &mut dyn Simulation,
        surface: &mut dyn VisualSurface,
    ) -> Self {
        let floor = create_floor(sim, surface);
        let sounds = HitSoundPlanner::new(tuning.sound_cooldown);
        let mut coordinator = Self {
            tuning,
            rng: Pcg32::seed_from_u64(seed),
            floor,
            state: RoundState::new(),
            sounds,
            events: Vec::new(),
        };
        coordinator.build_round(sim, surface);
        coordinator
    }

    pub fn state(&self) -> &RoundState {
        &self.state
    }

    pub fn phase(&self) -> RoundPhase {
        self.state.phase
    }

    pub fn tuning(&self) -> &GameTuning {
        &self.tuning
    }

    pub fn floor(&self) -> &PairedEntity {
        &self.floor
    }

    /// Take the notifications queued since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Fire the projectile down `lane_x`; only accepted while `Intact`
    pub fn launch(
        &mut self,
        sim: &mut dyn Simulation,
        surface: &mut dyn VisualSurface,
        lane_x: f32,
    ) -> bool {
        if self.state.phase != RoundPhase::Intact {
            log::debug!("Launch ignored in {:?}", self.state.phase);
            return false;
        }

        let p = self.tuning.projectile;
        let entity = spawn(
            sim,
            surface,
            BodyDesc {
                mass: p.mass,
                position: Vec3::new(lane_x, p.launch_height, p.launch_z),
                shape: Shape::Sphere { radius: p.radius },
            },
            Material::Projectile,
        );
        sim.apply_local_impulse(entity.body, Vec3::new(0.0, 0.0, -p.impulse), Vec3::ZERO);
        activate(sim, surface, &entity);

        self.state.projectile = Some(Projectile {
            entity,
            reveal_sub: Some(sim.on_collide(entity.body)),
            sound_sub: sim.on_collide(entity.body),
        });
        self.state.phase = RoundPhase::Collapsing;
        self.events.push(GameEvent::Launched { lane_x });
        log::info!("Round {}: projectile launched at x={:.2}", self.state.round, lane_x);
        true
    }

    /// Route a collision delivered by the simulation
    pub fn handle_collision(
        &mut self,
        sim: &mut dyn Simulation,
        surface: &mut dyn VisualSurface,
        subscription: CollideSubscription,
        event: &CollisionEvent,
    ) {
        let against_floor = event.other == self.floor.body;

        if let Some(projectile) = self.state.projectile {
            if projectile.reveal_sub == Some(subscription) {
                self.on_projectile_contact(sim, surface, event.other);
                return;
            }
            if projectile.sound_sub == subscription {
                self.plan_sound(HitSound::ProjectileHit, event.impact_velocity, against_floor, sim.time());
                return;
            }
        }

        if self
            .state
            .spheres
            .iter()
            .any(|s| s.listener == Some(subscription))
        {
            self.plan_sound(HitSound::SphereDrop, event.impact_velocity, against_floor, sim.time());
        }
    }

    /// Route a post-step callback; applies cohesion when it is the caller
    pub fn handle_post_step(&mut self, sim: &mut dyn Simulation, subscription: PostStepSubscription) {
        if self.state.cohesion.hook() == Some(subscription) {
            self.state.cohesion.apply(sim);
        }
    }

    /// Compare the player's pick with the revealed color
    ///
    /// Accepted once per round, only after the reveal.
    pub fn guess(&mut self, color_index: usize) -> Option<GuessOutcome> {
        if self.state.phase != RoundPhase::Revealed || self.state.guessed {
            log::debug!("Guess ignored in {:?}", self.state.phase);
            return None;
        }
        let outcome = if self.state.revealed_color == Some(color_index) {
            GuessOutcome::Correct
        } else {
            GuessOutcome::Incorrect
        };
        self.state.guessed = true;
        self.events.push(GameEvent::Guessed {
            color_index,
            outcome,
        });
        log::info!("Round {}: guessed {} -> {:?}", self.state.round, color_index, outcome);
        Some(outcome)
    }

    /// Tear the round down and build the next one before returning
    pub fn next_round(&mut self, sim: &mut dyn Simulation, surface: &mut dyn VisualSurface) -> bool {
        if self.state.phase == RoundPhase::Resetting {
            return false;
        }
        self.state.phase = RoundPhase::Resetting;
        log::info!("Round {}: resetting", self.state.round);

        // Stop the force hook before the bodies it references go away
        self.state.cohesion.teardown(sim);
        release_all(sim, surface, &mut self.state.boxes, &mut self.state.spheres);
        if let Some(projectile) = self.state.projectile.take() {
            release_projectile(sim, surface, &projectile);
        }

        self.sounds.reset();
        self.build_round(sim, surface);
        true
    }

    /// Copy body transforms onto proxies: boxes, spheres, then projectile
    ///
    /// Returns the number of proxies updated.
    pub fn sync_visuals(&self, sim: &dyn Simulation, surface: &mut dyn VisualSurface) -> usize {
        let mut synced = 0;
        for entity in self.state.tracked() {
            if let Some(body) = sim.body_state(entity.body) {
                surface.set_position(entity.proxy, body.position);
                surface.set_orientation(entity.proxy, body.orientation);
                synced += 1;
            }
        }
        synced
    }

    fn build_round(&mut self, sim: &mut dyn Simulation, surface: &mut dyn VisualSurface) {
        let color_index = self.rng.random_range(0..self.tuning.palette.len().max(1));
        let rgb = self
            .tuning
            .palette
            .get(color_index)
            .map(|c| c.rgb())
            .unwrap_or([1.0, 1.0, 1.0]);

        let wall = &self.tuning.wall;
        let layout = generate_layout(&wall.segments, wall.box_size);
        self.state.boxes = instantiate_boxes(
            sim,
            surface,
            &layout,
            wall.box_count,
            wall.box_size,
            wall.box_mass,
        );
        self.state.spheres = instantiate_fill_spheres(sim, surface, &self.tuning.fill, rgb);

        let cohesion = self.tuning.cohesion;
        self.state
            .cohesion
            .build(sim, &self.state.boxes, cohesion.stiffness, cohesion.damping);

        self.state.round += 1;
        self.state.color_index = color_index;
        self.state.revealed_color = None;
        self.state.guessed = false;
        self.state.phase = RoundPhase::Intact;

        self.events.push(GameEvent::RoundStarted {
            round: self.state.round,
        });
        log::info!(
            "Round {}: {} bricks, {} fill spheres",
            self.state.round,
            self.state.boxes.len(),
            self.state.spheres.len()
        );
    }

    fn on_projectile_contact(
        &mut self,
        sim: &mut dyn Simulation,
        surface: &mut dyn VisualSurface,
        other: BodyHandle,
    ) {
        if self.state.phase != RoundPhase::Collapsing || self.state.revealed_color.is_some() {
            log::debug!("Duplicate collapse contact ignored");
            return;
        }
        if !self.state.is_box(other) {
            return;
        }
        self.reveal(sim, surface);
    }

    fn reveal(&mut self, sim: &mut dyn Simulation, surface: &mut dyn VisualSurface) {
        if let Some(sub) = self
            .state
            .projectile
            .as_mut()
            .and_then(|p| p.reveal_sub.take())
        {
            sim.off_collide(sub);
        }
        self.state.cohesion.teardown(sim);
        for sphere in &self.state.spheres {
            activate(sim, surface, sphere);
        }

        let color_index = self.state.color_index;
        self.state.revealed_color = Some(color_index);
        self.state.phase = RoundPhase::Revealed;
        self.events.push(GameEvent::RoundRevealed { color_index });
        log::info!(
            "Round {}: wall collapsed, revealed color {}",
            self.state.round,
            color_index
        );
    }

    fn plan_sound(&mut self, sound: HitSound, impact: f32, against_floor: bool, now: f64) {
        if let Some(cue) = self.sounds.plan(sound, impact, against_floor, now) {
            self.events.push(GameEvent::HitSound(cue));
        }
    }
}

/// Static slab whose top face is the plane y = 0
fn create_floor(sim: &mut dyn Simulation, surface: &mut dyn VisualSurface) -> PairedEntity {
    let body = sim.create_body(BodyDesc {
        mass: 0.0,
        position: Vec3::new(0.0, -FLOOR_HALF_THICKNESS, 0.0),
        shape: Shape::Cuboid {
            half_extents: Vec3::new(
                FLOOR_WIDTH * 0.5,
                FLOOR_HALF_THICKNESS,
                FLOOR_DEPTH * 0.5,
            ),
        },
    });
    let proxy = surface.create_proxy(
        ProxyShape::Plane {
            width: FLOOR_WIDTH,
            depth: FLOOR_DEPTH,
        },
        Material::Floor,
    );
    sim.add_body(body);
    surface.add_to_scene(proxy);
    PairedEntity::new(proxy, body)
}

fn release_projectile(
    sim: &mut dyn Simulation,
    surface: &mut dyn VisualSurface,
    projectile: &Projectile,
) {
    if let Some(sub) = projectile.reveal_sub {
        sim.off_collide(sub);
    }
    sim.off_collide(projectile.sound_sub);
    release(sim, surface, &projectile.entity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::World;
    use crate::scene::HeadlessSurface;
    use crate::tuning::WallSegment;

    fn small_tuning() -> GameTuning {
        let mut tuning = GameTuning::default();
        tuning.wall.segments = vec![WallSegment::new(2, 3, Vec3::ZERO)];
        tuning.wall.box_count = 6;
        tuning
    }

    fn setup() -> (World, HeadlessSurface, RevealCoordinator) {
        let mut world = World::default();
        let mut surface = HeadlessSurface::new();
        let coordinator = RevealCoordinator::new(small_tuning(), 7, &mut world, &mut surface);
        (world, surface, coordinator)
    }

    fn contact(body: BodyHandle, other: BodyHandle, impact: f32) -> CollisionEvent {
        CollisionEvent {
            body,
            other,
            impact_velocity: impact,
        }
    }

    #[test]
    fn test_first_round_is_intact() {
        let (world, surface, mut coordinator) = setup();
        assert_eq!(coordinator.phase(), RoundPhase::Intact);
        assert_eq!(coordinator.state().round, 1);
        assert_eq!(coordinator.state().boxes.len(), 6);
        assert_eq!(coordinator.state().cohesion.len(), 15);
        // Floor plus bricks; spheres stay out until the reveal
        assert_eq!(world.body_count(), 7);
        assert_eq!(surface.scene_count(), 7);
        assert!(coordinator.state().color_index < 3);
        assert_eq!(
            coordinator.drain_events(),
            vec![GameEvent::RoundStarted { round: 1 }]
        );
    }

    #[test]
    fn test_same_seed_same_colors() {
        let colors = |seed| {
            let mut world = World::default();
            let mut surface = HeadlessSurface::new();
            let mut c = RevealCoordinator::new(small_tuning(), seed, &mut world, &mut surface);
            (0..5)
                .map(|_| {
                    let color = c.state().color_index;
                    c.next_round(&mut world, &mut surface);
                    color
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(colors(42), colors(42));
    }

    #[test]
    fn test_launch_only_when_intact() {
        let (mut world, mut surface, mut coordinator) = setup();
        assert!(coordinator.launch(&mut world, &mut surface, 0.0));
        assert_eq!(coordinator.phase(), RoundPhase::Collapsing);
        assert!(!coordinator.launch(&mut world, &mut surface, 1.0));

        let projectile = coordinator.state().projectile.unwrap();
        let state = world.body_state(projectile.entity.body).unwrap();
        assert_eq!(state.position, Vec3::new(0.0, 0.9, 5.0));
        assert!((state.velocity.z - (-20.0)).abs() < 1e-4);
        assert!(world.contains_body(projectile.entity.body));
    }

    #[test]
    fn test_floor_contact_does_not_reveal() {
        let (mut world, mut surface, mut coordinator) = setup();
        coordinator.launch(&mut world, &mut surface, 0.0);
        let projectile = coordinator.state().projectile.unwrap();
        let floor = coordinator.floor().body;

        coordinator.handle_collision(
            &mut world,
            &mut surface,
            projectile.reveal_sub.unwrap(),
            &contact(projectile.entity.body, floor, 3.0),
        );
        assert_eq!(coordinator.phase(), RoundPhase::Collapsing);
        assert!(coordinator.state().projectile.unwrap().reveal_sub.is_some());
    }

    #[test]
    fn test_brick_contact_reveals_once() {
        let (mut world, mut surface, mut coordinator) = setup();
        coordinator.launch(&mut world, &mut surface, 0.0);
        coordinator.drain_events();
        let projectile = coordinator.state().projectile.unwrap();
        let reveal_sub = projectile.reveal_sub.unwrap();
        let brick = coordinator.state().boxes[2].body;
        let event = contact(projectile.entity.body, brick, 20.0);

        coordinator.handle_collision(&mut world, &mut surface, reveal_sub, &event);
        coordinator.handle_collision(&mut world, &mut surface, reveal_sub, &event);

        assert_eq!(coordinator.phase(), RoundPhase::Revealed);
        assert!(coordinator.state().cohesion.is_empty());
        assert_eq!(world.post_step_subscription_count(), 0);
        assert!(coordinator.state().projectile.unwrap().reveal_sub.is_none());
        assert!(
            coordinator
                .state()
                .spheres
                .iter()
                .all(|s| world.contains_body(s.body))
        );
        let reveals = coordinator
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, GameEvent::RoundRevealed { .. }))
            .count();
        assert_eq!(reveals, 1);
    }

    #[test]
    fn test_guess_once_after_reveal() {
        let (mut world, mut surface, mut coordinator) = setup();
        assert_eq!(coordinator.guess(0), None);

        coordinator.launch(&mut world, &mut surface, 0.0);
        let projectile = coordinator.state().projectile.unwrap();
        let brick = coordinator.state().boxes[0].body;
        coordinator.handle_collision(
            &mut world,
            &mut surface,
            projectile.reveal_sub.unwrap(),
            &contact(projectile.entity.body, brick, 5.0),
        );

        let color = coordinator.state().color_index;
        assert_eq!(coordinator.guess(color), Some(GuessOutcome::Correct));
        assert_eq!(coordinator.guess(color), None);
    }

    #[test]
    fn test_wrong_guess() {
        let (mut world, mut surface, mut coordinator) = setup();
        coordinator.launch(&mut world, &mut surface, 0.0);
        let projectile = coordinator.state().projectile.unwrap();
        let brick = coordinator.state().boxes[0].body;
        coordinator.handle_collision(
            &mut world,
            &mut surface,
            projectile.reveal_sub.unwrap(),
            &contact(projectile.entity.body, brick, 5.0),
        );
        let wrong = (coordinator.state().color_index + 1) % 3;
        assert_eq!(coordinator.guess(wrong), Some(GuessOutcome::Incorrect));
    }

    #[test]
    fn test_next_round_releases_everything() {
        let (mut world, mut surface, mut coordinator) = setup();
        coordinator.launch(&mut world, &mut surface, 0.0);
        let projectile = coordinator.state().projectile.unwrap();
        let old_brick = coordinator.state().boxes[0].body;

        assert!(coordinator.next_round(&mut world, &mut surface));
        assert_eq!(coordinator.phase(), RoundPhase::Intact);
        assert_eq!(coordinator.state().round, 2);
        assert!(coordinator.state().projectile.is_none());
        assert!(world.body_state(projectile.entity.body).is_none());
        assert!(world.body_state(old_brick).is_none());
        // Floor + 6 bricks again, and only the new round's listeners
        assert_eq!(world.body_count(), 7);
        assert_eq!(world.collide_subscription_count(), 18);
        assert_eq!(world.post_step_subscription_count(), 1);
        assert_eq!(surface.proxy_count(), 1 + 6 + 90);
    }

    #[test]
    fn test_sphere_drop_sounds_only_on_floor() {
        let (mut world, mut surface, mut coordinator) = setup();
        coordinator.drain_events();
        let sphere = coordinator.state().spheres[0];
        let sub = sphere.listener.unwrap();
        let floor = coordinator.floor().body;
        let neighbour = coordinator.state().spheres[1].body;

        coordinator.handle_collision(&mut world, &mut surface, sub, &contact(sphere.body, neighbour, 4.0));
        assert!(coordinator.drain_events().is_empty());

        coordinator.handle_collision(&mut world, &mut surface, sub, &contact(sphere.body, floor, 4.0));
        let events = coordinator.drain_events();
        assert!(matches!(
            events.as_slice(),
            [GameEvent::HitSound(cue)] if cue.sound == HitSound::SphereDrop
        ));
    }
}
