//! Round state and the types shared by the gameplay modules
//!
//! Everything a round owns lives in [`RoundState`], which the reveal
//! coordinator holds; nothing is kept in statics, so independent rounds
//! (and tests) never share state.

use serde::{Deserialize, Serialize};

use super::cohesion::Cohesion;
use crate::audio::HitCue;
use crate::physics::{BodyHandle, CollideSubscription};
use crate::scene::ProxyHandle;

/// Phase of the current round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Wall standing and held together, fill spheres hidden, no projectile
    Intact,
    /// Projectile in flight, waiting for it to touch a brick
    Collapsing,
    /// Fill spheres released, waiting for the player's guess
    Revealed,
    /// Previous round being torn down
    Resetting,
}

/// A simulated body and the proxy that mirrors it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairedEntity {
    pub proxy: ProxyHandle,
    pub body: BodyHandle,
    /// Collision listener attached to the body, released with it
    pub listener: Option<CollideSubscription>,
}

impl PairedEntity {
    pub fn new(proxy: ProxyHandle, body: BodyHandle) -> Self {
        Self {
            proxy,
            body,
            listener: None,
        }
    }
}

/// The launched ball and its two listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Projectile {
    pub entity: PairedEntity,
    /// One-shot collapse detector; `None` once it has fired
    pub reveal_sub: Option<CollideSubscription>,
    /// Hit-sound listener, lives as long as the ball
    pub sound_sub: CollideSubscription,
}

/// Result of a guess
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuessOutcome {
    Correct,
    Incorrect,
}

/// Notifications for the UI and audio layers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// A fresh wall is standing
    RoundStarted { round: u32 },
    /// Projectile launched along this lane
    Launched { lane_x: f32 },
    /// The wall broke and the fill spheres are out
    RoundRevealed { color_index: usize },
    Guessed {
        color_index: usize,
        outcome: GuessOutcome,
    },
    HitSound(HitCue),
}

/// Everything one round owns
#[derive(Debug)]
pub struct RoundState {
    pub phase: RoundPhase,
    /// Rounds started so far, 1-based
    pub round: u32,
    /// Wall bricks in layout order
    pub boxes: Vec<PairedEntity>,
    /// Hidden fill spheres in grid order
    pub spheres: Vec<PairedEntity>,
    pub projectile: Option<Projectile>,
    pub cohesion: Cohesion,
    /// Palette index drawn for this round's spheres
    pub color_index: usize,
    /// Set exactly once, by the collapse transition
    pub revealed_color: Option<usize>,
    /// Whether the player has already guessed this round
    pub guessed: bool,
}

impl RoundState {
    pub fn new() -> Self {
        Self {
            phase: RoundPhase::Resetting,
            round: 0,
            boxes: Vec::new(),
            spheres: Vec::new(),
            projectile: None,
            cohesion: Cohesion::default(),
            color_index: 0,
            revealed_color: None,
            guessed: false,
        }
    }

    /// Whether `body` is one of this round's wall bricks
    pub fn is_box(&self, body: BodyHandle) -> bool {
        self.boxes.iter().any(|e| e.body == body)
    }

    /// Every paired entity the frame loop mirrors, boxes first
    pub fn tracked(&self) -> impl Iterator<Item = &PairedEntity> {
        self.boxes
            .iter()
            .chain(self.spheres.iter())
            .chain(self.projectile.as_ref().map(|p| &p.entity))
    }
}

impl Default for RoundState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32) -> PairedEntity {
        PairedEntity::new(ProxyHandle(id), BodyHandle(id))
    }

    #[test]
    fn test_is_box_matches_identity() {
        let mut state = RoundState::new();
        state.boxes = vec![entity(1), entity(2)];
        state.spheres = vec![entity(3)];
        assert!(state.is_box(BodyHandle(2)));
        assert!(!state.is_box(BodyHandle(3)));
        assert!(!state.is_box(BodyHandle(99)));
    }

    #[test]
    fn test_tracked_order() {
        let mut state = RoundState::new();
        state.boxes = vec![entity(1)];
        state.spheres = vec![entity(2), entity(3)];
        state.projectile = Some(Projectile {
            entity: entity(4),
            reveal_sub: None,
            sound_sub: CollideSubscription(1),
        });
        let bodies: Vec<u32> = state.tracked().map(|e| e.body.0).collect();
        assert_eq!(bodies, vec![1, 2, 3, 4]);
    }
}
