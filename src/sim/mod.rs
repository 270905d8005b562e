//! Gameplay logic
//!
//! Everything here talks to the outside world only through the
//! [`Simulation`](crate::physics::Simulation) and
//! [`VisualSurface`](crate::scene::VisualSurface) traits:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (layout order, then handle order)
//! - No platform dependencies

pub mod assembly;
pub mod cohesion;
pub mod frame;
pub mod layout;
pub mod reveal;
pub mod state;

pub use assembly::{instantiate_boxes, instantiate_fill_spheres, release_all};
pub use cohesion::{Cohesion, CohesionConstraint};
pub use frame::{
    FrameLoop, FrameReport, NextRoundTimer, RESULT_DISPLAY_SECS, RoundHooks, RoundSummary,
    play_round,
};
pub use layout::{LayoutCell, generate_layout, generate_wall_layout};
pub use reveal::RevealCoordinator;
pub use state::{GameEvent, GuessOutcome, PairedEntity, Projectile, RoundPhase, RoundState};
