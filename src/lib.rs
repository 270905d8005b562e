//! Brick Reveal - knock down a wall of boxes, guess the hidden color
//!
//! Core modules:
//! - `physics`: Rigid-body simulation interface and the built-in world
//! - `scene`: Visual surface interface (headless recorder, browser canvas)
//! - `sim`: Wall construction, cohesion, reveal state machine, frame loop
//! - `audio`: Hit-sound selection and throttling
//! - `scoreboard`: Guess streak tracking for the UI
//! - `tuning`: Data-driven gameplay constants
//! - `settings`: Player preferences

pub mod audio;
pub mod physics;
pub mod scene;
pub mod scoreboard;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use scoreboard::Scoreboard;
pub use settings::Settings;
pub use tuning::{GameTuning, TuningError};

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 3;
    /// Longest frame delta fed to the simulation (tab switches, debugger pauses)
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// World gravity (m/s², +Y up)
    pub const GRAVITY: f32 = -9.82;

    /// Floor extents (the launch lane spans the floor width)
    pub const FLOOR_WIDTH: f32 = 20.0;
    pub const FLOOR_DEPTH: f32 = 20.0;
    /// The floor's top face is y = 0; the slab extends below it
    pub const FLOOR_HALF_THICKNESS: f32 = 0.5;

    /// Contact material
    pub const FRICTION: f32 = 0.2;
    pub const RESTITUTION: f32 = 0.5;

    /// Minimum approach speed for a hit to be audible
    pub const HIT_SOUND_THRESHOLD: f32 = 1.5;
    /// Cooldown between hit sounds of the same kind (seconds)
    pub const HIT_SOUND_COOLDOWN: f64 = 0.030;
}

/// Map a pointer x coordinate on the canvas to a launch lane on the floor
///
/// The left canvas edge maps to `-floor_width / 2`, the right edge to
/// `+floor_width / 2`.
#[inline]
pub fn pointer_to_lane(pointer_x: f32, canvas_width: f32, floor_width: f32) -> f32 {
    if canvas_width <= 0.0 {
        return 0.0;
    }
    pointer_x * floor_width / canvas_width - floor_width / 2.0
}

/// Parse a `#rrggbb` hex color into linear-ish 0..1 RGB components
pub fn hex_to_rgb(hex: &str) -> Option<[f32; 3]> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| {
        u8::from_str_radix(&hex[i..i + 2], 16)
            .ok()
            .map(|v| v as f32 / 255.0)
    };
    Some([channel(0)?, channel(2)?, channel(4)?])
}
