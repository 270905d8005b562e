//! Data-driven gameplay constants
//!
//! Defaults reproduce the shipped game. Any subset can be overridden from
//! JSON; missing fields keep their defaults.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::consts::*;
use crate::hex_to_rgb;
use crate::physics::world::WorldConfig;

/// Errors from loading or validating tuning data
#[derive(Debug, Error)]
pub enum TuningError {
    #[error("invalid tuning JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("wall segment {index} has zero rows or columns")]
    EmptySegment { index: usize },

    #[error("box size must be positive, got {0:?}")]
    InvalidBoxSize(Vec3),

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f32 },

    #[error("palette must contain at least one color")]
    EmptyPalette,

    #[error("palette color {name:?} has invalid hex value {hex:?}")]
    InvalidColor { name: String, hex: String },
}

/// Result type for tuning operations
pub type TuningResult<T> = std::result::Result<T, TuningError>;

/// One rectangular block of bricks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WallSegment {
    pub rows: u32,
    pub cols: u32,
    /// Bottom-centre of the segment
    pub anchor: Vec3,
}

impl WallSegment {
    pub const fn new(rows: u32, cols: u32, anchor: Vec3) -> Self {
        Self { rows, cols, anchor }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallTuning {
    /// Brick dimensions (also the layout cell size)
    pub box_size: Vec3,
    pub box_mass: f32,
    /// Segments laid out in order, front wall first
    pub segments: Vec<WallSegment>,
    /// Bricks to instantiate (truncated to the layout length)
    pub box_count: usize,
}

impl Default for WallTuning {
    fn default() -> Self {
        let d = 0.5;
        Self {
            box_size: Vec3::splat(d),
            box_mass: 1.0,
            segments: vec![
                WallSegment::new(4, 5, Vec3::ZERO),
                WallSegment::new(4, 5, Vec3::new(0.0, 0.0, -3.0 * d)),
                WallSegment::new(4, 1, Vec3::new(-2.0 * d, 0.0, -d)),
                WallSegment::new(4, 1, Vec3::new(-2.0 * d, 0.0, -2.0 * d)),
                WallSegment::new(4, 1, Vec3::new(2.0 * d, 0.0, -d)),
                WallSegment::new(4, 1, Vec3::new(2.0 * d, 0.0, -2.0 * d)),
            ],
            box_count: 56,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CohesionTuning {
    pub stiffness: f32,
    pub damping: f32,
}

impl Default for CohesionTuning {
    fn default() -> Self {
        Self {
            stiffness: 0.1,
            damping: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillTuning {
    /// Spheres along x, y, z
    pub counts: [u32; 3],
    pub radius: f32,
    pub mass: f32,
    /// Depth offset of the grid behind the front wall
    pub shift_z: f32,
    /// Every n-th sphere carries a hit-sound listener
    pub sound_every: u32,
}

impl Default for FillTuning {
    fn default() -> Self {
        Self {
            counts: [5, 6, 3],
            radius: 0.15,
            mass: 0.1,
            shift_z: -0.9,
            sound_every: 5,
        }
    }
}

impl FillTuning {
    pub fn total(&self) -> usize {
        self.counts.iter().map(|&c| c as usize).product()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectileTuning {
    pub radius: f32,
    pub mass: f32,
    pub launch_height: f32,
    pub launch_z: f32,
    /// Impulse magnitude along the ball's local -Z
    pub impulse: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            radius: 0.7,
            mass: 50.0,
            launch_height: 0.9,
            launch_z: 5.0,
            impulse: 1000.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsTuning {
    pub gravity: f32,
    pub friction: f32,
    pub restitution: f32,
    pub solver_iterations: u32,
}

impl Default for PhysicsTuning {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            friction: FRICTION,
            restitution: RESTITUTION,
            solver_iterations: 10,
        }
    }
}

/// Named round color
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaletteColor {
    pub name: String,
    /// `#rrggbb`
    pub hex: String,
}

impl PaletteColor {
    fn new(name: &str, hex: &str) -> Self {
        Self {
            name: name.to_string(),
            hex: hex.to_string(),
        }
    }

    /// Components in 0..1; magenta if the hex is malformed
    pub fn rgb(&self) -> [f32; 3] {
        hex_to_rgb(&self.hex).unwrap_or([1.0, 0.0, 1.0])
    }
}

/// All gameplay tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameTuning {
    pub wall: WallTuning,
    pub cohesion: CohesionTuning,
    pub fill: FillTuning,
    pub projectile: ProjectileTuning,
    pub physics: PhysicsTuning,
    pub palette: Vec<PaletteColor>,
    /// Cooldown between hit sounds of one kind (seconds)
    pub sound_cooldown: f64,
}

impl Default for GameTuning {
    fn default() -> Self {
        Self {
            wall: WallTuning::default(),
            cohesion: CohesionTuning::default(),
            fill: FillTuning::default(),
            projectile: ProjectileTuning::default(),
            physics: PhysicsTuning::default(),
            palette: vec![
                PaletteColor::new("green", "#18f000"),
                PaletteColor::new("pink", "#FFC0CB"),
                PaletteColor::new("blue", "#007FFF"),
            ],
            sound_cooldown: HIT_SOUND_COOLDOWN,
        }
    }
}

impl GameTuning {
    /// Parse and validate tuning JSON
    pub fn from_json(json: &str) -> TuningResult<Self> {
        let tuning: Self = serde_json::from_str(json)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Reject values the game cannot run with
    pub fn validate(&self) -> TuningResult<()> {
        for (index, segment) in self.wall.segments.iter().enumerate() {
            if segment.rows == 0 || segment.cols == 0 {
                return Err(TuningError::EmptySegment { index });
            }
        }
        if self.wall.box_size.min_element() <= 0.0 {
            return Err(TuningError::InvalidBoxSize(self.wall.box_size));
        }

        let positive = [
            ("wall.box_mass", self.wall.box_mass),
            ("fill.radius", self.fill.radius),
            ("fill.mass", self.fill.mass),
            ("projectile.radius", self.projectile.radius),
            ("projectile.mass", self.projectile.mass),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(TuningError::NonPositive { field, value });
            }
        }

        if self.palette.is_empty() {
            return Err(TuningError::EmptyPalette);
        }
        if let Some(bad) = self.palette.iter().find(|c| hex_to_rgb(&c.hex).is_none()) {
            return Err(TuningError::InvalidColor {
                name: bad.name.clone(),
                hex: bad.hex.clone(),
            });
        }
        Ok(())
    }

    pub fn world_config(&self) -> WorldConfig {
        WorldConfig {
            gravity: Vec3::new(0.0, self.physics.gravity, 0.0),
            friction: self.physics.friction,
            restitution: self.physics.restitution,
            solver_iterations: self.physics.solver_iterations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let tuning = GameTuning::default();
        tuning.validate().unwrap();
        assert_eq!(tuning.fill.total(), 90);
        let cells: u32 = tuning.wall.segments.iter().map(|s| s.rows * s.cols).sum();
        assert_eq!(cells as usize, tuning.wall.box_count);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let tuning =
            GameTuning::from_json(r#"{ "cohesion": { "stiffness": 0.5 }, "sound_cooldown": 0.1 }"#)
                .unwrap();
        assert_eq!(tuning.cohesion.stiffness, 0.5);
        assert_eq!(tuning.cohesion.damping, 0.01);
        assert_eq!(tuning.sound_cooldown, 0.1);
        assert_eq!(tuning.wall, WallTuning::default());
    }

    #[test]
    fn test_malformed_json() {
        let err = GameTuning::from_json("{ not json").unwrap_err();
        assert!(matches!(err, TuningError::Parse(_)));
        assert!(format!("{err}").starts_with("invalid tuning JSON"));
    }

    #[test]
    fn test_rejects_empty_segment() {
        let mut tuning = GameTuning::default();
        tuning.wall.segments[2].cols = 0;
        let err = tuning.validate().unwrap_err();
        assert!(matches!(err, TuningError::EmptySegment { index: 2 }));
    }

    #[test]
    fn test_rejects_bad_palette() {
        let mut tuning = GameTuning::default();
        tuning.palette.push(PaletteColor::new("mud", "brown"));
        let err = tuning.validate().unwrap_err();
        assert_eq!(
            format!("{err}"),
            "palette color \"mud\" has invalid hex value \"brown\""
        );

        tuning.palette.clear();
        assert!(matches!(tuning.validate(), Err(TuningError::EmptyPalette)));
    }

    #[test]
    fn test_rejects_non_positive_mass() {
        let mut tuning = GameTuning::default();
        tuning.projectile.mass = 0.0;
        let err = tuning.validate().unwrap_err();
        assert!(format!("{err}").contains("projectile.mass"));
    }
}
