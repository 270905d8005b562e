//! Hit sounds
//!
//! Deciding *whether* a collision is audible (and how loud) is plain game
//! logic and lives here for every target. Playback is procedural Web Audio,
//! compiled for wasm32 only.

use serde::{Deserialize, Serialize};

use crate::consts::HIT_SOUND_THRESHOLD;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HitSound {
    /// The launched ball strikes something other than the floor
    ProjectileHit,
    /// A fill sphere drops onto the floor
    SphereDrop,
}

impl HitSound {
    /// Volume at full impact strength
    pub fn base_volume(&self) -> f32 {
        match self {
            HitSound::ProjectileHit => 1.0,
            HitSound::SphereDrop => 0.3,
        }
    }
}

/// A sound to play, with its volume before the player's volume settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitCue {
    pub sound: HitSound,
    pub volume: f32,
}

/// Lets one event through per cooldown window
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiter {
    cooldown: f64,
    last_fire: Option<f64>,
}

impl RateLimiter {
    pub fn new(cooldown: f64) -> Self {
        Self {
            cooldown,
            last_fire: None,
        }
    }

    /// True if an event at `now` may fire; records it when it does
    pub fn try_fire(&mut self, now: f64) -> bool {
        match self.last_fire {
            Some(last) if now - last < self.cooldown => false,
            _ => {
                self.last_fire = Some(now);
                true
            }
        }
    }

    /// Forget the last firing
    pub fn reset(&mut self) {
        self.last_fire = None;
    }
}

/// Scale the base volume by impact strength
pub fn hit_volume(impact: f32, base: f32) -> f32 {
    if impact > 7.0 {
        base
    } else if impact > 3.0 && impact < 5.0 {
        base * 0.8
    } else if impact < 3.0 {
        base * 0.2
    } else {
        base
    }
}

/// Whether a contact of this kind makes a sound at all
///
/// Fill spheres are only audible against the floor (not against each
/// other); the projectile is audible against anything but the floor.
pub fn should_play(sound: HitSound, impact: f32, against_floor: bool) -> bool {
    if impact <= HIT_SOUND_THRESHOLD {
        return false;
    }
    match sound {
        HitSound::ProjectileHit => !against_floor,
        HitSound::SphereDrop => against_floor,
    }
}

/// Turns collision reports into throttled sound cues
#[derive(Debug, Clone)]
pub struct HitSoundPlanner {
    projectile: RateLimiter,
    spheres: RateLimiter,
}

impl HitSoundPlanner {
    pub fn new(cooldown: f64) -> Self {
        Self {
            projectile: RateLimiter::new(cooldown),
            spheres: RateLimiter::new(cooldown),
        }
    }

    /// Cue to play for a collision at simulated time `now`, if any
    pub fn plan(&mut self, sound: HitSound, impact: f32, against_floor: bool, now: f64) -> Option<HitCue> {
        if !should_play(sound, impact, against_floor) {
            return None;
        }
        let limiter = match sound {
            HitSound::ProjectileHit => &mut self.projectile,
            HitSound::SphereDrop => &mut self.spheres,
        };
        if !limiter.try_fire(now) {
            return None;
        }
        Some(HitCue {
            sound,
            volume: hit_volume(impact, sound.base_volume()),
        })
    }

    /// Open both windows again
    pub fn reset(&mut self) {
        self.projectile.reset();
        self.spheres.reset();
    }
}

#[cfg(target_arch = "wasm32")]
pub use playback::AudioManager;

#[cfg(target_arch = "wasm32")]
mod playback {
    use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

    use super::{HitCue, HitSound};

    /// Audio manager for the game
    pub struct AudioManager {
        ctx: Option<AudioContext>,
        master_volume: f32,
    }

    impl Default for AudioManager {
        fn default() -> Self {
            Self::new()
        }
    }

    impl AudioManager {
        pub fn new() -> Self {
            // Try to create audio context (may fail if not in secure context)
            let ctx = AudioContext::new().ok();
            if ctx.is_none() {
                log::warn!("Failed to create AudioContext - audio disabled");
            }
            Self {
                ctx,
                master_volume: 0.8,
            }
        }

        /// Set master volume (0.0 - 1.0); zero mutes
        pub fn set_master_volume(&mut self, vol: f32) {
            self.master_volume = vol.clamp(0.0, 1.0);
        }

        pub fn play(&self, cue: HitCue) {
            let vol = cue.volume * self.master_volume;
            if vol <= 0.0 {
                return;
            }

            let Some(ctx) = &self.ctx else { return };

            // Resume context if suspended (browsers require user gesture)
            if ctx.state() == web_sys::AudioContextState::Suspended {
                let _ = ctx.resume();
            }

            match cue.sound {
                HitSound::ProjectileHit => self.play_knock(ctx, vol),
                HitSound::SphereDrop => self.play_click(ctx, vol),
            }
        }

        /// Create an oscillator with gain envelope
        fn create_osc(
            &self,
            ctx: &AudioContext,
            freq: f32,
            osc_type: OscillatorType,
        ) -> Option<(OscillatorNode, GainNode)> {
            let osc = ctx.create_oscillator().ok()?;
            let gain = ctx.create_gain().ok()?;

            osc.set_type(osc_type);
            osc.frequency().set_value(freq);
            osc.connect_with_audio_node(&gain).ok()?;
            gain.connect_with_audio_node(&ctx.destination()).ok()?;

            Some((osc, gain))
        }

        /// Heavy ball on wood - low thump with a short knock on top
        fn play_knock(&self, ctx: &AudioContext, vol: f32) {
            let t = ctx.current_time();

            if let Some((osc, gain)) = self.create_osc(ctx, 140.0, OscillatorType::Sine) {
                gain.gain().set_value_at_time(vol * 0.7, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.18)
                    .ok();
                osc.frequency()
                    .exponential_ramp_to_value_at_time(55.0, t + 0.15)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.2).ok();
            }

            if let Some((osc, gain)) = self.create_osc(ctx, 900.0, OscillatorType::Triangle) {
                gain.gain().set_value_at_time(vol * 0.2, t).ok();
                gain.gain()
                    .exponential_ramp_to_value_at_time(0.01, t + 0.04)
                    .ok();
                osc.start().ok();
                osc.stop_with_when(t + 0.05).ok();
            }
        }

        /// Small plastic ball bouncing - bright click
        fn play_click(&self, ctx: &AudioContext, vol: f32) {
            let Some((osc, gain)) = self.create_osc(ctx, 1800.0, OscillatorType::Sine) else {
                return;
            };
            let t = ctx.current_time();

            gain.gain().set_value_at_time(vol * 0.5, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.05)
                .ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(1200.0, t + 0.05)
                .ok();

            osc.start().ok();
            osc.stop_with_when(t + 0.06).ok();
        }
    }
}
