//! Guess streak tracking
//!
//! The UI side of the guessing game: a correct guess extends the streak, a
//! wrong one resets it. Best streak and totals persist to LocalStorage.

use serde::{Deserialize, Serialize};

use crate::sim::GuessOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Scoreboard {
    /// Current streak of correct guesses
    #[serde(skip)]
    pub score: u32,
    /// Longest streak ever
    pub best: u32,
    /// Guesses made
    pub guesses: u32,
    /// Of which correct
    pub correct: u32,
}

impl Scoreboard {
    /// LocalStorage key (used only in wasm32)
    #[allow(dead_code)]
    const STORAGE_KEY: &'static str = "brick_reveal_scoreboard";

    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a guess result; returns true if it set a new best
    pub fn record(&mut self, outcome: GuessOutcome) -> bool {
        self.guesses += 1;
        match outcome {
            GuessOutcome::Correct => {
                self.correct += 1;
                self.score += 1;
                if self.score > self.best {
                    self.best = self.score;
                    return true;
                }
                false
            }
            GuessOutcome::Incorrect => {
                self.score = 0;
                false
            }
        }
    }

    /// Fraction of guesses that were correct (0 before any guess)
    pub fn accuracy(&self) -> f32 {
        if self.guesses == 0 {
            return 0.0;
        }
        self.correct as f32 / self.guesses as f32
    }

    /// Load from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(Some(json)) = storage.get_item(Self::STORAGE_KEY) {
                if let Ok(board) = serde_json::from_str::<Scoreboard>(&json) {
                    log::info!("Loaded scoreboard (best streak {})", board.best);
                    return board;
                }
            }
        }

        log::info!("No scoreboard found, starting fresh");
        Self::new()
    }

    /// Save to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) {
        let storage = web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten();

        if let Some(storage) = storage {
            if let Ok(json) = serde_json::to_string(self) {
                let _ = storage.set_item(Self::STORAGE_KEY, &json);
            }
        }
    }

    /// Native stubs
    #[cfg(not(target_arch = "wasm32"))]
    pub fn load() -> Self {
        Self::new()
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn save(&self) {
        // No-op for native
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_streak_and_best() {
        let mut board = Scoreboard::new();
        assert!(board.record(GuessOutcome::Correct));
        assert!(board.record(GuessOutcome::Correct));
        assert_eq!(board.score, 2);

        assert!(!board.record(GuessOutcome::Incorrect));
        assert_eq!(board.score, 0);
        assert_eq!(board.best, 2);

        // Matching the best is not a new best
        board.record(GuessOutcome::Correct);
        assert!(!board.record(GuessOutcome::Correct));
        assert_eq!(board.guesses, 5);
        assert_eq!(board.correct, 4);
        assert!((board.accuracy() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_streak_is_not_persisted() {
        let mut board = Scoreboard::new();
        board.record(GuessOutcome::Correct);
        let json = serde_json::to_string(&board).unwrap();
        let loaded: Scoreboard = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.score, 0);
        assert_eq!(loaded.best, 1);
    }
}
