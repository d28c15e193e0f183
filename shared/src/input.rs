//! Steering input and a time-driven autopilot for headless sessions

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Current left/right key state for one player
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
}

impl InputState {
    /// -1 turns left, +1 turns right, both keys cancel out
    pub fn steering(&self) -> f32 {
        match (self.left, self.right) {
            (true, false) => -1.0,
            (false, true) => 1.0,
            _ => 0.0,
        }
    }
}

/// Stands in for a keyboard when no one is at the controls: alternates
/// between turning and flying straight for random stretches of time.
#[derive(Debug, Clone)]
pub struct Autopilot {
    current: InputState,
    change_at: u64,
    min_hold_ms: u64,
    max_hold_ms: u64,
}

impl Autopilot {
    pub fn new(min_hold_ms: u64, max_hold_ms: u64) -> Self {
        Self {
            current: InputState::default(),
            change_at: 0,
            min_hold_ms,
            max_hold_ms: max_hold_ms.max(min_hold_ms),
        }
    }

    /// Input for the frame at `now`
    pub fn sample<R: Rng + ?Sized>(&mut self, now: u64, rng: &mut R) -> InputState {
        if now >= self.change_at {
            self.current = match rng.gen_range(0..3) {
                0 => InputState {
                    left: true,
                    right: false,
                },
                1 => InputState {
                    left: false,
                    right: true,
                },
                _ => InputState::default(),
            };
            self.change_at = now + rng.gen_range(self.min_hold_ms..=self.max_hold_ms);
        }
        self.current
    }
}

impl Default for Autopilot {
    fn default() -> Self {
        Self::new(200, 1200)
    }
}
