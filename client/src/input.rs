//! Client input management with change detection

use shared::InputState;

/// Decides when steering needs to go to the host: immediately on change,
/// otherwise once per keep-alive interval.
pub struct InputManager {
    current_input: InputState,
    last_sent_at: Option<u64>,
    keep_alive_ms: u64,
}

impl InputManager {
    pub fn new(keep_alive_ms: u64) -> Self {
        Self {
            current_input: InputState::default(),
            last_sent_at: None,
            keep_alive_ms,
        }
    }

    /// Records the keys held at `now` and returns the input to send, if any
    pub fn update(&mut self, input: InputState, now: u64) -> Option<InputState> {
        let input_changed = input != self.current_input;
        let time_to_send = match self.last_sent_at {
            Some(last) => now.saturating_sub(last) >= self.keep_alive_ms,
            None => true,
        };

        if !(input_changed || time_to_send) {
            return None;
        }

        self.current_input = input;
        self.last_sent_at = Some(now);
        Some(input)
    }

    pub fn current_input(&self) -> &InputState {
        &self.current_input
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new(250)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LEFT: InputState = InputState {
        left: true,
        right: false,
    };

    #[test]
    fn test_first_update_is_sent() {
        let mut manager = InputManager::new(100);
        assert_eq!(manager.update(InputState::default(), 0), Some(InputState::default()));
    }

    #[test]
    fn test_unchanged_input_waits_for_keep_alive() {
        let mut manager = InputManager::new(100);
        manager.update(InputState::default(), 0);

        assert_eq!(manager.update(InputState::default(), 50), None);
        assert_eq!(manager.update(InputState::default(), 99), None);
        assert!(manager.update(InputState::default(), 100).is_some());
        assert_eq!(manager.update(InputState::default(), 150), None);
    }

    #[test]
    fn test_change_is_sent_immediately() {
        let mut manager = InputManager::new(100);
        manager.update(InputState::default(), 0);

        assert_eq!(manager.update(LEFT, 10), Some(LEFT));
        assert_eq!(manager.current_input(), &LEFT);
        assert_eq!(manager.update(LEFT, 20), None);
        assert_eq!(
            manager.update(InputState::default(), 30),
            Some(InputState::default())
        );
    }
}
