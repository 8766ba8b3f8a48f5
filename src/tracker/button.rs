//! Key press tracking

use crate::types::ButtonState;

/// Holds the current 7-key vector and swaps in a new copy on every change
#[derive(Debug, Clone, Default)]
pub struct ButtonTracker {
    state: ButtonState,
}

impl ButtonTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a press or release. Returns false when nothing changed,
    /// including for out-of-range indices.
    pub fn apply(&mut self, index: usize, pressed: bool) -> bool {
        match self.state.with(index, pressed) {
            Some(next) if next != self.state => {
                self.state = next;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> ButtonState {
        self.state
    }
}
