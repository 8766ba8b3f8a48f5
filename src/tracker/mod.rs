//! Controller state machine
//!
//! Applies decoded instructions to the key and wheel trackers and keeps the
//! session counters. Every change produces a fresh [`ControllerSnapshot`].

pub mod button;
pub mod debounce;
pub mod rotation;

pub use button::ButtonTracker;
pub use debounce::{DebounceTimer, DEFAULT_DEBOUNCE};
pub use rotation::RotationTracker;

use std::time::Duration;
use tokio::time::Instant;

use crate::decoder::Instruction;
use crate::types::{ControllerSnapshot, SessionCounters};

#[derive(Debug, Clone)]
pub struct ControllerTracker {
    buttons: ButtonTracker,
    rotation: RotationTracker,
    counters: SessionCounters,
}

impl Default for ControllerTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl ControllerTracker {
    /// Create a tracker with the given spin debounce window
    pub fn new(debounce: Duration) -> Self {
        Self {
            buttons: ButtonTracker::new(),
            rotation: RotationTracker::new(debounce),
            counters: SessionCounters::default(),
        }
    }

    /// Apply one instruction. Returns true if the snapshot changed.
    pub fn apply(&mut self, instruction: &Instruction, now: Instant) -> bool {
        match instruction {
            Instruction::SetButton {
                index,
                pressed,
                count,
                average_release_ms,
            } => {
                let changed = self.buttons.apply(*index, *pressed);
                let counted = self.record_counters(*count, *average_release_ms);
                changed || counted
            }
            Instruction::SetRotation {
                angle_degrees,
                direction,
                count,
            } => {
                let changed = self.rotation.apply(*angle_degrees, *direction, now);
                let counted = self.record_counters(*count, None);
                changed || counted
            }
            Instruction::ExpireSpin { side } => self.rotation.expire(*side),
        }
    }

    /// Expiry instructions for every debounce window closed by `now`
    pub fn due_expiries(&mut self, now: Instant) -> Vec<Instruction> {
        self.rotation
            .due_sides(now)
            .into_iter()
            .map(|side| Instruction::ExpireSpin { side })
            .collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.rotation.next_deadline()
    }

    pub fn cancel_timers(&mut self) {
        self.rotation.cancel_timers();
    }

    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            buttons: self.buttons.state(),
            rotation: self.rotation.state(),
            counters: self.counters,
        }
    }

    fn record_counters(&mut self, count: Option<u64>, average_release_ms: Option<f64>) -> bool {
        let previous = self.counters;
        if let Some(count) = count {
            self.counters.count = count;
        }
        if average_release_ms.is_some() {
            self.counters.average_release_ms = average_release_ms;
        }
        self.counters != previous
    }
}
