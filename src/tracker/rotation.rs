//! Scratch wheel tracking
//!
//! Keeps the wheel angle and the spin highlight for each half of the wheel.
//! A left spin lights the top half, a right spin the bottom half; each half
//! goes dark again once its debounce window passes without another spin in
//! the same direction. Direction always comes from the event source and is
//! never guessed from angle deltas, which are ambiguous across the 0/360 seam.

use std::time::Duration;
use tokio::time::Instant;

use crate::schema::Direction;
use crate::tracker::debounce::DebounceTimer;
use crate::types::{RotationState, SpinSide};

#[derive(Debug, Clone)]
pub struct RotationTracker {
    state: RotationState,
    top_timer: DebounceTimer,
    bottom_timer: DebounceTimer,
}

impl Default for RotationTracker {
    fn default() -> Self {
        Self::new(crate::tracker::debounce::DEFAULT_DEBOUNCE)
    }
}

impl RotationTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            state: RotationState::default(),
            top_timer: DebounceTimer::new(window),
            bottom_timer: DebounceTimer::new(window),
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// Apply a scratch event. Returns true if the published state changed.
    pub fn apply(&mut self, angle_degrees: u16, direction: Direction, now: Instant) -> bool {
        let previous = self.state;
        let mut next = RotationState {
            angle_degrees: angle_degrees % 360,
            spin_direction: direction.into(),
            ..previous
        };

        match direction {
            Direction::Left => {
                next = next.with_side(SpinSide::Top, true);
                self.top_timer.arm(now);
            }
            Direction::Right => {
                next = next.with_side(SpinSide::Bottom, true);
                self.bottom_timer.arm(now);
            }
            Direction::Neutral => {
                next = next
                    .with_side(SpinSide::Top, false)
                    .with_side(SpinSide::Bottom, false);
                self.top_timer.cancel();
                self.bottom_timer.cancel();
            }
        }

        self.state = next;
        next != previous
    }

    /// Clear one side's highlight (timer expiry)
    pub fn expire(&mut self, side: SpinSide) -> bool {
        self.timer_mut(side).cancel();
        let previous = self.state;
        self.state = previous.with_side(side, false);
        self.state != previous
    }

    /// Sides whose debounce window has closed by `now`; each is reported once
    pub fn due_sides(&mut self, now: Instant) -> Vec<SpinSide> {
        SpinSide::ALL
            .into_iter()
            .filter(|side| self.timer_mut(*side).fire_if_due(now))
            .collect()
    }

    /// Earliest pending debounce deadline, if any side is armed
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.top_timer.deadline(), self.bottom_timer.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Drop all pending timers
    pub fn cancel_timers(&mut self) {
        self.top_timer.cancel();
        self.bottom_timer.cancel();
    }

    fn timer_mut(&mut self, side: SpinSide) -> &mut DebounceTimer {
        match side {
            SpinSide::Top => &mut self.top_timer,
            SpinSide::Bottom => &mut self.bottom_timer,
        }
    }
}
