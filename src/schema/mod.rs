//! `gamepad-input` wire schema
//!
//! This module defines the payload delivered by the controller event source
//! and the validated, tagged event the rest of the core works with.

mod adapter;
mod gamepad_event;

pub use adapter::*;
pub use gamepad_event::*;
