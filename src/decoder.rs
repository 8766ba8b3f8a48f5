//! Event decoding
//!
//! Translates one `gamepad-input` payload into at most one state-update
//! instruction. The decoder holds no state and never touches the trackers.

use serde::Serialize;
use tracing::debug;

use crate::schema::{ControllerEvent, Direction, GamepadPayload, AXIS_MAX_VALUE, AXIS_MIN_VALUE};
use crate::types::SpinSide;

/// Full angle of the wheel graphic
const FULL_TURN_DEGREES: i64 = 360;

/// Number of distinct raw axis positions
const AXIS_SPAN: i64 = AXIS_MAX_VALUE as i64 - AXIS_MIN_VALUE as i64 + 1;

/// A single state update for the controller trackers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Instruction {
    SetButton {
        index: usize,
        pressed: bool,
        count: Option<u64>,
        average_release_ms: Option<f64>,
    },
    SetRotation {
        /// `0..=360`; 360 is the same position as 0
        angle_degrees: u16,
        direction: Direction,
        count: Option<u64>,
    },
    /// Issued by the session loop when a debounce window closes, never by
    /// the decoder
    ExpireSpin { side: SpinSide },
}

/// Stateless payload decoder
pub struct EventDecoder;

impl EventDecoder {
    /// Decode a wire payload; malformed or unknown payloads yield `None`
    pub fn decode(payload: &GamepadPayload) -> Option<Instruction> {
        match ControllerEvent::try_from(payload) {
            Ok(event) => Some(Self::decode_event(&event)),
            Err(e) => {
                debug!(kind = %payload.kind, reason = %e, "dropping controller event");
                None
            }
        }
    }

    /// Decode JSON text straight off the channel
    pub fn decode_json(json: &str) -> Option<Instruction> {
        match GamepadPayload::from_json(json) {
            Ok(payload) => Self::decode(&payload),
            Err(e) => {
                debug!(error = %e, "dropping unparseable controller event");
                None
            }
        }
    }

    /// Decode an already validated event
    pub fn decode_event(event: &ControllerEvent) -> Instruction {
        match event {
            ControllerEvent::Button(button) => Instruction::SetButton {
                index: button.index,
                pressed: button.pressed,
                count: button.cumulative_count,
                average_release_ms: button.average_release_ms,
            },
            ControllerEvent::Scratch(scratch) => Instruction::SetRotation {
                angle_degrees: axis_to_degrees(scratch.axis_raw),
                direction: scratch.direction,
                count: scratch.cumulative_count,
            },
        }
    }
}

/// Map a raw axis reading onto the wheel graphic.
///
/// `ceil((32768 + axis) / 65536 * 360)`, computed in integers so the
/// endpoints land exactly on 0 and 360.
pub fn axis_to_degrees(axis_raw: i16) -> u16 {
    let offset = i64::from(axis_raw) - i64::from(AXIS_MIN_VALUE);
    let scaled = offset * FULL_TURN_DEGREES;
    let degrees = (scaled + AXIS_SPAN - 1) / AXIS_SPAN;
    // offset is in 0..AXIS_SPAN so degrees is in 0..=360
    degrees as u16
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_axis_boundaries() {
        assert_eq!(axis_to_degrees(i16::MIN), 0);
        assert_eq!(axis_to_degrees(0), 180);
        assert_eq!(axis_to_degrees(i16::MAX), 360);
        // one step above the minimum already rounds up to the first degree
        assert_eq!(axis_to_degrees(i16::MIN + 1), 1);
        assert_eq!(axis_to_degrees(-16384), 90);
    }

    #[test]
    fn test_axis_span_covers_sixteen_bits() {
        assert_eq!(AXIS_SPAN, 1 << 16);
        assert_eq!(axis_to_degrees(AXIS_MIN_VALUE as i16), 0);
        assert_eq!(axis_to_degrees(AXIS_MAX_VALUE as i16), 360);
    }

    #[test]
    fn test_decode_press_and_release() {
        let press = GamepadPayload::button(2, true, 1);
        assert_eq!(
            EventDecoder::decode(&press),
            Some(Instruction::SetButton {
                index: 2,
                pressed: true,
                count: Some(1),
                average_release_ms: None,
            })
        );

        let release = GamepadPayload::button(2, false, 2).with_average_release_time(120.0);
        assert_eq!(
            EventDecoder::decode(&release),
            Some(Instruction::SetButton {
                index: 2,
                pressed: false,
                count: Some(2),
                average_release_ms: Some(120.0),
            })
        );
    }

    #[test]
    fn test_decode_scratch() {
        let json = r#"{"type":"scratch","axis":32767,"direction":"left","count":12}"#;
        assert_eq!(
            EventDecoder::decode_json(json),
            Some(Instruction::SetRotation {
                angle_degrees: 360,
                direction: Direction::Left,
                count: Some(12),
            })
        );
    }

    #[test]
    fn test_malformed_events_yield_nothing() {
        let cases = [
            r#"{"type":"button","pressed":true,"count":1}"#,
            r#"{"type":"button","button":3,"count":1}"#,
            r#"{"type":"button","button":9,"pressed":true,"count":1}"#,
            r#"{"type":"scratch","direction":"left","count":1}"#,
            r#"{"type":"scratch","axis":100,"count":1}"#,
            r#"{"type":"scratch","axis":100,"direction":"sideways"}"#,
            r#"{"type":"keyboard","key":"a"}"#,
            r#"{"button":1,"pressed":true}"#,
            "{",
        ];
        for json in cases {
            assert_eq!(EventDecoder::decode_json(json), None, "{json}");
        }
    }

    #[test]
    fn test_count_is_optional() {
        let json = r#"{"type":"button","button":6,"pressed":true}"#;
        assert_eq!(
            EventDecoder::decode_json(json),
            Some(Instruction::SetButton {
                index: 6,
                pressed: true,
                count: None,
                average_release_ms: None,
            })
        );
    }
}
