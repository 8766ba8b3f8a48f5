//! `gamepad-input` event schema
//!
//! The event source emits loosely shaped JSON objects on the `gamepad-input`
//! channel. Every field except `type` may be absent, so the wire struct keeps
//! them optional and validation into [`ControllerEvent`] happens once, at the
//! decode boundary.

use serde::{Deserialize, Serialize};

/// Channel name the controller events are published on
pub const GAMEPAD_CHANNEL: &str = "gamepad-input";

/// Number of physical keys on the controller
pub const BUTTON_COUNT: usize = 7;

/// Raw axis range of the scratch wheel
pub const AXIS_MIN_VALUE: i32 = i16::MIN as i32;
pub const AXIS_MAX_VALUE: i32 = i16::MAX as i32;

/// Scratch wheel direction as reported by the event source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Neutral,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Neutral => "neutral",
        }
    }

    /// Parse the wire spelling; anything else is not a direction
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "neutral" => Some(Direction::Neutral),
            _ => None,
        }
    }
}

/// Wire payload as delivered on the `gamepad-input` channel
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamepadPayload {
    /// Event kind ("button", "scratch", or something newer we don't know)
    #[serde(rename = "type")]
    pub kind: String,
    /// Button index (button events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button: Option<i64>,
    /// Press state (button events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressed: Option<bool>,
    /// Raw axis value (scratch events)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<i64>,
    /// Spin direction (scratch events); kept as text so unknown spellings
    /// can be rejected instead of failing the whole payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// Cumulative note count for the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Average key release time in milliseconds (release events only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_release_time: Option<f64>,
}

impl GamepadPayload {
    pub fn button(index: i64, pressed: bool, count: u64) -> Self {
        GamepadPayload {
            kind: "button".to_string(),
            button: Some(index),
            pressed: Some(pressed),
            count: Some(count),
            ..Default::default()
        }
    }

    pub fn scratch(axis: i64, direction: Direction, count: u64) -> Self {
        GamepadPayload {
            kind: "scratch".to_string(),
            axis: Some(axis),
            direction: Some(direction.as_str().to_string()),
            count: Some(count),
            ..Default::default()
        }
    }

    pub fn with_average_release_time(mut self, millis: f64) -> Self {
        self.average_release_time = Some(millis);
        self
    }

    /// Parse a single payload from JSON text
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Validated button event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ButtonEvent {
    /// Slot index in `0..BUTTON_COUNT`
    pub index: usize,
    pub pressed: bool,
    pub cumulative_count: Option<u64>,
    /// Only carried on release
    pub average_release_ms: Option<f64>,
}

/// Validated scratch wheel event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScratchEvent {
    pub axis_raw: i16,
    pub direction: Direction,
    pub cumulative_count: Option<u64>,
}

/// Controller event after validation, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ControllerEvent {
    Button(ButtonEvent),
    Scratch(ScratchEvent),
}

impl TryFrom<&GamepadPayload> for ControllerEvent {
    type Error = ValidationError;

    fn try_from(payload: &GamepadPayload) -> Result<Self, Self::Error> {
        match payload.kind.as_str() {
            "button" => {
                let raw_index = payload
                    .button
                    .ok_or(ValidationError::MissingField("button"))?;
                let index = usize::try_from(raw_index)
                    .ok()
                    .filter(|index| *index < BUTTON_COUNT)
                    .ok_or(ValidationError::ButtonOutOfRange(raw_index))?;
                let pressed = payload
                    .pressed
                    .ok_or(ValidationError::MissingField("pressed"))?;

                Ok(ControllerEvent::Button(ButtonEvent {
                    index,
                    pressed,
                    cumulative_count: payload.count,
                    average_release_ms: if pressed {
                        None
                    } else {
                        payload.average_release_time
                    },
                }))
            }
            "scratch" => {
                let raw_axis = payload.axis.ok_or(ValidationError::MissingField("axis"))?;
                let axis_raw = i16::try_from(raw_axis)
                    .map_err(|_| ValidationError::AxisOutOfRange(raw_axis))?;
                let direction_text = payload
                    .direction
                    .as_deref()
                    .ok_or(ValidationError::MissingField("direction"))?;
                let direction = Direction::parse(direction_text)
                    .ok_or_else(|| ValidationError::UnknownDirection(direction_text.to_string()))?;

                Ok(ControllerEvent::Scratch(ScratchEvent {
                    axis_raw,
                    direction,
                    cumulative_count: payload.count,
                }))
            }
            other => Err(ValidationError::UnknownKind(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Unknown event kind: {0}")]
    UnknownKind(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Button index {0} is outside 0..=6")]
    ButtonOutOfRange(i64),

    #[error("Axis value {0} is outside the 16-bit range")]
    AxisOutOfRange(i64),

    #[error("Unknown scratch direction: {0}")]
    UnknownDirection(String),
}
