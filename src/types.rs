//! Core types for the Platter state core
//!
//! This module defines the values published to the view layer: the controller
//! snapshot (buttons, wheel rotation, session counters) and the heatmap
//! calendar cells. All of them are replaced wholesale on change, never patched.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::schema::{Direction, BUTTON_COUNT};

/// Pressed/released state of the seven keys
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ButtonState([bool; BUTTON_COUNT]);

impl ButtonState {
    /// All keys released
    pub fn released() -> Self {
        Self::default()
    }

    /// Return a new state with one slot replaced.
    ///
    /// Returns `None` when `index` is out of range; the caller keeps its
    /// current state.
    pub fn with(&self, index: usize, pressed: bool) -> Option<Self> {
        if index >= BUTTON_COUNT {
            return None;
        }
        let mut next = self.0;
        next[index] = pressed;
        Some(Self(next))
    }

    pub fn is_pressed(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    pub fn pressed_count(&self) -> usize {
        self.0.iter().filter(|p| **p).count()
    }
}

/// Direction the wheel was last reported spinning
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinDirection {
    Left,
    Right,
    Neutral,
    /// No scratch event seen yet
    #[default]
    None,
}

impl From<Direction> for SpinDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Left => SpinDirection::Left,
            Direction::Right => SpinDirection::Right,
            Direction::Neutral => SpinDirection::Neutral,
        }
    }
}

/// Which half of the wheel graphic lights up while spinning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinSide {
    /// Lit by left spins
    Top,
    /// Lit by right spins
    Bottom,
}

impl SpinSide {
    pub const ALL: [SpinSide; 2] = [SpinSide::Top, SpinSide::Bottom];
}

/// Scratch wheel state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationState {
    /// Wheel angle in degrees, `0..360`
    pub angle_degrees: u16,
    pub spin_direction: SpinDirection,
    pub top_active: bool,
    pub bottom_active: bool,
}

impl RotationState {
    /// True while either side is inside its debounce window
    pub fn spin_visual_active(&self) -> bool {
        self.top_active || self.bottom_active
    }

    pub fn side_active(&self, side: SpinSide) -> bool {
        match side {
            SpinSide::Top => self.top_active,
            SpinSide::Bottom => self.bottom_active,
        }
    }

    pub(crate) fn with_side(mut self, side: SpinSide, active: bool) -> Self {
        match side {
            SpinSide::Top => self.top_active = active,
            SpinSide::Bottom => self.bottom_active = active,
        }
        self
    }
}

/// Counters reported alongside controller events
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionCounters {
    /// Last cumulative note count reported by the source
    pub count: u64,
    /// Last average release time reported on a key release (ms)
    pub average_release_ms: Option<f64>,
}

/// Everything the controller view renders, published as one value
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerSnapshot {
    pub buttons: ButtonState,
    pub rotation: RotationState,
    pub counters: SessionCounters,
}

/// Heatmap intensity bucket for a day cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "i8")]
pub enum HeatLevel {
    /// Padding cell (outside the year or in the future)
    Empty,
    Level0,
    Level1,
    Level2,
    Level3,
    Level4,
    Level5,
}

/// Width of each non-zero heat bucket
pub const LEVEL_STEP: i64 = 25_000;

impl HeatLevel {
    /// Bucket a count. `-1` (or any negative) is the padding sentinel.
    pub fn from_count(count: i64) -> Self {
        if count < 0 {
            return HeatLevel::Empty;
        }
        if count == 0 {
            return HeatLevel::Level0;
        }
        match count / LEVEL_STEP {
            0 => HeatLevel::Level1,
            1 => HeatLevel::Level2,
            2 => HeatLevel::Level3,
            3 => HeatLevel::Level4,
            _ => HeatLevel::Level5,
        }
    }

    pub fn value(&self) -> i8 {
        match self {
            HeatLevel::Empty => -1,
            HeatLevel::Level0 => 0,
            HeatLevel::Level1 => 1,
            HeatLevel::Level2 => 2,
            HeatLevel::Level3 => 3,
            HeatLevel::Level4 => 4,
            HeatLevel::Level5 => 5,
        }
    }

    /// Single-character rendering for terminal output
    pub fn glyph(&self) -> char {
        match self {
            HeatLevel::Empty => ' ',
            HeatLevel::Level0 => '·',
            HeatLevel::Level1 => '░',
            HeatLevel::Level2 => '▒',
            HeatLevel::Level3 => '▓',
            HeatLevel::Level4 => '█',
            HeatLevel::Level5 => '■',
        }
    }
}

impl From<HeatLevel> for i8 {
    fn from(level: HeatLevel) -> Self {
        level.value()
    }
}

/// Count sentinel for padding cells
pub const PADDING_COUNT: i64 = -1;

/// One heatmap cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayStat {
    /// `None` for padding cells
    pub date: Option<NaiveDate>,
    /// Note count, or [`PADDING_COUNT`] for padding
    pub count: i64,
    pub level: HeatLevel,
}

impl DayStat {
    pub fn padding() -> Self {
        DayStat {
            date: None,
            count: PADDING_COUNT,
            level: HeatLevel::Empty,
        }
    }

    pub fn new(date: NaiveDate, count: u64) -> Self {
        let count = i64::try_from(count).unwrap_or(i64::MAX);
        DayStat {
            date: Some(date),
            count,
            level: HeatLevel::from_count(count),
        }
    }

    pub fn is_padding(&self) -> bool {
        self.date.is_none()
    }
}

/// Seven consecutive day cells starting on the configured week start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct WeekRow(pub [DayStat; 7]);

impl WeekRow {
    pub fn days(&self) -> &[DayStat; 7] {
        &self.0
    }

    pub fn real_days(&self) -> impl Iterator<Item = &DayStat> {
        self.0.iter().filter(|d| !d.is_padding())
    }
}

/// Weeks attributed to one month of the displayed year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthBlock {
    /// Month number, 1-12
    pub month: u32,
    /// English month name
    pub label: &'static str,
    pub weeks: Vec<WeekRow>,
}

/// First day of a calendar week
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

impl WeekStart {
    pub fn weekday(&self) -> Weekday {
        match self {
            WeekStart::Monday => Weekday::Mon,
            WeekStart::Sunday => Weekday::Sun,
        }
    }

    /// Start of the week containing `date`, `None` if it precedes the
    /// earliest representable date
    pub fn start_of_week(&self, date: NaiveDate) -> Option<NaiveDate> {
        let offset = match self {
            WeekStart::Monday => date.weekday().num_days_from_monday(),
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
        };
        date.checked_sub_days(Days::new(u64::from(offset)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_state_is_copied_on_update() {
        let before = ButtonState::released();
        let after = before.with(3, true).unwrap();

        assert_eq!(before.is_pressed(3), Some(false));
        assert_eq!(after.is_pressed(3), Some(true));
        assert_eq!(after.pressed_count(), 1);
        assert_eq!(after.as_slice().len(), BUTTON_COUNT);
    }

    #[test]
    fn test_button_state_rejects_out_of_range() {
        let state = ButtonState::released().with(1, true).unwrap();
        assert_eq!(state.with(7, true), None);
        assert_eq!(state.is_pressed(7), None);
    }

    #[test]
    fn test_rotation_side_flags() {
        let state = RotationState::default().with_side(SpinSide::Bottom, true);
        assert!(state.side_active(SpinSide::Bottom));
        assert!(!state.side_active(SpinSide::Top));
        assert!(state.spin_visual_active());
    }

    #[test]
    fn test_heat_level_buckets() {
        assert_eq!(HeatLevel::from_count(-1).value(), -1);
        assert_eq!(HeatLevel::from_count(0).value(), 0);
        assert_eq!(HeatLevel::from_count(1).value(), 1);
        assert_eq!(HeatLevel::from_count(24_999).value(), 1);
        assert_eq!(HeatLevel::from_count(25_000).value(), 2);
        assert_eq!(HeatLevel::from_count(49_999).value(), 2);
        assert_eq!(HeatLevel::from_count(50_000).value(), 3);
        assert_eq!(HeatLevel::from_count(75_000).value(), 4);
        assert_eq!(HeatLevel::from_count(99_999).value(), 4);
        assert_eq!(HeatLevel::from_count(100_000).value(), 5);
        assert_eq!(HeatLevel::from_count(10_000_000).value(), 5);
    }

    #[test]
    fn test_padding_cell_serializes_with_sentinels() {
        let json = serde_json::to_value(DayStat::padding()).unwrap();
        assert_eq!(json, serde_json::json!({"date": null, "count": -1, "level": -1}));

        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let json = serde_json::to_value(DayStat::new(date, 500)).unwrap();
        assert_eq!(json, serde_json::json!({"date": "2025-01-01", "count": 500, "level": 1}));
    }

    #[test]
    fn test_week_start() {
        // 2025-01-01 is a Wednesday
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        assert_eq!(
            WeekStart::Monday.start_of_week(date),
            NaiveDate::from_ymd_opt(2024, 12, 30)
        );
        assert_eq!(
            WeekStart::Sunday.start_of_week(date),
            NaiveDate::from_ymd_opt(2024, 12, 29)
        );
        assert_eq!(
            WeekStart::Monday.start_of_week(date - Days::new(2)).map(|d| d.weekday()),
            Some(Weekday::Mon)
        );
    }

    #[test]
    fn test_week_start_before_earliest_date() {
        // the earliest representable date is not a Monday
        assert_ne!(NaiveDate::MIN.weekday(), Weekday::Mon);
        assert_eq!(WeekStart::Monday.start_of_week(NaiveDate::MIN), None);
    }
}
