//! Year heatmap aggregation
//!
//! Turns a sparse map of daily note counts into month blocks of full weeks.
//! Weeks always start on the configured week start, so the first and last
//! rows of the year contain padding cells for days outside the year. Days
//! after "today" are padded too.

use std::collections::BTreeMap;

use chrono::{Datelike, Days, Month, NaiveDate};

use crate::error::PlatterError;
use crate::types::{DayStat, MonthBlock, WeekRow, WeekStart};

pub struct CalendarAggregator;

impl CalendarAggregator {
    /// Build the twelve month blocks for `year`.
    ///
    /// Each week lands in the block of the month its first day falls in,
    /// except the week containing January 1, which belongs to January even
    /// when it starts in December. The final week stays with December even
    /// when it runs into the next year.
    pub fn aggregate(
        year: i32,
        stats: &BTreeMap<NaiveDate, u64>,
        today: NaiveDate,
        week_start: WeekStart,
    ) -> Result<Vec<MonthBlock>, PlatterError> {
        let first = NaiveDate::from_ymd_opt(year, 1, 1).ok_or(PlatterError::InvalidYear(year))?;
        let last = NaiveDate::from_ymd_opt(year, 12, 31).ok_or(PlatterError::InvalidYear(year))?;

        let mut blocks: Vec<MonthBlock> = Vec::with_capacity(12);
        let mut cursor = week_start
            .start_of_week(first)
            .ok_or(PlatterError::InvalidYear(year))?;

        while cursor <= last {
            let month = block_month(cursor, first);
            let week = build_week(cursor, year, stats, today);

            match blocks.last_mut() {
                Some(block) if block.month == month => block.weeks.push(week),
                _ => blocks.push(MonthBlock {
                    month,
                    label: month_label(month),
                    weeks: vec![week],
                }),
            }

            cursor = match cursor.checked_add_days(Days::new(7)) {
                Some(next) => next,
                None => break,
            };
        }

        Ok(blocks)
    }
}

/// Month a week starting at `week_start` is filed under
fn block_month(week_start: NaiveDate, first_of_year: NaiveDate) -> u32 {
    // the leading week may start in the previous December
    week_start.max(first_of_year).month()
}

fn build_week(
    start: NaiveDate,
    year: i32,
    stats: &BTreeMap<NaiveDate, u64>,
    today: NaiveDate,
) -> WeekRow {
    let mut days = [DayStat::padding(); 7];
    for (offset, cell) in (0u64..).zip(days.iter_mut()) {
        let Some(date) = start.checked_add_days(Days::new(offset)) else {
            continue;
        };
        if date.year() != year || date > today {
            continue;
        }
        *cell = DayStat::new(date, stats.get(&date).copied().unwrap_or(0));
    }
    WeekRow(days)
}

/// English name of a month number, `"?"` when out of range
pub fn month_label(month: u32) -> &'static str {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name())
        .unwrap_or("?")
}

impl MonthBlock {
    /// Sum of all non-padding counts in the block
    pub fn total_count(&self) -> u64 {
        self.weeks
            .iter()
            .flat_map(|week| week.real_days())
            .map(|day| u64::try_from(day.count).unwrap_or(0))
            .sum()
    }

    /// Number of days in the block with at least one note
    pub fn active_days(&self) -> usize {
        self.weeks
            .iter()
            .flat_map(|week| week.real_days())
            .filter(|day| day.count > 0)
            .count()
    }
}
