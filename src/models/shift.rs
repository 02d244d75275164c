//! Shift type model.
//!
//! A day is split into three fixed 8-hour shifts. The night shift
//! starts at 23:00 and ends at 07:00 on the following calendar date.
//!
//! | Shift | Start | End |
//! |-------|-------|-----|
//! | Day | 07:00 | 15:00 |
//! | Evening | 15:00 | 23:00 |
//! | Night | 23:00 | 07:00 (+1) |

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Length of every shift in hours.
pub const SHIFT_HOURS: u32 = 8;

/// Shift type within a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftType {
    /// 07:00 – 15:00.
    Day,
    /// 15:00 – 23:00.
    Evening,
    /// 23:00 – 07:00 next day.
    Night,
}

impl ShiftType {
    /// All shift types in chronological order within a day.
    pub const ALL: [ShiftType; 3] = [ShiftType::Day, ShiftType::Evening, ShiftType::Night];

    /// Number of shift types per day.
    pub const COUNT: usize = 3;

    /// Dense index (0..3) used by the flat slot layout.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            ShiftType::Day => 0,
            ShiftType::Evening => 1,
            ShiftType::Night => 2,
        }
    }

    /// Paid hours for this shift.
    #[inline]
    pub fn hours(self) -> u32 {
        SHIFT_HOURS
    }

    /// Hour of day the shift starts.
    pub fn start_hour(self) -> u32 {
        match self {
            ShiftType::Day => 7,
            ShiftType::Evening => 15,
            ShiftType::Night => 23,
        }
    }

    /// Start instant of this shift on `date`.
    pub fn start_on(self, date: NaiveDate) -> NaiveDateTime {
        let time = NaiveTime::from_hms_opt(self.start_hour(), 0, 0).unwrap_or_default();
        date.and_time(time)
    }

    /// End instant of this shift on `date`.
    pub fn end_on(self, date: NaiveDate) -> NaiveDateTime {
        self.start_on(date) + Duration::hours(i64::from(self.hours()))
    }

    /// Upper-case label used in reports.
    pub fn label(self) -> &'static str {
        match self {
            ShiftType::Day => "DAY",
            ShiftType::Evening => "EVENING",
            ShiftType::Night => "NIGHT",
        }
    }
}

impl fmt::Display for ShiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_matches_all_order() {
        for (i, shift) in ShiftType::ALL.into_iter().enumerate() {
            assert_eq!(shift.index(), i);
        }
        assert_eq!(ShiftType::ALL.len(), ShiftType::COUNT);
    }

    #[test]
    fn test_night_crosses_midnight() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 15).unwrap();
        let end = ShiftType::Night.end_on(date);
        assert_eq!(end.date(), date.succ_opt().unwrap());
        assert_eq!(end.time(), NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    }

    #[test]
    fn test_shift_lengths() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        for shift in ShiftType::ALL {
            let span = shift.end_on(date) - shift.start_on(date);
            assert_eq!(span.num_hours(), i64::from(shift.hours()));
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&ShiftType::Evening).unwrap();
        assert_eq!(json, "\"evening\"");
    }
}
