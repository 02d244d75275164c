//! Unavailability requests.
//!
//! A nurse requests to be kept off specific (date, shift) pairs. Only
//! approved requests are binding, and only for dates inside the request's
//! validity window. Binding requests are hard constraints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::ShiftType;

/// Approval state of a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// Shifts blocked on one date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockedDate {
    /// Calendar date.
    pub date: NaiveDate,
    /// Blocked shifts. Empty = the whole day.
    #[serde(default)]
    pub shifts: BTreeSet<ShiftType>,
}

impl BlockedDate {
    /// Whether `shift` is blocked on this entry's date.
    #[inline]
    pub fn blocks(&self, shift: ShiftType) -> bool {
        self.shifts.is_empty() || self.shifts.contains(&shift)
    }
}

/// A nurse's request to be unavailable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnavailabilityConstraint {
    /// Request identifier.
    #[serde(default)]
    pub id: String,
    /// Nurse the request belongs to.
    pub nurse_id: String,
    /// Blocked dates.
    pub dates: Vec<BlockedDate>,
    /// First date (inclusive) the request applies to.
    pub valid_from: NaiveDate,
    /// Last date (inclusive) the request applies to.
    pub valid_until: NaiveDate,
    /// Approval state.
    #[serde(default)]
    pub status: RequestStatus,
}

impl UnavailabilityConstraint {
    /// Creates a pending request covering `[valid_from, valid_until]`.
    pub fn new(nurse_id: impl Into<String>, valid_from: NaiveDate, valid_until: NaiveDate) -> Self {
        Self {
            id: String::new(),
            nurse_id: nurse_id.into(),
            dates: Vec::new(),
            valid_from,
            valid_until,
            status: RequestStatus::Pending,
        }
    }

    /// Sets the request ID.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Blocks the given shifts on `date`. An empty list blocks the whole day.
    pub fn with_blocked(
        mut self,
        date: NaiveDate,
        shifts: impl IntoIterator<Item = ShiftType>,
    ) -> Self {
        self.dates.push(BlockedDate {
            date,
            shifts: shifts.into_iter().collect(),
        });
        self
    }

    /// Blocks every shift on `date`.
    pub fn with_blocked_day(mut self, date: NaiveDate) -> Self {
        self.dates.push(BlockedDate {
            date,
            shifts: BTreeSet::new(),
        });
        self
    }

    /// Marks the request approved.
    pub fn approved(mut self) -> Self {
        self.status = RequestStatus::Approved;
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: RequestStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether the validity window is well formed.
    pub fn has_valid_window(&self) -> bool {
        self.valid_from <= self.valid_until
    }

    /// Whether `date` falls inside the validity window.
    #[inline]
    pub fn in_window(&self, date: NaiveDate) -> bool {
        date >= self.valid_from && date <= self.valid_until
    }

    /// Whether this request binds `(date, shift)`.
    ///
    /// True only for approved requests, inside the window, with a matching entry.
    pub fn blocks(&self, date: NaiveDate, shift: ShiftType) -> bool {
        self.status == RequestStatus::Approved
            && self.in_window(date)
            && self
                .dates
                .iter()
                .any(|entry| entry.date == date && entry.blocks(shift))
    }

    /// All binding `(date, shift)` pairs of this request.
    pub fn binding_pairs(&self) -> impl Iterator<Item = (NaiveDate, ShiftType)> + '_ {
        self.dates
            .iter()
            .flat_map(|entry| ShiftType::ALL.into_iter().map(move |s| (entry.date, s)))
            .filter(|&(date, shift)| self.blocks(date, shift))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    #[test]
    fn test_only_approved_binds() {
        let c = UnavailabilityConstraint::new("N1", d(1), d(30))
            .with_blocked(d(15), [ShiftType::Day]);
        assert!(!c.blocks(d(15), ShiftType::Day));

        let c = c.approved();
        assert!(c.blocks(d(15), ShiftType::Day));
        assert!(!c.blocks(d(15), ShiftType::Evening));
        assert!(!c.blocks(d(16), ShiftType::Day));

        let rejected = c.clone().with_status(RequestStatus::Rejected);
        assert!(!rejected.blocks(d(15), ShiftType::Day));
    }

    #[test]
    fn test_window_limits_binding() {
        let c = UnavailabilityConstraint::new("N1", d(1), d(10))
            .with_blocked(d(15), [ShiftType::Day])
            .approved();
        assert!(!c.blocks(d(15), ShiftType::Day));
    }

    #[test]
    fn test_empty_shift_list_blocks_whole_day() {
        let c = UnavailabilityConstraint::new("N1", d(1), d(30))
            .with_blocked_day(d(3))
            .approved();
        for shift in ShiftType::ALL {
            assert!(c.blocks(d(3), shift));
        }
        assert_eq!(c.binding_pairs().count(), 3);
    }

    #[test]
    fn test_malformed_window() {
        let c = UnavailabilityConstraint::new("N1", d(10), d(1));
        assert!(!c.has_valid_window());
    }
}
