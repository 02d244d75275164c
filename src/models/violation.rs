//! Rule violations detected in a roster.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::ShiftType;

/// A detected rule violation.
///
/// Produced fresh by every evaluation and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule that was broken.
    pub violation_type: ViolationType,
    /// Severity tag.
    pub severity: Severity,
    /// Nurse involved, if the rule is about a nurse.
    pub nurse_id: Option<String>,
    /// Ward involved, if the rule is about a ward slot.
    pub ward_id: Option<String>,
    /// Date the violation is anchored to.
    pub date: NaiveDate,
    /// Shift involved, if any.
    pub shift: Option<ShiftType>,
    /// Human-readable description.
    pub message: String,
}

/// Classification of roster violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationType {
    /// Nurse assigned to a (date, shift) blocked by an approved request.
    UnavailabilityRequestViolation,
    /// Night streak longer than allowed.
    MaxConsecutiveNights,
    /// Weekly hours above the cap.
    MaxWeeklyHours,
    /// Slot filled with fewer nurses than required.
    UnderStaffed,
    /// Too little rest between two shifts.
    RestPeriod,
    /// Working-day streak longer than allowed.
    MaxConsecutiveDays,
    /// Too few days off in a 7-day window.
    MinDaysOff,
    /// Nurse assigned on a weekday/shift marked unavailable.
    AvailabilityViolation,
    /// Too few charge-capable nurses on a slot.
    ChargeNurseShortage,
}

impl ViolationType {
    /// Severity normally attached to this rule.
    pub fn default_severity(self) -> Severity {
        match self {
            ViolationType::UnavailabilityRequestViolation => Severity::Critical,
            ViolationType::MaxConsecutiveNights => Severity::High,
            ViolationType::MaxWeeklyHours
            | ViolationType::RestPeriod
            | ViolationType::MaxConsecutiveDays
            | ViolationType::AvailabilityViolation
            | ViolationType::ChargeNurseShortage => Severity::Medium,
            ViolationType::UnderStaffed | ViolationType::MinDaysOff => Severity::Low,
        }
    }
}

/// Violation severity. Ordered from most to least severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
        };
        f.write_str(s)
    }
}

impl Violation {
    /// Creates a violation with the rule's default severity.
    pub fn new(violation_type: ViolationType, date: NaiveDate, message: impl Into<String>) -> Self {
        Self {
            violation_type,
            severity: violation_type.default_severity(),
            nurse_id: None,
            ward_id: None,
            date,
            shift: None,
            message: message.into(),
        }
    }

    /// Attaches the nurse.
    pub fn for_nurse(mut self, nurse_id: impl Into<String>) -> Self {
        self.nurse_id = Some(nurse_id.into());
        self
    }

    /// Attaches the ward.
    pub fn on_ward(mut self, ward_id: impl Into<String>) -> Self {
        self.ward_id = Some(ward_id.into());
        self
    }

    /// Attaches the shift.
    pub fn on_shift(mut self, shift: ShiftType) -> Self {
        self.shift = Some(shift);
        self
    }

    /// Whether this is a hard-constraint breach.
    #[inline]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
