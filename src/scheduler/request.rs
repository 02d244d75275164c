//! Rostering input container.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Nurse, UnavailabilityConstraint, Ward};

/// Everything one optimization run reads.
///
/// The date range is inclusive at both ends, day granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub wards: Vec<Ward>,
    #[serde(default)]
    pub nurses: Vec<Nurse>,
    /// Unavailability requests. Only approved, in-window entries bind.
    #[serde(default)]
    pub constraints: Vec<UnavailabilityConstraint>,
}

impl RosterRequest {
    /// Creates an empty request for `[start_date, end_date]`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
            wards: Vec::new(),
            nurses: Vec::new(),
            constraints: Vec::new(),
        }
    }

    pub fn with_ward(mut self, ward: Ward) -> Self {
        self.wards.push(ward);
        self
    }

    pub fn with_nurse(mut self, nurse: Nurse) -> Self {
        self.nurses.push(nurse);
        self
    }

    pub fn with_constraint(mut self, constraint: UnavailabilityConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Dates of the range in ascending order. Empty if the range is inverted.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start_date
            .iter_days()
            .take_while(move |date| *date <= self.end_date)
    }
}
