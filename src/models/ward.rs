//! Ward model.
//!
//! A ward declares who may staff it (required qualifications, minimum
//! hierarchy level) and how many nurses each shift type needs.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Nurse, ShiftType};
use crate::config::QualificationPolicy;

/// A hospital ward to be staffed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ward {
    /// Unique ward identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Qualifications required to work on this ward. Empty = none required.
    #[serde(default)]
    pub required_qualifications: BTreeSet<String>,
    /// Minimum nurse hierarchy level (1-3).
    #[serde(default = "default_min_hierarchy")]
    pub min_hierarchy_level: u8,
    /// Bed capacity (informational).
    #[serde(default)]
    pub capacity: u32,
    /// Staffing requirement per shift type.
    #[serde(default)]
    pub shift_requirements: ShiftRequirements,
}

fn default_min_hierarchy() -> u8 {
    1
}

/// Staffing requirement for one shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffingRequirement {
    /// Nurses required on the shift (charge nurses included).
    pub nurses: u32,
    /// How many of those must be charge-capable.
    #[serde(default)]
    pub charge_nurses: u32,
}

impl StaffingRequirement {
    /// Creates a requirement.
    pub fn new(nurses: u32, charge_nurses: u32) -> Self {
        Self {
            nurses,
            charge_nurses,
        }
    }

    /// Slot count to fill: never fewer than the charge requirement.
    #[inline]
    pub fn total(&self) -> u32 {
        self.nurses.max(self.charge_nurses)
    }
}

/// Staffing requirements for the three shift types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftRequirements {
    pub day: StaffingRequirement,
    pub evening: StaffingRequirement,
    pub night: StaffingRequirement,
}

impl ShiftRequirements {
    /// Requirement for a shift type.
    pub fn get(&self, shift: ShiftType) -> StaffingRequirement {
        match shift {
            ShiftType::Day => self.day,
            ShiftType::Evening => self.evening,
            ShiftType::Night => self.night,
        }
    }

    /// Mutable requirement for a shift type.
    pub fn get_mut(&mut self, shift: ShiftType) -> &mut StaffingRequirement {
        match shift {
            ShiftType::Day => &mut self.day,
            ShiftType::Evening => &mut self.evening,
            ShiftType::Night => &mut self.night,
        }
    }
}

impl Ward {
    /// Creates a ward with no requirements.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            required_qualifications: BTreeSet::new(),
            min_hierarchy_level: 1,
            capacity: 0,
            shift_requirements: ShiftRequirements::default(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a required qualification.
    pub fn with_required_qualification(mut self, qualification: impl Into<String>) -> Self {
        self.required_qualifications.insert(qualification.into());
        self
    }

    /// Sets the minimum hierarchy level.
    pub fn with_min_hierarchy_level(mut self, level: u8) -> Self {
        self.min_hierarchy_level = level;
        self
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the requirement for one shift type.
    pub fn with_requirement(mut self, shift: ShiftType, nurses: u32, charge_nurses: u32) -> Self {
        *self.shift_requirements.get_mut(shift) = StaffingRequirement::new(nurses, charge_nurses);
        self
    }

    /// Requirement for a shift type.
    #[inline]
    pub fn requirement(&self, shift: ShiftType) -> StaffingRequirement {
        self.shift_requirements.get(shift)
    }

    /// Whether the ward needs anyone on any shift.
    pub fn needs_staff(&self) -> bool {
        ShiftType::ALL
            .iter()
            .any(|&s| self.requirement(s).total() > 0)
    }

    /// Whether the nurse's qualifications satisfy this ward under `policy`.
    pub fn qualification_match(&self, nurse: &Nurse, policy: QualificationPolicy) -> bool {
        if self.required_qualifications.is_empty() {
            return true;
        }
        match policy {
            QualificationPolicy::Any => self
                .required_qualifications
                .iter()
                .any(|q| nurse.has_qualification(q)),
            QualificationPolicy::All => self
                .required_qualifications
                .iter()
                .all(|q| nurse.has_qualification(q)),
        }
    }

    /// Static staffing eligibility: qualification, ward access and hierarchy.
    ///
    /// Date-dependent rules (unavailability, weekday availability) are
    /// applied on top of this by the roster problem.
    pub fn admits(&self, nurse: &Nurse, policy: QualificationPolicy) -> bool {
        nurse.ward_access.allows(&self.id)
            && nurse.hierarchy_level() >= self.min_hierarchy_level
            && self.qualification_match(nurse, policy)
    }
}
