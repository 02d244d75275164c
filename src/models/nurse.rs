//! Nurse model.
//!
//! A nurse is the resource being rostered. Each nurse carries a role
//! (which fixes the hierarchy level), qualifications, the wards they may
//! staff, a weekly availability pattern and personal working limits.
//! Limits left unset fall back to the run's `EvaluatorPolicy` defaults.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::ShiftType;

/// A nurse that can be assigned to ward shifts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Nurse {
    /// Unique nurse identifier.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Staff code (badge number, payroll code).
    #[serde(default)]
    pub code: String,
    /// Role within the ward hierarchy.
    #[serde(default)]
    pub role: Role,
    /// Held qualifications (e.g., "icu", "pediatrics").
    #[serde(default)]
    pub qualifications: BTreeSet<String>,
    /// Wards this nurse may be assigned to.
    #[serde(default)]
    pub ward_access: WardAccess,
    /// Availability pattern per weekday. Missing days are resolved by policy.
    #[serde(default)]
    pub availability: HashMap<Weekday, DayAvailability>,
    /// Personal working limits.
    #[serde(default)]
    pub constraints: WorkingConstraints,
}

/// Nurse role. Determines the hierarchy level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Staff nurse (level 1).
    #[default]
    Staff,
    /// Charge nurse (level 2).
    Charge,
    /// Administrative nurse (level 3).
    Admin,
}

impl Role {
    /// Hierarchy level: staff = 1, charge = 2, admin = 3.
    #[inline]
    pub fn hierarchy_level(self) -> u8 {
        match self {
            Role::Staff => 1,
            Role::Charge => 2,
            Role::Admin => 3,
        }
    }

    /// Whether this role can fill a charge-nurse slot.
    #[inline]
    pub fn can_take_charge(self) -> bool {
        matches!(self, Role::Charge | Role::Admin)
    }
}

/// Which wards a nurse may staff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WardAccess {
    /// Any ward.
    #[default]
    All,
    /// Only the listed ward IDs.
    Only(BTreeSet<String>),
}

impl WardAccess {
    /// Whether the given ward is accessible.
    pub fn allows(&self, ward_id: &str) -> bool {
        match self {
            WardAccess::All => true,
            WardAccess::Only(wards) => wards.contains(ward_id),
        }
    }
}

/// Availability for one weekday.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAvailability {
    /// Whether the nurse works at all on this weekday.
    pub available: bool,
    /// Shifts the nurse would like to work.
    #[serde(default)]
    pub preferred_shifts: BTreeSet<ShiftType>,
    /// Shifts the nurse cannot work even when available.
    #[serde(default)]
    pub unavailable_shifts: BTreeSet<ShiftType>,
}

impl Default for DayAvailability {
    fn default() -> Self {
        Self {
            available: true,
            preferred_shifts: BTreeSet::new(),
            unavailable_shifts: BTreeSet::new(),
        }
    }
}

impl DayAvailability {
    /// Fully available with the given preferred shifts.
    pub fn preferring(shifts: impl IntoIterator<Item = ShiftType>) -> Self {
        Self {
            preferred_shifts: shifts.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Not available at all.
    pub fn off() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Whether the given shift can be worked.
    #[inline]
    pub fn allows(&self, shift: ShiftType) -> bool {
        self.available && !self.unavailable_shifts.contains(&shift)
    }
}

/// Personal working limits. `None` defers to the policy default.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkingConstraints {
    /// Maximum night shifts on consecutive dates.
    pub max_consecutive_nights: Option<u32>,
    /// Regular weekly hour cap.
    pub max_weekly_hours: Option<u32>,
    /// Overtime hours allowed on top of the weekly cap.
    pub max_overtime_hours: Option<u32>,
    /// Minimum hours between the end of one shift and the start of the next.
    pub min_rest_hours: Option<u32>,
    /// Maximum working days in a row.
    pub max_consecutive_days: Option<u32>,
    /// Minimum days off per 7-day window.
    pub min_days_off_per_week: Option<u32>,
}

impl Nurse {
    /// Creates a staff nurse with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            code: String::new(),
            role: Role::Staff,
            qualifications: BTreeSet::new(),
            ward_access: WardAccess::All,
            availability: HashMap::new(),
            constraints: WorkingConstraints::default(),
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the staff code.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = code.into();
        self
    }

    /// Sets the role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = role;
        self
    }

    /// Adds a qualification.
    pub fn with_qualification(mut self, qualification: impl Into<String>) -> Self {
        self.qualifications.insert(qualification.into());
        self
    }

    /// Restricts the nurse to the given wards.
    pub fn with_ward_access<I, S>(mut self, wards: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ward_access = WardAccess::Only(wards.into_iter().map(Into::into).collect());
        self
    }

    /// Sets availability for one weekday.
    pub fn with_availability(mut self, weekday: Weekday, availability: DayAvailability) -> Self {
        self.availability.insert(weekday, availability);
        self
    }

    /// Sets the working limits.
    pub fn with_constraints(mut self, constraints: WorkingConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Sets the consecutive-night limit.
    pub fn with_max_consecutive_nights(mut self, nights: u32) -> Self {
        self.constraints.max_consecutive_nights = Some(nights);
        self
    }

    /// Sets the weekly hour cap.
    pub fn with_max_weekly_hours(mut self, hours: u32) -> Self {
        self.constraints.max_weekly_hours = Some(hours);
        self
    }

    /// Hierarchy level derived from the role.
    #[inline]
    pub fn hierarchy_level(&self) -> u8 {
        self.role.hierarchy_level()
    }

    /// Whether this nurse holds a qualification.
    pub fn has_qualification(&self, name: &str) -> bool {
        self.qualifications.contains(name)
    }

    /// Availability entry for a weekday, if any was provided.
    pub fn availability_on(&self, weekday: Weekday) -> Option<&DayAvailability> {
        self.availability.get(&weekday)
    }

    /// Whether the nurse can work `shift` on `weekday`.
    ///
    /// `assume_available` decides the answer when no entry exists.
    pub fn is_available(&self, weekday: Weekday, shift: ShiftType, assume_available: bool) -> bool {
        match self.availability_on(weekday) {
            Some(day) => day.allows(shift),
            None => assume_available,
        }
    }

    /// Whether `shift` is among the preferred shifts for `weekday`.
    ///
    /// Returns `None` when no preference was expressed for that day.
    pub fn prefers(&self, weekday: Weekday, shift: ShiftType) -> Option<bool> {
        self.availability_on(weekday)
            .filter(|day| !day.preferred_shifts.is_empty())
            .map(|day| day.preferred_shifts.contains(&shift))
    }
}
