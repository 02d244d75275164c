//! Rostering domain models.
//!
//! Plain data types describing the rostering problem and its results.
//! The scheduling core reads these; it never mutates nurse, ward, or
//! request records during a run.
//!
//! | Type | Role |
//! |------|------|
//! | `Nurse` | Resource being rostered |
//! | `Ward` | Demand: staffing requirement per shift |
//! | `ShiftType` | DAY / EVENING / NIGHT |
//! | `UnavailabilityConstraint` | Hard block requested by a nurse |
//! | `Violation` | Rule breach found in a roster |

mod nurse;
mod shift;
mod unavailability;
mod violation;
mod ward;

pub use nurse::{DayAvailability, Nurse, Role, WardAccess, WorkingConstraints};
pub use shift::{ShiftType, SHIFT_HOURS};
pub use unavailability::{BlockedDate, RequestStatus, UnavailabilityConstraint};
pub use violation::{Severity, Violation, ViolationType};
pub use ward::{ShiftRequirements, StaffingRequirement, Ward};
