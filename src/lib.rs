//! Nurse rostering for the U-Engine ecosystem.
//!
//! Builds multi-week, multi-ward nurse rosters with a genetic algorithm.
//! Approved unavailability requests are hard constraints; working-time
//! rules (consecutive nights, weekly hours, rest, days off) are soft and
//! scored.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Nurse`, `Ward`, `ShiftType`,
//!   `UnavailabilityConstraint`, `Violation`
//! - **`validation`**: Input integrity checks (duplicate IDs, date range,
//!   request windows, unstaffable wards)
//! - **`config`**: Run settings, fitness weights and the `EvaluatorPolicy`
//! - **`constraints`**: Rule-violation detection
//! - **`ga`**: Generic GA runner plus the roster encoding, factory,
//!   fitness and operators
//! - **`scheduler`**: `RosterScheduler` entry point and schedule materialization
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use u_roster::{Nurse, RosterRequest, RosterScheduler, SchedulerSettings, ShiftType, Ward};
//!
//! let start = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
//! let end = NaiveDate::from_ymd_opt(2025, 11, 16).unwrap();
//! let request = RosterRequest::new(start, end)
//!     .with_ward(
//!         Ward::new("W1")
//!             .with_requirement(ShiftType::Day, 2, 0)
//!             .with_requirement(ShiftType::Night, 1, 0),
//!     )
//!     .with_nurse(Nurse::new("N1"))
//!     .with_nurse(Nurse::new("N2"))
//!     .with_nurse(Nurse::new("N3"))
//!     .with_nurse(Nurse::new("N4"));
//!
//! let settings = SchedulerSettings::default()
//!     .with_population_size(30)
//!     .with_max_generations(20)
//!     .with_seed(42);
//! let outcome = RosterScheduler::new(settings).optimize(&request).unwrap();
//! assert_eq!(outcome.schedule.days.len(), 7);
//! ```
//!
//! # References
//!
//! - Burke et al. (2004), "The State of the Art of Nurse Rostering"
//! - Cheang et al. (2003), "Nurse rostering problems: a bibliographic survey"

pub mod config;
pub mod constraints;
pub mod error;
pub mod ga;
pub mod models;
pub mod scheduler;
pub mod validation;

pub use config::{EvaluatorPolicy, FitnessWeights, QualificationPolicy, SchedulerSettings};
pub use error::{ConfigError, Result, RosterError};
pub use models::{
    Nurse, Role, Severity, ShiftType, UnavailabilityConstraint, Violation, ViolationType, Ward,
};
pub use scheduler::{
    MaterializedSchedule, QualityReport, RosterOutcome, RosterRequest, RosterScheduler,
};
