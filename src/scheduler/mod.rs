//! Rostering entry point and schedule materialization.
//!
//! [`RosterScheduler`] validates settings and input, indexes the request,
//! runs the genetic search and materializes the best roster.
//!
//! # Pipeline
//!
//! 1. `SchedulerSettings::validate` and [`validate_input`]; any problem
//!    is returned before the search starts.
//! 2. [`RosterProblem::new`] builds eligible pools and hard blocks.
//! 3. [`GaRunner::run`] evolves the population.
//! 4. [`ScheduleMaterializer`] turns the best roster into the output.
//!
//! Not reaching the success threshold is not an error: the best roster
//! found is returned with its quality report.

mod materialize;
mod request;

pub use materialize::{
    AssignedNurse, MaterializedSchedule, NurseStatistics, QualityReport, RunSummary,
    ScheduleMaterializer, ShiftRoster,
};
pub use request::RosterRequest;

use tracing::info;

use crate::config::SchedulerSettings;
use crate::error::Result;
use crate::ga::{
    GaConfig, GaRunner, GenerationStats, RosterFitness, RosterProblem, TerminationReason,
};
use crate::validation::validate_input;

/// Result of one optimization run.
#[derive(Debug, Clone)]
pub struct RosterOutcome {
    pub schedule: MaterializedSchedule,
    /// Convergence history, one entry per evaluated generation.
    pub history: Vec<GenerationStats>,
    pub best_fitness: RosterFitness,
    pub termination: TerminationReason,
}

/// GA-based nurse roster optimizer.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use u_roster::config::SchedulerSettings;
/// use u_roster::models::{Nurse, ShiftType, Ward};
/// use u_roster::scheduler::{RosterRequest, RosterScheduler};
///
/// let start = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
/// let end = NaiveDate::from_ymd_opt(2025, 11, 12).unwrap();
/// let request = RosterRequest::new(start, end)
///     .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
///     .with_nurse(Nurse::new("N1"))
///     .with_nurse(Nurse::new("N2"));
///
/// let settings = SchedulerSettings::default()
///     .with_population_size(20)
///     .with_max_generations(10)
///     .with_seed(1);
/// let outcome = RosterScheduler::new(settings).optimize(&request).unwrap();
///
/// let roster = outcome.schedule.shift(start, "W1", ShiftType::Day).unwrap();
/// assert_eq!(roster.assigned.len(), 1);
/// assert_eq!(outcome.schedule.quality.critical_violations, 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RosterScheduler {
    settings: SchedulerSettings,
}

impl RosterScheduler {
    pub fn new(settings: SchedulerSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// Optimizes a roster for the request.
    ///
    /// # Errors
    /// - [`RosterError::Config`](crate::RosterError::Config) for invalid settings
    /// - [`RosterError::InvalidInput`](crate::RosterError::InvalidInput) with every input
    ///   problem found
    /// - [`RosterError::Internal`](crate::RosterError::Internal) if an invariant breaks
    ///   during the run
    pub fn optimize(&self, request: &RosterRequest) -> Result<RosterOutcome> {
        self.settings.validate()?;
        validate_input(request, self.settings.policy.qualification_policy)?;

        let problem = RosterProblem::new(request, &self.settings);
        info!(
            event = "optimize_start",
            dates = problem.date_count(),
            wards = problem.wards().len(),
            nurses = problem.nurses().len(),
            slots = problem.slot_count(),
            blocked = problem.blocked_count(),
            seed = ?self.settings.seed,
        );

        let result = GaRunner::run(&problem, &GaConfig::from(&self.settings))?;
        let elapsed_ms = u64::try_from(result.elapsed.as_millis()).unwrap_or(u64::MAX);
        let schedule = ScheduleMaterializer::new(&problem).materialize(
            &result.best,
            RunSummary {
                generations: result.generations,
                elapsed_ms,
                termination: result.termination,
            },
        )?;

        info!(
            event = "optimize_end",
            generations = result.generations,
            best_fitness = result.best_fitness.score,
            critical = result.best_fitness.critical,
            assignments = schedule.assignment_count(),
            elapsed_ms,
            converged = schedule.quality.converged,
            termination = ?result.termination,
        );

        Ok(RosterOutcome {
            schedule,
            history: result.history,
            best_fitness: result.best_fitness,
            termination: result.termination,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EvaluatorPolicy;
    use crate::error::RosterError;
    use crate::models::{Nurse, ShiftType, UnavailabilityConstraint, ViolationType, Ward};
    use crate::validation::ValidationErrorKind;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn settings(seed: u64) -> SchedulerSettings {
        SchedulerSettings::default()
            .with_population_size(20)
            .with_max_generations(15)
            .with_seed(seed)
    }

    fn three_shift_request() -> RosterRequest {
        RosterRequest::new(d(10), d(16))
            .with_ward(
                Ward::new("W1")
                    .with_requirement(ShiftType::Day, 1, 0)
                    .with_requirement(ShiftType::Evening, 1, 0)
                    .with_requirement(ShiftType::Night, 1, 0),
            )
            .with_nurse(Nurse::new("N1"))
            .with_nurse(Nurse::new("N2"))
            .with_nurse(Nurse::new("N3"))
            .with_nurse(Nurse::new("N4"))
    }

    #[test]
    fn test_two_nurses_fill_day_shift() {
        let request = RosterRequest::new(d(10), d(14))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 2, 0))
            .with_nurse(Nurse::new("N1"))
            .with_nurse(Nurse::new("N2"));
        let outcome = RosterScheduler::new(settings(1)).optimize(&request).unwrap();
        let schedule = &outcome.schedule;

        for date in request.dates() {
            let day = schedule.shift(date, "W1", ShiftType::Day).unwrap();
            assert!((day.coverage_percent - 100.0).abs() < 1e-10, "{date}");
        }
        assert!(schedule
            .quality
            .violations
            .iter()
            .all(|v| v.shift != Some(ShiftType::Day)));
        assert_eq!(schedule.nurse_stats["N1"].total_hours, 40);
        assert_eq!(outcome.termination, TerminationReason::Converged);
    }

    #[test]
    fn test_blocked_day_shift_respected() {
        let request = three_shift_request().with_constraint(
            UnavailabilityConstraint::new("N1", d(1), d(30))
                .with_blocked(d(15), [ShiftType::Day])
                .approved(),
        );
        let outcome = RosterScheduler::new(settings(2)).optimize(&request).unwrap();
        let day = outcome.schedule.shift(d(15), "W1", ShiftType::Day).unwrap();

        assert!(day.assigned.iter().all(|a| a.nurse_id != "N1"));
        assert_eq!(day.assigned.len(), 1);
        assert_eq!(outcome.schedule.quality.critical_violations, 0);
    }

    #[test]
    fn test_hard_constraint_holds_across_seeds() {
        for seed in 0..100u64 {
            let nurse = format!("N{}", seed % 4 + 1);
            let date = d(10 + (seed % 7) as u32);
            let shift = ShiftType::ALL[(seed % 3) as usize];
            let request = three_shift_request().with_constraint(
                UnavailabilityConstraint::new(nurse.clone(), d(1), d(30))
                    .with_blocked(date, [shift])
                    .approved(),
            );
            let settings = settings(seed)
                .with_population_size(8)
                .with_max_generations(4)
                .with_parallel(false);
            let outcome = RosterScheduler::new(settings).optimize(&request).unwrap();

            let roster = outcome.schedule.shift(date, "W1", shift).unwrap();
            assert!(
                roster.assigned.iter().all(|a| a.nurse_id != nurse),
                "seed {seed}: {nurse} assigned on blocked {date} {shift}"
            );
            assert_eq!(outcome.schedule.quality.critical_violations, 0, "seed {seed}");
        }
    }

    #[test]
    fn test_same_seed_same_schedule() {
        let request = three_shift_request();
        let a = RosterScheduler::new(settings(7)).optimize(&request).unwrap();
        let b = RosterScheduler::new(settings(7).with_parallel(false))
            .optimize(&request)
            .unwrap();

        assert_eq!(
            serde_json::to_string(&a.schedule.days).unwrap(),
            serde_json::to_string(&b.schedule.days).unwrap()
        );
        assert_eq!(a.schedule.nurse_stats, b.schedule.nurse_stats);
        assert_eq!(a.history, b.history);
    }

    #[test]
    fn test_history_tracks_generations() {
        let settings = settings(3).with_success_threshold(1.0);
        let outcome = RosterScheduler::new(settings)
            .optimize(&three_shift_request())
            .unwrap();

        assert_eq!(outcome.history.len(), outcome.schedule.quality.generations + 1);
        assert!(!outcome.schedule.quality.converged);
        let last = outcome.history.last().unwrap();
        assert!(outcome.best_fitness.score >= last.best_fitness - 1e-12);
    }

    #[test]
    fn test_starved_date_is_not_an_error() {
        let request = RosterRequest::new(d(10), d(12))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1"))
            .with_constraint(
                UnavailabilityConstraint::new("N1", d(1), d(30))
                    .with_blocked_day(d(11))
                    .approved(),
            );
        let outcome = RosterScheduler::new(settings(4)).optimize(&request).unwrap();

        let starved = outcome.schedule.shift(d(11), "W1", ShiftType::Day).unwrap();
        assert!(starved.assigned.is_empty());
        assert!((starved.coverage_percent - 0.0).abs() < 1e-10);
        assert!(outcome
            .schedule
            .quality
            .violations
            .iter()
            .any(|v| v.date == d(11) && v.nurse_id.is_none()));
    }

    #[test]
    fn test_invalid_input_rejected() {
        let request = RosterRequest::new(d(10), d(12)).with_nurse(Nurse::new("N1"));
        let err = RosterScheduler::new(settings(1)).optimize(&request).unwrap_err();
        match err {
            RosterError::InvalidInput(errors) => {
                assert!(errors.iter().any(|e| e.kind == ValidationErrorKind::NoWards));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unstaffable_ward_rejected() {
        let request = RosterRequest::new(d(10), d(12))
            .with_ward(
                Ward::new("ICU")
                    .with_required_qualification("icu")
                    .with_requirement(ShiftType::Night, 1, 0),
            )
            .with_nurse(Nurse::new("N1"));
        let err = RosterScheduler::new(settings(1)).optimize(&request).unwrap_err();
        assert!(matches!(err, RosterError::InvalidInput(_)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let bad = settings(1).with_population_size(0);
        let err = RosterScheduler::new(bad).optimize(&three_shift_request()).unwrap_err();
        assert!(matches!(err, RosterError::Config(_)));

        let bad_policy = settings(1).with_policy(EvaluatorPolicy {
            fairness_variance_scale: 0.0,
            ..EvaluatorPolicy::default()
        });
        assert!(RosterScheduler::new(bad_policy)
            .optimize(&three_shift_request())
            .is_err());
    }

    #[test]
    fn test_strict_policy_never_breaks_night_limit() {
        // One nurse, nights on 4 consecutive dates, limit of 2
        let request = RosterRequest::new(d(10), d(13))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Night, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_consecutive_nights(2));
        let strict = EvaluatorPolicy {
            allow_constraint_override_on_starvation: false,
            expected_max_violations: Some(1000.0),
            ..EvaluatorPolicy::default()
        };

        for seed in [1, 2, 3] {
            let settings = settings(seed)
                .with_success_threshold(1.0)
                .with_policy(strict.clone());
            let outcome = RosterScheduler::new(settings).optimize(&request).unwrap();
            let schedule = &outcome.schedule;

            let nights = schedule
                .quality
                .violations
                .iter()
                .filter(|v| v.violation_type == ViolationType::MaxConsecutiveNights)
                .count();
            assert_eq!(nights, 0, "seed {seed}");
            assert_eq!(schedule.assignment_count(), 3, "seed {seed}");
            let third = schedule.shift(d(12), "W1", ShiftType::Night).unwrap();
            assert!(third.assigned.is_empty(), "seed {seed}");
        }
    }
}
