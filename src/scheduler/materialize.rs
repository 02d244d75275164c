//! Schedule materialization.
//!
//! Turns the best chromosome into the caller-facing schedule: nurse
//! assignments keyed by date, ward and shift, per-nurse statistics and
//! a quality report. Pure and deterministic; every map is ordered so
//! repeated materialization serializes byte-identically.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Coverage % | `min(100, assigned / required * 100)`, 100 when nothing is required |
//! | Overtime | hours past `max_weekly_hours` within a week bucket |
//! | Preference rate | share of the nurse's shifts on a preferred shift (1.0 with no shifts) |
//! | Max consecutive nights | longest run of nights on adjacent dates |

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::constraints::{ConstraintEvaluator, NurseShift};
use crate::error::Result;
use crate::ga::{
    FitnessEvaluator, Individual, RosterChromosome, RosterProblem, SubScores, TerminationReason,
};
use crate::models::{Role, ShiftType, Violation};

/// Nurse assigned to one shift.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignedNurse {
    pub nurse_id: String,
    pub name: String,
    pub role: Role,
    pub hours: u32,
    /// Qualifications held at scheduling time.
    pub qualifications: Vec<String>,
    /// Whether this shift pushes the nurse past the regular weekly cap.
    pub overtime: bool,
}

/// Staffing of one (date, ward, shift).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRoster {
    pub required: u32,
    pub required_charge: u32,
    pub assigned: Vec<AssignedNurse>,
    pub coverage_percent: f64,
}

/// Aggregates for one nurse over the whole range.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NurseStatistics {
    pub total_hours: u32,
    pub day_shifts: u32,
    pub evening_shifts: u32,
    pub night_shifts: u32,
    pub max_consecutive_nights: u32,
    pub overtime_hours: u32,
    /// In [0, 1].
    pub preference_satisfaction_rate: f64,
    pub days_worked: u32,
}

/// Quality of the returned schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityReport {
    /// Weighted fitness in [0, 1].
    pub overall_score: f64,
    /// Sub-scores in [0, 100].
    pub scores: SubScores,
    pub violations: Vec<Violation>,
    pub critical_violations: usize,
    /// Generations evolved after the initial population.
    pub generations: usize,
    pub elapsed_ms: u64,
    /// Whether the success threshold was reached.
    pub converged: bool,
    pub termination: TerminationReason,
}

/// Run facts recorded in the quality report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    pub generations: usize,
    pub elapsed_ms: u64,
    pub termination: TerminationReason,
}

/// Caller-facing schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterializedSchedule {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// date → ward id → shift → roster.
    pub days: BTreeMap<NaiveDate, BTreeMap<String, BTreeMap<ShiftType, ShiftRoster>>>,
    /// nurse id → statistics. Every nurse is listed.
    pub nurse_stats: BTreeMap<String, NurseStatistics>,
    pub quality: QualityReport,
}

impl MaterializedSchedule {
    /// Roster of one (date, ward, shift), if the ward exists.
    pub fn shift(&self, date: NaiveDate, ward_id: &str, shift: ShiftType) -> Option<&ShiftRoster> {
        self.days.get(&date)?.get(ward_id)?.get(&shift)
    }

    /// Total assignments across the range.
    pub fn assignment_count(&self) -> usize {
        self.days
            .values()
            .flat_map(|wards| wards.values())
            .flat_map(|shifts| shifts.values())
            .map(|roster| roster.assigned.len())
            .sum()
    }
}

/// Builds [`MaterializedSchedule`]s for one problem.
pub struct ScheduleMaterializer<'a> {
    problem: &'a RosterProblem,
}

impl<'a> ScheduleMaterializer<'a> {
    pub fn new(problem: &'a RosterProblem) -> Self {
        Self { problem }
    }

    /// Materializes a chromosome.
    ///
    /// Uses the chromosome's stored evaluation when present, otherwise
    /// evaluates it first.
    ///
    /// # Errors
    /// [`RosterError::Internal`](crate::RosterError::Internal) if the
    /// chromosome is structurally malformed.
    pub fn materialize(
        &self,
        chromosome: &RosterChromosome,
        run: RunSummary,
    ) -> Result<MaterializedSchedule> {
        let p = self.problem;
        chromosome.check_structure(p)?;
        let (fitness, violations) = match chromosome.fitness() {
            Some(fitness) => (fitness, chromosome.violations().to_vec()),
            None => {
                let report = FitnessEvaluator::new(p).evaluate(chromosome)?;
                (report.fitness, report.violations)
            }
        };

        let timelines = ConstraintEvaluator::new(p).nurse_timelines(chromosome);
        let overtime = self.overtime_flags(&timelines);

        let mut days = BTreeMap::new();
        for (d, &date) in p.dates().iter().enumerate() {
            let mut wards = BTreeMap::new();
            for (w, ward) in p.wards().iter().enumerate() {
                let mut shifts = BTreeMap::new();
                for shift in ShiftType::ALL {
                    let slot = p.slot_index(d, w, shift);
                    let requirement = p.slot(slot).requirement;
                    let assigned: Vec<AssignedNurse> = chromosome
                        .slot(slot)
                        .iter()
                        .map(|&n| {
                            let nurse = &p.nurses()[n];
                            AssignedNurse {
                                nurse_id: nurse.id.clone(),
                                name: nurse.name.clone(),
                                role: nurse.role,
                                hours: shift.hours(),
                                qualifications: nurse.qualifications.iter().cloned().collect(),
                                overtime: overtime.get(&(n, d)).copied().unwrap_or(false),
                            }
                        })
                        .collect();
                    let required = requirement.total();
                    shifts.insert(
                        shift,
                        ShiftRoster {
                            required,
                            required_charge: requirement.charge_nurses,
                            coverage_percent: coverage_percent(assigned.len(), required),
                            assigned,
                        },
                    );
                }
                wards.insert(ward.id.clone(), shifts);
            }
            days.insert(date, wards);
        }

        let nurse_stats = timelines
            .iter()
            .enumerate()
            .map(|(n, timeline)| (p.nurses()[n].id.clone(), self.statistics(n, timeline)))
            .collect();

        let critical_violations = violations.iter().filter(|v| v.is_critical()).count();
        Ok(MaterializedSchedule {
            start_date: p.dates().first().copied().unwrap_or_default(),
            end_date: p.dates().last().copied().unwrap_or_default(),
            days,
            nurse_stats,
            quality: QualityReport {
                overall_score: fitness.score,
                scores: fitness.scores,
                violations,
                critical_violations,
                generations: run.generations,
                elapsed_ms: run.elapsed_ms,
                converged: run.termination == TerminationReason::Converged,
                termination: run.termination,
            },
        })
    }

    /// `(nurse, date)` pairs whose shift ends past the regular weekly cap.
    fn overtime_flags(&self, timelines: &[Vec<NurseShift>]) -> BTreeMap<(usize, usize), bool> {
        let p = self.problem;
        let mut flags = BTreeMap::new();
        for (n, timeline) in timelines.iter().enumerate() {
            let cap = p.limits(n).max_weekly_hours;
            let mut week = None;
            let mut running = 0;
            for a in timeline {
                let bucket = p.week_of(a.date);
                if week != Some(bucket) {
                    week = Some(bucket);
                    running = 0;
                }
                running += a.shift.hours();
                flags.insert((n, a.date), running > cap);
            }
        }
        flags
    }

    fn statistics(&self, nurse: usize, timeline: &[NurseShift]) -> NurseStatistics {
        let p = self.problem;
        let neutral = p.policy().neutral_without_preferences;
        let cap = p.limits(nurse).max_weekly_hours;
        let mut stats = NurseStatistics::default();

        let mut weekly: BTreeMap<usize, u32> = BTreeMap::new();
        let mut satisfied = 0u32;
        let mut streak = 0u32;
        let mut last_night: Option<usize> = None;

        for a in timeline {
            let hours = a.shift.hours();
            stats.total_hours += hours;
            stats.days_worked += 1;
            *weekly.entry(p.week_of(a.date)).or_default() += hours;
            match a.shift {
                ShiftType::Day => stats.day_shifts += 1,
                ShiftType::Evening => stats.evening_shifts += 1,
                ShiftType::Night => {
                    stats.night_shifts += 1;
                    streak = match last_night {
                        Some(prev) if prev + 1 == a.date => streak + 1,
                        _ => 1,
                    };
                    last_night = Some(a.date);
                    stats.max_consecutive_nights = stats.max_consecutive_nights.max(streak);
                }
            }
            if p.nurses()[nurse]
                .prefers(p.weekday(a.date), a.shift)
                .unwrap_or(neutral)
            {
                satisfied += 1;
            }
        }

        stats.overtime_hours = weekly.values().map(|&h| h.saturating_sub(cap)).sum();
        stats.preference_satisfaction_rate = if timeline.is_empty() {
            1.0
        } else {
            f64::from(satisfied) / timeline.len() as f64
        };
        stats
    }
}

fn coverage_percent(assigned: usize, required: u32) -> f64 {
    if required == 0 {
        100.0
    } else {
        (assigned as f64 / f64::from(required) * 100.0).min(100.0)
    }
}
