//! Multi-objective roster fitness.
//!
//! Five sub-scores, each in [0, 100], combined as a weighted mean and
//! scaled to [0, 1]:
//!
//! | Sub-score | Definition |
//! |-----------|-----------|
//! | Coverage | mean over slots of `min(assigned, required) / required` (required 0 = 1) |
//! | Fairness | `1 / (1 + var(hours) / scale)`, every nurse counted |
//! | Preferences | share of assignments on a preferred shift |
//! | Constraints | `1 - violation_mass / expected_max`, clipped |
//! | Qualifications | share of assignments matching the ward under the qualification policy |
//!
//! Hard-constraint breaches are ranked lexicographically: a roster with
//! fewer CRITICAL violations always ranks above one with more,
//! whatever the weighted score.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::chromosome::RosterChromosome;
use super::problem::RosterProblem;
use super::types::Fitness;
use crate::config::FitnessWeights;
use crate::constraints::{ConstraintEvaluator, NurseShift};
use crate::error::{Result, RosterError};
use crate::models::Violation;

/// Sub-scores, each in [0, 100].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SubScores {
    pub coverage: f64,
    pub fairness: f64,
    pub preferences: f64,
    pub constraints: f64,
    pub qualifications: f64,
}

impl SubScores {
    /// Weighted mean in [0, 100].
    pub fn weighted(&self, weights: &FitnessWeights) -> f64 {
        let total = weights.total();
        if total <= 0.0 {
            return 0.0;
        }
        (self.coverage * weights.coverage
            + self.fairness * weights.fairness
            + self.preferences * weights.preferences
            + self.constraints * weights.constraints
            + self.qualifications * weights.qualifications)
            / total
    }
}

/// Fitness of one roster.
///
/// Ordered by CRITICAL count (fewer is better), then by `score`
/// (higher is better).
#[derive(Debug, Clone, Copy, Default)]
pub struct RosterFitness {
    /// Weighted score in [0, 1].
    pub score: f64,
    /// Number of CRITICAL violations.
    pub critical: usize,
    /// Sub-scores behind `score`.
    pub scores: SubScores,
}

impl PartialEq for RosterFitness {
    fn eq(&self, other: &Self) -> bool {
        self.critical == other.critical && self.score == other.score
    }
}

impl PartialOrd for RosterFitness {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match other.critical.cmp(&self.critical) {
            Ordering::Equal => self.score.partial_cmp(&other.score),
            ord => Some(ord),
        }
    }
}

impl Fitness for RosterFitness {
    fn to_f64(self) -> f64 {
        self.score
    }

    fn reaches(self, threshold: f64) -> bool {
        self.critical == 0 && self.score >= threshold
    }
}

/// Result of evaluating one roster.
#[derive(Debug, Clone)]
pub struct FitnessReport {
    pub fitness: RosterFitness,
    pub violations: Vec<Violation>,
}

/// Scores rosters of one problem.
pub struct FitnessEvaluator<'a> {
    problem: &'a RosterProblem,
}

impl<'a> FitnessEvaluator<'a> {
    pub fn new(problem: &'a RosterProblem) -> Self {
        Self { problem }
    }

    /// Evaluates a roster.
    ///
    /// # Errors
    /// [`RosterError::Internal`] if the roster is structurally malformed
    /// or the score is not finite.
    pub fn evaluate(&self, chromosome: &RosterChromosome) -> Result<FitnessReport> {
        let p = self.problem;
        chromosome.check_structure(p)?;

        let constraints = ConstraintEvaluator::new(p);
        let timelines = constraints.nurse_timelines(chromosome);
        let violations = constraints.evaluate_timelines(chromosome, &timelines);

        let scores = SubScores {
            coverage: self.coverage(chromosome),
            fairness: self.fairness(&timelines),
            preferences: self.preferences(&timelines),
            constraints: self.constraint_compliance(&violations),
            qualifications: self.qualifications(&timelines),
        };
        let score = scores.weighted(p.weights()) / 100.0;
        if !score.is_finite() {
            return Err(RosterError::Internal(format!("non-finite fitness: {scores:?}")));
        }

        Ok(FitnessReport {
            fitness: RosterFitness {
                score: score.clamp(0.0, 1.0),
                critical: violations.iter().filter(|v| v.is_critical()).count(),
                scores,
            },
            violations,
        })
    }

    /// Coverage sub-score.
    pub fn coverage(&self, chromosome: &RosterChromosome) -> f64 {
        let slots = self.problem.slots();
        if slots.is_empty() {
            return 100.0;
        }
        let sum: f64 = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let required = slot.requirement.total() as usize;
                if required == 0 {
                    1.0
                } else {
                    chromosome.slot(i).len().min(required) as f64 / required as f64
                }
            })
            .sum();
        100.0 * sum / slots.len() as f64
    }

    /// Fairness sub-score from per-nurse hours.
    pub fn fairness(&self, timelines: &[Vec<NurseShift>]) -> f64 {
        let hours: Vec<f64> = timelines
            .iter()
            .map(|t| t.iter().map(|a| f64::from(a.shift.hours())).sum())
            .collect();
        fairness_score(&hours, self.problem.policy().fairness_variance_scale)
    }

    /// Preference sub-score.
    pub fn preferences(&self, timelines: &[Vec<NurseShift>]) -> f64 {
        let p = self.problem;
        let neutral = p.policy().neutral_without_preferences;
        let mut total = 0usize;
        let mut hits = 0usize;
        for (nurse, timeline) in timelines.iter().enumerate() {
            for a in timeline {
                total += 1;
                let satisfied = p.nurses()[nurse]
                    .prefers(p.weekday(a.date), a.shift)
                    .unwrap_or(neutral);
                if satisfied {
                    hits += 1;
                }
            }
        }
        ratio_score(hits, total)
    }

    /// Constraint-compliance sub-score.
    pub fn constraint_compliance(&self, violations: &[Violation]) -> f64 {
        let policy = self.problem.policy();
        let mass: f64 = violations.iter().map(|v| policy.severity_weight(v.severity)).sum();
        100.0 * (1.0 - mass / self.problem.expected_max_violations()).clamp(0.0, 1.0)
    }

    /// Qualification sub-score.
    pub fn qualifications(&self, timelines: &[Vec<NurseShift>]) -> f64 {
        let p = self.problem;
        let policy = p.policy().qualification_policy;
        let mut total = 0usize;
        let mut hits = 0usize;
        for (nurse, timeline) in timelines.iter().enumerate() {
            for a in timeline {
                total += 1;
                if p.wards()[a.ward].qualification_match(&p.nurses()[nurse], policy) {
                    hits += 1;
                }
            }
        }
        ratio_score(hits, total)
    }
}

/// `100 / (1 + variance / scale)` over every value; empty input scores 100.
pub fn fairness_score(hours: &[f64], scale: f64) -> f64 {
    if hours.is_empty() {
        return 100.0;
    }
    let n = hours.len() as f64;
    let mean = hours.iter().sum::<f64>() / n;
    let variance = hours.iter().map(|h| (h - mean).powi(2)).sum::<f64>() / n;
    100.0 / (1.0 + variance / scale)
}

fn ratio_score(hits: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * hits as f64 / total as f64
    }
}
