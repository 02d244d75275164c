//! Rostering GA problem definition.
//!
//! [`RosterProblem`] indexes the request once per run (dates, wards,
//! nurses, hard blocks, eligible pools per slot) and implements
//! [`GaProblem`] on top of that read-only index.
//!
//! # Slot layout
//!
//! Slot `(date, ward, shift)` lives at `(date * wards + ward) * 3 + shift`,
//! so every date owns one contiguous run of `wards * 3` slots.

use std::collections::{HashMap, HashSet};
use std::ops::Range;

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::Rng;

use super::chromosome::RosterChromosome;
use super::factory::IndividualFactory;
use super::fitness::FitnessEvaluator;
use super::operators::{date_cut_crossover, mutate, repair};
use super::types::GaProblem;
use crate::config::{EvaluatorPolicy, FitnessWeights, NurseLimits, SchedulerSettings};
use crate::error::Result;
use crate::models::{Nurse, ShiftType, StaffingRequirement, Ward};
use crate::scheduler::RosterRequest;

/// One (date, ward, shift) position of the roster.
#[derive(Debug, Clone)]
pub struct SlotInfo {
    pub date_index: usize,
    pub ward_index: usize,
    pub shift: ShiftType,
    pub requirement: StaffingRequirement,
    /// Nurses passing every hard filter for this slot, sorted ascending.
    pub eligible: Vec<usize>,
}

/// Indexed, read-only view of one rostering request.
#[derive(Debug, Clone)]
pub struct RosterProblem {
    dates: Vec<NaiveDate>,
    wards: Vec<Ward>,
    nurses: Vec<Nurse>,
    limits: Vec<NurseLimits>,
    slots: Vec<SlotInfo>,
    /// (nurse, date, shift) triples blocked by approved requests.
    blocked: HashSet<(usize, usize, ShiftType)>,
    week_of: Vec<usize>,
    week_starts: Vec<NaiveDate>,
    policy: EvaluatorPolicy,
    weights: FitnessWeights,
    enforce_availability: bool,
    allow_overtime: bool,
    expected_max_violations: f64,
}

impl RosterProblem {
    /// Indexes a request. Assumes the request already passed validation.
    pub fn new(request: &RosterRequest, settings: &SchedulerSettings) -> Self {
        let policy = settings.policy.clone();
        let dates: Vec<NaiveDate> = request.dates().collect();
        let date_index: HashMap<NaiveDate, usize> =
            dates.iter().enumerate().map(|(i, &d)| (d, i)).collect();
        let nurse_index: HashMap<&str, usize> = request
            .nurses
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id.as_str(), i))
            .collect();

        let mut blocked = HashSet::new();
        for constraint in &request.constraints {
            let Some(&n) = nurse_index.get(constraint.nurse_id.as_str()) else {
                continue;
            };
            for (date, shift) in constraint.binding_pairs() {
                if let Some(&d) = date_index.get(&date) {
                    blocked.insert((n, d, shift));
                }
            }
        }

        let mut week_of = Vec::with_capacity(dates.len());
        let mut week_starts: Vec<NaiveDate> = Vec::new();
        for &date in &dates {
            let start = week_start_of(date, policy.week_start);
            if week_starts.last() != Some(&start) {
                week_starts.push(start);
            }
            week_of.push(week_starts.len() - 1);
        }

        let limits = request
            .nurses
            .iter()
            .map(|n| policy.limits_for(n, settings.allow_overtime))
            .collect();

        let mut problem = Self {
            dates,
            wards: request.wards.clone(),
            nurses: request.nurses.clone(),
            limits,
            slots: Vec::new(),
            blocked,
            week_of,
            week_starts,
            policy,
            weights: settings.weights,
            enforce_availability: settings.enforce_availability,
            allow_overtime: settings.allow_overtime,
            expected_max_violations: 1.0,
        };
        problem.slots = problem.build_slots();
        let required: u32 = problem.slots.iter().map(|s| s.requirement.total()).sum();
        problem.expected_max_violations = problem
            .policy
            .expected_max_violations
            .unwrap_or_else(|| f64::from(required.max(1)));
        problem
    }

    fn build_slots(&self) -> Vec<SlotInfo> {
        let qualification_policy = self.policy.qualification_policy;
        let admitted: Vec<Vec<usize>> = self
            .wards
            .iter()
            .map(|ward| {
                (0..self.nurses.len())
                    .filter(|&n| ward.admits(&self.nurses[n], qualification_policy))
                    .collect()
            })
            .collect();

        let mut slots = Vec::with_capacity(self.dates.len() * self.wards.len() * ShiftType::COUNT);
        for d in 0..self.dates.len() {
            for (w, ward) in self.wards.iter().enumerate() {
                for shift in ShiftType::ALL {
                    let eligible = admitted[w]
                        .iter()
                        .copied()
                        .filter(|&n| !self.is_blocked(n, d, shift))
                        .filter(|&n| !self.enforce_availability || self.is_available(n, d, shift))
                        .collect();
                    slots.push(SlotInfo {
                        date_index: d,
                        ward_index: w,
                        shift,
                        requirement: ward.requirement(shift),
                        eligible,
                    });
                }
            }
        }
        slots
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn wards(&self) -> &[Ward] {
        &self.wards
    }

    pub fn nurses(&self) -> &[Nurse] {
        &self.nurses
    }

    pub fn slots(&self) -> &[SlotInfo] {
        &self.slots
    }

    pub fn policy(&self) -> &EvaluatorPolicy {
        &self.policy
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn enforce_availability(&self) -> bool {
        self.enforce_availability
    }

    pub fn allow_overtime(&self) -> bool {
        self.allow_overtime
    }

    /// Violation mass at which the constraint sub-score reaches zero.
    pub fn expected_max_violations(&self) -> f64 {
        self.expected_max_violations
    }

    #[inline]
    pub fn date_count(&self) -> usize {
        self.dates.len()
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slots per date.
    #[inline]
    pub fn slots_per_date(&self) -> usize {
        self.wards.len() * ShiftType::COUNT
    }

    #[inline]
    pub fn slot_index(&self, date: usize, ward: usize, shift: ShiftType) -> usize {
        (date * self.wards.len() + ward) * ShiftType::COUNT + shift.index()
    }

    /// Slot range owned by a date.
    #[inline]
    pub fn date_slots(&self, date: usize) -> Range<usize> {
        let width = self.slots_per_date();
        date * width..(date + 1) * width
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &SlotInfo {
        &self.slots[index]
    }

    #[inline]
    pub fn weekday(&self, date: usize) -> Weekday {
        self.dates[date].weekday()
    }

    #[inline]
    pub fn limits(&self, nurse: usize) -> &NurseLimits {
        &self.limits[nurse]
    }

    /// Whether an approved request blocks this assignment.
    #[inline]
    pub fn is_blocked(&self, nurse: usize, date: usize, shift: ShiftType) -> bool {
        self.blocked.contains(&(nurse, date, shift))
    }

    /// Weekday availability, resolved with the permissive-default policy.
    pub fn is_available(&self, nurse: usize, date: usize, shift: ShiftType) -> bool {
        self.nurses[nurse].is_available(
            self.weekday(date),
            shift,
            self.policy.assume_available_without_data,
        )
    }

    /// Whether the nurse is in the slot's eligible pool.
    #[inline]
    pub fn is_eligible(&self, slot: usize, nurse: usize) -> bool {
        self.slots[slot].eligible.binary_search(&nurse).is_ok()
    }

    /// Whether the nurse's role can fill a charge position.
    #[inline]
    pub fn can_take_charge(&self, nurse: usize) -> bool {
        self.nurses[nurse].role.can_take_charge()
    }

    /// Weekly bucket of a date.
    #[inline]
    pub fn week_of(&self, date: usize) -> usize {
        self.week_of[date]
    }

    pub fn week_count(&self) -> usize {
        self.week_starts.len()
    }

    pub fn week_start(&self, week: usize) -> NaiveDate {
        self.week_starts[week]
    }

    /// Whether all seven days of the bucket fall inside the date range.
    pub fn week_is_complete(&self, week: usize) -> bool {
        self.week_of.iter().filter(|&&w| w == week).count() == 7
    }

    /// Number of approved (nurse, date, shift) blocks inside the range.
    pub fn blocked_count(&self) -> usize {
        self.blocked.len()
    }
}

/// First day of the 7-day bucket containing `date`.
pub fn week_start_of(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let offset =
        (date.weekday().num_days_from_monday() + 7 - week_start.num_days_from_monday()) % 7;
    date - Duration::days(i64::from(offset))
}

impl GaProblem for RosterProblem {
    type Individual = RosterChromosome;

    fn create_individual<R: Rng>(&self, rng: &mut R) -> RosterChromosome {
        IndividualFactory::new(self).create_random(rng)
    }

    fn evaluate(&self, individual: &mut RosterChromosome) -> Result<()> {
        let report = FitnessEvaluator::new(self).evaluate(individual)?;
        individual.set_evaluation(report.fitness, report.violations);
        Ok(())
    }

    fn crossover<R: Rng>(
        &self,
        parent1: &RosterChromosome,
        parent2: &RosterChromosome,
        rng: &mut R,
    ) -> Vec<RosterChromosome> {
        let (a, b) = date_cut_crossover(self, parent1, parent2, rng);
        vec![a, b]
    }

    fn mutate<R: Rng>(&self, individual: &mut RosterChromosome, rng: &mut R) -> bool {
        mutate(self, individual, rng)
    }

    fn repair<R: Rng>(&self, individual: &mut RosterChromosome, rng: &mut R) -> bool {
        repair(self, individual, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ga::{GaConfig, GaRunner, Individual};
    use crate::models::{DayAvailability, UnavailabilityConstraint};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn make_test_request() -> RosterRequest {
        RosterRequest::new(d(10), d(16))
            .with_ward(
                Ward::new("W1")
                    .with_requirement(ShiftType::Day, 2, 0)
                    .with_requirement(ShiftType::Night, 1, 0),
            )
            .with_ward(Ward::new("W2").with_requirement(ShiftType::Evening, 1, 0))
            .with_nurse(Nurse::new("N1"))
            .with_nurse(Nurse::new("N2"))
            .with_nurse(Nurse::new("N3").with_ward_access(["W2"]))
            .with_nurse(
                Nurse::new("N4").with_availability(Weekday::Sat, DayAvailability::off()),
            )
            .with_constraint(
                UnavailabilityConstraint::new("N1", d(1), d(30))
                    .with_blocked(d(15), [ShiftType::Day])
                    .approved(),
            )
    }

    fn problem() -> RosterProblem {
        RosterProblem::new(&make_test_request(), &SchedulerSettings::default())
    }

    #[test]
    fn test_slot_layout() {
        let p = problem();
        assert_eq!(p.date_count(), 7);
        assert_eq!(p.slot_count(), 7 * 2 * 3);
        assert_eq!(p.slots_per_date(), 6);

        let idx = p.slot_index(3, 1, ShiftType::Night);
        let slot = p.slot(idx);
        assert_eq!(slot.date_index, 3);
        assert_eq!(slot.ward_index, 1);
        assert_eq!(slot.shift, ShiftType::Night);
        assert!(p.date_slots(3).contains(&idx));
    }

    #[test]
    fn test_blocked_nurse_not_eligible() {
        let p = problem();
        // 2025-11-15 is index 5
        let slot = p.slot_index(5, 0, ShiftType::Day);
        assert!(p.is_blocked(0, 5, ShiftType::Day));
        assert!(!p.is_eligible(slot, 0));
        assert!(p.is_eligible(p.slot_index(5, 0, ShiftType::Evening), 0));
    }

    #[test]
    fn test_ward_access_filters_pool() {
        let p = problem();
        let slot = p.slot_index(0, 0, ShiftType::Day);
        assert!(!p.is_eligible(slot, 2));
        assert!(p.is_eligible(p.slot_index(0, 1, ShiftType::Day), 2));
    }

    #[test]
    fn test_weekday_availability_enforced() {
        let p = problem();
        // 2025-11-15 is a Saturday
        assert_eq!(p.weekday(5), Weekday::Sat);
        assert!(!p.is_eligible(p.slot_index(5, 0, ShiftType::Night), 3));

        let relaxed = RosterProblem::new(
            &make_test_request(),
            &SchedulerSettings::default().with_enforce_availability(false),
        );
        assert!(relaxed.is_eligible(relaxed.slot_index(5, 0, ShiftType::Night), 3));
    }

    #[test]
    fn test_week_buckets() {
        let p = problem();
        // 10th is a Monday, 16th a Sunday: one complete Monday-based week
        assert_eq!(p.week_count(), 1);
        assert!(p.week_is_complete(0));
        assert_eq!(p.week_start(0), d(10));

        assert_eq!(week_start_of(d(12), Weekday::Sun), d(9));
    }

    #[test]
    fn test_expected_max_violations_derived() {
        let p = problem();
        // per day: 2 + 1 + 1 = 4 required slots
        assert!((p.expected_max_violations() - 28.0).abs() < 1e-10);
    }

    #[test]
    fn test_crossover_and_mutation() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        let p1 = p.create_individual(&mut rng);
        let p2 = p.create_individual(&mut rng);

        let children = p.crossover(&p1, &p2, &mut rng);
        assert_eq!(children.len(), 2);

        let mut child = children[0].clone();
        p.mutate(&mut child, &mut rng);
        assert_eq!(child.slot_count(), p.slot_count());
        assert!(child.check_structure(&p).is_ok());
    }

    #[test]
    fn test_evaluate_sets_fitness() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut ind = p.create_individual(&mut rng);
        assert!(ind.fitness().is_none());

        p.evaluate(&mut ind).unwrap();
        let fitness = ind.fitness().unwrap();
        assert!((0.0..=1.0).contains(&fitness.score));
        assert_eq!(fitness.critical, 0);
    }

    #[test]
    fn test_ga_runner_integration() {
        let p = problem();
        let config = GaConfig::default()
            .with_population_size(20)
            .with_max_generations(10)
            .with_seed(42)
            .with_success_threshold(1.0)
            .with_parallel(false);

        let result = GaRunner::run(&p, &config).unwrap();
        assert!(result.best_fitness.score.is_finite());
        assert!(result.generations > 0);
        assert_eq!(result.best_fitness.critical, 0);
    }
}
