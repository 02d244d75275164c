//! Flat slot-table chromosome for rostering.
//!
//! # Encoding
//!
//! One entry per (date, ward, shift) slot in [`RosterProblem`] layout
//! order. Each entry is the ordered list of nurse indices assigned to
//! the slot. Because a date's slots are contiguous, recombining at a
//! date boundary is a pair of slice copies.
//!
//! # Invariants
//!
//! - Exactly `problem.slot_count()` entries.
//! - Every nurse index is in range.
//! - A nurse appears at most once per date, across all wards and shifts.

use super::fitness::RosterFitness;
use super::problem::RosterProblem;
use super::types::Individual;
use crate::error::{Result, RosterError};
use crate::models::Violation;

/// Candidate roster.
#[derive(Debug, Clone, PartialEq)]
pub struct RosterChromosome {
    slots: Vec<Vec<usize>>,
    fitness: Option<RosterFitness>,
    violations: Vec<Violation>,
}

impl Individual for RosterChromosome {
    type Fitness = RosterFitness;

    fn fitness(&self) -> Option<RosterFitness> {
        self.fitness
    }

    fn invalidate(&mut self) {
        self.fitness = None;
        self.violations.clear();
    }
}

impl RosterChromosome {
    /// Creates a chromosome with every slot empty.
    pub fn empty(slot_count: usize) -> Self {
        Self::from_slots(vec![Vec::new(); slot_count])
    }

    /// Wraps an explicit slot table. The result is unevaluated.
    pub fn from_slots(slots: Vec<Vec<usize>>) -> Self {
        Self {
            slots,
            fitness: None,
            violations: Vec::new(),
        }
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot(&self, index: usize) -> &[usize] {
        &self.slots[index]
    }

    /// Mutable slot access. Callers must [`invalidate`](Individual::invalidate) after changes.
    #[inline]
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut Vec<usize> {
        &mut self.slots[index]
    }

    pub(crate) fn slots(&self) -> &[Vec<usize>] {
        &self.slots
    }

    /// Violations found by the last evaluation.
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub(crate) fn set_evaluation(&mut self, fitness: RosterFitness, violations: Vec<Violation>) {
        self.fitness = Some(fitness);
        self.violations = violations;
    }

    /// All `(slot, nurse)` pairs in layout order.
    pub fn assignments(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .flat_map(|(slot, nurses)| nurses.iter().map(move |&n| (slot, n)))
    }

    pub fn assignment_count(&self) -> usize {
        self.slots.iter().map(Vec::len).sum()
    }

    /// Whether the nurse already works somewhere on `date`.
    pub fn works_on(&self, problem: &RosterProblem, date: usize, nurse: usize) -> bool {
        problem
            .date_slots(date)
            .any(|slot| self.slots[slot].contains(&nurse))
    }

    /// Checks the structural invariants without allocating.
    ///
    /// A failure means an operator produced a malformed roster; the run
    /// must abort with [`RosterError::Internal`].
    pub fn check_structure(&self, problem: &RosterProblem) -> Result<()> {
        if self.slots.len() != problem.slot_count() {
            return Err(RosterError::Internal(format!(
                "chromosome has {} slots, expected {}",
                self.slots.len(),
                problem.slot_count()
            )));
        }
        let nurse_count = problem.nurses().len();
        for date in 0..problem.date_count() {
            let day = &self.slots[problem.date_slots(date)];
            for (i, nurses) in day.iter().enumerate() {
                for (j, &nurse) in nurses.iter().enumerate() {
                    if nurse >= nurse_count {
                        return Err(RosterError::Internal(format!(
                            "slot {} references nurse index {nurse} (only {nurse_count} nurses)",
                            problem.date_slots(date).start + i
                        )));
                    }
                    let repeated = nurses[..j].contains(&nurse)
                        || day[..i].iter().any(|earlier| earlier.contains(&nurse));
                    if repeated {
                        return Err(RosterError::Internal(format!(
                            "nurse '{}' assigned twice on {}",
                            problem.nurses()[nurse].id,
                            problem.dates()[date]
                        )));
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerSettings;
    use crate::models::{Nurse, ShiftType, Ward};
    use crate::scheduler::RosterRequest;
    use chrono::NaiveDate;

    fn problem() -> RosterProblem {
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let end = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let request = RosterRequest::new(start, end)
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1"))
            .with_nurse(Nurse::new("N2"));
        RosterProblem::new(&request, &SchedulerSettings::default())
    }

    #[test]
    fn test_empty_chromosome() {
        let p = problem();
        let ch = RosterChromosome::empty(p.slot_count());
        assert_eq!(ch.slot_count(), 6);
        assert_eq!(ch.assignment_count(), 0);
        assert!(ch.fitness().is_none());
        assert!(ch.check_structure(&p).is_ok());
    }

    #[test]
    fn test_assignments_iteration() {
        let p = problem();
        let mut ch = RosterChromosome::empty(p.slot_count());
        ch.slot_mut(0).push(1);
        ch.slot_mut(3).push(0);

        let pairs: Vec<_> = ch.assignments().collect();
        assert_eq!(pairs, vec![(0, 1), (3, 0)]);
        assert!(ch.works_on(&p, 0, 1));
        assert!(!ch.works_on(&p, 1, 1));
        assert!(ch.works_on(&p, 1, 0));
    }

    #[test]
    fn test_wrong_length_is_internal_error() {
        let p = problem();
        let ch = RosterChromosome::empty(2);
        assert!(matches!(ch.check_structure(&p), Err(RosterError::Internal(_))));
    }

    #[test]
    fn test_double_booking_is_internal_error() {
        let p = problem();
        let mut ch = RosterChromosome::empty(p.slot_count());
        ch.slot_mut(0).push(0);
        ch.slot_mut(2).push(0);
        let err = ch.check_structure(&p).unwrap_err();
        assert!(err.to_string().contains("assigned twice"));
    }

    #[test]
    fn test_duplicate_within_slot_is_internal_error() {
        let p = problem();
        let mut ch = RosterChromosome::empty(p.slot_count());
        ch.slot_mut(3).extend([1, 1]);
        let err = ch.check_structure(&p).unwrap_err();
        assert!(err.to_string().contains("'N2' assigned twice"));
    }

    #[test]
    fn test_out_of_range_nurse() {
        let p = problem();
        let mut ch = RosterChromosome::empty(p.slot_count());
        ch.slot_mut(1).push(9);
        assert!(ch.check_structure(&p).is_err());
    }

    #[test]
    fn test_invalidate_clears_evaluation() {
        let mut ch = RosterChromosome::empty(3);
        ch.set_evaluation(RosterFitness::default(), Vec::new());
        assert!(ch.fitness().is_some());
        ch.invalidate();
        assert!(ch.fitness().is_none());
    }
}
