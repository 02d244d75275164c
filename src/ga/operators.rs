//! Variation operators for roster chromosomes.
//!
//! All operators keep the structural invariants of
//! [`RosterChromosome`]: slots only receive nurses from their eligible
//! pool, and never a nurse already working the same date.
//!
//! | Operator | Effect |
//! |----------|--------|
//! | [`date_cut_crossover`] | one-point crossover at a date boundary |
//! | [`mutate`] | reassign, fill or trim one slot |
//! | [`repair`] | drop ineligible or double-booked nurses, refill under-staffed slots |
//!
//! Rosters built by the factory and varied by these operators never
//! exceed a slot's requirement: fills stop at it and crossover and
//! reassignment keep slot sizes. [`MutationKind::Trim`] therefore only
//! fires on rosters that arrive over-filled from outside the search,
//! such as hand-built seeds, and otherwise falls through to the other
//! kinds.

use std::collections::HashSet;

use rand::prelude::IndexedRandom;
use rand::Rng;

use super::chromosome::RosterChromosome;
use super::problem::RosterProblem;
use super::types::Individual;
use crate::models::ShiftType;

/// Kind of point mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    /// Replace one assigned nurse with another eligible nurse.
    Reassign,
    /// Add an eligible nurse to an under-filled slot.
    Fill,
    /// Remove a nurse from an over-filled slot. A no-op on rosters the
    /// search built itself.
    Trim,
}

impl MutationKind {
    pub const ALL: [MutationKind; 3] = [Self::Reassign, Self::Fill, Self::Trim];
}

/// One-point crossover at a date boundary.
///
/// Picks a cut date `c` in `1..dates` and swaps every slot from `c`
/// onward. Whole dates move together, so the one-shift-per-date
/// invariant carries over from the parents. With fewer than two dates
/// the parents are returned as-is.
pub fn date_cut_crossover<R: Rng>(
    problem: &RosterProblem,
    parent1: &RosterChromosome,
    parent2: &RosterChromosome,
    rng: &mut R,
) -> (RosterChromosome, RosterChromosome) {
    let dates = problem.date_count();
    if dates < 2 {
        return (parent1.clone(), parent2.clone());
    }
    let cut = rng.random_range(1..dates) * problem.slots_per_date();

    let (head1, tail1) = parent1.slots().split_at(cut);
    let (head2, tail2) = parent2.slots().split_at(cut);
    let child1 = RosterChromosome::from_slots(head1.iter().chain(tail2).cloned().collect());
    let child2 = RosterChromosome::from_slots(head2.iter().chain(tail1).cloned().collect());
    (child1, child2)
}

/// Applies one point mutation. Returns `true` if the roster changed.
///
/// The kind is drawn uniformly; when it has no applicable slot the
/// remaining kinds are tried in order.
pub fn mutate<R: Rng>(
    problem: &RosterProblem,
    chromosome: &mut RosterChromosome,
    rng: &mut R,
) -> bool {
    let first = rng.random_range(0..MutationKind::ALL.len());
    for offset in 0..MutationKind::ALL.len() {
        let kind = MutationKind::ALL[(first + offset) % MutationKind::ALL.len()];
        if apply(kind, problem, chromosome, rng) {
            chromosome.invalidate();
            return true;
        }
    }
    false
}

/// Applies a specific mutation kind. Returns `true` if the roster changed.
pub fn apply<R: Rng>(
    kind: MutationKind,
    problem: &RosterProblem,
    chromosome: &mut RosterChromosome,
    rng: &mut R,
) -> bool {
    match kind {
        MutationKind::Reassign => reassign(problem, chromosome, rng),
        MutationKind::Fill => fill(problem, chromosome, rng),
        MutationKind::Trim => trim(problem, chromosome, rng),
    }
}

fn reassign<R: Rng>(
    problem: &RosterProblem,
    chromosome: &mut RosterChromosome,
    rng: &mut R,
) -> bool {
    let targets: Vec<usize> = (0..chromosome.slot_count())
        .filter(|&s| !chromosome.slot(s).is_empty())
        .collect();
    let Some(&slot) = targets.choose(rng) else {
        return false;
    };
    let candidates = free_candidates(problem, chromosome, slot);
    let Some(&replacement) = candidates.choose(rng) else {
        return false;
    };
    let position = rng.random_range(0..chromosome.slot(slot).len());
    chromosome.slot_mut(slot)[position] = replacement;
    true
}

fn fill<R: Rng>(problem: &RosterProblem, chromosome: &mut RosterChromosome, rng: &mut R) -> bool {
    let workload = Workload::limited(problem, chromosome);
    let candidates_for = |chromosome: &RosterChromosome, slot: usize| -> Vec<usize> {
        let mut candidates = free_candidates(problem, chromosome, slot);
        if let Some(workload) = &workload {
            let info = problem.slot(slot);
            candidates.retain(|&n| workload.within_limits(n, info.date_index, info.shift));
        }
        candidates
    };
    let targets: Vec<usize> = (0..chromosome.slot_count())
        .filter(|&s| chromosome.slot(s).len() < problem.slot(s).requirement.total() as usize)
        .filter(|&s| !candidates_for(chromosome, s).is_empty())
        .collect();
    let Some(&slot) = targets.choose(rng) else {
        return false;
    };
    let candidates = candidates_for(chromosome, slot);
    match candidates.choose(rng) {
        Some(&nurse) => {
            chromosome.slot_mut(slot).push(nurse);
            true
        }
        None => false,
    }
}

fn trim<R: Rng>(problem: &RosterProblem, chromosome: &mut RosterChromosome, rng: &mut R) -> bool {
    let targets: Vec<usize> = (0..chromosome.slot_count())
        .filter(|&s| chromosome.slot(s).len() > problem.slot(s).requirement.total() as usize)
        .collect();
    let Some(&slot) = targets.choose(rng) else {
        return false;
    };
    let position = rng.random_range(0..chromosome.slot(slot).len());
    chromosome.slot_mut(slot).remove(position);
    true
}

/// Eligible nurses for `slot` not yet working its date.
fn free_candidates(
    problem: &RosterProblem,
    chromosome: &RosterChromosome,
    slot: usize,
) -> Vec<usize> {
    let date = problem.slot(slot).date_index;
    problem
        .slot(slot)
        .eligible
        .iter()
        .copied()
        .filter(|&n| !chromosome.works_on(problem, date, n))
        .collect()
}

/// Per-roster workload view for refills that must respect soft limits.
///
/// Unlike [`WorkloadTracker`](super::WorkloadTracker), which only looks
/// back, this sees the whole roster: a refill on one date is checked
/// against streaks and rest on both sides of it.
struct Workload<'a> {
    problem: &'a RosterProblem,
    nurse_count: usize,
    /// `date * nurse_count + nurse` → shift worked that date.
    shifts: Vec<Option<ShiftType>>,
    /// `nurse * week_count + week` → booked hours.
    weekly_hours: Vec<u32>,
}

impl<'a> Workload<'a> {
    /// Builds the view when the starvation override is off; `None` means
    /// refills may ignore soft limits.
    fn limited(problem: &'a RosterProblem, chromosome: &RosterChromosome) -> Option<Self> {
        if problem.policy().allow_constraint_override_on_starvation {
            return None;
        }
        let nurse_count = problem.nurses().len();
        let mut workload = Self {
            problem,
            nurse_count,
            shifts: vec![None; problem.date_count() * nurse_count],
            weekly_hours: vec![0; nurse_count * problem.week_count()],
        };
        for (slot, nurse) in chromosome.assignments() {
            let info = problem.slot(slot);
            workload.book(nurse, info.date_index, info.shift);
        }
        Some(workload)
    }

    fn shift_on(&self, nurse: usize, date: usize) -> Option<ShiftType> {
        self.shifts[date * self.nurse_count + nurse]
    }

    fn book(&mut self, nurse: usize, date: usize, shift: ShiftType) {
        self.shifts[date * self.nurse_count + nurse] = Some(shift);
        let week = self.problem.week_of(date);
        self.weekly_hours[nurse * self.problem.week_count() + week] += shift.hours();
    }

    /// Length of the run of dates around `date` matching `works`,
    /// counting `date` itself.
    fn streak_through(&self, date: usize, works: impl Fn(usize) -> bool) -> usize {
        let before = (0..date).rev().take_while(|&d| works(d)).count();
        let after = (date + 1..self.problem.date_count())
            .take_while(|&d| works(d))
            .count();
        before + 1 + after
    }

    /// Whether adding `shift` on `date` keeps the nurse within every
    /// soft limit, looking at the dates on both sides.
    fn within_limits(&self, nurse: usize, date: usize, shift: ShiftType) -> bool {
        let p = self.problem;
        let limits = p.limits(nurse);
        let week = p.week_of(date);
        if self.weekly_hours[nurse * p.week_count() + week] + shift.hours()
            > limits.weekly_hour_ceiling
        {
            return false;
        }
        if shift == ShiftType::Night {
            let nights = self.streak_through(date, |d| {
                self.shift_on(nurse, d) == Some(ShiftType::Night)
            });
            if nights > limits.max_consecutive_nights as usize {
                return false;
            }
        }
        let days = self.streak_through(date, |d| self.shift_on(nurse, d).is_some());
        if days > limits.max_consecutive_days as usize {
            return false;
        }
        if p.policy().check_rest_period {
            let dates = p.dates();
            let min_rest = i64::from(limits.min_rest_hours);
            if let Some(prev) = date.checked_sub(1).and_then(|d| self.shift_on(nurse, d)) {
                let rest = shift.start_on(dates[date]) - prev.end_on(dates[date - 1]);
                if rest.num_hours() < min_rest {
                    return false;
                }
            }
            if let Some(next) = (date + 1 < dates.len())
                .then(|| self.shift_on(nurse, date + 1))
                .flatten()
            {
                let rest = next.start_on(dates[date + 1]) - shift.end_on(dates[date]);
                if rest.num_hours() < min_rest {
                    return false;
                }
            }
        }
        true
    }
}

/// Restores hard constraints and refills under-staffed slots.
///
/// First drops, per date in slot order, nurses outside the slot's
/// eligible pool or already seen that date. Then tops every slot up to
/// its requirement from the unused part of its pool, charge-capable
/// nurses first while charge positions are open. With the starvation
/// override off, refills only use nurses who stay within their soft
/// limits. Returns `true` if anything changed.
pub fn repair<R: Rng>(
    problem: &RosterProblem,
    chromosome: &mut RosterChromosome,
    rng: &mut R,
) -> bool {
    let mut changed = false;
    let mut seen = HashSet::new();

    for date in 0..problem.date_count() {
        seen.clear();
        for slot in problem.date_slots(date) {
            let nurses = chromosome.slot_mut(slot);
            let before = nurses.len();
            nurses.retain(|&n| problem.is_eligible(slot, n) && seen.insert(n));
            changed |= nurses.len() != before;
        }
    }

    let mut workload = Workload::limited(problem, chromosome);
    for date in 0..problem.date_count() {
        seen.clear();
        for slot in problem.date_slots(date) {
            seen.extend(chromosome.slot(slot).iter().copied());
        }

        for slot in problem.date_slots(date) {
            let info = problem.slot(slot);
            let requirement = info.requirement;
            let needed = requirement.total() as usize;
            if chromosome.slot(slot).len() >= needed {
                continue;
            }
            let unused: Vec<usize> = info
                .eligible
                .iter()
                .copied()
                .filter(|n| !seen.contains(n))
                .filter(|&n| {
                    workload
                        .as_ref()
                        .map_or(true, |w| w.within_limits(n, date, info.shift))
                })
                .collect();

            let charge_present = chromosome
                .slot(slot)
                .iter()
                .filter(|&&n| problem.can_take_charge(n))
                .count();
            let charge_open = (requirement.charge_nurses as usize).saturating_sub(charge_present);
            let open = needed - chromosome.slot(slot).len();

            let charge_pool: Vec<usize> =
                unused.iter().copied().filter(|&n| problem.can_take_charge(n)).collect();
            let mut added: Vec<usize> = charge_pool
                .choose_multiple(rng, charge_open.min(open))
                .copied()
                .collect();
            let rest: Vec<usize> = unused.into_iter().filter(|n| !added.contains(n)).collect();
            added.extend(rest.choose_multiple(rng, open - added.len()).copied());

            if added.is_empty() {
                continue;
            }
            if let Some(workload) = workload.as_mut() {
                for &n in &added {
                    workload.book(n, date, info.shift);
                }
            }
            seen.extend(added.iter().copied());
            chromosome.slot_mut(slot).extend(added);
            changed = true;
        }
    }

    if changed {
        chromosome.invalidate();
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{EvaluatorPolicy, SchedulerSettings};
    use crate::ga::GaProblem;
    use crate::models::{Nurse, Role, ShiftType, UnavailabilityConstraint, Ward};
    use crate::scheduler::RosterRequest;
    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn problem() -> RosterProblem {
        let request = RosterRequest::new(d(10), d(16))
            .with_ward(
                Ward::new("W1")
                    .with_requirement(ShiftType::Day, 2, 1)
                    .with_requirement(ShiftType::Night, 1, 0),
            )
            .with_nurse(Nurse::new("N1").with_role(Role::Charge))
            .with_nurse(Nurse::new("N2"))
            .with_nurse(Nurse::new("N3"))
            .with_nurse(Nurse::new("N4"))
            .with_constraint(
                UnavailabilityConstraint::new("N2", d(1), d(30))
                    .with_blocked_day(d(12))
                    .approved(),
            );
        RosterProblem::new(&request, &SchedulerSettings::default())
    }

    #[test]
    fn test_crossover_swaps_whole_dates() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = p.create_individual(&mut rng);
        let b = p.create_individual(&mut rng);

        let (c1, c2) = date_cut_crossover(&p, &a, &b, &mut rng);
        assert!(c1.check_structure(&p).is_ok());
        assert!(c2.check_structure(&p).is_ok());

        for date in 0..p.date_count() {
            let from_a = p.date_slots(date).all(|s| c1.slot(s) == a.slot(s));
            let from_b = p.date_slots(date).all(|s| c1.slot(s) == b.slot(s));
            assert!(from_a || from_b, "date {date} mixes parents");
        }
        assert!(c1.fitness().is_none());
    }

    #[test]
    fn test_crossover_single_date_clones() {
        let request = RosterRequest::new(d(10), d(10))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1"));
        let p = RosterProblem::new(&request, &SchedulerSettings::default());
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let a = p.create_individual(&mut rng);
        let b = RosterChromosome::empty(p.slot_count());

        let (c1, c2) = date_cut_crossover(&p, &a, &b, &mut rng);
        assert_eq!(c1, a);
        assert_eq!(c2, b);
    }

    #[test]
    fn test_mutation_keeps_structure() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let mut ch = p.create_individual(&mut rng);
        for _ in 0..500 {
            mutate(&p, &mut ch, &mut rng);
            assert!(ch.check_structure(&p).is_ok());
            for (slot, nurse) in ch.assignments() {
                assert!(p.is_eligible(slot, nurse));
            }
        }
    }

    #[test]
    fn test_fill_and_trim() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(5);

        let mut empty = RosterChromosome::empty(p.slot_count());
        assert!(apply(MutationKind::Fill, &p, &mut empty, &mut rng));
        assert_eq!(empty.assignment_count(), 1);
        assert!(!apply(MutationKind::Trim, &p, &mut empty, &mut rng));
        let mut none = RosterChromosome::empty(p.slot_count());
        assert!(!apply(MutationKind::Reassign, &p, &mut none, &mut rng));

        let mut over = RosterChromosome::empty(p.slot_count());
        let night = p.slot_index(0, 0, ShiftType::Night);
        over.slot_mut(night).extend([0, 2]);
        assert!(apply(MutationKind::Trim, &p, &mut over, &mut rng));
        assert_eq!(over.slot(night).len(), 1);
    }

    #[test]
    fn test_search_never_overfills() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut a = p.create_individual(&mut rng);
        let b = p.create_individual(&mut rng);
        for _ in 0..200 {
            let (child, _) = date_cut_crossover(&p, &a, &b, &mut rng);
            a = child;
            mutate(&p, &mut a, &mut rng);
            repair(&p, &mut a, &mut rng);
            assert!(!apply(MutationKind::Trim, &p, &mut a, &mut rng));
        }
    }

    #[test]
    fn test_mutation_invalidates() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let mut ch = p.create_individual(&mut rng);
        p.evaluate(&mut ch).unwrap();
        assert!(ch.fitness().is_some());
        if mutate(&p, &mut ch, &mut rng) {
            assert!(ch.fitness().is_none());
        }
    }

    #[test]
    fn test_repair_removes_breaches_and_refills() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut ch = RosterChromosome::empty(p.slot_count());

        // N2 is blocked on the 12th (index 2); N3 double-booked on the 10th
        ch.slot_mut(p.slot_index(2, 0, ShiftType::Day)).push(1);
        ch.slot_mut(p.slot_index(0, 0, ShiftType::Day)).push(2);
        ch.slot_mut(p.slot_index(0, 0, ShiftType::Night)).push(2);
        assert!(ch.check_structure(&p).is_err());

        assert!(repair(&p, &mut ch, &mut rng));
        assert!(ch.check_structure(&p).is_ok());
        assert!(!ch.slot(p.slot_index(2, 0, ShiftType::Day)).contains(&1));

        // four nurses cover three positions a day: every slot is full
        for date in 0..p.date_count() {
            let day = p.slot_index(date, 0, ShiftType::Day);
            let night = p.slot_index(date, 0, ShiftType::Night);
            assert_eq!(ch.slot(day).len(), 2);
            assert_eq!(ch.slot(night).len(), 1);
            assert!(ch.slot(day).contains(&0) || ch.slot(night).contains(&0));
        }
    }

    #[test]
    fn test_repair_prefers_charge_nurse() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(13);
        let mut ch = RosterChromosome::empty(p.slot_count());
        repair(&p, &mut ch, &mut rng);
        // day slots are visited before night slots, so N1 takes charge
        for date in 0..p.date_count() {
            assert!(ch.slot(p.slot_index(date, 0, ShiftType::Day)).contains(&0));
        }
    }

    #[test]
    fn test_repair_noop_on_valid_full_roster() {
        let p = problem();
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        let mut ch = RosterChromosome::empty(p.slot_count());
        repair(&p, &mut ch, &mut rng);
        assert!(!repair(&p, &mut ch, &mut rng));
    }

    fn strict_nights() -> RosterProblem {
        // One nurse, nights on 4 consecutive dates, limit of 2
        let request = RosterRequest::new(d(10), d(13))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Night, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_consecutive_nights(2));
        let settings = SchedulerSettings::default().with_policy(EvaluatorPolicy {
            allow_constraint_override_on_starvation: false,
            ..EvaluatorPolicy::default()
        });
        RosterProblem::new(&request, &settings)
    }

    #[test]
    fn test_strict_repair_respects_soft_limits() {
        let p = strict_nights();
        let mut rng = ChaCha8Rng::seed_from_u64(19);
        let mut ch = RosterChromosome::empty(p.slot_count());

        assert!(repair(&p, &mut ch, &mut rng));
        // nights 1, 2 and 4: the third would extend the streak to 3
        assert_eq!(ch.assignment_count(), 3);
        assert!(ch.slot(p.slot_index(2, 0, ShiftType::Night)).is_empty());
        assert!(!repair(&p, &mut ch, &mut rng));
    }

    #[test]
    fn test_strict_repair_looks_ahead() {
        let p = strict_nights();
        let mut rng = ChaCha8Rng::seed_from_u64(23);
        let mut ch = RosterChromosome::empty(p.slot_count());
        ch.slot_mut(p.slot_index(1, 0, ShiftType::Night)).push(0);
        ch.slot_mut(p.slot_index(2, 0, ShiftType::Night)).push(0);

        repair(&p, &mut ch, &mut rng);
        assert!(ch.slot(p.slot_index(0, 0, ShiftType::Night)).is_empty());
        assert!(ch.slot(p.slot_index(3, 0, ShiftType::Night)).is_empty());
    }

    #[test]
    fn test_strict_fill_respects_soft_limits() {
        let p = strict_nights();
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        let mut ch = p.create_individual(&mut rng);
        assert_eq!(ch.assignment_count(), 3);

        for _ in 0..50 {
            assert!(!apply(MutationKind::Fill, &p, &mut ch, &mut rng));
        }
        assert_eq!(ch.assignment_count(), 3);
    }

    #[test]
    fn test_override_refills_over_limit() {
        let request = RosterRequest::new(d(10), d(13))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Night, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_consecutive_nights(2));
        let p = RosterProblem::new(&request, &SchedulerSettings::default());
        let mut rng = ChaCha8Rng::seed_from_u64(31);
        let mut ch = RosterChromosome::empty(p.slot_count());

        repair(&p, &mut ch, &mut rng);
        assert_eq!(ch.assignment_count(), 4);
    }
}
