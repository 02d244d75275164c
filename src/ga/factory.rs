//! Constraint-aware random roster construction.
//!
//! # Algorithm
//!
//! 1. Walk dates in order; within a date, visit slots in random order.
//! 2. Candidates = the slot's hard-eligible pool minus nurses already
//!    working that date.
//! 3. Split candidates by whether one more shift keeps the nurse within
//!    soft limits (weekly hours, night streak, day streak, rest).
//! 4. Fill charge positions from charge-capable candidates first, then
//!    the remaining positions, drawing without replacement from the
//!    within-limits group. If short and starvation override is enabled,
//!    top up from the over-limit group.
//!
//! Pools smaller than the requirement leave the slot under-filled.

use rand::prelude::IndexedRandom;
use rand::seq::SliceRandom;
use rand::Rng;

use super::chromosome::RosterChromosome;
use super::problem::RosterProblem;
use crate::models::ShiftType;

/// Per-construction workload bookkeeping.
///
/// Owned by a single [`IndividualFactory::create_random`] call and
/// dropped afterwards. Dates must be recorded in ascending order.
#[derive(Debug, Clone)]
pub struct WorkloadTracker {
    weeks: usize,
    weekly_hours: Vec<u32>,
    last: Vec<Option<(usize, ShiftType)>>,
    night_streak: Vec<u32>,
    day_streak: Vec<u32>,
}

impl WorkloadTracker {
    pub fn new(nurse_count: usize, week_count: usize) -> Self {
        Self {
            weeks: week_count,
            weekly_hours: vec![0; nurse_count * week_count],
            last: vec![None; nurse_count],
            night_streak: vec![0; nurse_count],
            day_streak: vec![0; nurse_count],
        }
    }

    /// Whether the nurse already has a shift on `date`.
    #[inline]
    pub fn works_on(&self, nurse: usize, date: usize) -> bool {
        matches!(self.last[nurse], Some((d, _)) if d == date)
    }

    /// Hours booked for the nurse in a week bucket.
    #[inline]
    pub fn weekly_hours(&self, nurse: usize, week: usize) -> u32 {
        self.weekly_hours[nurse * self.weeks + week]
    }

    fn night_streak_after(&self, nurse: usize, date: usize, shift: ShiftType) -> u32 {
        if shift != ShiftType::Night {
            return 0;
        }
        match self.last[nurse] {
            Some((d, ShiftType::Night)) if d + 1 == date => self.night_streak[nurse] + 1,
            _ => 1,
        }
    }

    fn day_streak_after(&self, nurse: usize, date: usize) -> u32 {
        match self.last[nurse] {
            Some((d, _)) if d + 1 == date => self.day_streak[nurse] + 1,
            _ => 1,
        }
    }

    /// Whether one more shift keeps the nurse within every soft limit.
    pub fn within_limits(
        &self,
        problem: &RosterProblem,
        nurse: usize,
        date: usize,
        shift: ShiftType,
    ) -> bool {
        let limits = problem.limits(nurse);
        let week = problem.week_of(date);
        if self.weekly_hours(nurse, week) + shift.hours() > limits.weekly_hour_ceiling {
            return false;
        }
        if self.night_streak_after(nurse, date, shift) > limits.max_consecutive_nights {
            return false;
        }
        if self.day_streak_after(nurse, date) > limits.max_consecutive_days {
            return false;
        }
        if problem.policy().check_rest_period {
            if let Some((d, prev)) = self.last[nurse] {
                let dates = problem.dates();
                let rest = shift.start_on(dates[date]) - prev.end_on(dates[d]);
                if rest.num_hours() < i64::from(limits.min_rest_hours) {
                    return false;
                }
            }
        }
        true
    }

    /// Books a shift.
    pub fn record(&mut self, problem: &RosterProblem, nurse: usize, date: usize, shift: ShiftType) {
        let night = self.night_streak_after(nurse, date, shift);
        let day = self.day_streak_after(nurse, date);
        self.night_streak[nurse] = night;
        self.day_streak[nurse] = day;
        self.weekly_hours[nurse * self.weeks + problem.week_of(date)] += shift.hours();
        self.last[nurse] = Some((date, shift));
    }
}

/// Builds random individuals for one problem.
pub struct IndividualFactory<'a> {
    problem: &'a RosterProblem,
}

impl<'a> IndividualFactory<'a> {
    pub fn new(problem: &'a RosterProblem) -> Self {
        Self { problem }
    }

    /// Creates one random, constraint-aware roster.
    ///
    /// Deterministic for a given RNG state.
    pub fn create_random<R: Rng>(&self, rng: &mut R) -> RosterChromosome {
        let problem = self.problem;
        let mut chromosome = RosterChromosome::empty(problem.slot_count());
        let mut tracker = WorkloadTracker::new(problem.nurses().len(), problem.week_count());
        let override_on_starvation = problem.policy().allow_constraint_override_on_starvation;

        for date in 0..problem.date_count() {
            let mut order: Vec<usize> = problem.date_slots(date).collect();
            order.shuffle(rng);

            for slot_index in order {
                let slot = problem.slot(slot_index);
                let needed = slot.requirement.total() as usize;
                if needed == 0 {
                    continue;
                }

                let (within, over): (Vec<usize>, Vec<usize>) = slot
                    .eligible
                    .iter()
                    .copied()
                    .filter(|&n| !tracker.works_on(n, date))
                    .partition(|&n| tracker.within_limits(problem, n, date, slot.shift));

                let mut picked: Vec<usize> = Vec::with_capacity(needed);
                let charge_needed = (slot.requirement.charge_nurses as usize).min(needed);
                draw(&mut picked, &within, charge_needed, rng, |n| problem.can_take_charge(n));
                if override_on_starvation {
                    draw(&mut picked, &over, charge_needed, rng, |n| problem.can_take_charge(n));
                }
                draw(&mut picked, &within, needed, rng, |_| true);
                if override_on_starvation {
                    draw(&mut picked, &over, needed, rng, |_| true);
                }

                for &nurse in &picked {
                    tracker.record(problem, nurse, date, slot.shift);
                }
                *chromosome.slot_mut(slot_index) = picked;
            }
        }

        chromosome
    }
}

/// Draws from `pool` without replacement until `picked` holds `target`
/// nurses (or the filtered pool runs out).
fn draw<R, F>(picked: &mut Vec<usize>, pool: &[usize], target: usize, rng: &mut R, accept: F)
where
    R: Rng,
    F: Fn(usize) -> bool,
{
    if picked.len() >= target {
        return;
    }
    let candidates: Vec<usize> = pool
        .iter()
        .copied()
        .filter(|n| accept(*n) && !picked.contains(n))
        .collect();
    let want = target - picked.len();
    picked.extend(candidates.choose_multiple(rng, want).copied());
}
