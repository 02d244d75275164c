//! Constraint evaluation.
//!
//! Pure detection of rule breaches in a roster. Nothing here mutates the
//! roster or fails on odd data: missing availability is resolved by the
//! policy, and malformed rosters are the chromosome's concern.
//!
//! | Rule | Severity |
//! |------|----------|
//! | Approved unavailability request | CRITICAL |
//! | Consecutive nights above limit | HIGH |
//! | Weekly hours above ceiling | MEDIUM |
//! | Rest between shifts below minimum | MEDIUM |
//! | Consecutive working days above limit | MEDIUM |
//! | Weekday availability breached | MEDIUM |
//! | Charge positions unfilled | MEDIUM |
//! | Slot under-filled | LOW |
//! | Too few days off in a full week | LOW |

use crate::ga::{RosterChromosome, RosterProblem};
use crate::models::{ShiftType, Violation, ViolationType};

/// One assignment seen from the nurse's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NurseShift {
    pub date: usize,
    pub ward: usize,
    pub shift: ShiftType,
}

/// Detects rule violations in rosters of one problem.
pub struct ConstraintEvaluator<'a> {
    problem: &'a RosterProblem,
}

impl<'a> ConstraintEvaluator<'a> {
    pub fn new(problem: &'a RosterProblem) -> Self {
        Self { problem }
    }

    /// Groups assignments per nurse, sorted by (date, shift).
    pub fn nurse_timelines(&self, chromosome: &RosterChromosome) -> Vec<Vec<NurseShift>> {
        let mut timelines = vec![Vec::new(); self.problem.nurses().len()];
        for (slot, nurse) in chromosome.assignments() {
            let info = self.problem.slot(slot);
            if let Some(timeline) = timelines.get_mut(nurse) {
                timeline.push(NurseShift {
                    date: info.date_index,
                    ward: info.ward_index,
                    shift: info.shift,
                });
            }
        }
        for timeline in &mut timelines {
            timeline.sort_by_key(|a| (a.date, a.shift));
        }
        timelines
    }

    /// Runs every rule and returns the violations found.
    pub fn evaluate(&self, chromosome: &RosterChromosome) -> Vec<Violation> {
        let timelines = self.nurse_timelines(chromosome);
        self.evaluate_timelines(chromosome, &timelines)
    }

    /// Like [`evaluate`](Self::evaluate) with precomputed timelines.
    pub fn evaluate_timelines(
        &self,
        chromosome: &RosterChromosome,
        timelines: &[Vec<NurseShift>],
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        self.check_unavailability(timelines, &mut violations);
        self.check_availability(timelines, &mut violations);
        self.check_staffing(chromosome, &mut violations);
        self.check_consecutive_nights(timelines, &mut violations);
        self.check_weekly_hours(timelines, &mut violations);
        if self.problem.policy().check_rest_period {
            self.check_rest_period(timelines, &mut violations);
        }
        self.check_consecutive_days(timelines, &mut violations);
        self.check_days_off(timelines, &mut violations);
        violations
    }

    fn violation(
        &self,
        kind: ViolationType,
        nurse: usize,
        a: &NurseShift,
        message: String,
    ) -> Violation {
        let p = self.problem;
        Violation::new(kind, p.dates()[a.date], message)
            .for_nurse(p.nurses()[nurse].id.as_str())
            .on_ward(p.wards()[a.ward].id.as_str())
            .on_shift(a.shift)
    }

    /// Hard rule: approved requests.
    fn check_unavailability(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        for (nurse, timeline) in timelines.iter().enumerate() {
            for a in timeline {
                if p.is_blocked(nurse, a.date, a.shift) {
                    out.push(self.violation(
                        ViolationType::UnavailabilityRequestViolation,
                        nurse,
                        a,
                        format!(
                            "Nurse '{}' has an approved request off {} {}",
                            p.nurses()[nurse].id,
                            p.dates()[a.date],
                            a.shift
                        ),
                    ));
                }
            }
        }
    }

    fn check_availability(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        for (nurse, timeline) in timelines.iter().enumerate() {
            for a in timeline {
                if !p.is_available(nurse, a.date, a.shift) {
                    out.push(self.violation(
                        ViolationType::AvailabilityViolation,
                        nurse,
                        a,
                        format!(
                            "Nurse '{}' is not available for {} on {}",
                            p.nurses()[nurse].id,
                            a.shift,
                            p.weekday(a.date)
                        ),
                    ));
                }
            }
        }
    }

    fn check_staffing(&self, chromosome: &RosterChromosome, out: &mut Vec<Violation>) {
        let p = self.problem;
        for (index, slot) in p.slots().iter().enumerate() {
            let assigned = chromosome.slot(index);
            let ward = &p.wards()[slot.ward_index];
            let date = p.dates()[slot.date_index];
            let required = slot.requirement.total() as usize;
            if assigned.len() < required {
                out.push(
                    Violation::new(
                        ViolationType::UnderStaffed,
                        date,
                        format!(
                            "Ward '{}' {} {} has {}/{} nurses",
                            ward.id,
                            date,
                            slot.shift,
                            assigned.len(),
                            required
                        ),
                    )
                    .on_ward(ward.id.as_str())
                    .on_shift(slot.shift),
                );
            }
            let charge_required = slot.requirement.charge_nurses as usize;
            let charge = assigned.iter().filter(|&&n| p.can_take_charge(n)).count();
            if charge < charge_required {
                out.push(
                    Violation::new(
                        ViolationType::ChargeNurseShortage,
                        date,
                        format!(
                            "Ward '{}' {} {} has {}/{} charge nurses",
                            ward.id, date, slot.shift, charge, charge_required
                        ),
                    )
                    .on_ward(ward.id.as_str())
                    .on_shift(slot.shift),
                );
            }
        }
    }

    /// A night on the date right after another night extends the streak;
    /// any other assignment or a gap resets it. Every night past the
    /// limit is reported.
    fn check_consecutive_nights(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        for (nurse, timeline) in timelines.iter().enumerate() {
            let max = p.limits(nurse).max_consecutive_nights;
            let mut streak = 0u32;
            let mut last_night: Option<usize> = None;
            for a in timeline {
                if a.shift != ShiftType::Night {
                    streak = 0;
                    last_night = None;
                    continue;
                }
                streak = match last_night {
                    Some(prev) if prev + 1 == a.date => streak + 1,
                    _ => 1,
                };
                last_night = Some(a.date);
                if streak > max {
                    out.push(self.violation(
                        ViolationType::MaxConsecutiveNights,
                        nurse,
                        a,
                        format!(
                            "Nurse '{}' works night {} in a row (max {})",
                            p.nurses()[nurse].id,
                            streak,
                            max
                        ),
                    ));
                }
            }
        }
    }

    fn check_weekly_hours(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        let mut hours = vec![0u32; p.week_count()];
        for (nurse, timeline) in timelines.iter().enumerate() {
            hours.fill(0);
            for a in timeline {
                hours[p.week_of(a.date)] += a.shift.hours();
            }
            let ceiling = p.limits(nurse).weekly_hour_ceiling;
            for (week, &total) in hours.iter().enumerate() {
                if total > ceiling {
                    out.push(
                        Violation::new(
                            ViolationType::MaxWeeklyHours,
                            p.week_start(week),
                            format!(
                                "Nurse '{}' works {}h in the week of {} (max {}h)",
                                p.nurses()[nurse].id,
                                total,
                                p.week_start(week),
                                ceiling
                            ),
                        )
                        .for_nurse(p.nurses()[nurse].id.as_str()),
                    );
                }
            }
        }
    }

    fn check_rest_period(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        let dates = p.dates();
        for (nurse, timeline) in timelines.iter().enumerate() {
            let min_rest = i64::from(p.limits(nurse).min_rest_hours);
            for pair in timeline.windows(2) {
                let (prev, next) = (&pair[0], &pair[1]);
                let rest =
                    next.shift.start_on(dates[next.date]) - prev.shift.end_on(dates[prev.date]);
                if rest.num_hours() < min_rest {
                    out.push(self.violation(
                        ViolationType::RestPeriod,
                        nurse,
                        next,
                        format!(
                            "Nurse '{}' rests {}h before {} {} (min {}h)",
                            p.nurses()[nurse].id,
                            rest.num_hours(),
                            dates[next.date],
                            next.shift,
                            min_rest
                        ),
                    ));
                }
            }
        }
    }

    fn check_consecutive_days(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        for (nurse, timeline) in timelines.iter().enumerate() {
            let max = p.limits(nurse).max_consecutive_days;
            let mut streak = 0u32;
            let mut last_date: Option<usize> = None;
            for a in timeline {
                streak = match last_date {
                    Some(prev) if prev == a.date => continue,
                    Some(prev) if prev + 1 == a.date => streak + 1,
                    _ => 1,
                };
                last_date = Some(a.date);
                if streak > max {
                    out.push(self.violation(
                        ViolationType::MaxConsecutiveDays,
                        nurse,
                        a,
                        format!(
                            "Nurse '{}' works day {} in a row (max {})",
                            p.nurses()[nurse].id,
                            streak,
                            max
                        ),
                    ));
                }
            }
        }
    }

    /// Only weeks lying fully inside the date range are checked.
    fn check_days_off(&self, timelines: &[Vec<NurseShift>], out: &mut Vec<Violation>) {
        let p = self.problem;
        let complete: Vec<usize> = (0..p.week_count()).filter(|&w| p.week_is_complete(w)).collect();
        if complete.is_empty() {
            return;
        }
        for (nurse, timeline) in timelines.iter().enumerate() {
            let min_off = p.limits(nurse).min_days_off_per_week;
            for &week in &complete {
                let mut worked: Vec<usize> = timeline
                    .iter()
                    .filter(|a| p.week_of(a.date) == week)
                    .map(|a| a.date)
                    .collect();
                worked.dedup();
                let off = 7u32.saturating_sub(worked.len() as u32);
                if off < min_off {
                    out.push(
                        Violation::new(
                            ViolationType::MinDaysOff,
                            p.week_start(week),
                            format!(
                                "Nurse '{}' has {} day(s) off in the week of {} (min {})",
                                p.nurses()[nurse].id,
                                off,
                                p.week_start(week),
                                min_off
                            ),
                        )
                        .for_nurse(p.nurses()[nurse].id.as_str()),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SchedulerSettings;
    use crate::models::{DayAvailability, Nurse, Role, Severity, UnavailabilityConstraint, Ward};
    use crate::scheduler::RosterRequest;
    use chrono::{NaiveDate, Weekday};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, day).unwrap()
    }

    fn night_problem(days: u32) -> RosterProblem {
        let request = RosterRequest::new(d(10), d(10 + days - 1))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Night, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_consecutive_nights(2))
            .with_nurse(Nurse::new("N2"));
        RosterProblem::new(&request, &SchedulerSettings::default())
    }

    fn assign(p: &RosterProblem, plan: &[(usize, usize, ShiftType, usize)]) -> RosterChromosome {
        let mut ch = RosterChromosome::empty(p.slot_count());
        for &(date, ward, shift, nurse) in plan {
            ch.slot_mut(p.slot_index(date, ward, shift)).push(nurse);
        }
        ch
    }

    fn of_type(violations: &[Violation], kind: ViolationType) -> Vec<&Violation> {
        violations.iter().filter(|v| v.violation_type == kind).collect()
    }

    #[test]
    fn test_consecutive_nights_flags_third_and_fourth() {
        let p = night_problem(4);
        let plan: Vec<_> = (0..4).map(|day| (day, 0, ShiftType::Night, 0)).collect();
        let violations = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &plan));

        let nights = of_type(&violations, ViolationType::MaxConsecutiveNights);
        assert_eq!(nights.len(), 2);
        assert_eq!(nights[0].date, d(12));
        assert_eq!(nights[1].date, d(13));
        assert!(nights.iter().all(|v| v.severity == Severity::High));
        assert_eq!(nights[0].nurse_id.as_deref(), Some("N1"));
    }

    #[test]
    fn test_gap_resets_night_streak() {
        let p = night_problem(5);
        let plan = [
            (0, 0, ShiftType::Night, 0),
            (1, 0, ShiftType::Night, 0),
            (2, 0, ShiftType::Night, 1),
            (3, 0, ShiftType::Night, 0),
            (4, 0, ShiftType::Night, 0),
        ];
        let violations = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &plan));
        assert!(of_type(&violations, ViolationType::MaxConsecutiveNights).is_empty());
    }

    #[test]
    fn test_unavailability_is_critical() {
        let request = RosterRequest::new(d(14), d(16))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1"))
            .with_constraint(
                UnavailabilityConstraint::new("N1", d(1), d(30))
                    .with_blocked(d(15), [ShiftType::Day])
                    .approved(),
            );
        let p = RosterProblem::new(&request, &SchedulerSettings::default());
        let ch = assign(&p, &[(1, 0, ShiftType::Day, 0), (2, 0, ShiftType::Day, 0)]);

        let violations = ConstraintEvaluator::new(&p).evaluate(&ch);
        let critical: Vec<_> = violations.iter().filter(|v| v.is_critical()).collect();
        assert_eq!(critical.len(), 1);
        assert_eq!(critical[0].date, d(15));
        assert_eq!(critical[0].shift, Some(ShiftType::Day));
    }

    #[test]
    fn test_weekly_hours() {
        let request = RosterRequest::new(d(10), d(16))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_weekly_hours(32));
        let p = RosterProblem::new(&request, &SchedulerSettings::default());

        let four: Vec<_> = (0..4).map(|day| (day, 0, ShiftType::Day, 0)).collect();
        let ok = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &four));
        assert!(of_type(&ok, ViolationType::MaxWeeklyHours).is_empty());

        let five: Vec<_> = (0..5).map(|day| (day, 0, ShiftType::Day, 0)).collect();
        let over = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &five));
        let weekly = of_type(&over, ViolationType::MaxWeeklyHours);
        assert_eq!(weekly.len(), 1);
        assert_eq!(weekly[0].severity, Severity::Medium);
        assert!(weekly[0].message.contains("40h"));
    }

    #[test]
    fn test_overtime_raises_ceiling() {
        let request = RosterRequest::new(d(10), d(16))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_weekly_hours(32));
        let p = RosterProblem::new(
            &request,
            &SchedulerSettings::default().with_allow_overtime(true),
        );
        let five: Vec<_> = (0..5).map(|day| (day, 0, ShiftType::Day, 0)).collect();

        let violations = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &five));
        assert!(of_type(&violations, ViolationType::MaxWeeklyHours).is_empty());
    }

    #[test]
    fn test_rest_period() {
        let p = night_problem(2);
        // Evening ends 23:00, next day starts 07:00: 8h < 11h
        let ch = assign(&p, &[(0, 0, ShiftType::Evening, 1), (1, 0, ShiftType::Day, 1)]);
        let violations = ConstraintEvaluator::new(&p).evaluate(&ch);

        let rest = of_type(&violations, ViolationType::RestPeriod);
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].date, d(11));
    }

    #[test]
    fn test_understaffed_and_charge() {
        let request = RosterRequest::new(d(10), d(10))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 2, 1))
            .with_nurse(Nurse::new("N1"))
            .with_nurse(Nurse::new("N2").with_role(Role::Charge));
        let p = RosterProblem::new(&request, &SchedulerSettings::default());

        let short =
            ConstraintEvaluator::new(&p).evaluate(&assign(&p, &[(0, 0, ShiftType::Day, 0)]));
        assert_eq!(of_type(&short, ViolationType::UnderStaffed).len(), 1);
        assert_eq!(of_type(&short, ViolationType::ChargeNurseShortage).len(), 1);

        let full = ConstraintEvaluator::new(&p).evaluate(&assign(
            &p,
            &[(0, 0, ShiftType::Day, 0), (0, 0, ShiftType::Day, 1)],
        ));
        assert!(full.is_empty());
    }

    #[test]
    fn test_availability_breach_reported() {
        let request = RosterRequest::new(d(10), d(10))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1").with_availability(Weekday::Mon, DayAvailability::off()));
        let p = RosterProblem::new(
            &request,
            &SchedulerSettings::default().with_enforce_availability(false),
        );
        let violations =
            ConstraintEvaluator::new(&p).evaluate(&assign(&p, &[(0, 0, ShiftType::Day, 0)]));
        assert_eq!(of_type(&violations, ViolationType::AvailabilityViolation).len(), 1);
    }

    #[test]
    fn test_consecutive_days_and_days_off() {
        let request = RosterRequest::new(d(10), d(16))
            .with_ward(Ward::new("W1").with_requirement(ShiftType::Day, 1, 0))
            .with_nurse(Nurse::new("N1").with_max_weekly_hours(80));
        let p = RosterProblem::new(&request, &SchedulerSettings::default());
        let every_day: Vec<_> = (0..7).map(|day| (day, 0, ShiftType::Day, 0)).collect();

        let violations = ConstraintEvaluator::new(&p).evaluate(&assign(&p, &every_day));
        let days = of_type(&violations, ViolationType::MaxConsecutiveDays);
        assert_eq!(days.len(), 1);
        assert_eq!(days[0].date, d(16));
        assert_eq!(of_type(&violations, ViolationType::MinDaysOff).len(), 1);
    }

    #[test]
    fn test_empty_roster_only_reports_staffing() {
        let p = night_problem(3);
        let violations =
            ConstraintEvaluator::new(&p).evaluate(&RosterChromosome::empty(p.slot_count()));
        assert_eq!(violations.len(), 3);
        assert!(violations
            .iter()
            .all(|v| v.violation_type == ViolationType::UnderStaffed && v.nurse_id.is_none()));
    }
}
