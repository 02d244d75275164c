//! Input validation for rostering requests.
//!
//! Checks structural integrity of wards, nurses, and unavailability
//! requests before any search starts. Detects:
//! - Duplicate IDs
//! - Empty or inverted date ranges
//! - Malformed request validity windows
//! - Requests referencing unknown nurses
//! - Wards whose requirement can never be staffed
//!
//! A ward that is staffable in principle but loses every candidate on
//! some date (approved leave, weekday availability) is not an input
//! error; the search records it as under-coverage.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::config::QualificationPolicy;
use crate::scheduler::RosterRequest;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// End date before start date.
    EmptyDateRange,
    /// No wards supplied.
    NoWards,
    /// No nurses supplied.
    NoNurses,
    /// A request's `valid_from` is after its `valid_until`.
    MalformedConstraintWindow,
    /// A request references a nurse that doesn't exist.
    UnknownNurseReference,
    /// A ward needs staff but no nurse passes its static eligibility.
    NoEligibleNurses,
    /// A ward's minimum hierarchy level is outside 1..=3.
    InvalidHierarchyLevel,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a rostering request.
///
/// Checks:
/// 1. `start_date <= end_date`
/// 2. At least one ward and one nurse
/// 3. No duplicate ward or nurse IDs
/// 4. Ward hierarchy levels within 1..=3
/// 5. Every request window is well formed and names a known nurse
/// 6. Every ward with a positive requirement admits at least one nurse
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(request: &RosterRequest, policy: QualificationPolicy) -> ValidationResult {
    let mut errors = Vec::new();

    check_date_range(request.start_date, request.end_date, &mut errors);

    if request.wards.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoWards,
            "No wards to schedule",
        ));
    }
    if request.nurses.is_empty() {
        errors.push(ValidationError::new(
            ValidationErrorKind::NoNurses,
            "No nurses available",
        ));
    }

    let mut ward_ids = HashSet::new();
    for ward in &request.wards {
        if !ward_ids.insert(ward.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate ward ID: {}", ward.id),
            ));
        }
        if !(1..=3).contains(&ward.min_hierarchy_level) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidHierarchyLevel,
                format!(
                    "Ward '{}' has minimum hierarchy level {} (expected 1-3)",
                    ward.id, ward.min_hierarchy_level
                ),
            ));
        }
    }

    let mut nurse_ids = HashSet::new();
    for nurse in &request.nurses {
        if !nurse_ids.insert(nurse.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate nurse ID: {}", nurse.id),
            ));
        }
    }

    for constraint in &request.constraints {
        if !constraint.has_valid_window() {
            errors.push(ValidationError::new(
                ValidationErrorKind::MalformedConstraintWindow,
                format!(
                    "Unavailability request '{}' for nurse '{}' has window {} > {}",
                    constraint.id,
                    constraint.nurse_id,
                    constraint.valid_from,
                    constraint.valid_until
                ),
            ));
        }
        if !nurse_ids.contains(constraint.nurse_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownNurseReference,
                format!(
                    "Unavailability request '{}' references unknown nurse '{}'",
                    constraint.id, constraint.nurse_id
                ),
            ));
        }
    }

    if !request.nurses.is_empty() {
        for ward in request.wards.iter().filter(|w| w.needs_staff()) {
            if !request.nurses.iter().any(|n| ward.admits(n, policy)) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::NoEligibleNurses,
                    format!("Ward '{}' has no eligible nurses", ward.id),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_date_range(start: NaiveDate, end: NaiveDate, errors: &mut Vec<ValidationError>) {
    if end < start {
        errors.push(ValidationError::new(
            ValidationErrorKind::EmptyDateRange,
            format!("Date range is empty: {start} to {end}"),
        ));
    }
}
