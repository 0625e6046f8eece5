//! Whole-board integrity checks.
//!
//! The store only treats overlaps as advisory and never validates on
//! mutation. This module gives callers a full health report of a board,
//! e.g. after a sync or before publishing a day's dispatch. Detects:
//! - Duplicate technician or job IDs
//! - Jobs whose interval is empty or inverted
//! - Jobs referencing a technician that isn't on the board
//! - Overlapping jobs on the same technician (double bookings)

use std::collections::{HashMap, HashSet};

use crate::models::{Job, Technician};

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
    /// A job's start is not before its end.
    InvalidInterval,
    /// A job references a technician that doesn't exist.
    UnknownTechnician,
    /// Two jobs of one technician overlap.
    Overlap,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a scheduling board.
///
/// Checks:
/// 1. No duplicate technician IDs
/// 2. No duplicate job IDs
/// 3. Every job has `start < end`
/// 4. Every job's technician exists
/// 5. No two jobs of the same technician overlap
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_schedule(technicians: &[Technician], jobs: &[Job]) -> ValidationResult {
    let mut errors = Vec::new();

    let mut technician_ids = HashSet::new();
    for t in technicians {
        if !technician_ids.insert(t.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate technician ID: {}", t.id),
            ));
        }
    }

    let mut job_ids = HashSet::new();
    for job in jobs {
        if !job_ids.insert(job.id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate job ID: {}", job.id),
            ));
        }

        if !job.window().is_well_formed() {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!(
                    "Job '{}' starts at {} but ends at {}",
                    job.id, job.start_time, job.end_time
                ),
            ));
        }

        if !technician_ids.contains(job.technician_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTechnician,
                format!(
                    "Job '{}' references unknown technician '{}'",
                    job.id, job.technician_id
                ),
            ));
        }
    }

    errors.extend(detect_overlaps(jobs));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Reports every overlapping pair of jobs per technician.
///
/// # Algorithm
/// Sort each technician's jobs by start, then sweep: a job overlaps every
/// earlier job whose end lies after its start. Inverted intervals are left
/// to the interval check.
fn detect_overlaps(jobs: &[Job]) -> Vec<ValidationError> {
    let mut by_technician: HashMap<&str, Vec<&Job>> = HashMap::new();
    for job in jobs.iter().filter(|j| j.window().is_well_formed()) {
        by_technician
            .entry(job.technician_id.as_str())
            .or_default()
            .push(job);
    }

    let mut technician_ids: Vec<&str> = by_technician.keys().copied().collect();
    technician_ids.sort_unstable();

    let mut errors = Vec::new();
    for technician_id in technician_ids {
        let mut day = by_technician.remove(technician_id).unwrap_or_default();
        day.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));

        let mut open: Vec<&Job> = Vec::new();
        for job in day {
            open.retain(|prev| prev.end_time > job.start_time);
            for prev in &open {
                errors.push(ValidationError::new(
                    ValidationErrorKind::Overlap,
                    format!(
                        "Technician '{}' is double-booked: '{}' overlaps '{}'",
                        technician_id, prev.id, job.id
                    ),
                ));
            }
            open.push(job);
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, 0, 0).unwrap()
    }

    fn sample_technicians() -> Vec<Technician> {
        vec![Technician::new("T1"), Technician::new("T2")]
    }

    fn sample_jobs() -> Vec<Job> {
        vec![
            Job::new("J1", "T1", at(9), at(10)),
            Job::new("J2", "T1", at(10), at(12)),
            Job::new("J3", "T2", at(9), at(11)),
        ]
    }

    fn kinds(errors: &[ValidationError]) -> Vec<ValidationErrorKind> {
        errors.iter().map(|e| e.kind.clone()).collect()
    }

    #[test]
    fn test_valid_board() {
        assert!(validate_schedule(&sample_technicians(), &sample_jobs()).is_ok());
    }

    #[test]
    fn test_duplicate_technician_id() {
        let technicians = vec![Technician::new("T1"), Technician::new("T1")];
        let errors = validate_schedule(&technicians, &[]).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::DuplicateId]);
        assert!(errors[0].message.contains("technician"));
    }

    #[test]
    fn test_duplicate_job_id() {
        let jobs = vec![
            Job::new("J1", "T1", at(9), at(10)),
            Job::new("J1", "T2", at(9), at(10)),
        ];
        let errors = validate_schedule(&sample_technicians(), &jobs).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::DuplicateId && e.message.contains("job")));
    }

    #[test]
    fn test_inverted_interval() {
        let jobs = vec![Job::new("J1", "T1", at(10), at(9))];
        let errors = validate_schedule(&sample_technicians(), &jobs).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::InvalidInterval]);
    }

    #[test]
    fn test_unknown_technician() {
        let jobs = vec![Job::new("J1", "ghost", at(9), at(10))];
        let errors = validate_schedule(&sample_technicians(), &jobs).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::UnknownTechnician]);
    }

    #[test]
    fn test_overlap() {
        let mut jobs = sample_jobs();
        jobs.push(Job::new("J4", "T1", at(11), at(13)));
        let errors = validate_schedule(&sample_technicians(), &jobs).unwrap_err();
        assert_eq!(kinds(&errors), vec![ValidationErrorKind::Overlap]);
        assert!(errors[0].message.contains("'J2' overlaps 'J4'"));
    }

    #[test]
    fn test_overlap_reports_every_pair() {
        // J1 and J2 both overlap J3; J1 and J2 touch only at 10:00.
        let jobs = vec![
            Job::new("J1", "T1", at(9), at(10)),
            Job::new("J2", "T1", at(10), at(11)),
            Job::new("J3", "T1", at(9), at(11)),
        ];
        let errors = validate_schedule(&sample_technicians(), &jobs).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().all(|e| e.kind == ValidationErrorKind::Overlap));
    }

    #[test]
    fn test_multiple_errors() {
        let technicians = vec![Technician::new("T1"), Technician::new("T1")];
        let jobs = vec![
            Job::new("J1", "T9", at(9), at(10)),
            Job::new("J2", "T1", at(12), at(11)),
        ];
        let errors = validate_schedule(&technicians, &jobs).unwrap_err();
        assert!(errors.len() >= 3);
    }
}
