//! Store state snapshot and derived queries.
//!
//! Collections are held behind `Arc` and replaced, never mutated in place.
//! Two snapshots whose `jobs` are `Arc::ptr_eq` have identical jobs, which
//! lets subscribers skip work when an unrelated field changed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::{Job, Technician, TimeWindow};
use crate::persist::{index_by_id, PersistedSchedule};

/// Everything the store knows at one point in time.
#[derive(Debug, Clone, Default)]
pub struct ScheduleState {
    /// Technicians keyed by ID.
    pub technicians: Arc<HashMap<String, Technician>>,
    /// Jobs keyed by ID.
    pub jobs: Arc<HashMap<String, Job>>,
    /// True while a sync is in flight.
    pub is_loading: bool,
    /// Last sync failure message.
    pub error: Option<String>,
    /// When the last successful sync finished.
    pub last_sync: Option<DateTime<Utc>>,
    /// Focused job on the board.
    pub selected_job_id: Option<String>,
    /// Focused technician on the board.
    pub selected_technician_id: Option<String>,
}

impl ScheduleState {
    /// Builds the initial state from a rehydrated blob. Transient fields
    /// start at their defaults.
    pub fn from_persisted(persisted: PersistedSchedule) -> Self {
        Self {
            technicians: Arc::new(index_by_id(persisted.technicians)),
            jobs: Arc::new(index_by_id(persisted.jobs)),
            last_sync: persisted.last_sync,
            ..Self::default()
        }
    }

    /// The persisted subset: both collections as lists, plus `last_sync`.
    pub fn to_persisted(&self) -> PersistedSchedule {
        PersistedSchedule {
            technicians: self.technicians.values().cloned().collect(),
            jobs: self.jobs.values().cloned().collect(),
            last_sync: self.last_sync,
        }
    }

    /// Looks up a technician.
    pub fn technician_by_id(&self, id: &str) -> Option<&Technician> {
        self.technicians.get(id)
    }

    /// Looks up a job.
    pub fn job_by_id(&self, id: &str) -> Option<&Job> {
        self.jobs.get(id)
    }

    /// All jobs assigned to a technician, ordered by start time.
    pub fn jobs_by_technician(&self, technician_id: &str) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .values()
            .filter(|j| j.technician_id == technician_id)
            .collect();
        sort_by_start(&mut jobs);
        jobs
    }

    /// Jobs lying entirely inside `[start, end]`, ordered by start time.
    ///
    /// A job that only partially overlaps the range is excluded.
    pub fn jobs_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<&Job> {
        let mut jobs: Vec<&Job> = self
            .jobs
            .values()
            .filter(|j| j.window().is_within(start, end))
            .collect();
        sort_by_start(&mut jobs);
        jobs
    }

    /// Jobs of `technician_id` overlapping `[start, end)`, ignoring
    /// `exclude_job_id` (the job being moved, typically).
    pub fn conflicting_jobs(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_job_id: Option<&str>,
    ) -> Vec<&Job> {
        let candidate = TimeWindow::new(start, end);
        self.jobs_by_technician(technician_id)
            .into_iter()
            .filter(|j| exclude_job_id != Some(j.id.as_str()))
            .filter(|j| j.window().overlaps(&candidate))
            .collect()
    }

    /// Whether placing `[start, end)` on `technician_id` would overlap an
    /// existing job. Back-to-back jobs sharing one instant do not conflict.
    pub fn has_conflict(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_job_id: Option<&str>,
    ) -> bool {
        let candidate = TimeWindow::new(start, end);
        self.jobs.values().any(|j| {
            j.technician_id == technician_id
                && exclude_job_id != Some(j.id.as_str())
                && j.window().overlaps(&candidate)
        })
    }

    /// Fraction of `[start, end)` the technician spends on jobs.
    ///
    /// Jobs are clipped to the range. Overlapping jobs are counted twice,
    /// so a double-booked technician can exceed 1.0. Returns `None` for an
    /// empty or inverted range.
    pub fn technician_utilization(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<f64> {
        let range = TimeWindow::new(start, end);
        if !range.is_well_formed() {
            return None;
        }
        let busy_ms: i64 = self
            .jobs
            .values()
            .filter(|j| j.technician_id == technician_id)
            .filter_map(|j| j.window().overlap_duration(&range))
            .map(|d| d.num_milliseconds())
            .sum();
        Some(busy_ms as f64 / range.duration().num_milliseconds() as f64)
    }
}

fn sort_by_start(jobs: &mut [&Job]) {
    jobs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 4, hour, minute, 0).unwrap()
    }

    fn sample_state() -> ScheduleState {
        ScheduleState::from_persisted(PersistedSchedule {
            technicians: vec![Technician::new("T1"), Technician::new("T2")],
            jobs: vec![
                Job::new("J1", "T1", at(9, 0), at(10, 0)),
                Job::new("J2", "T1", at(13, 0), at(15, 0)),
                Job::new("J3", "T2", at(9, 30), at(11, 0)),
            ],
            last_sync: None,
        })
    }

    #[test]
    fn test_lookup() {
        let s = sample_state();
        assert_eq!(s.job_by_id("J1").unwrap().technician_id, "T1");
        assert!(s.job_by_id("J99").is_none());
        assert!(s.technician_by_id("T2").is_some());
        assert!(s.technician_by_id("T99").is_none());
    }

    #[test]
    fn test_jobs_by_technician() {
        let s = sample_state();
        let ids: Vec<&str> = s.jobs_by_technician("T1").iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["J1", "J2"]);
        assert!(s.jobs_by_technician("T99").is_empty());
    }

    #[test]
    fn test_jobs_by_date_range_full_containment() {
        let s = sample_state();
        let ids: Vec<&str> = s
            .jobs_by_date_range(at(9, 0), at(10, 30))
            .iter()
            .map(|j| j.id.as_str())
            .collect();
        // J3 (9:30-11:00) sticks out of the range.
        assert_eq!(ids, vec!["J1"]);

        let all = s.jobs_by_date_range(at(0, 0), at(23, 0));
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_has_conflict_cases() {
        let s = sample_state();
        // Starts inside J1.
        assert!(s.has_conflict("T1", at(9, 30), at(10, 30), None));
        // Ends inside J1.
        assert!(s.has_conflict("T1", at(8, 30), at(9, 30), None));
        // Contains J1.
        assert!(s.has_conflict("T1", at(8, 0), at(11, 0), None));
        // Inside J1.
        assert!(s.has_conflict("T1", at(9, 15), at(9, 45), None));
        // Back to back.
        assert!(!s.has_conflict("T1", at(10, 0), at(11, 0), None));
        assert!(!s.has_conflict("T1", at(8, 0), at(9, 0), None));
        // Disjoint.
        assert!(!s.has_conflict("T1", at(11, 0), at(12, 0), None));
        // Other technician's jobs don't count.
        assert!(!s.has_conflict("T2", at(13, 0), at(14, 0), None));
    }

    #[test]
    fn test_has_conflict_excludes_job() {
        let s = sample_state();
        assert!(!s.has_conflict("T1", at(9, 30), at(10, 30), Some("J1")));
        assert!(s.has_conflict("T1", at(9, 30), at(13, 30), Some("J1")));
    }

    #[test]
    fn test_conflicting_jobs() {
        let s = sample_state();
        let ids: Vec<&str> = s
            .conflicting_jobs("T1", at(9, 30), at(14, 0), None)
            .iter()
            .map(|j| j.id.as_str())
            .collect();
        assert_eq!(ids, vec!["J1", "J2"]);
    }

    #[test]
    fn test_technician_utilization() {
        let s = sample_state();
        // T1 busy 9-10 and 13-15 within 8-16: 3h / 8h.
        let util = s.technician_utilization("T1", at(8, 0), at(16, 0)).unwrap();
        assert!((util - 0.375).abs() < 1e-10);

        // J2 clipped to 14-15.
        let util = s.technician_utilization("T1", at(14, 0), at(16, 0)).unwrap();
        assert!((util - 0.5).abs() < 1e-10);

        assert_eq!(s.technician_utilization("T1", at(16, 0), at(8, 0)), None);
        assert_eq!(s.technician_utilization("T9", at(8, 0), at(16, 0)), Some(0.0));
    }

    #[test]
    fn test_persisted_roundtrip_ignores_transient() {
        let mut s = sample_state();
        s.is_loading = true;
        s.error = Some("boom".into());
        s.selected_job_id = Some("J1".into());

        let restored = ScheduleState::from_persisted(s.to_persisted());
        assert_eq!(restored.jobs, s.jobs);
        assert_eq!(restored.technicians, s.technicians);
        assert!(!restored.is_loading);
        assert_eq!(restored.error, None);
        assert_eq!(restored.selected_job_id, None);
    }
}
