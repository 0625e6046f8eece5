//! The scheduling board store.
//!
//! `ScheduleStore` is the single owner of technicians, jobs, selection and
//! sync status. Scheduling UIs read snapshots, call the mutation methods,
//! and subscribe to be told when to re-render.
//!
//! # Transitions
//! Every operation computes the next state and publishes it as one
//! transition: a subscriber never observes half of a `move_job` or a
//! `bulk_delete_jobs`. Operations aimed at an ID that doesn't exist are
//! silent no-ops and publish nothing.
//!
//! # Persistence
//! After each transition that changes the technicians, jobs or `last_sync`,
//! those three are written to the configured `StateStorage`. Loading, error
//! and selection are never written, and changing only them writes nothing. The blob is rehydrated once, when the store is constructed.
//!
//! # Sync
//! `sync_with_server` does not lock the store while the request is in
//! flight. Local edits made during that window are applied immediately and
//! are overwritten if the sync succeeds. Concurrent syncs are not
//! de-duplicated; whichever finishes last writes the final `is_loading`.

mod state;

pub use state::ScheduleState;

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::watch;

use crate::config::StoreConfig;
use crate::error::SyncResult;
use crate::models::{Job, JobPatch, JobStatus, JobUpdate, Technician, TechnicianPatch};
use crate::persist::{index_by_id, FileStorage, PersistedSchedule, StateStorage};
use crate::sync::{HttpScheduleSource, ScheduleSource};

/// Default name of the persisted blob.
pub const DEFAULT_STORAGE_NAME: &str = "schedule-storage";

/// Observable, persisted store of technicians and jobs.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::{TimeZone, Utc};
/// use schedule_store::models::{Job, Technician};
/// use schedule_store::persist::MemoryStorage;
/// use schedule_store::store::ScheduleStore;
/// use schedule_store::sync::HttpScheduleSource;
///
/// let store = ScheduleStore::new(
///     Arc::new(MemoryStorage::new()),
///     Arc::new(HttpScheduleSource::new("http://localhost:3000/api/schedule")),
/// );
/// let nine = Utc.with_ymd_and_hms(2024, 3, 4, 9, 0, 0).unwrap();
/// let ten = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
///
/// store.add_technician(Technician::new("T1"));
/// store.add_job(Job::new("J1", "T1", nine, ten));
/// assert!(store.has_conflict("T1", nine, ten, None));
/// assert!(!store.has_conflict("T1", ten, ten + chrono::Duration::hours(1), None));
/// ```
pub struct ScheduleStore {
    state: watch::Sender<ScheduleState>,
    storage: Arc<dyn StateStorage>,
    storage_name: String,
    source: Arc<dyn ScheduleSource>,
}

impl ScheduleStore {
    /// Creates a store, rehydrating from the default blob name.
    pub fn new(storage: Arc<dyn StateStorage>, source: Arc<dyn ScheduleSource>) -> Self {
        Self::with_storage_name(storage, source, DEFAULT_STORAGE_NAME)
    }

    /// Creates a store, rehydrating from a named blob.
    pub fn with_storage_name(
        storage: Arc<dyn StateStorage>,
        source: Arc<dyn ScheduleSource>,
        storage_name: impl Into<String>,
    ) -> Self {
        let storage_name = storage_name.into();
        let initial = ScheduleState::from_persisted(rehydrate(storage.as_ref(), &storage_name));
        tracing::debug!(
            blob = %storage_name,
            technicians = initial.technicians.len(),
            jobs = initial.jobs.len(),
            "Rehydrated schedule store"
        );

        let (state, _) = watch::channel(initial);
        Self {
            state,
            storage,
            storage_name,
            source,
        }
    }

    /// Creates a file-persisted store syncing over HTTP.
    pub fn from_config(config: &StoreConfig) -> SyncResult<Self> {
        let source = HttpScheduleSource::from_config(config)?;
        Ok(Self::with_storage_name(
            Arc::new(FileStorage::from_config(config)),
            Arc::new(source),
            config.storage_name.clone(),
        ))
    }

    // ------------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------------

    /// A copy of the current state. Cheap: collections are shared.
    pub fn snapshot(&self) -> ScheduleState {
        self.state.borrow().clone()
    }

    /// Subscribes to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ScheduleState> {
        self.state.subscribe()
    }

    // ------------------------------------------------------------------------
    // Technicians
    // ------------------------------------------------------------------------

    /// Replaces the whole technician collection.
    pub fn set_technicians(&self, technicians: Vec<Technician>) {
        self.transition("set_technicians", |s| {
            s.technicians = Arc::new(index_by_id(technicians));
            true
        });
    }

    /// Inserts a technician, overwriting any with the same ID.
    pub fn add_technician(&self, technician: Technician) {
        self.transition("add_technician", |s| {
            let mut technicians = (*s.technicians).clone();
            technicians.insert(technician.id.clone(), technician);
            s.technicians = Arc::new(technicians);
            true
        });
    }

    /// Merges `patch` onto an existing technician.
    pub fn update_technician(&self, id: &str, patch: TechnicianPatch) {
        self.transition("update_technician", |s| {
            if !s.technicians.contains_key(id) {
                return false;
            }
            let mut technicians = (*s.technicians).clone();
            if let Some(existing) = technicians.get_mut(id) {
                existing.apply(&patch);
            }
            s.technicians = Arc::new(technicians);
            true
        });
    }

    /// Removes a technician together with all of their jobs.
    pub fn remove_technician(&self, id: &str) {
        self.transition("remove_technician", |s| {
            let owns_jobs = s.jobs.values().any(|j| j.technician_id == id);
            let selected = s.selected_technician_id.as_deref() == Some(id);
            if !s.technicians.contains_key(id) && !owns_jobs && !selected {
                return false;
            }

            let mut technicians = (*s.technicians).clone();
            technicians.remove(id);
            s.technicians = Arc::new(technicians);

            if owns_jobs {
                let jobs = s
                    .jobs
                    .iter()
                    .filter(|(_, j)| j.technician_id != id)
                    .map(|(k, j)| (k.clone(), j.clone()))
                    .collect();
                s.jobs = Arc::new(jobs);
            }

            if selected {
                s.selected_technician_id = None;
            }
            true
        });
    }

    // ------------------------------------------------------------------------
    // Jobs
    // ------------------------------------------------------------------------

    /// Replaces the whole job collection.
    pub fn set_jobs(&self, jobs: Vec<Job>) {
        self.transition("set_jobs", |s| {
            s.jobs = Arc::new(index_by_id(jobs));
            true
        });
    }

    /// Inserts a job, overwriting any with the same ID.
    pub fn add_job(&self, job: Job) {
        self.transition("add_job", |s| {
            let mut jobs = (*s.jobs).clone();
            jobs.insert(job.id.clone(), job);
            s.jobs = Arc::new(jobs);
            true
        });
    }

    /// Merges `patch` onto an existing job.
    pub fn update_job(&self, id: &str, patch: JobPatch) {
        self.transition("update_job", |s| {
            if !s.jobs.contains_key(id) {
                return false;
            }
            let mut jobs = (*s.jobs).clone();
            if let Some(existing) = jobs.get_mut(id) {
                existing.apply(&patch);
            }
            s.jobs = Arc::new(jobs);
            true
        });
    }

    /// Reassigns a job's technician and interval in one transition.
    ///
    /// Overlaps are not rejected here; check `has_conflict` first.
    pub fn move_job(
        &self,
        id: &str,
        technician_id: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) {
        self.transition("move_job", |s| {
            if !s.jobs.contains_key(id) {
                return false;
            }
            let mut jobs = (*s.jobs).clone();
            if let Some(existing) = jobs.get_mut(id) {
                existing.technician_id = technician_id.to_string();
                existing.start_time = start_time;
                existing.end_time = end_time;
            }
            s.jobs = Arc::new(jobs);
            true
        });
    }

    /// Removes a job, clearing the job selection if it pointed at it.
    pub fn delete_job(&self, id: &str) {
        self.transition("delete_job", |s| {
            if !s.jobs.contains_key(id) && s.selected_job_id.as_deref() != Some(id) {
                return false;
            }
            let mut jobs = (*s.jobs).clone();
            jobs.remove(id);
            s.jobs = Arc::new(jobs);
            if s.selected_job_id.as_deref() == Some(id) {
                s.selected_job_id = None;
            }
            true
        });
    }

    /// Copies a job to start at `start_time`, keeping its duration.
    ///
    /// The copy gets a fresh ID derived from the source ID and is reset to
    /// `Scheduled`. Returns the new ID, or `None` if the source is missing.
    pub fn duplicate_job(&self, id: &str, start_time: DateTime<Utc>) -> Option<String> {
        let copy = {
            let state = self.state.borrow();
            let source = state.job_by_id(id)?;

            let mut copy = source.clone();
            copy.id = copy_id(&source.id, |candidate| state.jobs.contains_key(candidate));
            copy.start_time = start_time;
            copy.end_time = start_time + source.duration();
            copy.status = JobStatus::Scheduled;
            copy
        };

        let new_id = copy.id.clone();
        self.add_job(copy);
        Some(new_id)
    }

    // ------------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------------

    /// Focuses a job, or clears the focus with `None`.
    pub fn select_job(&self, id: Option<&str>) {
        self.transition("select_job", |s| {
            let next = id.map(str::to_string);
            if s.selected_job_id == next {
                return false;
            }
            s.selected_job_id = next;
            true
        });
    }

    /// Focuses a technician, or clears the focus with `None`.
    pub fn select_technician(&self, id: Option<&str>) {
        self.transition("select_technician", |s| {
            let next = id.map(str::to_string);
            if s.selected_technician_id == next {
                return false;
            }
            s.selected_technician_id = next;
            true
        });
    }

    // ------------------------------------------------------------------------
    // Bulk operations
    // ------------------------------------------------------------------------

    /// Applies many patches in one transition.
    ///
    /// Unknown IDs are skipped. Several entries for the same job apply in
    /// order, so the last one wins on any field they share.
    pub fn bulk_update_jobs(&self, updates: Vec<JobUpdate>) {
        self.transition("bulk_update_jobs", |s| {
            if !updates.iter().any(|u| s.jobs.contains_key(&u.job_id)) {
                return false;
            }
            let mut jobs = (*s.jobs).clone();
            for update in &updates {
                if let Some(existing) = jobs.get_mut(&update.job_id) {
                    existing.apply(&update.patch);
                }
            }
            s.jobs = Arc::new(jobs);
            true
        });
    }

    /// Removes many jobs in one transition, clearing the job selection if
    /// it was among them.
    pub fn bulk_delete_jobs<I, S>(&self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids: HashSet<String> = ids.into_iter().map(|id| id.as_ref().to_string()).collect();
        self.transition("bulk_delete_jobs", |s| {
            let selection_hit = s
                .selected_job_id
                .as_ref()
                .is_some_and(|selected| ids.contains(selected));
            let removes_any = ids.iter().any(|id| s.jobs.contains_key(id));
            if !removes_any && !selection_hit {
                return false;
            }

            if removes_any {
                let jobs = s
                    .jobs
                    .iter()
                    .filter(|(k, _)| !ids.contains(*k))
                    .map(|(k, j)| (k.clone(), j.clone()))
                    .collect();
                s.jobs = Arc::new(jobs);
            }
            if selection_hit {
                s.selected_job_id = None;
            }
            true
        });
    }

    // ------------------------------------------------------------------------
    // Sync
    // ------------------------------------------------------------------------

    /// Replaces local technicians and jobs with the server's.
    ///
    /// Never fails: a failure is recorded in `error` and the existing
    /// collections are kept. `is_loading` is true for the duration of the
    /// call.
    pub async fn sync_with_server(&self) {
        self.transition("sync_with_server/pending", |s| {
            s.is_loading = true;
            s.error = None;
            true
        });

        match self.source.fetch().await {
            Ok(payload) => {
                tracing::info!(
                    technicians = payload.technicians.len(),
                    jobs = payload.jobs.len(),
                    "Synced schedule with server"
                );
                // Three separate transitions: observers can briefly see the
                // server's technicians next to the local jobs.
                self.set_technicians(payload.technicians);
                self.set_jobs(payload.jobs);
                self.transition("sync_with_server/fulfilled", |s| {
                    s.last_sync = Some(Utc::now());
                    true
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Schedule sync failed");
                let message = e.to_string();
                self.set_error(Some(message));
            }
        }

        self.set_loading(false);
    }

    /// Sets the loading flag directly.
    pub fn set_loading(&self, loading: bool) {
        self.transition("set_loading", |s| {
            if s.is_loading == loading {
                return false;
            }
            s.is_loading = loading;
            true
        });
    }

    /// Sets or clears the error message directly.
    pub fn set_error(&self, error: Option<String>) {
        self.transition("set_error", |s| {
            if s.error == error {
                return false;
            }
            s.error = error;
            true
        });
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Looks up a technician.
    pub fn technician_by_id(&self, id: &str) -> Option<Technician> {
        self.state.borrow().technician_by_id(id).cloned()
    }

    /// Looks up a job.
    pub fn job_by_id(&self, id: &str) -> Option<Job> {
        self.state.borrow().job_by_id(id).cloned()
    }

    /// All jobs assigned to a technician, ordered by start time.
    pub fn jobs_by_technician(&self, technician_id: &str) -> Vec<Job> {
        self.state
            .borrow()
            .jobs_by_technician(technician_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Jobs lying entirely inside `[start, end]`, ordered by start time.
    pub fn jobs_by_date_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<Job> {
        self.state
            .borrow()
            .jobs_by_date_range(start, end)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Whether `[start, end)` overlaps any job of `technician_id` other
    /// than `exclude_job_id`.
    pub fn has_conflict(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_job_id: Option<&str>,
    ) -> bool {
        self.state
            .borrow()
            .has_conflict(technician_id, start, end, exclude_job_id)
    }

    /// The jobs `has_conflict` would report.
    pub fn conflicting_jobs(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_job_id: Option<&str>,
    ) -> Vec<Job> {
        self.state
            .borrow()
            .conflicting_jobs(technician_id, start, end, exclude_job_id)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Busy fraction of `[start, end)` for a technician.
    pub fn technician_utilization(
        &self,
        technician_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Option<f64> {
        self.state
            .borrow()
            .technician_utilization(technician_id, start, end)
    }

    // ------------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------------

    /// Publishes one transition if `apply` reports a change, then persists
    /// if a persisted field changed.
    fn transition<F>(&self, action: &'static str, apply: F)
    where
        F: FnOnce(&mut ScheduleState) -> bool,
    {
        let (technicians, jobs, last_sync) = {
            let s = self.state.borrow();
            (s.technicians.clone(), s.jobs.clone(), s.last_sync)
        };

        if !self.state.send_if_modified(apply) {
            tracing::trace!(action, "No-op transition");
            return;
        }
        tracing::debug!(action, "State transition");

        let persisted_changed = {
            let s = self.state.borrow();
            !Arc::ptr_eq(&s.technicians, &technicians)
                || !Arc::ptr_eq(&s.jobs, &jobs)
                || s.last_sync != last_sync
        };
        if persisted_changed {
            self.persist();
        }
    }

    fn persist(&self) {
        let persisted = self.state.borrow().to_persisted();
        let result = persisted
            .to_blob()
            .and_then(|blob| self.storage.save(&self.storage_name, &blob));
        if let Err(e) = result {
            tracing::warn!(blob = %self.storage_name, error = %e, "Failed to persist schedule");
        }
    }
}

/// Loads the persisted blob, falling back to empty state on any failure.
fn rehydrate(storage: &dyn StateStorage, name: &str) -> PersistedSchedule {
    match storage.load(name) {
        Ok(Some(blob)) => PersistedSchedule::from_blob(name, &blob),
        Ok(None) => PersistedSchedule::default(),
        Err(e) => {
            tracing::warn!(blob = name, error = %e, "Failed to read persisted schedule");
            PersistedSchedule::default()
        }
    }
}

/// Builds `{source}-copy-{millis}-{random}`, retrying on the rare collision.
fn copy_id(source_id: &str, taken: impl Fn(&str) -> bool) -> String {
    let mut rng = rand::rng();
    loop {
        let candidate = format!(
            "{}-copy-{}-{:08x}",
            source_id,
            Utc::now().timestamp_millis(),
            rng.random::<u32>()
        );
        if !taken(&candidate) {
            return candidate;
        }
    }
}
