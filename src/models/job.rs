//! Job model.
//!
//! A job is one scheduled visit assigned to a technician for the interval
//! `[start_time, end_time)`.
//!
//! # Wire Format
//! Field names are camelCase (`technicianId`, `startTime`, `endTime`) and
//! instants are RFC 3339 strings, matching the sync endpoint and the
//! persisted blob.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::TimeWindow;

/// A scheduled unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Unique job identifier.
    pub id: String,
    /// Assigned technician. Not required to exist in the store.
    pub technician_id: String,
    /// Short description shown on the board.
    #[serde(default)]
    pub title: String,
    /// Customer the work is for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// Service address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// Start of the occupied interval (inclusive).
    pub start_time: DateTime<Utc>,
    /// End of the occupied interval (exclusive).
    pub end_time: DateTime<Utc>,
    /// Lifecycle status.
    #[serde(default)]
    pub status: JobStatus,
    /// Business-specific metadata.
    #[serde(default)]
    pub attributes: HashMap<String, String>,
}

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// On the board, not yet sent to the technician.
    #[default]
    Scheduled,
    /// Sent to the technician.
    Dispatched,
    /// Technician is on site.
    InProgress,
    /// Work finished.
    Completed,
    /// Job called off.
    Cancelled,
}

/// Partial job fields for `update_job` and `bulk_update_jobs`.
///
/// `Some` fields overwrite, `None` fields leave the existing value alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobPatch {
    pub technician_id: Option<String>,
    pub title: Option<String>,
    /// `Some(None)` clears the customer.
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub customer_name: Option<Option<String>>,
    /// `Some(None)` clears the address.
    #[serde(
        default,
        deserialize_with = "super::nullable",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<Option<String>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub status: Option<JobStatus>,
    pub attributes: Option<HashMap<String, String>>,
}

/// One entry of a bulk update: the target job and the fields to merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobUpdate {
    pub job_id: String,
    pub patch: JobPatch,
}

impl Job {
    /// Creates a scheduled job.
    pub fn new(
        id: impl Into<String>,
        technician_id: impl Into<String>,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            technician_id: technician_id.into(),
            title: String::new(),
            customer_name: None,
            address: None,
            start_time,
            end_time,
            status: JobStatus::Scheduled,
            attributes: HashMap::new(),
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the customer name.
    pub fn with_customer(mut self, customer_name: impl Into<String>) -> Self {
        self.customer_name = Some(customer_name.into());
        self
    }

    /// Sets the service address.
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the status.
    pub fn with_status(mut self, status: JobStatus) -> Self {
        self.status = status;
        self
    }

    /// Adds a business attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// The occupied interval.
    #[inline]
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Scheduled length (end - start).
    #[inline]
    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    /// Merges a patch onto this job. The ID never changes.
    pub fn apply(&mut self, patch: &JobPatch) {
        if let Some(technician_id) = &patch.technician_id {
            self.technician_id = technician_id.clone();
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(customer_name) = &patch.customer_name {
            self.customer_name = customer_name.clone();
        }
        if let Some(address) = &patch.address {
            self.address = address.clone();
        }
        if let Some(start_time) = patch.start_time {
            self.start_time = start_time;
        }
        if let Some(end_time) = patch.end_time {
            self.end_time = end_time;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(attributes) = &patch.attributes {
            self.attributes = attributes.clone();
        }
    }
}

impl JobPatch {
    /// Patch that only changes the status.
    pub fn status(status: JobStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Patch that only reassigns the technician.
    pub fn reassign(technician_id: impl Into<String>) -> Self {
        Self {
            technician_id: Some(technician_id.into()),
            ..Default::default()
        }
    }
}

impl JobUpdate {
    /// Creates a bulk update entry.
    pub fn new(job_id: impl Into<String>, patch: JobPatch) -> Self {
        Self {
            job_id: job_id.into(),
            patch,
        }
    }
}
