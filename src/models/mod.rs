//! Scheduling board domain models.
//!
//! | Type | Meaning |
//! |------|---------|
//! | Technician | Field worker jobs are dispatched to |
//! | Job | One visit assigned to a technician for `[start, end)` |
//! | TimeWindow | Half-open interval used for overlap checks |
//!
//! # Time Representation
//! All instants are `DateTime<Utc>`. Durations are `chrono::Duration`.

use serde::{Deserialize, Deserializer};

mod job;
mod technician;
mod window;

pub use job::{Job, JobPatch, JobStatus, JobUpdate};
pub use technician::{Technician, TechnicianPatch};
pub use window::TimeWindow;

/// An entity stored in a collection keyed by its ID.
pub trait Keyed {
    /// The unique key.
    fn key(&self) -> &str;
}

impl Keyed for Technician {
    fn key(&self) -> &str {
        &self.id
    }
}

impl Keyed for Job {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Deserializes a nullable patch field: absent stays `None`, an explicit
/// `null` becomes `Some(None)` (clear the value).
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
