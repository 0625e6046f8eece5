//! Scheduling board state for field-service dispatch.
//!
//! Holds the technicians and jobs a dispatcher works with, answers the
//! questions a scheduling UI asks of them, and keeps them persisted and in
//! step with the server.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `Technician`, `Job`, `JobStatus`, patches,
//!   `TimeWindow`
//! - **`store`**: `ScheduleStore`, the observable, persisted container with
//!   CRUD, bulk edits, selection, conflict detection and server sync
//! - **`persist`**: Persisted blob layout and `StateStorage` backends
//! - **`sync`**: `ScheduleSource` and the HTTP implementation
//! - **`validation`**: Whole-board integrity report (duplicates, bad
//!   intervals, dangling references, double bookings)
//! - **`config`**: `StoreConfig`
//! - **`error`**: `StorageError`, `SyncError`
//!
//! # Conflicts
//!
//! Jobs occupy `[start, end)`. Two jobs of the same technician conflict iff
//! `a.start < b.end && b.start < a.end`, so back-to-back jobs don't. The
//! store reports conflicts but never refuses a mutation because of one.

pub mod config;
pub mod error;
pub mod models;
pub mod persist;
pub mod store;
pub mod sync;
pub mod validation;

pub use config::StoreConfig;
pub use error::{StorageError, SyncError};
pub use store::{ScheduleState, ScheduleStore};
