//! Metadata table lifecycle for the local workspace engine.
//!
//! Each metadata table is a single binary file written through a
//! three-slot protocol so that a crash mid-save never leaves the table
//! without one complete copy. [`TableFile`] drives a table through its
//! states; the table itself only knows how to read and write its payload.
//!
//! # Key Types
//!
//! - [`TableFormat`] / [`WritableTable`] -- What a table must provide
//! - [`TableFile`] -- Lifecycle driver: Uninitialized, Loaded, Dirty
//! - [`CachedSource`] -- A loaded table another table may copy from
//! - [`TableCache`] -- Weakly-held loaded tables with optional pinning
//! - [`PendingChangesHeader`] -- Read-only summary of the pending changes table
//! - [`QueuedEditsTable`] -- Local paths queued for a server edit
//! - [`TableConfig`] -- Slot rename retry and buffering settings

pub mod cache;
pub mod config;
pub mod error;
pub mod file;
pub mod format;
pub mod header;
pub mod queued_edits;
pub mod slots;

pub use cache::TableCache;
pub use config::TableConfig;
pub use error::{TableError, TableResult};
pub use file::{CachedSource, FileStamp, TableFile, TableState};
pub use format::{TableFormat, WritableTable};
pub use header::PendingChangesHeader;
pub use queued_edits::QueuedEditsTable;
pub use slots::Slot;
