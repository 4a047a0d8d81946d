//! Pending change algebra for the local workspace engine.
//!
//! # Modules
//!
//! - [`rename`] -- Rename application order and target collision checks
//! - [`scope`] -- Committed-path queries for a target path with renames pending
//! - [`undo`] -- [`UndoneChange`]: what an undo removes and what it leaves
//! - [`guard`] -- [`DuplicateRequestGuard`] for one batch of requests
//! - [`context`] -- [`BatchContext`]: cache pinning and the guard for a batch
//! - [`error`] -- Error types

pub mod context;
pub mod error;
pub mod guard;
pub mod rename;
pub mod scope;
pub mod undo;

pub use context::BatchContext;
pub use error::{PendingError, PendingResult};
pub use guard::DuplicateRequestGuard;
pub use rename::{check_target_collisions, compare_renames, rename_steps, Rename, RenameKind, RenameStep};
pub use scope::{committed_queries, compose_query, ApplicableRename};
pub use undo::{sort_for_undo, PendingChangeRecord, UndoneChange};
