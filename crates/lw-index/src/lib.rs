//! Workspace version table for the local workspace engine.
//!
//! The version table records, for every tracked path, what the client last
//! fetched from the server and where it lives on disk. Rows are indexed
//! twice, by local path and by server path, and both indices are kept in
//! step on every mutation.
//!
//! # Key Types
//!
//! - [`WorkspaceLocalItem`] -- One row: paths, version, flags and file data
//! - [`VersionTable`] -- The dual-indexed row store with load/save
//! - [`VersionTableHeader`] -- Pending-reconcile flag only, cheap to load
//! - [`WorkspaceLocalItemEnumerator`] -- Lazy walk by local or server path
//! - [`ComposedQuery`] -- Several server-path queries merged into one sequence

pub mod enumerate;
pub mod error;
pub mod flags;
pub mod header;
pub mod item;
pub mod pair;
pub mod query;
pub mod table;

pub use enumerate::{CommittedState, WorkspaceLocalItemEnumerator};
pub use error::{IndexError, IndexResult};
pub use flags::LocalItemFlags;
pub use header::VersionTableHeader;
pub use item::{LocalVersionUpdate, PropertyValue, RowSchema, WorkspaceLocalItem};
pub use pair::{ItemPair, RowId, WorkspaceLocalItemPair};
pub use query::{ComposedEnumerator, ComposedQuery, ServerItemQuery};
pub use table::{ReconcileKey, ReconcileUpdates, VersionTable};
