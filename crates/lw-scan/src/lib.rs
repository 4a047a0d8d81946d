//! Filesystem scanner for the local workspace engine.
//!
//! The scanner walks a local tree and reports the entries that are
//! candidates for pending adds or for comparison with the version table.
//! It is a one-shot, pull-based iterator.
//!
//! # Key Types
//!
//! - [`Scanner`] -- Breadth-first walk driven by a stack of per-level queues
//! - [`ScannedItem`] -- One reported entry with lazily fetched attributes
//! - [`ScanOptions`] -- Hidden entries, excluded paths, patterns, ignore files and reserved names
//! - [`AttributeSource`] -- Where entry attributes come from

pub mod attributes;
pub mod error;
pub mod options;
pub mod scanner;

pub use attributes::{AttributeSource, FileAttributes, FsAttributes};
pub use error::{ScanError, ScanResult};
pub use options::{default_baseline_folder_names, ScanOptions, MAX_BASELINE_FOLDER_SUFFIX};
pub use scanner::{EntryKind, ScannedItem, Scanner};
