//! Local item exclusions for the local workspace engine.
//!
//! Each server collection carries a list of file name patterns that are
//! never offered as candidates for pending adds. The server supplies a
//! default list, the user may remove entries from it, and every process on
//! the machine shares one cache file so those edits persist. Directories
//! may also carry a `.tfignore` file whose rules refine the list for their
//! subtree.
//!
//! # Key Types
//!
//! - [`ExclusionSet`] -- One collection's list and its save bookkeeping
//! - [`ExclusionCache`] -- All collections, loaded from and merged into the cache file
//! - [`ExclusionMatcher`] -- A list compiled into a case-insensitive glob set
//! - [`IgnoreFile`] -- Rules of one per-directory `.tfignore` file
//! - [`ExclusionCacheConfig`] -- Cache file location and on/off switch

pub mod cache;
pub mod config;
pub mod error;
pub mod ignore;
pub mod matcher;
pub mod set;
pub mod xml;

pub use cache::{Collection, ExclusionCache, ExclusionsUpdatedListener, ListenerId};
pub use config::{ExclusionCacheConfig, CACHE_FILE_NAME};
pub use error::{ExclusionError, ExclusionResult};
pub use ignore::{IgnoreEntry, IgnoreFile, IGNORE_FILE_NAME};
pub use matcher::ExclusionMatcher;
pub use set::{unknown_update_time, ExclusionSet, ALWAYS_EXCLUDED, BUILT_IN_EXCLUSIONS};
pub use xml::StoredCollection;
