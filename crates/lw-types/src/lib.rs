//! Foundation types for the local workspace engine.
//!
//! This crate defines the primitive vocabulary shared by every other `lw-*`
//! crate: how paths are ordered and compared, how item identities and
//! client signatures are represented, and the bit sets that describe
//! pending changes.
//!
//! # Key Types
//!
//! - [`PathKey`] -- A path ordered top-down (parents before children)
//! - [`NoCase`] -- A case-insensitive string key
//! - [`Guid`] -- A 16-byte identifier persisted in mixed-endian layout
//! - [`ChangeType`] -- Bit set of pending change kinds
//! - [`ItemType`] -- File / folder discriminator
//! - [`RecursionType`] -- Symbolic recursion level and its numeric depth bound

pub mod change;
pub mod error;
pub mod guid;
pub mod nocase;
pub mod path;
pub mod recursion;

pub use change::{ChangeType, ItemType};
pub use error::{TypeError, TypeResult};
pub use guid::Guid;
pub use nocase::NoCase;
pub use path::PathKey;
pub use recursion::RecursionType;
