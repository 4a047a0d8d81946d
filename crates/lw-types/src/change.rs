//! Pending change kinds.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Bit set of the kinds of change pended against one item.
///
/// A single pending change frequently carries several bits at once (a
/// renamed file that was also edited is `RENAME | EDIT`), so callers test
/// membership with [`contains`](Self::contains) or
/// [`contains_any`](Self::contains_any) rather than comparing for equality.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeType(u32);

impl ChangeType {
    pub const NONE: Self = Self(0);
    pub const ADD: Self = Self(2);
    pub const EDIT: Self = Self(4);
    pub const ENCODING: Self = Self(8);
    pub const RENAME: Self = Self(16);
    pub const DELETE: Self = Self(32);
    pub const UNDELETE: Self = Self(64);
    pub const BRANCH: Self = Self(128);
    pub const MERGE: Self = Self(256);
    pub const LOCK: Self = Self(512);
    pub const ROLLBACK: Self = Self(1024);
    pub const SOURCE_RENAME: Self = Self(2048);
    pub const TARGET_RENAME: Self = Self(4096);
    pub const PROPERTY: Self = Self(8192);

    const NAMED: [(Self, &'static str); 13] = [
        (Self::ADD, "ADD"),
        (Self::EDIT, "EDIT"),
        (Self::ENCODING, "ENCODING"),
        (Self::RENAME, "RENAME"),
        (Self::DELETE, "DELETE"),
        (Self::UNDELETE, "UNDELETE"),
        (Self::BRANCH, "BRANCH"),
        (Self::MERGE, "MERGE"),
        (Self::LOCK, "LOCK"),
        (Self::ROLLBACK, "ROLLBACK"),
        (Self::SOURCE_RENAME, "SOURCE_RENAME"),
        (Self::TARGET_RENAME, "TARGET_RENAME"),
        (Self::PROPERTY, "PROPERTY"),
    ];

    /// Build from raw bits.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// The raw bits.
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns `true` if no bits are set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if every bit of `other` is set in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if at least one bit of `other` is set in `self`.
    pub const fn contains_any(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// `self` with the bits of `other` cleared.
    pub const fn remove(self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }

    /// `self` restricted to the bits of `other`.
    pub const fn retain(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    /// Union of both bit sets.
    pub const fn combine(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

impl BitOr for ChangeType {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.combine(rhs)
    }
}

impl BitOrAssign for ChangeType {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = self.combine(rhs);
    }
}

impl fmt::Debug for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChangeType({self})")
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("NONE");
        }
        let mut first = true;
        let mut unnamed = self.0;
        for (flag, name) in Self::NAMED {
            if self.contains(flag) {
                if !first {
                    f.write_str(" | ")?;
                }
                f.write_str(name)?;
                first = false;
                unnamed &= !flag.0;
            }
        }
        if unnamed != 0 {
            if !first {
                f.write_str(" | ")?;
            }
            write!(f, "{unnamed:#x}")?;
        }
        Ok(())
    }
}

/// Whether a path names a file or a folder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ItemType {
    /// Either kind; used as a query wildcard.
    #[default]
    Any,
    /// A folder.
    Folder,
    /// A file.
    File,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_by_bits_not_equality() {
        let change = ChangeType::RENAME | ChangeType::EDIT;
        assert!(change.contains(ChangeType::RENAME));
        assert!(change.contains(ChangeType::EDIT));
        assert!(!change.contains(ChangeType::RENAME | ChangeType::DELETE));
        assert!(change.contains_any(ChangeType::RENAME | ChangeType::DELETE));
        assert_ne!(change, ChangeType::RENAME);
    }

    #[test]
    fn set_algebra() {
        let change = ChangeType::ADD | ChangeType::EDIT | ChangeType::LOCK;
        assert_eq!(change.remove(ChangeType::LOCK), ChangeType::ADD | ChangeType::EDIT);
        assert_eq!(change.retain(ChangeType::LOCK | ChangeType::DELETE), ChangeType::LOCK);
        assert_eq!(ChangeType::NONE.combine(ChangeType::DELETE), ChangeType::DELETE);
        assert!(change.remove(change).is_empty());
    }

    #[test]
    fn display_lists_names() {
        assert_eq!((ChangeType::RENAME | ChangeType::EDIT).to_string(), "EDIT | RENAME");
        assert_eq!(ChangeType::NONE.to_string(), "NONE");
        assert_eq!(ChangeType::from_bits(1).to_string(), "0x1");
    }
}
