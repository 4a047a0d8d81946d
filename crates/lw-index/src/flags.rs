use std::fmt;

use serde::{Deserialize, Serialize};

/// Per-row state bits, persisted as a single byte.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalItemFlags(u8);

impl LocalItemFlags {
    /// The local copy was removed by a pending delete.
    pub const DELETED: Self = Self(0x01);
    /// The row has changed since the server last saw it.
    pub const PENDING_RECONCILE: Self = Self(0x02);
    /// The local file is gone without a pending change explaining it.
    pub const LOCAL_ITEM_MISSING: Self = Self(0x04);
    /// Seen during the current scan. Meaningless between scans.
    pub const SCANNED: Self = Self(0x08);
    pub const EXECUTABLE: Self = Self(0x10);
    pub const SYMLINK: Self = Self(0x20);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Insert or remove `other` depending on `on`.
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.insert(other);
        } else {
            self.remove(other);
        }
    }
}

impl fmt::Debug for LocalItemFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(LocalItemFlags, &str); 6] = [
            (LocalItemFlags::DELETED, "DELETED"),
            (LocalItemFlags::PENDING_RECONCILE, "PENDING_RECONCILE"),
            (LocalItemFlags::LOCAL_ITEM_MISSING, "LOCAL_ITEM_MISSING"),
            (LocalItemFlags::SCANNED, "SCANNED"),
            (LocalItemFlags::EXECUTABLE, "EXECUTABLE"),
            (LocalItemFlags::SYMLINK, "SYMLINK"),
        ];
        let names: Vec<&str> = NAMES
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();
        write!(f, "LocalItemFlags({})", names.join(" | "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_clear() {
        let mut flags = LocalItemFlags::default();
        flags.set(LocalItemFlags::DELETED, true);
        flags.insert(LocalItemFlags::SYMLINK);
        assert_eq!(flags.bits(), 0x21);
        assert!(flags.contains(LocalItemFlags::DELETED));

        flags.set(LocalItemFlags::DELETED, false);
        assert_eq!(flags, LocalItemFlags::SYMLINK);
        assert_eq!(format!("{flags:?}"), "LocalItemFlags(SYMLINK)");
    }
}
