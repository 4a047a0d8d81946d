//! Committed / uncommitted row pairing at one server path.

use crate::item::WorkspaceLocalItem;

/// Handle of a row in the version table's arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowId(pub(crate) u64);

/// The rows sharing one server path: at most one committed row and at
/// most one uncommitted row. Held by the server-path index; never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkspaceLocalItemPair {
    committed: Option<RowId>,
    uncommitted: Option<RowId>,
}

impl WorkspaceLocalItemPair {
    pub fn committed(&self) -> Option<RowId> {
        self.committed
    }

    pub fn uncommitted(&self) -> Option<RowId> {
        self.uncommitted
    }

    /// The slot selected by `committed`.
    pub fn get(&self, committed: bool) -> Option<RowId> {
        if committed {
            self.committed
        } else {
            self.uncommitted
        }
    }

    pub(crate) fn set(&mut self, committed: bool, row: RowId) {
        if committed {
            self.committed = Some(row);
        } else {
            self.uncommitted = Some(row);
        }
    }

    pub(crate) fn take(&mut self, committed: bool) -> Option<RowId> {
        if committed {
            self.committed.take()
        } else {
            self.uncommitted.take()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_none() && self.uncommitted.is_none()
    }

    /// Committed row first, then uncommitted.
    pub fn rows(&self) -> impl Iterator<Item = RowId> {
        self.committed.into_iter().chain(self.uncommitted)
    }
}

/// A pair with its rows resolved.
#[derive(Clone, Copy, Debug)]
pub struct ItemPair<'a> {
    pub committed: Option<&'a WorkspaceLocalItem>,
    pub uncommitted: Option<&'a WorkspaceLocalItem>,
}

impl<'a> ItemPair<'a> {
    /// The server path both rows share.
    pub fn server_item(&self) -> Option<&'a str> {
        self.committed
            .or(self.uncommitted)
            .map(WorkspaceLocalItem::server_item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_are_independent() {
        let mut pair = WorkspaceLocalItemPair::default();
        assert!(pair.is_empty());

        pair.set(true, RowId(1));
        pair.set(false, RowId(2));
        assert_eq!(pair.rows().collect::<Vec<_>>(), vec![RowId(1), RowId(2)]);

        assert_eq!(pair.take(true), Some(RowId(1)));
        assert_eq!(pair.get(true), None);
        assert_eq!(pair.get(false), Some(RowId(2)));
        assert!(!pair.is_empty());
    }

    #[test]
    fn resolved_pair_reports_shared_path() {
        let uncommitted = WorkspaceLocalItem::new_file("$/P/new.txt", None);
        let pair = ItemPair {
            committed: None,
            uncommitted: Some(&uncommitted),
        };
        assert_eq!(pair.server_item(), Some("$/P/new.txt"));
    }
}
