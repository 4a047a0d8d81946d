//! Undo derivation for pending changes.

use std::cmp::Ordering;

use lw_index::ReconcileKey;
use lw_types::path::{self, SERVER_SEPARATOR};
use lw_types::{ChangeType, ItemType};
use serde::{Deserialize, Serialize};

use crate::error::PendingResult;

/// The parts of a pending change that undo needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingChangeRecord {
    /// Where the item lives in pending space.
    pub target_server_item: String,
    /// Where the item lives on the server; `None` for uncommitted items.
    pub committed_server_item: Option<String>,
    pub change_type: ChangeType,
    pub item_type: ItemType,
    pub deletion_id: i32,
}

impl PendingChangeRecord {
    pub fn new(target_server_item: impl Into<String>, change_type: ChangeType, item_type: ItemType) -> PendingResult<Self> {
        let target_server_item = target_server_item.into();
        path::check_server_path(&target_server_item)?;
        Ok(Self {
            target_server_item,
            committed_server_item: None,
            change_type,
            item_type,
            deletion_id: 0,
        })
    }

    pub fn with_committed_server_item(mut self, committed: impl Into<String>) -> PendingResult<Self> {
        let committed = committed.into();
        path::check_server_path(&committed)?;
        self.committed_server_item = Some(committed);
        Ok(self)
    }

    pub fn with_deletion_id(mut self, deletion_id: i32) -> Self {
        self.deletion_id = deletion_id;
        self
    }

    pub fn is_committed(&self) -> bool {
        self.committed_server_item.is_some()
    }

    /// Committed path if there is one, otherwise the target.
    pub fn server_item(&self) -> &str {
        self.committed_server_item.as_deref().unwrap_or(&self.target_server_item)
    }

    pub fn is_lock(&self) -> bool {
        self.change_type.contains(ChangeType::LOCK)
    }

    pub fn is_rename(&self) -> bool {
        self.change_type.contains(ChangeType::RENAME)
    }

    /// A rename or delete of a folder affects everything below it.
    pub fn is_recursive_change(&self) -> bool {
        self.item_type == ItemType::Folder
            && self.change_type.contains_any(ChangeType::RENAME | ChangeType::DELETE)
    }

    /// The version table row this change refers to.
    pub fn reconcile_key(&self) -> ReconcileKey<'_> {
        ReconcileKey {
            server_item: self.server_item(),
            committed: self.is_committed(),
        }
    }
}

/// A pending change together with the bits being undone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UndoneChange {
    pending: PendingChangeRecord,
    undone: ChangeType,
    revert_to_server_item: Option<String>,
}

impl UndoneChange {
    /// Undo the bits of `selective_undo` that `pending` actually carries.
    pub fn new(pending: PendingChangeRecord, selective_undo: ChangeType) -> Self {
        let undone = pending.change_type.retain(selective_undo);
        Self {
            pending,
            undone,
            revert_to_server_item: None,
        }
    }

    pub fn pending_change(&self) -> &PendingChangeRecord {
        &self.pending
    }

    pub fn undone_change_type(&self) -> ChangeType {
        self.undone
    }

    /// What stays pended after the undo.
    pub fn remaining_change_type(&self) -> ChangeType {
        self.pending.change_type.remove(self.undone)
    }

    /// Nothing stays pended.
    pub fn is_undoing_entire_change(&self) -> bool {
        self.remaining_change_type().is_empty()
    }

    pub fn is_undoing_add(&self) -> bool {
        self.undone.contains(ChangeType::ADD)
    }

    pub fn is_undoing_rename(&self) -> bool {
        self.undone.contains(ChangeType::RENAME)
    }

    pub fn is_undoing_branch(&self) -> bool {
        self.undone.contains(ChangeType::BRANCH)
    }

    pub fn is_undoing_lock(&self) -> bool {
        self.undone.contains(ChangeType::LOCK)
    }

    pub fn is_undoing_edit(&self) -> bool {
        self.undone.contains(ChangeType::EDIT)
    }

    pub fn is_undoing_delete(&self) -> bool {
        self.undone.contains(ChangeType::DELETE)
    }

    pub fn is_undoing_undelete(&self) -> bool {
        self.undone.contains(ChangeType::UNDELETE)
    }

    pub fn is_undoing_property(&self) -> bool {
        self.undone.contains(ChangeType::PROPERTY)
    }

    /// Undoing a folder rename or delete touches the whole subtree.
    pub fn is_undoing_recursive_change(&self) -> bool {
        self.pending.item_type == ItemType::Folder
            && self.undone.contains_any(ChangeType::RENAME | ChangeType::DELETE)
    }

    /// Whether this undo cannot be completed locally.
    ///
    /// Locks live on the server. A rename whose target has a working folder
    /// mapped at or below it would move that mapping.
    pub fn requires_online(&self, working_folder_server_items: &[String]) -> bool {
        if self.is_undoing_lock() || (self.is_undoing_rename() && self.pending.is_lock()) {
            return true;
        }
        self.is_undoing_rename()
            && working_folder_server_items
                .iter()
                .any(|folder| path::is_child(&self.pending.target_server_item, folder, SERVER_SEPARATOR))
    }

    /// Server path the item returns to once the undo is applied.
    pub fn revert_to_server_item(&self) -> Option<&str> {
        self.revert_to_server_item.as_deref()
    }

    pub fn set_revert_to_server_item(&mut self, server_item: impl Into<String>) {
        self.revert_to_server_item = Some(server_item.into());
    }
}

/// Deepest targets first, so children are undone before their parents.
pub fn sort_for_undo(changes: &mut [UndoneChange]) {
    changes.sort_by(compare_for_undo);
}

fn compare_for_undo(x: &UndoneChange, y: &UndoneChange) -> Ordering {
    path::compare_top_down(
        &y.pending.target_server_item,
        &x.pending.target_server_item,
        SERVER_SEPARATOR,
    )
}
