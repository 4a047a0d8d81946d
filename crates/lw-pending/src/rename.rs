//! Ordering and validation of renames.
//!
//! A rename vacates its source path and claims its target path. Applying a
//! batch of renames in path order, with every vacate at a path ahead of
//! every claim at the same path, lets one rename reuse a name another
//! rename is giving up.

use std::cmp::Ordering;

use lw_types::path::{self, SERVER_SEPARATOR};
use serde::{Deserialize, Serialize};

use crate::error::{PendingError, PendingResult};

/// Which side of a rename a step stands for.
///
/// The derived order puts `Subtractive` first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RenameKind {
    /// Vacates the old name.
    Subtractive,
    /// Claims the new name.
    Additive,
}

/// One rename of a server item.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rename {
    pub source_server_item: String,
    pub target_server_item: String,
    /// The renamed item is itself deleted, so its target does not occupy
    /// the namespace.
    pub deleted: bool,
}

impl Rename {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_server_item: source.into(),
            target_server_item: target.into(),
            deleted: false,
        }
    }

    pub fn with_deleted(mut self, deleted: bool) -> Self {
        self.deleted = deleted;
        self
    }

    /// The vacate and claim steps of this rename.
    pub fn steps(&self, index: usize) -> [RenameStep; 2] {
        [
            RenameStep {
                server_item: self.source_server_item.clone(),
                kind: RenameKind::Subtractive,
                index,
            },
            RenameStep {
                server_item: self.target_server_item.clone(),
                kind: RenameKind::Additive,
                index,
            },
        ]
    }
}

/// A single vacate or claim, tagged with the rename it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenameStep {
    pub server_item: String,
    pub kind: RenameKind,
    /// Position of the originating rename in the caller's list.
    pub index: usize,
}

/// Top-down path order first; at equal paths `Subtractive` before
/// `Additive`.
pub fn compare_renames(a_path: &str, a_kind: RenameKind, b_path: &str, b_kind: RenameKind) -> Ordering {
    path::compare_top_down(a_path, b_path, SERVER_SEPARATOR).then(a_kind.cmp(&b_kind))
}

/// Expand `renames` into steps and sort them into application order.
///
/// The sort is stable, so steps that compare equal keep the order of
/// their renames.
pub fn rename_steps(renames: &[Rename]) -> Vec<RenameStep> {
    let mut steps: Vec<RenameStep> = renames
        .iter()
        .enumerate()
        .flat_map(|(index, rename)| rename.steps(index))
        .collect();
    steps.sort_by(|a, b| compare_renames(&a.server_item, a.kind, &b.server_item, b.kind));
    steps
}

/// Fail if two renames claim the same target, unless one of the two
/// renamed items is deleted.
pub fn check_target_collisions(renames: &[Rename]) -> PendingResult<()> {
    let mut sorted: Vec<&Rename> = renames.iter().collect();
    sorted.sort_by(|a, b| path::compare_top_down(&a.target_server_item, &b.target_server_item, SERVER_SEPARATOR));

    for window in sorted.windows(2) {
        let (first, second) = (window[0], window[1]);
        if path::equals(&first.target_server_item, &second.target_server_item, SERVER_SEPARATOR)
            && !first.deleted
            && !second.deleted
        {
            return Err(PendingError::TargetCollision {
                target: second.target_server_item.clone(),
                first: first.source_server_item.clone(),
                second: second.source_server_item.clone(),
            });
        }
    }
    Ok(())
}
