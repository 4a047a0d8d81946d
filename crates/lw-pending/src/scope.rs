//! Turning pending renames into committed-path queries.
//!
//! With renames pending, the rows that belong under a target server path
//! live at their committed paths. Renames into the target add a committed
//! subtree to scan; renames out of it carve a subtree away. The subtrees
//! are grouped into [`ServerItemQuery`] values whose exclusions are the
//! carved-out paths.

use lw_index::{ComposedQuery, ServerItemQuery};
use lw_types::path::{self, SERVER_SEPARATOR};
use lw_types::RecursionType;
use tracing::trace;

use crate::rename::{compare_renames, RenameKind};

/// A committed subtree that a rename brings into scope or takes out of it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApplicableRename {
    pub committed_server_item: String,
    pub kind: RenameKind,
    pub recursion: RecursionType,
}

impl ApplicableRename {
    /// A subtree scanned with `recursion`.
    pub fn additive(committed_server_item: impl Into<String>, recursion: RecursionType) -> Self {
        Self {
            committed_server_item: committed_server_item.into(),
            kind: RenameKind::Additive,
            recursion,
        }
    }

    /// A subtree excluded in full.
    pub fn subtractive(committed_server_item: impl Into<String>) -> Self {
        Self {
            committed_server_item: committed_server_item.into(),
            kind: RenameKind::Subtractive,
            recursion: RecursionType::Full,
        }
    }
}

/// Group `renames` into committed queries.
///
/// Renames are put in top-down order with subtractive ahead of additive at
/// the same path. A rename below a kept rename of the same kind adds
/// nothing and is dropped, as is a rename at the same path as the kept one,
/// so a subtractive rename wins over an additive one at its path. Each
/// additive rename opens a query; each subtractive rename becomes an
/// exclusion of the innermost open query containing it, or is dropped if
/// there is none.
pub fn committed_queries(mut renames: Vec<ApplicableRename>) -> Vec<ServerItemQuery> {
    renames.sort_by(|a, b| compare_renames(&a.committed_server_item, a.kind, &b.committed_server_item, b.kind));

    let mut kept: Vec<ApplicableRename> = Vec::with_capacity(renames.len());
    for rename in renames {
        if let Some(previous) = kept.last() {
            let below = path::is_child(&previous.committed_server_item, &rename.committed_server_item, SERVER_SEPARATOR);
            let same_path = path::equals(&previous.committed_server_item, &rename.committed_server_item, SERVER_SEPARATOR);
            if below && (previous.kind == rename.kind || same_path) {
                trace!(server_item = %rename.committed_server_item, kind = ?rename.kind, "redundant rename dropped");
                continue;
            }
        }
        kept.push(rename);
    }

    let mut queries = Vec::new();
    let mut open: Vec<ServerItemQuery> = Vec::new();
    let mut current: Option<ServerItemQuery> = None;

    for rename in kept {
        while let Some(query) = current.take() {
            if path::is_child(query.root(), &rename.committed_server_item, SERVER_SEPARATOR) {
                current = Some(query);
                break;
            }
            queries.push(query);
            current = open.pop();
        }

        match rename.kind {
            RenameKind::Additive => {
                if let Some(parent) = current.take() {
                    open.push(parent);
                }
                current = Some(ServerItemQuery::new(rename.committed_server_item, rename.recursion));
            }
            RenameKind::Subtractive => match current.as_mut() {
                Some(query) => query.exclude(rename.committed_server_item),
                None => {
                    trace!(server_item = %rename.committed_server_item, "unparented subtractive rename dropped");
                }
            },
        }
    }

    while let Some(query) = open.pop() {
        queries.push(query);
    }
    queries.extend(current);
    queries
}

/// Everything under `target_server_item` with renames applied: the
/// committed queries from `renames`, then uncommitted rows under the target
/// with the same `recursion` and `pattern`.
pub fn compose_query(
    renames: Vec<ApplicableRename>,
    target_server_item: &str,
    recursion: RecursionType,
    pattern: Option<&str>,
    include_deleted: bool,
) -> ComposedQuery {
    let query = ComposedQuery::new(committed_queries(renames), target_server_item)
        .with_recursion(recursion)
        .with_include_deleted(include_deleted);
    match pattern {
        Some(pattern) => query.with_pattern(pattern),
        None => query,
    }
}
