//! Lazy traversal of the version table by local or server path.
//!
//! Both indices are ordered top-down, so a subtree is one contiguous run
//! of keys starting at its root. An enumerator opens a range at the root,
//! filters by depth, file name pattern and the deleted flag, and stops at
//! the first key outside the subtree.

use std::collections::btree_map;
use std::fmt;

use globset::{GlobBuilder, GlobMatcher};
use lw_types::path::{self, LOCAL_SEPARATOR, SERVER_SEPARATOR};
use lw_types::{PathKey, RecursionType};
use serde::{Deserialize, Serialize};

use crate::error::{IndexError, IndexResult};
use crate::item::WorkspaceLocalItem;
use crate::pair::{RowId, WorkspaceLocalItemPair};
use crate::table::VersionTable;

/// Which rows of a server-path node a query wants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommittedState {
    Committed,
    Uncommitted,
    Both,
}

impl CommittedState {
    fn wants(self, committed: bool) -> bool {
        match self {
            Self::Committed => committed,
            Self::Uncommitted => !committed,
            Self::Both => true,
        }
    }
}

/// Compile a file name wildcard (`*`, `?`, `[...]`) into a
/// case-insensitive matcher.
pub(crate) fn compile_pattern(pattern: &str) -> IndexResult<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .case_insensitive(true)
        .literal_separator(true)
        .build()
        .map_err(|source| IndexError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
    Ok(glob.compile_matcher())
}

enum Admit {
    Yes,
    Skip,
    Stop,
}

struct Filter {
    root: PathKey,
    depth: usize,
    pattern: Option<GlobMatcher>,
    include_deleted: bool,
}

impl Filter {
    fn admit_path(&self, key: &PathKey) -> Admit {
        let Some(depth) = self.root.depth_of(key.as_str()) else {
            return Admit::Stop;
        };
        if depth > self.depth {
            return Admit::Skip;
        }
        if let Some(pattern) = &self.pattern {
            // A pattern selects children; the root itself never matches.
            if depth == 0 || !pattern.is_match(path::file_name(key.as_str(), key.separator())) {
                return Admit::Skip;
            }
        }
        Admit::Yes
    }

    fn admit_item(&self, item: &WorkspaceLocalItem) -> bool {
        self.include_deleted || !item.is_deleted()
    }
}

enum Mode<'a> {
    Local(btree_map::Range<'a, PathKey, RowId>),
    Server {
        range: btree_map::Range<'a, PathKey, WorkspaceLocalItemPair>,
        state: CommittedState,
    },
}

/// Forward-only sequence of rows under a root path.
///
/// Server-path mode can yield two rows for one node (committed, then
/// uncommitted); the second is held on deck until the next call.
pub struct WorkspaceLocalItemEnumerator<'a> {
    table: &'a VersionTable,
    filter: Filter,
    mode: Mode<'a>,
    on_deck: Option<&'a WorkspaceLocalItem>,
    done: bool,
}

impl<'a> Iterator for WorkspaceLocalItemEnumerator<'a> {
    type Item = &'a WorkspaceLocalItem;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(item) = self.on_deck.take() {
            return Some(item);
        }
        while !self.done {
            let (key, rows) = match &mut self.mode {
                Mode::Local(range) => match range.next() {
                    Some((key, id)) => (key, [Some(*id), None]),
                    None => break,
                },
                Mode::Server { range, state } => match range.next() {
                    Some((key, pair)) => {
                        let pick = |committed| pair.get(committed).filter(|_| state.wants(committed));
                        (key, [pick(true), pick(false)])
                    }
                    None => break,
                },
            };
            match self.filter.admit_path(key) {
                Admit::Stop => break,
                Admit::Skip => continue,
                Admit::Yes => {}
            }

            let table = self.table;
            let mut found = rows
                .into_iter()
                .flatten()
                .filter_map(|id| table.row(id))
                .filter(|item| self.filter.admit_item(item));
            if let Some(first) = found.next() {
                self.on_deck = found.next();
                return Some(first);
            }
        }
        self.done = true;
        None
    }
}

impl fmt::Debug for WorkspaceLocalItemEnumerator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkspaceLocalItemEnumerator")
            .field("root", &self.filter.root.as_str())
            .field("depth", &self.filter.depth)
            .field("pattern", &self.filter.pattern.as_ref().map(|p| p.glob().glob()))
            .field("include_deleted", &self.filter.include_deleted)
            .field("done", &self.done)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Query entry points
// ---------------------------------------------------------------------------

impl VersionTable {
    /// Rows under `local_item`, bounded by `recursion`.
    ///
    /// With a `pattern`, only descendants whose file name matches are
    /// returned; without one the root row is included too.
    pub fn query_by_local_item(
        &self,
        local_item: &str,
        recursion: RecursionType,
        pattern: Option<&str>,
        include_deleted: bool,
    ) -> IndexResult<WorkspaceLocalItemEnumerator<'_>> {
        if local_item.is_empty() {
            return Err(IndexError::InvalidPath("empty local path".into()));
        }
        let root = PathKey::new(local_item, LOCAL_SEPARATOR);
        let filter = self.query_filter(root.clone(), recursion, pattern, include_deleted)?;
        Ok(WorkspaceLocalItemEnumerator {
            table: self,
            filter,
            mode: Mode::Local(self.local.range(root..)),
            on_deck: None,
            done: false,
        })
    }

    /// Rows under `server_item`, bounded by `recursion`, restricted to the
    /// requested committed state.
    pub fn query_by_server_item(
        &self,
        server_item: &str,
        recursion: RecursionType,
        pattern: Option<&str>,
        state: CommittedState,
        include_deleted: bool,
    ) -> IndexResult<WorkspaceLocalItemEnumerator<'_>> {
        path::check_server_path(server_item).map_err(|e| IndexError::InvalidPath(e.to_string()))?;
        let root = PathKey::new(server_item, SERVER_SEPARATOR);
        let filter = self.query_filter(root.clone(), recursion, pattern, include_deleted)?;
        Ok(WorkspaceLocalItemEnumerator {
            table: self,
            filter,
            mode: Mode::Server {
                range: self.server.range(root..),
                state,
            },
            on_deck: None,
            done: false,
        })
    }

    fn query_filter(
        &self,
        root: PathKey,
        recursion: RecursionType,
        pattern: Option<&str>,
        include_deleted: bool,
    ) -> IndexResult<Filter> {
        Ok(Filter {
            root,
            depth: recursion.depth(),
            pattern: pattern.map(compile_pattern).transpose()?,
            include_deleted,
        })
    }
}
