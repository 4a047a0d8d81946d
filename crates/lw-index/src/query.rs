//! Merging several server-path queries into one sequence.
//!
//! Each query walks committed rows under its root, minus excluded subtrees.
//! A trailing catch-all walks uncommitted rows under one target path with
//! the caller's recursion and file name pattern.
//! Exclusions and results share the top-down order, so exclusions are
//! applied with a single cursor per query rather than a lookup per row.

use std::cmp::Ordering;

use lw_types::path::{self, SERVER_SEPARATOR};
use lw_types::RecursionType;

use crate::enumerate::{CommittedState, WorkspaceLocalItemEnumerator};
use crate::error::IndexResult;
use crate::item::WorkspaceLocalItem;
use crate::table::VersionTable;

/// One server-path query with the subtrees it must skip.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerItemQuery {
    root: String,
    recursion: RecursionType,
    /// Sorted top-down.
    excluded: Vec<String>,
}

impl ServerItemQuery {
    pub fn new(root: impl Into<String>, recursion: RecursionType) -> Self {
        Self {
            root: root.into(),
            recursion,
            excluded: Vec::new(),
        }
    }

    /// Skip every row at or below each of `paths`.
    pub fn with_excluded<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded.extend(paths.into_iter().map(Into::into));
        self.excluded
            .sort_by(|a, b| path::compare_top_down(a, b, SERVER_SEPARATOR));
        self
    }

    /// Skip every row at or below `path`, keeping the exclusions sorted.
    pub fn exclude(&mut self, path: impl Into<String>) {
        let path = path.into();
        let at = self
            .excluded
            .partition_point(|e| path::compare_top_down(e, &path, SERVER_SEPARATOR) != Ordering::Greater);
        self.excluded.insert(at, path);
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn recursion(&self) -> RecursionType {
        self.recursion
    }

    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }
}

/// An ordered list of committed queries plus a catch-all uncommitted query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComposedQuery {
    queries: Vec<ServerItemQuery>,
    catch_all_target: String,
    recursion: RecursionType,
    pattern: Option<String>,
    include_deleted: bool,
}

impl ComposedQuery {
    /// Compose `queries` with a fully recursive catch-all under
    /// `catch_all_target`.
    pub fn new(queries: Vec<ServerItemQuery>, catch_all_target: impl Into<String>) -> Self {
        Self {
            queries,
            catch_all_target: catch_all_target.into(),
            recursion: RecursionType::Full,
            pattern: None,
            include_deleted: false,
        }
    }

    /// Recursion of the catch-all stage.
    pub fn with_recursion(mut self, recursion: RecursionType) -> Self {
        self.recursion = recursion;
        self
    }

    /// File name pattern applied to every stage.
    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn queries(&self) -> &[ServerItemQuery] {
        &self.queries
    }

    pub fn catch_all_target(&self) -> &str {
        &self.catch_all_target
    }

    pub fn recursion(&self) -> RecursionType {
        self.recursion
    }

    pub fn pattern(&self) -> Option<&str> {
        self.pattern.as_deref()
    }

    pub fn with_include_deleted(mut self, include_deleted: bool) -> Self {
        self.include_deleted = include_deleted;
        self
    }

    /// Open every stage against `table`. Rows are produced lazily.
    pub fn enumerate<'a>(&'a self, table: &'a VersionTable) -> IndexResult<ComposedEnumerator<'a>> {
        let mut stages = Vec::with_capacity(self.queries.len() + 1);
        for query in &self.queries {
            let items = table.query_by_server_item(
                &query.root,
                query.recursion,
                self.pattern.as_deref(),
                CommittedState::Committed,
                self.include_deleted,
            )?;
            stages.push(Stage {
                items,
                excluded: &query.excluded,
                cursor: 0,
            });
        }
        let catch_all = table.query_by_server_item(
            &self.catch_all_target,
            self.recursion,
            self.pattern.as_deref(),
            CommittedState::Uncommitted,
            self.include_deleted,
        )?;
        stages.push(Stage {
            items: catch_all,
            excluded: &[],
            cursor: 0,
        });
        stages.reverse();
        Ok(ComposedEnumerator { stages })
    }
}

#[derive(Debug)]
struct Stage<'a> {
    items: WorkspaceLocalItemEnumerator<'a>,
    excluded: &'a [String],
    cursor: usize,
}

impl<'a> Stage<'a> {
    /// Advance the exclusion cursor to `server_item` and report whether the
    /// current exclusion covers it.
    fn is_excluded(&mut self, server_item: &str) -> bool {
        while let Some(excluded) = self.excluded.get(self.cursor) {
            let before = path::compare_top_down(excluded, server_item, SERVER_SEPARATOR) == Ordering::Less;
            if before && !path::is_child(excluded, server_item, SERVER_SEPARATOR) {
                self.cursor += 1;
            } else {
                break;
            }
        }
        self.excluded
            .get(self.cursor)
            .is_some_and(|excluded| path::is_child(excluded, server_item, SERVER_SEPARATOR))
    }

    fn next_item(&mut self) -> Option<&'a WorkspaceLocalItem> {
        loop {
            let item = self.items.next()?;
            if !self.is_excluded(item.server_item()) {
                return Some(item);
            }
        }
    }
}

/// Sequence produced by [`ComposedQuery::enumerate`].
#[derive(Debug)]
pub struct ComposedEnumerator<'a> {
    /// Remaining stages, last to run first.
    stages: Vec<Stage<'a>>,
}

impl<'a> Iterator for ComposedEnumerator<'a> {
    type Item = &'a WorkspaceLocalItem;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(stage) = self.stages.last_mut() {
            if let Some(item) = stage.next_item() {
                return Some(item);
            }
            self.stages.pop();
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn committed(server: &str) -> WorkspaceLocalItem {
        WorkspaceLocalItem::new_file(server, Some(format!("/w{}", &server[1..]))).with_version(1)
    }

    fn uncommitted(server: &str) -> WorkspaceLocalItem {
        WorkspaceLocalItem::new_file(server, Some(format!("/n{}", &server[1..])))
    }

    fn sample() -> VersionTable {
        let mut table = VersionTable::new();
        for p in ["$/A", "$/A/a", "$/A/b", "$/A/b/c", "$/A/b/d", "$/A/bb", "$/A/c", "$/B/x"] {
            table.add(committed(p));
        }
        for p in ["$/A/b", "$/A/new", "$/B/y"] {
            table.add(uncommitted(p));
        }
        table
    }

    fn paths<'a>(items: impl Iterator<Item = &'a WorkspaceLocalItem>) -> Vec<(&'a str, bool)> {
        items.map(|i| (i.server_item(), i.is_committed())).collect()
    }

    #[test]
    fn excluded_subtree_is_skipped_then_uncommitted_follow() {
        let table = sample();
        let query = ComposedQuery::new(
            vec![ServerItemQuery::new("$/A", RecursionType::Full).with_excluded(["$/A/b"])],
            "$/A",
        );
        let items = paths(query.enumerate(&table).unwrap());
        assert_eq!(
            items,
            vec![
                ("$/A", true),
                ("$/A/a", true),
                ("$/A/bb", true),
                ("$/A/c", true),
                ("$/A/b", false),
                ("$/A/new", false),
            ]
        );
    }

    #[test]
    fn multiple_exclusions_sorted_on_entry() {
        let table = sample();
        let query = ComposedQuery::new(
            vec![ServerItemQuery::new("$/A", RecursionType::Full).with_excluded(["$/A/c", "$/A/a", "$/A/b/d"])],
            "$/Z",
        );
        assert_eq!(
            query.enumerate(&table).unwrap().map(|i| i.server_item()).collect::<Vec<_>>(),
            vec!["$/A", "$/A/b", "$/A/b/c", "$/A/bb"]
        );
    }

    #[test]
    fn queries_run_in_order() {
        let table = sample();
        let query = ComposedQuery::new(
            vec![
                ServerItemQuery::new("$/B", RecursionType::OneLevel),
                ServerItemQuery::new("$/A/b", RecursionType::None),
            ],
            "$/B",
        );
        assert_eq!(
            paths(query.enumerate(&table).unwrap()),
            vec![("$/B/x", true), ("$/A/b", true), ("$/B/y", false)]
        );
    }

    #[test]
    fn deleted_rows_follow_the_flag() {
        let mut table = sample();
        table.mark_as_deleted("$/A/c", true, false);
        let queries = vec![ServerItemQuery::new("$/A", RecursionType::OneLevel)];

        let without = ComposedQuery::new(queries.clone(), "$/Z");
        assert!(without.enumerate(&table).unwrap().all(|i| i.server_item() != "$/A/c"));

        let with = ComposedQuery::new(queries, "$/Z").with_include_deleted(true);
        assert!(with.enumerate(&table).unwrap().any(|i| i.server_item() == "$/A/c"));
    }

    #[test]
    fn catch_all_follows_recursion() {
        let mut table = VersionTable::new();
        table.add(committed("$/A/a"));
        table.add(uncommitted("$/A/n"));
        table.add(uncommitted("$/A/n/deep"));

        let query = ComposedQuery::new(vec![ServerItemQuery::new("$/A", RecursionType::OneLevel)], "$/A")
            .with_recursion(RecursionType::OneLevel);
        assert_eq!(
            paths(query.enumerate(&table).unwrap()),
            vec![("$/A/a", true), ("$/A/n", false)]
        );

        let query = ComposedQuery::new(Vec::new(), "$/A/n").with_recursion(RecursionType::None);
        assert_eq!(paths(query.enumerate(&table).unwrap()), vec![("$/A/n", false)]);
    }

    #[test]
    fn pattern_filters_every_stage() {
        let table = sample();
        let query = ComposedQuery::new(vec![ServerItemQuery::new("$/A", RecursionType::Full)], "$/A")
            .with_pattern("b*");
        assert_eq!(
            paths(query.enumerate(&table).unwrap()),
            vec![("$/A/b", true), ("$/A/bb", true), ("$/A/b", false)]
        );
        assert_eq!(query.pattern(), Some("b*"));
    }

    #[test]
    fn exclude_keeps_order() {
        let mut query = ServerItemQuery::new("$/A", RecursionType::Full);
        query.exclude("$/A/c");
        query.exclude("$/A/a");
        query.exclude("$/A/b/d");
        assert_eq!(query.excluded(), ["$/A/a", "$/A/b/d", "$/A/c"]);
    }

    #[test]
    fn invalid_root_fails_up_front() {
        let table = sample();
        let query = ComposedQuery::new(vec![ServerItemQuery::new("A", RecursionType::Full)], "$/A");
        assert!(query.enumerate(&table).is_err());
    }
}
