//! The workspace version table.
//!
//! Rows live in an arena keyed by [`RowId`]. Two ordered indices point into
//! it: local path to row, and server path to a committed/uncommitted
//! [`WorkspaceLocalItemPair`]. Every mutation funnels through
//! [`VersionTable::write_row`], which keeps both indices and the
//! pending-reconcile counter in step.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::io::{Read, Write};

use lw_codec::{BinaryReader, BinaryWriter};
use lw_tables::{TableError, TableFormat, TableResult, WritableTable};
use lw_types::path::{self, LOCAL_SEPARATOR};
use lw_types::{Guid, PathKey};
use tracing::{debug, error, warn};

use crate::item::{LocalVersionUpdate, RowSchema, WorkspaceLocalItem};
use crate::pair::{ItemPair, RowId, WorkspaceLocalItemPair};

/// Magic number at the start of the version table.
pub const VERSION_TABLE_MAGIC: u16 = 0xA7CC;

/// Schema version written by [`VersionTable::save`].
pub const VERSION_TABLE_SCHEMA: i32 = 2;

/// Identifies the row a pending change refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReconcileKey<'a> {
    /// Committed server path for a committed change, target path otherwise.
    pub server_item: &'a str,
    pub committed: bool,
}

/// Result of [`VersionTable::get_updates_for_reconcile`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileUpdates {
    /// Distinct updates, in table order.
    pub updates: Vec<LocalVersionUpdate>,
    /// Every row was pending reconcile, so the server should discard its
    /// copy of the table before applying `updates`.
    pub clear_local_version_table: bool,
}

/// Dual-indexed table of [`WorkspaceLocalItem`] rows.
#[derive(Clone, Default)]
pub struct VersionTable {
    rows: HashMap<RowId, WorkspaceLocalItem>,
    next_row: u64,
    pub(crate) local: BTreeMap<PathKey, RowId>,
    pub(crate) server: BTreeMap<PathKey, WorkspaceLocalItemPair>,
    /// Rows removed locally that the server has not yet been told about.
    removed_items: Vec<WorkspaceLocalItem>,
    pending_reconcile_count: usize,
}

impl VersionTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    // ---------------------------------------------------------------
    // The single mutation point
    // ---------------------------------------------------------------

    /// Replace the row at `(server_item, committed)` with `new`, or remove
    /// it when `new` is `None`. Returns the replaced row.
    fn write_row(
        &mut self,
        server_item: &str,
        committed: bool,
        new: Option<WorkspaceLocalItem>,
    ) -> Option<WorkspaceLocalItem> {
        let key = PathKey::server(server_item);
        let pair = self.server.entry(key.clone()).or_default();

        let old_id = pair.take(committed);
        let old = old_id.and_then(|id| self.rows.remove(&id));
        if let (Some(id), Some(old)) = (old_id, old.as_ref()) {
            if let Some(local_item) = old.local_item() {
                let local_key = PathKey::local(local_item);
                if self.local.get(&local_key) == Some(&id) {
                    self.local.remove(&local_key);
                }
            }
            if old.is_pending_reconcile() {
                self.pending_reconcile_count -= 1;
            }
        }

        if let Some(item) = new {
            let id = RowId(self.next_row);
            self.next_row += 1;
            if item.is_pending_reconcile() {
                self.pending_reconcile_count += 1;
            }
            if let Some(local_item) = item.local_item() {
                self.local.insert(PathKey::local(local_item), id);
            }
            pair.set(committed, id);
            self.rows.insert(id, item);
        }

        if pair.is_empty() {
            self.server.remove(&key);
        }
        old
    }

    /// Apply `f` to the row at `(server_item, committed)` and re-index it.
    ///
    /// Returns `false` if there is no such row. `f` may change any field,
    /// including the paths and the committed state. A row already stored
    /// under the modified row's new (server path, committed) key is
    /// replaced and dropped, with a warning logged.
    pub fn modify<F>(&mut self, server_item: &str, committed: bool, f: F) -> bool
    where
        F: FnOnce(&mut WorkspaceLocalItem),
    {
        let Some(mut item) = self.write_row(server_item, committed, None) else {
            return false;
        };
        f(&mut item);
        let server_item = item.server_item().to_string();
        let committed = item.is_committed();
        if let Some(displaced) = self.write_row(&server_item, committed, Some(item)) {
            warn!(
                server_item = %server_item,
                committed,
                displaced_local_item = ?displaced.local_item(),
                "modified row replaced an existing row"
            );
        }
        true
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Insert `item`, replacing any row with the same server path and
    /// committed state.
    pub fn add(&mut self, item: WorkspaceLocalItem) -> Option<WorkspaceLocalItem> {
        let server_item = item.server_item().to_string();
        let committed = item.is_committed();
        self.write_row(&server_item, committed, Some(item))
    }

    /// Remove the row tracked at `local_item`.
    pub fn remove_by_local_item(
        &mut self,
        local_item: &str,
        queue_for_reconcile: bool,
    ) -> Option<WorkspaceLocalItem> {
        if local_item.is_empty() {
            return None;
        }
        let id = *self.local.get(&PathKey::local(local_item))?;
        let (server_item, committed) = {
            let row = self.rows.get(&id)?;
            (row.server_item().to_string(), row.is_committed())
        };
        self.remove_by_server_item(&server_item, committed, queue_for_reconcile)
    }

    /// Remove the row at `(server_item, committed)`.
    pub fn remove_by_server_item(
        &mut self,
        server_item: &str,
        committed: bool,
        queue_for_reconcile: bool,
    ) -> Option<WorkspaceLocalItem> {
        let removed = self.write_row(server_item, committed, None)?;
        if queue_for_reconcile {
            self.queue_for_reconcile(&removed);
        }
        Some(removed)
    }

    /// Record that the server must be told `item` is gone from disk.
    pub fn queue_for_reconcile(&mut self, item: &WorkspaceLocalItem) {
        let mut removed = item.clone();
        removed.set_pending_reconcile(true);
        removed.set_deleted(false);
        removed.set_local_item(None);
        self.pending_reconcile_count += 1;
        self.removed_items.push(removed);
    }

    /// Put the row into the deleted state: no local path, not missing.
    pub fn mark_as_deleted(&mut self, server_item: &str, committed: bool, pending_reconcile: bool) -> bool {
        self.modify(server_item, committed, |item| {
            item.set_deleted(true);
            item.set_missing_on_disk(false);
            if pending_reconcile {
                item.set_pending_reconcile(true);
            }
            item.set_local_item(None);
        })
    }

    /// Move the row to a new local path (or none).
    pub fn set_local_item(&mut self, server_item: &str, committed: bool, local_item: Option<String>) -> bool {
        self.modify(server_item, committed, |item| item.set_local_item(local_item))
    }

    /// Clear every pending-reconcile bit after a successful reconcile.
    ///
    /// With `remove_missing_rows`, rows missing from disk are dropped.
    /// Returns the baseline GUIDs of dropped rows so their baseline files
    /// can be deleted.
    pub fn mark_as_reconciled(&mut self, remove_missing_rows: bool) -> Vec<Guid> {
        let mut missing = Vec::new();
        for item in self.rows.values_mut() {
            item.set_pending_reconcile(false);
            if remove_missing_rows && item.is_missing_on_disk() {
                missing.push((item.server_item().to_string(), item.is_committed()));
            }
        }
        self.pending_reconcile_count = 0;
        self.removed_items.clear();

        let mut baselines = Vec::new();
        for (server_item, committed) in missing {
            if let Some(row) = self.write_row(&server_item, committed, None) {
                baselines.extend(row.baseline_file_guid());
            }
        }
        debug!(dropped = baselines.len(), "version table reconciled");
        baselines
    }

    /// Collect what the server must be told to bring its copy in line.
    ///
    /// Rows named by `pending_changes` are always reported (and marked
    /// pending reconcile if they were not already).
    pub fn get_updates_for_reconcile(
        &mut self,
        pending_changes: &[ReconcileKey<'_>],
        reconcile_missing_on_disk: bool,
    ) -> ReconcileUpdates {
        let mut seen = HashSet::new();
        let mut updates = Vec::new();
        let mut push = |update: Option<LocalVersionUpdate>| {
            if let Some(update) = update {
                if seen.insert(update.clone()) {
                    updates.push(update);
                }
            }
        };

        let mut clear = true;
        for pair in self.server.values() {
            for id in pair.rows() {
                let Some(item) = self.rows.get(&id) else { continue };
                if !item.is_pending_reconcile() {
                    clear = false;
                }
                push(item.local_version_update(reconcile_missing_on_disk, false));
            }
        }

        for removed in &self.removed_items {
            // Skip rows that were added back after being removed.
            if self.row_id(removed.server_item(), removed.is_committed()).is_none() {
                push(removed.local_version_update(false, false));
            }
        }

        for key in pending_changes {
            let Some(id) = self.row_id(key.server_item, key.committed) else { continue };
            let Some(item) = self.rows.get_mut(&id) else { continue };
            if !item.is_pending_reconcile() {
                item.set_pending_reconcile(true);
                self.pending_reconcile_count += 1;
            }
            push(item.local_version_update(reconcile_missing_on_disk, false));
        }

        ReconcileUpdates {
            updates,
            clear_local_version_table: clear,
        }
    }

    /// Rewrite every server path through `mapper` (team project rename).
    ///
    /// Every row and removed item becomes pending reconcile.
    pub fn rename_server_items<F>(&mut self, mapper: F)
    where
        F: Fn(&str) -> String,
    {
        let rows: Vec<WorkspaceLocalItem> = self
            .server
            .values()
            .flat_map(|pair| pair.rows())
            .filter_map(|id| self.rows.get(&id).cloned())
            .collect();
        let removed = std::mem::take(&mut self.removed_items);

        self.rows.clear();
        self.local.clear();
        self.server.clear();
        self.pending_reconcile_count = 0;

        for mut item in rows {
            item.set_server_item(mapper(item.server_item()));
            item.set_pending_reconcile(true);
            self.add(item);
        }
        for mut item in removed {
            item.set_server_item(mapper(item.server_item()));
            item.set_pending_reconcile(true);
            self.pending_reconcile_count += 1;
            self.removed_items.push(item);
        }
    }

    // ---------------------------------------------------------------
    // Lookups
    // ---------------------------------------------------------------

    fn row_id(&self, server_item: &str, committed: bool) -> Option<RowId> {
        self.server.get(&PathKey::server(server_item))?.get(committed)
    }

    pub(crate) fn row(&self, id: RowId) -> Option<&WorkspaceLocalItem> {
        self.rows.get(&id)
    }

    pub fn get_by_local_item(&self, local_item: &str) -> Option<&WorkspaceLocalItem> {
        let id = self.local.get(&PathKey::local(local_item))?;
        self.rows.get(id)
    }

    pub fn get_by_server_item(&self, server_item: &str, committed: bool) -> Option<&WorkspaceLocalItem> {
        self.rows.get(&self.row_id(server_item, committed)?)
    }

    /// Both rows recorded at `server_item`.
    pub fn get_pair(&self, server_item: &str) -> Option<ItemPair<'_>> {
        let pair = self.server.get(&PathKey::server(server_item))?;
        Some(ItemPair {
            committed: pair.committed().and_then(|id| self.rows.get(&id)),
            uncommitted: pair.uncommitted().and_then(|id| self.rows.get(&id)),
        })
    }

    /// Rows whose local path has no tracked ancestor, in local path order.
    pub fn local_item_roots(&self) -> impl Iterator<Item = &WorkspaceLocalItem> + '_ {
        let mut last_root: Option<&PathKey> = None;
        self.local
            .iter()
            .filter(move |&(key, _)| {
                if last_root.is_some_and(|root| path::is_child(root.as_str(), key.as_str(), LOCAL_SEPARATOR)) {
                    return false;
                }
                last_root = Some(key);
                true
            })
            .filter_map(|(_, id)| self.rows.get(id))
    }

    /// Server path of every node plus every removed item. May repeat.
    pub fn known_server_items(&self) -> Vec<&str> {
        self.server
            .keys()
            .map(PathKey::as_str)
            .chain(self.removed_items.iter().map(WorkspaceLocalItem::server_item))
            .collect()
    }

    /// Rows removed locally and queued for the server.
    pub fn removed_items(&self) -> &[WorkspaceLocalItem] {
        &self.removed_items
    }

    /// Number of rows with a local path.
    pub fn local_items_count(&self) -> usize {
        self.local.len()
    }

    /// Number of rows in the indices (removed items excluded).
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.removed_items.is_empty()
    }

    /// Whether anything awaits reconcile.
    pub fn pending_reconcile(&self) -> bool {
        self.pending_reconcile_count > 0
    }

    pub fn pending_reconcile_count(&self) -> usize {
        self.pending_reconcile_count
    }

    /// Rows in server path order, committed before uncommitted.
    pub fn iter(&self) -> impl Iterator<Item = &WorkspaceLocalItem> + '_ {
        self.server
            .values()
            .flat_map(|pair| pair.rows())
            .filter_map(|id| self.rows.get(&id))
    }

    fn load_rows<R: Read>(&mut self, reader: &mut BinaryReader<R>, schema: RowSchema) -> TableResult<()> {
        let corrupt = TableError::corrupt(Self::NAME);

        // Recomputed from the rows below.
        let _pending_reconcile = reader.read_bool().map_err(&corrupt)?;
        let count = reader.read_i32().map_err(&corrupt)?;
        if count < 0 {
            return Err(TableError::invalid(Self::NAME, format!("negative row count {count}")));
        }

        for _ in 0..count {
            let item = WorkspaceLocalItem::read(reader, schema).map_err(&corrupt)?;
            // Removal instructions for the server: no local path, pending
            // reconcile, and not a deleted row (those stay in the tree).
            if item.local_item().is_none() && item.is_pending_reconcile() && !item.is_deleted() {
                self.pending_reconcile_count += 1;
                self.removed_items.push(item);
            } else {
                self.add(item);
            }
        }
        debug!(rows = self.rows.len(), removed = self.removed_items.len(), "version table rows loaded");
        Ok(())
    }
}

impl TableFormat for VersionTable {
    const NAME: &'static str = "workspace version table";

    fn initialize() -> Self {
        Self::new()
    }

    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> TableResult<()> {
        let corrupt = TableError::corrupt(Self::NAME);

        let magic = reader.read_u16().map_err(&corrupt)?;
        if magic != VERSION_TABLE_MAGIC {
            return Err(TableError::invalid(Self::NAME, format!("bad magic {magic:#06x}")));
        }
        let schema = match reader.read_i32().map_err(&corrupt)? {
            1 => RowSchema::V1,
            2 => RowSchema::V2,
            other => {
                return Err(TableError::invalid(
                    Self::NAME,
                    format!("unsupported schema version {other}"),
                ))
            }
        };
        self.load_rows(reader, schema)
    }

    fn cached_load(&mut self, source: &dyn Any) -> bool {
        match source.downcast_ref::<VersionTable>() {
            Some(other) => {
                self.clone_from(other);
                true
            }
            None => false,
        }
    }
}

impl WritableTable for VersionTable {
    fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> TableResult<bool> {
        let corrupt = TableError::corrupt(Self::NAME);

        let rows: Vec<&WorkspaceLocalItem> = self.iter().collect();
        let recount = rows.iter().filter(|r| r.is_pending_reconcile()).count() + self.removed_items.len();
        if recount != self.pending_reconcile_count {
            error!(
                counted = recount,
                tracked = self.pending_reconcile_count,
                "pending reconcile count out of step"
            );
        }
        let total = i32::try_from(rows.len() + self.removed_items.len())
            .map_err(|_| TableError::invalid(Self::NAME, "too many rows"))?;

        writer.write_u16(VERSION_TABLE_MAGIC).map_err(&corrupt)?;
        writer.write_i32(VERSION_TABLE_SCHEMA).map_err(&corrupt)?;
        writer.write_bool(self.pending_reconcile()).map_err(&corrupt)?;
        writer.write_i32(total).map_err(&corrupt)?;
        for row in rows.into_iter().chain(&self.removed_items) {
            row.write(writer, RowSchema::V2).map_err(&corrupt)?;
        }
        Ok(true)
    }
}

impl fmt::Debug for VersionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VersionTable")
            .field("rows", &self.rows.len())
            .field("local", &self.local.len())
            .field("server", &self.server.len())
            .field("removed_items", &self.removed_items.len())
            .field("pending_reconcile_count", &self.pending_reconcile_count)
            .finish()
    }
}
