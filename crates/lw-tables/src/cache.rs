//! Cache of loaded tables, keyed by table kind and location.

use std::any::TypeId;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Weak};

use tracing::debug;

use crate::file::{CachedSource, TableFile};
use crate::format::TableFormat;

type SharedTable = Arc<dyn CachedSource>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    kind: TypeId,
    path: PathBuf,
}

struct CacheEntry {
    weak: Weak<dyn CachedSource>,
    /// Present only while the cache is pinning.
    strong: Option<SharedTable>,
}

#[derive(Default)]
struct CacheInner {
    entries: HashMap<CacheKey, CacheEntry>,
    pinning: bool,
}

/// Keeps recently used tables reachable so a later open can copy them
/// instead of re-reading the file.
///
/// Entries are held weakly: once every other owner drops a table it falls
/// out of the cache. In pinning mode the cache also holds a strong
/// reference to every entry, which keeps tables alive across operations
/// when nothing else does (a non-interactive batch, for example).
///
/// A lookup only returns a table that reports itself eligible for cached
/// reuse; an ineligible or dead entry is evicted by the lookup itself.
pub struct TableCache {
    inner: Mutex<CacheInner>,
}

impl TableCache {
    /// Create an empty, non-pinning cache.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheInner::default()),
        }
    }

    fn key<T: TableFormat>(path: &Path) -> CacheKey {
        CacheKey {
            kind: TypeId::of::<T>(),
            path: path.to_path_buf(),
        }
    }

    /// Look up the table of kind `T` stored for `path`.
    pub fn get<T: TableFormat>(&self, path: &Path) -> Option<Arc<TableFile<T>>> {
        let key = Self::key::<T>(path);
        let mut inner = self.inner.lock().expect("table cache lock poisoned");
        let entry = inner.entries.get(&key)?;

        let table = entry
            .weak
            .upgrade()
            .and_then(|shared| shared.into_any().downcast::<TableFile<T>>().ok());
        match table {
            Some(table) if table.is_eligible_for_cached_load() => {
                debug!(table = T::NAME, path = %path.display(), "table cache hit");
                Some(table)
            }
            _ => {
                inner.entries.remove(&key);
                debug!(table = T::NAME, path = %path.display(), "table cache entry evicted");
                None
            }
        }
    }

    /// Find a table a `T` at `path` may be loaded from.
    ///
    /// An entry of kind `T` wins. Otherwise any eligible entry for `path`
    /// whose table `T` accepts is returned, so a header can be copied from
    /// the full table it summarizes. Dead and ineligible entries for `path`
    /// met along the way are evicted.
    pub fn source_for<T: TableFormat>(&self, path: &Path) -> Option<SharedTable> {
        if let Some(table) = self.get::<T>(path) {
            let source: SharedTable = table;
            return Some(source);
        }

        let mut inner = self.inner.lock().expect("table cache lock poisoned");
        let mut found: Option<SharedTable> = None;
        inner.entries.retain(|key, entry| {
            if key.path != path {
                return true;
            }
            let Some(source) = entry.weak.upgrade() else {
                return false;
            };
            if !source.is_eligible_for_cached_load() {
                return false;
            }
            if found.is_none() && T::accepts_cached(source.cached_table()) {
                debug!(
                    table = T::NAME,
                    source = source.table_name(),
                    path = %path.display(),
                    "table cache hit from another kind"
                );
                found = Some(source);
            }
            true
        });
        found
    }

    /// Store `table` for `path`, replacing any previous entry of its kind.
    pub fn put<T: TableFormat>(&self, path: &Path, table: &Arc<TableFile<T>>) {
        let shared: SharedTable = table.clone();
        let mut inner = self.inner.lock().expect("table cache lock poisoned");
        let strong = inner.pinning.then(|| shared.clone());
        inner.entries.insert(
            Self::key::<T>(path),
            CacheEntry {
                weak: Arc::downgrade(&shared),
                strong,
            },
        );
    }

    /// Drop the entry of kind `T` for `path`.
    pub fn remove<T: TableFormat>(&self, path: &Path) {
        let mut inner = self.inner.lock().expect("table cache lock poisoned");
        inner.entries.remove(&Self::key::<T>(path));
    }

    /// Turn pinning on or off.
    ///
    /// Turning it on pins every entry that is still alive and drops dead
    /// ones; turning it off releases every pin immediately.
    pub fn set_pinning(&self, pinning: bool) {
        let mut inner = self.inner.lock().expect("table cache lock poisoned");
        inner.pinning = pinning;
        if pinning {
            inner.entries.retain(|_, entry| {
                entry.strong = entry.weak.upgrade();
                entry.strong.is_some()
            });
        } else {
            for entry in inner.entries.values_mut() {
                entry.strong = None;
            }
        }
        debug!(pinning, entries = inner.entries.len(), "table cache pinning changed");
    }

    pub fn is_pinning(&self) -> bool {
        self.inner.lock().expect("table cache lock poisoned").pinning
    }

    /// Number of entries, live or not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.lock().expect("table cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry.
    pub fn clear(&self) {
        self.inner.lock().expect("table cache lock poisoned").entries.clear();
    }
}

impl Default for TableCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TableCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock().expect("table cache lock poisoned");
        f.debug_struct("TableCache")
            .field("entries", &inner.entries.len())
            .field("pinning", &inner.pinning)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TableConfig;
    use crate::header::PendingChangesHeader;
    use crate::queued_edits::QueuedEditsTable;

    fn loaded<T: TableFormat>(dir: &tempfile::TempDir, name: &str) -> Arc<TableFile<T>> {
        let mut file = TableFile::<T>::open(dir.path().join(name), TableConfig::default(), None).unwrap();
        file.release();
        Arc::new(file)
    }

    #[test]
    fn returns_eligible_table() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "queued");

        cache.put(table.path(), &table);
        let hit = cache.get::<QueuedEditsTable>(table.path()).unwrap();
        assert!(Arc::ptr_eq(&hit, &table));
    }

    #[test]
    fn ineligible_entry_is_evicted_on_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        // Opened but never released: not eligible.
        let table = Arc::new(
            TableFile::<QueuedEditsTable>::open(dir.path().join("q"), TableConfig::default(), None)
                .unwrap(),
        );

        cache.put(table.path(), &table);
        assert_eq!(cache.len(), 1);
        assert!(cache.get::<QueuedEditsTable>(table.path()).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn weak_entry_dies_with_its_owner() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "q");
        let path = table.path().to_path_buf();

        cache.put(&path, &table);
        drop(table);
        assert!(cache.get::<QueuedEditsTable>(&path).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn pinning_keeps_tables_alive() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "q");
        let path = table.path().to_path_buf();
        cache.put(&path, &table);

        cache.set_pinning(true);
        drop(table);
        assert!(cache.get::<QueuedEditsTable>(&path).is_some());

        cache.set_pinning(false);
        assert!(cache.get::<QueuedEditsTable>(&path).is_none());
    }

    #[test]
    fn put_while_pinning_holds_strongly() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        cache.set_pinning(true);
        assert!(cache.is_pinning());

        let table = loaded::<PendingChangesHeader>(&dir, "pc");
        let path = table.path().to_path_buf();
        cache.put(&path, &table);
        drop(table);
        assert!(cache.get::<PendingChangesHeader>(&path).is_some());
    }

    #[test]
    fn kinds_are_kept_apart() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "same");
        cache.put(table.path(), &table);

        assert!(cache.get::<PendingChangesHeader>(table.path()).is_none());
        assert!(cache.get::<QueuedEditsTable>(table.path()).is_some());

        cache.remove::<QueuedEditsTable>(table.path());
        assert!(cache.is_empty());
    }

    #[test]
    fn source_for_prefers_same_kind() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "q");
        cache.put(table.path(), &table);

        let source = cache.source_for::<QueuedEditsTable>(table.path()).unwrap();
        let hit = source.into_any().downcast::<TableFile<QueuedEditsTable>>().unwrap();
        assert!(Arc::ptr_eq(&hit, &table));
    }

    #[test]
    fn source_for_skips_incompatible_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "shared");
        cache.put(table.path(), &table);

        assert!(cache.source_for::<PendingChangesHeader>(table.path()).is_none());
        // The incompatible entry is still live and eligible, so it stays.
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn source_for_evicts_dead_entries_of_other_kinds() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let table = loaded::<QueuedEditsTable>(&dir, "shared");
        let path = table.path().to_path_buf();
        cache.put(&path, &table);
        drop(table);

        assert!(cache.source_for::<PendingChangesHeader>(&path).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_source_feeds_a_fresh_open() {
        let dir = tempfile::tempdir().unwrap();
        let cache = TableCache::new();
        let path = dir.path().join("queued");

        let mut first = TableFile::<QueuedEditsTable>::open(&path, TableConfig::default(), None).unwrap();
        first.get_mut().add_queued_edit("/w/a.txt");
        first.close().unwrap();
        let first = Arc::new(first);
        cache.put(&path, &first);

        let source = cache.source_for::<QueuedEditsTable>(&path);
        let second =
            TableFile::<QueuedEditsTable>::open(&path, TableConfig::default(), source.as_deref()).unwrap();
        assert!(second.is_cached_load());
        assert!(second.get().contains("/w/a.txt"));
    }
}
