//! Process-wide cache of exclusion lists, backed by one XML file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use lw_types::Guid;
use tracing::{debug, warn};

use crate::config::ExclusionCacheConfig;
use crate::error::{ExclusionError, ExclusionResult};
use crate::matcher::ExclusionMatcher;
use crate::set::{unknown_update_time, ExclusionSet};
use crate::xml::{self, StoredCollection};

/// Identity of a server collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Collection {
    pub id: Guid,
    pub uri: String,
}

impl Collection {
    pub fn new(id: Guid, uri: impl Into<String>) -> Self {
        Self { id, uri: uri.into() }
    }
}

/// Called with the collection id after its exclusions change.
pub type ExclusionsUpdatedListener = Arc<dyn Fn(Guid) + Send + Sync>;

/// Handle returned by [`ExclusionCache::add_listener`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Exclusion lists for every collection this process has seen.
///
/// The file is read at most once, on first use. Every write re-reads the
/// file and merges it in first, so changes another process made since
/// then survive.
pub struct ExclusionCache {
    config: ExclusionCacheConfig,
    loaded: AtomicBool,
    collections: RwLock<BTreeMap<Guid, StoredCollection>>,
    listeners: Mutex<Vec<(ListenerId, ExclusionsUpdatedListener)>>,
    next_listener: AtomicU64,
}

impl ExclusionCache {
    pub fn new(config: ExclusionCacheConfig) -> Self {
        Self {
            config,
            loaded: AtomicBool::new(false),
            collections: RwLock::new(BTreeMap::new()),
            listeners: Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ExclusionCacheConfig {
        &self.config
    }

    // -----------------------------------------------------------------
    // Listeners
    // -----------------------------------------------------------------

    pub fn add_listener(&self, listener: ExclusionsUpdatedListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .lock()
            .expect("exclusion listener lock poisoned")
            .push((id, listener));
        id
    }

    /// Returns `false` if `id` was not registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock().expect("exclusion listener lock poisoned");
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    fn fire_updated(&self, collection: Guid) {
        let listeners: Vec<ExclusionsUpdatedListener> = self
            .listeners
            .lock()
            .expect("exclusion listener lock poisoned")
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(collection);
        }
    }

    // -----------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------

    /// The effective exclusions of `collection`, creating its set from the
    /// built-in list if it has none.
    pub fn exclusions(&self, collection: &Collection) -> ExclusionResult<Vec<String>> {
        self.ensure_loaded()?;
        {
            let collections = self.collections.read().expect("exclusion cache lock poisoned");
            if let Some(stored) = collections.get(&collection.id) {
                return Ok(stored.set.exclusions());
            }
        }

        let mut collections = self.collections.write().expect("exclusion cache lock poisoned");
        let stored = collections.entry(collection.id).or_insert_with(|| {
            debug!(collection = %collection.id, "new exclusion set from built-in list");
            StoredCollection {
                uri: collection.uri.clone(),
                set: ExclusionSet::new(),
            }
        });
        Ok(stored.set.exclusions())
    }

    /// A matcher over the effective exclusions of `collection`.
    pub fn matcher(&self, collection: &Collection) -> ExclusionResult<ExclusionMatcher> {
        ExclusionMatcher::new(self.exclusions(collection)?)
    }

    /// Remove one exclusion and persist. Returns `false` if the collection
    /// has no such exclusion.
    pub fn remove_exclusion(&self, collection: &Collection, exclusion: &str) -> ExclusionResult<bool> {
        self.ensure_loaded()?;
        let removed = {
            let mut collections = self.collections.write().expect("exclusion cache lock poisoned");
            let removed = collections
                .get_mut(&collection.id)
                .is_some_and(|stored| stored.set.remove_exclusion(exclusion));
            if removed {
                self.write_to_disk(&mut collections);
            }
            removed
        };
        if removed {
            self.fire_updated(collection.id);
        }
        Ok(removed)
    }

    /// Apply a default list sent by the server and persist.
    pub fn set_default_exclusions<I, S>(&self, collection: &Collection, watermark: Guid, exclusions: I) -> ExclusionResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ensure_loaded()?;
        {
            let mut collections = self.collections.write().expect("exclusion cache lock poisoned");
            collections
                .entry(collection.id)
                .or_insert_with(|| StoredCollection {
                    uri: collection.uri.clone(),
                    set: ExclusionSet::new(),
                })
                .set
                .set_default_exclusions(watermark, exclusions);
            self.write_to_disk(&mut collections);
        }
        self.fire_updated(collection.id);
        Ok(())
    }

    /// When the server last sent a default list for `collection`, or
    /// 0001-01-01T00:00:00Z if never.
    pub fn last_default_exclusion_update(&self, collection: &Collection) -> ExclusionResult<DateTime<Utc>> {
        self.ensure_loaded()?;
        let collections = self.collections.read().expect("exclusion cache lock poisoned");
        Ok(collections
            .get(&collection.id)
            .map(|stored| stored.set.last_default_exclusion_update())
            .unwrap_or_else(unknown_update_time))
    }

    // -----------------------------------------------------------------
    // Disk
    // -----------------------------------------------------------------

    fn ensure_loaded(&self) -> ExclusionResult<()> {
        if !self.config.enabled || self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }

        let mut collections = self.collections.write().expect("exclusion cache lock poisoned");
        if self.loaded.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Some(text) = self.read_file()? {
            match xml::parse(&text) {
                Ok(on_disk) => {
                    debug!(collections = on_disk.len(), "exclusion cache loaded");
                    for (id, stored) in on_disk {
                        collections.entry(id).or_insert(stored);
                    }
                }
                Err(e) => {
                    warn!(path = %self.config.file_path().display(), error = %e, "ignoring malformed exclusion cache");
                }
            }
        }
        self.loaded.store(true, Ordering::Release);
        Ok(())
    }

    fn read_file(&self) -> ExclusionResult<Option<String>> {
        let path = self.config.file_path();
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ExclusionError::Read { path, source }),
        }
    }

    /// Merge the file's current contents into `collections`, write the
    /// result, and clear the save bookkeeping. Failures are logged, not
    /// returned.
    fn write_to_disk(&self, collections: &mut BTreeMap<Guid, StoredCollection>) {
        if self.config.enabled {
            let on_disk = match self.read_file().and_then(|text| text.map(|t| xml::parse(&t)).transpose()) {
                Ok(on_disk) => on_disk.unwrap_or_default(),
                Err(e) => {
                    warn!(path = %self.config.file_path().display(), error = %e, "overwriting unreadable exclusion cache");
                    BTreeMap::new()
                }
            };
            for (id, disk) in on_disk {
                match collections.get_mut(&id) {
                    Some(stored) => stored.set.merge(&disk.set),
                    None => {
                        collections.insert(id, disk);
                    }
                }
            }

            let path = self.config.file_path();
            let written = xml::render(collections).and_then(|text| {
                fs::create_dir_all(&self.config.directory)
                    .and_then(|()| fs::write(&path, text))
                    .map_err(|source| ExclusionError::Write {
                        path: path.clone(),
                        source,
                    })
            });
            match written {
                Ok(()) => debug!(path = %path.display(), "exclusion cache written"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to write exclusion cache"),
            }
        }

        for stored in collections.values_mut() {
            stored.set.mark_clean();
        }
    }
}

impl std::fmt::Debug for ExclusionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExclusionCache")
            .field("config", &self.config)
            .field("loaded", &self.loaded.load(Ordering::Relaxed))
            .finish()
    }
}
