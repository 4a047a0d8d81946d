//! Lifecycle driver for one metadata table file.

use std::any::Any;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use lw_codec::{BinaryReader, BinaryWriter};
use tracing::debug;

use crate::config::TableConfig;
use crate::error::TableResult;
use crate::format::{TableFormat, WritableTable};
use crate::slots::{self, Slot};

/// Where a [`TableFile`] is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableState {
    /// Constructed; contents are the empty table.
    Uninitialized,
    /// Contents match what is on disk.
    Loaded,
    /// Contents were handed out mutably and may differ from disk.
    Dirty,
}

/// Size and modification time of slot one, used to decide whether an
/// in-memory copy still reflects the file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileStamp {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileStamp {
    /// Stamp of the file at `path`, or `None` if it does not exist.
    pub fn of(path: &Path) -> TableResult<Option<Self>> {
        match fs::metadata(path) {
            Ok(meta) => Ok(Some(Self {
                len: meta.len(),
                modified: meta.modified().ok(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// A loaded table another [`TableFile`] may copy instead of reading disk.
///
/// The source need not be of the loading table's kind; the loading table's
/// [`TableFormat::cached_load`] decides what it accepts.
pub trait CachedSource: Any + Send + Sync {
    /// Name of the source table's kind.
    fn table_name(&self) -> &'static str;

    /// Stamp of slot one as of the source's last load or save.
    fn saved_stamp(&self) -> Option<FileStamp>;

    /// The source's table, for downcasting.
    fn cached_table(&self) -> &dyn Any;

    fn is_eligible_for_cached_load(&self) -> bool;

    /// Withdraw or restore the source's eligibility.
    fn set_eligible_for_cached_load(&self, eligible: bool);

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// A metadata table bound to its file.
///
/// Transitions:
/// - [`new`](Self::new): Uninitialized with an empty table.
/// - [`load`](Self::load): Uninitialized to Loaded, from a cached instance
///   when its stamp still matches slot one, else from disk.
/// - [`get_mut`](Self::get_mut): Loaded to Dirty.
/// - [`close`](Self::close): Dirty to Loaded by saving; either way the
///   instance becomes eligible for cached reuse.
pub struct TableFile<T> {
    path: PathBuf,
    config: TableConfig,
    table: T,
    state: TableState,
    saved: Option<FileStamp>,
    eligible: AtomicBool,
    from_cache: bool,
    aborted: bool,
}

impl<T: TableFormat> TableFile<T> {
    /// Bind an empty table to `path` (slot files are derived from it).
    pub fn new(path: impl Into<PathBuf>, config: TableConfig) -> Self {
        Self {
            path: path.into(),
            config,
            table: T::initialize(),
            state: TableState::Uninitialized,
            saved: None,
            eligible: AtomicBool::new(false),
            from_cache: false,
            aborted: false,
        }
    }

    /// Construct and load in one step.
    pub fn open(
        path: impl Into<PathBuf>,
        config: TableConfig,
        cached: Option<&dyn CachedSource>,
    ) -> TableResult<Self> {
        let mut file = Self::new(path, config);
        file.load(cached)?;
        Ok(file)
    }

    /// Load the table, preferring a cached instance when it is still current.
    ///
    /// A missing file yields the empty table.
    pub fn load(&mut self, cached: Option<&dyn CachedSource>) -> TableResult<()> {
        slots::recover(&self.path)?;

        if let Some(source) = cached {
            if self.try_cached_load(source)? {
                self.from_cache = true;
                self.state = TableState::Loaded;
                return Ok(());
            }
        }
        self.from_cache = false;

        let slot_one = slots::slot_path(&self.path, Slot::One);
        self.table = T::initialize();
        match File::open(&slot_one) {
            Ok(file) => {
                let mut reader =
                    BinaryReader::new(BufReader::with_capacity(self.config.buffer_size, file));
                self.table.load(&mut reader)?;
                self.saved = FileStamp::of(&slot_one)?;
                debug!(table = T::NAME, path = %slot_one.display(), "table loaded from disk");
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.saved = None;
                debug!(table = T::NAME, path = %slot_one.display(), "no table file, starting empty");
            }
            Err(e) => return Err(e.into()),
        }
        self.state = TableState::Loaded;
        Ok(())
    }

    fn try_cached_load(&mut self, source: &dyn CachedSource) -> TableResult<bool> {
        let current = FileStamp::of(&slots::slot_path(&self.path, Slot::One))?;
        if current.is_none() || current != source.saved_stamp() {
            // A stale source is never offered again.
            source.set_eligible_for_cached_load(false);
            debug!(table = T::NAME, source = source.table_name(), "cached table is stale");
            return Ok(false);
        }
        if !self.table.cached_load(source.cached_table()) {
            debug!(table = T::NAME, source = source.table_name(), "cached table not compatible");
            return Ok(false);
        }
        self.saved = source.saved_stamp();
        debug!(table = T::NAME, source = source.table_name(), "table loaded from cache");
        Ok(true)
    }

    /// Read access to the table.
    pub fn get(&self) -> &T {
        &self.table
    }

    /// Mutable access; marks the table dirty.
    pub fn get_mut(&mut self) -> &mut T {
        self.state = TableState::Dirty;
        self.eligible.store(false, Ordering::SeqCst);
        &mut self.table
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stamp of slot one as of the last load or save.
    pub fn saved_stamp(&self) -> Option<FileStamp> {
        self.saved
    }

    /// Whether another instance may copy this one instead of reading disk.
    pub fn is_eligible_for_cached_load(&self) -> bool {
        self.eligible.load(Ordering::SeqCst)
    }

    /// Whether the last load copied a cached instance.
    pub fn is_cached_load(&self) -> bool {
        self.from_cache
    }

    /// Finish with a table that will not be saved.
    pub fn release(&mut self) {
        if self.state != TableState::Dirty && !self.aborted {
            self.eligible.store(true, Ordering::SeqCst);
        }
    }

    /// Drop pending modifications; [`close`](Self::close) will not save.
    pub fn abort(&mut self) {
        self.aborted = true;
        self.eligible.store(false, Ordering::SeqCst);
    }
}

impl<T: WritableTable> TableFile<T> {
    /// Save if dirty, then mark eligible for cached reuse.
    pub fn close(&mut self) -> TableResult<()> {
        if self.aborted {
            return Ok(());
        }
        if self.state == TableState::Dirty {
            self.save()?;
            self.state = TableState::Loaded;
        }
        self.eligible.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn save(&mut self) -> TableResult<()> {
        let three = slots::slot_path(&self.path, Slot::Three);
        if let Some(parent) = three.parent() {
            fs::create_dir_all(parent)?;
        }

        let keep = {
            let file = File::create(&three)?;
            let mut writer =
                BinaryWriter::new(BufWriter::with_capacity(self.config.buffer_size, file));
            let keep = self.table.save(&mut writer)?;
            let file = writer
                .into_inner()
                .into_inner()
                .map_err(|e| e.into_error())?;
            file.sync_all()?;
            keep
        };

        if keep {
            slots::position(&self.path, &self.config)?;
            self.saved = FileStamp::of(&slots::slot_path(&self.path, Slot::One))?;
            debug!(table = T::NAME, path = %self.path.display(), "table saved");
        } else {
            slots::remove_all(&self.path)?;
            self.saved = None;
            debug!(table = T::NAME, path = %self.path.display(), "table empty, file removed");
        }
        Ok(())
    }
}

impl<T: TableFormat> CachedSource for TableFile<T> {
    fn table_name(&self) -> &'static str {
        T::NAME
    }

    fn saved_stamp(&self) -> Option<FileStamp> {
        self.saved
    }

    fn cached_table(&self) -> &dyn Any {
        &self.table
    }

    fn is_eligible_for_cached_load(&self) -> bool {
        self.eligible.load(Ordering::SeqCst)
    }

    fn set_eligible_for_cached_load(&self, eligible: bool) {
        self.eligible.store(eligible, Ordering::SeqCst);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

impl<T> fmt::Debug for TableFile<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFile")
            .field("path", &self.path)
            .field("state", &self.state)
            .field("saved", &self.saved)
            .field("eligible", &self.eligible.load(Ordering::SeqCst))
            .field("from_cache", &self.from_cache)
            .finish()
    }
}
