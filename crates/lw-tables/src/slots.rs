//! Three-slot file protocol.
//!
//! A table at `<path>` is stored as `<path>.tf1`. A save is written to
//! `.tf3`, renamed to `.tf2`, and only after `.tf1` has been removed is
//! `.tf2` renamed to `.tf1`. So `.tf2` is authoritative exactly when `.tf1`
//! is missing, and [`recover`] can always restore one complete copy.

use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::thread;

use tracing::{debug, warn};

use crate::config::TableConfig;
use crate::error::{TableError, TableResult};

/// One of the three files backing a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The authoritative copy.
    One,
    /// A complete copy waiting to replace slot one.
    Two,
    /// A copy being written.
    Three,
}

impl Slot {
    fn extension(self) -> &'static str {
        match self {
            Self::One => ".tf1",
            Self::Two => ".tf2",
            Self::Three => ".tf3",
        }
    }
}

/// Path of `slot` for the table at `base`.
pub fn slot_path(base: &Path, slot: Slot) -> PathBuf {
    let mut name = OsString::from(base.as_os_str());
    name.push(slot.extension());
    PathBuf::from(name)
}

/// Finish or roll back an interrupted save.
pub fn recover(base: &Path) -> TableResult<()> {
    let two = slot_path(base, Slot::Two);
    if !two.exists() {
        return Ok(());
    }
    let one = slot_path(base, Slot::One);
    if one.exists() {
        debug!(path = %two.display(), "discarding unpositioned slot two");
        remove_if_exists(&two)?;
    } else {
        debug!(path = %two.display(), "promoting slot two to slot one");
        fs::rename(&two, &one)?;
    }
    Ok(())
}

/// Move a freshly written slot three into slot one.
pub fn position(base: &Path, config: &TableConfig) -> TableResult<()> {
    let one = slot_path(base, Slot::One);
    let two = slot_path(base, Slot::Two);
    let three = slot_path(base, Slot::Three);

    remove_if_exists(&two)?;
    rename_with_retry(&three, &two, config)?;
    remove_if_exists(&one)?;
    rename_with_retry(&two, &one, config)?;
    debug!(path = %one.display(), "table positioned");
    Ok(())
}

/// Remove every slot of the table at `base`.
pub fn remove_all(base: &Path) -> TableResult<()> {
    for slot in [Slot::Three, Slot::Two, Slot::One] {
        remove_if_exists(&slot_path(base, slot))?;
    }
    Ok(())
}

fn remove_if_exists(path: &Path) -> TableResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

fn rename_with_retry(from: &Path, to: &Path, config: &TableConfig) -> TableResult<()> {
    let attempts = config.rename_retries.max(1);
    let mut attempt = 1;
    loop {
        match fs::rename(from, to) {
            Ok(()) => return Ok(()),
            Err(e) if attempt < attempts => {
                warn!(
                    from = %from.display(),
                    to = %to.display(),
                    attempt,
                    error = %e,
                    "slot rename failed, retrying"
                );
                thread::sleep(config.rename_retry_delay);
                attempt += 1;
            }
            Err(source) => {
                return Err(TableError::RenameFailed {
                    from: from.to_path_buf(),
                    to: to.to_path_buf(),
                    attempts,
                    source,
                })
            }
        }
    }
}
