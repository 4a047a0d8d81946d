//! One row of the workspace version table.

use std::fmt;
use std::io::{Read, Write};

use lw_codec::{BinaryReader, BinaryWriter, CodecResult};
use lw_types::{Guid, ItemType};
use serde::{Deserialize, Serialize};

use crate::flags::LocalItemFlags;

/// Encoding value that marks a row as a directory.
pub const ENCODING_FOLDER: i32 = -3;

/// Timestamp value meaning "not known".
pub const UNKNOWN_TIME: i64 = -1;

const EMPTY_HASH: [u8; 16] = [0; 16];

/// Row layout versions. Version 2 adds the check-in date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RowSchema {
    V1,
    V2,
}

/// The executable/symlink property a file reports.
///
/// Every file reports exactly one of these; there is no "no property" case.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyValue {
    Symlink,
    ExecutableEnabled,
    ExecutableDisabled,
}

/// What the server is told about one row during reconcile.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalVersionUpdate {
    pub source_server_item: String,
    pub local_version: i32,
    /// `None` tells the server the item is no longer on disk.
    pub target_local_item: Option<String>,
}

/// The recorded state of one tracked path.
///
/// `server_item` is the committed path for a committed row (non-zero
/// version) and the pending target path otherwise. A row without a local
/// path is in the deleted state. Directory rows carry no length, hash or
/// baseline data; those fields are neither stored nor serialized for them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceLocalItem {
    flags: LocalItemFlags,
    server_item: String,
    local_item: Option<String>,
    version: i32,
    item_id: i32,
    last_modified_time: i64,
    encoding: i32,
    checkin_date: i64,
    length: i64,
    hash_value: Option<[u8; 16]>,
    baseline_file_guid: Option<Guid>,
}

impl WorkspaceLocalItem {
    /// A file row with default fields.
    pub fn new_file(server_item: impl Into<String>, local_item: Option<String>) -> Self {
        Self {
            flags: LocalItemFlags::default(),
            server_item: server_item.into(),
            local_item: local_item.filter(|l| !l.is_empty()),
            version: 0,
            item_id: 0,
            last_modified_time: UNKNOWN_TIME,
            encoding: 0,
            checkin_date: UNKNOWN_TIME,
            length: 0,
            hash_value: None,
            baseline_file_guid: None,
        }
    }

    /// A directory row with default fields.
    pub fn new_folder(server_item: impl Into<String>, local_item: Option<String>) -> Self {
        let mut item = Self::new_file(server_item, local_item);
        item.encoding = ENCODING_FOLDER;
        item
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = version;
        self
    }

    pub fn with_item_id(mut self, item_id: i32) -> Self {
        self.item_id = item_id;
        self
    }

    pub fn with_flags(mut self, flags: LocalItemFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Attach file data. Ignored for directories.
    pub fn with_file_data(mut self, length: i64, hash_value: Option<[u8; 16]>, baseline: Option<Guid>) -> Self {
        if !self.is_directory() {
            self.length = length;
            self.hash_value = hash_value.filter(|h| *h != EMPTY_HASH);
            self.baseline_file_guid = baseline;
        }
        self
    }

    // -----------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------

    pub fn flags(&self) -> LocalItemFlags {
        self.flags
    }

    pub fn server_item(&self) -> &str {
        &self.server_item
    }

    pub fn set_server_item(&mut self, server_item: impl Into<String>) {
        self.server_item = server_item.into();
    }

    pub fn local_item(&self) -> Option<&str> {
        self.local_item.as_deref()
    }

    /// An empty path is stored as absent.
    pub fn set_local_item(&mut self, local_item: Option<String>) {
        self.local_item = local_item.filter(|l| !l.is_empty());
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    pub fn item_id(&self) -> i32 {
        self.item_id
    }

    pub fn last_modified_time(&self) -> i64 {
        self.last_modified_time
    }

    pub fn set_last_modified_time(&mut self, time: i64) {
        self.last_modified_time = time;
    }

    pub fn encoding(&self) -> i32 {
        self.encoding
    }

    /// Changing a row into a directory drops its file data.
    pub fn set_encoding(&mut self, encoding: i32) {
        self.encoding = encoding;
        if self.is_directory() {
            self.length = 0;
            self.hash_value = None;
            self.baseline_file_guid = None;
        }
    }

    pub fn checkin_date(&self) -> i64 {
        self.checkin_date
    }

    pub fn set_checkin_date(&mut self, date: i64) {
        self.checkin_date = date;
    }

    pub fn length(&self) -> i64 {
        self.length
    }

    pub fn hash_value(&self) -> Option<&[u8; 16]> {
        self.hash_value.as_ref()
    }

    pub fn baseline_file_guid(&self) -> Option<Guid> {
        self.baseline_file_guid
    }

    pub fn has_baseline_file_guid(&self) -> bool {
        self.baseline_file_guid.is_some()
    }

    pub fn set_baseline_file_guid(&mut self, guid: Option<Guid>) {
        if !self.is_directory() {
            self.baseline_file_guid = guid;
        }
    }

    // -----------------------------------------------------------------
    // Derived state
    // -----------------------------------------------------------------

    /// A committed row has a non-zero version.
    pub fn is_committed(&self) -> bool {
        self.version != 0
    }

    pub fn is_directory(&self) -> bool {
        self.encoding == ENCODING_FOLDER
    }

    pub fn item_type(&self) -> ItemType {
        if self.is_directory() {
            ItemType::Folder
        } else {
            ItemType::File
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.flags.contains(LocalItemFlags::DELETED)
    }

    pub fn set_deleted(&mut self, on: bool) {
        self.flags.set(LocalItemFlags::DELETED, on);
    }

    pub fn is_pending_reconcile(&self) -> bool {
        self.flags.contains(LocalItemFlags::PENDING_RECONCILE)
    }

    pub fn set_pending_reconcile(&mut self, on: bool) {
        self.flags.set(LocalItemFlags::PENDING_RECONCILE, on);
    }

    pub fn is_missing_on_disk(&self) -> bool {
        self.flags.contains(LocalItemFlags::LOCAL_ITEM_MISSING)
    }

    pub fn set_missing_on_disk(&mut self, on: bool) {
        self.flags.set(LocalItemFlags::LOCAL_ITEM_MISSING, on);
    }

    pub fn is_scanned(&self) -> bool {
        self.flags.contains(LocalItemFlags::SCANNED)
    }

    pub fn set_scanned(&mut self, on: bool) {
        self.flags.set(LocalItemFlags::SCANNED, on);
    }

    pub fn is_executable(&self) -> bool {
        self.flags.contains(LocalItemFlags::EXECUTABLE)
    }

    pub fn is_symlink(&self) -> bool {
        self.flags.contains(LocalItemFlags::SYMLINK)
    }

    /// Symlink wins over executable; a plain file is executable-disabled.
    pub fn property_value(&self) -> PropertyValue {
        if self.is_symlink() {
            PropertyValue::Symlink
        } else if self.is_executable() {
            PropertyValue::ExecutableEnabled
        } else {
            PropertyValue::ExecutableDisabled
        }
    }

    pub fn set_property_value(&mut self, value: PropertyValue) {
        self.flags
            .set(LocalItemFlags::SYMLINK, value == PropertyValue::Symlink);
        self.flags.set(
            LocalItemFlags::EXECUTABLE,
            value == PropertyValue::ExecutableEnabled,
        );
    }

    /// The reconcile report for this row, if one is due.
    ///
    /// A report is due when the row is pending reconcile, when it is missing
    /// from disk and `reconcile_missing_on_disk` is set, or when `force` is
    /// set. Deleted rows, and missing rows under `reconcile_missing_on_disk`,
    /// report no local path.
    pub fn local_version_update(
        &self,
        reconcile_missing_on_disk: bool,
        force: bool,
    ) -> Option<LocalVersionUpdate> {
        let missing = reconcile_missing_on_disk && self.is_missing_on_disk();
        if !self.is_pending_reconcile() && !missing && !force {
            return None;
        }
        let target_local_item = if self.is_deleted() || missing {
            None
        } else {
            self.local_item.clone()
        };
        Some(LocalVersionUpdate {
            source_server_item: self.server_item.clone(),
            local_version: self.version,
            target_local_item,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Read one row in the given layout.
    pub fn read<R: Read>(reader: &mut BinaryReader<R>, schema: RowSchema) -> CodecResult<Self> {
        let flags = LocalItemFlags::from_bits(reader.read_u8()?);
        let server_item = reader.read_string()?;
        let local_item = reader.read_string()?;
        let version = reader.read_i32()?;
        let item_id = reader.read_i32()?;
        let last_modified_time = reader.read_i64()?;
        let encoding = reader.read_i32()?;
        let checkin_date = match schema {
            RowSchema::V1 => UNKNOWN_TIME,
            RowSchema::V2 => reader.read_i64()?,
        };

        let mut item = Self {
            flags,
            server_item,
            local_item: Some(local_item).filter(|l| !l.is_empty()),
            version,
            item_id,
            last_modified_time,
            encoding,
            checkin_date,
            length: 0,
            hash_value: None,
            baseline_file_guid: None,
        };

        if !item.is_directory() {
            item.length = reader.read_i64()?;
            let hash: [u8; 16] = reader.read_array()?;
            item.hash_value = (hash != EMPTY_HASH).then_some(hash);
            if reader.read_bool()? {
                item.baseline_file_guid = Some(Guid::from_bytes_le(reader.read_array()?));
            }
        }
        Ok(item)
    }

    /// Write this row in the given layout.
    pub fn write<W: Write>(&self, writer: &mut BinaryWriter<W>, schema: RowSchema) -> CodecResult<()> {
        writer.write_u8(self.flags.bits())?;
        writer.write_string(&self.server_item)?;
        writer.write_string(self.local_item.as_deref().unwrap_or(""))?;
        writer.write_i32(self.version)?;
        writer.write_i32(self.item_id)?;
        writer.write_i64(self.last_modified_time)?;
        writer.write_i32(self.encoding)?;
        if schema >= RowSchema::V2 {
            writer.write_i64(self.checkin_date)?;
        }

        if !self.is_directory() {
            writer.write_i64(self.length)?;
            writer.write_bytes(self.hash_value.as_ref().unwrap_or(&EMPTY_HASH))?;
            match self.baseline_file_guid {
                Some(guid) => {
                    writer.write_bool(true)?;
                    writer.write_bytes(&guid.to_bytes_le())?;
                }
                None => writer.write_bool(false)?,
            }
        }
        Ok(())
    }
}

impl fmt::Debug for WorkspaceLocalItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("WorkspaceLocalItem");
        s.field("server_item", &self.server_item)
            .field("local_item", &self.local_item)
            .field("version", &self.version)
            .field("item_id", &self.item_id)
            .field("flags", &self.flags);
        if self.is_directory() {
            s.field("directory", &true);
        } else {
            s.field("length", &self.length)
                .field("hash_value", &self.hash_value.map(hex::encode))
                .field("baseline_file_guid", &self.baseline_file_guid);
        }
        s.finish()
    }
}
