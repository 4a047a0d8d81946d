//! Local paths whose edit still has to be pended on the server.

use std::any::Any;
use std::collections::BTreeSet;
use std::io::{Read, Write};

use lw_codec::{BinaryReader, BinaryWriter};
use lw_types::PathKey;

use crate::error::{TableError, TableResult};
use crate::format::{TableFormat, WritableTable};

pub const QUEUED_EDITS_MAGIC: u16 = 0xAB67;
pub const QUEUED_EDITS_SCHEMA: u8 = 1;

/// Case-insensitive set of local paths queued for a server edit.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueuedEditsTable {
    edits: BTreeSet<PathKey>,
}

impl QueuedEditsTable {
    /// Queue `local_item`. Returns `false` if it was already queued.
    pub fn add_queued_edit(&mut self, local_item: &str) -> bool {
        self.edits.insert(PathKey::local(local_item))
    }

    /// Dequeue `local_item`. Returns `false` if it was not queued.
    pub fn remove_queued_edit(&mut self, local_item: &str) -> bool {
        self.edits.remove(&PathKey::local(local_item))
    }

    pub fn contains(&self, local_item: &str) -> bool {
        self.edits.contains(&PathKey::local(local_item))
    }

    /// Queued paths in top-down order.
    pub fn queued_edits(&self) -> impl Iterator<Item = &str> {
        self.edits.iter().map(PathKey::as_str)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn clear(&mut self) {
        self.edits.clear();
    }
}

impl TableFormat for QueuedEditsTable {
    const NAME: &'static str = "queued edits table";

    fn initialize() -> Self {
        Self::default()
    }

    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> TableResult<()> {
        let corrupt = TableError::corrupt(Self::NAME);

        let magic = reader.read_u16().map_err(&corrupt)?;
        if magic != QUEUED_EDITS_MAGIC {
            return Err(TableError::invalid(Self::NAME, format!("bad magic {magic:#06x}")));
        }
        let schema = reader.read_u8().map_err(&corrupt)?;
        if schema != QUEUED_EDITS_SCHEMA {
            return Err(TableError::invalid(
                Self::NAME,
                format!("unsupported schema version {schema}"),
            ));
        }

        let count = reader.read_i32().map_err(&corrupt)?;
        if count < 0 {
            return Err(TableError::invalid(Self::NAME, format!("negative count {count}")));
        }
        for _ in 0..count {
            let local_item = reader.read_string().map_err(&corrupt)?;
            self.edits.insert(PathKey::local(local_item));
        }
        Ok(())
    }

    fn cached_load(&mut self, source: &dyn Any) -> bool {
        match source.downcast_ref::<QueuedEditsTable>() {
            Some(other) => {
                self.edits = other.edits.clone();
                true
            }
            None => false,
        }
    }
}

impl WritableTable for QueuedEditsTable {
    fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> TableResult<bool> {
        if self.edits.is_empty() {
            return Ok(false);
        }
        let corrupt = TableError::corrupt(Self::NAME);
        let count = i32::try_from(self.edits.len())
            .map_err(|_| TableError::invalid(Self::NAME, "too many queued edits"))?;

        writer.write_u16(QUEUED_EDITS_MAGIC).map_err(&corrupt)?;
        writer.write_u8(QUEUED_EDITS_SCHEMA).map_err(&corrupt)?;
        writer.write_i32(count).map_err(&corrupt)?;
        for edit in &self.edits {
            writer.write_string(edit.as_str()).map_err(&corrupt)?;
        }
        Ok(true)
    }
}
