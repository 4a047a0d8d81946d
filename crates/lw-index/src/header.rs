//! Read-only summary of the workspace version table.

use std::any::Any;
use std::io::Read;

use lw_codec::BinaryReader;
use lw_tables::{TableError, TableFormat, TableResult};

use crate::table::{VersionTable, VERSION_TABLE_MAGIC};

/// Magic number written by older clients.
pub const LEGACY_VERSION_TABLE_MAGIC: u16 = 0x1234;

/// Only the pending-reconcile flag of the version table.
///
/// Loading stops right after the flag, so this is cheap even for large
/// workspaces. It can also be filled from a loaded [`VersionTable`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VersionTableHeader {
    pending_reconcile: bool,
}

impl VersionTableHeader {
    pub fn pending_reconcile(&self) -> bool {
        self.pending_reconcile
    }
}

impl TableFormat for VersionTableHeader {
    const NAME: &'static str = "workspace version table header";

    fn initialize() -> Self {
        Self::default()
    }

    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> TableResult<()> {
        let corrupt = TableError::corrupt(Self::NAME);

        let magic = reader.read_u16().map_err(&corrupt)?;
        if magic != VERSION_TABLE_MAGIC && magic != LEGACY_VERSION_TABLE_MAGIC {
            return Err(TableError::invalid(Self::NAME, format!("bad magic {magic:#06x}")));
        }
        let schema = reader.read_i32().map_err(&corrupt)?;
        if !(1..=2).contains(&schema) {
            return Err(TableError::invalid(
                Self::NAME,
                format!("unsupported schema version {schema}"),
            ));
        }
        self.pending_reconcile = reader.read_bool().map_err(&corrupt)?;
        Ok(())
    }

    fn cached_load(&mut self, source: &dyn Any) -> bool {
        if let Some(table) = source.downcast_ref::<VersionTable>() {
            self.pending_reconcile = table.pending_reconcile();
            true
        } else if let Some(header) = source.downcast_ref::<VersionTableHeader>() {
            *self = *header;
            true
        } else {
            false
        }
    }

    fn accepts_cached(source: &dyn Any) -> bool {
        source.is::<VersionTable>() || source.is::<VersionTableHeader>()
    }
}
