//! Read-only summary of the pending changes table.

use std::any::Any;
use std::io::Read;

use lw_codec::BinaryReader;
use lw_types::Guid;

use crate::error::{TableError, TableResult};
use crate::format::TableFormat;

/// Magic number at the start of the pending changes table.
pub const PENDING_CHANGES_MAGIC: u16 = 0x7425;

/// Schema versions whose header layout is understood.
pub const PENDING_CHANGES_SCHEMAS: [u8; 2] = [1, 2];

/// The leading fields of the pending changes table: the signature of the
/// client that last wrote it and how many changes it holds.
///
/// The rest of the file is never read.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PendingChangesHeader {
    signature: Guid,
    count: u32,
}

impl PendingChangesHeader {
    /// Signature stamped by the last writer.
    pub fn client_signature(&self) -> Guid {
        self.signature
    }

    /// Number of pending changes in the table.
    pub fn pending_change_count(&self) -> u32 {
        self.count
    }

    pub fn has_pending_changes(&self) -> bool {
        self.count > 0
    }
}

impl TableFormat for PendingChangesHeader {
    const NAME: &'static str = "pending changes table";

    fn initialize() -> Self {
        Self::default()
    }

    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> TableResult<()> {
        let corrupt = TableError::corrupt(Self::NAME);

        let magic = reader.read_u16().map_err(&corrupt)?;
        if magic != PENDING_CHANGES_MAGIC {
            return Err(TableError::invalid(Self::NAME, format!("bad magic {magic:#06x}")));
        }
        let schema = reader.read_u8().map_err(&corrupt)?;
        if !PENDING_CHANGES_SCHEMAS.contains(&schema) {
            return Err(TableError::invalid(
                Self::NAME,
                format!("unsupported schema version {schema}"),
            ));
        }

        self.signature = Guid::from_bytes_le(reader.read_array().map_err(&corrupt)?);
        let count = reader.read_i32().map_err(&corrupt)?;
        self.count = u32::try_from(count)
            .map_err(|_| TableError::invalid(Self::NAME, format!("negative count {count}")))?;
        Ok(())
    }

    fn cached_load(&mut self, source: &dyn Any) -> bool {
        match source.downcast_ref::<PendingChangesHeader>() {
            Some(other) => {
                self.clone_from(other);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lw_codec::BinaryWriter;

    fn header_bytes(magic: u16, schema: u8, signature: Guid, count: i32) -> Vec<u8> {
        let mut w = BinaryWriter::new(Vec::new());
        w.write_u16(magic).unwrap();
        w.write_u8(schema).unwrap();
        w.write_bytes(&signature.to_bytes_le()).unwrap();
        w.write_i32(count).unwrap();
        // Trailing payload the header never reads.
        w.write_string("$/Project/file.txt").unwrap();
        w.into_inner()
    }

    fn load(bytes: &[u8]) -> TableResult<PendingChangesHeader> {
        let mut header = PendingChangesHeader::initialize();
        header.load(&mut BinaryReader::new(bytes))?;
        Ok(header)
    }

    #[test]
    fn reads_signature_and_count() {
        let signature = Guid::new();
        for schema in PENDING_CHANGES_SCHEMAS {
            let header = load(&header_bytes(PENDING_CHANGES_MAGIC, schema, signature, 12)).unwrap();
            assert_eq!(header.client_signature(), signature);
            assert_eq!(header.pending_change_count(), 12);
            assert!(header.has_pending_changes());
        }
    }

    #[test]
    fn rejects_bad_magic_and_schema() {
        let err = load(&header_bytes(0x1234, 1, Guid::EMPTY, 0)).unwrap_err();
        assert!(matches!(err, TableError::InvalidFormat { table: "pending changes table", .. }));

        let err = load(&header_bytes(PENDING_CHANGES_MAGIC, 3, Guid::EMPTY, 0)).unwrap_err();
        assert!(err.to_string().contains("schema version 3"));
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let bytes = header_bytes(PENDING_CHANGES_MAGIC, 2, Guid::new(), 1);
        let err = load(&bytes[..10]).unwrap_err();
        assert!(matches!(err, TableError::Corrupt { .. }));
    }

    #[test]
    fn cached_load_from_header_only() {
        let source = load(&header_bytes(PENDING_CHANGES_MAGIC, 2, Guid::new(), 3)).unwrap();
        let mut copy = PendingChangesHeader::initialize();
        assert!(copy.cached_load(&source));
        assert_eq!(copy, source);
        assert!(!copy.cached_load(&42u32));
    }
}
