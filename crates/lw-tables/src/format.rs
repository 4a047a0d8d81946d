//! The capability interface a metadata table implements.

use std::any::Any;
use std::io::{Read, Write};

use lw_codec::{BinaryReader, BinaryWriter};

use crate::error::TableResult;

/// A table that can be materialized from disk or from another instance.
///
/// Implementations decide only the payload. File placement, slot recovery
/// and the Uninitialized / Loaded / Dirty transitions belong to
/// [`TableFile`](crate::TableFile).
pub trait TableFormat: Any + Send + Sync + Sized {
    /// Name used in logs and error messages.
    const NAME: &'static str;

    /// An empty table, used when no file exists.
    fn initialize() -> Self;

    /// Populate from a stream positioned at the table's magic number.
    ///
    /// Any failure must be reported as a format error for this table.
    fn load<R: Read>(&mut self, reader: &mut BinaryReader<R>) -> TableResult<()>;

    /// Copy state from an already-loaded table of a compatible type.
    ///
    /// Returns `false` when `source` is not compatible; the caller then
    /// loads from disk instead.
    fn cached_load(&mut self, source: &dyn Any) -> bool {
        let _ = source;
        false
    }

    /// Whether [`cached_load`](Self::cached_load) can copy from `source`
    /// without touching it.
    fn accepts_cached(source: &dyn Any) -> bool {
        source.is::<Self>()
    }
}

/// A table that can be persisted.
///
/// Header projections implement only [`TableFormat`], so saving one is
/// rejected at compile time.
pub trait WritableTable: TableFormat {
    /// Write the table. Returns `false` if the table file should be
    /// removed instead of written (nothing worth keeping).
    fn save<W: Write>(&self, writer: &mut BinaryWriter<W>) -> TableResult<bool>;
}
