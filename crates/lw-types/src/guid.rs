//! 16-byte identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TypeError, TypeResult};

/// A globally unique identifier.
///
/// On disk a GUID is stored as 16 bytes in the mixed-endian layout used by
/// the workspace metadata files: the first three fields little-endian, the
/// final eight bytes as-is. [`Guid::from_bytes_le`] and
/// [`Guid::to_bytes_le`] convert to and from that layout.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Guid(uuid::Uuid);

impl Guid {
    /// The all-zero GUID.
    pub const EMPTY: Guid = Guid(uuid::Uuid::nil());

    /// Generate a new time-ordered GUID (UUID v7).
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(uuid: uuid::Uuid) -> Self {
        Self(uuid)
    }

    /// Decode the on-disk 16-byte layout.
    pub fn from_bytes_le(bytes: [u8; 16]) -> Self {
        Self(uuid::Uuid::from_bytes_le(bytes))
    }

    /// Encode to the on-disk 16-byte layout.
    pub fn to_bytes_le(&self) -> [u8; 16] {
        self.0.to_bytes_le()
    }

    /// Parse the hyphenated (optionally braced) text form.
    pub fn parse(input: &str) -> TypeResult<Self> {
        let trimmed = input.trim().trim_start_matches('{').trim_end_matches('}');
        uuid::Uuid::parse_str(trimmed)
            .map(Self)
            .map_err(|e| TypeError::InvalidGuid {
                input: input.to_string(),
                reason: e.to_string(),
            })
    }

    /// Returns `true` for the all-zero GUID.
    pub fn is_empty(&self) -> bool {
        self.0.is_nil()
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &uuid::Uuid {
        &self.0
    }
}

impl FromStr for Guid {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({})", self.0)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_disk_layout_swaps_leading_fields() {
        let guid = Guid::parse("00112233-4455-6677-8899-aabbccddeeff").unwrap();
        assert_eq!(
            guid.to_bytes_le(),
            [0x33, 0x22, 0x11, 0x00, 0x55, 0x44, 0x77, 0x66, 0x88, 0x99, 0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]
        );
        assert_eq!(Guid::from_bytes_le(guid.to_bytes_le()), guid);
    }

    #[test]
    fn parse_accepts_braces() {
        let a = Guid::parse("{00112233-4455-6677-8899-AABBCCDDEEFF}").unwrap();
        let b: Guid = "00112233-4455-6677-8899-aabbccddeeff".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(b.to_string(), "00112233-4455-6677-8899-aabbccddeeff");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(matches!(
            Guid::parse("not-a-guid"),
            Err(TypeError::InvalidGuid { .. })
        ));
    }

    #[test]
    fn empty_and_new() {
        assert!(Guid::EMPTY.is_empty());
        assert!(Guid::default().is_empty());
        assert!(!Guid::new().is_empty());
        assert_ne!(Guid::new(), Guid::new());
    }
}
