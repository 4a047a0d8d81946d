//! Binary codec for local workspace metadata tables.
//!
//! Every metadata table is a flat little-endian stream: fixed-width
//! integers, single-byte booleans, raw byte runs, and strings encoded as
//! UTF-16LE with a 7-bit variable-length byte-count prefix.
//!
//! # Key Types
//!
//! - [`BinaryReader`] -- Pull decoder over any `Read`, with an end-of-stream probe
//! - [`BinaryWriter`] -- Push encoder over any `Write`
//! - [`CodecError`] -- Distinguishes a clean end of stream from a short read

pub mod error;
pub mod length;
pub mod reader;
pub mod writer;

pub use error::{CodecError, CodecResult};
pub use reader::BinaryReader;
pub use writer::BinaryWriter;

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn encode(f: impl FnOnce(&mut BinaryWriter<&mut Vec<u8>>) -> CodecResult<()>) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut BinaryWriter::new(&mut buf)).unwrap();
        buf
    }

    #[test]
    fn mixed_record_roundtrip() {
        let buf = encode(|w| {
            w.write_i16(0x7425)?;
            w.write_u8(2)?;
            w.write_bytes(&[0xAB; 16])?;
            w.write_i32(-7)?;
            w.write_string("$/Project/Ünïcødé.txt")?;
            w.write_bool(true)?;
            w.write_i64(i64::MIN)
        });

        let mut r = BinaryReader::new(buf.as_slice());
        assert_eq!(r.read_i16().unwrap(), 0x7425);
        assert_eq!(r.read_u8().unwrap(), 2);
        assert_eq!(r.read_array::<16>().unwrap(), [0xAB; 16]);
        assert_eq!(r.read_i32().unwrap(), -7);
        assert_eq!(r.read_string().unwrap(), "$/Project/Ünïcødé.txt");
        assert!(r.read_bool().unwrap());
        assert_eq!(r.read_i64().unwrap(), i64::MIN);
        assert!(r.is_eof().unwrap());
    }

    #[test]
    fn boundary_string_lengths_roundtrip() {
        // Byte lengths straddling each 7-bit group boundary.
        for bytes in [0usize, 126, 127, 128, 16383, 16384] {
            let chars = bytes / 2;
            let text: String = std::iter::repeat('x').take(chars).collect();
            let buf = encode(|w| w.write_string(&text));
            let mut r = BinaryReader::new(buf.as_slice());
            assert_eq!(r.read_string().unwrap(), text);
            assert!(r.is_eof().unwrap());
        }
    }

    #[test]
    fn odd_declared_lengths_decode_exactly() {
        for declared in [127u32, 16383] {
            let mut buf = Vec::new();
            length::encode_7bit(&mut buf, declared);
            buf.extend(std::iter::repeat(0u8).take(declared as usize));
            buf.push(0x5A);

            let mut r = BinaryReader::new(buf.as_slice());
            assert!(matches!(r.read_string(), Err(CodecError::InvalidString(_))));
            // Never reads past the declared run.
            assert_eq!(r.position(), (length::encoded_len(declared) + declared as usize) as u64);
            assert_eq!(r.read_u8().unwrap(), 0x5A);
        }
    }

    proptest! {
        #[test]
        fn strings_roundtrip(text in "\\PC{0,200}") {
            let buf = encode(|w| w.write_string(&text));
            let mut r = BinaryReader::new(buf.as_slice());
            prop_assert_eq!(r.read_string().unwrap(), text);
            prop_assert!(r.is_eof().unwrap());
        }

        #[test]
        fn integers_roundtrip(a in any::<i16>(), b in any::<i32>(), c in any::<i64>(), d in any::<u32>()) {
            let buf = encode(|w| {
                w.write_i16(a)?;
                w.write_i32(b)?;
                w.write_i64(c)?;
                w.write_u32(d)
            });
            prop_assert_eq!(buf.len(), 2 + 4 + 8 + 4);
            let mut r = BinaryReader::new(buf.as_slice());
            prop_assert_eq!(r.read_i16().unwrap(), a);
            prop_assert_eq!(r.read_i32().unwrap(), b);
            prop_assert_eq!(r.read_i64().unwrap(), c);
            prop_assert_eq!(r.read_u32().unwrap(), d);
        }
    }
}
