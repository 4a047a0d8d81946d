use std::io::{ErrorKind, Read};

use crate::error::{CodecError, CodecResult};
use crate::length;

/// Pull decoder for little-endian metadata streams.
///
/// Two failure modes are kept apart. A value that finds the stream already
/// exhausted fails with [`CodecError::EndOfStream`]; a value that finds only
/// part of its bytes fails with [`CodecError::ShortRead`]. Payloads whose
/// size was declared by an earlier length prefix always report a shortfall
/// as `ShortRead`, even when no bytes at all remain.
pub struct BinaryReader<R> {
    inner: R,
    /// Byte consumed by [`is_eof`](Self::is_eof) and not yet handed out.
    peeked: Option<u8>,
    position: u64,
}

impl<R: Read> BinaryReader<R> {
    /// Wrap a byte source.
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            peeked: None,
            position: 0,
        }
    }

    /// Number of bytes handed out so far.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Probe for end of stream without consuming a value.
    ///
    /// Reads at most one byte and keeps it for the next read.
    pub fn is_eof(&mut self) -> CodecResult<bool> {
        if self.peeked.is_some() {
            return Ok(false);
        }
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) => return Ok(true),
                Ok(_) => {
                    self.peeked = Some(byte[0]);
                    return Ok(false);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Fill as much of `buf` as the stream allows. Returns the count filled.
    fn fill(&mut self, buf: &mut [u8]) -> CodecResult<usize> {
        let mut filled = 0;
        if let (Some(byte), Some(slot)) = (self.peeked, buf.first_mut()) {
            *slot = byte;
            self.peeked = None;
            filled = 1;
        }
        while filled < buf.len() {
            match self.inner.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        self.position += filled as u64;
        Ok(filled)
    }

    fn read_value(&mut self, buf: &mut [u8]) -> CodecResult<()> {
        match self.fill(buf)? {
            n if n == buf.len() => Ok(()),
            0 => Err(CodecError::EndOfStream),
            n => Err(CodecError::ShortRead {
                expected: buf.len(),
                actual: n,
            }),
        }
    }

    fn read_declared(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        let buf = self.read_up_to(len)?;
        if buf.len() == len {
            Ok(buf)
        } else {
            Err(CodecError::ShortRead {
                expected: len,
                actual: buf.len(),
            })
        }
    }

    /// Read up to `len` bytes into a buffer that grows with what arrives,
    /// so a corrupt length never reserves memory the stream cannot back.
    fn read_up_to(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        let mut buf = Vec::new();
        if len == 0 {
            return Ok(buf);
        }
        if let Some(byte) = self.peeked.take() {
            buf.push(byte);
        }
        let remaining = (len - buf.len()) as u64;
        (&mut self.inner).take(remaining).read_to_end(&mut buf)?;
        self.position += buf.len() as u64;
        Ok(buf)
    }

    /// Read a fixed-size byte array.
    pub fn read_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut buf = [0u8; N];
        self.read_value(&mut buf)?;
        Ok(buf)
    }

    pub fn read_u8(&mut self) -> CodecResult<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    /// Any non-zero byte is `true`.
    pub fn read_bool(&mut self) -> CodecResult<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> CodecResult<i16> {
        Ok(i16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16(&mut self) -> CodecResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> CodecResult<i32> {
        Ok(i32::from_le_bytes(self.read_array()?))
    }

    pub fn read_u32(&mut self) -> CodecResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn read_i64(&mut self) -> CodecResult<i64> {
        Ok(i64::from_le_bytes(self.read_array()?))
    }

    /// Read `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        let buf = self.read_up_to(len)?;
        match buf.len() {
            n if n == len => Ok(buf),
            0 => Err(CodecError::EndOfStream),
            n => Err(CodecError::ShortRead {
                expected: len,
                actual: n,
            }),
        }
    }

    /// Read a 7-bit encoded length prefix.
    pub fn read_7bit_length(&mut self) -> CodecResult<u32> {
        let mut value = 0u64;
        let mut index = 0;
        loop {
            let byte = match self.read_u8() {
                Err(CodecError::EndOfStream) if index > 0 => {
                    return Err(CodecError::ShortRead {
                        expected: index + 1,
                        actual: index,
                    })
                }
                other => other?,
            };
            if let Some(decoded) = length::accumulate(&mut value, index, byte)? {
                return Ok(decoded);
            }
            index += 1;
        }
    }

    /// Read a length-prefixed UTF-16LE string.
    ///
    /// The prefix counts bytes, not characters. Exactly that many bytes are
    /// consumed, whether or not they decode.
    pub fn read_string(&mut self) -> CodecResult<String> {
        let len = self.read_7bit_length()? as usize;
        let buf = self.read_declared(len)?;
        if len % 2 != 0 {
            return Err(CodecError::InvalidString(format!(
                "odd UTF-16 byte count {len}"
            )));
        }
        let units: Vec<u16> = buf
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        String::from_utf16(&units).map_err(|e| CodecError::InvalidString(e.to_string()))
    }

    /// Unwrap the underlying reader. A byte held by the EOF probe is lost.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BYTES: [u8; 8] = [0x00, 0x01, 0x02, 0x03, 0xfe, 0xff, 0x7f, 0x80];

    #[test]
    fn int16_is_little_endian() {
        let mut r = BinaryReader::new(&BYTES[..]);
        assert_eq!(r.read_i16().unwrap() as u16, 0x0100);
        assert_eq!(r.read_i16().unwrap() as u16, 0x0302);
        assert_eq!(r.read_i16().unwrap() as u16, 0xfffe);
        assert_eq!(r.read_i16().unwrap() as u16, 0x807f);
        assert!(r.is_eof().unwrap());
    }

    #[test]
    fn int32_and_int64_are_little_endian() {
        let mut r = BinaryReader::new(&BYTES[..]);
        assert_eq!(r.read_u32().unwrap(), 0x0302_0100);
        assert_eq!(r.read_u32().unwrap(), 0x807f_fffe);

        let mut r = BinaryReader::new(&BYTES[..]);
        assert_eq!(r.read_i64().unwrap() as u64, 0x807f_fffe_0302_0100);
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut r = BinaryReader::new(&[][..]);
        assert!(r.is_eof().unwrap());
        assert!(r.read_i32().unwrap_err().is_end_of_stream());
        assert!(r.read_u8().unwrap_err().is_end_of_stream());
    }

    #[test]
    fn partial_value_is_short_read() {
        let mut r = BinaryReader::new(&[0x01, 0x02][..]);
        assert!(matches!(
            r.read_i32(),
            Err(CodecError::ShortRead { expected: 4, actual: 2 })
        ));
    }

    #[test]
    fn declared_payload_shortfall_is_short_read() {
        // Prefix declares 4 bytes, stream ends right after it.
        let mut r = BinaryReader::new(&[0x04][..]);
        assert!(matches!(
            r.read_string(),
            Err(CodecError::ShortRead { expected: 4, actual: 0 })
        ));
    }

    #[test]
    fn oversized_declared_length_reads_only_what_exists() {
        // Prefix declares i32::MAX bytes; only one UTF-16 unit follows.
        let mut r = BinaryReader::new(&[0xFF, 0xFF, 0xFF, 0xFF, 0x07, 0x41, 0x00][..]);
        assert!(matches!(
            r.read_string(),
            Err(CodecError::ShortRead { expected: 0x7FFF_FFFF, actual: 2 })
        ));
        assert_eq!(r.position(), 7);
    }

    #[test]
    fn raw_bytes_keep_the_probed_byte() {
        let mut r = BinaryReader::new(&[0x01, 0x02, 0x03][..]);
        assert!(!r.is_eof().unwrap());
        assert_eq!(r.read_bytes(2).unwrap(), vec![0x01, 0x02]);
        assert!(matches!(
            r.read_bytes(4),
            Err(CodecError::ShortRead { expected: 4, actual: 1 })
        ));
        assert!(matches!(r.read_bytes(1), Err(CodecError::EndOfStream)));
        assert_eq!(r.position(), 3);
    }

    #[test]
    fn eof_probe_does_not_consume() {
        let mut r = BinaryReader::new(&[0x2A, 0x00][..]);
        assert!(!r.is_eof().unwrap());
        assert!(!r.is_eof().unwrap());
        assert_eq!(r.position(), 0);
        assert_eq!(r.read_i16().unwrap(), 0x2A);
        assert_eq!(r.position(), 2);
        assert!(r.is_eof().unwrap());
    }

    #[test]
    fn bool_is_any_nonzero_byte() {
        let mut r = BinaryReader::new(&[0x00, 0x01, 0x7f][..]);
        assert!(!r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
        assert!(r.read_bool().unwrap());
    }

    #[test]
    fn reads_utf16_string() {
        let mut r = BinaryReader::new(&[0x04, 0x48, 0x00, 0x69, 0x00][..]);
        assert_eq!(r.read_string().unwrap(), "Hi");
    }

    #[test]
    fn unpaired_surrogate_is_invalid() {
        let mut r = BinaryReader::new(&[0x02, 0x00, 0xD8][..]);
        assert!(matches!(r.read_string(), Err(CodecError::InvalidString(_))));
    }

    #[test]
    fn truncated_length_prefix_is_short_read() {
        let mut r = BinaryReader::new(&[0x80][..]);
        assert!(matches!(r.read_string(), Err(CodecError::ShortRead { .. })));
    }
}
