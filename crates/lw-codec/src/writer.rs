use std::io::Write;

use crate::error::{CodecError, CodecResult};
use crate::length::{self, MAX_LENGTH};

/// Push encoder for little-endian metadata streams.
pub struct BinaryWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> BinaryWriter<W> {
    /// Wrap a byte sink.
    pub fn new(inner: W) -> Self {
        Self { inner, written: 0 }
    }

    /// Number of bytes written so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.inner.write_all(bytes)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> CodecResult<()> {
        self.write_bytes(&[value])
    }

    pub fn write_bool(&mut self, value: bool) -> CodecResult<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_i16(&mut self, value: i16) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u16(&mut self, value: u16) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i32(&mut self, value: i32) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_u32(&mut self, value: u32) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    pub fn write_i64(&mut self, value: i64) -> CodecResult<()> {
        self.write_bytes(&value.to_le_bytes())
    }

    /// Write a 7-bit encoded length prefix.
    pub fn write_7bit_length(&mut self, value: u32) -> CodecResult<()> {
        let mut buf = Vec::with_capacity(length::MAX_ENCODED_LEN);
        length::encode_7bit(&mut buf, value);
        self.write_bytes(&buf)
    }

    /// Write a string as UTF-16LE preceded by its byte count.
    pub fn write_string(&mut self, value: &str) -> CodecResult<()> {
        let mut payload = Vec::with_capacity(value.len() * 2);
        for unit in value.encode_utf16() {
            payload.extend_from_slice(&unit.to_le_bytes());
        }
        let len = u32::try_from(payload.len())
            .ok()
            .filter(|len| *len <= MAX_LENGTH)
            .ok_or(CodecError::StringTooLong(payload.len()))?;
        self.write_7bit_length(len)?;
        self.write_bytes(&payload)
    }

    pub fn flush(&mut self) -> CodecResult<()> {
        self.inner.flush()?;
        Ok(())
    }

    /// Unwrap the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
