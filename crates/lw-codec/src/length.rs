//! 7-bit variable-length integers used as string length prefixes.
//!
//! Each byte carries seven payload bits, least significant group first.
//! The high bit is set when another byte follows.

use crate::error::{CodecError, CodecResult};

/// Longest legal encoding of a 32-bit length.
pub const MAX_ENCODED_LEN: usize = 5;

/// Largest length a prefix may declare.
pub const MAX_LENGTH: u32 = i32::MAX as u32;

/// Append the 7-bit encoding of `value` to `buf`.
pub fn encode_7bit(buf: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value > 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Number of bytes [`encode_7bit`] produces for `value`.
pub fn encoded_len(value: u32) -> usize {
    let mut len = 1;
    let mut rest = value >> 7;
    while rest > 0 {
        len += 1;
        rest >>= 7;
    }
    len
}

/// Fold one encoded byte into a partially decoded value.
///
/// `index` is the zero-based position of `byte` within the encoding.
/// Returns `Some(value)` once the final byte has been consumed.
pub(crate) fn accumulate(value: &mut u64, index: usize, byte: u8) -> CodecResult<Option<u32>> {
    if index >= MAX_ENCODED_LEN {
        return Err(CodecError::InvalidLength(format!(
            "more than {MAX_ENCODED_LEN} length bytes"
        )));
    }
    *value |= u64::from(byte & 0x7F) << (7 * index);
    if byte & 0x80 != 0 {
        return Ok(None);
    }
    if *value > u64::from(MAX_LENGTH) {
        return Err(CodecError::InvalidLength(format!("{value} exceeds {MAX_LENGTH}")));
    }
    Ok(Some(*value as u32))
}

/// Decode a 7-bit length from the front of `data`. Returns (value, bytes_consumed).
pub fn decode_7bit(data: &[u8]) -> CodecResult<(u32, usize)> {
    let mut value = 0u64;
    for (i, &byte) in data.iter().enumerate() {
        if let Some(decoded) = accumulate(&mut value, i, byte)? {
            return Ok((decoded, i + 1));
        }
    }
    Err(CodecError::ShortRead {
        expected: data.len() + 1,
        actual: data.len(),
    })
}
