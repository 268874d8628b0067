//! Variable-length integer encoding utilities.
//!
//! Compressed integers (`c32`/`c64` in the stream layer) are little-endian
//! base-128 groups with the high bit set on every byte except the last.

use crate::error::{IndexError, Result};

/// Maximum number of bytes a `u32` can occupy once encoded.
pub const MAX_C32_BYTES: usize = 5;

/// Maximum number of bytes a `u64` can occupy once encoded.
pub const MAX_C64_BYTES: usize = 10;

/// Append the encoded form of `value` to `buf`.
pub fn encode_into(mut value: u64, buf: &mut Vec<u8>) {
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        buf.push(byte);
        if value == 0 {
            break;
        }
    }
}

/// Encode a u64 value using variable-length encoding.
pub fn encode_u64(value: u64) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(MAX_C64_BYTES);
    encode_into(value, &mut bytes);
    bytes
}

/// Decode a u64 value from variable-length encoding.
///
/// Returns the value and the number of bytes consumed.
pub fn decode_u64(bytes: &[u8]) -> Result<(u64, usize)> {
    let mut result = 0u64;
    let mut shift = 0;

    for (i, &byte) in bytes.iter().enumerate() {
        if shift >= 64 {
            return Err(IndexError::format("VarInt overflow"));
        }
        result |= ((byte & 0x7F) as u64) << shift;
        if (byte & 0x80) == 0 {
            return Ok((result, i + 1));
        }
        shift += 7;
    }

    Err(IndexError::format("Incomplete VarInt"))
}

/// Decode a u32, rejecting values that do not fit.
pub fn decode_u32(bytes: &[u8]) -> Result<(u32, usize)> {
    let (value, read) = decode_u64(bytes)?;
    let value = u32::try_from(value)
        .map_err(|_| IndexError::format(format!("VarInt {value} exceeds u32")))?;
    Ok((value, read))
}

/// Number of bytes `value` occupies once encoded.
pub fn encoded_len(mut value: u64) -> usize {
    let mut len = 1;
    while value >= 0x80 {
        value >>= 7;
        len += 1;
    }
    len
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode_u64() {
        let test_values = [0, 1, 127, 128, 255, 256, 16383, 16384, u64::MAX];

        for &value in &test_values {
            let encoded = encode_u64(value);
            let (decoded, bytes_read) = decode_u64(&encoded).unwrap();

            assert_eq!(value, decoded);
            assert_eq!(encoded.len(), bytes_read);
            assert_eq!(encoded_len(value), encoded.len());
        }
    }

    #[test]
    fn test_encoding_efficiency() {
        assert_eq!(encode_u64(127).len(), 1);
        assert_eq!(encode_u64(128).len(), 2);
        assert!(encode_u64(u64::MAX).len() <= MAX_C64_BYTES);
        assert!(encode_u64(u32::MAX as u64).len() <= MAX_C32_BYTES);
    }

    #[test]
    fn test_incomplete_varint() {
        let incomplete = vec![0x80];
        assert!(decode_u64(&incomplete).is_err());
    }

    #[test]
    fn test_overflow() {
        let overflow_data = vec![0xFF; 20];
        let result = decode_u64(&overflow_data);
        assert!(result.is_err());
    }

    #[test]
    fn test_decode_u32_rejects_wide_values() {
        let encoded = encode_u64(u32::MAX as u64 + 1);
        assert!(decode_u32(&encoded).unwrap_err().is_format_error());
        let (v, _) = decode_u32(&encode_u64(u32::MAX as u64)).unwrap();
        assert_eq!(v, u32::MAX);
    }
}
