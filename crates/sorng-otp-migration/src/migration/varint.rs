//! Unsigned base-128 varints.
//!
//! Seven bits per byte, least-significant group first, high bit set on
//! every byte except the last.

use crate::migration::types::*;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

/// Append the varint encoding of `value` to `buf`.
pub fn write_varint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Encode `value` as a fresh byte vector.
pub fn encode_varint(value: u64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(varint_len(value));
    write_varint(&mut buf, value);
    buf
}

/// Number of bytes `value` occupies on the wire.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    (bits + 6) / 7
}

/// Read a varint starting at `offset`, returning the value and the offset of
/// the byte after it.
///
/// Reads at most [`MAX_VARINT_LEN`] bytes; a tenth byte may only carry the
/// single remaining bit of a `u64`.
pub fn decode_varint(data: &[u8], offset: usize) -> Result<(u64, usize), MigrationError> {
    let mut result: u64 = 0;
    let mut pos = offset;
    for i in 0..MAX_VARINT_LEN {
        let byte = match data.get(pos) {
            Some(&b) => b,
            None => {
                return Err(MigrationError::new(
                    MigrationErrorKind::TruncatedVarint,
                    "Buffer ended inside a varint",
                )
                .with_detail(format!("offset {}", offset)))
            }
        };
        pos += 1;
        if i == MAX_VARINT_LEN - 1 && byte > 0x01 {
            return Err(MigrationError::new(
                MigrationErrorKind::TruncatedVarint,
                "Varint exceeds 64 bits",
            )
            .with_detail(format!("offset {}", offset)));
        }
        result |= ((byte & 0x7F) as u64) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((result, pos));
        }
    }
    // The tenth byte always terminates or errors above.
    Err(MigrationError::new(
        MigrationErrorKind::TruncatedVarint,
        "Varint longer than 10 bytes",
    ))
}
