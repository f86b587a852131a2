//! Tagged fields of the protobuf wire subset used by migration payloads.
//!
//! A field is `tag || value` where `tag = (field_number << 3) | wire_type`.
//! Varint fields carry one varint; length-delimited fields carry a length
//! varint followed by exactly that many bytes. Fixed-width and group wire
//! types never appear in a migration payload and are rejected.

use crate::migration::types::*;
use crate::migration::varint::{decode_varint, write_varint};

/// Largest field number protobuf allows (2^29 - 1).
pub const MAX_FIELD_NUMBER: u32 = (1 << 29) - 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Encode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn write_tag(buf: &mut Vec<u8>, field_number: u32, wire_type: WireType) {
    write_varint(buf, ((field_number as u64) << 3) | wire_type.tag_bits());
}

/// Append one field to `buf`.
pub fn write_field(buf: &mut Vec<u8>, field_number: u32, value: &WireValue<'_>) {
    write_tag(buf, field_number, value.wire_type());
    match value {
        WireValue::Varint(v) => write_varint(buf, *v),
        WireValue::Bytes(b) => {
            write_varint(buf, b.len() as u64);
            buf.extend_from_slice(b);
        }
    }
}

/// Encode one field as a fresh byte vector.
pub fn encode_field(field_number: u32, value: &WireValue<'_>) -> Vec<u8> {
    let mut buf = Vec::new();
    write_field(&mut buf, field_number, value);
    buf
}

/// Builder for a message body.
#[derive(Debug, Clone, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
}

impl FieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn varint(&mut self, field_number: u32, value: u64) -> &mut Self {
        write_field(&mut self.buf, field_number, &WireValue::Varint(value));
        self
    }

    pub fn bytes(&mut self, field_number: u32, value: &[u8]) -> &mut Self {
        write_field(&mut self.buf, field_number, &WireValue::Bytes(value));
        self
    }

    pub fn string(&mut self, field_number: u32, value: &str) -> &mut Self {
        self.bytes(field_number, value.as_bytes())
    }

    /// Embed another message as a length-delimited field.
    pub fn message(&mut self, field_number: u32, message: &FieldWriter) -> &mut Self {
        self.bytes(field_number, &message.buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  Decode
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Read the field starting at `offset`, returning it and the offset of the
/// next field.
pub fn decode_next(data: &[u8], offset: usize) -> Result<(WireField<'_>, usize), MigrationError> {
    let (tag, pos) = decode_varint(data, offset)?;

    let wire_bits = tag & 0x07;
    let wire_type = WireType::from_tag_bits(wire_bits).ok_or_else(|| {
        MigrationError::new(
            MigrationErrorKind::UnsupportedWireType,
            format!("Unsupported wire type {}", wire_bits),
        )
        .with_detail(format!("offset {}", offset))
    })?;

    let field_number = match u32::try_from(tag >> 3) {
        Ok(n) if (1..=MAX_FIELD_NUMBER).contains(&n) => n,
        _ => {
            return Err(MigrationError::new(
                MigrationErrorKind::InvalidFieldNumber,
                format!("Invalid field number {}", tag >> 3),
            )
            .with_detail(format!("offset {}", offset)))
        }
    };

    match wire_type {
        WireType::Varint => {
            let (v, next) = decode_varint(data, pos)?;
            Ok((
                WireField {
                    field_number,
                    value: WireValue::Varint(v),
                },
                next,
            ))
        }
        WireType::LengthDelimited => {
            let (len, start) = decode_varint(data, pos)?;
            let remaining = data.len() - start;
            let len = match usize::try_from(len) {
                Ok(l) if l <= remaining => l,
                _ => {
                    return Err(MigrationError::new(
                        MigrationErrorKind::TruncatedField,
                        format!("Field {} is truncated", field_number),
                    )
                    .with_detail(format!("declared {} bytes, {} remain", len, remaining)))
                }
            };
            let end = start + len;
            Ok((
                WireField {
                    field_number,
                    value: WireValue::Bytes(&data[start..end]),
                },
                end,
            ))
        }
    }
}

/// Cursor over the fields of one message body.
///
/// Yields each field once, in order. After the first error the reader is
/// exhausted.
#[derive(Debug, Clone)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
    failed: bool,
}

impl<'a> FieldReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            failed: false,
        }
    }

    /// Offset of the next unread byte.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for FieldReader<'a> {
    type Item = Result<WireField<'a>, MigrationError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.pos >= self.data.len() {
            return None;
        }
        match decode_next(self.data, self.pos) {
            Ok((field, next)) => {
                self.pos = next;
                Some(Ok(field))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for FieldReader<'_> {}
