//! Fixed-width big-endian pack/unpack over a `[FieldType]` format descriptor,
//! per §4.1. Mirrors the original encoder's field set but replaces its
//! `any`-typed values with a closed `FieldValue` enum — there is no runtime
//! type assertion to fail in Rust.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    I8,
    U8,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
}

impl FieldType {
    const fn size(self) -> usize {
        match self {
            FieldType::I8 | FieldType::U8 => 1,
            FieldType::I16 | FieldType::U16 => 2,
            FieldType::I32 | FieldType::U32 => 4,
            FieldType::I64 | FieldType::U64 => 8,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    I8(i8),
    U8(u8),
    I16(i16),
    U16(u16),
    I32(i32),
    U32(u32),
    I64(i64),
    U64(u64),
}

impl FieldValue {
    fn field_type(self) -> FieldType {
        match self {
            FieldValue::I8(_) => FieldType::I8,
            FieldValue::U8(_) => FieldType::U8,
            FieldValue::I16(_) => FieldType::I16,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::I32(_) => FieldType::I32,
            FieldValue::U32(_) => FieldType::U32,
            FieldValue::I64(_) => FieldType::I64,
            FieldValue::U64(_) => FieldType::U64,
        }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    #[error("format and values length mismatch")]
    FormatMismatch,
    #[error("not enough data to unpack")]
    Truncated,
}

fn estimated_size(format: &[FieldType]) -> usize {
    format.iter().map(|f| f.size()).sum()
}

/// `len(format) != len(values)` or a value's declared type doesn't match its
/// slot's `FieldType` both count as `FormatMismatch`.
pub fn pack(format: &[FieldType], values: &[FieldValue]) -> Result<Vec<u8>, CodecError> {
    if format.len() != values.len() {
        return Err(CodecError::FormatMismatch);
    }
    let mut buf = Vec::with_capacity(estimated_size(format));
    for (&field, &value) in format.iter().zip(values) {
        if value.field_type() != field {
            return Err(CodecError::FormatMismatch);
        }
        match value {
            FieldValue::I8(v) => buf.push(v as u8),
            FieldValue::U8(v) => buf.push(v),
            FieldValue::I16(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::U16(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::I32(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::U32(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::I64(v) => buf.extend_from_slice(&v.to_be_bytes()),
            FieldValue::U64(v) => buf.extend_from_slice(&v.to_be_bytes()),
        }
    }
    Ok(buf)
}

/// Succeeds on a buffer longer than the format requires, ignoring trailing
/// bytes — the move-piece decoder relies on this to read a game id appended
/// after the three `i8` fields.
pub fn unpack(data: &[u8], format: &[FieldType]) -> Result<Vec<FieldValue>, CodecError> {
    let mut values = Vec::with_capacity(format.len());
    let mut offset = 0usize;
    for &field in format {
        let size = field.size();
        if offset + size > data.len() {
            return Err(CodecError::Truncated);
        }
        let chunk = &data[offset..offset + size];
        let value = match field {
            FieldType::I8 => FieldValue::I8(chunk[0] as i8),
            FieldType::U8 => FieldValue::U8(chunk[0]),
            FieldType::I16 => FieldValue::I16(i16::from_be_bytes(chunk.try_into().unwrap())),
            FieldType::U16 => FieldValue::U16(u16::from_be_bytes(chunk.try_into().unwrap())),
            FieldType::I32 => FieldValue::I32(i32::from_be_bytes(chunk.try_into().unwrap())),
            FieldType::U32 => FieldValue::U32(u32::from_be_bytes(chunk.try_into().unwrap())),
            FieldType::I64 => FieldValue::I64(i64::from_be_bytes(chunk.try_into().unwrap())),
            FieldType::U64 => FieldValue::U64(u64::from_be_bytes(chunk.try_into().unwrap())),
        };
        values.push(value);
        offset += size;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pack_unpack_round_trips_move_piece_format() {
        let format = [FieldType::I8, FieldType::I8, FieldType::I8, FieldType::U32];
        let values = [
            FieldValue::I8(12),
            FieldValue::I8(28),
            FieldValue::I8(0),
            FieldValue::U32(1),
        ];
        let bytes = pack(&format, &values).unwrap();
        assert_eq!(bytes.len(), 7);
        assert_eq!(unpack(&bytes, &format).unwrap(), values);
    }

    #[test]
    fn pack_rejects_length_mismatch() {
        let format = [FieldType::I8, FieldType::I8];
        let values = [FieldValue::I8(1)];
        assert_eq!(pack(&format, &values), Err(CodecError::FormatMismatch));
    }

    #[test]
    fn unpack_rejects_truncated_buffer() {
        let format = [FieldType::U32];
        assert_eq!(unpack(&[0, 1], &format), Err(CodecError::Truncated));
    }

    #[test]
    fn unpack_ignores_trailing_bytes() {
        let format = [FieldType::I8, FieldType::I8, FieldType::I8];
        let data = [1u8, 2, 3, 0, 0, 0, 99];
        let values = unpack(&data, &format).unwrap();
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn big_endian_byte_order_is_bit_exact() {
        let format = [FieldType::U32];
        let values = [FieldValue::U32(0x01020304)];
        assert_eq!(pack(&format, &values).unwrap(), vec![0x01, 0x02, 0x03, 0x04]);
    }
}
