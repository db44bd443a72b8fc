//! Generic value codec.
//!
//! The default path for every type without a specialized codec: resolves
//! sizes according to the column's varint class, reads fixed and blob
//! payloads, converts charsets, pads fixed-width character/binary values,
//! and hands streamed large objects to the chunked path.

use bytes::Bytes;
use chrono::{NaiveDate, Timelike};
use tracing::trace;

use crate::codec::CodecContext;
use crate::collation::{CharConverter, Collation, COLLATION_WIRE_LEN};
use crate::column::{Column, Value};
use crate::error::{CodecError, Result};
use crate::types::{TypeId, VarintSize};
use crate::varmax;
use crate::wire::{read_ucs2, WireRead, WireWrite};

/// Sentinel size for columns whose total length is unknown up front.
pub(crate) const SIZE_UNKNOWN: i32 = 0x7FFF_FFFF;

/// Size reported when a 2-byte length field announces a MAX type.
pub(crate) const SIZE_MAX_TYPE: i32 = 0x3FFF_FFFF;

/// Marker value introducing a text pointer in the legacy LOB layout.
const TEXTPTR_MARKER: u8 = 16;

/// Read a column's size/collation/table-name metadata.
pub(crate) fn describe<S: WireRead + ?Sized>(
    ctx: &CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    match col.varint {
        VarintSize::Plp => col.size = SIZE_UNKNOWN,
        VarintSize::Int | VarintSize::LongBlob => col.size = src.read_i32()?,
        VarintSize::Word => {
            col.size = i32::from(src.read_i16()?);
            // A negative 2-byte size under TDS 7.2+ declares a MAX type:
            // values stream in chunks from here on.
            if col.size < 0 && ctx.version.is_tds_72_plus() {
                col.size = SIZE_MAX_TYPE;
                col.varint = VarintSize::Plp;
            }
        }
        VarintSize::Byte => col.size = i32::from(src.read_u8()?),
        VarintSize::Fixed => col.size = col.ty.fixed_size(),
    }
    col.server_size = col.size;

    if ctx.version.is_tds_71_plus() && col.wire_type.is_collate_type() {
        let raw = src.read_bytes(COLLATION_WIRE_LEN)?;
        let mut tag = [0u8; COLLATION_WIRE_LEN];
        tag.copy_from_slice(&raw);
        let collation = Collation::from_bytes(tag);
        col.collation = Some(collation);
        col.converter = Some(CharConverter::from_collation(
            collation,
            col.wire_type.is_unicode_type(),
        ));
    }

    if col.wire_type.is_blob_type() {
        // Blob columns carry the source table name; TDS 7.2+ splits it
        // into counted parts.
        if ctx.version.is_tds_72_plus() {
            let num_parts = src.read_u8()?;
            for _ in 0..num_parts {
                let chars = i32::from(src.read_i16()?).max(0) as usize;
                col.table_name = Some(read_ucs2(src, chars)?);
            }
        } else {
            let chars = i32::from(src.read_i16()?).max(0) as usize;
            col.table_name = Some(read_ucs2(src, chars)?);
        }
    } else if ctx.version.is_tds_72_plus() && col.wire_type == TypeId::Xml {
        // Optional schema triple: database, owner, collection. Discarded.
        if src.read_u8()? != 0 {
            let chars = src.read_u8()? as usize;
            read_ucs2(src, chars)?;
            let chars = src.read_u8()? as usize;
            read_ucs2(src, chars)?;
            let chars = i32::from(src.read_i16()?).max(0) as usize;
            read_ucs2(src, chars)?;
        }
    }
    Ok(())
}

/// Decode one value occurrence.
pub(crate) fn decode<S: WireRead + ?Sized>(
    ctx: &mut CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    trace!(ty = ?col.ty, class = col.varint.class(), "decoding value");

    let wire_size: i32 = match col.varint {
        VarintSize::Int => {
            if col.ty == TypeId::LongBinary {
                // Long binary stores a plain 4-byte length.
                src.read_i32()?
            } else {
                // Legacy LOB: a text pointer precedes present values.
                let marker = src.read_u8()?;
                if marker == TEXTPTR_MARKER {
                    src.read_bytes(16)?; // text pointer
                    src.read_bytes(8)?; // timestamp
                    src.read_i32()?
                } else {
                    -1
                }
            }
        }
        VarintSize::LongBlob => {
            let size = src.read_i32()?;
            if size == 0 { -1 } else { size }
        }
        VarintSize::Plp => return varmax::decode(ctx, src, col),
        VarintSize::Word => i32::from(src.read_i16()?),
        VarintSize::Byte => {
            let size = i32::from(src.read_u8()?);
            if size == 0 { -1 } else { size }
        }
        VarintSize::Fixed => col.ty.fixed_size(),
    };

    if src.is_dead() {
        return Err(CodecError::ConnectionDead);
    }
    trace!(wire_size, "wire value size");

    if wire_size < 0 {
        col.cur_size = -1;
        col.value = Value::Null;
        return Ok(());
    }

    if col.is_blob() {
        // Blobs never reuse a fixed buffer: the declared maximum is 2 GB,
        // so storage is sized per value.
        if wire_size == 0 {
            col.cur_size = 0;
            col.value = Value::Bytes(Bytes::new());
            return Ok(());
        }
        let raw = src.read_bytes(wire_size as usize)?;
        if let Some(conv) = &col.converter {
            let text = conv.decode(&raw);
            col.cur_size = text.len() as i32;
            col.value = Value::Str(text);
        } else {
            col.cur_size = wire_size;
            col.value = Value::Bytes(raw);
        }
        return Ok(());
    }

    if let Some(conv) = &col.converter {
        let text = if wire_size == 0 {
            String::new()
        } else {
            let raw = src.read_bytes(wire_size as usize)?;
            conv.decode(&raw)
        };
        col.cur_size = text.len() as i32;
        col.value = Value::Str(text);
        pad_fixed_width(col, wire_size);
        return Ok(());
    }

    // Some servers send more bytes than the declared fixed size (seen
    // with nullable integers); read the declared amount and drain the
    // excess rather than overflowing the destination.
    let mut take = wire_size;
    let mut discard = 0;
    if wire_size > col.size {
        discard = wire_size - col.size;
        take = col.size;
    }
    let raw = src.read_bytes(take.max(0) as usize)?;
    if discard > 0 {
        src.read_bytes(discard as usize)?;
    }
    col.cur_size = take;
    col.value = Value::Bytes(raw);
    pad_fixed_width(col, take);
    Ok(())
}

/// Right-pad fixed-width character and binary values out to the declared
/// size: spaces for character data, zero bytes for binary.
fn pad_fixed_width(col: &mut Column, decoded_size: i32) {
    let char_fill = col.ty == TypeId::Char && col.size == col.server_size;
    let binary_fill = col.ty == TypeId::Binary;
    if !(char_fill || binary_fill) {
        return;
    }
    if decoded_size >= col.size {
        return;
    }
    let missing = (col.size - decoded_size) as usize;
    match &mut col.value {
        Value::Bytes(bytes) => {
            let fill = if char_fill { b' ' } else { 0u8 };
            let mut buf = Vec::with_capacity(bytes.len() + missing);
            buf.extend_from_slice(bytes);
            buf.resize(buf.len() + missing, fill);
            *bytes = Bytes::from(buf);
        }
        Value::Str(s) => {
            for _ in 0..missing {
                s.push(' ');
            }
        }
        _ => return,
    }
    col.cur_size = col.size;
}

/// Compute the size to declare on the wire for an outgoing column.
///
/// Starts from the server-negotiated size when known, else the client's
/// logical size (doubled for wide types), then clamps to the varint
/// class's protocol maximum.
pub(crate) fn fix_column_size(_ctx: &CodecContext, col: &Column) -> i32 {
    let mut size = col.server_size;
    if size == 0 {
        size = col.size;
        if col.wire_type.is_unicode_type() {
            size *= 2;
        }
    }
    match col.varint {
        VarintSize::Fixed | VarintSize::LongBlob | VarintSize::Plp => size,
        VarintSize::Byte => size.clamp(1, 255),
        VarintSize::Word => {
            let min = if matches!(col.wire_type, TypeId::NVarChar | TypeId::NChar) {
                2
            } else {
                1
            };
            size.clamp(min, 8000)
        }
        VarintSize::Int => {
            if col.wire_type == TypeId::NText {
                size.clamp(2, 0x7FFF_FFFE)
            } else {
                size.clamp(1, 0x7FFF_FFFF)
            }
        }
    }
}

/// Write the size (and collation) prefix for an outgoing parameter.
pub(crate) fn encode_describe<W: WireWrite + ?Sized>(
    ctx: &CodecContext,
    dst: &mut W,
    col: &mut Column,
) -> Result<()> {
    let size = fix_column_size(ctx, col);
    match col.varint {
        VarintSize::Fixed => {}
        VarintSize::Byte => dst.write_u8(size as u8),
        VarintSize::Word => dst.write_i16(size as i16),
        VarintSize::Int | VarintSize::LongBlob => dst.write_i32(size),
        // MAX types declare the 0xFFFF sentinel.
        VarintSize::Plp => dst.write_i16(-1),
    }
    if ctx.version.is_tds_71_plus() && col.wire_type.is_collate_type() {
        dst.write_bytes(&ctx.collation.to_bytes());
    }
    Ok(())
}

/// Write an outgoing parameter's value bytes.
pub(crate) fn encode<W: WireWrite + ?Sized>(
    ctx: &CodecContext,
    dst: &mut W,
    col: &mut Column,
) -> Result<()> {
    if col.value.is_null() {
        trace!(ty = ?col.ty, "encoding null parameter");
        match col.varint {
            VarintSize::LongBlob => dst.write_i32(0),
            VarintSize::Int => dst.write_i32(-1),
            VarintSize::Word => dst.write_i16(-1),
            VarintSize::Plp => dst.write_i64(-1),
            _ => dst.write_u8(0),
        }
        return Ok(());
    }

    if !ctx.version.is_tds_7_plus() {
        return Err(CodecError::NotImplemented(
            "parameter encoding for pre-7.0 protocol versions",
        ));
    }

    let mut wire_size = col.cur_size;
    let size = fix_column_size(ctx, col);

    // Charset conversion happens before the length is written: the wire
    // carries converted bytes, so the declared length must match them.
    let converted: Option<Vec<u8>> = match (&col.converter, &col.value) {
        (Some(conv), Value::Str(s)) if !s.is_empty() => {
            let bytes = conv.to_wire(s);
            wire_size = bytes.len() as i32;
            Some(bytes)
        }
        _ => None,
    };

    trace!(ty = ?col.ty, wire_size, "encoding parameter");
    match col.varint {
        VarintSize::Plp => {
            // Total size, then a single chunk of the same length.
            dst.write_i64(i64::from(wire_size));
            dst.write_i32(wire_size);
        }
        VarintSize::Int => {
            wire_size = wire_size.min(size);
            dst.write_i32(wire_size);
        }
        VarintSize::Word => {
            wire_size = wire_size.min(size);
            dst.write_i16(wire_size as i16);
        }
        VarintSize::Byte => {
            wire_size = wire_size.min(size);
            dst.write_u8(wire_size as u8);
        }
        VarintSize::Fixed => wire_size = col.wire_type.fixed_size(),
        VarintSize::LongBlob => {
            return Err(CodecError::NotImplemented("long binary parameters"));
        }
    }

    encode_payload(dst, col, wire_size, converted.as_deref())?;

    // Terminate the chunk stream for MAX types.
    if col.varint == VarintSize::Plp && wire_size != 0 {
        dst.write_i32(0);
    }
    Ok(())
}

/// Type-specific payload emission. Anything not enumerated here is a
/// hard not-implemented failure, never a silent no-op.
fn encode_payload<W: WireWrite + ?Sized>(
    dst: &mut W,
    col: &Column,
    wire_size: i32,
    converted: Option<&[u8]>,
) -> Result<()> {
    match col.wire_type {
        TypeId::IntN => {
            let Value::Int(v) = col.value else {
                return Err(CodecError::TypeMismatch {
                    expected: "nullable integer",
                });
            };
            match wire_size {
                4 => dst.write_i32(v as i32),
                8 => dst.write_i64(v),
                _ => {
                    return Err(CodecError::NotImplemented(
                        "nullable integers other than 4 or 8 bytes",
                    ));
                }
            }
        }
        TypeId::NVarChar | TypeId::NChar => match (converted, &col.value) {
            (Some(bytes), _) => dst.write_bytes(bytes),
            (None, Value::Str(s)) => dst.write_bytes(&CharConverter::Wide.to_wire(s)),
            (None, Value::Bytes(b)) => dst.write_bytes(b),
            _ => {
                return Err(CodecError::TypeMismatch {
                    expected: "unicode character data",
                });
            }
        },
        TypeId::BigVarBinary | TypeId::BigBinary => {
            let Value::Bytes(b) = &col.value else {
                return Err(CodecError::TypeMismatch {
                    expected: "binary data",
                });
            };
            dst.write_bytes(b);
        }
        TypeId::DateTime | TypeId::DateTimeN => {
            let Value::DateTime(dt) = &col.value else {
                return Err(CodecError::TypeMismatch {
                    expected: "datetime value",
                });
            };
            let (days, ticks) = legacy_datetime_parts(dt);
            dst.write_i32(days);
            dst.write_i32(ticks);
        }
        _ => {
            return Err(CodecError::NotImplemented(
                "parameter encoding for this wire type",
            ));
        }
    }
    Ok(())
}

/// Split a datetime into the legacy 8-byte wire parts: days since
/// 1900-01-01 and 1/300-second ticks since midnight.
fn legacy_datetime_parts(dt: &chrono::NaiveDateTime) -> (i32, i32) {
    let days = (dt.date() - epoch_1900()).num_days() as i32;
    let seconds = i64::from(dt.time().num_seconds_from_midnight());
    let subsec_300ths = i64::from(dt.time().nanosecond()) * 3 / 10_000_000;
    let ticks = (seconds * 300 + subsec_300ths) as i32;
    (days, ticks)
}

pub(crate) fn epoch_1900() -> NaiveDate {
    // 1900-01-01 is always a valid date.
    NaiveDate::from_ymd_opt(1900, 1, 1).unwrap_or_default()
}
