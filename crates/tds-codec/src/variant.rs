//! SQL_VARIANT codec (TDS 7+).
//!
//! A variant value travels as a 4-byte total length (0 ⟺ NULL), a 1-byte
//! base type, a 1-byte properties length, the base type's properties
//! (collation, max length, or precision/scale depending on the base
//! type), and the raw value bytes. The properties are bounds-checked and
//! discarded; the payload is surfaced as opaque bytes, with base-type
//! interpretation left to the caller.
//!
//! Variants cannot be sent as parameters; the write path is gated.

use tracing::trace;

use crate::codec::CodecContext;
use crate::column::{Column, Value};
use crate::error::{CodecError, Result};
use crate::wire::{WireRead, WireWrite};

/// Read variant metadata: the declared maximum length.
pub(crate) fn describe<S: WireRead + ?Sized>(
    _ctx: &CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    col.size = src.read_i32()?;
    col.server_size = col.size;
    Ok(())
}

/// Decode one variant occurrence.
pub(crate) fn decode<S: WireRead + ?Sized>(
    _ctx: &mut CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    let total = src.read_i32()?;
    if total <= 0 {
        col.cur_size = -1;
        col.value = Value::Null;
        return Ok(());
    }

    let base_type = src.read_u8()?;
    let prop_len = i32::from(src.read_u8()?);
    if prop_len + 2 > total {
        return Err(CodecError::InvalidLength("sql_variant header"));
    }
    if prop_len > 0 {
        src.read_bytes(prop_len as usize)?;
    }
    let payload_len = total - 2 - prop_len;
    trace!(base_type, payload_len, "variant value");

    let raw = src.read_bytes(payload_len as usize)?;
    col.cur_size = payload_len;
    col.value = Value::Bytes(raw);
    Ok(())
}

/// Variant parameters are not supported on the write path.
pub(crate) fn encode_describe<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    _dst: &mut W,
    _col: &mut Column,
) -> Result<()> {
    Err(CodecError::NotImplemented("sql_variant parameter metadata"))
}

/// Variant parameters are not supported on the write path.
pub(crate) fn encode<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    _dst: &mut W,
    _col: &mut Column,
) -> Result<()> {
    Err(CodecError::NotImplemented("sql_variant parameter encoding"))
}
