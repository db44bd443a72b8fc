//! Codec for the compact date/time types (SQL Server 2008+).
//!
//! DATE, TIME, DATETIME2, and DATETIMEOFFSET pack their wire values from
//! up to three little-endian parts: sub-day time (5 bytes, absent for
//! DATE), days since the epoch (3 bytes, absent for TIME), and a UTC
//! offset in minutes (2 bytes, DATETIMEOFFSET only), sent as a 1-byte
//! length-prefixed blob.
//!
//! The wire-to-value direction is not implemented yet; it fails with the
//! not-implemented class rather than returning zeroed data, so callers
//! can tell the gap apart from a corrupted stream.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::codec::CodecContext;
use crate::column::{Column, Value};
use crate::data::epoch_1900;
use crate::error::{CodecError, Result};
use crate::types::TypeId;
use crate::wire::{WireRead, WireWrite};

/// Highest fractional-second precision the wire format can express.
const MAX_FRACTIONAL_PRECISION: u8 = 7;

/// Width of the canonical packed date-time-with-offset record; declared
/// and on-wire sizes are fixed to it at describe time.
const DATETIME_ALL_LEN: i32 = 16;

/// 100-nanosecond units per second, the resolution at precision 7.
const TICKS_PER_SECOND: u64 = 10_000_000;

/// Read the fractional precision byte and fix the column's sizes.
pub(crate) fn describe<S: WireRead + ?Sized>(
    _ctx: &CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    col.precision = 0;
    col.scale = 0;
    if col.wire_type != TypeId::Date {
        let precision = src.read_u8()?;
        if precision > MAX_FRACTIONAL_PRECISION {
            return Err(CodecError::PrecisionOutOfRange { precision });
        }
        col.precision = precision;
        col.scale = precision;
    }
    col.size = DATETIME_ALL_LEN;
    col.server_size = DATETIME_ALL_LEN;
    Ok(())
}

/// Wire decode for this family is a known gap.
pub(crate) fn decode<S: WireRead + ?Sized>(
    _ctx: &mut CodecContext,
    _src: &mut S,
    _col: &mut Column,
) -> Result<()> {
    Err(CodecError::NotImplemented("date/time wire decode"))
}

/// Write the precision byte for an outgoing parameter.
pub(crate) fn encode_describe<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    dst: &mut W,
    col: &mut Column,
) -> Result<()> {
    if col.wire_type != TypeId::Date {
        dst.write_u8(MAX_FRACTIONAL_PRECISION);
    }
    Ok(())
}

/// Write an outgoing date/time parameter as a length-prefixed blob.
pub(crate) fn encode<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    dst: &mut W,
    col: &mut Column,
) -> Result<()> {
    if col.value.is_null() {
        dst.write_u8(0);
        return Ok(());
    }

    let (date, time, offset_minutes) = split_value(col)?;

    let mut packed = [0u8; 10];
    let mut len = 0usize;
    if col.wire_type != TypeId::Date {
        let time = time.ok_or(CodecError::TypeMismatch {
            expected: "value with a time component",
        })?;
        let ticks = u64::from(time.num_seconds_from_midnight()) * TICKS_PER_SECOND
            + u64::from(time.nanosecond()) / 100;
        packed[..5].copy_from_slice(&ticks.to_le_bytes()[..5]);
        len += 5;
    }
    if col.wire_type != TypeId::Time {
        let date = date.ok_or(CodecError::TypeMismatch {
            expected: "value with a date component",
        })?;
        let days = (date - epoch_1900()).num_days() as i32;
        packed[len..len + 3].copy_from_slice(&days.to_le_bytes()[..3]);
        len += 3;
    }
    if col.wire_type == TypeId::DateTimeOffset {
        packed[len..len + 2].copy_from_slice(&offset_minutes.to_le_bytes());
        len += 2;
    }

    dst.write_u8(len as u8);
    dst.write_bytes(&packed[..len]);
    Ok(())
}

/// Pull the date/time parts the column's variant needs out of the bound
/// value.
fn split_value(col: &Column) -> Result<(Option<NaiveDate>, Option<NaiveTime>, i16)> {
    match (&col.value, col.wire_type) {
        (Value::Date(d), TypeId::Date) => Ok((Some(*d), None, 0)),
        (Value::Time(t), TypeId::Time) => Ok((None, Some(*t), 0)),
        (Value::DateTime(dt), TypeId::DateTime2) => Ok((Some(dt.date()), Some(dt.time()), 0)),
        (Value::DateTimeOffset(dto), TypeId::DateTimeOffset) => {
            let local: NaiveDateTime = dto.naive_local();
            let minutes = (dto.offset().local_minus_utc() / 60) as i16;
            Ok((Some(local.date()), Some(local.time()), minutes))
        }
        // A plain datetime bound to a variant with fewer parts is fine.
        (Value::DateTime(dt), TypeId::Date) => Ok((Some(dt.date()), None, 0)),
        (Value::DateTime(dt), TypeId::Time) => Ok((None, Some(dt.time()), 0)),
        _ => Err(CodecError::TypeMismatch {
            expected: "date/time value matching the column variant",
        }),
    }
}
