//! Fixed-point decimal codec.
//!
//! DECIMAL/NUMERIC values travel as a 1-byte size, a sign byte, and a
//! magnitude of up to 32 bytes. The 7.x family transmits the magnitude
//! little-endian; the canonical in-memory layout keeps it big-endian
//! (which is what the 5.0 family sends natively), so decode byte-swaps
//! under 7.x. A size byte above 33 cannot come from a real server and is
//! treated as stream desynchronization.
//!
//! Only the read direction is implemented; encoding numerics is an
//! explicit not-implemented gate.

use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::codec::CodecContext;
use crate::column::{Column, Value};
use crate::error::{CodecError, Result};
use crate::wire::{WireRead, WireWrite};

/// Maximum bytes (sign + magnitude) a numeric value may occupy on the wire.
pub const NUMERIC_WIRE_MAX: u8 = 33;

/// Width of the canonical in-memory numeric record: precision, scale, and
/// the full 33-byte array. `cur_size` is fixed at this width regardless
/// of how many bytes the wire carried.
pub const NUMERIC_RECORD_LEN: i32 = 35;

/// A decoded fixed-point value: sign+magnitude with explicit precision
/// and scale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numeric {
    /// Total number of significant digits (1..=38).
    pub precision: u8,
    /// Digits to the right of the decimal point (0..=precision).
    pub scale: u8,
    /// Sign byte (non-zero = positive) followed by the big-endian
    /// magnitude, as received from the wire after canonicalization.
    pub array: SmallVec<[u8; NUMERIC_WIRE_MAX as usize]>,
}

impl Numeric {
    /// Whether the value is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.array.first().copied() == Some(0)
    }

    /// The big-endian magnitude bytes, without the sign.
    #[must_use]
    pub fn magnitude(&self) -> &[u8] {
        self.array.get(1..).unwrap_or(&[])
    }

    /// Convert to a [`Decimal`], when the value fits.
    ///
    /// Returns `None` for magnitudes above 96 bits or scales above 28,
    /// the limits of the decimal representation.
    #[must_use]
    pub fn to_decimal(&self) -> Option<Decimal> {
        if self.scale > 28 {
            return None;
        }
        let mag = self.magnitude();
        let significant: &[u8] = {
            let first = mag.iter().position(|&b| b != 0).unwrap_or(mag.len());
            &mag[first..]
        };
        if significant.len() > 12 {
            // 96-bit mantissa limit
            return None;
        }
        let mut value: i128 = 0;
        for &b in significant {
            value = (value << 8) | i128::from(b);
        }
        if self.is_negative() {
            value = -value;
        }
        Some(Decimal::from_i128_with_scale(value, u32::from(self.scale)))
    }
}

/// Read numeric metadata: declared size, precision, scale.
pub(crate) fn describe<S: WireRead + ?Sized>(
    _ctx: &CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    col.size = i32::from(src.read_u8()?);
    col.server_size = col.size;
    col.precision = src.read_u8()?;
    col.scale = src.read_u8()?;
    Ok(())
}

/// Decode one numeric value occurrence.
pub(crate) fn decode<S: WireRead + ?Sized>(
    ctx: &mut CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    let wire_size = src.read_u8()?;
    if wire_size == 0 {
        col.cur_size = -1;
        col.value = Value::Null;
        return Ok(());
    }
    // A real server never sends more than 33 bytes; the stream is
    // desynchronized beyond this bound.
    if wire_size > NUMERIC_WIRE_MAX {
        return Err(CodecError::NumericTooLong { size: wire_size });
    }

    let raw = src.read_bytes(wire_size as usize)?;
    let mut array: SmallVec<[u8; NUMERIC_WIRE_MAX as usize]> = SmallVec::from_slice(&raw);
    if ctx.version.is_tds_7_plus() {
        // 7.x sends the magnitude little-endian; canonicalize.
        array[1..].reverse();
    }

    col.value = Value::Numeric(Numeric {
        precision: col.precision,
        scale: col.scale,
        array,
    });
    col.cur_size = NUMERIC_RECORD_LEN;
    Ok(())
}

/// Numeric parameters are not supported on the write path.
pub(crate) fn encode_describe<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    _dst: &mut W,
    _col: &mut Column,
) -> Result<()> {
    Err(CodecError::NotImplemented("numeric parameter metadata"))
}

/// Numeric parameters are not supported on the write path.
pub(crate) fn encode<W: WireWrite + ?Sized>(
    _ctx: &CodecContext,
    _dst: &mut W,
    _col: &mut Column,
) -> Result<()> {
    Err(CodecError::NotImplemented("numeric parameter encoding"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::TypeId;
    use crate::version::TdsVersion;
    use bytes::Bytes;

    fn numeric_column(ctx: &CodecContext, precision: u8, scale: u8) -> Column {
        let mut col = Column::default();
        ctx.set_column_type(&mut col, TypeId::Numeric);
        col.precision = precision;
        col.scale = scale;
        col
    }

    #[test]
    fn test_describe_reads_three_bytes() {
        let ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = Column::default();
        ctx.set_column_type(&mut col, TypeId::Numeric);
        let mut src = Bytes::from_static(&[17, 38, 4]);
        describe(&ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.size, 17);
        assert_eq!(col.precision, 38);
        assert_eq!(col.scale, 4);
    }

    #[test]
    fn test_decode_null() {
        let mut ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = numeric_column(&ctx, 10, 2);
        let mut src = Bytes::from_static(&[0x00]);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert!(col.is_null());
    }

    #[test]
    fn test_decode_swaps_magnitude_under_7x() {
        let mut ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = numeric_column(&ctx, 10, 2);
        // sign=1 (positive), magnitude 0x3039 (12345) little-endian.
        let mut src = Bytes::from_static(&[0x05, 0x01, 0x39, 0x30, 0x00, 0x00]);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.cur_size, NUMERIC_RECORD_LEN);
        let Value::Numeric(num) = &col.value else {
            panic!("expected numeric value");
        };
        assert_eq!(num.precision, 10);
        assert_eq!(num.scale, 2);
        assert_eq!(num.magnitude(), &[0x00, 0x00, 0x30, 0x39]);
        assert_eq!(num.to_decimal().unwrap().to_string(), "123.45");
    }

    #[test]
    fn test_decode_keeps_order_under_50() {
        let mut ctx = CodecContext::new(TdsVersion::V5_0);
        let mut col = numeric_column(&ctx, 5, 0);
        // The 5.0 family already transmits big-endian.
        let mut src = Bytes::from_static(&[0x03, 0x01, 0x30, 0x39]);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        let Value::Numeric(num) = &col.value else {
            panic!("expected numeric value");
        };
        assert_eq!(num.magnitude(), &[0x30, 0x39]);
        assert_eq!(num.to_decimal().unwrap().to_string(), "12345");
    }

    #[test]
    fn test_decode_negative_sign() {
        let mut ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = numeric_column(&ctx, 5, 0);
        let mut src = Bytes::from_static(&[0x02, 0x00, 0x07]);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        let Value::Numeric(num) = &col.value else {
            panic!("expected numeric value");
        };
        assert!(num.is_negative());
        assert_eq!(num.to_decimal().unwrap().to_string(), "-7");
    }

    #[test]
    fn test_oversized_wire_value_is_fatal() {
        let mut ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = numeric_column(&ctx, 38, 0);
        let mut src = Bytes::from(vec![34u8; 64]);
        let err = decode(&mut ctx, &mut src, &mut col).unwrap_err();
        assert!(matches!(err, CodecError::NumericTooLong { size: 34 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_to_decimal_limits() {
        let wide = Numeric {
            precision: 38,
            scale: 0,
            array: SmallVec::from_slice(&[1u8; 33]),
        };
        assert!(wide.to_decimal().is_none());

        let deep = Numeric {
            precision: 38,
            scale: 29,
            array: SmallVec::from_slice(&[1, 1]),
        };
        assert!(deep.to_decimal().is_none());
    }

    #[test]
    fn test_encode_paths_are_gated() {
        let ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = numeric_column(&ctx, 10, 2);
        let mut out = bytes::BytesMut::new();
        assert!(matches!(
            encode_describe(&ctx, &mut out, &mut col).unwrap_err(),
            CodecError::NotImplemented(_)
        ));
        assert!(matches!(
            encode(&ctx, &mut out, &mut col).unwrap_err(),
            CodecError::NotImplemented(_)
        ));
    }
}
