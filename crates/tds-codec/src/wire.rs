//! Byte-level transport primitives consumed by the codec.
//!
//! The codec is transport-agnostic: it reads through [`WireRead`] and
//! writes through [`WireWrite`], never touching a socket. Both traits are
//! blanket-implemented for the `bytes` buffer traits, so any `Buf` over
//! received packet payloads (and any `BufMut` being assembled into a
//! request) plugs in directly. All multi-byte integers are little-endian,
//! the TDS wire order.

use bytes::{Buf, BufMut, Bytes};

use crate::error::{CodecError, Result};

/// Reading side of the transport.
pub trait WireRead {
    /// Read exactly `n` bytes.
    fn read_bytes(&mut self, n: usize) -> Result<Bytes>;

    /// Read a single byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a 2-byte signed integer.
    fn read_i16(&mut self) -> Result<i16>;

    /// Read a 4-byte signed integer.
    fn read_i32(&mut self) -> Result<i32>;

    /// Read an 8-byte signed integer.
    fn read_i64(&mut self) -> Result<i64>;

    /// Whether the underlying transport has already failed.
    ///
    /// Buffer-backed readers never report dead; connection types override
    /// this so the codec can abort instead of misreading a torn stream.
    fn is_dead(&self) -> bool {
        false
    }
}

impl<B: Buf> WireRead for B {
    fn read_bytes(&mut self, n: usize) -> Result<Bytes> {
        if self.remaining() < n {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(self.copy_to_bytes(n))
    }

    fn read_u8(&mut self) -> Result<u8> {
        if self.remaining() < 1 {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(self.get_u8())
    }

    fn read_i16(&mut self) -> Result<i16> {
        if self.remaining() < 2 {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(self.get_i16_le())
    }

    fn read_i32(&mut self) -> Result<i32> {
        if self.remaining() < 4 {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(self.get_i32_le())
    }

    fn read_i64(&mut self) -> Result<i64> {
        if self.remaining() < 8 {
            return Err(CodecError::UnexpectedEof);
        }
        Ok(self.get_i64_le())
    }
}

/// Writing side of the transport.
///
/// Writes are buffered by the caller and cannot fail at this layer.
pub trait WireWrite {
    /// Write raw bytes.
    fn write_bytes(&mut self, data: &[u8]);

    /// Write a single byte.
    fn write_u8(&mut self, v: u8);

    /// Write a 2-byte signed integer.
    fn write_i16(&mut self, v: i16);

    /// Write a 4-byte signed integer.
    fn write_i32(&mut self, v: i32);

    /// Write an 8-byte signed integer.
    fn write_i64(&mut self, v: i64);
}

impl<B: BufMut> WireWrite for B {
    fn write_bytes(&mut self, data: &[u8]) {
        self.put_slice(data);
    }

    fn write_u8(&mut self, v: u8) {
        self.put_u8(v);
    }

    fn write_i16(&mut self, v: i16) {
        self.put_i16_le(v);
    }

    fn write_i32(&mut self, v: i32) {
        self.put_i32_le(v);
    }

    fn write_i64(&mut self, v: i64) {
        self.put_i64_le(v);
    }
}

/// Read a UTF-16LE string of `chars` code units.
///
/// Used for the table-name and schema strings attached to blob metadata.
/// Malformed surrogates are replaced rather than rejected; these strings
/// are informational only.
pub fn read_ucs2<S: WireRead + ?Sized>(src: &mut S, chars: usize) -> Result<String> {
    let raw = src.read_bytes(chars * 2)?;
    let units: Vec<u16> = raw
        .chunks_exact(2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .collect();
    Ok(String::from_utf16_lossy(&units))
}
