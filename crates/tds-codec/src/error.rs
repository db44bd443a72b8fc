//! Codec error types.
//!
//! Errors fall into two classes with very different consequences for the
//! caller. Most variants mean the byte stream can no longer be trusted:
//! the reader is at an unknown position and the connection must be torn
//! down. [`CodecError::NotImplemented`] is different — it marks a codec
//! path that is intentionally unfinished, and callers may treat it as a
//! supported-configuration gate rather than stream corruption. The
//! distinction is exposed through [`CodecError::is_fatal`].

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, CodecError>;

/// Errors produced while decoding or encoding column data.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The stream ended in the middle of a value or metadata field.
    #[error("unexpected end of stream")]
    UnexpectedEof,

    /// The transport reported the connection as dead mid-operation.
    #[error("connection is dead")]
    ConnectionDead,

    /// A numeric payload longer than the wire format allows.
    ///
    /// Real servers never emit more than 33 bytes for a DECIMAL/NUMERIC
    /// value; anything larger means the stream is desynchronized.
    #[error("numeric value of {size} bytes exceeds the 33-byte wire maximum")]
    NumericTooLong {
        /// Size byte read from the wire.
        size: u8,
    },

    /// A fractional-second precision outside the 0..=7 range.
    #[error("fractional-second precision {precision} out of range")]
    PrecisionOutOfRange {
        /// Precision byte read from the wire.
        precision: u8,
    },

    /// A type byte with no corresponding wire type.
    #[error("unknown wire type 0x{0:02X}")]
    UnknownType(u8),

    /// A length field that contradicts the enclosing value's size.
    #[error("inconsistent length field in {0}")]
    InvalidLength(&'static str),

    /// The bound value does not match the column's declared wire type.
    #[error("cannot encode value as {expected}")]
    TypeMismatch {
        /// Name of the wire type the column was declared as.
        expected: &'static str,
    },

    /// An intentionally unfinished codec path.
    #[error("not implemented: {0}")]
    NotImplemented(&'static str),
}

impl CodecError {
    /// Whether the stream can still be trusted after this error.
    ///
    /// Everything except [`CodecError::NotImplemented`] leaves the reader at
    /// an unknown stream position; the connection must be discarded, not
    /// retried.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::NotImplemented(_))
    }
}
