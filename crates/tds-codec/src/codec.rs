//! Codec dispatch and the per-connection codec context.
//!
//! Every column resolves to one of four codec implementations, selected
//! by cardinal type through a pure lookup ([`ColumnCodec::resolve`]).
//! Each implementation supplies the same four operations: `describe`
//! (consume metadata from the wire), `decode` (consume one value),
//! `encode_describe` (emit the length/precision prefix for an outgoing
//! parameter), and `encode` (emit the parameter value). A fifth
//! operation, [`ColumnCodec::row_length`], exists for the fixed-row
//! format and deliberately fails: callers must treat its absence as an
//! unsupported configuration, not a zero-length row.
//!
//! [`CodecContext`] owns the connection-scoped inputs to those
//! operations: the negotiated protocol version, the collation stamped on
//! outgoing character parameters, and the chunk handler used for
//! streamed large-object decode. Protocol state is inherently sequential;
//! the context must not be shared across concurrent decodes.

use tracing::trace;

use crate::collation::Collation;
use crate::column::Column;
use crate::error::{CodecError, Result};
use crate::types::TypeId;
use crate::varmax::{BufferedChunks, ChunkHandler};
use crate::version::TdsVersion;
use crate::wire::{WireRead, WireWrite};
use crate::{data, datetime, numeric, variant};

/// Codec implementation attached to a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ColumnCodec {
    /// Generic path: varint-classed sizes, blobs, padding, chunking.
    #[default]
    Default,
    /// Fixed-point decimal wire format.
    Numeric,
    /// SQL_VARIANT (TDS 7+ only).
    Variant,
    /// Compact date/time formats (SQL Server 2008+).
    MsDateTime,
}

impl ColumnCodec {
    /// Select the codec for a type under a protocol version.
    ///
    /// SQL_VARIANT only exists in the 7.x family; under a 5.0 session
    /// the identifier falls through to the generic path.
    #[must_use]
    pub fn resolve(ty: TypeId, version: TdsVersion) -> Self {
        match ty {
            TypeId::Numeric | TypeId::Decimal => Self::Numeric,
            TypeId::Variant if version.is_tds_7_plus() => Self::Variant,
            TypeId::Date | TypeId::Time | TypeId::DateTime2 | TypeId::DateTimeOffset => {
                Self::MsDateTime
            }
            _ => Self::Default,
        }
    }

    /// Consume a column's metadata bytes and populate the descriptor.
    pub fn describe<S: WireRead + ?Sized>(
        self,
        ctx: &CodecContext,
        src: &mut S,
        col: &mut Column,
    ) -> Result<()> {
        match self {
            Self::Default => data::describe(ctx, src, col),
            Self::Numeric => numeric::describe(ctx, src, col),
            Self::Variant => variant::describe(ctx, src, col),
            Self::MsDateTime => datetime::describe(ctx, src, col),
        }
    }

    /// Consume one value occurrence and populate `value`/`cur_size`.
    pub fn decode<S: WireRead + ?Sized>(
        self,
        ctx: &mut CodecContext,
        src: &mut S,
        col: &mut Column,
    ) -> Result<()> {
        match self {
            Self::Default => data::decode(ctx, src, col),
            Self::Numeric => numeric::decode(ctx, src, col),
            Self::Variant => variant::decode(ctx, src, col),
            Self::MsDateTime => datetime::decode(ctx, src, col),
        }
    }

    /// Emit the length-prefix / precision bytes for an outgoing parameter.
    pub fn encode_describe<W: WireWrite + ?Sized>(
        self,
        ctx: &CodecContext,
        dst: &mut W,
        col: &mut Column,
    ) -> Result<()> {
        match self {
            Self::Default => data::encode_describe(ctx, dst, col),
            Self::Numeric => numeric::encode_describe(ctx, dst, col),
            Self::Variant => variant::encode_describe(ctx, dst, col),
            Self::MsDateTime => datetime::encode_describe(ctx, dst, col),
        }
    }

    /// Emit an outgoing parameter's value bytes, including NULL.
    pub fn encode<W: WireWrite + ?Sized>(
        self,
        ctx: &CodecContext,
        dst: &mut W,
        col: &mut Column,
    ) -> Result<()> {
        match self {
            Self::Default => data::encode(ctx, dst, col),
            Self::Numeric => numeric::encode(ctx, dst, col),
            Self::Variant => variant::encode(ctx, dst, col),
            Self::MsDateTime => datetime::encode(ctx, dst, col),
        }
    }

    /// Length of this column within the fixed row format.
    ///
    /// The fixed row format is unsupported; this always fails with the
    /// not-implemented class so callers can gate on it.
    pub fn row_length(self, _col: &Column) -> Result<usize> {
        Err(CodecError::NotImplemented("fixed-length row format"))
    }
}

/// Connection-scoped codec state.
pub struct CodecContext {
    /// Negotiated protocol version.
    pub version: TdsVersion,
    /// Collation stamped on outgoing character parameters.
    pub collation: Collation,
    chunk_handler: Box<dyn ChunkHandler>,
}

impl core::fmt::Debug for CodecContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CodecContext")
            .field("version", &self.version)
            .field("collation", &self.collation)
            .finish_non_exhaustive()
    }
}

impl CodecContext {
    /// Create a context for a negotiated protocol version with the
    /// default in-memory chunk handler.
    #[must_use]
    pub fn new(version: TdsVersion) -> Self {
        Self {
            version,
            collation: Collation::default(),
            chunk_handler: Box::new(BufferedChunks::default()),
        }
    }

    /// Replace the chunk handler used for streamed large-object decode,
    /// e.g. with a write-through sink.
    pub fn set_chunk_handler(&mut self, handler: Box<dyn ChunkHandler>) {
        self.chunk_handler = handler;
    }

    pub(crate) fn chunk_handler_mut(&mut self) -> &mut dyn ChunkHandler {
        self.chunk_handler.as_mut()
    }

    /// Register a column's wire type, resolving its codec, cardinal type,
    /// varint class, and — for fixed types — its sizes.
    ///
    /// Must run before `resolve_metadata`; the varint class it derives is
    /// final for the column's lifetime (save the documented TDS 7.2
    /// reclassification to chunked).
    pub fn set_column_type(&self, col: &mut Column, ty: TypeId) {
        col.wire_type = ty;
        col.codec = ColumnCodec::resolve(ty, self.version);
        col.ty = ty.cardinal(col.user_type);

        col.cur_size = -1;
        col.varint = ty.varint_size(self.version);
        if col.varint == crate::types::VarintSize::Fixed {
            let size = ty.fixed_size();
            col.cur_size = size;
            col.server_size = size;
            col.size = size;
        }
        trace!(
            ty = ?col.ty,
            class = col.varint.class(),
            "registered column type"
        );
    }

    /// Register a column's type from the raw wire byte, failing on
    /// identifiers this codec does not know.
    pub fn register_column_type(&self, col: &mut Column, wire_byte: u8) -> Result<()> {
        let ty = TypeId::from_u8(wire_byte).ok_or(CodecError::UnknownType(wire_byte))?;
        self.set_column_type(col, ty);
        Ok(())
    }

    /// Resolve a result column's metadata from the wire.
    pub fn resolve_metadata<S: WireRead + ?Sized>(
        &self,
        src: &mut S,
        col: &mut Column,
    ) -> Result<()> {
        let codec = col.codec;
        codec.describe(self, src, col)
    }

    /// Decode one value occurrence for a described column.
    pub fn decode_value<S: WireRead + ?Sized>(
        &mut self,
        src: &mut S,
        col: &mut Column,
    ) -> Result<()> {
        let codec = col.codec;
        codec.decode(self, src, col)
    }

    /// Write the metadata prefix for an outgoing parameter.
    pub fn describe_outgoing<W: WireWrite + ?Sized>(
        &self,
        dst: &mut W,
        col: &mut Column,
    ) -> Result<()> {
        let codec = col.codec;
        codec.encode_describe(self, dst, col)
    }

    /// Write an outgoing parameter's value.
    pub fn encode_outgoing<W: WireWrite + ?Sized>(
        &self,
        dst: &mut W,
        col: &mut Column,
    ) -> Result<()> {
        let codec = col.codec;
        codec.encode(self, dst, col)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_resolution() {
        let v74 = TdsVersion::V7_4;
        assert_eq!(
            ColumnCodec::resolve(TypeId::Numeric, v74),
            ColumnCodec::Numeric
        );
        assert_eq!(
            ColumnCodec::resolve(TypeId::Decimal, v74),
            ColumnCodec::Numeric
        );
        assert_eq!(
            ColumnCodec::resolve(TypeId::Variant, v74),
            ColumnCodec::Variant
        );
        assert_eq!(
            ColumnCodec::resolve(TypeId::Time, v74),
            ColumnCodec::MsDateTime
        );
        assert_eq!(
            ColumnCodec::resolve(TypeId::Int4, v74),
            ColumnCodec::Default
        );
        // SQL_VARIANT without a 7.x session falls back to the generic path.
        assert_eq!(
            ColumnCodec::resolve(TypeId::Variant, TdsVersion::V5_0),
            ColumnCodec::Default
        );
    }

    #[test]
    fn test_row_length_is_gated() {
        let col = Column::default();
        let err = ColumnCodec::Default.row_length(&col).unwrap_err();
        assert!(matches!(err, CodecError::NotImplemented(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_set_column_type_fixed() {
        let ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = Column::default();
        ctx.set_column_type(&mut col, TypeId::Int4);
        assert_eq!(col.size, 4);
        assert_eq!(col.server_size, 4);
        assert_eq!(col.cur_size, 4);
        assert_eq!(col.ty, TypeId::Int4);
    }

    #[test]
    fn test_register_unknown_type_byte() {
        let ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = Column::default();
        let err = ctx.register_column_type(&mut col, 0x99).unwrap_err();
        assert!(matches!(err, CodecError::UnknownType(0x99)));
        assert!(err.is_fatal());

        ctx.register_column_type(&mut col, 0xE7).unwrap();
        assert_eq!(col.wire_type, TypeId::NVarChar);
    }

    #[test]
    fn test_set_column_type_collapses_cardinal() {
        let ctx = CodecContext::new(TdsVersion::V7_4);
        let mut col = Column::default();
        ctx.set_column_type(&mut col, TypeId::NVarChar);
        assert_eq!(col.wire_type, TypeId::NVarChar);
        assert_eq!(col.ty, TypeId::VarChar);
        assert_eq!(col.varint, crate::types::VarintSize::Word);
        assert_eq!(col.cur_size, -1);
    }
}
