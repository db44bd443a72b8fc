//! Column descriptors and decoded values.
//!
//! A [`Column`] is the mutable record shared between the two phases of a
//! column's life: metadata resolution (which fixes the wire type, varint
//! class, and declared size) and the per-row data phase (which overwrites
//! [`Column::value`] and [`Column::cur_size`] once per occurrence). The
//! same record describes a bound parameter on the write path.
//!
//! Phase ordering matters: `set_type` must run before `describe`, and
//! `describe` before any `decode`. After metadata resolution the varint
//! class never changes, with one protocol-mandated exception — a negative
//! 2-byte size under TDS 7.2+ reclassifies the column as chunked.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};

use crate::codec::ColumnCodec;
use crate::collation::{CharConverter, Collation};
use crate::numeric::Numeric;
use crate::types::{TypeId, VarintSize};

/// A decoded column value or a value bound for encoding.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    /// SQL NULL.
    #[default]
    Null,
    /// Opaque byte payload (binary types, raw fixed-size values).
    Bytes(Bytes),
    /// Character data after charset conversion.
    Str(String),
    /// Integer bound for a nullable-integer parameter.
    Int(i64),
    /// Fixed-point decimal.
    Numeric(Numeric),
    /// Date without time.
    Date(NaiveDate),
    /// Time of day.
    Time(NaiveTime),
    /// Date and time, no offset.
    DateTime(NaiveDateTime),
    /// Date and time with a UTC offset.
    DateTimeOffset(DateTime<FixedOffset>),
}

impl Value {
    /// Whether this is SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Byte length of the stored payload, for the variants that have one.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        match self {
            Self::Bytes(b) => b.len(),
            Self::Str(s) => s.len(),
            _ => 0,
        }
    }
}

/// Per-column codec state.
///
/// `cur_size == -1` is the only NULL indicator; no other field implies
/// nullness. For fixed-size columns (`varint == Fixed`) the declared size
/// comes from the static type table and `cur_size` equals it whenever the
/// value is non-null.
#[derive(Debug)]
pub struct Column {
    /// Wire type as declared by the server (or by the client for a
    /// parameter), before cardinal collapsing.
    pub wire_type: TypeId,
    /// Cardinal type driving codec behavior.
    pub ty: TypeId,
    /// User-type tag from column metadata.
    pub user_type: u32,
    /// Length-prefix scheme, derived once at metadata-resolution time.
    pub varint: VarintSize,
    /// Size as negotiated with the server, in wire bytes.
    pub server_size: i32,
    /// Client-side declared size.
    pub size: i32,
    /// Decoded length of the most recent value; -1 means SQL NULL.
    pub cur_size: i32,
    /// Precision for fixed-point and fractional-second types.
    pub precision: u8,
    /// Scale for fixed-point and fractional-second types.
    pub scale: u8,
    /// Collation tag, present for character columns under TDS 7.1+.
    pub collation: Option<Collation>,
    /// Source table name, present for blob-family columns.
    pub table_name: Option<String>,
    /// Charset transcoder, present when the column carries character data
    /// under the active client encoding.
    pub converter: Option<CharConverter>,
    /// Codec implementation resolved from the wire type.
    pub codec: ColumnCodec,
    /// The decoded payload, or the value bound for encoding.
    pub value: Value,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            wire_type: TypeId::Void,
            ty: TypeId::Void,
            user_type: 0,
            varint: VarintSize::Fixed,
            server_size: 0,
            size: 0,
            cur_size: -1,
            precision: 0,
            scale: 0,
            collation: None,
            table_name: None,
            converter: None,
            codec: ColumnCodec::Default,
            value: Value::Null,
        }
    }
}

impl Column {
    /// Create a descriptor with a user-type tag set ahead of type
    /// registration (the tag participates in cardinal collapsing).
    #[must_use]
    pub fn with_user_type(user_type: u32) -> Self {
        Self {
            user_type,
            ..Self::default()
        }
    }

    /// Whether the most recent value was SQL NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.cur_size == -1
    }

    /// Whether values are transferred with a blob layout (varint class
    /// above 2), implying per-value allocation instead of a fixed buffer.
    #[must_use]
    pub fn is_blob(&self) -> bool {
        matches!(
            self.varint,
            VarintSize::Int | VarintSize::LongBlob | VarintSize::Plp
        )
    }
}
