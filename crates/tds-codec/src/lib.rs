//! # tds-codec
//!
//! Type-driven value codec for the TDS (Tabular Data Stream) protocol
//! used by SQL Server-family databases.
//!
//! Given a column's on-wire type descriptor, this crate knows how many
//! length-prefix bytes to expect, how to decode or encode the value bytes
//! — including chunked transfer, charset conversion, padding, and
//! server-version-dependent quirks — and when a byte stream can no longer
//! be trusted. A single off-by-one in a length field desynchronizes the
//! whole connection, so exact wire fidelity is the design center.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking
//! logic: reads come through [`WireRead`], writes go through
//! [`WireWrite`], and both are blanket-implemented for the `bytes` buffer
//! traits. The token-stream parser and transport live in higher layers.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tds_codec::{CodecContext, Column, TdsVersion, TypeId};
//!
//! let mut ctx = CodecContext::new(TdsVersion::V7_4);
//! let mut col = Column::default();
//! ctx.set_column_type(&mut col, TypeId::NVarChar);
//! ctx.resolve_metadata(&mut payload, &mut col)?;
//! // ... later, once per row:
//! ctx.decode_value(&mut payload, &mut col)?;
//! ```
//!
//! Errors split into two classes: protocol-fatal (the connection must be
//! torn down) and not-implemented (a gated codec path); see
//! [`CodecError::is_fatal`].

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod codec;
pub mod collation;
pub mod column;
pub mod error;
pub mod numeric;
pub mod types;
pub mod varmax;
pub mod version;
pub mod wire;

mod data;
mod datetime;
mod variant;

pub use codec::{CodecContext, ColumnCodec};
pub use collation::{CharConverter, Collation, WireDecoder, COLLATION_WIRE_LEN};
pub use column::{Column, Value};
pub use error::{CodecError, Result};
pub use numeric::{Numeric, NUMERIC_RECORD_LEN, NUMERIC_WIRE_MAX};
pub use types::{TypeId, VarintSize, USER_UNICHAR_TYPE, USER_UNIVARCHAR_TYPE};
pub use varmax::{BufferedChunks, Chunk, ChunkHandler};
pub use version::TdsVersion;
pub use wire::{WireRead, WireWrite};
