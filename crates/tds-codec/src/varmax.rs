//! Chunked ("varmax") transfer for streamed large-object values.
//!
//! TDS 7.2+ transfers MAX-typed values as an 8-byte total size followed
//! by a sequence of 4-byte-length-prefixed chunks; a chunk length of zero
//! (or below) terminates the sequence. A total size of -1 is NULL and
//! terminates immediately.
//!
//! Decode accumulates chunks through a pluggable [`ChunkHandler`], so a
//! caller can substitute a streaming sink (write-through to disk, hash
//! computation) instead of buffering the whole value. The default
//! [`BufferedChunks`] handler buffers everything and yields one value.
//! When the column has a charset converter, each chunk is transcoded
//! through a stateful decoder before the handler sees it; multi-byte
//! sequences split across chunk boundaries reassemble correctly.
//!
//! The iteration state lives only for the duration of one value's decode.
//! An error mid-stream leaves the wire position unknown; the connection
//! must be torn down, never retried.

use bytes::Bytes;
use tracing::trace;

use crate::codec::CodecContext;
use crate::column::{Column, Value};
use crate::error::Result;
use crate::wire::WireRead;

/// Total-size value meaning SQL NULL.
const PLP_NULL: i64 = -1;

/// Cap on up-front buffer reservation; a hostile total-size header must
/// not force a huge allocation before any payload arrives.
const RESERVE_CAP: usize = 1 << 20;

/// One piece of a streamed value, as delivered to a [`ChunkHandler`].
#[derive(Debug)]
pub enum Chunk<'a> {
    /// Raw bytes of a binary value.
    Bytes(&'a [u8]),
    /// Transcoded text of a character value.
    Text(&'a str),
}

/// Sink for streamed large-object decode.
///
/// Calls arrive strictly in order: `begin` once, `chunk` once per wire
/// chunk, `end` once after the terminator. A handler is reused across
/// values; `begin` must reset any accumulated state.
pub trait ChunkHandler {
    /// A streamed value is starting. `total_size` is the server's
    /// declared total, which may be the unknown-size sentinel.
    fn begin(&mut self, col: &Column, total_size: i64);

    /// The next piece of the value, already charset-converted when the
    /// column carries a converter.
    fn chunk(&mut self, piece: Chunk<'_>);

    /// The terminator arrived; produce the final value.
    fn end(&mut self) -> Value;
}

/// Default handler: buffers every chunk in memory.
#[derive(Debug, Default)]
pub struct BufferedChunks {
    bytes: Vec<u8>,
    text: String,
    is_text: bool,
}

impl ChunkHandler for BufferedChunks {
    fn begin(&mut self, _col: &Column, total_size: i64) {
        self.bytes.clear();
        self.text.clear();
        self.is_text = false;
        if total_size > 0 {
            let reserve = usize::try_from(total_size).unwrap_or(RESERVE_CAP);
            self.bytes.reserve(reserve.min(RESERVE_CAP));
        }
    }

    fn chunk(&mut self, piece: Chunk<'_>) {
        match piece {
            Chunk::Bytes(b) => self.bytes.extend_from_slice(b),
            Chunk::Text(t) => {
                self.is_text = true;
                self.text.push_str(t);
            }
        }
    }

    fn end(&mut self) -> Value {
        if self.is_text {
            Value::Str(core::mem::take(&mut self.text))
        } else {
            Value::Bytes(Bytes::from(core::mem::take(&mut self.bytes)))
        }
    }
}

/// Decode one streamed value into the column through the context's
/// chunk handler.
pub(crate) fn decode<S: WireRead + ?Sized>(
    ctx: &mut CodecContext,
    src: &mut S,
    col: &mut Column,
) -> Result<()> {
    let total_size = src.read_i64()?;
    trace!(total_size, "streamed value");

    if total_size == PLP_NULL {
        col.cur_size = -1;
        col.value = Value::Null;
        return Ok(());
    }

    let mut decoder = col.converter.as_ref().map(|c| c.decoder());
    let handler = ctx.chunk_handler_mut();
    handler.begin(col, total_size);

    loop {
        let chunk_len = src.read_i32()?;
        if chunk_len <= 0 {
            if let Some(dec) = &mut decoder {
                let tail = dec.decode(&[], true);
                handler.chunk(Chunk::Text(&tail));
            }
            let value = handler.end();
            col.cur_size = value.payload_len() as i32;
            col.value = value;
            return Ok(());
        }
        let raw = src.read_bytes(chunk_len as usize)?;
        match &mut decoder {
            Some(dec) => {
                let text = dec.decode(&raw, false);
                handler.chunk(Chunk::Text(&text));
            }
            None => handler.chunk(Chunk::Bytes(&raw)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::collation::CharConverter;
    use crate::types::TypeId;
    use crate::version::TdsVersion;
    use bytes::{Buf, BufMut, BytesMut};

    fn plp_stream(chunks: &[&[u8]], total: i64) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_i64_le(total);
        for c in chunks {
            buf.put_i32_le(c.len() as i32);
            buf.put_slice(c);
        }
        buf.put_i32_le(0);
        buf.freeze()
    }

    fn max_column(ctx: &CodecContext) -> Column {
        let mut col = Column::default();
        ctx.set_column_type(&mut col, TypeId::BigVarBinary);
        col.varint = crate::types::VarintSize::Plp;
        col
    }

    #[test]
    fn test_chunks_concatenate_in_order() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        let mut src = plp_stream(&[b"abcd", b"ef", b"ghij"], 10);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.cur_size, 10);
        assert_eq!(col.value, Value::Bytes(Bytes::from_static(b"abcdefghij")));
    }

    #[test]
    fn test_null_total_size() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        let mut src = BytesMut::new();
        src.put_i64_le(-1);
        let mut src = src.freeze();
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert!(col.is_null());
        assert!(!src.has_remaining());
    }

    #[test]
    fn test_empty_value() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        let mut src = plp_stream(&[], 0);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.cur_size, 0);
        assert_eq!(col.value, Value::Bytes(Bytes::new()));
    }

    #[test]
    fn test_text_chunks_transcode_across_boundary() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        col.converter = Some(CharConverter::Wide);
        // "hi" in UTF-16LE, split mid-code-unit.
        let mut src = plp_stream(&[&[0x68, 0x00, 0x69], &[0x00]], 4);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.value, Value::Str("hi".into()));
        assert_eq!(col.cur_size, 2);
    }

    #[test]
    fn test_handler_reused_across_values() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        let mut src = plp_stream(&[b"one"], 3);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        let mut src = plp_stream(&[b"two!"], 4);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.value, Value::Bytes(Bytes::from_static(b"two!")));
    }

    #[test]
    fn test_truncated_stream_is_eof() {
        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        let mut col = max_column(&ctx);
        let mut buf = BytesMut::new();
        buf.put_i64_le(10);
        buf.put_i32_le(4);
        buf.put_slice(b"ab"); // two bytes short
        let mut src = buf.freeze();
        assert!(decode(&mut ctx, &mut src, &mut col).is_err());
    }

    #[test]
    fn test_custom_handler_sees_every_chunk() {
        #[derive(Default)]
        struct Counting {
            pieces: usize,
            bytes: Vec<u8>,
        }
        impl ChunkHandler for Counting {
            fn begin(&mut self, _col: &Column, _total: i64) {
                self.pieces = 0;
                self.bytes.clear();
            }
            fn chunk(&mut self, piece: Chunk<'_>) {
                self.pieces += 1;
                if let Chunk::Bytes(b) = piece {
                    self.bytes.extend_from_slice(b);
                }
            }
            fn end(&mut self) -> Value {
                Value::Bytes(Bytes::from(core::mem::take(&mut self.bytes)))
            }
        }

        let mut ctx = CodecContext::new(TdsVersion::V7_2);
        ctx.set_chunk_handler(Box::new(Counting::default()));
        let mut col = max_column(&ctx);
        let mut src = plp_stream(&[b"a", b"b", b"c"], 3);
        decode(&mut ctx, &mut src, &mut col).unwrap();
        assert_eq!(col.value, Value::Bytes(Bytes::from_static(b"abc")));
    }
}
