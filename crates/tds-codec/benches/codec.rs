//! Benchmarks for the column value decode paths.

#![allow(clippy::unwrap_used, missing_docs)]

use bytes::{BufMut, Bytes, BytesMut};
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};
use tds_codec::{CodecContext, Column, TdsVersion, TypeId};

fn registered(ctx: &CodecContext, ty: TypeId) -> Column {
    let mut col = Column::default();
    ctx.set_column_type(&mut col, ty);
    col
}

/// Benchmark fixed-size integer decoding, the tightest row loop.
fn bench_decode_int4(c: &mut Criterion) {
    let mut ctx = CodecContext::new(TdsVersion::V7_4);
    let mut col = registered(&ctx, TypeId::Int4);
    let encoded = Bytes::from_static(&[0x2A, 0x00, 0x00, 0x00]);

    c.bench_function("decode_int4", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            ctx.decode_value(&mut cursor, &mut col).unwrap();
            black_box(&col.value);
        })
    });
}

/// Benchmark Unicode string decoding with charset conversion.
fn bench_decode_nvarchar(c: &mut Criterion) {
    let mut ctx = CodecContext::new(TdsVersion::V7_4);
    let mut col = registered(&ctx, TypeId::NVarChar);
    let mut meta = BytesMut::new();
    meta.put_i16_le(200);
    meta.put_slice(&[0x09, 0x04, 0x00, 0x00, 0x00]);
    let mut meta = meta.freeze();
    ctx.resolve_metadata(&mut meta, &mut col).unwrap();

    let text = "the quick brown fox jumps over the lazy dog";
    let mut row = BytesMut::new();
    row.put_i16_le((text.len() * 2) as i16);
    for unit in text.encode_utf16() {
        row.put_u16_le(unit);
    }
    let encoded = row.freeze();

    let mut group = c.benchmark_group("decode_nvarchar");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("ascii_payload", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            ctx.decode_value(&mut cursor, &mut col).unwrap();
            black_box(&col.value);
        })
    });
    group.finish();
}

/// Benchmark chunked large-object reassembly.
fn bench_decode_varmax(c: &mut Criterion) {
    let mut ctx = CodecContext::new(TdsVersion::V7_2);
    let mut col = registered(&ctx, TypeId::Xml);
    col.converter = None;

    let chunk = vec![0xABu8; 4096];
    let mut stream = BytesMut::new();
    stream.put_i64_le((chunk.len() * 8) as i64);
    for _ in 0..8 {
        stream.put_i32_le(chunk.len() as i32);
        stream.put_slice(&chunk);
    }
    stream.put_i32_le(0);
    let encoded = stream.freeze();

    let mut group = c.benchmark_group("decode_varmax");
    group.throughput(Throughput::Bytes(encoded.len() as u64));
    group.bench_function("32k_in_8_chunks", |b| {
        b.iter(|| {
            let mut cursor = encoded.clone();
            ctx.decode_value(&mut cursor, &mut col).unwrap();
            black_box(&col.value);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_decode_int4,
    bench_decode_nvarchar,
    bench_decode_varmax
);
criterion_main!(benches);
