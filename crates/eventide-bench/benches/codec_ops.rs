//! Criterion micro-benchmarks for trace encoding and hashing.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use eventide_core::{Trace, TraceEntry, Value, VirtualTime};
use eventide_replay::codec::{decode_entry, encode_entry};
use eventide_replay::{trace_hash, TraceHeader, TraceReader, TraceWriter};

/// Build a trace of `n` entries mixing strings, integers, and lists.
fn make_trace(n: u64) -> Trace {
    (0..n)
        .map(|i| TraceEntry {
            seq: i,
            time: VirtualTime(i / 10),
            value: match i % 3 {
                0 => Value::from(format!("tick {i}").as_str()),
                1 => Value::Int(i as i64),
                _ => Value::List(vec![Value::Int(i as i64), Value::Bool(i % 2 == 0)]),
            },
        })
        .collect()
}

/// Benchmark: encode one entry.
fn bench_encode_entry(c: &mut Criterion) {
    let trace = make_trace(3);
    let entry = &trace.entries()[2];

    c.bench_function("codec_encode_entry", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(64);
            encode_entry(&mut buf, entry).unwrap();
            black_box(&buf);
        });
    });
}

/// Benchmark: decode the same entry.
fn bench_decode_entry(c: &mut Criterion) {
    let trace = make_trace(3);
    let mut encoded = Vec::with_capacity(64);
    encode_entry(&mut encoded, &trace.entries()[2]).unwrap();

    c.bench_function("codec_decode_entry", |b| {
        b.iter(|| {
            let mut cursor = encoded.as_slice();
            let decoded = decode_entry(&mut cursor).unwrap().unwrap();
            black_box(&decoded);
        });
    });
}

/// Benchmark: write then read back a 10K-entry trace.
fn bench_trace_roundtrip_10k(c: &mut Criterion) {
    let trace = make_trace(10_000);
    let header = TraceHeader::current(0);

    c.bench_function("trace_roundtrip_10k", |b| {
        b.iter(|| {
            let mut writer = TraceWriter::new(Vec::new(), &header).unwrap();
            writer.write_trace(&trace).unwrap();
            let bytes = writer.into_inner().unwrap();
            let read = TraceReader::open(bytes.as_slice())
                .unwrap()
                .read_trace()
                .unwrap();
            black_box(read.len());
        });
    });
}

/// Benchmark: hash a 10K-entry trace.
fn bench_trace_hash_10k(c: &mut Criterion) {
    let trace = make_trace(10_000);

    c.bench_function("trace_hash_10k", |b| {
        b.iter(|| {
            black_box(trace_hash(&trace));
        });
    });
}

criterion_group!(
    benches,
    bench_encode_entry,
    bench_decode_entry,
    bench_trace_roundtrip_10k,
    bench_trace_hash_10k,
);
criterion_main!(benches);
