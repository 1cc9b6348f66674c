//! # Message Relay Benchmarks
//!
//! | Stage | Claim |
//! |-------|-------|
//! | Wire codec | encode/decode cost grows with line length only |
//! | Handler | `on_message` returns without waiting for the sink |
//! | Publisher | `publish` returns without waiting for the acknowledgment |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relay_bus::InMemoryBroker;
use relay_core::{
    InMemoryRecordSink, MessageHandler, Record, RecordHandler, RecordPublisher, RecordValidator,
    WireCodec,
};
use std::sync::Arc;
use std::time::Duration;

fn record_with_content(len: usize) -> Record {
    Record::new("Thu Oct 26 10:00:00 UTC 2023", "testUser", "x".repeat(len))
}

fn bench_codec(c: &mut Criterion) {
    let codec = WireCodec::default();
    let mut group = c.benchmark_group("wire-codec");

    for len in [16, 280, 4096] {
        let record = record_with_content(len);
        let line = codec.encode(&record);

        group.throughput(Throughput::Bytes(line.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", len), &record, |b, record| {
            b.iter(|| black_box(codec.encode(record)))
        });
        group.bench_with_input(BenchmarkId::new("decode", len), &line, |b, line| {
            b.iter(|| black_box(codec.decode(Some(line.as_str()))))
        });
    }

    group.finish();
}

fn bench_handler(c: &mut Criterion) {
    let mut group = c.benchmark_group("record-handler");
    group.measurement_time(Duration::from_secs(5));

    let sink = Arc::new(InMemoryRecordSink::failing("bench"));
    let handler = RecordHandler::new(WireCodec::default(), RecordValidator::default(), sink);

    group.bench_function("valid_message", |b| {
        b.iter(|| handler.on_message(black_box(Some("2023-10-26\u{1}testUser\u{1}Hello Kafka"))))
    });
    group.bench_function("malformed_message", |b| {
        b.iter(|| handler.on_message(black_box(Some("date\u{1}user"))))
    });

    group.finish();
}

fn bench_publisher(c: &mut Criterion) {
    let mut group = c.benchmark_group("record-publisher");

    let broker = Arc::new(InMemoryBroker::new());
    let publisher = RecordPublisher::new(broker, WireCodec::default());
    let record = record_with_content(280);

    group.throughput(Throughput::Elements(1));
    group.bench_function("publish_record", |b| {
        b.iter(|| publisher.publish_record("tweets", black_box(&record)))
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_handler, bench_publisher);
criterion_main!(benches);
