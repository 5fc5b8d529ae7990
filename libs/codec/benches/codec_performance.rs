//! Codec throughput
//!
//! Happy-path cost of the variable-length integer primitives and of a
//! full message with inline, framed and repeated groups, plus the cost of
//! rejecting malformed input.

use codec::io::SliceSource;
use codec::{vlc, Codec, Message, Value};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use schema::chrono::DateTime;
use schema::{Decimal, EnumDef, GroupDef, Schema, Symbol, TimeEpoch, TimeUnit, TypeDef};

fn order_schema() -> Schema {
    Schema::builder()
        .enumeration("Side", EnumDef::new([Symbol::new("Buy", 1), Symbol::new("Sell", 2)]))
        .group(GroupDef::new("Base").with_id(1).required("id", TypeDef::U64))
        .group(
            GroupDef::new("Fill")
                .with_id(2)
                .extends("Base")
                .required("venue", TypeDef::string()),
        )
        .group(
            GroupDef::new("Line")
                .required("sku", TypeDef::string())
                .required("qty", TypeDef::U32),
        )
        .group(
            GroupDef::new("Order")
                .with_id(3)
                .required("side", TypeDef::reference("Side"))
                .required("price", TypeDef::Decimal)
                .optional("fill", TypeDef::dynamic("Base"))
                .required("lines", TypeDef::sequence(TypeDef::reference("Line")))
                .required(
                    "placed",
                    TypeDef::Time {
                        epoch: TimeEpoch::Unix,
                        unit: TimeUnit::Millis,
                    },
                ),
        )
        .build()
        .expect("benchmark schema is valid")
}

fn order(lines: usize) -> Message {
    let lines: Vec<Value> = (0..lines)
        .map(|i| {
            Message::new("Line")
                .with("sku", format!("SKU-{:04}", i))
                .with("qty", i as u32)
                .into()
        })
        .collect();

    Message::new("Order")
        .with("side", Value::symbol("Buy"))
        .with("price", Decimal::new(-2, 10_150))
        .with("fill", Message::new("Fill").with("id", 42u64).with("venue", "XNAS"))
        .with("lines", lines)
        .with(
            "placed",
            DateTime::from_timestamp_millis(1_700_000_000_000).expect("valid timestamp"),
        )
}

fn bench_vlc(c: &mut Criterion) {
    let mut group = c.benchmark_group("vlc");

    for value in [5i64, -3_000, 1_700_000_000_000, i64::MIN] {
        let mut encoded: Vec<u8> = Vec::new();
        vlc::write_i64(&mut encoded, value);

        group.bench_with_input(BenchmarkId::new("encode", value), &value, |b, &value| {
            let mut out: Vec<u8> = Vec::with_capacity(16);
            b.iter(|| {
                out.clear();
                vlc::write_i64(&mut out, black_box(value));
                black_box(&out);
            });
        });

        group.bench_with_input(BenchmarkId::new("decode", value), &encoded, |b, encoded| {
            b.iter(|| {
                let result = vlc::read_i64(&mut SliceSource::new(black_box(encoded)));
                black_box(result)
            });
        });
    }

    group.finish();
}

fn bench_messages(c: &mut Criterion) {
    let codec = Codec::new(&order_schema()).expect("benchmark schema binds");
    let mut group = c.benchmark_group("order");

    for lines in [1usize, 16, 256] {
        let message = order(lines);
        let bytes = codec.encode(&message).expect("benchmark order encodes");
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", lines), &message, |b, message| {
            b.iter(|| black_box(codec.encode(black_box(message))));
        });

        group.bench_with_input(BenchmarkId::new("decode", lines), &bytes, |b, bytes| {
            b.iter(|| black_box(codec.decode(black_box(bytes))));
        });
    }

    group.finish();
}

/// Rejection must stay cheap: no allocation before the size checks
fn bench_error_paths(c: &mut Criterion) {
    let codec = Codec::new(&order_schema()).expect("benchmark schema binds");
    let mut group = c.benchmark_group("error_path");

    let bytes = codec.encode(&order(16)).expect("benchmark order encodes");
    let truncated = bytes[..bytes.len() / 2].to_vec();
    // Declares a 2^40 byte frame
    let oversized = vec![0xC6, 0, 0, 0, 0, 0, 1];

    group.bench_function("truncated_frame", |b| {
        b.iter(|| {
            let result = codec.decode(black_box(&truncated));
            assert!(result.is_err());
            black_box(result)
        });
    });

    group.bench_function("oversized_frame", |b| {
        b.iter(|| {
            let result = codec.decode(black_box(&oversized));
            assert!(result.is_err());
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_vlc, bench_messages, bench_error_paths);
criterion_main!(benches);
