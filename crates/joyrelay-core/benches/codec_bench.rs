//! Criterion benchmarks for the joyrelay wire codec.
//!
//! Measures frame+envelope encoding and decoding latency for the two message
//! types, sized as a typical gamepad produces them.
//!
//! Run with:
//! ```bash
//! cargo bench --package joyrelay-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use joyrelay_core::{
    decode_envelope, encode_message, AbsAxisSpec, DeviceConfig, FrameDecoder, FrameProgress,
    MessageTag, ReportBuffer, CONFIG_WIRE_SIZE,
};

// ── Fixtures ──────────────────────────────────────────────────────────────────

fn make_config() -> DeviceConfig {
    DeviceConfig {
        name: "bench-pad".to_string(),
        vendor_id: 0x045E,
        product_id: 0x028E,
        abs_axes: (0..6)
            .map(|id| AbsAxisSpec { id, min: -32768, max: 32767, ..Default::default() })
            .collect(),
        rel_axes: vec![],
        buttons: (0x130..0x140).collect(),
    }
}

fn make_report_bytes(config: &DeviceConfig) -> Vec<u8> {
    let mut report = ReportBuffer::for_config(config);
    for slot in 0..config.abs_axes.len() {
        report.set_abs(slot, (slot as i32 + 1) * 1000);
    }
    report.set_button(0, true);
    report.as_bytes().to_vec()
}

fn decode_wire(wire: &[u8]) -> (u16, usize) {
    let mut dec = FrameDecoder::new(CONFIG_WIRE_SIZE + 8);
    for &b in wire {
        if dec.decode_byte(b).unwrap() == FrameProgress::EndOfFrame && !dec.frame().is_empty() {
            let env = decode_envelope(dec.frame()).unwrap();
            return (env.tag, env.payload.len());
        }
    }
    unreachable!("benchmark wire always holds one frame");
}

// ── Benchmark groups ──────────────────────────────────────────────────────────

/// Benchmarks `encode_message` for both message types.
fn bench_encode(c: &mut Criterion) {
    let config = make_config();
    let report = make_report_bytes(&config);
    let config_wire = config.to_wire().unwrap();

    let payloads: &[(&str, MessageTag, &[u8])] = &[
        ("Config", MessageTag::Config, &config_wire),
        ("Report", MessageTag::Report, &report),
    ];

    let mut group = c.benchmark_group("encode_message");
    for (name, tag, payload) in payloads {
        group.bench_with_input(BenchmarkId::new("msg", name), payload, |b, payload| {
            b.iter(|| encode_message(black_box(*tag), black_box(payload)).unwrap())
        });
    }
    group.finish();
}

/// Benchmarks deframing + envelope validation from pre-encoded bytes.
fn bench_decode(c: &mut Criterion) {
    let config = make_config();
    let report = make_report_bytes(&config);

    let wires: &[(&str, Vec<u8>)] = &[
        (
            "Config",
            encode_message(MessageTag::Config, &config.to_wire().unwrap()).unwrap(),
        ),
        ("Report", encode_message(MessageTag::Report, &report).unwrap()),
    ];

    let mut group = c.benchmark_group("decode_message");
    for (name, wire) in wires {
        group.bench_with_input(BenchmarkId::new("msg", name), wire, |b, wire| {
            b.iter(|| decode_wire(black_box(wire)))
        });
    }
    group.finish();
}

/// Benchmarks a full encode+decode round-trip for the hot-path report message.
fn bench_roundtrip_hot_path(c: &mut Criterion) {
    let config = make_config();
    let report = make_report_bytes(&config);

    let mut group = c.benchmark_group("encode_decode_roundtrip");
    group.bench_function("Report", |b| {
        b.iter(|| {
            let wire = encode_message(black_box(MessageTag::Report), black_box(&report)).unwrap();
            decode_wire(black_box(&wire))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode, bench_roundtrip_hot_path);
criterion_main!(benches);
