//! Hub fan-out benchmarks.
//!
//! Measures the cost of pushing one broadcast through the event loop to N
//! in-memory observers, and of encoding the envelope that rides on it.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use plotrelay_bench::attach_observers;
use plotrelay_core::{Hub, HubConfig};
use plotrelay_protocol::{codec, Envelope};
use plotrelay_transport::Connection;
use std::time::Instant;

/// Benchmark broadcast delivery to a growing number of observers.
fn bench_fanout(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("hub_fanout");

    for observers in [1usize, 10, 100] {
        group.throughput(Throughput::Elements(observers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(observers),
            &observers,
            |b, &n| {
                b.iter_custom(|iters| {
                    rt.block_on(async {
                        let hub = Hub::start(HubConfig::default());
                        let mut peers = attach_observers(&hub, n);
                        let payload = Bytes::from(vec![b'x'; 256]);

                        let start = Instant::now();
                        for _ in 0..iters {
                            hub.submit_broadcast(payload.clone()).unwrap();
                        }
                        for peer in &mut peers {
                            for _ in 0..iters {
                                black_box(peer.recv().await.unwrap());
                            }
                        }
                        start.elapsed()
                    })
                });
            },
        );
    }

    group.finish();
}

/// Benchmark envelope encoding.
fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");

    for size in [64usize, 1024, 65536] {
        let envelope = Envelope::plot("9b2c1e4a", "bench", "x".repeat(size));
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &envelope, |b, env| {
            b.iter(|| codec::encode(black_box(env)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fanout, bench_encode);
criterion_main!(benches);
