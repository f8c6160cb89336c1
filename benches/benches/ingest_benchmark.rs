//! Ingest throughput benchmarks.
//!
//! Run with: `cargo bench --package tickbar-bench`

use chrono::TimeDelta;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use rust_decimal::Decimal;
use std::hint::black_box;
use std::sync::Arc;
use tickbar_bench::{NullSink, synthetic_ticks};
use tickbar_lib::{
    CandleBuilder, DispatchBatch, Dispatcher, Timeframe, TradingSession, UpdateBuffer,
    VolumeProfileAccumulator,
};

const TICKS: usize = 100_000;

fn builder_benchmark(c: &mut Criterion) {
    let ticks = synthetic_ticks(TICKS, TimeDelta::milliseconds(250), 42);

    let mut group = c.benchmark_group("ingest");
    group.throughput(Throughput::Elements(TICKS as u64));

    for timeframe in [Timeframe::Second5, Timeframe::Minute1, Timeframe::Hour1] {
        group.bench_with_input(BenchmarkId::new("builder", timeframe), &ticks, |b, ticks| {
            b.iter(|| {
                let mut builder = CandleBuilder::new(
                    "BENCH@TEST".parse().unwrap(),
                    timeframe,
                    TradingSession::around_the_clock(),
                    NullSink,
                );
                for tick in ticks {
                    black_box(builder.ingest(tick).unwrap());
                }
            });
        });

        group.bench_with_input(
            BenchmarkId::new("builder_stepped_profile", timeframe),
            &ticks,
            |b, ticks| {
                b.iter(|| {
                    let mut builder = CandleBuilder::new(
                        "BENCH@TEST".parse().unwrap(),
                        timeframe,
                        TradingSession::around_the_clock(),
                        NullSink,
                    )
                    .with_profile(
                        VolumeProfileAccumulator::new()
                            .with_step(Some(Decimal::new(5, 2)))
                            .with_sides(true),
                    );
                    for tick in ticks {
                        black_box(builder.ingest(tick).unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

fn pipeline_benchmark(c: &mut Criterion) {
    let ticks = synthetic_ticks(TICKS, TimeDelta::milliseconds(250), 7);

    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(TICKS as u64));

    // Fire every 1000 ticks, as a dispatcher would under load.
    group.bench_function("buffer_and_dispatch", |b| {
        b.iter(|| {
            let buffer = Arc::new(UpdateBuffer::new());
            let mut builder = CandleBuilder::new(
                "BENCH@TEST".parse().unwrap(),
                Timeframe::Minute1,
                TradingSession::around_the_clock(),
                Arc::clone(&buffer),
            );
            let mut dispatcher = Dispatcher::new(Arc::clone(&buffer), |batch: &DispatchBatch| {
                black_box(batch.candles.len());
            });
            for chunk in ticks.chunks(1000) {
                for tick in chunk {
                    builder.ingest(tick).unwrap();
                }
                dispatcher.fire();
            }
            black_box(dispatcher.history().len())
        });
    });

    group.finish();
}

criterion_group!(benches, builder_benchmark, pipeline_benchmark);
criterion_main!(benches);
