//! Criterion benchmarks for engine hot paths.
//!
//! Benchmarks:
//! 1. Full bar loop (feed → pipeline → strategy → matching → accounting)
//! 2. Broker submit/fill throughput
//! 3. Incremental indicator pipeline update

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use barlab_core::broker::Broker;
use barlab_core::domain::{Account, Bar, CommissionSchema, OrderId, OrderSide, OrderSpec};
use barlab_core::engine::Scheduler;
use barlab_core::feed::MemoryFeed;
use barlab_core::indicators::{Atr, Bollinger, Crossover, Ema, Macd, Pipeline, Rsi, Sma};
use barlab_core::strategies::{MaCross, MaCrossParams};
use chrono::{Duration, TimeZone, Utc};

fn make_bars(n: usize) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2020, 1, 2, 0, 0, 0).unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.1).sin() * 10.0;
            let open = close - 0.3;
            Bar {
                symbol: "BENCH".to_string(),
                timestamp: base + Duration::days(i as i64),
                open,
                high: close + 1.5,
                low: close - 1.5,
                close,
                volume: 1_000_000,
            }
        })
        .collect()
}

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");
    for n in [250usize, 2_500] {
        group.bench_with_input(BenchmarkId::new("ma_cross", n), &n, |b, &n| {
            let bars = make_bars(n);
            b.iter(|| {
                let mut pipeline = Pipeline::new();
                let strategy = MaCross::new(
                    &mut pipeline,
                    MaCrossParams {
                        trail: Some(2.0),
                        ..MaCrossParams::default()
                    },
                )
                .unwrap();
                let feed = MemoryFeed::new("BENCH", bars.clone());
                let broker =
                    Broker::new("BENCH", Account::new(1e6, CommissionSchema::Percent { rate: 0.001 }));
                let result = Scheduler::new(feed, pipeline, broker, strategy)
                    .run()
                    .unwrap();
                black_box(result.final_equity)
            })
        });
    }
    group.finish();
}

fn bench_broker_fills(c: &mut Criterion) {
    let bars = make_bars(2);
    c.bench_function("broker_submit_fill", |b| {
        b.iter(|| {
            let mut broker = Broker::new("BENCH", Account::new(1e9, CommissionSchema::free()));
            for i in 0..100u64 {
                broker.submit(
                    OrderId(i + 1),
                    OrderSpec::market(OrderSide::Buy, 10.0),
                    &bars[0],
                    0,
                );
            }
            broker.process_bar(&bars[1], 1);
            black_box(broker.cash())
        })
    });
}

fn bench_pipeline_update(c: &mut Criterion) {
    let bars = make_bars(2_500);
    c.bench_function("pipeline_update_full_stack", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::new();
            let fast = pipeline.add(Ema::new(12)).unwrap();
            let slow = pipeline.add(Ema::new(26)).unwrap();
            pipeline.add(Crossover::new(fast, slow)).unwrap();
            pipeline.add(Sma::new(30)).unwrap();
            pipeline.add(Rsi::new(14)).unwrap();
            pipeline.add(Atr::new(14)).unwrap();
            pipeline.add(Macd::new(12, 26)).unwrap();
            pipeline.add(Bollinger::upper(20, 2.0)).unwrap();
            for bar in &bars {
                pipeline.update(bar);
            }
            black_box(pipeline.bars_seen())
        })
    });
}

criterion_group!(benches, bench_bar_loop, bench_broker_fills, bench_pipeline_update);
criterion_main!(benches);
