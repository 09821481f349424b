//! Hot-path benchmarks for the matching engine: adding a resting order,
//! cancelling one, and walking a multi-level cross.

use common::{OrderId, Price, Quantity, Side, SymbolId, Timestamp, TraderId};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use orderbook::book::BookConfig;
use orderbook::matching::MatchingEngine;

fn config() -> BookConfig {
    BookConfig {
        max_orders: 1_000_000,
        max_price_levels: 100_000,
        base_price: 0,
        price_range: 1_000_000,
    }
}

fn bench_add_resting_order(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching_add");

    group.bench_function("rest_no_cross", |b| {
        let mut engine = MatchingEngine::new(SymbolId(1), config());
        let mut next_id = 1u64;
        b.iter(|| {
            let id = OrderId(next_id);
            next_id += 1;
            black_box(
                engine
                    .add_order(
                        id,
                        TraderId(1),
                        Side::Buy,
                        Price(10_000),
                        Quantity(100),
                        Timestamp(next_id),
                        |_| {},
                    )
                    .unwrap(),
            );
        });
    });

    group.finish();
}

fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching_cancel");

    group.bench_function("cancel_resting_order", |b| {
        let mut engine = MatchingEngine::new(SymbolId(1), config());
        let mut next_id = 1u64;
        b.iter(|| {
            let id = OrderId(next_id);
            next_id += 1;
            engine
                .add_order(id, TraderId(1), Side::Buy, Price(10_000), Quantity(100), Timestamp(next_id), |_| {})
                .unwrap();
            black_box(engine.cancel_order(id).unwrap());
        });
    });

    group.finish();
}

fn bench_walk_three_levels(c: &mut Criterion) {
    let mut group = c.benchmark_group("matching_walk");

    group.bench_function("cross_three_levels", |b| {
        b.iter_with_setup(
            || {
                let mut engine = MatchingEngine::new(SymbolId(1), config());
                for (id, price) in [(1, 10_100), (2, 10_200), (3, 10_300)] {
                    engine
                        .add_order(OrderId(id), TraderId(1), Side::Sell, Price(price), Quantity(50), Timestamp(id), |_| {})
                        .unwrap();
                }
                engine
            },
            |mut engine| {
                black_box(
                    engine
                        .add_order(OrderId(4), TraderId(2), Side::Buy, Price(10_300), Quantity(150), Timestamp(10), |_| {})
                        .unwrap(),
                );
            },
        );
    });

    group.finish();
}

criterion_group!(benches, bench_add_resting_order, bench_cancel, bench_walk_three_levels);
criterion_main!(benches);
