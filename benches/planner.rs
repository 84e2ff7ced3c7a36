//! Planning benchmarks.
//!
//! Measures the per-tick work of the ORDER step:
//! - rung evaluation and plan selection
//! - ladder to order request conversion

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use ladder_mm::{BalanceSnapshot, Contract, Denom, OffsetLadder, Plan, plan, to_order_requests};

fn ladder(depth: usize) -> OffsetLadder {
    let offsets = (1..=depth).map(|i| i as f64 * 0.005).collect();
    OffsetLadder::new(offsets).unwrap()
}

fn contract() -> Contract {
    Contract {
        address: "kujira1fin".into(),
        base: Denom::new("uatom", "ATOM"),
        quote: Denom::new("uusk", "USK"),
        price_decimals: 3,
    }
}

fn bench_plan(c: &mut Criterion) {
    let mut group = c.benchmark_group("plan");
    let balances = BalanceSnapshot::new(5.0, 500.0, 100.0);

    for depth in [1, 5, 20, 100] {
        let ladder = ladder(depth);
        group.bench_with_input(BenchmarkId::new("balanced", depth), &ladder, |b, ladder| {
            b.iter(|| plan(black_box(&balances), black_box(100.0), 0.5, ladder))
        });
        group.bench_with_input(BenchmarkId::new("gap", depth), &ladder, |b, ladder| {
            b.iter(|| plan(black_box(&balances), black_box(200.0), 0.5, ladder))
        });
    }
    group.finish();
}

fn bench_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_order_requests");
    let balances = BalanceSnapshot::new(5.0, 500.0, 100.0);
    let contract = contract();

    for depth in [1, 5, 20, 100] {
        let Plan::Ladder { sells, buys } = plan(&balances, 100.0, 0.5, &ladder(depth)) else {
            continue;
        };
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| {
                let mut requests = to_order_requests(&contract, black_box(&sells));
                requests.extend(to_order_requests(&contract, black_box(&buys)));
                requests
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_plan, bench_convert);
criterion_main!(benches);
