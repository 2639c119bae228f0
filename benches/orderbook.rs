//! Benchmarks for ladder updates and feed decoding.
//!
//! Run with: `cargo bench`

use chrono::Utc;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use poloniex_book::feed::decode_line_at;
use poloniex_book::orderbook::{BookState, PriceLadder};
use poloniex_book::types::{BookEvent, Side, Tick};
use rust_decimal::Decimal;

fn price(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

fn filled_ladder(side: Side, depth: usize) -> PriceLadder {
    let mut ladder = PriceLadder::new(side, depth);
    for i in 0..depth as i64 {
        ladder.apply_upsert(price(10_000 - i), Decimal::ONE);
    }
    ladder
}

fn bench_ladder_upsert(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_upsert");

    for depth in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut ladder = filled_ladder(Side::Bid, depth);
            let mut amount = 1i64;

            b.iter(|| {
                // Typical modify of a level inside the window
                amount = amount % 97 + 1;
                ladder.apply_upsert(black_box(price(10_000 - 3)), black_box(Decimal::new(amount, 1)));
            });
        });
    }

    group.finish();
}

fn bench_ladder_evict(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_evict");

    for depth in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let mut ladder = filled_ladder(Side::Bid, depth);
            let mut top = 10_000i64;

            b.iter(|| {
                // Each new best bid pushes the worst level out
                top += 1;
                ladder.apply_upsert(black_box(price(top)), black_box(Decimal::ONE));
            });
        });
    }

    group.finish();
}

fn bench_best_price(c: &mut Criterion) {
    let mut group = c.benchmark_group("ladder_best");

    for depth in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let ladder = filled_ladder(Side::Ask, depth);
            b.iter(|| {
                black_box(ladder.best());
            });
        });
    }

    group.finish();
}

fn bench_decode_line(c: &mut Criterion) {
    let line = "*{u'seq': 311283922}*\
        {u'data': {u'rate': u'0.03245000', u'type': u'ask', u'amount': u'12.5'}, u'type': u'orderBookModify'}*\
        {u'data': {u'rate': u'0.03240000', u'type': u'bid', u'amount': u'1.1'}, u'type': u'orderBookModify'}*\
        {u'data': {u'rate': u'0.03244000', u'type': u'ask'}, u'type': u'orderBookRemove'}*\
        {u'data': {u'tradeID': u'5455034', u'rate': u'0.03245000', u'amount': u'0.5', u'total': u'0.016225', \
          u'date': u'2018-10-16 18:05:19', u'type': u'buy'}, u'type': u'newTrade'}";
    let now = Utc::now();

    c.bench_function("decode_line", |b| {
        b.iter(|| black_box(decode_line_at(black_box(line), now)));
    });
}

fn bench_apply_tick(c: &mut Criterion) {
    let mut book = BookState::new("BENCH", 50, 50);
    let mut sequence = 0u64;

    c.bench_function("apply_tick", |b| {
        b.iter(|| {
            sequence += 1;
            let mut tick = Tick::new(sequence, Utc::now());
            tick.push_book_event(
                Side::Bid,
                BookEvent::Upsert {
                    price: price(10_000 - (sequence % 60) as i64),
                    amount: Decimal::ONE,
                },
            );
            tick.push_book_event(
                Side::Ask,
                BookEvent::Remove {
                    price: price(10_100 + (sequence % 60) as i64),
                },
            );
            black_box(book.apply_tick(&tick).ok());
        });
    });
}

criterion_group!(
    benches,
    bench_ladder_upsert,
    bench_ladder_evict,
    bench_best_price,
    bench_decode_line,
    bench_apply_tick
);
criterion_main!(benches);
