use chrono::{TimeZone, Utc};
use poloniex_book::orderbook::{LadderChange, PriceLadder, TradeRing};
use poloniex_book::types::{BookEvent, PriceLevel, Side, TradeRecord, TradeSide};
use proptest::prelude::*;
use rust_decimal::Decimal;

proptest! {
    #[test]
    fn ladder_invariants_hold(
        side in any_side(),
        max_depth in 0usize..12,
        events in prop::collection::vec(any_event(), 1..2000),
    ) {
        let mut ladder = PriceLadder::new(side, max_depth);

        for event in &events {
            ladder.apply(event);
            prop_assert_eq!(ladder.check_invariants(), Ok(()));
            prop_assert!(ladder.depth() <= max_depth);

            let sum: Decimal = ladder.levels().map(|l| l.amount).sum();
            prop_assert_eq!(ladder.aggregate_volume(), sum);
        }
    }

    #[test]
    fn best_is_extreme_of_held_levels(
        side in any_side(),
        events in prop::collection::vec(any_event(), 1..500),
    ) {
        let mut ladder = PriceLadder::new(side, 8);
        for event in &events {
            ladder.apply(event);
        }

        let prices: Vec<Decimal> = ladder.levels().map(|l| l.price).collect();
        let expected = match side {
            Side::Bid => prices.iter().max().copied(),
            Side::Ask => prices.iter().min().copied(),
        };
        prop_assert_eq!(ladder.best().map(|l| l.price), expected);
        // levels() is best first
        prop_assert!(prices.windows(2).all(|w| side.is_better(w[0], w[1])));
    }

    #[test]
    fn bootstrap_sums_exactly(levels in prop::collection::btree_map(1i64..10_000, 1i64..10_000, 0..10)) {
        let input: Vec<PriceLevel> = levels
            .iter()
            .map(|(&p, &a)| PriceLevel::new(Decimal::new(p, 2), Decimal::new(a, 4)))
            .collect();
        let expected: Decimal = input.iter().map(|l| l.amount).sum();

        let ladder = PriceLadder::bootstrap(Side::Ask, input.clone(), 10).unwrap();
        prop_assert_eq!(ladder.depth(), input.len());
        prop_assert_eq!(ladder.aggregate_volume(), expected);
    }

    #[test]
    fn full_ladder_evicts_only_for_better_prices(
        side in any_side(),
        price in 1i64..200,
        amount in 1i64..100,
    ) {
        let levels = (0..5).map(|i| PriceLevel::new(Decimal::from(100 + i * 10), Decimal::ONE));
        let mut ladder = PriceLadder::bootstrap(side, levels, 5).unwrap();
        let boundary = ladder.boundary().unwrap();
        let price = Decimal::from(price);

        let already_held = ladder.contains(price);
        let change = ladder.apply_upsert(price, Decimal::from(amount));
        prop_assert_eq!(ladder.depth(), 5);

        if already_held {
            prop_assert_eq!(change, LadderChange::Updated { previous: Decimal::ONE });
            return Ok(());
        }
        if side.is_better(price, boundary.price) {
            prop_assert_eq!(change, LadderChange::Replaced { evicted: boundary });
            prop_assert!(!ladder.contains(boundary.price));
        } else {
            prop_assert_eq!(change, LadderChange::Ignored);
            prop_assert!(!ladder.contains(price));
        }
    }

    #[test]
    fn ring_invariants_hold(
        max_depth in 0usize..20,
        ids in prop::collection::vec(0u64..40, 0..500),
    ) {
        let mut ring = TradeRing::new(max_depth);
        for (i, id) in ids.iter().enumerate() {
            ring.record(trade(*id, i as i64));
            prop_assert_eq!(ring.check_invariants(), Ok(()));
            prop_assert_eq!(ring.len(), (i + 1).min(max_depth));
        }

        // Only the newest max_depth ids remain reachable
        let kept = &ids[ids.len().saturating_sub(max_depth)..];
        for id in &ids {
            prop_assert_eq!(ring.contains(*id), kept.contains(id));
        }
    }
}

fn trade(id: u64, offset: i64) -> TradeRecord {
    TradeRecord::new(
        id,
        Utc.timestamp_opt(1_500_000_000 + offset, 0).unwrap(),
        Decimal::ONE,
        Decimal::ONE,
        Decimal::ONE,
        TradeSide::Buy,
    )
}

fn any_event() -> impl Strategy<Value = BookEvent> {
    // A narrow price range so removes and updates hit existing levels
    prop_oneof![
        3 => (1i64..60, 0i64..500).prop_map(|(p, a)| BookEvent::Upsert {
            price: Decimal::new(p, 1),
            amount: Decimal::new(a, 3),
        }),
        1 => (1i64..60).prop_map(|p| BookEvent::Remove {
            price: Decimal::new(p, 1),
        }),
    ]
}

fn any_side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Bid), Just(Side::Ask)]
}
