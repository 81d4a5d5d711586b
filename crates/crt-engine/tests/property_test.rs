//! 캔들 집계 불변식 속성 테스트.
//!
//! proptest로 검증하는 항목:
//! 1. 경계 정렬 - 모든 epoch에 대해 `start == e - (e mod timeframe)`
//! 2. 고가/저가 단조성 - 한 경계 안의 모든 가격을 고가/저가가 감쌈
//! 3. 같은 틱 반복 - 고가/저가는 변하지 않고 종가만 덮어씀

use crt_core::{Sample, SeriesKey, Timeframe};
use crt_engine::CandleAggregator;
use proptest::prelude::*;
use rust_decimal::Decimal;

// ── Strategies ──────────────────────────────────────────────────────

fn arb_timeframe() -> impl Strategy<Value = Timeframe> {
    prop::sample::select(Timeframe::ALL.to_vec())
}

fn arb_price() -> impl Strategy<Value = Decimal> {
    (1_i64..10_000_000).prop_map(|cents| Decimal::new(cents, 4))
}

// ── 1. 경계 정렬 ────────────────────────────────────────────────────

proptest! {
    #[test]
    fn boundary_alignment(epoch in 0_i64..4_000_000_000, tf in arb_timeframe()) {
        let mut agg = CandleAggregator::new(10);
        agg.ingest("R_75", tf, epoch, &Sample::price(Decimal::ONE));

        let key = SeriesKey::new("R_75", tf);
        let candle = agg.forming(&key).unwrap();
        prop_assert_eq!(candle.start, epoch - epoch % tf.as_secs());
        prop_assert!(candle.start <= epoch && epoch < candle.end());
    }
}

// ── 2. 고가/저가 단조성 ─────────────────────────────────────────────

proptest! {
    #[test]
    fn high_low_cover_all_prices(
        prices in prop::collection::vec(arb_price(), 1..64),
        offsets in prop::collection::vec(0_i64..3_600, 64),
    ) {
        let tf = Timeframe::H1;
        let base = 3_600 * 1_000;
        let mut agg = CandleAggregator::new(10);

        for (price, offset) in prices.iter().zip(offsets.iter()) {
            let closed = agg.ingest("R_75", tf, base + offset, &Sample::price(*price));
            prop_assert!(closed.is_none());
        }

        let candle = agg.forming(&SeriesKey::new("R_75", tf)).unwrap();
        for price in &prices {
            prop_assert!(candle.high >= *price);
            prop_assert!(candle.low <= *price);
        }
        prop_assert_eq!(candle.open, prices[0]);
        prop_assert_eq!(candle.close, *prices.last().unwrap());
    }
}

// ── 3. 같은 틱 반복 ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn repeated_tick_keeps_extremes(
        prices in prop::collection::vec(arb_price(), 2..32),
        pick in any::<prop::sample::Index>(),
    ) {
        let tf = Timeframe::M1;
        let key = SeriesKey::new("R_75", tf);
        let mut agg = CandleAggregator::new(10);
        for price in &prices {
            agg.ingest("R_75", tf, 60, &Sample::price(*price));
        }
        let before = agg.forming(&key).unwrap().clone();

        let repeated = prices[pick.index(prices.len())];
        agg.ingest("R_75", tf, 60, &Sample::price(repeated));
        agg.ingest("R_75", tf, 60, &Sample::price(repeated));
        let after = agg.forming(&key).unwrap();

        prop_assert_eq!(after.high, before.high);
        prop_assert_eq!(after.low, before.low);
        // 종가는 반복 재생에 안전하지 않음
        prop_assert_eq!(after.close, repeated);
    }
}
