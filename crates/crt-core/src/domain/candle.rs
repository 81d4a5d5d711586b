//! 캔들(OHLC 바) 엔티티.
//!
//! 캔들은 하나의 시리즈 키와 정렬된 시작 시각(`start`)에 묶이며,
//! 같은 기간에 들어온 틱/하위 캔들이 병합됩니다.

use crate::domain::market_data::Sample;
use crate::types::{DecimalExt, Price, SeriesKey};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 타임프레임 정렬 OHLC 캔들.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    /// 시리즈 키 (심볼 × 타임프레임)
    pub key: SeriesKey,
    /// 기간 시작 epoch (타임프레임 경계에 정렬)
    pub start: i64,
    /// 시가 (기간의 첫 샘플에서 한 번만 설정)
    pub open: Price,
    /// 고가
    pub high: Price,
    /// 저가
    pub low: Price,
    /// 종가 (가장 최근 샘플)
    pub close: Price,
    /// 마감 여부
    pub closed: bool,
}

impl Candle {
    /// 첫 샘플로 새 캔들을 엽니다.
    ///
    /// `start`는 호출자가 이미 경계에 정렬했다고 가정합니다.
    pub fn open_with(key: SeriesKey, start: i64, sample: &Sample) -> Self {
        Self {
            key,
            start,
            open: sample.open(),
            high: sample.high(),
            low: sample.low(),
            close: sample.close(),
            closed: false,
        }
    }

    /// 같은 기간의 샘플을 병합합니다.
    ///
    /// 시가는 유지하고, 고가/저가는 단조롭게 확장하며, 종가는 덮어씁니다.
    pub fn merge(&mut self, sample: &Sample) {
        self.high = self.high.max(sample.high());
        self.low = self.low.min(sample.low());
        self.close = sample.close();
    }

    /// 캔들을 마감 처리합니다.
    pub fn finalize(&mut self) {
        self.closed = true;
    }

    /// 기간 종료 epoch (다음 경계).
    pub fn end(&self) -> i64 {
        self.start + self.key.timeframe.as_secs()
    }

    /// 캔들 몸통 크기(절대값)를 반환합니다.
    pub fn body_size(&self) -> Decimal {
        (self.close - self.open).abs()
    }

    /// 캔들 범위(고가 - 저가)를 반환합니다.
    pub fn range(&self) -> Decimal {
        self.high - self.low
    }

    /// 상단 꼬리 크기
    pub fn upper_wick(&self) -> Decimal {
        self.high - self.close.max(self.open)
    }

    /// 하단 꼬리 크기
    pub fn lower_wick(&self) -> Decimal {
        self.close.min(self.open) - self.low
    }

    /// 양봉(종가 > 시가)인지 확인합니다.
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// 음봉(종가 < 시가)인지 확인합니다.
    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }

    /// 몸통 비율 `|close - open| / open`.
    ///
    /// 시가가 0이면 `None`.
    pub fn body_ratio(&self) -> Option<Decimal> {
        self.body_size().checked_ratio(self.open)
    }

    /// 상단 꼬리가 전체 범위에서 차지하는 비율. 범위가 0이면 `None`.
    pub fn upper_wick_ratio(&self) -> Option<Decimal> {
        self.upper_wick().checked_ratio(self.range())
    }

    /// 하단 꼬리가 전체 범위에서 차지하는 비율. 범위가 0이면 `None`.
    pub fn lower_wick_ratio(&self) -> Option<Decimal> {
        self.lower_wick().checked_ratio(self.range())
    }
}
