//! 시장 데이터 입력 타입.
//!
//! 이 모듈은 수집 단위가 되는 입력 타입을 정의합니다:
//! - `Sample` - 단일 가격(틱) 또는 하위 캔들 OHLC
//! - `MarketEvent` - 심볼과 epoch가 붙은 검증된 입력
//! - `RawRecord` - 전송 계층이 전달하는 검증 전 와이어 레코드

use crate::error::{IngestError, IngestResult};
use crate::types::Price;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 캔들에 병합되는 가격 샘플.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Sample {
    /// 단일 체결 가격 (틱)
    Price { price: Price },
    /// 하위 타임프레임 캔들
    Ohlc {
        open: Price,
        high: Price,
        low: Price,
        close: Price,
    },
}

impl Sample {
    /// 틱 샘플을 생성합니다.
    pub fn price(price: Price) -> Self {
        Sample::Price { price }
    }

    /// OHLC 샘플을 생성합니다.
    pub fn ohlc(open: Price, high: Price, low: Price, close: Price) -> Self {
        Sample::Ohlc {
            open,
            high,
            low,
            close,
        }
    }

    /// 시가 (틱이면 가격 자체).
    pub fn open(&self) -> Price {
        match self {
            Sample::Price { price } => *price,
            Sample::Ohlc { open, .. } => *open,
        }
    }

    /// 고가 (틱이면 가격 자체).
    pub fn high(&self) -> Price {
        match self {
            Sample::Price { price } => *price,
            Sample::Ohlc { high, .. } => *high,
        }
    }

    /// 저가 (틱이면 가격 자체).
    pub fn low(&self) -> Price {
        match self {
            Sample::Price { price } => *price,
            Sample::Ohlc { low, .. } => *low,
        }
    }

    /// 종가 (틱이면 가격 자체).
    pub fn close(&self) -> Price {
        match self {
            Sample::Price { price } => *price,
            Sample::Ohlc { close, .. } => *close,
        }
    }
}

/// 검증을 통과한 시장 데이터 이벤트.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketEvent {
    /// 거래 심볼
    pub symbol: String,
    /// 이벤트 시각 (epoch 초)
    pub epoch: i64,
    /// 가격 샘플
    pub sample: Sample,
}

impl MarketEvent {
    /// 틱 이벤트를 생성합니다.
    pub fn tick(symbol: impl Into<String>, epoch: i64, price: Price) -> Self {
        Self {
            symbol: symbol.into(),
            epoch,
            sample: Sample::price(price),
        }
    }

    /// 원시 캔들 이벤트를 생성합니다.
    pub fn candle(
        symbol: impl Into<String>,
        epoch: i64,
        open: Price,
        high: Price,
        low: Price,
        close: Price,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            epoch,
            sample: Sample::ohlc(open, high, low, close),
        }
    }
}

/// 전송 계층이 전달하는 검증 전 레코드.
///
/// `{symbol, epoch, open?, high?, low?, close, price?}` 형식입니다.
/// `open/high/low` 중 하나라도 있으면 원시 캔들로, 없으면 `price`(없으면 `close`)를
/// 사용하는 틱으로 해석합니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    #[serde(default)]
    pub symbol: Option<String>,
    #[serde(default)]
    pub epoch: Option<i64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub price: Option<f64>,
}

impl RawRecord {
    /// 레코드를 검증하여 `MarketEvent`로 변환합니다.
    pub fn validate(&self) -> IngestResult<MarketEvent> {
        let symbol = self
            .symbol
            .as_deref()
            .ok_or(IngestError::MissingField("symbol"))?
            .trim();
        if symbol.is_empty() {
            return Err(IngestError::EmptySymbol);
        }

        let epoch = self.epoch.ok_or(IngestError::MissingField("epoch"))?;
        if epoch < 0 {
            return Err(IngestError::NegativeEpoch(epoch));
        }
        if epoch > MAX_EPOCH {
            return Err(IngestError::EpochOutOfRange(epoch));
        }

        let has_ohlc = self.open.is_some() || self.high.is_some() || self.low.is_some();

        let sample = if has_ohlc {
            let open = to_price("open", self.open)?;
            let high = to_price("high", self.high)?;
            let low = to_price("low", self.low)?;
            let close = to_price("close", self.close)?;

            if high < low || high < open.max(close) || low > open.min(close) {
                return Err(IngestError::InconsistentOhlc(format!(
                    "o={} h={} l={} c={}",
                    open, high, low, close
                )));
            }
            Sample::ohlc(open, high, low, close)
        } else {
            let price = match self.price {
                Some(_) => to_price("price", self.price)?,
                None => to_price("close", self.close)?,
            };
            Sample::price(price)
        };

        Ok(MarketEvent {
            symbol: symbol.to_string(),
            epoch,
            sample,
        })
    }
}

/// 허용하는 최대 epoch (9999-12-31 23:59:59 UTC).
pub const MAX_EPOCH: i64 = 253_402_300_799;

/// 허용하는 최대 가격.
///
/// 레벨 계산(범위 × 배수)이 Decimal 범위를 넘지 않도록 입력 단계에서 제한합니다.
pub const MAX_PRICE: f64 = 1e15;

/// f64 와이어 값을 가격으로 변환합니다. 가격은 `0 < value <= MAX_PRICE`여야 합니다.
fn to_price(field: &'static str, value: Option<f64>) -> IngestResult<Price> {
    let value = value.ok_or(IngestError::MissingField(field))?;
    if !value.is_finite() {
        return Err(IngestError::NonFinite { field, value });
    }
    if value <= 0.0 || value > MAX_PRICE {
        return Err(IngestError::OutOfRange { field, value });
    }
    Decimal::from_f64(value).ok_or(IngestError::OutOfRange { field, value })
}
