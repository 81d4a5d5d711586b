//! 시리즈 키 정의.
//!
//! 파이프라인의 모든 상태는 `(심볼, 타임프레임)` 쌍 단위로 소유됩니다.

use crate::types::Timeframe;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 캔들 시리즈를 식별하는 키 (심볼 × 타임프레임).
///
/// 같은 심볼이라도 타임프레임이 다르면 서로 독립된 상태를 가집니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    /// 거래 심볼 (예: R_75, BTCUSDT)
    pub symbol: String,
    /// 타임프레임
    pub timeframe: Timeframe,
}

impl SeriesKey {
    /// 새 시리즈 키를 생성합니다.
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
        }
    }

    /// 주어진 epoch가 속한 이 시리즈의 경계(기간 시작)를 반환합니다.
    pub fn boundary_of(&self, epoch: i64) -> i64 {
        self.timeframe.align(epoch)
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.symbol, self.timeframe)
    }
}
