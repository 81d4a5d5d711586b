//! CRT 패턴 감지의 트레이딩 신호.
//!
//! 이 모듈은 감지기가 생성하는 신호 관련 타입을 정의합니다:
//! - `SignalKind` - 신호 유형 (돌파 / 매수·매도)
//! - `CandidateSignal` - 가격 레벨 계산 전의 후보 신호
//! - `Signal` - 진입/손절/익절 레벨이 채워진 신호 엔티티
//! - `NoSignalDiagnostic` - 셋업이 없을 때의 관측용 진단

use crate::domain::candle::Candle;
use crate::types::{DecimalExt, Price, SeriesKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 거래 방향.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// 매수
    Buy,
    /// 매도
    Sell,
}

/// 신호 유형.
///
/// 단순 돌파 규칙은 `BreakoutUp/BreakoutDown`을, 단계 검증 규칙은 `Buy/Sell`을 생성합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalKind {
    /// 직전 고가 상향 돌파
    BreakoutUp,
    /// 직전 저가 하향 돌파
    BreakoutDown,
    /// 단계 검증 매수
    Buy,
    /// 단계 검증 매도
    Sell,
}

impl SignalKind {
    /// 이 신호의 거래 방향.
    pub fn side(&self) -> Side {
        match self {
            SignalKind::BreakoutUp | SignalKind::Buy => Side::Buy,
            SignalKind::BreakoutDown | SignalKind::Sell => Side::Sell,
        }
    }
}

impl std::fmt::Display for SignalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignalKind::BreakoutUp => write!(f, "BREAKOUT_UP"),
            SignalKind::BreakoutDown => write!(f, "BREAKOUT_DOWN"),
            SignalKind::Buy => write!(f, "BUY"),
            SignalKind::Sell => write!(f, "SELL"),
        }
    }
}

/// CRT 단계.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CrtPhase {
    /// 매집 (조용한 박스권)
    Accumulation,
    /// 조작 (유동성 함정)
    Manipulation,
    /// 확장/분배 (강한 방향성)
    Expansion,
}

/// 윈도우 내 캔들의 단계 라벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseMark {
    /// 캔들 시작 epoch
    pub start: i64,
    /// 단계
    pub phase: CrtPhase,
}

/// 가격 레벨 계산 전의 후보 신호.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSignal {
    /// 시리즈 키
    pub key: SeriesKey,
    /// 신호 유형
    pub kind: SignalKind,
    /// 기준 캔들 (윈도우의 마지막 캔들)
    pub reference: Candle,
    /// 신호를 트리거한 경계 epoch
    pub boundary: i64,
    /// 윈도우 캔들의 단계 라벨 (오래된 순)
    pub phases: Vec<PhaseMark>,
}

/// 진입/손절/익절 가격 레벨.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Levels {
    /// 진입가
    pub entry: Price,
    /// 손절가
    pub stop_loss: Price,
    /// 익절가
    pub take_profit: Price,
}

/// 방출되는 트레이딩 신호.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// 고유 신호 ID
    pub id: Uuid,
    /// 시리즈 키
    pub key: SeriesKey,
    /// 신호 유형
    #[serde(rename = "type")]
    pub kind: SignalKind,
    /// 기준 캔들
    pub reference_candle: Candle,
    /// 진입가
    pub entry: Price,
    /// 손절가
    pub stop_loss: Price,
    /// 익절가
    pub take_profit: Price,
    /// 신호를 트리거한 경계 epoch
    pub boundary: i64,
    /// 윈도우 캔들의 단계 라벨
    #[serde(default)]
    pub phases: Vec<PhaseMark>,
    /// 신호 생성 타임스탬프
    pub generated_at: DateTime<Utc>,
}

impl Signal {
    /// 후보 신호와 계산된 레벨로 신호를 생성합니다.
    pub fn from_candidate(candidate: CandidateSignal, levels: Levels) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: candidate.key,
            kind: candidate.kind,
            reference_candle: candidate.reference,
            entry: levels.entry,
            stop_loss: levels.stop_loss,
            take_profit: levels.take_profit,
            boundary: candidate.boundary,
            phases: candidate.phases,
            generated_at: Utc::now(),
        }
    }

    /// 거래 방향.
    pub fn side(&self) -> Side {
        self.kind.side()
    }

    /// 유형이 다르거나 수치 필드 중 하나라도 `epsilon`보다 크게 다른지 확인합니다.
    pub fn differs_from(&self, other: &Signal, epsilon: rust_decimal::Decimal) -> bool {
        self.kind != other.kind
            || !self.entry.approx_eq(other.entry, epsilon)
            || !self.stop_loss.approx_eq(other.stop_loss, epsilon)
            || !self.take_profit.approx_eq(other.take_profit, epsilon)
    }

    /// 손익비 (|익절 - 진입| / |진입 - 손절|). 위험이 0이면 `None`.
    pub fn risk_reward(&self) -> Option<rust_decimal::Decimal> {
        let reward = (self.take_profit - self.entry).abs();
        let risk = (self.entry - self.stop_loss).abs();
        reward.checked_ratio(risk)
    }
}

/// 경계에서 패턴이 기각되었을 때의 관측용 진단.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoSignalDiagnostic {
    /// 시리즈 키
    pub key: SeriesKey,
    /// 평가한 경계 epoch
    pub boundary: i64,
    /// 기각 사유
    pub reasons: Vec<String>,
}
