//! 진입/손절/익절 가격 레벨 계산.

use crt_core::{Candle, LevelConfig, Levels, Side, TargetMode};

/// 기준 캔들에서 가격 레벨을 계산합니다.
///
/// - `entry = close`, `buffer = (high - low) × sl_ratio`
/// - 매수: `stop_loss = entry - buffer`
/// - 매도: `stop_loss = entry + buffer`
/// - 익절은 `TargetMode`에 따라 범위 배수 또는 위험 배수로 계산합니다.
///
/// 중간 계산이 Decimal 범위를 넘으면 `None`을 반환합니다.
pub fn compute_levels(side: Side, reference: &Candle, config: &LevelConfig) -> Option<Levels> {
    let entry = reference.close;
    let range = reference.high.checked_sub(reference.low)?;
    let buffer = range.checked_mul(config.sl_ratio)?;

    let stop_loss = match side {
        Side::Buy => entry.checked_sub(buffer)?,
        Side::Sell => entry.checked_add(buffer)?,
    };

    let reward = match config.target {
        TargetMode::RangeRatio { tp_ratio } => range.checked_mul(tp_ratio)?,
        TargetMode::RewardMultiple { reward_ratio } => entry
            .checked_sub(stop_loss)?
            .abs()
            .checked_mul(reward_ratio)?,
    };

    let take_profit = match side {
        Side::Buy => entry.checked_add(reward)?,
        Side::Sell => entry.checked_sub(reward)?,
    };

    Some(Levels {
        entry,
        stop_loss,
        take_profit,
    })
}
