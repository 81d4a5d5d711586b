//! CRT 패턴 감지 규칙.
//!
//! 두 강도의 규칙을 하나의 태그드 variant로 제공합니다:
//! - `DetectionRule::SimpleBreakout` - 직전 고가/저가 돌파
//! - `DetectionRule::PhaseValidated` - 매집 → 조작 → 확장 단계 검증
//!
//! 규칙은 윈도우를 읽기만 하며 변경하지 않습니다.

use crt_core::{
    CandidateSignal, Candle, CrtPhase, PhaseMark, PipelineConfig, RuleKind, SeriesKey, SignalKind,
    Timeframe,
};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 윈도우 평가 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evaluation {
    /// 윈도우가 아직 N개 미만
    Insufficient { have: usize, need: usize },
    /// 셋업 감지
    Signal(CandidateSignal),
    /// 셋업 없음 (정상적인 결과)
    Rejected { reasons: Vec<String> },
}

impl Evaluation {
    /// 후보 신호만 꺼냅니다.
    pub fn into_candidate(self) -> Option<CandidateSignal> {
        match self {
            Evaluation::Signal(candidate) => Some(candidate),
            _ => None,
        }
    }
}

/// 단계 검증 규칙의 임계값.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseThresholds {
    /// 매집 캔들의 최대 몸통 비율
    pub accumulation_threshold: Decimal,
    /// 조작 캔들의 최소 역방향 꼬리 비율 (초과해야 통과)
    pub manipulation_wick_ratio: Decimal,
    /// 확장 캔들의 기본 최소 몸통 비율
    pub expansion_threshold: Decimal,
    /// 타임프레임별 확장 임계값
    pub expansion_overrides: HashMap<Timeframe, Decimal>,
    /// 확장 캔들의 최대 꼬리 비율
    pub max_wick_ratio: Decimal,
}

impl PhaseThresholds {
    fn expansion_for(&self, timeframe: Timeframe) -> Decimal {
        self.expansion_overrides
            .get(&timeframe)
            .copied()
            .unwrap_or(self.expansion_threshold)
    }
}

impl From<&PipelineConfig> for PhaseThresholds {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            accumulation_threshold: config.accumulation_threshold,
            manipulation_wick_ratio: config.manipulation_wick_ratio,
            expansion_threshold: config.expansion_threshold,
            expansion_overrides: config.expansion_threshold_overrides.clone(),
            max_wick_ratio: config.max_wick_ratio,
        }
    }
}

/// 패턴 감지 규칙.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectionRule {
    /// 직전 고가/저가 단순 돌파
    SimpleBreakout,
    /// 매집 → 조작 → 확장 단계 검증
    PhaseValidated(PhaseThresholds),
}

impl DetectionRule {
    /// 설정에서 규칙을 생성합니다.
    pub fn from_config(config: &PipelineConfig) -> Self {
        match config.rule {
            RuleKind::SimpleBreakout => DetectionRule::SimpleBreakout,
            RuleKind::PhaseValidated => DetectionRule::PhaseValidated(config.into()),
        }
    }

    /// 윈도우(오래된 순)를 평가합니다.
    ///
    /// `boundary`는 신호에 기록될 경계 epoch입니다.
    pub fn evaluate(&self, key: &SeriesKey, window: &[Candle], boundary: i64) -> Evaluation {
        let Some((last, previous)) = window.split_last() else {
            return Evaluation::Insufficient { have: 0, need: 2 };
        };
        if previous.is_empty() {
            return Evaluation::Insufficient { have: 1, need: 2 };
        }

        let kind = match self {
            DetectionRule::SimpleBreakout => simple_breakout(last, previous),
            DetectionRule::PhaseValidated(thresholds) => {
                phase_validated(thresholds, key.timeframe, last, previous)
            }
        };

        match kind {
            Ok(kind) => Evaluation::Signal(CandidateSignal {
                key: key.clone(),
                kind,
                reference: last.clone(),
                boundary,
                phases: phase_marks(window),
            }),
            Err(reasons) => Evaluation::Rejected { reasons },
        }
    }
}

/// 윈도우 캔들에 단계 라벨을 붙입니다.
///
/// 마지막은 확장, 그 직전은 조작, 나머지는 매집입니다.
pub fn phase_marks(window: &[Candle]) -> Vec<PhaseMark> {
    let len = window.len();
    window
        .iter()
        .enumerate()
        .map(|(i, candle)| {
            let phase = if i + 1 == len {
                CrtPhase::Expansion
            } else if i + 2 == len {
                CrtPhase::Manipulation
            } else {
                CrtPhase::Accumulation
            };
            PhaseMark {
                start: candle.start,
                phase,
            }
        })
        .collect()
}

fn simple_breakout(last: &Candle, previous: &[Candle]) -> Result<SignalKind, Vec<String>> {
    let prev_high = previous.iter().map(|c| c.high).max().unwrap_or(last.high);
    let prev_low = previous.iter().map(|c| c.low).min().unwrap_or(last.low);

    if last.close > prev_high {
        Ok(SignalKind::BreakoutUp)
    } else if last.close < prev_low {
        Ok(SignalKind::BreakoutDown)
    } else {
        Err(vec![format!(
            "No breakout: close {} within previous range [{}, {}]",
            last.close, prev_low, prev_high
        )])
    }
}

fn phase_validated(
    thresholds: &PhaseThresholds,
    timeframe: Timeframe,
    last: &Candle,
    previous: &[Candle],
) -> Result<SignalKind, Vec<String>> {
    let mut reasons = Vec::new();

    for candle in previous {
        check_accumulation(thresholds, candle, &mut reasons);
    }
    if let Some(manipulation) = previous.last() {
        check_manipulation(thresholds, manipulation, &mut reasons);
    }
    check_expansion(thresholds.expansion_for(timeframe), thresholds, last, &mut reasons);

    if !reasons.is_empty() {
        return Err(reasons);
    }

    if last.close > last.open {
        Ok(SignalKind::Buy)
    } else {
        Ok(SignalKind::Sell)
    }
}

fn check_accumulation(thresholds: &PhaseThresholds, candle: &Candle, reasons: &mut Vec<String>) {
    if candle.range().is_zero() {
        reasons.push(format!("Accumulation candle {} is flat", candle.start));
        return;
    }
    match candle.body_ratio() {
        Some(ratio) if ratio <= thresholds.accumulation_threshold => {}
        Some(ratio) => reasons.push(format!(
            "Accumulation candle {} body ratio {} > {}",
            candle.start,
            ratio.round_dp(6),
            thresholds.accumulation_threshold
        )),
        None => reasons.push(format!("Accumulation candle {} has zero open", candle.start)),
    }
}

fn check_manipulation(thresholds: &PhaseThresholds, candle: &Candle, reasons: &mut Vec<String>) {
    let (Some(upper), Some(lower)) = (candle.upper_wick_ratio(), candle.lower_wick_ratio()) else {
        reasons.push(format!("Manipulation candle {} is flat", candle.start));
        return;
    };

    // 몸통 반대편 꼬리
    let wick = if candle.is_bullish() {
        lower
    } else if candle.is_bearish() {
        upper
    } else {
        upper.max(lower)
    };

    if wick <= thresholds.manipulation_wick_ratio {
        reasons.push(format!(
            "No liquidity sweep: candle {} opposing wick ratio {} <= {}",
            candle.start,
            wick.round_dp(4),
            thresholds.manipulation_wick_ratio
        ));
    }
}

fn check_expansion(
    threshold: Decimal,
    thresholds: &PhaseThresholds,
    candle: &Candle,
    reasons: &mut Vec<String>,
) {
    let (Some(upper), Some(lower)) = (candle.upper_wick_ratio(), candle.lower_wick_ratio()) else {
        reasons.push(format!(
            "Body too small: expansion candle {} is flat",
            candle.start
        ));
        return;
    };

    match candle.body_ratio() {
        Some(ratio) if ratio >= threshold => {}
        Some(ratio) => reasons.push(format!(
            "Body too small: ratio {} < {}",
            ratio.round_dp(6),
            threshold
        )),
        None => reasons.push(format!(
            "Body too small: expansion candle {} has zero open",
            candle.start
        )),
    }

    if upper > thresholds.max_wick_ratio {
        reasons.push(format!(
            "Upper wick too large: {} > {}",
            upper.round_dp(4),
            thresholds.max_wick_ratio
        ));
    }
    if lower > thresholds.max_wick_ratio {
        reasons.push(format!(
            "Lower wick too large: {} > {}",
            lower.round_dp(4),
            thresholds.max_wick_ratio
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn key(tf: Timeframe) -> SeriesKey {
        SeriesKey::new("R_75", tf)
    }

    fn candle(start: i64, open: Decimal, high: Decimal, low: Decimal, close: Decimal) -> Candle {
        Candle {
            key: key(Timeframe::H1),
            start,
            open,
            high,
            low,
            close,
            closed: true,
        }
    }

    fn phase_rule() -> DetectionRule {
        DetectionRule::from_config(&PipelineConfig::default())
    }

    /// 매집 → 하단 스윕 → 강한 양봉
    fn bullish_setup() -> Vec<Candle> {
        vec![
            candle(0, dec!(100), dec!(100.3), dec!(99.8), dec!(100.1)),
            candle(3_600, dec!(100.1), dec!(100.3), dec!(99.0), dec!(100.2)),
            candle(7_200, dec!(100.2), dec!(101.3), dec!(100.1), dec!(101.2)),
        ]
    }

    #[test]
    fn test_simple_breakout_up() {
        let window = vec![
            candle(0, dec!(9.5), dec!(10), dec!(9), dec!(9.5)),
            candle(60, dec!(10), dec!(12), dec!(8), dec!(10)),
            candle(120, dec!(12), dec!(13.5), dec!(11.5), dec!(13)),
        ];
        let eval = DetectionRule::SimpleBreakout.evaluate(&key(Timeframe::M1), &window, 120);
        let candidate = eval.into_candidate().unwrap();

        assert_eq!(candidate.kind, SignalKind::BreakoutUp);
        assert_eq!(candidate.reference.start, 120);
        assert_eq!(candidate.boundary, 120);
    }

    #[test]
    fn test_simple_breakout_down_and_inside() {
        let mut window = vec![
            candle(0, dec!(9.5), dec!(10), dec!(9), dec!(9.5)),
            candle(60, dec!(10), dec!(12), dec!(8), dec!(10)),
            candle(120, dec!(9), dec!(9), dec!(7), dec!(7.5)),
        ];
        let rule = DetectionRule::SimpleBreakout;
        let eval = rule.evaluate(&key(Timeframe::M1), &window, 120);
        assert_eq!(eval.into_candidate().unwrap().kind, SignalKind::BreakoutDown);

        window[2].close = dec!(11);
        assert!(matches!(
            rule.evaluate(&key(Timeframe::M1), &window, 120),
            Evaluation::Rejected { .. }
        ));
    }

    #[test]
    fn test_phase_validated_buy() {
        let window = bullish_setup();
        let candidate = phase_rule()
            .evaluate(&key(Timeframe::H1), &window, 7_200)
            .into_candidate()
            .unwrap();

        assert_eq!(candidate.kind, SignalKind::Buy);
        let phases: Vec<CrtPhase> = candidate.phases.iter().map(|m| m.phase).collect();
        assert_eq!(
            phases,
            vec![
                CrtPhase::Accumulation,
                CrtPhase::Manipulation,
                CrtPhase::Expansion
            ]
        );
    }

    #[test]
    fn test_phase_validated_sell() {
        let window = vec![
            candle(0, dec!(100), dec!(100.2), dec!(99.7), dec!(99.9)),
            candle(3_600, dec!(99.9), dec!(101.0), dec!(99.7), dec!(99.8)),
            candle(7_200, dec!(99.8), dec!(99.9), dec!(98.6), dec!(98.7)),
        ];
        let candidate = phase_rule()
            .evaluate(&key(Timeframe::H1), &window, 7_200)
            .into_candidate()
            .unwrap();
        assert_eq!(candidate.kind, SignalKind::Sell);
    }

    #[test]
    fn test_reject_on_flat_body() {
        let mut window = bullish_setup();
        // body ratio 0.001
        window[2] = candle(7_200, dec!(100), dec!(100.12), dec!(99.98), dec!(100.1));

        let eval = phase_rule().evaluate(&key(Timeframe::H1), &window, 7_200);
        match eval {
            Evaluation::Rejected { reasons } => {
                assert!(reasons.iter().any(|r| r.contains("Body too small")));
            }
            other => panic!("기각되어야 함: {:?}", other),
        }
    }

    #[test]
    fn test_flat_candles_fail_without_panic() {
        let flat = candle(0, dec!(100), dec!(100), dec!(100), dec!(100));
        let window = vec![flat.clone(), flat.clone(), flat];

        let Evaluation::Rejected { reasons } =
            phase_rule().evaluate(&key(Timeframe::H1), &window, 0)
        else {
            panic!("평평한 캔들은 기각되어야 함");
        };
        assert!(reasons.iter().any(|r| r.contains("Accumulation")));
        assert!(reasons.iter().any(|r| r.contains("Manipulation")));
        assert!(reasons.iter().any(|r| r.contains("Body too small")));
    }

    #[test]
    fn test_zero_open_fails_check() {
        let mut window = bullish_setup();
        window[0] = candle(0, dec!(0), dec!(1), dec!(0), dec!(0.5));
        let eval = phase_rule().evaluate(&key(Timeframe::H1), &window, 7_200);
        assert!(matches!(eval, Evaluation::Rejected { .. }));
    }

    #[test]
    fn test_timeframe_expansion_override() {
        // body ratio ~0.0042: 1h 기준(0.004) 통과, 4h 기준(0.0045) 실패
        let window = vec![
            candle(0, dec!(100), dec!(100.3), dec!(99.8), dec!(100.1)),
            candle(3_600, dec!(100.1), dec!(100.3), dec!(99.0), dec!(100.2)),
            candle(7_200, dec!(100.2), dec!(100.7), dec!(100.1), dec!(100.62)),
        ];
        let rule = phase_rule();
        assert!(matches!(
            rule.evaluate(&key(Timeframe::H1), &window, 7_200),
            Evaluation::Signal(_)
        ));
        assert!(matches!(
            rule.evaluate(&key(Timeframe::H4), &window, 7_200),
            Evaluation::Rejected { .. }
        ));
    }

    #[test]
    fn test_insufficient_window() {
        let window = bullish_setup();
        assert_eq!(
            phase_rule().evaluate(&key(Timeframe::H1), &window[..1], 0),
            Evaluation::Insufficient { have: 1, need: 2 }
        );
    }

    #[test]
    fn test_phase_marks_two_candles() {
        let window = bullish_setup();
        let marks = phase_marks(&window[1..]);
        assert_eq!(marks[0].phase, CrtPhase::Manipulation);
        assert_eq!(marks[1].phase, CrtPhase::Expansion);
    }

    fn rejection_reasons(window: &[Candle]) -> Vec<String> {
        match phase_rule().evaluate(&key(Timeframe::H1), window, 7_200) {
            Evaluation::Rejected { reasons } => reasons,
            other => panic!("기각되어야 함: {:?}", other),
        }
    }

    fn signal_kind(window: &[Candle]) -> SignalKind {
        phase_rule()
            .evaluate(&key(Timeframe::H1), window, 7_200)
            .into_candidate()
            .map(|c| c.kind)
            .unwrap_or_else(|| panic!("신호가 나와야 함: {:?}", window))
    }

    // ------------------------------------------------------------------
    // 조작(manipulation) 캔들
    // ------------------------------------------------------------------

    #[test]
    fn test_manipulation_wick_at_threshold_rejects() {
        let mut window = bullish_setup();
        // 하단 꼬리 0.2 / 범위 0.4 = 정확히 0.5
        window[1] = candle(3_600, dec!(100.1), dec!(100.3), dec!(99.9), dec!(100.2));

        let reasons = rejection_reasons(&window);
        assert_eq!(reasons.len(), 1, "{:?}", reasons);
        assert!(reasons[0].contains("No liquidity sweep"));

        // 0.5를 넘으면 통과
        window[1].low = dec!(99.89);
        assert_eq!(signal_kind(&window), SignalKind::Buy);
    }

    #[test]
    fn test_bearish_manipulation_uses_upper_wick() {
        let mut window = bullish_setup();
        // 음봉: 상단 꼬리 0.4 / 범위 0.6
        window[1] = candle(3_600, dec!(100.2), dec!(100.6), dec!(100.0), dec!(100.1));
        assert_eq!(signal_kind(&window), SignalKind::Buy);

        // 음봉의 하단 꼬리만 긴 경우는 스윕이 아님
        window[1] = candle(3_600, dec!(100.2), dec!(100.3), dec!(99.0), dec!(100.1));
        let reasons = rejection_reasons(&window);
        assert_eq!(reasons.len(), 1, "{:?}", reasons);
        assert!(reasons[0].contains("No liquidity sweep"));
    }

    #[test]
    fn test_doji_manipulation_uses_larger_wick() {
        let mut window = bullish_setup();
        window[1] = candle(3_600, dec!(100.1), dec!(100.2), dec!(99.0), dec!(100.1));
        assert_eq!(signal_kind(&window), SignalKind::Buy);

        // 양쪽 꼬리가 모두 0.5
        window[1] = candle(3_600, dec!(100.1), dec!(100.6), dec!(99.6), dec!(100.1));
        let reasons = rejection_reasons(&window);
        assert!(reasons.iter().any(|r| r.contains("No liquidity sweep")));
    }

    // ------------------------------------------------------------------
    // 확장(expansion) 캔들 / 경계값
    // ------------------------------------------------------------------

    #[test]
    fn test_expansion_upper_wick_too_large() {
        let mut window = bullish_setup();
        // 몸통 비율 ~0.00998, 상단 꼬리 0.6 / 1.6 = 0.375
        window[2] = candle(7_200, dec!(100.2), dec!(101.8), dec!(100.2), dec!(101.2));

        let reasons = rejection_reasons(&window);
        assert_eq!(reasons.len(), 1, "{:?}", reasons);
        assert!(reasons[0].contains("Upper wick too large"));
        assert!(!reasons.iter().any(|r| r.contains("Body too small")));
    }

    #[test]
    fn test_thresholds_are_inclusive() {
        let mut window = bullish_setup();
        // 매집 몸통 0.2 / 100 = 정확히 0.002
        window[0] = candle(0, dec!(100), dec!(100.3), dec!(99.8), dec!(100.2));
        // 확장 몸통 0.4 / 100 = 정확히 0.004, 꼬리 각 0.1
        window[2] = candle(7_200, dec!(100), dec!(100.45), dec!(99.95), dec!(100.4));
        assert_eq!(signal_kind(&window), SignalKind::Buy);

        let mut over = window.clone();
        over[0].close = dec!(100.21);
        let reasons = rejection_reasons(&over);
        assert!(reasons.iter().any(|r| r.contains("Accumulation")), "{:?}", reasons);

        let mut under = window;
        under[2].close = dec!(100.39);
        let reasons = rejection_reasons(&under);
        assert!(reasons.iter().any(|r| r.contains("Body too small")), "{:?}", reasons);
    }

    #[test]
    fn test_expansion_threshold_per_timeframe() {
        let thresholds = PhaseThresholds::from(&PipelineConfig::default());
        assert_eq!(thresholds.expansion_for(Timeframe::M1), dec!(0.004));
        assert_eq!(thresholds.expansion_for(Timeframe::H1), dec!(0.004));
        assert_eq!(thresholds.expansion_for(Timeframe::H4), dec!(0.0045));
    }
}
