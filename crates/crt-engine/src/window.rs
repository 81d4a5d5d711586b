//! 시리즈 키별 고정 크기 패턴 윈도우.

use crate::rules::{DetectionRule, Evaluation};
use crt_core::{CandidateSignal, Candle, SeriesKey};
use std::collections::{HashMap, VecDeque};

/// 마감 캔들 N개를 보관하는 FIFO 윈도우 집합.
#[derive(Debug, Clone)]
pub struct PatternWindow {
    size: usize,
    rule: DetectionRule,
    windows: HashMap<SeriesKey, VecDeque<Candle>>,
}

impl PatternWindow {
    /// 새 윈도우 집합을 생성합니다. `size`는 2 이상이어야 합니다.
    pub fn new(size: usize, rule: DetectionRule) -> Self {
        Self {
            size: size.max(2),
            rule,
            windows: HashMap::new(),
        }
    }

    /// 윈도우 크기 N.
    pub fn size(&self) -> usize {
        self.size
    }

    /// 사용 중인 규칙.
    pub fn rule(&self) -> &DetectionRule {
        &self.rule
    }

    /// 마감 캔들을 윈도우에 추가합니다. 넘치면 가장 오래된 캔들을 버립니다.
    pub fn push(&mut self, key: &SeriesKey, candle: Candle) {
        let window = self
            .windows
            .entry(key.clone())
            .or_insert_with(|| VecDeque::with_capacity(self.size + 1));
        window.push_back(candle);
        while window.len() > self.size {
            window.pop_front();
        }
    }

    /// 현재 윈도우 (오래된 순).
    pub fn window(&self, key: &SeriesKey) -> Vec<Candle> {
        self.windows
            .get(key)
            .map(|w| w.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 저장된 윈도우를 평가합니다.
    pub fn evaluate(&self, key: &SeriesKey, boundary: i64) -> Evaluation {
        let window = self.window(key);
        if window.len() < self.size {
            return Evaluation::Insufficient {
                have: window.len(),
                need: self.size,
            };
        }
        self.rule.evaluate(key, &window, boundary)
    }

    /// 마감 캔들 N-1개와 형성 중인 캔들로 윈도우를 구성해 평가합니다.
    pub fn evaluate_with_forming(
        &self,
        key: &SeriesKey,
        forming: &Candle,
        boundary: i64,
    ) -> Evaluation {
        let closed = self.window(key);
        let skip = closed.len().saturating_sub(self.size - 1);
        let mut window: Vec<Candle> = closed.into_iter().skip(skip).collect();
        window.push(forming.clone());

        if window.len() < self.size {
            return Evaluation::Insufficient {
                have: window.len(),
                need: self.size,
            };
        }
        self.rule.evaluate(key, &window, boundary)
    }

    /// 마감 캔들을 추가하고 경계(캔들 시작)에서 평가합니다.
    pub fn close_and_evaluate(&mut self, key: &SeriesKey, candle: Candle) -> Evaluation {
        let boundary = candle.start;
        self.push(key, candle);
        self.evaluate(key, boundary)
    }

    /// 마감 캔들을 추가하고 후보 신호가 있으면 반환합니다.
    pub fn on_candle_closed(&mut self, key: &SeriesKey, candle: Candle) -> Option<CandidateSignal> {
        self.close_and_evaluate(key, candle).into_candidate()
    }
}
