//! 경계별 신호 중복 제거.

use crt_core::{SeriesKey, Signal};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// 시리즈 키 하나의 추적 상태.
#[derive(Debug, Clone, Default)]
pub struct TrackerState {
    /// 마지막으로 방출한 경계
    pub last_boundary: Option<i64>,
    /// 마지막으로 방출한 신호
    pub last_signal: Option<Signal>,
}

/// 시리즈 키별 신호 추적기.
#[derive(Debug, Clone)]
pub struct SignalTracker {
    epsilon: Decimal,
    states: HashMap<SeriesKey, TrackerState>,
}

impl SignalTracker {
    /// 새 추적기를 생성합니다.
    pub fn new(epsilon: Decimal) -> Self {
        Self {
            epsilon,
            states: HashMap::new(),
        }
    }

    /// 후보 신호를 방출해야 하는지 결정하고 상태를 갱신합니다.
    ///
    /// - 후보가 없으면 상태를 초기화하고 `false`
    /// - 경계가 바뀌었으면 항상 `true`
    /// - 같은 경계면 유형이나 레벨이 `epsilon`보다 크게 달라졌을 때만 `true`
    pub fn should_emit(
        &mut self,
        key: &SeriesKey,
        boundary: i64,
        candidate: Option<&Signal>,
    ) -> bool {
        let Some(candidate) = candidate else {
            // 키가 없으면 새로 만들 필요 없음
            if let Some(state) = self.states.get_mut(key) {
                *state = TrackerState::default();
            }
            return false;
        };

        let state = self.states.entry(key.clone()).or_default();
        let emit = match (&state.last_boundary, &state.last_signal) {
            (Some(last), Some(previous)) if *last == boundary => {
                candidate.differs_from(previous, self.epsilon)
            }
            _ => true,
        };

        if emit {
            state.last_boundary = Some(boundary);
            state.last_signal = Some(candidate.clone());
        }
        emit
    }

    /// 키의 현재 상태.
    pub fn state(&self, key: &SeriesKey) -> Option<&TrackerState> {
        self.states.get(key)
    }
}
