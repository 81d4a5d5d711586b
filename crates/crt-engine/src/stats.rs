//! 파이프라인 통계 구조체.

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;

/// 파이프라인 처리 통계.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    /// 수집된 이벤트 수
    pub events_ingested: u64,
    /// 검증 실패로 폐기된 레코드 수
    pub malformed_dropped: u64,
    /// 지난 경계라서 폐기된 이벤트 수 (시리즈 단위)
    pub late_dropped: u64,
    /// 마감된 캔들 수
    pub candles_closed: u64,
    /// 패턴 평가 횟수 (윈도우가 찬 경우만)
    pub evaluations: u64,
    /// 셋업 없음으로 끝난 평가 수
    pub rejections: u64,
    /// 방출된 신호 수
    pub signals_emitted: u64,
    /// 중복으로 억제된 신호 수
    pub signals_suppressed: u64,
}

impl PipelineStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 평가 대비 신호 방출 비율 (%)
    pub fn hit_rate(&self) -> f64 {
        if self.evaluations == 0 {
            0.0
        } else {
            (self.signals_emitted as f64 / self.evaluations as f64) * 100.0
        }
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, scope: &str) {
        tracing::info!(
            scope = scope,
            events_ingested = self.events_ingested,
            malformed_dropped = self.malformed_dropped,
            late_dropped = self.late_dropped,
            candles_closed = self.candles_closed,
            evaluations = self.evaluations,
            rejections = self.rejections,
            signals_emitted = self.signals_emitted,
            signals_suppressed = self.signals_suppressed,
            hit_rate = format!("{:.1}%", self.hit_rate()),
            "파이프라인 통계"
        );
    }
}

impl AddAssign<&PipelineStats> for PipelineStats {
    fn add_assign(&mut self, other: &PipelineStats) {
        self.events_ingested += other.events_ingested;
        self.malformed_dropped += other.malformed_dropped;
        self.late_dropped += other.late_dropped;
        self.candles_closed += other.candles_closed;
        self.evaluations += other.evaluations;
        self.rejections += other.rejections;
        self.signals_emitted += other.signals_emitted;
        self.signals_suppressed += other.signals_suppressed;
    }
}
