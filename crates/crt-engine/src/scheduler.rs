//! 타이머 기반 점검 스케줄.
//!
//! 경계 직후나 직전(예: 시작 30초 후, 종료 5분 전)에 감지를 실행할 때 사용합니다.
//! 늦게 깨어나도 에러가 아니며, 그 시점의 상태로 점검합니다.

use chrono::Utc;
use crt_core::{ScheduleConfig, Timeframe, MAX_EPOCH};

/// 현재 시각(epoch 초)을 제공하는 시계.
pub trait Clock: Send + Sync {
    /// 현재 epoch 초.
    fn now_epoch(&self) -> i64;
}

/// 시스템 벽시계.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch(&self) -> i64 {
        Utc::now().timestamp()
    }
}

/// `now` 이후(초과) 첫 트리거 시각을 계산합니다.
///
/// 오프셋이 0 이상이면 기간 시작 + 오프셋, 음수면 기간 종료 + 오프셋입니다.
/// `now`는 `[-MAX_EPOCH, MAX_EPOCH]`로 제한되어 계산이 넘치지 않습니다.
pub fn next_trigger(now: i64, period: Timeframe, offset_secs: i64, utc_offset_secs: i64) -> i64 {
    let now = now.clamp(-MAX_EPOCH, MAX_EPOCH);
    let secs = period.as_secs();
    let base = period.align_with_offset(now, utc_offset_secs);
    let mut candidate = if offset_secs >= 0 {
        base.saturating_add(offset_secs)
    } else {
        base.saturating_add(secs).saturating_add(offset_secs)
    };
    while candidate <= now {
        candidate = candidate.saturating_add(secs);
    }
    candidate
}

/// 한 시리즈의 점검 스케줄러.
#[derive(Debug, Clone)]
pub struct Scheduler {
    period: Timeframe,
    config: ScheduleConfig,
    next: Option<i64>,
}

impl Scheduler {
    /// 시리즈 타임프레임과 설정으로 스케줄러를 생성합니다.
    pub fn new(series: Timeframe, config: ScheduleConfig) -> Self {
        Self {
            period: config.period_for(series),
            config,
            next: None,
        }
    }

    /// 점검 주기.
    pub fn period(&self) -> Timeframe {
        self.period
    }

    /// 형성 중인 캔들 포함 여부.
    pub fn include_forming(&self) -> bool {
        self.config.include_forming
    }

    /// 예정된 다음 트리거 시각.
    pub fn next(&self) -> Option<i64> {
        self.next
    }

    /// 트리거 시각이 속한 점검 경계 (현지 시간 기준 기간 시작).
    pub fn boundary_at(&self, trigger: i64) -> i64 {
        self.period
            .align_with_offset(trigger, self.config.utc_offset_secs)
    }

    /// 첫 트리거를 예약합니다. 이미 예약되어 있으면 유지합니다.
    pub fn prime(&mut self, now: i64) -> i64 {
        *self.next.get_or_insert_with(|| {
            next_trigger(
                now,
                self.period,
                self.config.offset_secs,
                self.config.utc_offset_secs,
            )
        })
    }

    /// 트리거가 도래했으면 그 시각을 반환하고 `now` 이후로 다시 예약합니다.
    ///
    /// 여러 주기를 놓쳤어도 한 번만 실행합니다.
    pub fn due(&mut self, now: i64) -> Option<i64> {
        let scheduled = self.prime(now);
        if now < scheduled {
            return None;
        }
        self.next = Some(next_trigger(
            now,
            self.period,
            self.config.offset_secs,
            self.config.utc_offset_secs,
        ));
        Some(scheduled)
    }
}
