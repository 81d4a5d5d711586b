//! 동기식 신호 파이프라인.
//!
//! 집계 → 윈도우 평가 → 레벨 계산 → 중복 제거를 한 이벤트 안에서 순서대로 수행합니다.
//! 스케줄이 설정된 시리즈는 캔들 마감 시 윈도우에만 추가하고, 감지는 타이머가 실행합니다.

use crate::aggregator::{CandleAggregator, IngestOutcome};
use crate::levels::compute_levels;
use crate::rules::{DetectionRule, Evaluation};
use crate::scheduler::Scheduler;
use crate::stats::PipelineStats;
use crate::tracker::SignalTracker;
use crate::window::PatternWindow;
use crt_core::{
    Candle, MarketEvent, NoSignalDiagnostic, PipelineConfig, RawRecord,
    ScheduleConfig, SeriesKey, Signal, Timeframe,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

/// 파이프라인 출력 이벤트.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// 방출된 신호
    Signal(Signal),
    /// 셋업 없음 진단
    NoSignal(NoSignalDiagnostic),
    /// 마감된 캔들
    CandleClosed(Candle),
}

impl PipelineEvent {
    /// 신호 이벤트면 신호를 반환합니다.
    pub fn as_signal(&self) -> Option<&Signal> {
        match self {
            PipelineEvent::Signal(signal) => Some(signal),
            _ => None,
        }
    }

    /// 이벤트의 시리즈 키.
    pub fn key(&self) -> &SeriesKey {
        match self {
            PipelineEvent::Signal(signal) => &signal.key,
            PipelineEvent::NoSignal(diagnostic) => &diagnostic.key,
            PipelineEvent::CandleClosed(candle) => &candle.key,
        }
    }
}

/// 집계기, 윈도우, 추적기를 묶은 파이프라인.
#[derive(Debug)]
pub struct SignalPipeline {
    config: PipelineConfig,
    aggregator: CandleAggregator,
    windows: PatternWindow,
    tracker: SignalTracker,
    schedulers: HashMap<SeriesKey, Scheduler>,
    stats: PipelineStats,
}

impl SignalPipeline {
    /// 심볼별 타임프레임과 스케줄로 파이프라인을 생성합니다.
    pub fn new(
        config: PipelineConfig,
        symbols: BTreeMap<String, Vec<Timeframe>>,
        schedule: &HashMap<Timeframe, ScheduleConfig>,
    ) -> Self {
        let schedulers = symbols
            .iter()
            .flat_map(|(symbol, timeframes)| {
                timeframes.iter().filter_map(move |tf| {
                    schedule
                        .get(tf)
                        .map(|s| (SeriesKey::new(symbol.clone(), *tf), Scheduler::new(*tf, *s)))
                })
            })
            .collect();

        Self {
            aggregator: CandleAggregator::new(config.history_retention).with_symbols(symbols),
            windows: PatternWindow::new(config.window_size, DetectionRule::from_config(&config)),
            tracker: SignalTracker::new(config.dedup_epsilon),
            schedulers,
            stats: PipelineStats::new(),
            config,
        }
    }

    /// 시리즈 하나만 처리하는 파이프라인을 생성합니다.
    pub fn for_series(
        config: PipelineConfig,
        key: &SeriesKey,
        schedule: Option<ScheduleConfig>,
    ) -> Self {
        let symbols = BTreeMap::from([(key.symbol.clone(), vec![key.timeframe])]);
        let schedule: HashMap<Timeframe, ScheduleConfig> =
            schedule.map(|s| (key.timeframe, s)).into_iter().collect();
        Self::new(config, symbols, &schedule)
    }

    /// 처리 통계.
    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// 스케줄이 설정된 시리즈가 있는지 여부.
    pub fn has_schedules(&self) -> bool {
        !self.schedulers.is_empty()
    }

    /// 와이어 레코드를 검증하고 수집합니다. 잘못된 레코드는 경고 후 폐기합니다.
    pub fn ingest_record(&mut self, raw: &RawRecord) -> Vec<PipelineEvent> {
        match raw.validate() {
            Ok(event) => self.ingest(&event),
            Err(err) => {
                self.stats.malformed_dropped += 1;
                warn!(
                    error = %err,
                    symbol = ?raw.symbol,
                    epoch = ?raw.epoch,
                    "Dropped malformed record"
                );
                Vec::new()
            }
        }
    }

    /// 검증된 이벤트를 설정된 모든 타임프레임으로 수집합니다.
    pub fn ingest(&mut self, event: &MarketEvent) -> Vec<PipelineEvent> {
        self.stats.events_ingested += 1;
        let mut out = Vec::new();

        for (timeframe, outcome) in self.aggregator.ingest_event(event) {
            match outcome {
                IngestOutcome::Closed(closed) => {
                    let key = SeriesKey::new(event.symbol.clone(), timeframe);
                    self.on_candle_closed(&key, closed.candle, &mut out);
                }
                IngestOutcome::Late { .. } => self.stats.late_dropped += 1,
                IngestOutcome::Opened | IngestOutcome::Merged => {}
            }
        }

        out
    }

    /// 예정된 다음 트리거 중 가장 이른 시각.
    pub fn next_trigger(&self) -> Option<i64> {
        self.schedulers.values().filter_map(Scheduler::next).min()
    }

    /// 모든 스케줄의 첫 트리거를 예약합니다.
    pub fn prime_schedules(&mut self, now: i64) {
        for scheduler in self.schedulers.values_mut() {
            scheduler.prime(now);
        }
    }

    /// `now` 기준으로 도래한 스케줄 점검을 실행합니다.
    pub fn run_due_checks(&mut self, now: i64) -> Vec<PipelineEvent> {
        let mut due: Vec<(SeriesKey, i64)> = self
            .schedulers
            .iter_mut()
            .filter_map(|(key, scheduler)| scheduler.due(now).map(|at| (key.clone(), at)))
            .collect();
        due.sort();

        let mut out = Vec::new();
        for (key, trigger) in due {
            self.run_check(&key, trigger, &mut out);
        }
        out
    }

    fn run_check(&mut self, key: &SeriesKey, trigger: i64, out: &mut Vec<PipelineEvent>) {
        let Some(scheduler) = self.schedulers.get(key) else {
            return;
        };
        let boundary = scheduler.boundary_at(trigger);

        let forming = if scheduler.include_forming() {
            self.aggregator.forming(key)
        } else {
            None
        };
        let evaluation = match forming {
            Some(candle) => self.windows.evaluate_with_forming(key, candle, boundary),
            None => self.windows.evaluate(key, boundary),
        };

        debug!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            trigger,
            boundary,
            "Scheduled check"
        );
        self.resolve(key, boundary, evaluation, out);
    }

    fn on_candle_closed(&mut self, key: &SeriesKey, candle: Candle, out: &mut Vec<PipelineEvent>) {
        self.stats.candles_closed += 1;
        debug!(
            symbol = %key.symbol,
            timeframe = %key.timeframe,
            start = candle.start,
            close = %candle.close,
            "Candle closed"
        );

        if self.config.emit_candles {
            out.push(PipelineEvent::CandleClosed(candle.clone()));
        }

        if self.schedulers.contains_key(key) {
            self.windows.push(key, candle);
            return;
        }

        let boundary = candle.start;
        let evaluation = self.windows.close_and_evaluate(key, candle);
        self.resolve(key, boundary, evaluation, out);
    }

    fn resolve(
        &mut self,
        key: &SeriesKey,
        boundary: i64,
        evaluation: Evaluation,
        out: &mut Vec<PipelineEvent>,
    ) {
        match evaluation {
            Evaluation::Insufficient { have, need } => {
                debug!(symbol = %key.symbol, timeframe = %key.timeframe, have, need, "Window not full");
                self.tracker.should_emit(key, boundary, None);
            }
            Evaluation::Rejected { reasons } => {
                self.stats.evaluations += 1;
                self.stats.rejections += 1;
                self.tracker.should_emit(key, boundary, None);
                debug!(
                    symbol = %key.symbol,
                    timeframe = %key.timeframe,
                    boundary,
                    reasons = ?reasons,
                    "No setup"
                );

                if self.config.emit_diagnostics {
                    out.push(PipelineEvent::NoSignal(NoSignalDiagnostic {
                        key: key.clone(),
                        boundary,
                        reasons,
                    }));
                }
            }
            Evaluation::Signal(candidate) => {
                let reference = &candidate.reference;
                let Some(levels) =
                    compute_levels(candidate.kind.side(), reference, &self.config.levels)
                else {
                    warn!(
                        symbol = %key.symbol,
                        timeframe = %key.timeframe,
                        boundary,
                        high = %reference.high,
                        low = %reference.low,
                        "Level computation overflowed"
                    );
                    let reason = format!(
                        "Level overflow: reference candle {} range {} exceeds decimal bounds",
                        reference.start,
                        reference.range()
                    );
                    let rejected = Evaluation::Rejected {
                        reasons: vec![reason],
                    };
                    self.resolve(key, boundary, rejected, out);
                    return;
                };

                self.stats.evaluations += 1;
                let signal = Signal::from_candidate(candidate, levels);

                if self.tracker.should_emit(key, boundary, Some(&signal)) {
                    self.stats.signals_emitted += 1;
                    info!(
                        symbol = %key.symbol,
                        timeframe = %key.timeframe,
                        boundary,
                        kind = %signal.kind,
                        entry = %signal.entry,
                        stop_loss = %signal.stop_loss,
                        take_profit = %signal.take_profit,
                        "Signal emitted"
                    );
                    out.push(PipelineEvent::Signal(signal));
                } else {
                    self.stats.signals_suppressed += 1;
                    debug!(
                        symbol = %key.symbol,
                        timeframe = %key.timeframe,
                        boundary,
                        kind = %signal.kind,
                        "Duplicate signal suppressed"
                    );
                }
            }
        }
    }
}
