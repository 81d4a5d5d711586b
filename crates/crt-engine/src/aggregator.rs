//! 틱/원시 캔들을 타임프레임 정렬 캔들로 집계합니다.
//!
//! - `CandleSeries` - 한 시리즈 키의 형성 중 캔들과 마감 이력
//! - `CandleAggregator` - 시리즈 키별 상태 레지스트리와 타임프레임 팬아웃

use crt_core::{Candle, MarketEvent, Sample, SeriesKey, Timeframe};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

/// 캔들 마감 이벤트.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosedCandleEvent {
    /// 방금 마감된 캔들
    pub candle: Candle,
    /// 새로 열린 캔들의 시작 epoch
    pub next_start: i64,
}

/// 한 번의 수집 결과.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 시리즈의 첫 캔들이 열림
    Opened,
    /// 형성 중인 캔들에 병합됨
    Merged,
    /// 이전 캔들이 마감되고 새 캔들이 열림
    Closed(ClosedCandleEvent),
    /// 이미 지난 경계의 이벤트라 폐기됨
    Late {
        /// 이벤트가 속한 경계
        boundary: i64,
        /// 현재 형성 중인 캔들의 경계
        current: i64,
    },
}

impl IngestOutcome {
    /// 마감 이벤트만 꺼냅니다.
    pub fn into_closed(self) -> Option<ClosedCandleEvent> {
        match self {
            IngestOutcome::Closed(event) => Some(event),
            _ => None,
        }
    }
}

/// 시리즈 키 하나의 집계 상태.
#[derive(Debug, Clone)]
pub struct CandleSeries {
    key: SeriesKey,
    current: Option<Candle>,
    history: VecDeque<Candle>,
    retention: usize,
}

impl CandleSeries {
    /// 빈 시리즈를 생성합니다.
    pub fn new(key: SeriesKey, retention: usize) -> Self {
        Self {
            key,
            current: None,
            history: VecDeque::with_capacity(retention.min(1024)),
            retention,
        }
    }

    /// 시리즈 키.
    pub fn key(&self) -> &SeriesKey {
        &self.key
    }

    /// 형성 중인 캔들.
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// 마감된 캔들 이력 (오래된 순).
    pub fn history(&self) -> &VecDeque<Candle> {
        &self.history
    }

    /// 샘플 하나를 수집합니다.
    pub fn ingest(&mut self, epoch: i64, sample: &Sample) -> IngestOutcome {
        let start = self.key.boundary_of(epoch);

        match &mut self.current {
            None => {
                self.current = Some(Candle::open_with(self.key.clone(), start, sample));
                IngestOutcome::Opened
            }
            Some(candle) if start == candle.start => {
                candle.merge(sample);
                IngestOutcome::Merged
            }
            Some(candle) if start < candle.start => IngestOutcome::Late {
                boundary: start,
                current: candle.start,
            },
            Some(candle) => {
                let next = Candle::open_with(self.key.clone(), start, sample);
                let mut closed = std::mem::replace(candle, next);
                closed.finalize();

                self.history.push_back(closed.clone());
                while self.history.len() > self.retention {
                    self.history.pop_front();
                }

                IngestOutcome::Closed(ClosedCandleEvent {
                    candle: closed,
                    next_start: start,
                })
            }
        }
    }
}

/// 시리즈 키별 캔들 집계기.
///
/// 시리즈 상태는 첫 이벤트에서 지연 생성됩니다.
#[derive(Debug, Clone, Default)]
pub struct CandleAggregator {
    retention: usize,
    timeframes: BTreeMap<String, Vec<Timeframe>>,
    series: HashMap<SeriesKey, CandleSeries>,
}

impl CandleAggregator {
    /// 새 집계기를 생성합니다.
    pub fn new(retention: usize) -> Self {
        Self {
            retention,
            ..Default::default()
        }
    }

    /// 심볼별 팬아웃 타임프레임을 설정합니다.
    pub fn with_symbols(mut self, timeframes: BTreeMap<String, Vec<Timeframe>>) -> Self {
        self.timeframes = timeframes;
        self
    }

    /// 심볼에 설정된 타임프레임 목록.
    pub fn timeframes_for(&self, symbol: &str) -> &[Timeframe] {
        self.timeframes
            .get(symbol)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// 샘플 하나를 한 시리즈에 수집하고 마감 이벤트가 있으면 반환합니다.
    pub fn ingest(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        epoch: i64,
        sample: &Sample,
    ) -> Option<ClosedCandleEvent> {
        self.ingest_outcome(symbol, timeframe, epoch, sample)
            .into_closed()
    }

    /// `ingest`와 같지만 병합/폐기 여부까지 반환합니다.
    pub fn ingest_outcome(
        &mut self,
        symbol: &str,
        timeframe: Timeframe,
        epoch: i64,
        sample: &Sample,
    ) -> IngestOutcome {
        let key = SeriesKey::new(symbol, timeframe);
        let retention = self.retention;
        let series = self
            .series
            .entry(key.clone())
            .or_insert_with(|| CandleSeries::new(key, retention));

        let outcome = series.ingest(epoch, sample);
        if let IngestOutcome::Late { boundary, current } = &outcome {
            debug!(
                symbol = %symbol,
                timeframe = %timeframe,
                epoch,
                boundary,
                current,
                "Dropped late event for closed boundary"
            );
        }
        outcome
    }

    /// 이벤트를 심볼에 설정된 모든 타임프레임으로 팬아웃합니다.
    ///
    /// 설정되지 않은 심볼이면 빈 목록을 반환합니다.
    pub fn ingest_event(&mut self, event: &MarketEvent) -> Vec<(Timeframe, IngestOutcome)> {
        let timeframes = self.timeframes_for(&event.symbol).to_vec();
        if timeframes.is_empty() {
            debug!(symbol = %event.symbol, "No timeframes configured for symbol");
        }

        timeframes
            .into_iter()
            .map(|tf| {
                let outcome = self.ingest_outcome(&event.symbol, tf, event.epoch, &event.sample);
                (tf, outcome)
            })
            .collect()
    }

    /// 시리즈 상태를 조회합니다.
    pub fn series(&self, key: &SeriesKey) -> Option<&CandleSeries> {
        self.series.get(key)
    }

    /// 형성 중인 캔들을 조회합니다.
    pub fn forming(&self, key: &SeriesKey) -> Option<&Candle> {
        self.series.get(key).and_then(CandleSeries::current)
    }

    /// 상태가 생성된 시리즈 키 목록.
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }
}
