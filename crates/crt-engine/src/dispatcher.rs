//! 시리즈 키별 워커로 이벤트를 라우팅하는 비동기 디스패처.
//!
//! 각 `(심볼, 타임프레임)` 키는 자신의 `SignalPipeline`을 소유한 워커 태스크 하나에서
//! 직렬로 처리됩니다. 키 사이에는 공유 상태도 잠금도 없습니다.

use crate::error::{EngineError, EngineResult};
use crate::pipeline::{PipelineEvent, SignalPipeline};
use crate::scheduler::{Clock, SystemClock};
use crate::sink::SignalSink;
use crate::stats::PipelineStats;
use crt_core::{series_span, AppConfig, MarketEvent, RawRecord, SeriesKey};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn, Instrument};

/// 스케줄 점검의 시간 기준.
#[derive(Clone)]
pub enum TimeSource {
    /// 벽시계 기준으로 잠들었다가 점검
    WallClock(Arc<dyn Clock>),
    /// 수집된 이벤트의 epoch를 현재 시각으로 사용 (재생용)
    EventTime,
}

impl Default for TimeSource {
    fn default() -> Self {
        TimeSource::WallClock(Arc::new(SystemClock))
    }
}

struct Worker {
    tx: mpsc::Sender<MarketEvent>,
    handle: JoinHandle<PipelineStats>,
}

/// 시리즈 키별 워커 디스패처.
pub struct Dispatcher {
    config: AppConfig,
    sink: Arc<dyn SignalSink>,
    time: TimeSource,
    cancel: CancellationToken,
    routes: HashMap<String, Vec<SeriesKey>>,
    workers: HashMap<SeriesKey, Worker>,
    dispatched: AtomicU64,
    malformed: AtomicU64,
}

impl Dispatcher {
    /// 새 디스패처를 생성합니다. 워커는 `start`에서 생성됩니다.
    pub fn new(config: AppConfig, sink: Arc<dyn SignalSink>) -> Self {
        Self {
            config,
            sink,
            time: TimeSource::default(),
            cancel: CancellationToken::new(),
            routes: HashMap::new(),
            workers: HashMap::new(),
            dispatched: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
        }
    }

    /// 스케줄 점검에 사용할 시계를 설정합니다.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.time = TimeSource::WallClock(clock);
        self
    }

    /// 이벤트 epoch 기준으로 스케줄 점검을 실행합니다.
    pub fn with_event_time(mut self) -> Self {
        self.time = TimeSource::EventTime;
        self
    }

    /// 모든 워커를 중단시키는 토큰.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// 워커가 실행 중인지 여부.
    pub fn is_running(&self) -> bool {
        !self.workers.is_empty()
    }

    /// 실행 중인 시리즈 키 목록.
    pub fn keys(&self) -> Vec<SeriesKey> {
        let mut keys: Vec<SeriesKey> = self.workers.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// 설정된 모든 시리즈에 대해 워커를 시작합니다.
    pub fn start(&mut self) -> EngineResult<()> {
        if self.is_running() {
            return Err(EngineError::AlreadyRunning);
        }
        self.config.validate()?;

        for (symbol, timeframes) in &self.config.symbols {
            for timeframe in timeframes {
                let key = SeriesKey::new(symbol.clone(), *timeframe);
                if self.workers.contains_key(&key) {
                    continue;
                }

                let pipeline = SignalPipeline::for_series(
                    self.config.pipeline.clone(),
                    &key,
                    self.config.schedule_for(*timeframe),
                );
                let (tx, rx) = mpsc::channel(self.config.pipeline.channel_capacity);
                let handle = tokio::spawn(run_worker(
                    key.clone(),
                    pipeline,
                    rx,
                    Arc::clone(&self.sink),
                    self.cancel.child_token(),
                    self.time.clone(),
                ));

                self.routes
                    .entry(symbol.clone())
                    .or_default()
                    .push(key.clone());
                self.workers.insert(key, Worker { tx, handle });
            }
        }

        info!(
            workers = self.workers.len(),
            symbols = self.routes.len(),
            "Dispatcher started"
        );
        Ok(())
    }

    /// 이벤트를 심볼의 모든 시리즈 워커로 보냅니다.
    ///
    /// 워커 입력 채널이 가득 차면 대기합니다. 전달된 워커 수를 반환합니다.
    pub async fn dispatch(&self, event: MarketEvent) -> EngineResult<usize> {
        if !self.is_running() {
            return Err(EngineError::NotRunning);
        }
        let keys = self
            .routes
            .get(&event.symbol)
            .ok_or_else(|| EngineError::UnknownSeries(event.symbol.clone()))?;

        for key in keys {
            let worker = self
                .workers
                .get(key)
                .ok_or_else(|| EngineError::UnknownSeries(key.to_string()))?;
            worker
                .tx
                .send(event.clone())
                .await
                .map_err(|_| EngineError::ChannelClosed(key.to_string()))?;
        }
        self.dispatched.fetch_add(1, Ordering::Relaxed);
        Ok(keys.len())
    }

    /// 와이어 레코드를 검증해 라우팅합니다. 잘못된 레코드는 경고 후 폐기합니다.
    pub async fn dispatch_record(&self, raw: &RawRecord) -> EngineResult<usize> {
        match raw.validate() {
            Ok(event) => self.dispatch(event).await,
            Err(err) => {
                self.malformed.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %err,
                    symbol = ?raw.symbol,
                    epoch = ?raw.epoch,
                    "Dropped malformed record"
                );
                Ok(0)
            }
        }
    }

    /// 모든 워커를 즉시 중단시킵니다. 채널에 남은 이벤트는 버려집니다.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// 입력 채널을 닫고 워커가 남은 이벤트를 처리한 뒤 종료되기를 기다립니다.
    ///
    /// 모든 시리즈의 통계를 합산해 반환합니다. `events_ingested`는 타임프레임 수와
    /// 무관하게 디스패처가 받은 이벤트 수입니다.
    pub async fn shutdown(mut self) -> EngineResult<PipelineStats> {
        let workers = std::mem::take(&mut self.workers);
        self.routes.clear();

        let handles: Vec<(SeriesKey, JoinHandle<PipelineStats>)> = workers
            .into_iter()
            .map(|(key, worker)| {
                drop(worker.tx);
                (key, worker.handle)
            })
            .collect();

        let mut total = PipelineStats::new();
        total.malformed_dropped = self.malformed.load(Ordering::Relaxed);

        for (key, handle) in handles {
            let stats = handle
                .await
                .map_err(|e| EngineError::WorkerFailed(format!("{}: {}", key, e)))?;
            stats.log_summary(&key.to_string());
            total += &stats;
        }
        total.events_ingested = self.dispatched.load(Ordering::Relaxed);

        total.log_summary("dispatcher");
        Ok(total)
    }
}

async fn run_worker(
    key: SeriesKey,
    mut pipeline: SignalPipeline,
    mut rx: mpsc::Receiver<MarketEvent>,
    sink: Arc<dyn SignalSink>,
    cancel: CancellationToken,
    time: TimeSource,
) -> PipelineStats {
    let span = series_span!("series_worker", key);

    async move {
        info!(scheduled = pipeline.has_schedules(), "Series worker started");
        if let TimeSource::WallClock(clock) = &time {
            pipeline.prime_schedules(clock.now_epoch());
        }

        loop {
            let deadline = match &time {
                TimeSource::WallClock(clock) => pipeline
                    .next_trigger()
                    .map(|at| deadline_for(clock.as_ref(), at)),
                TimeSource::EventTime => None,
            };

            let events = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Series worker cancelled");
                    break;
                }
                received = rx.recv() => match received {
                    Some(event) => {
                        let mut events = pipeline.ingest(&event);
                        if matches!(time, TimeSource::EventTime) {
                            events.extend(pipeline.run_due_checks(event.epoch));
                        }
                        events
                    }
                    None => {
                        debug!("Input channel closed");
                        break;
                    }
                },
                _ = sleep_until(deadline) => match &time {
                    TimeSource::WallClock(clock) => pipeline.run_due_checks(clock.now_epoch()),
                    TimeSource::EventTime => Vec::new(),
                },
            };

            if let Err(e) = deliver_all(sink.as_ref(), events).await {
                warn!(error = %e, "Sink closed, stopping worker");
                break;
            }
        }

        info!("Series worker stopped");
        pipeline.stats().clone()
    }
    .instrument(span)
    .await
}

async fn deliver_all(sink: &dyn SignalSink, events: Vec<PipelineEvent>) -> EngineResult<()> {
    for event in events {
        sink.deliver(event).await?;
    }
    Ok(())
}

/// 벽시계 epoch를 tokio 시각으로 변환합니다. 이미 지났으면 즉시.
fn deadline_for(clock: &dyn Clock, at: i64) -> Instant {
    let wait = (at - clock.now_epoch()).max(0) as u64;
    Instant::now() + Duration::from_secs(wait)
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
