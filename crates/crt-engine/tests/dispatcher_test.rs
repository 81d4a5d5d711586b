//! Dispatcher 통합 테스트
//!
//! 시리즈 키별 워커 라우팅, 종료 시 통계 합산, 취소, 벽시계 스케줄 점검을 검증합니다.

use crt_core::{
    AppConfig, MarketEvent, PipelineConfig, RawRecord, RuleKind, ScheduleConfig, Timeframe,
};
use crt_engine::{ChannelSink, Clock, Dispatcher, EngineError, PipelineEvent};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;

// ============================================================================
// 테스트 헬퍼 함수
// ============================================================================

const BASE: i64 = 1_704_067_200;

fn config(timeframes: Vec<Timeframe>) -> AppConfig {
    AppConfig {
        pipeline: PipelineConfig {
            rule: RuleKind::SimpleBreakout,
            ..Default::default()
        },
        symbols: BTreeMap::from([("R_75".to_string(), timeframes)]),
        ..Default::default()
    }
}

fn bar(minute: i64, high: Decimal, low: Decimal, close: Decimal) -> MarketEvent {
    MarketEvent::candle("R_75", BASE + minute * 60, low, high, low, close)
}

/// 3번째 봉 마감 시 상향 돌파가 나오는 1분봉 시퀀스
fn breakout_bars() -> Vec<MarketEvent> {
    vec![
        bar(0, dec!(10), dec!(9), dec!(9.5)),
        bar(1, dec!(12), dec!(8), dec!(10)),
        bar(2, dec!(13.5), dec!(11.5), dec!(13)),
        bar(3, dec!(13), dec!(13), dec!(13)),
    ]
}

fn drain(rx: &mut mpsc::Receiver<PipelineEvent>) -> Vec<PipelineEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// tokio 가상 시간에 묶인 시계
struct TokioClock {
    origin_epoch: i64,
    origin: Instant,
}

impl TokioClock {
    fn starting_at(epoch: i64) -> Self {
        Self {
            origin_epoch: epoch,
            origin: Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now_epoch(&self) -> i64 {
        self.origin_epoch + self.origin.elapsed().as_secs() as i64
    }
}

// ============================================================================
// 라우팅 / 종료 테스트
// ============================================================================

#[tokio::test]
async fn test_dispatch_routes_to_every_timeframe() {
    let (sink, mut rx) = ChannelSink::channel(64);
    let mut dispatcher =
        Dispatcher::new(config(vec![Timeframe::M1, Timeframe::M5]), Arc::new(sink));
    dispatcher.start().unwrap();
    assert_eq!(dispatcher.keys().len(), 2);

    for event in breakout_bars() {
        assert_eq!(dispatcher.dispatch(event).await.unwrap(), 2);
    }

    let stats = dispatcher.shutdown().await.unwrap();
    // 이벤트는 타임프레임 수와 무관하게 한 번만 집계
    assert_eq!(stats.events_ingested, 4, "이벤트 4개는 4로 집계되어야 함");
    assert_eq!(stats.signals_emitted, 1);

    let signals: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|e| match e {
            PipelineEvent::Signal(s) => Some(s),
            _ => None,
        })
        .collect();
    assert_eq!(signals.len(), 1);
    assert_eq!(signals[0].key.timeframe, Timeframe::M1);
    assert_eq!(signals[0].boundary, BASE + 120);
}

#[tokio::test]
async fn test_malformed_records_counted() {
    let (sink, _rx) = ChannelSink::channel(64);
    let mut dispatcher = Dispatcher::new(config(vec![Timeframe::M1]), Arc::new(sink));
    dispatcher.start().unwrap();

    let raw = RawRecord {
        symbol: Some("R_75".into()),
        epoch: Some(BASE),
        price: Some(f64::INFINITY),
        ..Default::default()
    };
    assert_eq!(dispatcher.dispatch_record(&raw).await.unwrap(), 0);

    let stats = dispatcher.shutdown().await.unwrap();
    assert_eq!(stats.malformed_dropped, 1);
    assert_eq!(stats.events_ingested, 0);
}

#[tokio::test]
async fn test_unknown_symbol_and_lifecycle_errors() {
    let (sink, _rx) = ChannelSink::channel(8);
    let mut dispatcher = Dispatcher::new(config(vec![Timeframe::M1]), Arc::new(sink));

    assert!(matches!(
        dispatcher.dispatch(MarketEvent::tick("R_75", BASE, dec!(1))).await,
        Err(EngineError::NotRunning)
    ));

    dispatcher.start().unwrap();
    assert!(matches!(dispatcher.start(), Err(EngineError::AlreadyRunning)));
    assert!(matches!(
        dispatcher.dispatch(MarketEvent::tick("R_10", BASE, dec!(1))).await,
        Err(EngineError::UnknownSeries(_))
    ));

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_invalid_config_rejected_on_start() {
    let (sink, _rx) = ChannelSink::channel(8);
    let mut app = config(vec![Timeframe::M1]);
    app.pipeline.window_size = 1;

    let mut dispatcher = Dispatcher::new(app, Arc::new(sink));
    assert!(matches!(dispatcher.start(), Err(EngineError::Config(_))));
    assert!(!dispatcher.is_running());
}

#[tokio::test]
async fn test_cancellation_stops_workers() {
    let (sink, _rx) = ChannelSink::channel(8);
    let mut dispatcher = Dispatcher::new(config(vec![Timeframe::M1]), Arc::new(sink));
    dispatcher.start().unwrap();

    dispatcher.dispatch(MarketEvent::tick("R_75", BASE, dec!(1))).await.unwrap();
    dispatcher.stop();
    assert!(dispatcher.cancellation_token().is_cancelled());

    // 진행 중이던 캔들은 그냥 버려짐
    let stats = tokio::time::timeout(Duration::from_secs(5), dispatcher.shutdown())
        .await
        .expect("취소 후 종료되어야 함")
        .unwrap();
    assert_eq!(stats.candles_closed, 0);
}

// ============================================================================
// 스케줄 점검 테스트
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_wall_clock_scheduled_check() {
    let mut app = config(vec![Timeframe::M1]);
    app.schedule = HashMap::from([(
        Timeframe::M1,
        ScheduleConfig {
            offset_secs: 30,
            ..Default::default()
        },
    )]);

    // 3분 40초 시점에서 시작 → 다음 점검은 4분 30초
    let clock = Arc::new(TokioClock::starting_at(BASE + 220));
    let (sink, mut rx) = ChannelSink::channel(64);
    let mut dispatcher = Dispatcher::new(app, Arc::new(sink)).with_clock(clock);
    dispatcher.start().unwrap();

    for event in breakout_bars() {
        dispatcher.dispatch(event).await.unwrap();
    }
    tokio::task::yield_now().await;
    assert!(
        drain(&mut rx).iter().all(|e| !matches!(e, PipelineEvent::Signal(_))),
        "타이머 전에는 신호가 없어야 함"
    );

    tokio::time::sleep(Duration::from_secs(60)).await;

    let events = drain(&mut rx);
    let signal = events
        .iter()
        .find_map(PipelineEvent::as_signal)
        .expect("점검 후 신호가 있어야 함");
    assert_eq!(signal.boundary, BASE + 240);

    dispatcher.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_event_time_scheduled_check() {
    let mut app = config(vec![Timeframe::M1]);
    app.schedule = HashMap::from([(
        Timeframe::M1,
        ScheduleConfig {
            offset_secs: -10,
            include_forming: true,
            ..Default::default()
        },
    )]);

    let (sink, mut rx) = ChannelSink::channel(64);
    let mut dispatcher = Dispatcher::new(app, Arc::new(sink)).with_event_time();
    dispatcher.start().unwrap();

    dispatcher.dispatch(bar(0, dec!(10), dec!(9), dec!(9.5))).await.unwrap();
    dispatcher.dispatch(bar(1, dec!(12), dec!(8), dec!(10))).await.unwrap();
    // 범위 안의 틱으로 세 번째 봉 시작 → 1분 50초 점검은 기각
    dispatcher
        .dispatch(MarketEvent::tick("R_75", BASE + 120, dec!(11)))
        .await
        .unwrap();
    // 종료 5초 전 틱 → 2분 50초 점검이 형성 중인 봉으로 돌파 감지
    dispatcher
        .dispatch(MarketEvent::tick("R_75", BASE + 175, dec!(13)))
        .await
        .unwrap();

    let stats = dispatcher.shutdown().await.unwrap();
    assert_eq!(stats.signals_emitted, 1);

    let events = drain(&mut rx);
    let signal = events.iter().find_map(PipelineEvent::as_signal).unwrap();
    assert_eq!(signal.boundary, BASE + 120);
    assert_eq!(signal.entry, dec!(13));
    assert!(!signal.reference_candle.closed);
}
