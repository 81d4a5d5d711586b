//! CRT 캔들 집계 및 패턴 감지 엔진.
//!
//! 이 크레이트가 제공하는 기능:
//! - 틱/원시 캔들을 타임프레임 정렬 캔들로 집계하는 `CandleAggregator`
//! - 고정 크기 윈도우와 감지 규칙 (`PatternWindow`, `DetectionRule`)
//! - 가격 레벨 계산 (`compute_levels`)
//! - 경계별 중복 제거 (`SignalTracker`)
//! - 타이머 기반 점검 (`Scheduler`)
//! - 동기식 `SignalPipeline`과 시리즈 키별 워커를 두는 비동기 `Dispatcher`
//!
//! # 예제
//!
//! ```rust,ignore
//! use crt_core::AppConfig;
//! use crt_engine::{ChannelSink, Dispatcher};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::load_default().unwrap();
//!     let (sink, mut events) = ChannelSink::channel(1024);
//!
//!     let mut dispatcher = Dispatcher::new(config, Arc::new(sink));
//!     dispatcher.start().unwrap();
//!
//!     tokio::spawn(async move {
//!         while let Some(event) = events.recv().await {
//!             println!("{:?}", event);
//!         }
//!     });
//! }
//! ```

pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod levels;
pub mod pipeline;
pub mod rules;
pub mod scheduler;
pub mod sink;
pub mod stats;
pub mod tracker;
pub mod window;

// 주요 타입 재내보내기
pub use aggregator::{CandleAggregator, CandleSeries, ClosedCandleEvent, IngestOutcome};
pub use dispatcher::{Dispatcher, TimeSource};
pub use error::{EngineError, EngineResult};
pub use levels::compute_levels;
pub use pipeline::{PipelineEvent, SignalPipeline};
pub use rules::{phase_marks, DetectionRule, Evaluation, PhaseThresholds};
pub use scheduler::{next_trigger, Clock, Scheduler, SystemClock};
pub use sink::{ChannelSink, SignalSink};
pub use stats::PipelineStats;
pub use tracker::{SignalTracker, TrackerState};
pub use window::PatternWindow;
