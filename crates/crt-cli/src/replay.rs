//! 기록된 시세 파일을 디스패처로 재생합니다.
//!
//! 스케줄 점검은 이벤트 epoch 기준으로 실행되므로, 재생 결과는 벽시계와 무관하게
//! 같은 입력에 대해 항상 같습니다.

use crate::feed::{self, FeedFormat};
use anyhow::Context;
use crt_core::AppConfig;
use crt_engine::{ChannelSink, Dispatcher, EngineError, PipelineEvent, PipelineStats};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// 재생 옵션.
#[derive(Debug, Clone)]
pub struct ReplayOptions {
    /// 입력 파일 경로
    pub input: PathBuf,
    /// 입력 형식 (없으면 확장자로 추정)
    pub format: Option<FeedFormat>,
    /// CSV 입력에 붙일 심볼
    pub symbol: String,
    /// 레코드 사이 대기 시간
    pub interval: Option<Duration>,
    /// 파이프라인 이벤트를 JSON 줄로 출력
    pub json: bool,
}

/// 파일을 끝까지 재생하고 합산 통계를 반환합니다.
///
/// Ctrl+C를 받으면 남은 입력을 버리고 즉시 종료합니다.
pub async fn run(config: AppConfig, options: ReplayOptions) -> anyhow::Result<PipelineStats> {
    let records = feed::open(&options.input, options.format, &options.symbol)
        .with_context(|| format!("입력 파일 열기 실패: {}", options.input.display()))?;

    let (sink, rx) = ChannelSink::channel(config.pipeline.channel_capacity);
    let mut dispatcher = Dispatcher::new(config, Arc::new(sink)).with_event_time();
    dispatcher.start()?;

    let cancel = dispatcher.cancellation_token();
    let printer = tokio::spawn(print_events(rx, options.json));

    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                result = tokio::signal::ctrl_c() => {
                    if result.is_ok() {
                        info!("종료 신호 수신, 재생 중단");
                        cancel.cancel();
                    }
                }
            }
        })
    };

    info!(input = %options.input.display(), "Replay started");

    let mut feed_errors = 0u64;
    let mut unknown = 0u64;
    for record in records {
        if cancel.is_cancelled() {
            break;
        }

        let raw = match record {
            Ok(raw) => raw,
            Err(err) => {
                feed_errors += 1;
                warn!(error = %err, "Skipped unreadable record");
                continue;
            }
        };

        match dispatcher.dispatch_record(&raw).await {
            Ok(_) => {}
            Err(EngineError::UnknownSeries(symbol)) => {
                unknown += 1;
                debug!(symbol = %symbol, "Record for unconfigured symbol skipped");
            }
            Err(err) => return Err(err.into()),
        }

        if let Some(interval) = options.interval {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(interval) => {}
            }
        }
    }

    let mut stats = dispatcher.shutdown().await?;
    stats.malformed_dropped += feed_errors;

    // 디스패처가 끝났으므로 감시 태스크도 정리
    cancel.cancel();
    watcher.await.ok();
    let printed = printer.await.context("출력 태스크 실패")?;

    info!(
        events = printed,
        unknown_symbol = unknown,
        feed_errors = feed_errors,
        "Replay finished"
    );
    Ok(stats)
}

/// 싱크 채널이 닫힐 때까지 파이프라인 이벤트를 출력하고, 출력한 개수를 반환합니다.
async fn print_events(mut rx: mpsc::Receiver<PipelineEvent>, json: bool) -> u64 {
    let mut count = 0;
    while let Some(event) = rx.recv().await {
        count += 1;
        if json {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => warn!(error = %e, "Failed to serialize event"),
            }
            continue;
        }

        match &event {
            PipelineEvent::Signal(signal) => info!(
                series = %signal.key,
                kind = %signal.kind,
                boundary = signal.boundary,
                entry = %signal.entry,
                stop_loss = %signal.stop_loss,
                take_profit = %signal.take_profit,
                "신호"
            ),
            PipelineEvent::NoSignal(diagnostic) => debug!(
                series = %diagnostic.key,
                boundary = diagnostic.boundary,
                reasons = ?diagnostic.reasons,
                "셋업 없음"
            ),
            PipelineEvent::CandleClosed(candle) => debug!(
                series = %candle.key,
                start = candle.start,
                close = %candle.close,
                "캔들 마감"
            ),
        }
    }
    count
}
