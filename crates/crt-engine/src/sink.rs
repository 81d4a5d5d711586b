//! 파이프라인 출력 소비자 인터페이스.

use crate::error::{EngineError, EngineResult};
use crate::pipeline::PipelineEvent;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// 신호/진단/캔들 이벤트를 받는 소비자.
///
/// 표시, 알림 같은 외부 협력자가 구현합니다.
#[async_trait]
pub trait SignalSink: Send + Sync {
    /// 이벤트 하나를 전달합니다.
    async fn deliver(&self, event: PipelineEvent) -> EngineResult<()>;
}

/// `mpsc` 채널로 이벤트를 전달하는 소비자.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<PipelineEvent>,
}

impl ChannelSink {
    /// 송신자로 소비자를 생성합니다.
    pub fn new(tx: mpsc::Sender<PipelineEvent>) -> Self {
        Self { tx }
    }

    /// 주어진 버퍼 크기로 소비자와 수신자를 생성합니다.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<PipelineEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl SignalSink for ChannelSink {
    async fn deliver(&self, event: PipelineEvent) -> EngineResult<()> {
        self.tx
            .send(event)
            .await
            .map_err(|e| EngineError::ChannelClosed(format!("sink: {}", e)))
    }
}
