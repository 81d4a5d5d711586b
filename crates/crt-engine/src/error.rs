//! 엔진 에러 타입.

use crt_core::ConfigError;
use thiserror::Error;

/// 디스패처/워커 에러.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("알 수 없는 시리즈: {0}")]
    UnknownSeries(String),

    #[error("채널이 닫힘: {0}")]
    ChannelClosed(String),

    #[error("디스패처가 이미 실행 중")]
    AlreadyRunning,

    #[error("디스패처가 실행 중이 아님")]
    NotRunning,

    #[error("설정 에러: {0}")]
    Config(#[from] ConfigError),

    #[error("워커 종료 실패: {0}")]
    WorkerFailed(String),
}

/// 엔진 작업을 위한 Result 타입.
pub type EngineResult<T> = Result<T, EngineError>;
