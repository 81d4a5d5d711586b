//! 에러 타입 정의.

use thiserror::Error;

/// 재생 입력 파일 에러
#[derive(Debug, Error)]
pub enum FeedError {
    /// 파일 입출력 에러
    #[error("입출력 에러: {0}")]
    Io(#[from] std::io::Error),

    /// CSV 파싱 에러
    #[error("CSV 에러: {0}")]
    Csv(#[from] csv::Error),

    /// JSONL 줄 파싱 에러
    #[error("JSON 에러 ({line}번째 줄): {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// 해석할 수 없는 타임스탬프
    #[error("잘못된 타임스탬프: {0}")]
    Timestamp(String),

    /// 확장자로 형식을 알 수 없음
    #[error("입력 형식을 알 수 없음: {0} (--format 지정 필요)")]
    UnknownFormat(String),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, FeedError>;
