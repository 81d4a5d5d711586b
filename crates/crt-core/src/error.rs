//! 파이프라인의 에러 타입.
//!
//! 이 모듈은 입력 검증과 설정 검증에서 사용되는 에러 타입을 정의합니다.
//! 패턴 미검출("셋업 없음")이나 순서가 뒤바뀐 틱 폐기는 에러가 아니며
//! 여기에 포함되지 않습니다.

use thiserror::Error;

/// 수집(ingestion) 단계의 잘못된 입력 에러.
///
/// 이 에러가 발생한 레코드는 진단 로그와 함께 폐기되며,
/// 기존 캔들 상태는 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IngestError {
    /// 필수 필드 누락
    #[error("필수 필드 누락: {0}")]
    MissingField(&'static str),

    /// 빈 심볼
    #[error("빈 심볼")]
    EmptySymbol,

    /// 음수 타임스탬프
    #[error("음수 epoch: {0}")]
    NegativeEpoch(i64),

    /// 허용 범위(9999년)를 넘는 타임스탬프
    #[error("범위를 벗어난 epoch: {0}")]
    EpochOutOfRange(i64),

    /// NaN 또는 무한대 가격
    #[error("유한하지 않은 가격: {field}={value}")]
    NonFinite { field: &'static str, value: f64 },

    /// 0 이하이거나 허용 상한을 넘는 가격
    #[error("허용 범위를 벗어난 가격: {field}={value}")]
    OutOfRange { field: &'static str, value: f64 },

    /// 고가/저가가 시가/종가를 감싸지 않는 OHLC
    #[error("일관성 없는 OHLC: {0}")]
    InconsistentOhlc(String),
}

/// 설정 에러.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 파일/환경 변수 로드 실패
    #[error("설정 로드 실패: {0}")]
    Load(#[from] config::ConfigError),

    /// 잘못된 설정 값
    #[error("잘못된 설정 값 `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    /// TOML 파싱 실패
    #[error("설정 파싱 실패: {0}")]
    Parse(String),

    /// 직렬화 실패
    #[error("설정 직렬화 실패: {0}")]
    Serialization(String),
}

impl ConfigError {
    /// 잘못된 설정 값 에러를 생성합니다.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::Serialization(err.to_string())
    }
}

/// 수집 작업을 위한 Result 타입.
pub type IngestResult<T> = Result<T, IngestError>;

/// 설정 작업을 위한 Result 타입.
pub type ConfigResult<T> = Result<T, ConfigError>;
