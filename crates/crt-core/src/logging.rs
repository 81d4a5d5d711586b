//! tracing을 사용한 로깅 인프라.
//!
//! 파이프라인 로그는 구조화된 필드(`symbol`, `timeframe`, `boundary`)를 사용합니다.
//! 출력 형식:
//! - **pretty**: 개발용 사람이 읽기 쉬운 형식
//! - **json**: 로그 집계용 JSON 형식
//! - **compact**: 간결한 한 줄 형식

use crate::config::LoggingConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    filter::ParseError,
    EnvFilter,
};

/// 로그 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// 색상이 포함된 사람이 읽기 쉬운 형식
    #[default]
    Pretty,
    /// JSON 형식
    Json,
    /// 간결한 한 줄 형식
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "compact" => Ok(Self::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// 로깅 초기화 옵션.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// 로그 레벨 필터 (예: "info", "crt_engine=debug")
    pub level: String,
    /// 출력 형식
    pub format: LogFormat,
    /// span 진입/종료 이벤트 포함 여부
    pub with_span_events: bool,
    /// 파일명과 줄 번호 포함 여부
    pub with_file: bool,
    /// 대상(모듈 경로) 포함 여부
    pub with_target: bool,
    /// `RUST_LOG`가 `level`보다 우선하는지 여부
    pub env_override: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            with_span_events: false,
            with_file: false,
            with_target: true,
            env_override: true,
        }
    }
}

impl LogConfig {
    /// 새 로그 설정을 생성합니다.
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    /// 로그 형식을 설정합니다.
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// span 이벤트를 활성화합니다.
    pub fn with_span_events(mut self, enabled: bool) -> Self {
        self.with_span_events = enabled;
        self
    }

    /// 명시적으로 지정한 레벨을 `RUST_LOG`보다 우선시킵니다.
    pub fn with_explicit_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self.env_override = false;
        self
    }

    /// 적용할 로그 필터를 만듭니다.
    ///
    /// `env_override`가 켜져 있고 `RUST_LOG`가 유효하면 그 값을, 아니면 `level`을 사용합니다.
    pub fn env_filter(&self) -> Result<EnvFilter, ParseError> {
        if self.env_override {
            if let Ok(filter) = EnvFilter::try_from_default_env() {
                return Ok(filter);
            }
        }
        EnvFilter::try_new(&self.level)
    }
}

impl From<&LoggingConfig> for LogConfig {
    fn from(config: &LoggingConfig) -> Self {
        LogConfig::new(config.level.clone()).with_format(config.format)
    }
}

/// 주어진 설정으로 로깅 시스템을 초기화합니다.
///
/// 명시적 레벨이 없으면 `RUST_LOG`가 `config.level`보다 우선합니다.
///
/// ```no_run
/// use crt_core::logging::{init_logging, LogConfig, LogFormat};
///
/// init_logging(LogConfig::new("debug").with_format(LogFormat::Json)).unwrap();
/// ```
pub fn init_logging(config: LogConfig) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = config.env_filter()?;

    let span_events = if config.with_span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match config.format {
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_file(config.with_file)
                    .with_line_number(config.with_file)
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
        LogFormat::Compact => registry
            .with(
                fmt::layer()
                    .compact()
                    .with_target(config.with_target)
                    .with_span_events(span_events),
            )
            .try_init()?,
    }

    tracing::info!(
        format = ?config.format,
        level = %config.level,
        "Logging initialized"
    );

    Ok(())
}

/// 시리즈 컨텍스트 필드가 포함된 span을 생성하는 매크로.
#[macro_export]
macro_rules! series_span {
    ($name:expr, $key:expr) => {
        tracing::info_span!(
            $name,
            symbol = %$key.symbol,
            timeframe = %$key.timeframe
        )
    };
}
