//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! TOML 파일을 기본으로 읽고 `CRT__` 접두사 환경 변수로 덮어씁니다.

use crate::error::{ConfigError, ConfigResult};
use crate::logging::LogFormat;
use crate::types::Timeframe;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 파이프라인 설정
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// 심볼별 타임프레임 목록
    #[serde(default)]
    pub symbols: BTreeMap<String, Vec<Timeframe>>,
    /// 시리즈 타임프레임별 타이머 기반 점검 설정
    #[serde(default)]
    pub schedule: HashMap<Timeframe, ScheduleConfig>,
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// 패턴 규칙 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// 직전 고가/저가 단순 돌파
    SimpleBreakout,
    /// 매집 → 조작 → 확장 단계 검증 (기본값)
    #[default]
    PhaseValidated,
}

/// 익절가 계산 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum TargetMode {
    /// 기준 캔들 범위 × `tp_ratio`
    RangeRatio { tp_ratio: Decimal },
    /// 위험(진입-손절) × `reward_ratio`
    RewardMultiple { reward_ratio: Decimal },
}

impl Default for TargetMode {
    fn default() -> Self {
        TargetMode::RewardMultiple {
            reward_ratio: dec!(4),
        }
    }
}

/// 가격 레벨 설정.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct LevelConfig {
    /// 손절 버퍼 비율 (기준 캔들 범위 대비)
    #[serde(default = "default_sl_ratio")]
    pub sl_ratio: Decimal,
    /// 익절 계산 방식
    #[serde(default)]
    pub target: TargetMode,
}

fn default_sl_ratio() -> Decimal {
    dec!(0.5)
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            sl_ratio: default_sl_ratio(),
            target: TargetMode::default(),
        }
    }
}

/// 파이프라인 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// 패턴 윈도우 크기 N
    #[serde(default = "default_window_size")]
    pub window_size: usize,

    /// 패턴 규칙
    #[serde(default)]
    pub rule: RuleKind,

    /// 매집 캔들의 최대 몸통 비율
    #[serde(default = "default_accumulation_threshold")]
    pub accumulation_threshold: Decimal,

    /// 조작 캔들의 최소 역방향 꼬리 비율 (범위 대비)
    #[serde(default = "default_manipulation_wick_ratio")]
    pub manipulation_wick_ratio: Decimal,

    /// 확장 캔들의 최소 몸통 비율
    #[serde(default = "default_expansion_threshold")]
    pub expansion_threshold: Decimal,

    /// 타임프레임별 확장 임계값 오버라이드
    #[serde(default = "default_expansion_overrides")]
    pub expansion_threshold_overrides: HashMap<Timeframe, Decimal>,

    /// 확장 캔들의 최대 꼬리 비율 (범위 대비)
    #[serde(default = "default_max_wick_ratio")]
    pub max_wick_ratio: Decimal,

    /// 가격 레벨 설정
    #[serde(default)]
    pub levels: LevelConfig,

    /// 시리즈별 마감 캔들 보관 개수
    #[serde(default = "default_history_retention")]
    pub history_retention: usize,

    /// 중복 신호 비교 허용 오차
    #[serde(default = "default_dedup_epsilon")]
    pub dedup_epsilon: Decimal,

    /// 시리즈 워커 입력 채널 크기
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// "신호 없음" 진단 방출 여부
    #[serde(default = "default_true")]
    pub emit_diagnostics: bool,

    /// 마감 캔들 이벤트 방출 여부
    #[serde(default)]
    pub emit_candles: bool,
}

fn default_window_size() -> usize {
    3
}
fn default_accumulation_threshold() -> Decimal {
    dec!(0.002)
}
fn default_manipulation_wick_ratio() -> Decimal {
    dec!(0.5)
}
fn default_expansion_threshold() -> Decimal {
    dec!(0.004)
}
fn default_expansion_overrides() -> HashMap<Timeframe, Decimal> {
    HashMap::from([(Timeframe::H4, dec!(0.0045))])
}
fn default_max_wick_ratio() -> Decimal {
    dec!(0.3)
}
fn default_history_retention() -> usize {
    100
}
fn default_dedup_epsilon() -> Decimal {
    dec!(0.00001)
}
fn default_channel_capacity() -> usize {
    1024
}
fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            rule: RuleKind::default(),
            accumulation_threshold: default_accumulation_threshold(),
            manipulation_wick_ratio: default_manipulation_wick_ratio(),
            expansion_threshold: default_expansion_threshold(),
            expansion_threshold_overrides: default_expansion_overrides(),
            max_wick_ratio: default_max_wick_ratio(),
            levels: LevelConfig::default(),
            history_retention: default_history_retention(),
            dedup_epsilon: default_dedup_epsilon(),
            channel_capacity: default_channel_capacity(),
            emit_diagnostics: default_true(),
            emit_candles: false,
        }
    }
}

impl PipelineConfig {
    /// 설정 값을 검증합니다.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.window_size < 2 {
            return Err(ConfigError::invalid(
                "pipeline.window_size",
                format!("must be >= 2, got {}", self.window_size),
            ));
        }
        if self.history_retention < self.window_size {
            return Err(ConfigError::invalid(
                "pipeline.history_retention",
                "must be >= window_size",
            ));
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::invalid("pipeline.channel_capacity", "must be > 0"));
        }

        ensure_positive("pipeline.accumulation_threshold", self.accumulation_threshold)?;
        ensure_positive("pipeline.expansion_threshold", self.expansion_threshold)?;
        for (tf, threshold) in &self.expansion_threshold_overrides {
            ensure_positive(
                &format!("pipeline.expansion_threshold_overrides.{}", tf),
                *threshold,
            )?;
        }
        ensure_unit_interval("pipeline.manipulation_wick_ratio", self.manipulation_wick_ratio)?;
        ensure_unit_interval("pipeline.max_wick_ratio", self.max_wick_ratio)?;

        if self.dedup_epsilon.is_sign_negative() {
            return Err(ConfigError::invalid("pipeline.dedup_epsilon", "must be >= 0"));
        }
        if self.levels.sl_ratio.is_sign_negative() {
            return Err(ConfigError::invalid("pipeline.levels.sl_ratio", "must be >= 0"));
        }
        match self.levels.target {
            TargetMode::RangeRatio { tp_ratio } => {
                ensure_positive("pipeline.levels.target.tp_ratio", tp_ratio)?
            }
            TargetMode::RewardMultiple { reward_ratio } => {
                ensure_positive("pipeline.levels.target.reward_ratio", reward_ratio)?
            }
        }

        Ok(())
    }
}

/// 허용하는 최대 시간대 오프셋 (UTC±14시).
pub const MAX_UTC_OFFSET_SECS: i64 = 14 * 3_600;

/// 타이머 기반 점검 설정.
///
/// `offset_secs >= 0`이면 기간 시작 후 `offset_secs`초에,
/// 음수이면 기간 종료 `|offset_secs|`초 전에 점검합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ScheduleConfig {
    /// 점검 주기 (없으면 시리즈 타임프레임)
    #[serde(default)]
    pub period: Option<Timeframe>,
    /// 경계 기준 오프셋 (초)
    #[serde(default)]
    pub offset_secs: i64,
    /// 기간 정렬에 사용할 현지 시간대 오프셋 (초)
    #[serde(default)]
    pub utc_offset_secs: i64,
    /// 형성 중인 캔들을 윈도우의 마지막 캔들로 포함할지 여부
    #[serde(default)]
    pub include_forming: bool,
}

impl ScheduleConfig {
    /// 주어진 시리즈 타임프레임에 대한 점검 주기.
    pub fn period_for(&self, series: Timeframe) -> Timeframe {
        self.period.unwrap_or(series)
    }

    /// 설정 값을 검증합니다.
    pub fn validate(&self, series: Timeframe) -> ConfigResult<()> {
        let period = self.period_for(series);
        if period.as_secs() < series.as_secs() {
            return Err(ConfigError::invalid(
                format!("schedule.{}.period", series),
                format!("{} is shorter than the series timeframe", period),
            ));
        }
        if self.offset_secs.unsigned_abs() >= period.as_secs().unsigned_abs() {
            return Err(ConfigError::invalid(
                format!("schedule.{}.offset_secs", series),
                format!("|{}| must be < {}s", self.offset_secs, period.as_secs()),
            ));
        }
        if self.utc_offset_secs.unsigned_abs() > MAX_UTC_OFFSET_SECS.unsigned_abs() {
            return Err(ConfigError::invalid(
                format!("schedule.{}.utc_offset_secs", series),
                format!("|{}| must be <= {}s", self.utc_offset_secs, MAX_UTC_OFFSET_SECS),
            ));
        }
        Ok(())
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// `symbols` 키는 대소문자를 보존해야 하므로 파일은 TOML로 직접 읽고,
    /// 환경 변수는 `logging`/`pipeline` 섹션에만 적용합니다
    /// (예: `CRT__PIPELINE__WINDOW_SIZE=4`).
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))?;

        let mut config: AppConfig = toml::from_str(&content)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> ConfigResult<()> {
        #[derive(Serialize)]
        struct Overridable<'a> {
            logging: &'a LoggingConfig,
            pipeline: &'a PipelineConfig,
        }

        let merged = config::Config::builder()
            .add_source(config::Config::try_from(&Overridable {
                logging: &self.logging,
                pipeline: &self.pipeline,
            })?)
            .add_source(
                config::Environment::with_prefix("CRT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        self.logging = merged.get("logging")?;
        self.pipeline = merged.get("pipeline")?;
        Ok(())
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> ConfigResult<Self> {
        Self::load("config/default.toml")
    }

    /// TOML 문자열에서 설정을 로드합니다.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 현재 설정을 TOML 문자열로 직렬화합니다.
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 전체 설정을 검증합니다.
    pub fn validate(&self) -> ConfigResult<()> {
        self.pipeline.validate()?;

        if self.symbols.is_empty() {
            return Err(ConfigError::invalid("symbols", "at least one symbol is required"));
        }
        for (symbol, timeframes) in &self.symbols {
            if timeframes.is_empty() {
                return Err(ConfigError::invalid(
                    format!("symbols.{}", symbol),
                    "at least one timeframe is required",
                ));
            }
        }
        for (timeframe, schedule) in &self.schedule {
            schedule.validate(*timeframe)?;
        }

        Ok(())
    }

    /// 시리즈 타임프레임에 적용할 스케줄을 반환합니다.
    pub fn schedule_for(&self, timeframe: Timeframe) -> Option<ScheduleConfig> {
        self.schedule.get(&timeframe).copied()
    }
}

fn ensure_positive(field: &str, value: Decimal) -> ConfigResult<()> {
    if value <= Decimal::ZERO {
        return Err(ConfigError::invalid(field, format!("must be > 0, got {}", value)));
    }
    Ok(())
}

fn ensure_unit_interval(field: &str, value: Decimal) -> ConfigResult<()> {
    if value <= Decimal::ZERO || value > Decimal::ONE {
        return Err(ConfigError::invalid(
            field,
            format!("must be in (0, 1], got {}", value),
        ));
    }
    Ok(())
}
