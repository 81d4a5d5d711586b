//! # CRT Core
//!
//! CRT 신호 파이프라인의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 타임프레임 및 시리즈 키 (심볼 × 타임프레임)
//! - 틱/원시 캔들 입력과 와이어 레코드 검증
//! - 캔들(OHLC 바) 엔티티
//! - 트레이딩 신호 및 진단 타입
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod types;

pub use crate::config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use types::*;
