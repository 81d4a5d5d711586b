//! CRT 신호 파이프라인 재생 도구.
//!
//! 기록된 시세 파일(CSV, JSONL)을 읽어 디스패처로 흘려보내고, 방출된 신호와
//! 진단을 출력합니다:
//! - `feed` - 입력 파일 리더
//! - `replay` - 이벤트 시간 기준 재생 루프

pub mod error;
pub mod feed;
pub mod replay;

pub use error::{FeedError, Result};
pub use feed::FeedFormat;
pub use replay::ReplayOptions;
