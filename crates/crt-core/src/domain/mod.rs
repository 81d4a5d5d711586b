//! 캔들 집계와 패턴 감지를 위한 도메인 모델.

mod candle;
mod market_data;
mod signal;

pub use candle::*;
pub use market_data::*;
pub use signal::*;
