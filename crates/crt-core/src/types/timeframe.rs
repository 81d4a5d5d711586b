//! 캔들 집계를 위한 타임프레임 정의.
//!
//! 이 모듈은 다양한 시간 간격을 나타내는 타임프레임 타입과
//! 경계(boundary) 정렬 계산을 정의합니다.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// 캔들 타임프레임.
///
/// 직렬화 시 `"1m"`, `"4h"` 같은 라벨 문자열을 사용합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Timeframe {
    /// 1초봉
    S1,
    /// 5초봉
    S5,
    /// 15초봉
    S15,
    /// 1분봉
    M1,
    /// 3분봉
    M3,
    /// 5분봉
    M5,
    /// 15분봉
    M15,
    /// 30분봉
    M30,
    /// 1시간봉
    H1,
    /// 2시간봉
    H2,
    /// 4시간봉
    H4,
    /// 6시간봉
    H6,
    /// 8시간봉
    H8,
    /// 12시간봉
    H12,
    /// 일봉
    D1,
    /// 3일봉
    D3,
    /// 주봉
    W1,
    /// 월봉
    MN1,
}

impl Timeframe {
    /// 지원하는 모든 타임프레임 (짧은 순).
    pub const ALL: [Timeframe; 18] = [
        Timeframe::S1,
        Timeframe::S5,
        Timeframe::S15,
        Timeframe::M1,
        Timeframe::M3,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H2,
        Timeframe::H4,
        Timeframe::H6,
        Timeframe::H8,
        Timeframe::H12,
        Timeframe::D1,
        Timeframe::D3,
        Timeframe::W1,
        Timeframe::MN1,
    ];

    /// 지원하는 모든 타임프레임.
    pub fn all() -> &'static [Timeframe] {
        &Self::ALL
    }

    /// 이 타임프레임의 기간을 반환합니다.
    pub fn duration(&self) -> Duration {
        match self {
            Timeframe::S1 => Duration::from_secs(1),
            Timeframe::S5 => Duration::from_secs(5),
            Timeframe::S15 => Duration::from_secs(15),
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M3 => Duration::from_secs(3 * 60),
            Timeframe::M5 => Duration::from_secs(5 * 60),
            Timeframe::M15 => Duration::from_secs(15 * 60),
            Timeframe::M30 => Duration::from_secs(30 * 60),
            Timeframe::H1 => Duration::from_secs(60 * 60),
            Timeframe::H2 => Duration::from_secs(2 * 60 * 60),
            Timeframe::H4 => Duration::from_secs(4 * 60 * 60),
            Timeframe::H6 => Duration::from_secs(6 * 60 * 60),
            Timeframe::H8 => Duration::from_secs(8 * 60 * 60),
            Timeframe::H12 => Duration::from_secs(12 * 60 * 60),
            Timeframe::D1 => Duration::from_secs(24 * 60 * 60),
            Timeframe::D3 => Duration::from_secs(3 * 24 * 60 * 60),
            Timeframe::W1 => Duration::from_secs(7 * 24 * 60 * 60),
            Timeframe::MN1 => Duration::from_secs(30 * 24 * 60 * 60), // 근사값
        }
    }

    /// 이 타임프레임의 초 단위 값을 반환합니다.
    pub fn as_secs(&self) -> i64 {
        self.duration().as_secs() as i64
    }

    /// 주어진 epoch(초)가 속한 기간의 시작 시각을 반환합니다.
    ///
    /// `start = epoch - (epoch mod timeframe)`. 음수 epoch에서도 내림 정렬됩니다.
    pub fn align(&self, epoch: i64) -> i64 {
        epoch - epoch.rem_euclid(self.as_secs())
    }

    /// 현지 시간대 오프셋(초)을 반영한 기간 시작 시각을 반환합니다.
    ///
    /// 경계는 현지 시간 기준으로 정렬되며 결과는 다시 UTC epoch입니다.
    /// i64 범위 끝에서는 포화됩니다.
    pub fn align_with_offset(&self, epoch: i64, utc_offset_secs: i64) -> i64 {
        self.align(epoch.saturating_add(utc_offset_secs))
            .saturating_sub(utc_offset_secs)
    }

    /// 라벨 문자열을 반환합니다.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::S1 => "1s",
            Timeframe::S5 => "5s",
            Timeframe::S15 => "15s",
            Timeframe::M1 => "1m",
            Timeframe::M3 => "3m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H2 => "2h",
            Timeframe::H4 => "4h",
            Timeframe::H6 => "6h",
            Timeframe::H8 => "8h",
            Timeframe::H12 => "12h",
            Timeframe::D1 => "1d",
            Timeframe::D3 => "3d",
            Timeframe::W1 => "1w",
            Timeframe::MN1 => "1M",
        }
    }

    /// 라벨 문자열에서 파싱합니다.
    pub fn from_label(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|tf| tf.label() == s)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| format!("Invalid timeframe: {}", s))
    }
}

impl From<Timeframe> for String {
    fn from(tf: Timeframe) -> Self {
        tf.label().to_string()
    }
}

impl TryFrom<String> for Timeframe {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeframe_duration() {
        assert_eq!(Timeframe::S5.as_secs(), 5);
        assert_eq!(Timeframe::M1.as_secs(), 60);
        assert_eq!(Timeframe::H1.as_secs(), 3600);
        assert_eq!(Timeframe::D1.as_secs(), 86400);
    }

    #[test]
    fn test_timeframe_label_roundtrip() {
        for tf in Timeframe::ALL {
            assert_eq!(Timeframe::from_label(tf.label()), Some(tf));
        }
        assert!("7m".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_align() {
        assert_eq!(Timeframe::H1.align(7_265), 7_200);
        assert_eq!(Timeframe::H1.align(7_200), 7_200);
        assert_eq!(Timeframe::M1.align(-1), -60);
    }

    #[test]
    fn test_align_with_local_offset() {
        // UTC+2 기준 4시간 경계는 현지 00/04/08시 == UTC 22/02/06시
        let utc_midnight = 86_400 * 10;
        assert_eq!(
            Timeframe::H4.align_with_offset(utc_midnight + 60, 7_200),
            utc_midnight - 7_200
        );
        assert_eq!(
            Timeframe::H4.align_with_offset(utc_midnight + 7_205, 7_200),
            utc_midnight + 7_200
        );
    }

    #[test]
    fn test_align_with_offset_saturates() {
        let aligned = Timeframe::M1.align_with_offset(i64::MAX - 5, 3_600);
        assert!(aligned <= i64::MAX - 5);
        assert_eq!(aligned.rem_euclid(60), 0);
    }

    #[test]
    fn test_serde_label() {
        let json = serde_json::to_string(&Timeframe::H4).unwrap();
        assert_eq!(json, "\"4h\"");
        let tf: Timeframe = serde_json::from_str("\"15s\"").unwrap();
        assert_eq!(tf, Timeframe::S15);
    }
}
