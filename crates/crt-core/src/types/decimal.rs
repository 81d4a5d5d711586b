//! 정밀한 가격 계산을 위한 Decimal 유틸리티.
//!
//! 이 모듈은 가격 타입과 0 나눗셈을 막는 비율 계산 헬퍼를 제공합니다.

use rust_decimal::Decimal;

/// 금융 정밀도를 위한 가격 타입.
pub type Price = Decimal;

/// Decimal 연산을 위한 확장 트레이트.
pub trait DecimalExt {
    /// 분모가 0이면 `None`을 반환하는 나눗셈.
    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal>;

    /// 허용 오차(epsilon) 이내로 같은지 확인합니다.
    fn approx_eq(&self, other: Decimal, epsilon: Decimal) -> bool;
}

impl DecimalExt for Decimal {
    fn checked_ratio(&self, denominator: Decimal) -> Option<Decimal> {
        if denominator.is_zero() {
            return None;
        }
        self.checked_div(denominator)
    }

    fn approx_eq(&self, other: Decimal, epsilon: Decimal) -> bool {
        (*self - other).abs() <= epsilon
    }
}
