//! 표시용 포맷팅
//!
//! 0 / NaN / ∞ 처리는 여기서만 한다. 호출 측은 값을 그대로 넘긴다.

use crate::analytics::Metric;

pub const PLACEHOLDER: &str = "N/A";
pub const INFINITY_SYMBOL: &str = "∞";

fn render(metric: Metric, decimals: usize, scale: f64, suffix: &str) -> String {
  match metric {
    Metric::Value(v) if v.is_finite() => format!("{:.*}{}", decimals, v * scale, suffix),
    Metric::Value(v) if v == f64::INFINITY => INFINITY_SYMBOL.to_string(),
    Metric::PositiveInfinity => INFINITY_SYMBOL.to_string(),
    _ => PLACEHOLDER.to_string(),
  }
}

/// 비율 값을 백분율 문자열로 (0.05 -> "5.00%")
pub fn format_percent(value: impl Into<Metric>, decimals: usize) -> String {
  render(value.into(), decimals, 100.0, "%")
}

/// 일반 수치 (샤프, 수익 대 손실 비율 등)
pub fn format_number(value: impl Into<Metric>, decimals: usize) -> String {
  render(value.into(), decimals, 1.0, "")
}

/// 가격 표시 ("$123.45")
pub fn format_price(value: impl Into<Metric>) -> String {
  match value.into() {
    Metric::Value(v) if v.is_finite() => format!("${:.2}", v),
    _ => PLACEHOLDER.to_string(),
  }
}

/// 부호가 붙은 변화량 ("+1.25" / "-0.40")
pub fn format_signed(value: impl Into<Metric>, decimals: usize) -> String {
  match value.into() {
    Metric::Value(v) if v.is_finite() => format!("{:+.*}", decimals, v),
    other => render(other, decimals, 1.0, ""),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_percent() {
    assert_eq!(format_percent(0.05, 2), "5.00%");
    assert_eq!(format_percent(-0.123, 1), "-12.3%");
    assert_eq!(format_percent(Metric::Undefined, 2), PLACEHOLDER);
    assert_eq!(format_percent(f64::NAN, 2), PLACEHOLDER);
  }

  #[test]
  fn test_number_guards() {
    assert_eq!(format_number(1.5, 2), "1.50");
    assert_eq!(format_number(Metric::PositiveInfinity, 2), INFINITY_SYMBOL);
    assert_eq!(format_number(f64::INFINITY, 2), INFINITY_SYMBOL);
    assert_eq!(format_number(f64::NEG_INFINITY, 2), PLACEHOLDER);
  }

  #[test]
  fn test_price_and_signed() {
    assert_eq!(format_price(123.456), "$123.46");
    assert_eq!(format_price(Metric::Undefined), PLACEHOLDER);
    assert_eq!(format_signed(1.25, 2), "+1.25");
    assert_eq!(format_signed(-0.4, 2), "-0.40");
  }
}
