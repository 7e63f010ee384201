//! 공용 유틸리티
//!
//! 날짜 파싱, 통계 보조 함수, 표시 포맷팅 제공

pub mod format;
pub mod logging;
pub mod math;

use chrono::NaiveDate;

/// 날짜 문자열 파싱. `YYYY-MM-DD` 또는 ISO 타임스탬프의 날짜 부분
pub fn parse_date(value: &str) -> Option<NaiveDate> {
  let trimmed = value.trim();
  let head = trimmed.get(..10).unwrap_or(trimmed);
  NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_date() {
    let expected = NaiveDate::from_ymd_opt(2024, 3, 7);
    assert_eq!(parse_date("2024-03-07"), expected);
    assert_eq!(parse_date("2024-03-07T16:00:00"), expected);
    assert_eq!(parse_date("03/07/2024"), None);
  }
}
