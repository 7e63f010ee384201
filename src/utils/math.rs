//! 수학 관련 유틸리티
//!
//! 통계 계산 함수 제공. 빈 입력은 None으로 처리한다.

use statrs::statistics::Statistics;

/// 값을 범위 내로 제한
pub fn clamp(value: f64, min_value: f64, max_value: f64) -> f64 {
  value.max(min_value).min(max_value)
}

/// 평균 계산
pub fn average(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }

  Some(values.iter().mean())
}

/// 모집단 표준 편차 (n으로 나눔)
pub fn standard_deviation(values: &[f64]) -> Option<f64> {
  if values.is_empty() {
    return None;
  }
  if values.len() == 1 {
    return Some(0.0);
  }

  Some(values.iter().population_std_dev())
}

/// 중앙값
pub fn median(values: &[f64]) -> Option<f64> {
  percentile(values, 50.0)
}

/// 선형 보간 백분위수. rank = p/100 * (n - 1)
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
  if values.is_empty() {
    return None;
  }

  let mut sorted = values.to_vec();
  sorted.sort_by(|a, b| a.total_cmp(b));

  let rank = clamp(pct, 0.0, 100.0) / 100.0 * (sorted.len() - 1) as f64;
  let lower = rank.floor() as usize;
  let upper = rank.ceil() as usize;
  let weight = rank - lower as f64;

  Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// 피어슨 상관계수. 길이가 다르거나 2 미만, 분산이 0이면 None
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
  if xs.len() != ys.len() || xs.len() < 2 {
    return None;
  }

  let sx = xs.iter().std_dev();
  let sy = ys.iter().std_dev();
  if !(sx > 0.0 && sy > 0.0) {
    return None;
  }

  let cov = xs.iter().covariance(ys.iter());
  let r = cov / (sx * sy);
  if r.is_finite() {
    Some(clamp(r, -1.0, 1.0))
  } else {
    None
  }
}

/// 수익률 계산 (비율)
pub fn calculate_return(entry_price: f64, exit_price: f64) -> f64 {
  (exit_price - entry_price) / entry_price
}
