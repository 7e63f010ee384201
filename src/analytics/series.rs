//! 결과 배치에서 파생되는 시계열
//!
//! 모든 변환은 날짜 기준 안정 정렬 후 수행된다.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::models::{EventOutcome, EventType};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
  pub date: NaiveDate,
  pub value: f64,
}

/// 수익률(%) 히스토그램 구간. 마지막 구간만 상한 포함
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBucket {
  pub lower: f64,
  pub upper: f64,
  pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventBreakdown {
  pub event_type: EventType,
  pub count: usize,
  pub avg_return_pct: f64,
}

/// 렌더링용 파생 시계열 묶음
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedSeries {
  pub cumulative: Vec<SeriesPoint>,
  pub rolling: Vec<SeriesPoint>,
  pub rolling_window: usize,
  pub histogram: Vec<HistogramBucket>,
  pub breakdown: Vec<EventBreakdown>,
  pub top_trades: Vec<EventOutcome>,
  pub worst_trades: Vec<EventOutcome>,
}

impl DerivedSeries {
  pub fn build(
    outcomes: &[EventOutcome],
    rolling_window: usize,
    histogram_buckets: usize,
    top_n: usize,
  ) -> Result<Self, AnalyticsError> {
    let sorted = sort_chronologically(outcomes);

    Ok(DerivedSeries {
      cumulative: cumulative_returns(&sorted),
      rolling: rolling_returns(&sorted, rolling_window)?,
      rolling_window,
      histogram: return_histogram(&sorted, histogram_buckets)?,
      breakdown: event_breakdown(&sorted),
      top_trades: top_trades(&sorted, top_n),
      worst_trades: worst_trades(&sorted, top_n),
    })
  }
}

/// 날짜 오름차순 안정 정렬 (같은 날짜는 입력 순서 유지)
pub fn sort_chronologically(outcomes: &[EventOutcome]) -> Vec<EventOutcome> {
  let mut sorted = outcomes.to_vec();
  sorted.sort_by_key(|o| o.date);
  sorted
}

/// 누적 수익률 (단순 합산, 복리 아님)
pub fn cumulative_returns(outcomes: &[EventOutcome]) -> Vec<SeriesPoint> {
  let mut running = 0.0;
  sort_chronologically(outcomes)
    .into_iter()
    .map(|o| {
      running += o.total_return;
      SeriesPoint { date: o.date, value: running }
    })
    .collect()
}

/// 직전 `window`개 수익률의 합. index < window - 1 구간은 생략
pub fn rolling_returns(outcomes: &[EventOutcome], window: usize) -> Result<Vec<SeriesPoint>, AnalyticsError> {
  if window == 0 {
    return Err(AnalyticsError::InvalidParameter("rolling window must be > 0".to_string()));
  }

  let sorted = sort_chronologically(outcomes);
  let mut result = Vec::with_capacity(sorted.len().saturating_sub(window - 1));
  let mut sum = 0.0;

  for (i, outcome) in sorted.iter().enumerate() {
    sum += outcome.total_return;
    if i >= window {
      sum -= sorted[i - window].total_return;
    }
    if i + 1 >= window {
      result.push(SeriesPoint { date: outcome.date, value: sum });
    }
  }

  Ok(result)
}

/// total_return × 100 을 관측 최소~최대 범위의 고정 개수 구간으로 분할
pub fn return_histogram(outcomes: &[EventOutcome], buckets: usize) -> Result<Vec<HistogramBucket>, AnalyticsError> {
  if buckets == 0 {
    return Err(AnalyticsError::InvalidParameter("histogram buckets must be > 0".to_string()));
  }
  if outcomes.is_empty() {
    return Ok(Vec::new());
  }

  let values: Vec<f64> = outcomes.iter().map(|o| o.total_return * 100.0).collect();
  let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
  let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
  if hi - lo == 0.0 {
    lo -= 0.5;
    hi += 0.5;
  }

  let width = (hi - lo) / buckets as f64;
  let mut histogram: Vec<HistogramBucket> = (0..buckets)
    .map(|i| HistogramBucket {
      lower: lo + width * i as f64,
      upper: if i + 1 == buckets { hi } else { lo + width * (i + 1) as f64 },
      count: 0,
    })
    .collect();

  for v in values {
    let idx = (((v - lo) / width).floor() as usize).min(buckets - 1);
    histogram[idx].count += 1;
  }

  Ok(histogram)
}

/// 이벤트 유형별 건수와 평균 수익률(%)
pub fn event_breakdown(outcomes: &[EventOutcome]) -> Vec<EventBreakdown> {
  EventType::ALL
    .iter()
    .filter_map(|event_type| {
      let returns: Vec<f64> = outcomes
        .iter()
        .filter(|o| o.event_type == *event_type)
        .map(|o| o.total_return)
        .collect();
      if returns.is_empty() {
        return None;
      }
      Some(EventBreakdown {
        event_type: *event_type,
        count: returns.len(),
        avg_return_pct: returns.iter().sum::<f64>() / returns.len() as f64 * 100.0,
      })
    })
    .collect()
}

/// 수익률 상위 N개 거래
pub fn top_trades(outcomes: &[EventOutcome], n: usize) -> Vec<EventOutcome> {
  let mut ranked = sort_chronologically(outcomes);
  ranked.sort_by(|a, b| b.total_return.total_cmp(&a.total_return));
  ranked.truncate(n);
  ranked
}

/// 수익률 하위 N개 거래
pub fn worst_trades(outcomes: &[EventOutcome], n: usize) -> Vec<EventOutcome> {
  let mut ranked = sort_chronologically(outcomes);
  ranked.sort_by(|a, b| a.total_return.total_cmp(&b.total_return));
  ranked.truncate(n);
  ranked
}
