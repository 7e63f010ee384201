//! 이벤트 결과 배치 분석
//!
//! 모든 계산은 순수 함수이며, 보고서는 전부 계산된 후에 한 번에 반환된다.

pub mod correlation;
pub mod metric;
pub mod monte_carlo;
pub mod series;
pub mod statistics;

pub use correlation::CorrelationMatrix;
pub use metric::Metric;
pub use monte_carlo::{MonteCarloParams, MonteCarloResult, MonteCarloScenario, MonteCarloSimulator, SimulationSummary};
pub use series::{DerivedSeries, EventBreakdown, HistogramBucket, SeriesPoint};
pub use statistics::{EventTypeMetrics, OutcomeMetrics, OverallMetrics, PerformanceMetrics, RiskSettings};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::models::{EventOutcome, EventType};
use crate::utils::format;

/// 렌더링 싱크로 전달되는 배치 분석 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsReport {
  pub overall: OverallMetrics,
  pub by_event_type: BTreeMap<EventType, EventTypeMetrics>,
  pub correlation: CorrelationMatrix,
  pub series: DerivedSeries,
  pub generated_at: DateTime<Utc>,
}

impl AnalyticsReport {
  pub fn from_batch(batch: &[EventOutcome], cfg: &AnalyticsConfig) -> Result<Self, AnalyticsError> {
    if batch.is_empty() {
      return Err(AnalyticsError::NoData);
    }

    let settings = RiskSettings::from(cfg);
    let sorted = series::sort_chronologically(batch);

    let overall = OutcomeMetrics::compute(&sorted, &settings)?;
    let by_event_type = OutcomeMetrics::compute_by_event_type(&sorted, &settings)?;
    let correlation = CorrelationMatrix::compute(&sorted)?;
    let series = DerivedSeries::build(&sorted, cfg.rolling_window, cfg.histogram_buckets, cfg.top_trades)?;

    Ok(AnalyticsReport {
      overall,
      by_event_type,
      correlation,
      series,
      generated_at: Utc::now(),
    })
  }

  /// 결과 요약 문자열 생성
  pub fn summary(&self) -> String {
    let m = &self.overall;
    let mut out = format!(
      "이벤트 분석 결과 요약:\n\
       이벤트 수: {}\n\
       승률: {}\n\
       평균 수익률: {}\n\
       총 수익률: {}\n\
       평균 이익: {}\n\
       평균 손실: {}\n\
       최고 거래: {}\n\
       최저 거래: {}\n\
       샤프 비율: {}\n\
       소르티노 비율: {}\n\
       최대 손실폭: {}\n\
       VaR(95%): {}\n\
       수익 대 손실 비율: {}",
      m.total_events,
      format::format_percent(m.win_rate, 1),
      format::format_percent(m.avg_return, 2),
      format::format_percent(m.total_return, 2),
      format::format_percent(m.avg_win, 2),
      format::format_percent(m.avg_loss, 2),
      format::format_percent(m.best_trade, 2),
      format::format_percent(m.worst_trade, 2),
      format::format_number(m.sharpe, 2),
      format::format_number(m.sortino, 2),
      format::format_percent(m.max_drawdown, 2),
      format::format_percent(m.var_95, 2),
      format::format_number(m.profit_factor, 2),
    );

    for (event_type, metrics) in &self.by_event_type {
      out.push_str(&format!(
        "\n  [{}] {}건 - 승률 {} - 평균 {}",
        event_type,
        metrics.total_events,
        format::format_percent(metrics.win_rate, 1),
        format::format_percent(metrics.avg_return, 2),
      ));
    }

    out
  }
}
