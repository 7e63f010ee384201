/**
* filename : statistics
* author : HAMA
* date: 2025. 5. 11.
* description: 이벤트 결과 배치의 성과/위험 지표
**/

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analytics::metric::Metric;
use crate::analytics::series::sort_chronologically;
use crate::config::AnalyticsConfig;
use crate::error::AnalyticsError;
use crate::models::{EventOutcome, EventType};
use crate::utils::math;

/// 샤프/소르티노 계산 설정
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskSettings {
  pub risk_free_rate: f64,
  pub annualization: f64,
}

impl Default for RiskSettings {
  fn default() -> Self {
    RiskSettings {
      risk_free_rate: 0.0,
      annualization: 1.0,
    }
  }
}

impl From<&AnalyticsConfig> for RiskSettings {
  fn from(cfg: &AnalyticsConfig) -> Self {
    RiskSettings {
      risk_free_rate: cfg.risk_free_rate,
      annualization: cfg.annualization,
    }
  }
}

/// 배치 전체 또는 이벤트 유형 하나에 대한 지표
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeMetrics {
  pub total_events: usize,
  pub win_rate: f64,
  pub avg_return: f64,
  pub median_return: f64,
  pub std_dev: f64,
  pub total_return: f64,
  pub avg_win: Metric,
  pub avg_loss: Metric,
  pub best_trade: f64,
  pub worst_trade: f64,
  pub avg_volatility: f64,
  pub sharpe: f64,
  pub sortino: f64,
  /// 누적 수익 경로의 최대 하락폭 (0 이하)
  pub max_drawdown: f64,
  pub var_95: f64,
  pub cvar_95: f64,
  pub profit_factor: Metric,
  pub avg_sentiment: Metric,
}

pub type OverallMetrics = OutcomeMetrics;
pub type EventTypeMetrics = OutcomeMetrics;

impl OutcomeMetrics {
  /// 배치 전체를 다시 계산한다. 빈 배치는 NoData.
  pub fn compute(outcomes: &[EventOutcome], settings: &RiskSettings) -> Result<Self, AnalyticsError> {
    if outcomes.is_empty() {
      return Err(AnalyticsError::NoData);
    }

    let sorted = sort_chronologically(outcomes);
    let returns: Vec<f64> = sorted.iter().map(|o| o.total_return).collect();
    let n = returns.len() as f64;

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();

    let avg_return = math::average(&returns).ok_or(AnalyticsError::NoData)?;
    let std_dev = math::standard_deviation(&returns).ok_or(AnalyticsError::NoData)?;
    let median_return = math::median(&returns).ok_or(AnalyticsError::NoData)?;
    let var_95 = PerformanceMetrics::value_at_risk(&returns, 95.0).ok_or(AnalyticsError::NoData)?;

    let sentiments: Vec<f64> = sorted.iter().filter_map(|o| o.sentiment).collect();
    let volatilities: Vec<f64> = sorted.iter().map(|o| o.volatility).collect();

    Ok(OutcomeMetrics {
      total_events: returns.len(),
      win_rate: wins.len() as f64 / n,
      avg_return,
      median_return,
      std_dev,
      total_return: returns.iter().sum(),
      avg_win: math::average(&wins).into(),
      avg_loss: math::average(&losses).into(),
      best_trade: returns.iter().copied().fold(f64::NEG_INFINITY, f64::max),
      worst_trade: returns.iter().copied().fold(f64::INFINITY, f64::min),
      avg_volatility: math::average(&volatilities).unwrap_or(0.0),
      sharpe: PerformanceMetrics::sharpe_ratio(&returns, settings),
      sortino: PerformanceMetrics::sortino_ratio(&returns, settings),
      max_drawdown: PerformanceMetrics::max_drawdown(&returns),
      var_95,
      cvar_95: PerformanceMetrics::conditional_value_at_risk(&returns, var_95),
      profit_factor: PerformanceMetrics::profit_factor(&returns),
      avg_sentiment: math::average(&sentiments).into(),
    })
  }

  /// 배치에 존재하는 이벤트 유형별 지표
  pub fn compute_by_event_type(
    outcomes: &[EventOutcome],
    settings: &RiskSettings,
  ) -> Result<BTreeMap<EventType, EventTypeMetrics>, AnalyticsError> {
    if outcomes.is_empty() {
      return Err(AnalyticsError::NoData);
    }

    let mut groups: BTreeMap<EventType, Vec<EventOutcome>> = BTreeMap::new();
    for outcome in outcomes {
      groups.entry(outcome.event_type).or_default().push(outcome.clone());
    }

    groups
      .into_iter()
      .map(|(event_type, group)| Ok((event_type, Self::compute(&group, settings)?)))
      .collect()
  }
}

/// 수익률 시퀀스에 대한 위험 지표 계산
pub struct PerformanceMetrics;

impl PerformanceMetrics {
  /// 샤프 비율. 표준편차가 0이면 0
  pub fn sharpe_ratio(returns: &[f64], settings: &RiskSettings) -> f64 {
    let (mean, std_dev) = match (math::average(returns), math::standard_deviation(returns)) {
      (Some(m), Some(s)) => (m, s),
      _ => return 0.0,
    };

    if std_dev == 0.0 {
      return 0.0;
    }

    (mean - settings.risk_free_rate) / std_dev * settings.annualization.sqrt()
  }

  /// 소르티노 비율. 하방 편차는 음수 수익만의 모집단 표준편차
  ///
  /// 음수 수익이 2개 미만이면 전체 수익률의 표준편차를 쓴다
  pub fn sortino_ratio(returns: &[f64], settings: &RiskSettings) -> f64 {
    let mean = match math::average(returns) {
      Some(m) => m,
      None => return 0.0,
    };

    let negatives: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let deviation_source = if negatives.len() >= 2 { &negatives[..] } else { returns };
    let downside = math::standard_deviation(deviation_source).unwrap_or(0.0);

    if downside == 0.0 {
      return 0.0;
    }

    (mean - settings.risk_free_rate) / downside * settings.annualization.sqrt()
  }

  /// 최대 손실폭. 시간순 누적 수익 경로에서 trough - peak
  ///
  /// 고점은 첫 누적값에서 시작한다. 원점 0은 경로에 없다
  pub fn max_drawdown(chronological_returns: &[f64]) -> f64 {
    let mut cumulative = 0.0;
    let mut peak = f64::NEG_INFINITY;
    let mut max_drawdown = 0.0_f64;

    for r in chronological_returns {
      cumulative += r;
      if cumulative > peak {
        peak = cumulative;
      } else {
        max_drawdown = max_drawdown.min(cumulative - peak);
      }
    }

    max_drawdown
  }

  /// 역사적 VaR: 수익률 분포의 (100 - confidence) 백분위수
  pub fn value_at_risk(returns: &[f64], confidence: f64) -> Option<f64> {
    math::percentile(returns, 100.0 - confidence)
  }

  /// VaR 이하 수익률의 평균
  pub fn conditional_value_at_risk(returns: &[f64], var: f64) -> f64 {
    let tail: Vec<f64> = returns.iter().copied().filter(|r| *r <= var).collect();
    math::average(&tail).unwrap_or(var)
  }

  /// 수익 대 손실 비율
  pub fn profit_factor(returns: &[f64]) -> Metric {
    let gross_profit: f64 = returns.iter().filter(|r| **r > 0.0).sum();
    let gross_loss: f64 = returns.iter().filter(|r| **r < 0.0).map(|r| r.abs()).sum();

    if gross_loss == 0.0 {
      return if gross_profit > 0.0 { Metric::PositiveInfinity } else { Metric::Undefined };
    }

    Metric::Value(gross_profit / gross_loss)
  }
}
