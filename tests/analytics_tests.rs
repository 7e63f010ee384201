//! 배치 분석 테스트
//!
//! 요약 지표, 파생 시계열, 상관관계 행렬 검증

use chrono::NaiveDate;
use rstest::rstest;
use eventQuant::analytics::{series, AnalyticsReport, CorrelationMatrix, Metric, OutcomeMetrics, RiskSettings};
use eventQuant::config::AnalyticsConfig;
use eventQuant::error::AnalyticsError;
use eventQuant::models::{EventOutcome, EventType};
use eventQuant::utils::format;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn outcome(day: u32, event_type: EventType, total_return: f64) -> EventOutcome {
  let entry = 100.0;
  EventOutcome::new(date(2024, 1, day), event_type, entry, entry * (1.0 + total_return), total_return)
}

#[test]
fn test_two_trade_earnings_batch() {
  let batch = vec![
    EventOutcome::new(date(2024, 1, 1), EventType::Earnings, 100.0, 105.0, 0.05),
    EventOutcome::new(date(2024, 1, 15), EventType::Earnings, 100.0, 95.0, -0.05),
  ];

  let m = OutcomeMetrics::compute(&batch, &RiskSettings::default()).unwrap();
  assert_eq!(m.total_events, 2);
  assert_eq!(m.win_rate, 0.5);
  assert_eq!(m.avg_win, Metric::Value(0.05));
  assert_eq!(m.avg_loss, Metric::Value(-0.05));
  assert_eq!(m.best_trade, 0.05);
  assert_eq!(m.worst_trade, -0.05);
  assert_eq!(m.profit_factor, Metric::Value(1.0));
}

#[test]
fn test_empty_batch_is_no_data() {
  let cfg = AnalyticsConfig::default();
  assert!(matches!(AnalyticsReport::from_batch(&[], &cfg), Err(AnalyticsError::NoData)));
  assert!(matches!(OutcomeMetrics::compute(&[], &RiskSettings::default()), Err(AnalyticsError::NoData)));
  assert!(matches!(CorrelationMatrix::compute(&[]), Err(AnalyticsError::NoData)));
}

#[rstest]
#[case(vec![0.05, 0.02], Metric::PositiveInfinity)]
#[case(vec![0.0, 0.0], Metric::Undefined)]
#[case(vec![0.06, -0.02, -0.01], Metric::Value(2.0))]
#[case(vec![-0.03], Metric::Value(0.0))]
fn test_profit_factor(#[case] returns: Vec<f64>, #[case] expected: Metric) {
  let batch: Vec<EventOutcome> = returns
    .iter()
    .enumerate()
    .map(|(i, r)| outcome(i as u32 + 1, EventType::Fed, *r))
    .collect();

  let m = OutcomeMetrics::compute(&batch, &RiskSettings::default()).unwrap();
  match (m.profit_factor, expected) {
    (Metric::Value(a), Metric::Value(b)) => assert!((a - b).abs() < 1e-9, "{} != {}", a, b),
    (actual, expected) => assert_eq!(actual, expected),
  }
}

#[test]
fn test_undefined_metric_does_not_block_others() {
  // 손실 거래가 없어도 나머지 지표는 계산된다
  let batch = vec![outcome(1, EventType::Dividend, 0.01), outcome(2, EventType::Dividend, 0.03)];
  let m = OutcomeMetrics::compute(&batch, &RiskSettings::default()).unwrap();

  assert_eq!(m.avg_loss, Metric::Undefined);
  assert!(m.avg_loss.try_value("avg_loss").is_err());
  assert_eq!(format::format_percent(m.avg_loss, 2), format::PLACEHOLDER);
  assert_eq!(format::format_number(m.profit_factor, 2), format::INFINITY_SYMBOL);
  assert!((m.win_rate - 1.0).abs() < 1e-12);
  assert_eq!(m.max_drawdown, 0.0);
}

#[rstest]
#[case(vec![0.05, -0.05])]
#[case(vec![0.1, 0.2, -0.3, 0.0, 0.05])]
#[case(vec![-0.01, -0.02, -0.03])]
fn test_win_rate_and_sum_bounds(#[case] returns: Vec<f64>) {
  let batch: Vec<EventOutcome> = returns
    .iter()
    .enumerate()
    .map(|(i, r)| outcome(i as u32 + 1, EventType::Merger, *r))
    .collect();
  let m = OutcomeMetrics::compute(&batch, &RiskSettings::default()).unwrap();

  assert!((0.0..=1.0).contains(&m.win_rate));
  let gains: f64 = returns.iter().filter(|r| **r > 0.0).sum();
  let losses: f64 = returns.iter().filter(|r| **r < 0.0).sum();
  assert!(gains >= 0.0 && losses <= 0.0);
  assert!(m.max_drawdown <= 0.0);
}

#[test]
fn test_cumulative_series_follows_generator() {
  // 일부러 순서를 섞어서 넣는다
  let batch = vec![
    outcome(20, EventType::Earnings, 0.02),
    outcome(3, EventType::Earnings, -0.01),
    outcome(11, EventType::Fed, 0.04),
    outcome(7, EventType::Earnings, 0.03),
  ];
  let sorted = series::sort_chronologically(&batch);
  let cumulative = series::cumulative_returns(&sorted);

  assert_eq!(cumulative.len(), sorted.len());
  assert_eq!(cumulative[0].value, sorted[0].total_return);
  for i in 1..cumulative.len() {
    let expected = cumulative[i - 1].value + sorted[i].total_return;
    assert!((cumulative[i].value - expected).abs() < 1e-12);
    assert!(cumulative[i].date >= cumulative[i - 1].date);
  }
}

#[test]
fn test_rolling_window_omits_early_indices() {
  let batch: Vec<EventOutcome> = (1..=10).map(|d| outcome(d, EventType::Fda, 0.01)).collect();
  let rolling = series::rolling_returns(&batch, 4).unwrap();

  assert_eq!(rolling.len(), 7);
  assert_eq!(rolling[0].date, date(2024, 1, 4));
  assert!(rolling.iter().all(|p| (p.value - 0.04).abs() < 1e-12));

  assert!(series::rolling_returns(&batch, 30).unwrap().is_empty());
}

#[test]
fn test_histogram_counts_every_outcome() {
  let batch: Vec<EventOutcome> = [-0.04, -0.01, 0.0, 0.02, 0.05, 0.05]
    .iter()
    .enumerate()
    .map(|(i, r)| outcome(i as u32 + 1, EventType::ProductLaunch, *r))
    .collect();

  let buckets = series::return_histogram(&batch, 5).unwrap();
  assert_eq!(buckets.len(), 5);
  assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), batch.len());
  assert!((buckets[0].lower - -4.0).abs() < 1e-9);
  assert!((buckets[4].upper - 5.0).abs() < 1e-9);
}

#[test]
fn test_correlation_matrix_is_symmetric() {
  let batch = vec![
    outcome(1, EventType::Earnings, 0.01),
    outcome(2, EventType::Fed, 0.02),
    outcome(3, EventType::Earnings, 0.03),
    outcome(4, EventType::Fed, 0.05),
    outcome(5, EventType::Earnings, -0.02),
    outcome(6, EventType::Fed, -0.01),
    outcome(7, EventType::Dividend, 0.01),
    outcome(8, EventType::Dividend, -0.03),
    outcome(9, EventType::Dividend, 0.02),
  ];

  let matrix = CorrelationMatrix::compute(&batch).unwrap();
  assert!(matrix.is_symmetric());

  let types = matrix.event_types();
  for a in &types {
    assert_eq!(matrix.get(*a, *a), Some(1.0));
    for b in &types {
      if let Some(v) = matrix.get(*a, *b) {
        assert!((-1.0..=1.0).contains(&v));
        assert_eq!(Some(v), matrix.get(*b, *a));
      }
    }
  }

  // 순위별 짝: (0.01,0.02), (0.03,0.05), (-0.02,-0.01) -> 강한 양의 상관
  let earnings_fed = matrix.get(EventType::Earnings, EventType::Fed).unwrap();
  assert!(earnings_fed > 0.9);
}

#[test]
fn test_single_outcome_type_has_no_correlation() {
  let batch = vec![outcome(1, EventType::Earnings, 0.01), outcome(2, EventType::Fed, 0.02)];
  let matrix = CorrelationMatrix::compute(&batch).unwrap();
  assert!(matrix.get(EventType::Earnings, EventType::Fed).is_none());
}

#[test]
fn test_report_is_complete() {
  let batch = vec![
    outcome(1, EventType::Earnings, 0.05).with_sentiment(0.4),
    outcome(2, EventType::Fed, -0.02).with_sentiment(-0.1),
    outcome(3, EventType::Earnings, 0.01),
  ];
  let report = AnalyticsReport::from_batch(&batch, &AnalyticsConfig::default()).unwrap();

  assert_eq!(report.overall.total_events, 3);
  assert_eq!(report.by_event_type.len(), 2);
  assert_eq!(report.by_event_type[&EventType::Earnings].total_events, 2);
  assert_eq!(report.series.cumulative.len(), 3);
  assert!(report.summary().contains("이벤트 수: 3"));

  let json = serde_json::to_value(&report).unwrap();
  assert!(json["overall"]["avg_sentiment"]["kind"] == "value");
}
