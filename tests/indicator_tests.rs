//! 스트리밍 지표 테스트
//!
//! 틱 창, SMA, 전체 창 RSI 검증

use rstest::rstest;
use eventQuant::error::AnalyticsError;
use eventQuant::indicators::{Indicator, SimpleMovingAverage, StreamingIndicatorEngine, LOSS_EPSILON};
use eventQuant::models::PriceTick;

const BASE_TS: i64 = 1_715_000_000_000;

fn tick(i: usize, price: f64) -> PriceTick {
  PriceTick::new(BASE_TS + i as i64 * 1000, price, 10.0 + i as f64)
}

/// 매 틱마다 창 전체로 다시 계산한 RSI
fn recompute_rsi(prices: &[f64]) -> Option<f64> {
  if prices.len() < 2 {
    return None;
  }
  let deltas: Vec<f64> = prices.windows(2).map(|w| w[1] - w[0]).collect();
  let gains: Vec<f64> = deltas.iter().copied().filter(|d| *d > 0.0).collect();
  let losses: Vec<f64> = deltas.iter().copied().filter(|d| *d < 0.0).map(f64::abs).collect();
  let avg_gain = if gains.is_empty() { 0.0 } else { gains.iter().sum::<f64>() / gains.len() as f64 };
  let avg_loss = if losses.is_empty() { 0.0 } else { losses.iter().sum::<f64>() / losses.len() as f64 };
  let rs = avg_gain / avg_loss.max(LOSS_EPSILON);
  Some(100.0 - 100.0 / (1.0 + rs))
}

#[test]
fn test_twenty_identical_ticks_give_sma_equal_to_price() {
  let mut engine = StreamingIndicatorEngine::new(100, 20);

  for i in 0..19 {
    let snapshot = engine.on_tick(tick(i, 42.5)).unwrap();
    assert_eq!(snapshot.sma20, None);
  }
  let snapshot = engine.on_tick(tick(19, 42.5)).unwrap();

  assert_eq!(snapshot.sma20, Some(42.5));
  assert_eq!(snapshot.window_len, 20);
  assert_eq!(snapshot.latest_volume, 29.0);
}

#[rstest]
#[case(2)]
#[case(14)]
#[case(150)]
fn test_strictly_increasing_prices_give_rsi_100(#[case] count: usize) {
  let mut engine = StreamingIndicatorEngine::new(100, 20);
  let mut last = None;
  for i in 0..count {
    last = Some(engine.on_tick(tick(i, 100.0 + i as f64 * 0.5)).unwrap());
  }

  let rsi = last.unwrap().rsi14.unwrap();
  assert!((rsi - 100.0).abs() < 1e-9, "rsi = {}", rsi);
}

#[test]
fn test_rsi_undefined_for_single_tick() {
  let mut engine = StreamingIndicatorEngine::new(100, 20);
  let snapshot = engine.on_tick(tick(0, 10.0)).unwrap();
  assert_eq!(snapshot.rsi14, None);
}

#[test]
fn test_window_never_exceeds_capacity() {
  let mut engine = StreamingIndicatorEngine::new(100, 20);
  for i in 0..350 {
    let snapshot = engine.on_tick(tick(i, 50.0 + (i % 7) as f64)).unwrap();
    assert!(snapshot.window_len <= 100);
  }
  assert_eq!(engine.window().len(), 100);
  assert_eq!(engine.window().latest().unwrap().timestamp, BASE_TS + 349 * 1000);
}

#[test]
fn test_incremental_rsi_matches_recompute() {
  let prices: Vec<f64> = (0..260)
    .map(|i| 100.0 + ((i * 37) % 23) as f64 - ((i * 11) % 7) as f64 * 0.75)
    .collect();

  let mut engine = StreamingIndicatorEngine::new(100, 20);
  for (i, price) in prices.iter().enumerate() {
    let snapshot = engine.on_tick(tick(i, *price)).unwrap();

    let start = (i + 1).saturating_sub(100);
    let expected = recompute_rsi(&prices[start..=i]);
    match (snapshot.rsi14, expected) {
      (Some(a), Some(b)) => assert!((a - b).abs() < 1e-6, "tick {}: {} vs {}", i, a, b),
      (a, b) => assert_eq!(a, b),
    }
  }
}

#[rstest]
#[case(0.0)]
#[case(-3.0)]
#[case(f64::NAN)]
fn test_malformed_tick_leaves_window_untouched(#[case] bad_price: f64) {
  let mut engine = StreamingIndicatorEngine::new(100, 20);
  engine.on_tick(tick(0, 10.0)).unwrap();
  let before = engine.snapshot().cloned();

  let err = engine.on_tick(tick(1, bad_price)).unwrap_err();
  assert!(matches!(err, AnalyticsError::MalformedTick(_)));
  assert_eq!(engine.window().len(), 1);
  assert_eq!(engine.snapshot().cloned(), before);
}

#[test]
fn test_missing_timestamp_is_rejected() {
  let mut engine = StreamingIndicatorEngine::new(100, 20);
  let err = engine.on_tick(PriceTick::new(0, 10.0, 1.0)).unwrap_err();
  assert!(matches!(err, AnalyticsError::MalformedTick(_)));
  assert!(engine.window().is_empty());
}

#[test]
fn test_sma_slides_over_period() {
  let mut sma = SimpleMovingAverage::new(3);
  for price in [1.0, 2.0, 3.0, 4.0] {
    sma.update(price).unwrap();
  }
  assert!((sma.value().unwrap() - 3.0).abs() < 1e-12);

  sma.reset();
  assert!(!sma.is_ready());
}
