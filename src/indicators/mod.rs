/**
* filename : mod
* author : HAMA
* date: 2025. 5. 11.
* description:
**/
pub mod engine;
pub mod moving_averages;
pub mod oscillators;

pub use engine::{StreamingIndicatorEngine, TickWindow};
pub use moving_averages::*;
pub use oscillators::*;

use std::fmt::Debug;

use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// 틱 하나 처리 후의 지표 값. 이전 스냅샷은 버린다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
  pub timestamp: i64,
  pub price: f64,
  /// 20틱 미만이면 None
  pub sma20: Option<f64>,
  /// 2틱 미만이면 None
  pub rsi14: Option<f64>,
  pub latest_volume: f64,
  pub window_len: usize,
}

pub trait Indicator: Debug + Send + Sync {
  fn name(&self) -> &str;

  // 새 가격으로 지표 업데이트 (O(1))
  fn update(&mut self, price: f64) -> Result<(), AnalyticsError>;

  // 현재 지표 값. 데이터가 부족하면 None
  fn value(&self) -> Option<f64>;

  // 지표가 계산 가능한지 (충분한 데이터가 있는지) 확인
  fn is_ready(&self) -> bool {
    self.value().is_some()
  }

  // 지표 상태 리셋
  fn reset(&mut self);
}

fn check_price(name: &str, price: f64) -> Result<(), AnalyticsError> {
  if price.is_finite() && price > 0.0 {
    Ok(())
  } else {
    Err(AnalyticsError::MalformedTick(format!("{}: invalid price {}", name, price)))
  }
}
