use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// 통계 값 하나. 정의되지 않은 값과 +∞를 0과 구분해서 전달한다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Metric {
  Value(f64),
  PositiveInfinity,
  Undefined,
}

impl Metric {
  pub fn value(&self) -> Option<f64> {
    match self {
      Metric::Value(v) => Some(*v),
      Metric::PositiveInfinity => Some(f64::INFINITY),
      Metric::Undefined => None,
    }
  }

  /// 정의되지 않은 경우 UndefinedMetric 에러
  pub fn try_value(&self, name: &str) -> Result<f64, AnalyticsError> {
    self.value()
      .ok_or_else(|| AnalyticsError::UndefinedMetric(name.to_string()))
  }

  pub fn value_or(&self, default: f64) -> f64 {
    self.value().unwrap_or(default)
  }

  pub fn is_infinite(&self) -> bool {
    matches!(self, Metric::PositiveInfinity)
  }
}

impl From<f64> for Metric {
  fn from(v: f64) -> Self {
    if v.is_nan() || v == f64::NEG_INFINITY {
      Metric::Undefined
    } else if v == f64::INFINITY {
      Metric::PositiveInfinity
    } else {
      Metric::Value(v)
    }
  }
}

impl From<Option<f64>> for Metric {
  fn from(v: Option<f64>) -> Self {
    v.map_or(Metric::Undefined, Metric::from)
  }
}
