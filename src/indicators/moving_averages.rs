/**
* filename : moving_averages
* author : HAMA
* date: 2025. 5. 11.
* description:
**/

use std::collections::VecDeque;

use crate::error::AnalyticsError;
use super::{check_price, Indicator};

// 누적 합 재동기화 주기
const RESYNC_INTERVAL: usize = 1024;

#[derive(Debug)]
pub struct SimpleMovingAverage {
  name: String,
  period: usize,
  values: VecDeque<f64>,
  sum: f64,
  updates: usize,
}

impl SimpleMovingAverage {
  pub fn new(period: usize) -> Self {
    SimpleMovingAverage {
      name: format!("SMA-{}", period),
      period,
      values: VecDeque::with_capacity(period + 1),
      sum: 0.0,
      updates: 0,
    }
  }

  pub fn period(&self) -> usize {
    self.period
  }
}

impl Indicator for SimpleMovingAverage {
  fn name(&self) -> &str {
    &self.name
  }

  fn update(&mut self, price: f64) -> Result<(), AnalyticsError> {
    check_price(&self.name, price)?;

    // 새 가격 추가
    self.values.push_back(price);
    self.sum += price;

    // 오래된 가격 제거
    if self.values.len() > self.period {
      if let Some(old_value) = self.values.pop_front() {
        self.sum -= old_value;
      }
    }

    self.updates += 1;
    if self.updates % RESYNC_INTERVAL == 0 {
      self.sum = self.values.iter().sum();
    }

    Ok(())
  }

  fn value(&self) -> Option<f64> {
    if self.period == 0 || self.values.len() < self.period {
      return None;
    }

    Some(self.sum / self.values.len() as f64)
  }

  fn reset(&mut self) {
    self.values.clear();
    self.sum = 0.0;
    self.updates = 0;
  }
}
