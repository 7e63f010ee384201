/**
* filename : oscillators
* author : HAMA
* date: 2025. 5. 11.
* description: 보유 창 전체의 가격 변화로 계산하는 RSI
**/

use std::collections::VecDeque;

use crate::error::AnalyticsError;
use super::{check_price, Indicator};

/// 평균 손실이 0일 때 대신 쓰는 값. 상승만 있으면 RSI가 정확히 100이 된다.
pub const LOSS_EPSILON: f64 = 1e-300;

const RESYNC_INTERVAL: usize = 1024;

/// 창 전체 RSI
///
/// 이름은 RSI(14)지만 고정 14구간이 아니라 보유 중인 모든 틱(최대 `capacity`)의
/// 변화량을 사용한다. 평균 이익은 양의 변화량만의 평균, 평균 손실은 음의 변화량
/// 절댓값만의 평균이다. 변화량이 전부 0이면 RS = 0 이므로 RSI는 0.
#[derive(Debug)]
pub struct WindowRsi {
  name: String,
  capacity: usize,
  last_price: Option<f64>,
  price_count: usize,
  deltas: VecDeque<f64>,
  gain_sum: f64,
  gain_count: usize,
  loss_sum: f64,
  loss_count: usize,
  updates: usize,
}

impl WindowRsi {
  pub fn new(capacity: usize) -> Self {
    WindowRsi {
      name: "RSI-14".to_string(),
      capacity,
      last_price: None,
      price_count: 0,
      deltas: VecDeque::with_capacity(capacity),
      gain_sum: 0.0,
      gain_count: 0,
      loss_sum: 0.0,
      loss_count: 0,
      updates: 0,
    }
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  fn add_delta(&mut self, delta: f64) {
    if delta > 0.0 {
      self.gain_sum += delta;
      self.gain_count += 1;
    } else if delta < 0.0 {
      self.loss_sum += -delta;
      self.loss_count += 1;
    }
    self.deltas.push_back(delta);
  }

  fn evict_delta(&mut self) {
    if let Some(delta) = self.deltas.pop_front() {
      if delta > 0.0 {
        self.gain_sum -= delta;
        self.gain_count -= 1;
      } else if delta < 0.0 {
        self.loss_sum -= -delta;
        self.loss_count -= 1;
      }
    }
  }

  fn resync(&mut self) {
    self.gain_sum = self.deltas.iter().filter(|d| **d > 0.0).sum();
    self.loss_sum = self.deltas.iter().filter(|d| **d < 0.0).map(|d| -d).sum();
  }

  pub fn average_gain(&self) -> f64 {
    if self.gain_count == 0 {
      0.0
    } else {
      self.gain_sum / self.gain_count as f64
    }
  }

  pub fn average_loss(&self) -> f64 {
    if self.loss_count == 0 {
      0.0
    } else {
      self.loss_sum / self.loss_count as f64
    }
  }
}

impl Indicator for WindowRsi {
  fn name(&self) -> &str {
    &self.name
  }

  fn update(&mut self, price: f64) -> Result<(), AnalyticsError> {
    check_price(&self.name, price)?;

    if let Some(prev_price) = self.last_price {
      self.add_delta(price - prev_price);
    }
    self.last_price = Some(price);
    self.price_count += 1;

    // 창 용량을 넘으면 가장 오래된 가격과 그 다음 가격 사이의 변화량이 빠진다
    if self.price_count > self.capacity {
      self.price_count = self.capacity;
      self.evict_delta();
    }

    self.updates += 1;
    if self.updates % RESYNC_INTERVAL == 0 {
      self.resync();
    }

    Ok(())
  }

  fn value(&self) -> Option<f64> {
    if self.price_count < 2 {
      return None;
    }

    let avg_loss = self.average_loss();
    let rs = self.average_gain() / if avg_loss > 0.0 { avg_loss } else { LOSS_EPSILON };

    Some(100.0 - 100.0 / (1.0 + rs))
  }

  fn reset(&mut self) {
    self.last_price = None;
    self.price_count = 0;
    self.deltas.clear();
    self.gain_sum = 0.0;
    self.gain_count = 0;
    self.loss_sum = 0.0;
    self.loss_count = 0;
    self.updates = 0;
  }
}
