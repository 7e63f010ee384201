use std::collections::VecDeque;

use crate::config::StreamingConfig;
use crate::error::AnalyticsError;
use crate::models::PriceTick;
use super::{Indicator, IndicatorSnapshot, SimpleMovingAverage, WindowRsi};

/// 최근 틱만 보관하는 고정 용량 창
#[derive(Debug)]
pub struct TickWindow {
  capacity: usize,
  ticks: VecDeque<PriceTick>,
}

impl TickWindow {
  pub fn new(capacity: usize) -> Self {
    TickWindow {
      capacity,
      ticks: VecDeque::with_capacity(capacity + 1),
    }
  }

  /// 틱 추가. 용량을 넘으면 가장 오래된 틱을 돌려준다
  pub fn push(&mut self, tick: PriceTick) -> Option<PriceTick> {
    self.ticks.push_back(tick);
    if self.ticks.len() > self.capacity {
      self.ticks.pop_front()
    } else {
      None
    }
  }

  pub fn len(&self) -> usize {
    self.ticks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ticks.is_empty()
  }

  pub fn latest(&self) -> Option<&PriceTick> {
    self.ticks.back()
  }

  pub fn clear(&mut self) {
    self.ticks.clear();
  }
}

/// 티커 구독 하나의 스트리밍 지표 엔진
///
/// 틱은 도착 순서대로 한 번에 하나씩 처리된다. 잘못된 틱은 창을 건드리지 않는다.
#[derive(Debug)]
pub struct StreamingIndicatorEngine {
  window: TickWindow,
  sma: SimpleMovingAverage,
  rsi: WindowRsi,
  last_snapshot: Option<IndicatorSnapshot>,
}

impl StreamingIndicatorEngine {
  pub fn new(window_capacity: usize, sma_period: usize) -> Self {
    StreamingIndicatorEngine {
      window: TickWindow::new(window_capacity),
      sma: SimpleMovingAverage::new(sma_period),
      rsi: WindowRsi::new(window_capacity),
      last_snapshot: None,
    }
  }

  pub fn from_config(cfg: &StreamingConfig) -> Self {
    Self::new(cfg.window_capacity, cfg.sma_period)
  }

  pub fn on_tick(&mut self, tick: PriceTick) -> Result<IndicatorSnapshot, AnalyticsError> {
    tick.validate()?;

    self.sma.update(tick.price)?;
    self.rsi.update(tick.price)?;

    self.window.push(tick.clone());

    let snapshot = IndicatorSnapshot {
      timestamp: tick.timestamp,
      price: tick.price,
      sma20: self.sma.value(),
      rsi14: self.rsi.value(),
      latest_volume: tick.volume,
      window_len: self.window.len(),
    };
    self.last_snapshot = Some(snapshot.clone());
    Ok(snapshot)
  }

  pub fn snapshot(&self) -> Option<&IndicatorSnapshot> {
    self.last_snapshot.as_ref()
  }

  pub fn window(&self) -> &TickWindow {
    &self.window
  }

  pub fn reset(&mut self) {
    self.window.clear();
    self.sma.reset();
    self.rsi.reset();
    self.last_snapshot = None;
  }
}
