use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::models::EventType;

pub const DEFAULT_WINDOW_BEFORE: u32 = 2;
pub const DEFAULT_WINDOW_AFTER: u32 = 3;
pub const DEFAULT_SENTIMENT_THRESHOLD: f64 = 0.1;

/// 백테스트 서비스 요청 파라미터
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParameters {
    pub ticker: String,
    pub event_types: Vec<EventType>,
    /// 이벤트 전 진입 거래일 수
    pub window_before: u32,
    /// 이벤트 후 청산 거래일 수
    pub window_after: u32,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub use_sentiment: bool,
    pub sentiment_threshold: f64,
}

impl Default for BacktestParameters {
    fn default() -> Self {
        BacktestParameters {
            ticker: String::new(),
            event_types: vec![EventType::Earnings],
            window_before: DEFAULT_WINDOW_BEFORE,
            window_after: DEFAULT_WINDOW_AFTER,
            stop_loss: None,
            take_profit: None,
            use_sentiment: false,
            sentiment_threshold: DEFAULT_SENTIMENT_THRESHOLD,
        }
    }
}

impl BacktestParameters {
    pub fn for_ticker(ticker: impl Into<String>) -> Self {
        BacktestParameters {
            ticker: ticker.into(),
            ..Default::default()
        }
    }

    pub fn with_event_types(mut self, event_types: Vec<EventType>) -> Self {
        self.event_types = event_types;
        self
    }

    pub fn with_sentiment_filter(mut self, threshold: f64) -> Self {
        self.use_sentiment = true;
        self.sentiment_threshold = threshold;
        self
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.ticker.trim().is_empty() {
            return Err(AnalyticsError::InvalidParameter("ticker must not be empty".to_string()));
        }
        if self.event_types.is_empty() {
            return Err(AnalyticsError::InvalidParameter("at least one event type is required".to_string()));
        }
        if self.window_before == 0 || self.window_after == 0 {
            return Err(AnalyticsError::InvalidParameter("entry/exit windows must be > 0".to_string()));
        }
        if let Some(sl) = self.stop_loss {
            if !(sl > 0.0 && sl < 1.0) {
                return Err(AnalyticsError::InvalidParameter(format!("stop_loss must be in (0, 1): {}", sl)));
            }
        }
        if let Some(tp) = self.take_profit {
            if !(tp > 0.0 && tp.is_finite()) {
                return Err(AnalyticsError::InvalidParameter(format!("take_profit must be > 0: {}", tp)));
            }
        }
        if !(-1.0..=1.0).contains(&self.sentiment_threshold) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "sentiment_threshold must be in [-1, 1]: {}",
                self.sentiment_threshold
            )));
        }
        Ok(())
    }

    /// 감성 필터가 켜져 있을 때만 임계값
    pub fn sentiment_filter(&self) -> Option<f64> {
        if self.use_sentiment {
            Some(self.sentiment_threshold)
        } else {
            None
        }
    }
}
