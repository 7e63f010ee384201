use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;

/// 라이브 피드에서 수신한 가격 틱
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    /// 밀리초 타임스탬프
    pub timestamp: i64,
    pub price: f64,
    pub volume: f64,
}

impl PriceTick {
    pub fn new(timestamp: i64, price: f64, volume: f64) -> Self {
        PriceTick {
            timestamp,
            price,
            volume,
        }
    }

    /// 엔진 경계에서의 틱 검증
    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if self.timestamp <= 0 {
            return Err(AnalyticsError::MalformedTick(format!(
                "missing timestamp (got {})",
                self.timestamp
            )));
        }
        if !self.price.is_finite() || self.price <= 0.0 {
            return Err(AnalyticsError::MalformedTick(format!(
                "non-positive price {} at {}",
                self.price, self.timestamp
            )));
        }
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(AnalyticsError::MalformedTick(format!(
                "negative volume {} at {}",
                self.volume, self.timestamp
            )));
        }
        Ok(())
    }
}
