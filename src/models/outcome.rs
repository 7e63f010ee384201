use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AnalyticsError;
use crate::utils::math;

/// 이벤트 유형 (고정 집합)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Earnings,
    Fed,
    Dividend,
    #[serde(alias = "fda_approval")]
    Fda,
    ProductLaunch,
    Merger,
}

impl EventType {
    pub const ALL: [EventType; 6] = [
        EventType::Earnings,
        EventType::Fed,
        EventType::Dividend,
        EventType::Fda,
        EventType::ProductLaunch,
        EventType::Merger,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Earnings => "earnings",
            EventType::Fed => "fed",
            EventType::Dividend => "dividend",
            EventType::Fda => "fda",
            EventType::ProductLaunch => "product_launch",
            EventType::Merger => "merger",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "earnings" => Ok(EventType::Earnings),
            "fed" => Ok(EventType::Fed),
            "dividend" => Ok(EventType::Dividend),
            "fda" | "fda_approval" => Ok(EventType::Fda),
            "product_launch" => Ok(EventType::ProductLaunch),
            "merger" => Ok(EventType::Merger),
            other => Err(AnalyticsError::ParseError(format!("Unknown event type: {}", other))),
        }
    }
}

/// 과거 이벤트 하나에 연결된 실현 거래 결과
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventOutcome {
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub entry_price: f64,
    pub exit_price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_return: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_return: Option<f64>,
    pub total_return: f64,
    #[serde(default)]
    pub volatility: f64,
    #[serde(default = "default_volume_ratio")]
    pub volume_ratio: f64,
    /// None = 알 수 없음 (0과 구분)
    #[serde(default)]
    pub sentiment: Option<f64>,
}

fn default_volume_ratio() -> f64 {
    1.0
}

impl EventOutcome {
    pub fn new(
        date: NaiveDate,
        event_type: EventType,
        entry_price: f64,
        exit_price: f64,
        total_return: f64,
    ) -> Self {
        EventOutcome {
            date,
            event_type,
            description: None,
            entry_price,
            exit_price,
            pre_return: None,
            post_return: None,
            total_return,
            volatility: 0.0,
            volume_ratio: 1.0,
            sentiment: None,
        }
    }

    pub fn with_volatility(mut self, volatility: f64) -> Self {
        self.volatility = volatility;
        self
    }

    pub fn with_volume_ratio(mut self, volume_ratio: f64) -> Self {
        self.volume_ratio = volume_ratio;
        self
    }

    pub fn with_sentiment(mut self, sentiment: f64) -> Self {
        self.sentiment = Some(sentiment);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn is_win(&self) -> bool {
        self.total_return > 0.0
    }

    pub fn is_loss(&self) -> bool {
        self.total_return < 0.0
    }

    /// (exit - entry) / entry
    pub fn price_return(&self) -> f64 {
        math::calculate_return(self.entry_price, self.exit_price)
    }

    pub fn validate(&self) -> Result<(), AnalyticsError> {
        if !(self.entry_price > 0.0 && self.entry_price.is_finite()) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "entry_price must be positive on {}: {}",
                self.date, self.entry_price
            )));
        }
        if !(self.exit_price > 0.0 && self.exit_price.is_finite()) {
            return Err(AnalyticsError::InvalidParameter(format!(
                "exit_price must be positive on {}: {}",
                self.date, self.exit_price
            )));
        }
        if !self.total_return.is_finite() {
            return Err(AnalyticsError::InvalidParameter(format!(
                "total_return is not finite on {}",
                self.date
            )));
        }
        if self.volatility < 0.0 {
            return Err(AnalyticsError::InvalidParameter(format!(
                "volatility must be non-negative on {}",
                self.date
            )));
        }
        if let Some(s) = self.sentiment {
            if !(-1.0..=1.0).contains(&s) {
                return Err(AnalyticsError::InvalidParameter(format!(
                    "sentiment out of [-1, 1] on {}: {}",
                    self.date, s
                )));
            }
        }
        Ok(())
    }
}

/// 감성 필터: 감성 값이 알려져 있고 임계값을 초과하는 결과만 유지
pub fn filter_by_sentiment(outcomes: &[EventOutcome], threshold: f64) -> Vec<EventOutcome> {
    outcomes
        .iter()
        .filter(|o| o.sentiment.map_or(false, |s| s > threshold))
        .cloned()
        .collect()
}

/// Accepts `YYYY-MM-DD` as well as full ISO timestamps from the backtest service.
mod calendar_date {
    use chrono::NaiveDate;
    use serde::{self, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let head = s.get(..10).unwrap_or(&s);
        NaiveDate::parse_from_str(head, FORMAT).map_err(serde::de::Error::custom)
    }
}
