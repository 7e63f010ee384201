/**
* filename : error
* author : HAMA
* date: 2025. 5. 8.
* description:
**/

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// 빈 배치 또는 배치 없음 - 에러 배너가 아니라 빈 상태로 표시
    #[error("No data available")]
    NoData,

    /// 특정 지표만 계산 불가 (예: 손실 거래 없음)
    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    #[error("Malformed tick: {0}")]
    MalformedTick(String),

    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Not subscribed to {0}")]
    NotSubscribed(String),
}

impl AnalyticsError {
    /// 사용자에게 일시적 장애로 알려야 하는 에러인지 여부
    pub fn is_transient(&self) -> bool {
        matches!(self, AnalyticsError::UpstreamUnavailable(_))
    }

    /// 빈 상태(ready state)로 렌더링해야 하는 에러인지 여부
    pub fn is_empty_state(&self) -> bool {
        matches!(self, AnalyticsError::NoData)
    }
}

impl From<reqwest::Error> for AnalyticsError {
    fn from(e: reqwest::Error) -> Self {
        AnalyticsError::UpstreamUnavailable(e.to_string())
    }
}

impl From<csv::Error> for AnalyticsError {
    fn from(e: csv::Error) -> Self {
        AnalyticsError::ParseError(e.to_string())
    }
}
