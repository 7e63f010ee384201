use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::config::QuoteServiceConfig;
use crate::error::AnalyticsError;
use crate::models::{PriceTick, Quote};

/// 시점 시세 제공자 인터페이스
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// 현재 시세 조회
    async fn get_quote(&self, ticker: &str) -> Result<Quote, AnalyticsError>;
}

/// 피드 구독 하나. 같은 티커라도 구독마다 id가 다르다
#[derive(Debug)]
pub struct TickSubscription {
    pub id: Uuid,
    pub ticker: String,
    pub receiver: mpsc::Receiver<PriceTick>,
}

impl TickSubscription {
    pub fn new(ticker: impl Into<String>, receiver: mpsc::Receiver<PriceTick>) -> Self {
        TickSubscription {
            id: Uuid::new_v4(),
            ticker: ticker.into(),
            receiver,
        }
    }
}

/// 틱 푸시 피드 인터페이스. 재연결은 피드 구현의 책임
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickFeed: Send + Sync {
    /// 티커 구독 시작. 틱은 도착 순서대로 수신 채널에 전달된다
    async fn subscribe(&self, ticker: &str) -> Result<TickSubscription, AnalyticsError>;

    /// 해당 구독만 해제. 같은 티커의 다른 구독은 영향이 없다
    async fn unsubscribe(&self, id: Uuid) -> Result<(), AnalyticsError>;
}

#[derive(Debug, Deserialize)]
struct LiveDataResponse {
    quote: Option<WireQuote>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireQuote {
    pub current: f64,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    pub previous_close: f64,
    #[serde(default)]
    pub timestamp: Option<serde_json::Value>,
}

impl WireQuote {
    pub(crate) fn into_quote(self, ticker: &str) -> Quote {
        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(parse_timestamp_ms)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or_else(Utc::now);

        Quote {
            ticker: ticker.to_string(),
            current: self.current,
            open: self.open.unwrap_or(self.previous_close),
            high: self.high.unwrap_or(self.current),
            low: self.low.unwrap_or(self.current),
            previous_close: self.previous_close,
            timestamp,
        }
    }
}

/// 숫자(밀리초) 또는 ISO 문자열 타임스탬프를 밀리초로 변환
pub(crate) fn parse_timestamp_ms(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                    .ok()
                    .map(|naive| naive.and_utc().timestamp_millis())
            }),
        _ => None,
    }
}

/// HTTP 시세 클라이언트 (`GET {base_url}/api/live/{ticker}`)
pub struct HttpQuoteClient {
    client: Client,
    base_url: String,
}

impl HttpQuoteClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpQuoteClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &QuoteServiceConfig) -> Result<Self, AnalyticsError> {
        let mut builder = Client::builder();
        if let Some(ms) = cfg.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        Ok(HttpQuoteClient {
            client: builder.build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl QuoteProvider for HttpQuoteClient {
    async fn get_quote(&self, ticker: &str) -> Result<Quote, AnalyticsError> {
        let url = format!("{}/api/live/{}", self.base_url, ticker);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(AnalyticsError::UpstreamUnavailable(format!(
                "quote service returned {} for {}",
                response.status(),
                ticker
            )));
        }

        let body: LiveDataResponse = response.json().await?;
        match (body.quote, body.error) {
            (Some(quote), _) => Ok(quote.into_quote(ticker)),
            (None, Some(error)) => Err(AnalyticsError::UpstreamUnavailable(error)),
            (None, None) => Err(AnalyticsError::UpstreamUnavailable(format!("no quote for {}", ticker))),
        }
    }
}
