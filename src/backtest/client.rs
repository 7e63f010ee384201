/**
* filename : client
* author : HAMA
* date: 2025. 5. 11.
* description: 외부 백테스트 서비스와 통신하는 클라이언트
**/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backtest::request::BacktestParameters;
use crate::config::BacktestServiceConfig;
use crate::error::AnalyticsError;
use crate::models::{filter_by_sentiment, EventOutcome, EventType};
use crate::utils::parse_date;

/// 백테스트 요청 인터페이스. 한 번의 호출이 하나의 결과 배치를 돌려준다
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BacktestService: Send + Sync {
    async fn run_backtest(&self, params: &BacktestParameters) -> Result<Vec<EventOutcome>, AnalyticsError>;
}

#[derive(Debug, Clone, Serialize)]
struct BacktestRequest<'a> {
    ticker: &'a str,
    event_type: EventType,
    window_before: u32,
    window_after: u32,
    use_sentiment: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop_loss: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    take_profit: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct BacktestResponse {
    #[serde(default)]
    event_returns: Vec<WireEventReturn>,
    #[serde(default)]
    error: Option<String>,
}

/// 서비스가 돌려주는 이벤트 수익 레코드. 가격이 없으면 진입가 1.0 기준으로 정규화한다
///
/// 변환 결과는 CSV 배치와 같은 검증을 거친다
#[derive(Debug, Deserialize)]
struct WireEventReturn {
    date: String,
    total_return: f64,
    #[serde(default)]
    event_type: Option<EventType>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    entry_price: Option<f64>,
    #[serde(default)]
    exit_price: Option<f64>,
    #[serde(default)]
    pre_return: Option<f64>,
    #[serde(default)]
    post_return: Option<f64>,
    #[serde(default)]
    volatility: Option<f64>,
    #[serde(default)]
    volume_ratio: Option<f64>,
    #[serde(default)]
    sentiment: Option<f64>,
}

impl WireEventReturn {
    fn into_outcome(self, requested: EventType) -> Result<EventOutcome, AnalyticsError> {
        let date = parse_date(&self.date)
            .ok_or_else(|| AnalyticsError::ParseError(format!("invalid event date: {}", self.date)))?;
        let entry_price = self.entry_price.unwrap_or(1.0);
        let exit_price = self.exit_price.unwrap_or(entry_price * (1.0 + self.total_return));

        let outcome = EventOutcome {
            date,
            event_type: self.event_type.unwrap_or(requested),
            description: self.description,
            entry_price,
            exit_price,
            pre_return: self.pre_return,
            post_return: self.post_return,
            total_return: self.total_return,
            volatility: self.volatility.unwrap_or(0.0),
            volume_ratio: self.volume_ratio.unwrap_or(1.0),
            sentiment: self.sentiment,
        };
        outcome.validate()?;
        Ok(outcome)
    }
}

/// HTTP 백테스트 클라이언트 (`POST {base_url}/api/backtest`)
pub struct HttpBacktestClient {
    client: Client,
    base_url: String,
}

impl HttpBacktestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpBacktestClient {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(cfg: &BacktestServiceConfig) -> Result<Self, AnalyticsError> {
        let mut builder = Client::builder();
        if let Some(ms) = cfg.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        Ok(HttpBacktestClient {
            client: builder.build()?,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 백테스트 서비스 상태 확인
    pub async fn health_check(&self) -> Result<bool, AnalyticsError> {
        let url = format!("{}/", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    async fn run_single(&self, params: &BacktestParameters, event_type: EventType) -> Result<Vec<EventOutcome>, AnalyticsError> {
        let url = format!("{}/api/backtest", self.base_url);
        let request = BacktestRequest {
            ticker: &params.ticker,
            event_type,
            window_before: params.window_before,
            window_after: params.window_after,
            use_sentiment: params.use_sentiment,
            stop_loss: params.stop_loss,
            take_profit: params.take_profit,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(AnalyticsError::UpstreamUnavailable(format!(
                "Failed to run backtest: {}",
                response.status()
            )));
        }

        let body: BacktestResponse = response.json().await?;
        if let Some(error) = body.error {
            return Err(AnalyticsError::UpstreamUnavailable(error));
        }

        body.event_returns
            .into_iter()
            .map(|r| r.into_outcome(event_type))
            .collect()
    }
}

#[async_trait]
impl BacktestService for HttpBacktestClient {
    async fn run_backtest(&self, params: &BacktestParameters) -> Result<Vec<EventOutcome>, AnalyticsError> {
        params.validate()?;

        let mut batch = Vec::new();
        for event_type in &params.event_types {
            let outcomes = self.run_single(params, *event_type).await?;
            log::debug!("{} {} 이벤트 결과 {}건 수신", params.ticker, event_type, outcomes.len());
            batch.extend(outcomes);
        }

        Ok(match params.sentiment_filter() {
            Some(threshold) => filter_by_sentiment(&batch, threshold),
            None => batch,
        })
    }
}
