use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use uuid::Uuid;

use crate::config::{QuoteServiceConfig, StreamingConfig};
use crate::error::AnalyticsError;
use crate::market_data::provider::{parse_timestamp_ms, TickFeed, TickSubscription};
use crate::models::PriceTick;

/// 피드가 거래량을 생략할 때 쓰는 추정치: 지금까지 본 거래량의 평균, 없으면 0
#[derive(Debug, Default, Clone)]
pub struct VolumeEstimator {
    total: f64,
    count: u64,
}

impl VolumeEstimator {
    pub fn observe(&mut self, volume: f64) {
        if volume.is_finite() && volume >= 0.0 {
            self.total += volume;
            self.count += 1;
        }
    }

    pub fn estimate(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.total / self.count as f64
        }
    }

    /// 값이 있으면 기록 후 그대로, 없으면 추정치
    pub fn resolve(&mut self, volume: Option<f64>) -> f64 {
        match volume {
            Some(v) => {
                self.observe(v);
                v
            }
            None => self.estimate(),
        }
    }
}

/// WebSocket 기반 틱 피드 (`{ws_url}/ws/{ticker}`)
///
/// 구독마다 연결과 읽기 작업을 따로 가진다
pub struct WebSocketTickFeed {
    url: String,
    buffer_size: usize,
    reconnect_interval: Duration,
    tasks: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl WebSocketTickFeed {
    pub fn new(url: impl Into<String>, buffer_size: usize) -> Self {
        WebSocketTickFeed {
            url: url.into().trim_end_matches('/').to_string(),
            buffer_size,
            reconnect_interval: Duration::from_secs(5),
            tasks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn from_config(quote: &QuoteServiceConfig, streaming: &StreamingConfig) -> Self {
        Self::new(quote.ws_url.clone(), streaming.channel_buffer)
    }

    pub fn with_reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    fn ticker_url(&self, ticker: &str) -> String {
        format!("{}/ws/{}", self.url, ticker)
    }

    pub async fn active_subscriptions(&self) -> usize {
        self.tasks.lock().await.len()
    }
}

#[async_trait]
impl TickFeed for WebSocketTickFeed {
    async fn subscribe(&self, ticker: &str) -> Result<TickSubscription, AnalyticsError> {
        let url = self.ticker_url(ticker);

        // 첫 연결 실패는 호출자에게 바로 알린다
        let (first_stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| AnalyticsError::UpstreamUnavailable(format!("{}: {}", url, e)))?;

        let (tx, rx) = mpsc::channel(self.buffer_size);
        let reconnect_interval = self.reconnect_interval;
        let symbol = ticker.to_string();

        let task = tokio::spawn(async move {
            let mut estimator = VolumeEstimator::default();
            let mut stream = Some(first_stream);

            loop {
                let ws_stream = match stream.take() {
                    Some(s) => s,
                    None => match connect_async(url.as_str()).await {
                        Ok((s, _)) => s,
                        Err(e) => {
                            log::error!("Failed to connect to WebSocket {}: {}", url, e);
                            tokio::time::sleep(reconnect_interval).await;
                            continue;
                        }
                    },
                };

                let mut read = ws_stream;

                // 메시지 처리 루프
                while let Some(msg_result) = read.next().await {
                    match msg_result {
                        Ok(Message::Text(text)) => {
                            if let Some(tick) = parse_price_update(&text, &mut estimator) {
                                if tx.send(tick).await.is_err() {
                                    // 수신 측이 닫힘 = 구독 종료
                                    return;
                                }
                            }
                        }
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            log::error!("WebSocket error on {}: {}", symbol, e);
                            break;
                        }
                    }
                }

                if tx.is_closed() {
                    return;
                }

                // 재연결 대기
                tokio::time::sleep(reconnect_interval).await;
                log::info!("Attempting to reconnect WebSocket for {}...", symbol);
            }
        });

        let subscription = TickSubscription::new(ticker, rx);
        self.tasks.lock().await.insert(subscription.id, task);

        Ok(subscription)
    }

    async fn unsubscribe(&self, id: Uuid) -> Result<(), AnalyticsError> {
        let mut tasks = self.tasks.lock().await;
        match tasks.remove(&id) {
            Some(task) => {
                task.abort();
                Ok(())
            }
            None => Err(AnalyticsError::NotSubscribed(id.to_string())),
        }
    }
}

/// `{"type": "price_update", "data": {...}}` 메시지를 틱으로 변환
///
/// 타임스탬프가 없으면 0으로 두어 엔진 경계에서 거부되도록 한다.
pub fn parse_price_update(text: &str, estimator: &mut VolumeEstimator) -> Option<PriceTick> {
    let json: Value = serde_json::from_str(text).ok()?;
    if json.get("type").and_then(Value::as_str) != Some("price_update") {
        return None;
    }

    let data = json.get("data")?;
    let price = data
        .get("current")
        .or_else(|| data.get("price"))
        .and_then(Value::as_f64)?;
    let timestamp = data.get("timestamp").and_then(parse_timestamp_ms).unwrap_or(0);
    let volume = estimator.resolve(data.get("volume").and_then(Value::as_f64));

    Some(PriceTick::new(timestamp, price, volume))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::SinkExt;
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    /// 접속마다 price_update를 흘려보내는 로컬 시세 서버
    async fn spawn_price_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut ws = match tokio_tungstenite::accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(_) => return,
                    };
                    for i in 1..=300 {
                        let text = format!(
                            r#"{{"type":"price_update","data":{{"current":{},"timestamp":{}}}}}"#,
                            100.0 + i as f64,
                            1_700_000_000_000_i64 + i
                        );
                        if ws.send(Message::Text(text)).await.is_err() {
                            return;
                        }
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                });
            }
        });

        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_unsubscribe_leaves_other_subscription_on_same_ticker() {
        let feed = WebSocketTickFeed::new(spawn_price_server().await, 64);
        let mut a = feed.subscribe("AAPL").await.unwrap();
        let mut b = feed.subscribe("AAPL").await.unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(feed.active_subscriptions().await, 2);

        assert!(timeout(Duration::from_secs(2), a.receiver.recv()).await.unwrap().is_some());
        feed.unsubscribe(a.id).await.unwrap();

        // a는 남은 버퍼를 비운 뒤 닫힌다
        while timeout(Duration::from_secs(2), a.receiver.recv()).await.unwrap().is_some() {}

        let tick = timeout(Duration::from_secs(2), b.receiver.recv()).await.unwrap().unwrap();
        assert!(tick.price > 100.0);
        assert_eq!(feed.active_subscriptions().await, 1);
        assert!(matches!(feed.unsubscribe(a.id).await, Err(AnalyticsError::NotSubscribed(_))));
    }

    #[test]
    fn test_parse_price_update() {
        let mut estimator = VolumeEstimator::default();
        let tick = parse_price_update(
            r#"{"type":"price_update","data":{"current":187.2,"previous_close":185.0,"timestamp":1700000000000,"volume":1200}}"#,
            &mut estimator,
        )
        .unwrap();

        assert_eq!(tick.price, 187.2);
        assert_eq!(tick.timestamp, 1_700_000_000_000);
        assert_eq!(tick.volume, 1200.0);
    }

    #[test]
    fn test_missing_volume_uses_running_average() {
        let mut estimator = VolumeEstimator::default();
        let no_volume = r#"{"type":"price_update","data":{"current":10.0,"timestamp":1}}"#;

        assert_eq!(parse_price_update(no_volume, &mut estimator).unwrap().volume, 0.0);

        parse_price_update(r#"{"type":"price_update","data":{"current":10.0,"timestamp":2,"volume":100}}"#, &mut estimator);
        parse_price_update(r#"{"type":"price_update","data":{"current":10.0,"timestamp":3,"volume":300}}"#, &mut estimator);

        assert_eq!(parse_price_update(no_volume, &mut estimator).unwrap().volume, 200.0);
    }

    #[test]
    fn test_ignores_other_messages() {
        let mut estimator = VolumeEstimator::default();
        assert!(parse_price_update(r#"{"type":"heartbeat"}"#, &mut estimator).is_none());
        assert!(parse_price_update("not json", &mut estimator).is_none());
    }

    #[test]
    fn test_missing_timestamp_yields_rejectable_tick() {
        let mut estimator = VolumeEstimator::default();
        let tick = parse_price_update(r#"{"type":"price_update","data":{"current":10.0}}"#, &mut estimator).unwrap();
        assert!(tick.validate().is_err());
    }
}
